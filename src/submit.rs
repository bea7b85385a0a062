//! Document generation requests and the resulting downloads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info};

use crate::api::{DocumentBackend, Endpoint};
use crate::error::SubmitError;
use crate::form::Validation;
use crate::models::{BackendStatus, BackendVariant, DocumentFormat, WorkoutPayload};

/// Where generated documents end up.
pub trait DownloadSink: Send + Sync {
    fn save(&self, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf>;
}

pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectorySink { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn save(&self, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        if Path::new(filename).file_name() != Some(std::ffi::OsStr::new(filename)) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("`{filename}` is not a plain file name"),
            ));
        }
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}

/// `gym_log_{name}_{date}.{ext}`. Whitespace runs and characters that are not
/// allowed in file names become `_`, so the result never leaves the download dir.
pub fn download_filename(workout_name: &str, workout_date: &str, format: DocumentFormat) -> String {
    let name = sanitize_file_part(workout_name);
    let date = sanitize_file_part(workout_date);
    format!("gym_log_{name}_{date}.{}", format.extension())
}

fn sanitize_file_part(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Which endpoint produces `format`, and the format actually delivered.
pub fn generation_target(variant: BackendVariant, format: DocumentFormat) -> (Endpoint, DocumentFormat) {
    match (variant, format) {
        (BackendVariant::V1, _) => (Endpoint::Generate, DocumentFormat::Docx),
        (BackendVariant::V2, DocumentFormat::Pdf) => (Endpoint::GeneratePdf, DocumentFormat::Pdf),
        (BackendVariant::V2, _) => (Endpoint::GenerateHtml, DocumentFormat::Html),
    }
}

/// The V2 HTML/PDF toggle, gated on the PDF capability flag.
#[derive(Clone, Debug, PartialEq)]
pub struct FormatSelector {
    selected: DocumentFormat,
    pdf_available: bool,
}

impl Default for FormatSelector {
    fn default() -> Self {
        FormatSelector {
            selected: DocumentFormat::Html,
            pdf_available: false,
        }
    }
}

impl FormatSelector {
    pub fn selected(&self) -> DocumentFormat {
        self.selected
    }

    pub fn pdf_available(&self) -> bool {
        self.pdf_available
    }

    /// Refuses PDF while the renderer is unavailable.
    pub fn select(&mut self, format: DocumentFormat) -> Result<(), &'static str> {
        if format == DocumentFormat::Pdf && !self.pdf_available {
            return Err("PDF generation is not available. Gotenberg service is required.");
        }
        self.selected = format;
        Ok(())
    }

    /// Back to HTML; the PDF capability flag is left as last reported.
    pub fn reset(&mut self) {
        self.selected = DocumentFormat::Html;
    }

    /// Apply a status report; losing PDF forces the selection back to HTML.
    pub fn apply_status(&mut self, status: Option<&BackendStatus>) {
        self.pdf_available = status.is_some_and(|s| s.gotenberg_available);
        if !self.pdf_available && self.selected == DocumentFormat::Pdf {
            self.selected = DocumentFormat::Html;
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SubmitOutcome {
    pub path: PathBuf,
    pub format: DocumentFormat,
    pub variant: BackendVariant,
}

impl SubmitOutcome {
    pub fn message(&self) -> String {
        match self.variant {
            BackendVariant::V1 => "Document generated and downloaded successfully!".to_string(),
            BackendVariant::V2 => format!(
                "{} document generated and downloaded successfully!",
                self.format.label()
            ),
        }
    }
}

/// Checks that must pass before any request goes out.
pub fn check_ready(
    variant: BackendVariant,
    validation: &Validation,
    payload: &WorkoutPayload,
    v2_available: bool,
) -> Result<(), SubmitError> {
    if !validation.is_valid() {
        return Err(SubmitError::Invalid);
    }
    match variant {
        BackendVariant::V1 if payload.template_name.trim().is_empty() => {
            Err(SubmitError::MissingTemplate)
        }
        BackendVariant::V2 if !v2_available => Err(SubmitError::BackendUnavailable),
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct Submitter {
    backend: Arc<dyn DocumentBackend>,
    sink: Arc<dyn DownloadSink>,
    variant: BackendVariant,
}

impl Submitter {
    pub fn new(
        backend: Arc<dyn DocumentBackend>,
        sink: Arc<dyn DownloadSink>,
        variant: BackendVariant,
    ) -> Self {
        Submitter {
            backend,
            sink,
            variant,
        }
    }

    pub fn variant(&self) -> BackendVariant {
        self.variant
    }

    /// Generate the document and save it under the conventional filename.
    pub fn submit(
        &self,
        payload: &WorkoutPayload,
        format: DocumentFormat,
    ) -> Result<SubmitOutcome, SubmitError> {
        let (endpoint, format) = generation_target(self.variant, format);
        let bytes = self.backend.post(endpoint, payload).map_err(|e| {
            error!(error = %e, endpoint = endpoint.path(), "document generation failed");
            SubmitError::from(e)
        })?;

        let filename = download_filename(&payload.workout_name, &payload.workout_date, format);
        let path = self.sink.save(&filename, &bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "document downloaded");
        Ok(SubmitOutcome {
            path,
            format,
            variant: self.variant,
        })
    }
}
