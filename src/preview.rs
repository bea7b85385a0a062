//! Preview rendering: fallback chains, the modal's state machine, and the
//! temporary files that back binary previews.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::api::{DocumentBackend, Endpoint};
use crate::error::ApiError;
use crate::models::{BackendVariant, DocumentFormat, SparseMap, WorkoutPayload};
use crate::submit::FormatSelector;

/// Preview files are removed this long after creation even if the modal stays open.
pub const ARTIFACT_TTL: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq)]
pub enum PreviewArtifact {
    Pdf(Vec<u8>),
    Html(String),
    Text(String),
}

impl PreviewArtifact {
    fn file_extension(&self) -> Option<&'static str> {
        match self {
            PreviewArtifact::Pdf(_) => Some("pdf"),
            PreviewArtifact::Html(_) => Some("html"),
            PreviewArtifact::Text(_) => None,
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            PreviewArtifact::Pdf(bytes) => bytes,
            PreviewArtifact::Html(text) | PreviewArtifact::Text(text) => text.as_bytes(),
        }
    }
}

/// One way of producing a preview.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviewAttempt {
    /// `POST /api/preview` (V1 PDF).
    LegacyPdf,
    /// `POST /api/v2/preview-html`.
    Html,
    /// `POST /api/v2/preview-pdf`.
    Pdf,
    /// Listing built from the payload itself; never touches the network.
    Text,
}

impl PreviewAttempt {
    pub fn run(
        self,
        backend: &dyn DocumentBackend,
        payload: &WorkoutPayload,
    ) -> Result<PreviewArtifact, ApiError> {
        match self {
            PreviewAttempt::LegacyPdf => backend.post(Endpoint::Preview, payload).map(PreviewArtifact::Pdf),
            PreviewAttempt::Pdf => backend.post(Endpoint::PreviewPdf, payload).map(PreviewArtifact::Pdf),
            PreviewAttempt::Html => backend
                .post(Endpoint::PreviewHtml, payload)
                .map(|bytes| PreviewArtifact::Html(String::from_utf8_lossy(&bytes).into_owned())),
            PreviewAttempt::Text => Ok(PreviewArtifact::Text(text_listing(payload))),
        }
    }
}

/// Run attempts in order; the first success wins.
///
/// Failures before the last attempt are logged and dropped; the last one is returned.
pub fn first_success(
    attempts: &[PreviewAttempt],
    backend: &dyn DocumentBackend,
    payload: &WorkoutPayload,
) -> Result<PreviewArtifact, ApiError> {
    let mut last_err = ApiError::Decode("no preview strategy configured".to_string());
    for (idx, attempt) in attempts.iter().enumerate() {
        match attempt.run(backend, payload) {
            Ok(artifact) => return Ok(artifact),
            Err(e) => {
                if idx + 1 < attempts.len() {
                    warn!(?attempt, error = %e, "preview attempt failed, falling back");
                }
                last_err = e;
            }
        }
    }
    Err(last_err)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviewPolicy {
    /// Server PDF, else the local text listing.
    Legacy,
    /// HTML first; optionally upgrade to PDF in place.
    Html { upgrade_to_pdf: bool },
}

/// Decide how to preview, or the warning to show instead.
///
/// V1 needs a template; V2 needs the backend up and only upgrades to PDF when
/// the renderer is available and PDF is the selected format.
pub fn preview_policy(
    variant: BackendVariant,
    template_name: &str,
    v2_available: bool,
    formats: &FormatSelector,
) -> Result<PreviewPolicy, &'static str> {
    match variant {
        BackendVariant::V1 if template_name.trim().is_empty() => Err("Please select a template first."),
        BackendVariant::V1 => Ok(PreviewPolicy::Legacy),
        BackendVariant::V2 if !v2_available => Err("V2 backend is not available for preview."),
        BackendVariant::V2 => Ok(PreviewPolicy::Html {
            upgrade_to_pdf: formats.pdf_available() && formats.selected() == DocumentFormat::Pdf,
        }),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PreviewEvent {
    Shown(PreviewArtifact),
    /// Replaces an already shown preview.
    Upgraded(PreviewArtifact),
    Failed(String),
}

/// Execute a policy, reporting each visible change through `emit`.
pub fn run_preview(
    policy: PreviewPolicy,
    backend: &dyn DocumentBackend,
    payload: &WorkoutPayload,
    mut emit: impl FnMut(PreviewEvent),
) {
    match policy {
        PreviewPolicy::Legacy => {
            match first_success(&[PreviewAttempt::LegacyPdf, PreviewAttempt::Text], backend, payload) {
                Ok(artifact) => emit(PreviewEvent::Shown(artifact)),
                Err(e) => emit(PreviewEvent::Failed(e.to_string())),
            }
        }
        PreviewPolicy::Html { upgrade_to_pdf } => {
            match first_success(&[PreviewAttempt::Html], backend, payload) {
                Ok(artifact) => emit(PreviewEvent::Shown(artifact)),
                Err(e) => {
                    emit(PreviewEvent::Failed(e.to_string()));
                    return;
                }
            }
            if upgrade_to_pdf {
                match PreviewAttempt::Pdf.run(backend, payload) {
                    Ok(artifact) => emit(PreviewEvent::Upgraded(artifact)),
                    Err(e) => warn!(error = %e, "PDF preview failed, keeping HTML preview"),
                }
            }
        }
    }
}

/// Plain-text listing of every replacement the payload would make.
pub fn text_listing(payload: &WorkoutPayload) -> String {
    fn entries(out: &mut String, map: &SparseMap) {
        for (key, value) in map {
            let _ = writeln!(out, "{key} → \"{value}\"");
        }
    }

    let mut out = String::new();
    out.push_str("REPLACEMENTS THAT WILL BE MADE:\n");
    out.push_str(&"=".repeat(50));
    out.push_str("\n\n");

    let _ = writeln!(out, "Workout Name: \"{}\"", payload.workout_name);
    let _ = writeln!(out, "Date: \"{}\"", payload.workout_date);
    let _ = writeln!(out, "Template: \"{}\"\n", payload.template_name);

    out.push_str("MAIN EXERCISES:\n");
    out.push_str(&"-".repeat(30));
    out.push('\n');
    entries(&mut out, &payload.exercises);

    out.push_str("\nSETS, REPS & REST:\n");
    out.push_str(&"-".repeat(30));
    out.push('\n');
    entries(&mut out, &payload.sets);
    entries(&mut out, &payload.reps);
    entries(&mut out, &payload.rest);

    if !payload.bonus_exercises.is_empty() {
        out.push_str("\nBONUS EXERCISES:\n");
        out.push_str(&"-".repeat(30));
        out.push('\n');
        entries(&mut out, &payload.bonus_exercises);
        entries(&mut out, &payload.bonus_sets);
        entries(&mut out, &payload.bonus_reps);
        entries(&mut out, &payload.bonus_rest);
    }
    out
}

/// Temporary files holding preview content for the system viewer.
#[derive(Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
    ttl: Duration,
    files: Vec<(PathBuf, Instant)>,
    counter: u64,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        ArtifactStore {
            dir: dir.into(),
            ttl,
            files: Vec::new(),
            counter: 0,
        }
    }

    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir().join("gymlog-previews"), ARTIFACT_TTL)
    }

    /// Write a binary/HTML artifact to disk; text previews need no file.
    pub fn persist(&mut self, artifact: &PreviewArtifact, now: Instant) -> std::io::Result<Option<PathBuf>> {
        let Some(ext) = artifact.file_extension() else {
            return Ok(None);
        };
        std::fs::create_dir_all(&self.dir)?;
        self.counter += 1;
        let path = self
            .dir
            .join(format!("preview-{}-{}.{ext}", std::process::id(), self.counter));
        std::fs::write(&path, artifact.bytes())?;
        self.files.push((path.clone(), now));
        Ok(Some(path))
    }

    pub fn is_live(&self, path: &Path) -> bool {
        self.files.iter().any(|(p, _)| p == path)
    }

    /// Remove files older than the TTL.
    pub fn sweep(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.files.retain(|(path, created)| {
            if now.duration_since(*created) < ttl {
                return true;
            }
            remove_quietly(path);
            false
        });
    }

    pub fn release_all(&mut self) {
        for (path, _) in self.files.drain(..) {
            remove_quietly(&path);
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

impl Drop for ArtifactStore {
    fn drop(&mut self) {
        self.release_all();
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "could not remove preview file");
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PreviewState {
    Closed,
    Loading,
    Showing {
        artifact: PreviewArtifact,
        file: Option<PathBuf>,
    },
    Failed(String),
}

/// The preview modal. Loading, content and error are mutually exclusive.
#[derive(Debug)]
pub struct PreviewModal {
    state: PreviewState,
    ticket: u64,
    store: ArtifactStore,
}

impl PreviewModal {
    pub fn new(store: ArtifactStore) -> Self {
        PreviewModal {
            state: PreviewState::Closed,
            ticket: 0,
            store,
        }
    }

    pub fn state(&self) -> &PreviewState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != PreviewState::Closed
    }

    /// Open in the loading state and return the ticket the result must carry.
    pub fn open(&mut self) -> u64 {
        self.ticket += 1;
        self.state = PreviewState::Loading;
        self.ticket
    }

    /// Close and release every preview file.
    pub fn close(&mut self) {
        self.state = PreviewState::Closed;
        self.store.release_all();
    }

    /// Apply a result; stale tickets and results for a closed modal are dropped.
    pub fn apply(&mut self, ticket: u64, event: PreviewEvent, now: Instant) -> bool {
        if ticket != self.ticket || !self.is_open() {
            return false;
        }
        match event {
            PreviewEvent::Shown(artifact) => self.show(artifact, now),
            PreviewEvent::Upgraded(artifact) => {
                if !matches!(self.state, PreviewState::Showing { .. }) {
                    return false;
                }
                info!("preview upgraded to PDF");
                self.show(artifact, now);
            }
            PreviewEvent::Failed(message) => self.state = PreviewState::Failed(message),
        }
        true
    }

    fn show(&mut self, artifact: PreviewArtifact, now: Instant) {
        let file = match self.store.persist(&artifact, now) {
            Ok(file) => file,
            Err(e) => {
                warn!(error = %e, "could not write preview file");
                None
            }
        };
        self.state = PreviewState::Showing { artifact, file };
    }

    /// Expire old preview files; the shown file path is dropped once released.
    pub fn sweep(&mut self, now: Instant) {
        self.store.sweep(now);
        if let PreviewState::Showing { file, .. } = &mut self.state {
            if file.as_deref().is_some_and(|p| !self.store.is_live(p)) {
                *file = None;
            }
        }
    }

    pub fn has_live_files(&self) -> bool {
        self.store.len() > 0
    }
}
