//! Error types shared across the editor.

use thiserror::Error;

use crate::notices::NoticeLevel;

/// Errors from talking to the document-generation backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    /// Non-2xx status; `detail` is the backend's message or a generic fallback.
    #[error("{detail}")]
    Backend { status: u16, detail: String },
    /// A 2xx response whose body could not be decoded.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Backend { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Decode(_) => None,
        }
    }
}

/// Reasons a generate request is refused or fails.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Please fill in all required fields correctly.")]
    Invalid,
    #[error("Please select a template.")]
    MissingTemplate,
    #[error("V2 backend is not available. Please try again later.")]
    BackendUnavailable,
    #[error("Error generating document: {0}")]
    Api(#[from] ApiError),
    #[error("Error generating document: could not save download: {0}")]
    Io(#[from] std::io::Error),
}

impl SubmitError {
    /// Notice level used when surfacing this error.
    pub fn level(&self) -> NoticeLevel {
        match self {
            Self::Invalid | Self::MissingTemplate => NoticeLevel::Warning,
            Self::BackendUnavailable | Self::Api(_) | Self::Io(_) => NoticeLevel::Danger,
        }
    }
}

/// Errors when loading or parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors from the persisted preference store.
#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("toml: {0}")]
    TomlSer(#[from] toml::ser::Error),
}
