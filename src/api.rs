//! HTTP client for the document-generation backend.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;
use crate::models::{BackendStatus, TemplateList, WorkoutPayload};

/// POST endpoints that take a [`WorkoutPayload`] and answer with a document body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Generate,
    Preview,
    GenerateHtml,
    GeneratePdf,
    PreviewHtml,
    PreviewPdf,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Generate => "/api/generate",
            Endpoint::Preview => "/api/preview",
            Endpoint::GenerateHtml => "/api/v2/generate-html",
            Endpoint::GeneratePdf => "/api/v2/generate-pdf",
            Endpoint::PreviewHtml => "/api/v2/preview-html",
            Endpoint::PreviewPdf => "/api/v2/preview-pdf",
        }
    }

    /// Message used when a failed response carries no `detail`.
    pub fn fallback_detail(self) -> &'static str {
        match self {
            Endpoint::Generate | Endpoint::GenerateHtml | Endpoint::GeneratePdf => {
                "Failed to generate document"
            }
            Endpoint::Preview | Endpoint::PreviewHtml | Endpoint::PreviewPdf => {
                "Failed to generate preview"
            }
        }
    }
}

/// Everything the editor needs from the backend.
pub trait DocumentBackend: Send + Sync {
    fn list_templates(&self) -> Result<Vec<String>, ApiError>;
    fn status(&self) -> Result<BackendStatus, ApiError>;
    fn post(&self, endpoint: Endpoint, payload: &WorkoutPayload) -> Result<Vec<u8>, ApiError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

#[derive(Deserialize)]
struct Health {
    #[serde(default)]
    status: String,
}

pub struct HttpBackend {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl HttpBackend {
    /// `timeout` of `None` leaves requests unbounded.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let http = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(HttpBackend {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /api/health`; true when the server reports itself healthy.
    pub fn health(&self) -> Result<bool, ApiError> {
        let response = self.http.get(self.url("/api/health")).send()?;
        if !response.status().is_success() {
            return Err(failure(response, "Health check failed"));
        }
        let health: Health = response.json()?;
        Ok(health.status == "healthy")
    }
}

impl DocumentBackend for HttpBackend {
    fn list_templates(&self) -> Result<Vec<String>, ApiError> {
        let url = self.url("/api/templates");
        debug!(%url, "listing templates");
        let response = self.http.get(url).send()?;
        if !response.status().is_success() {
            return Err(failure(response, "Failed to load templates"));
        }
        let body = response.bytes()?;
        let list: TemplateList =
            serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(list.templates)
    }

    fn status(&self) -> Result<BackendStatus, ApiError> {
        let url = self.url("/api/v2/status");
        debug!(%url, "checking backend status");
        let response = self.http.get(url).send()?;
        if !response.status().is_success() {
            return Err(failure(response, "Failed to check V2 status"));
        }
        let body = response.bytes()?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn post(&self, endpoint: Endpoint, payload: &WorkoutPayload) -> Result<Vec<u8>, ApiError> {
        let url = self.url(endpoint.path());
        debug!(%url, "posting workout payload");
        let response = self.http.post(url).json(payload).send()?;
        if !response.status().is_success() {
            return Err(failure(response, endpoint.fallback_detail()));
        }
        Ok(response.bytes()?.to_vec())
    }
}

/// Turn a non-2xx response into an error carrying its `detail` field.
fn failure(response: reqwest::blocking::Response, fallback: &str) -> ApiError {
    let status = response.status().as_u16();
    let detail = response
        .bytes()
        .ok()
        .and_then(|body| serde_json::from_slice::<ErrorBody>(&body).ok())
        .and_then(|body| body.detail)
        .unwrap_or_else(|| fallback.to_string());
    ApiError::Backend { status, detail }
}
