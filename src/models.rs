//models.rs
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Slot key -> trimmed, non-empty value.
pub type SparseMap = BTreeMap<String, String>;

/// Build a sparse map from raw field values, dropping anything blank after trimming.
///
/// Later pairs win when keys repeat.
pub fn sparse_map<I, K, V>(pairs: I) -> SparseMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: AsRef<str>,
{
    let mut map = SparseMap::new();
    for (key, raw) in pairs {
        let value = raw.as_ref().trim();
        if !value.is_empty() {
            map.insert(key.into(), value.to_string());
        }
    }
    map
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutPayload {
    pub workout_name: String,
    pub workout_date: String,
    pub template_name: String,
    pub exercises: SparseMap,
    pub sets: SparseMap,
    pub reps: SparseMap,
    pub rest: SparseMap,
    pub bonus_exercises: SparseMap,
    pub bonus_sets: SparseMap,
    pub bonus_reps: SparseMap,
    pub bonus_rest: SparseMap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentFormat {
    Docx,
    Html,
    Pdf,
}

impl DocumentFormat {
    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Docx => "docx",
            DocumentFormat::Html => "html",
            DocumentFormat::Pdf => "pdf",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentFormat::Docx => "DOCX",
            DocumentFormat::Html => "HTML",
            DocumentFormat::Pdf => "PDF",
        }
    }
}

/// Which backend generation the editor talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendVariant {
    /// Single DOCX endpoint, template picked from the server list.
    V1,
    /// HTML/PDF endpoints with a fixed HTML template.
    V2,
}

impl BackendVariant {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "v1" => Some(BackendVariant::V1),
            "v2" => Some(BackendVariant::V2),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TemplateList {
    #[serde(default)]
    pub templates: Vec<String>,
}

/// Body of `GET /api/v2/status`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct BackendStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub gotenberg_available: bool,
}

impl BackendStatus {
    pub fn v2_available(&self) -> bool {
        self.status == "available"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_map_drops_blank_and_trims() {
        let map = sparse_map([("a", "  x "), ("b", "   "), ("c", "")]);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("a").map(String::as_str), Some("x"));
    }

    #[test]
    fn sparse_map_later_pair_wins() {
        let map = sparse_map([("k", "4"), ("k", "5")]);
        assert_eq!(map.len(), 1);
        assert_eq!(map["k"], "5");
    }

    #[test]
    fn sparse_map_keeps_earlier_value_when_later_is_blank() {
        let map = sparse_map([("k", "4"), ("k", " ")]);
        assert_eq!(map["k"], "4");
    }

    #[test]
    fn payload_serializes_empty_maps_as_objects() {
        let payload = WorkoutPayload {
            workout_name: "Push".into(),
            workout_date: "2025-01-02".into(),
            template_name: "gym_log_template.html".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["workout_name"], "Push");
        assert!(json["bonus_sets"].as_object().unwrap().is_empty());
    }

    #[test]
    fn status_reports_v2_only_when_available() {
        let status: BackendStatus =
            serde_json::from_str(r#"{"status":"available","gotenberg_available":false}"#).unwrap();
        assert!(status.v2_available());
        assert!(!status.gotenberg_available);

        let degraded: BackendStatus = serde_json::from_str(r#"{"status":"degraded"}"#).unwrap();
        assert!(!degraded.v2_available());
    }

    #[test]
    fn variant_parses_case_insensitively() {
        assert_eq!(BackendVariant::parse(" V2 "), Some(BackendVariant::V2));
        assert_eq!(BackendVariant::parse("v3"), None);
    }
}
