//! Configuration: TOML file, then `GYMLOG_*` env vars, then CLI flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cli::Args;
use crate::error::ConfigError;
use crate::models::BackendVariant;

pub const CONFIG_FILE_NAME: &str = "gymlog.toml";
const APP_DIR: &str = "gymlog";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    backend: BackendSection,
    downloads: DownloadsSection,
    routines: RoutinesSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BackendSection {
    base_url: Option<String>,
    variant: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DownloadsSection {
    dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RoutinesSection {
    file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub base_url: String,
    pub variant: BackendVariant,
    /// `None` leaves requests without a client-side timeout.
    pub timeout: Option<Duration>,
    pub download_dir: PathBuf,
    pub routines_file: Option<PathBuf>,
    pub prefs_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: "http://localhost:8000".to_string(),
            variant: BackendVariant::V2,
            timeout: None,
            download_dir: default_download_dir(),
            routines_file: None,
            prefs_path: default_prefs_path(),
        }
    }
}

impl Config {
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(url) = &args.base_url {
            self.base_url = url.clone();
        }
        if let Some(variant) = args.variant {
            self.variant = variant;
        }
    }
}

fn config_root_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_prefs_path() -> PathBuf {
    config_root_dir()
        .map(|dir| dir.join("prefs.toml"))
        .unwrap_or_else(|| PathBuf::from("gymlog-prefs.toml"))
}

/// Load configuration from disk and environment.
///
/// `path_override` is an explicit config file path (from --config flag).
pub fn load_config(path_override: Option<&str>) -> Result<Config, ConfigError> {
    load_config_from_sources(
        path_override,
        |path| std::fs::read_to_string(path),
        |name| std::env::var(name).ok(),
        config_root_dir,
    )
}

fn load_config_from_sources<FRead, FEnv, FRoot>(
    path_override: Option<&str>,
    read_file: FRead,
    env_lookup: FEnv,
    config_root: FRoot,
) -> Result<Config, ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FEnv: Fn(&str) -> Option<String>,
    FRoot: Fn() -> Option<PathBuf>,
{
    let text = read_config_text(path_override, &read_file, &config_root)?;
    let parsed: FileConfig = toml::from_str(&text)?;
    let mut config = Config::default();

    if let Some(url) = parsed.backend.base_url {
        config.base_url = url;
    }
    if let Some(raw) = parsed.backend.variant {
        config.variant = parse_variant(&raw, "backend.variant")?;
    }
    config.timeout = parsed
        .backend
        .timeout_secs
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);
    if let Some(dir) = parsed.downloads.dir {
        config.download_dir = dir;
    }
    config.routines_file = parsed.routines.file;

    if let Some(url) = env_lookup("GYMLOG_BASE_URL") {
        config.base_url = url;
    }
    if let Some(raw) = env_lookup("GYMLOG_VARIANT") {
        config.variant = parse_variant(&raw, "GYMLOG_VARIANT")?;
    }

    if config.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("backend.base_url cannot be empty".to_string()));
    }
    Ok(config)
}

fn parse_variant(raw: &str, source: &str) -> Result<BackendVariant, ConfigError> {
    BackendVariant::parse(raw).ok_or_else(|| {
        ConfigError::Invalid(format!("invalid {source} value `{raw}`: expected \"v1\" or \"v2\""))
    })
}

/// Explicit path must exist; the implicit locations are optional.
fn read_config_text<FRead, FRoot>(
    path_override: Option<&str>,
    read_file: &FRead,
    config_root: &FRoot,
) -> Result<String, ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FRoot: Fn() -> Option<PathBuf>,
{
    if let Some(path) = path_override {
        return Ok(read_file(Path::new(path))?);
    }

    let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(root) = config_root() {
        candidates.push(root.join(CONFIG_FILE_NAME));
    }
    for candidate in candidates {
        match read_file(&candidate) {
            Ok(text) => return Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn not_found() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::NotFound, "missing")
    }

    fn load(
        files: &[(&str, &str)],
        env: &[(&str, &str)],
        path_override: Option<&str>,
    ) -> Result<Config, ConfigError> {
        let files: HashMap<PathBuf, String> = files
            .iter()
            .map(|(p, t)| (PathBuf::from(p), t.to_string()))
            .collect();
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        load_config_from_sources(
            path_override,
            |path| files.get(path).cloned().ok_or_else(not_found),
            |name| env.get(name).cloned(),
            || Some(PathBuf::from("/home/u/.config/gymlog")),
        )
    }

    #[test]
    fn defaults_without_any_file() {
        let config = load(&[], &[], None).unwrap();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.variant, BackendVariant::V2);
        assert_eq!(config.timeout, None);
        assert_eq!(config.routines_file, None);
    }

    #[test]
    fn reads_user_config_dir_file() {
        let config = load(
            &[(
                "/home/u/.config/gymlog/gymlog.toml",
                "[backend]\nbase_url = \"http://gym:8000\"\nvariant = \"v1\"\ntimeout_secs = 20\n\n[downloads]\ndir = \"/tmp/logs\"\n",
            )],
            &[],
            None,
        )
        .unwrap();
        assert_eq!(config.base_url, "http://gym:8000");
        assert_eq!(config.variant, BackendVariant::V1);
        assert_eq!(config.timeout, Some(Duration::from_secs(20)));
        assert_eq!(config.download_dir, PathBuf::from("/tmp/logs"));
    }

    #[test]
    fn local_file_wins_over_user_dir() {
        let config = load(
            &[
                ("gymlog.toml", "[backend]\nbase_url = \"http://local\"\n"),
                ("/home/u/.config/gymlog/gymlog.toml", "[backend]\nbase_url = \"http://global\"\n"),
            ],
            &[],
            None,
        )
        .unwrap();
        assert_eq!(config.base_url, "http://local");
    }

    #[test]
    fn zero_timeout_means_none() {
        let config = load(&[("gymlog.toml", "[backend]\ntimeout_secs = 0\n")], &[], None).unwrap();
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn env_overrides_file() {
        let config = load(
            &[("gymlog.toml", "[backend]\nbase_url = \"http://file\"\nvariant = \"v2\"\n")],
            &[("GYMLOG_BASE_URL", "http://env"), ("GYMLOG_VARIANT", "V1")],
            None,
        )
        .unwrap();
        assert_eq!(config.base_url, "http://env");
        assert_eq!(config.variant, BackendVariant::V1);
    }

    #[test]
    fn cli_overrides_env() {
        let mut config = load(&[], &[("GYMLOG_BASE_URL", "http://env")], None).unwrap();
        let args = <Args as clap::Parser>::parse_from(["gymLogEditor", "--base-url", "http://cli"]);
        config.apply_args(&args);
        assert_eq!(config.base_url, "http://cli");
    }

    #[test]
    fn explicit_path_must_exist() {
        let err = load(&[], &[], Some("/nope/gymlog.toml")).unwrap_err();
        assert!(err.to_string().starts_with("io:"), "got: {err}");
    }

    #[test]
    fn bad_variant_is_invalid() {
        let err = load(&[("gymlog.toml", "[backend]\nvariant = \"v9\"\n")], &[], None).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_is_reported() {
        let err = load(&[("gymlog.toml", "[backend\n")], &[], None).unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
