//! CLI argument parsing via clap.

use clap::Parser;

use crate::models::BackendVariant;

/// Fill in a workout log and have the backend turn it into a document.
#[derive(Debug, Parser)]
#[command(name = "gymLogEditor", version)]
pub struct Args {
    /// Path to config file (default: ./gymlog.toml or <config dir>/gymlog/gymlog.toml).
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    /// Override the backend base URL.
    #[arg(long = "base-url")]
    pub base_url: Option<String>,

    /// Override which backend generation to use.
    #[arg(long = "variant", value_enum)]
    pub variant: Option<BackendVariant>,

    /// Keep sidebar and theme preferences in memory only.
    #[arg(long = "no-prefs")]
    pub no_prefs: bool,

    /// Log at debug level.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}
