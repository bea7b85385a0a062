use std::error::Error;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use eframe::egui;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod app;
mod cli;
mod config;
mod error;
mod form;
mod models;
mod notices;
mod prefs;
mod preview;
mod routines;
mod submit;
mod tasks;
#[cfg(test)]
mod testsupport;
mod viewer;

use api::{DocumentBackend, HttpBackend};
use app::{GymLogApp, Services};
use prefs::{FilePrefStore, MemoryPrefStore, PrefStore};
use preview::ArtifactStore;
use routines::{load_routine_defaults, RoutineDefaults};
use submit::DirectorySink;

fn main() -> Result<(), Box<dyn Error>> {
    let args = cli::Args::parse();
    init_tracing(args.verbose);

    let mut config = config::load_config(args.config.as_deref())?;
    config.apply_args(&args);
    info!(base_url = %config.base_url, variant = ?config.variant, "starting gym log editor");

    let defaults = match &config.routines_file {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(json) => load_routine_defaults(&json),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read routines file, using built-in defaults");
                RoutineDefaults::default()
            }
        },
        None => RoutineDefaults::default(),
    };

    let backend = Arc::new(HttpBackend::new(&config.base_url, config.timeout)?);
    probe_health(backend.clone());

    let sink = DirectorySink::new(&config.download_dir);
    info!(dir = %sink.dir().display(), "documents will be saved here");

    let (sidebar_store, theme_store): (Box<dyn PrefStore>, Box<dyn PrefStore>) = if args.no_prefs {
        (Box::new(MemoryPrefStore::default()), Box::new(MemoryPrefStore::default()))
    } else {
        (
            Box::new(FilePrefStore::new(&config.prefs_path)),
            Box::new(FilePrefStore::new(&config.prefs_path)),
        )
    };

    let services = Services {
        backend: backend as Arc<dyn DocumentBackend>,
        sink: Arc::new(sink),
        variant: config.variant,
        defaults,
        sidebar_store,
        theme_store,
        artifacts: ArtifactStore::in_temp_dir(),
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 900.0])
            .with_min_inner_size([360.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Gym Log Editor",
        options,
        Box::new(move |cc| Ok(Box::new(GymLogApp::new(cc, services)))),
    )?;
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Log whether the backend answers its health check. Never blocks startup.
fn probe_health(backend: Arc<HttpBackend>) {
    let spawned = thread::Builder::new()
        .name("gymlog-health".to_string())
        .spawn(move || match backend.health() {
            Ok(true) => info!(base_url = backend.base_url(), "backend is healthy"),
            Ok(false) => warn!(base_url = backend.base_url(), "backend reported an unhealthy status"),
            Err(e) => warn!(base_url = backend.base_url(), error = %e, "backend health check failed"),
        });
    if let Err(e) = spawned {
        warn!(error = %e, "could not start health check");
    }
}
