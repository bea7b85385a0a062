//! Background requests. Each job runs on its own thread and reports back over
//! a channel the UI drains once per frame.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use eframe::egui;
use tracing::debug;

use crate::error::{ApiError, SubmitError};
use crate::models::BackendStatus;
use crate::preview::PreviewEvent;
use crate::submit::SubmitOutcome;

#[derive(Debug)]
pub enum TaskResult {
    Templates(Result<Vec<String>, ApiError>),
    Status(Result<BackendStatus, ApiError>),
    Submitted(Result<SubmitOutcome, SubmitError>),
    Preview { ticket: u64, event: PreviewEvent },
}

/// Handle given to a job for sending results; wakes the UI on every send.
#[derive(Clone)]
pub struct Reporter {
    tx: Sender<TaskResult>,
    ctx: Option<egui::Context>,
}

impl Reporter {
    pub fn send(&self, result: TaskResult) {
        if self.tx.send(result).is_err() {
            debug!("task result dropped, window already closed");
            return;
        }
        if let Some(ctx) = &self.ctx {
            ctx.request_repaint();
        }
    }
}

pub struct TaskRunner {
    reporter: Reporter,
    rx: Receiver<TaskResult>,
}

impl TaskRunner {
    pub fn new(ctx: Option<egui::Context>) -> Self {
        let (tx, rx) = mpsc::channel();
        TaskRunner {
            reporter: Reporter { tx, ctx },
            rx,
        }
    }

    pub fn spawn<F>(&self, name: &str, job: F)
    where
        F: FnOnce(Reporter) + Send + 'static,
    {
        let reporter = self.reporter.clone();
        let spawned = thread::Builder::new()
            .name(format!("gymlog-{name}"))
            .spawn(move || job(reporter));
        if let Err(e) = spawned {
            tracing::error!(error = %e, task = name, "could not start background task");
        }
    }

    /// Results that arrived since the last call.
    pub fn poll(&self) -> Vec<TaskResult> {
        self.rx.try_iter().collect()
    }
}
