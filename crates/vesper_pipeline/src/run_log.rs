//! Operator-facing run log.
//!
//! Writing a log entry can fail like any other write. Those failures are
//! reported through `tracing` only and never interrupt a run.

use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;
use vesper_core::{RunLogEntry, RunStatus};
use vesper_database::Store;
use vesper_error::PipelineError;

/// Appends run log entries for one store.
#[derive(Clone)]
pub struct RunLogger {
    store: Arc<dyn Store>,
}

impl RunLogger {
    /// Logger writing to `store`.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Appends one entry.
    pub async fn log(
        &self,
        schedule_id: Uuid,
        content_id: Option<Uuid>,
        status: RunStatus,
        message: impl Into<String>,
        details: Value,
    ) {
        let entry = RunLogEntry::new(schedule_id, content_id, status, message, details);
        debug!(
            schedule_id = %schedule_id,
            status = %entry.status,
            message = %entry.message,
            "Run log"
        );
        if let Err(e) = self.store.append_run_log(entry).await {
            error!(schedule_id = %schedule_id, error = %e, "Failed to write run log entry");
        }
    }

    /// Stage entry or intermediate outcome.
    pub async fn processing(
        &self,
        schedule_id: Uuid,
        content_id: Option<Uuid>,
        message: impl Into<String>,
        details: Value,
    ) {
        self.log(schedule_id, content_id, RunStatus::Processing, message, details)
            .await;
    }

    /// Terminal success.
    pub async fn success(
        &self,
        schedule_id: Uuid,
        content_id: Option<Uuid>,
        message: impl Into<String>,
        details: Value,
    ) {
        self.log(schedule_id, content_id, RunStatus::Success, message, details)
            .await;
    }

    /// Terminal failure, with the error and where it was raised.
    pub async fn failure(
        &self,
        schedule_id: Uuid,
        content_id: Option<Uuid>,
        stage: &str,
        err: &PipelineError,
    ) {
        self.log(
            schedule_id,
            content_id,
            RunStatus::Error,
            err.kind.to_string(),
            json!({
                "stage": stage,
                "error": err.to_string(),
                "location": format!("{}:{}", err.file, err.line),
            }),
        )
        .await;
    }
}

impl std::fmt::Debug for RunLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLogger").finish_non_exhaustive()
    }
}
