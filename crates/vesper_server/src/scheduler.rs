//! Cron trigger loop.
//!
//! Each tick lists active schedules and runs the ones whose cron expression
//! has an occurrence since their last terminal run. Due schedules run one
//! after another.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use vesper_core::{CronTrigger, Trigger};
use vesper_error::DatabaseError;
use vesper_pipeline::ContentPipeline;

/// Periodically runs due schedules.
#[derive(Debug, Clone)]
pub struct TriggerLoop {
    pipeline: Arc<ContentPipeline>,
    every: Duration,
}

impl TriggerLoop {
    /// Loop checking every `every`.
    pub fn new(pipeline: Arc<ContentPipeline>, every: Duration) -> Self {
        Self { pipeline, every }
    }

    /// Runs every schedule due at `now` and returns the ids that ran.
    ///
    /// A run that fails still counts as having run; its failure is in the
    /// run log.
    ///
    /// # Errors
    ///
    /// Returns an error only if the active schedules cannot be listed.
    #[instrument(skip(self))]
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, DatabaseError> {
        let store = self.pipeline.store();
        let schedules = store.list_active_schedules().await?;
        let mut ran = Vec::new();

        for schedule in schedules {
            let trigger = CronTrigger::new(schedule.cron_expression().clone());
            if !trigger.is_valid() {
                warn!(
                    schedule = %schedule.name(),
                    cron = %trigger.expression(),
                    "Invalid cron expression, skipping"
                );
                continue;
            }

            let last_run = match store.last_terminal_run(*schedule.id()).await {
                Ok(last_run) => last_run,
                Err(e) => {
                    error!(schedule = %schedule.name(), error = %e, "Cannot read last run");
                    continue;
                }
            };

            let check = trigger.check(last_run, now);
            if !check.should_run {
                debug!(schedule = %schedule.name(), next_run = ?check.next_run, "Not due");
                continue;
            }

            info!(schedule = %schedule.name(), "Running due schedule");
            if let Err(e) = self.pipeline.run(*schedule.id()).await {
                warn!(schedule = %schedule.name(), error = %e.kind, "Scheduled run failed");
            }
            ran.push(*schedule.id());
        }

        Ok(ran)
    }

    /// Ticks forever.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.every);
        info!(interval_secs = self.every.as_secs(), "Trigger loop started");
        loop {
            interval.tick().await;
            if let Err(e) = self.tick(Utc::now()).await {
                error!(error = %e, "Trigger loop tick failed");
            }
        }
    }

    /// Runs [`TriggerLoop::run`] on the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
