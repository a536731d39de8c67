//! Translation outbox worker.
//!
//! Runs enqueue a task row and ring an [`OutboxSignal`]. The worker drains
//! pending tasks when signalled and on a fixed interval, so tasks left by a
//! process that stopped early are still picked up.

use crate::{PipelineMetrics, Translator};
use crate::selector::persistence;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use vesper_core::{TaskStatus, TranslationPayload, TranslationTask};
use vesper_database::Store;
use vesper_error::PipelineError;

/// Default number of tasks claimed per drain.
pub const DEFAULT_BATCH_SIZE: usize = 10;
/// Default attempts before a task is marked failed.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

/// Wakes the outbox worker without waiting for it.
#[derive(Debug, Clone, Default)]
pub struct OutboxSignal {
    notify: Arc<Notify>,
}

impl OutboxSignal {
    /// New, unsignalled handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the worker to drain. A signal sent while the worker is busy is kept.
    pub fn notify(&self) {
        self.notify.notify_one();
    }

    /// Resolves once signalled.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}

/// Counts from one drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Tasks claimed
    pub claimed: usize,
    /// Tasks that finished every language
    pub completed: usize,
    /// Tasks left pending with fewer languages
    pub rescheduled: usize,
    /// Tasks that ran out of attempts
    pub failed: usize,
}

/// Drains pending translation tasks.
pub struct OutboxWorker {
    store: Arc<dyn Store>,
    translator: Translator,
    signal: OutboxSignal,
    batch_size: usize,
    max_attempts: i32,
    metrics: Option<PipelineMetrics>,
    drain_lock: Mutex<()>,
}

impl OutboxWorker {
    /// Worker translating with `translator`, woken by `signal`.
    pub fn new(store: Arc<dyn Store>, translator: Translator, signal: OutboxSignal) -> Self {
        Self {
            store,
            translator,
            signal,
            batch_size: DEFAULT_BATCH_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            metrics: None,
            drain_lock: Mutex::new(()),
        }
    }

    /// Tasks claimed per drain.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Attempts before a task is marked failed.
    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Records per-language failures.
    pub fn with_metrics(mut self, metrics: PipelineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Signal handle that wakes this worker.
    pub fn signal(&self) -> OutboxSignal {
        self.signal.clone()
    }

    /// Processes up to one batch of pending tasks.
    ///
    /// Concurrent calls are serialized.
    #[instrument(skip(self), fields(batch_size = self.batch_size))]
    pub async fn drain_once(&self) -> Result<DrainReport, PipelineError> {
        let _guard = self.drain_lock.lock().await;

        let tasks = self
            .store
            .pending_tasks(self.batch_size)
            .await
            .map_err(persistence)?;
        let mut report = DrainReport {
            claimed: tasks.len(),
            ..Default::default()
        };
        if tasks.is_empty() {
            debug!("Outbox empty");
            return Ok(report);
        }

        for task in tasks {
            match self.process(&task).await {
                Ok(TaskStatus::Done) => report.completed += 1,
                Ok(TaskStatus::Pending) => report.rescheduled += 1,
                Ok(TaskStatus::Failed) => report.failed += 1,
                Err(e) => error!(task_id = %task.id, error = %e, "Outbox task bookkeeping failed"),
            }
        }

        info!(
            claimed = report.claimed,
            completed = report.completed,
            rescheduled = report.rescheduled,
            failed = report.failed,
            "Outbox drained"
        );
        Ok(report)
    }

    #[instrument(skip(self, task), fields(task_id = %task.id, content_id = %task.content_id))]
    async fn process(&self, task: &TranslationTask) -> Result<TaskStatus, PipelineError> {
        let payload = match &task.payload {
            Some(payload) => payload.clone(),
            None => match self
                .store
                .get_content(task.content_id)
                .await
                .map_err(persistence)?
            {
                Some(content) => TranslationPayload {
                    title: content.title,
                    summary: content.summary,
                    content: content.body,
                },
                None => {
                    warn!("Content no longer exists");
                    // Missing content cannot succeed on a later attempt.
                    return self
                        .store
                        .reschedule_task(
                            task.id,
                            task.languages.clone(),
                            "content not found".to_string(),
                            1,
                        )
                        .await
                        .map_err(persistence);
                }
            },
        };

        let outcome = self
            .translator
            .translate_all(&*self.store, task.content_id, &payload, &task.languages)
            .await;

        if let Some(metrics) = &self.metrics {
            for language in &outcome.failed {
                metrics.record_translation_failure(language);
            }
        }

        if outcome.is_complete() {
            self.store
                .complete_task(task.id)
                .await
                .map_err(persistence)?;
            return Ok(TaskStatus::Done);
        }

        let error = outcome
            .errors
            .iter()
            .map(|(language, reason)| format!("{}: {}", language, reason))
            .collect::<Vec<_>>()
            .join("; ");
        let status = self
            .store
            .reschedule_task(task.id, outcome.failed, error, self.max_attempts)
            .await
            .map_err(persistence)?;
        if status == TaskStatus::Failed {
            warn!(attempts = task.attempts + 1, "Translation task out of attempts");
        }
        Ok(status)
    }

    /// Drains whenever signalled and at least every `every`.
    pub async fn run(self: Arc<Self>, every: Duration) {
        let mut interval = tokio::time::interval(every);
        info!(interval_secs = every.as_secs(), "Outbox worker started");
        loop {
            tokio::select! {
                _ = self.signal.notified() => debug!("Outbox signalled"),
                _ = interval.tick() => {}
            }
            if let Err(e) = self.drain_once().await {
                error!(error = %e, "Outbox drain failed");
            }
        }
    }

    /// Runs [`OutboxWorker::run`] on the current runtime.
    pub fn spawn(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(self.run(every))
    }
}

impl std::fmt::Debug for OutboxWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboxWorker")
            .field("batch_size", &self.batch_size)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}
