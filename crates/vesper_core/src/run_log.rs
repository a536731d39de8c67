//! Operator-facing run log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse status of a pipeline run.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RunStatus {
    /// A stage has started
    Processing,
    /// The run finished, with or without new content
    Success,
    /// The run aborted
    Error,
}

impl RunStatus {
    /// Whether this status ends a run.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Processing)
    }
}

/// Append-only run log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLogEntry {
    /// Schedule the run belongs to
    pub schedule_id: Uuid,
    /// Content produced by the run, once known
    pub content_id: Option<Uuid>,
    /// Status transition
    pub status: RunStatus,
    /// Human-readable message
    pub message: String,
    /// Structured diagnostic payload
    pub details: serde_json::Value,
    /// When the entry was written
    pub created_at: DateTime<Utc>,
}

impl RunLogEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(
        schedule_id: Uuid,
        content_id: Option<Uuid>,
        status: RunStatus,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            schedule_id,
            content_id,
            status,
            message: message.into(),
            details,
            created_at: Utc::now(),
        }
    }
}
