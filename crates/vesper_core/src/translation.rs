//! Translations and the outbox tasks that produce them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Fields handed to the translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationPayload {
    /// Title to translate
    pub title: String,
    /// Summary to translate
    pub summary: Option<String>,
    /// Markdown body to translate
    #[serde(alias = "body")]
    pub content: String,
}

/// One translated rendition of a content record.
///
/// At most one exists per `(content_id, language)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    /// Translated record
    pub content_id: Uuid,
    /// Target language code
    pub language: String,
    /// Translated title
    pub title: String,
    /// Translated summary
    pub summary: Option<String>,
    /// Translated markdown body
    pub body: String,
}

/// Per-language result of one fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationReport {
    /// Languages whose translation row was written
    pub succeeded: Vec<String>,
    /// Languages that failed
    pub failed: Vec<String>,
    /// Failure reason per failed language
    pub errors: BTreeMap<String, String>,
}

impl TranslationReport {
    /// Whether every requested language succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Lifecycle of an outbox task.
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
pub enum TaskStatus {
    /// Waiting for the worker
    Pending,
    /// Every language translated
    Done,
    /// Gave up after the maximum number of attempts
    Failed,
}

/// Outbox record asking for a content record to be translated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationTask {
    /// Task identifier
    pub id: Uuid,
    /// Record to translate
    pub content_id: Uuid,
    /// Languages still to translate
    pub languages: Vec<String>,
    /// Fields overriding the stored record, when the trigger supplied them
    pub payload: Option<TranslationPayload>,
    /// Current lifecycle state
    pub status: TaskStatus,
    /// Completed drain attempts
    pub attempts: i32,
    /// Error summary of the last attempt
    pub last_error: Option<String>,
    /// Enqueue timestamp
    pub created_at: DateTime<Utc>,
    /// Last state change
    pub updated_at: DateTime<Utc>,
}
