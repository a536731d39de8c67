//! Finalized and persisted content.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Editorial status of a generated record.
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
pub enum ContentStatus {
    /// Awaiting editorial review
    Draft,
    /// Visible to readers
    Published,
}

impl ContentStatus {
    /// Status for a schedule's `publish_automatically` flag.
    pub fn for_auto_publish(publish_automatically: bool) -> Self {
        if publish_automatically {
            ContentStatus::Published
        } else {
            ContentStatus::Draft
        }
    }
}

/// Schema-validated output of the refinement chain.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct FinalizedContent {
    /// Article title
    title: String,
    /// URL-safe slug
    slug: String,
    /// Markdown body
    body: String,
    /// Short summary
    #[builder(default)]
    summary: Option<String>,
    /// Title for search engines
    seo_title: String,
    /// Description for search engines
    seo_description: String,
}

impl FinalizedContent {
    /// Returns a builder for constructing FinalizedContent.
    pub fn builder() -> FinalizedContentBuilder {
        FinalizedContentBuilder::default()
    }

    /// Same content with a different slug.
    pub fn with_slug(self, slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            ..self
        }
    }
}

/// Insertable content record.
#[derive(Debug, Clone, PartialEq, Getters, derive_builder::Builder)]
#[builder(setter(into))]
pub struct NewContent {
    /// Schedule that produced the record
    schedule_id: Uuid,
    /// Author the record is attributed to
    author_id: Uuid,
    /// Finalized text fields
    content: FinalizedContent,
    /// Draft or published
    status: ContentStatus,
    /// Set when status is published
    #[builder(default)]
    published_at: Option<DateTime<Utc>>,
    /// Durable cover image
    #[builder(default)]
    image_url: Option<String>,
    /// Language the record is written in
    source_language: String,
}

impl NewContent {
    /// Returns a builder for constructing NewContent.
    pub fn builder() -> NewContentBuilder {
        NewContentBuilder::default()
    }
}

/// Content record as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    /// Record identifier
    pub id: Uuid,
    /// Schedule that produced the record
    pub schedule_id: Option<Uuid>,
    /// Author the record is attributed to
    pub author_id: Uuid,
    /// Article title
    pub title: String,
    /// Unique URL-safe slug
    pub slug: String,
    /// Markdown body
    pub body: String,
    /// Short summary
    pub summary: Option<String>,
    /// Title for search engines
    pub seo_title: String,
    /// Description for search engines
    pub seo_description: String,
    /// Draft or published
    pub status: ContentStatus,
    /// Publication timestamp
    pub published_at: Option<DateTime<Utc>>,
    /// Durable cover image
    pub image_url: Option<String>,
    /// Language the record is written in
    pub source_language: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}
