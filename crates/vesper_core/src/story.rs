//! Web stories: short multi-page visual stories.

use crate::ContentStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One page of a generated story script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryPageDraft {
    /// Caption shown on the page
    pub text: String,
    /// Prompt for the page's background image
    pub image_prompt: String,
}

/// Validated story script produced by the refinement chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryScript {
    /// Story title
    pub title: String,
    /// URL-safe slug
    pub slug: String,
    /// Short summary
    pub summary: Option<String>,
    /// Pages in reading order
    pub pages: Vec<StoryPageDraft>,
}

/// Assembled page with its durable image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryPage {
    /// Caption shown on the page
    pub text: String,
    /// Durable background image
    pub image_url: String,
}

/// Insertable web story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWebStory {
    /// Schedule that produced the story
    pub schedule_id: Uuid,
    /// Author the story is attributed to
    pub author_id: Uuid,
    /// Story title
    pub title: String,
    /// Unique slug
    pub slug: String,
    /// Short summary
    pub summary: Option<String>,
    /// Assembled pages
    pub pages: Vec<StoryPage>,
    /// Draft or published
    pub status: ContentStatus,
    /// Publication timestamp
    pub published_at: Option<DateTime<Utc>>,
    /// Language the story is written in
    pub source_language: String,
}

/// Web story as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebStory {
    /// Story identifier
    pub id: Uuid,
    /// Stored fields
    #[serde(flatten)]
    pub story: NewWebStory,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}
