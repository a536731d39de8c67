//! Raw inputs consumed by a pipeline run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single Bible verse with its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseSource {
    /// Verse identifier
    pub id: Uuid,
    /// Book name, e.g. "John"
    pub book: String,
    /// Chapter number
    pub chapter: i32,
    /// Verse number
    pub verse: i32,
    /// Verse text
    pub text: String,
}

impl VerseSource {
    /// Human-readable reference, e.g. "John 3:16".
    pub fn reference(&self) -> String {
        format!("{} {}:{}", self.book, self.chapter, self.verse)
    }
}

/// A source article awaiting summarization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSource {
    /// Article identifier
    pub id: Uuid,
    /// Article headline
    pub title: String,
    /// Article body text
    pub body: String,
    /// Category the article belongs to
    pub category_id: Option<Uuid>,
    /// When the article became eligible
    pub published_at: DateTime<Utc>,
}

/// The atomic unit offered to one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Source {
    /// Reference-based source tracked in the ledger
    Verse(VerseSource),
    /// Fixed theme; never tracked in the ledger
    Theme {
        /// Theme text
        theme: String,
    },
    /// Article-based source tracked in the ledger
    Article(ArticleSource),
}

impl Source {
    /// Ledger identifier, `None` for themes.
    pub fn ledger_id(&self) -> Option<Uuid> {
        match self {
            Source::Verse(v) => Some(v.id),
            Source::Theme { .. } => None,
            Source::Article(a) => Some(a.id),
        }
    }

    /// Ledger kind label stored next to the source id.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Source::Verse(_) => "verse",
            Source::Theme { .. } => "theme",
            Source::Article(_) => "article",
        }
    }

    /// Short description for logs and run log messages.
    pub fn label(&self) -> String {
        match self {
            Source::Verse(v) => v.reference(),
            Source::Theme { theme } => format!("theme: {}", theme),
            Source::Article(a) => format!("article: {}", a.title),
        }
    }

    /// Text handed to the draft generator, truncated to `max_chars` characters.
    pub fn context(&self, max_chars: usize) -> String {
        let text = match self {
            Source::Verse(v) => format!("{}: \"{}\"", v.reference(), v.text),
            Source::Theme { theme } => theme.clone(),
            Source::Article(a) => format!("{}\n\n{}", a.title, a.body),
        };
        truncate_chars(&text, max_chars)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
