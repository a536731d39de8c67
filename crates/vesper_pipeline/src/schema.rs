//! Output schemas the refinement chain validates against.

use crate::{ParseOutcome, extract_json_object};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use vesper_core::{FinalizedContent, StoryPageDraft, StoryScript, slugify};

/// Shortest web story accepted.
pub const MIN_STORY_PAGES: usize = 3;
/// Longest web story accepted.
pub const MAX_STORY_PAGES: usize = 10;

const SEO_DESCRIPTION_CHARS: usize = 160;

/// A JSON shape a refinement provider must produce.
pub trait RefinementSchema: Send + Sync {
    /// Validated value produced from model output.
    type Output: Send;

    /// Instruction describing the JSON object the provider must return.
    fn instruction(&self) -> &str;

    /// Parses raw model output. Never panics and never errors.
    fn parse(&self, raw: &str) -> ParseOutcome<Self::Output>;
}

/// Lenient view of a refined article as models actually emit it.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawArticle {
    title: Option<String>,
    slug: Option<String>,
    #[serde(alias = "content", alias = "markdown")]
    body: Option<String>,
    #[serde(alias = "excerpt")]
    summary: Option<String>,
    #[serde(alias = "seoTitle", alias = "meta_title")]
    seo_title: Option<String>,
    #[serde(alias = "seoDescription", alias = "meta_description")]
    seo_description: Option<String>,
}

/// Schema for a finalized article.
///
/// `title` and `body` are required. A missing slug is derived from the title,
/// a missing SEO title falls back to the title and a missing SEO description
/// to the summary or the start of the body.
#[derive(Debug, Clone)]
pub struct ArticleSchema {
    instruction: String,
}

impl ArticleSchema {
    /// Schema with the default refinement instruction.
    pub fn new() -> Self {
        Self {
            instruction: crate::prompts::REFINE_INSTRUCTION.to_string(),
        }
    }
}

impl Default for ArticleSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl RefinementSchema for ArticleSchema {
    type Output = FinalizedContent;

    fn instruction(&self) -> &str {
        &self.instruction
    }

    fn parse(&self, raw: &str) -> ParseOutcome<FinalizedContent> {
        let article: RawArticle = match parse_object(raw) {
            Ok(article) => article,
            Err(reason) => return ParseOutcome::malformed(raw, reason),
        };

        let Some(title) = non_blank(article.title) else {
            return ParseOutcome::malformed(raw, "missing title");
        };
        let Some(body) = non_blank(article.body) else {
            return ParseOutcome::malformed(raw, "missing body");
        };

        let slug = non_blank(article.slug)
            .map(|s| slugify(&s))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| slugify(&title));
        if slug.is_empty() {
            return ParseOutcome::malformed(raw, "title yields an empty slug");
        }

        let summary = non_blank(article.summary);
        let seo_title = non_blank(article.seo_title).unwrap_or_else(|| title.clone());
        let seo_description = non_blank(article.seo_description)
            .or_else(|| summary.clone())
            .unwrap_or_else(|| truncate_chars(&body, SEO_DESCRIPTION_CHARS));

        match FinalizedContent::builder()
            .title(title)
            .slug(slug)
            .body(body)
            .summary(summary)
            .seo_title(seo_title)
            .seo_description(seo_description)
            .build()
        {
            Ok(content) => ParseOutcome::Parsed(content),
            Err(e) => ParseOutcome::malformed(raw, e.to_string()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStory {
    title: Option<String>,
    slug: Option<String>,
    summary: Option<String>,
    pages: Vec<RawStoryPage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStoryPage {
    text: Option<String>,
    #[serde(alias = "imagePrompt")]
    image_prompt: Option<String>,
}

/// Schema for a web story script.
#[derive(Debug, Clone)]
pub struct StorySchema {
    instruction: String,
}

impl StorySchema {
    /// Schema with the default story instruction.
    pub fn new() -> Self {
        Self {
            instruction: crate::prompts::STORY_INSTRUCTION.to_string(),
        }
    }
}

impl Default for StorySchema {
    fn default() -> Self {
        Self::new()
    }
}

impl RefinementSchema for StorySchema {
    type Output = StoryScript;

    fn instruction(&self) -> &str {
        &self.instruction
    }

    fn parse(&self, raw: &str) -> ParseOutcome<StoryScript> {
        let story: RawStory = match parse_object(raw) {
            Ok(story) => story,
            Err(reason) => return ParseOutcome::malformed(raw, reason),
        };

        let Some(title) = non_blank(story.title) else {
            return ParseOutcome::malformed(raw, "missing title");
        };
        if !(MIN_STORY_PAGES..=MAX_STORY_PAGES).contains(&story.pages.len()) {
            return ParseOutcome::malformed(
                raw,
                format!(
                    "expected {}-{} pages, got {}",
                    MIN_STORY_PAGES,
                    MAX_STORY_PAGES,
                    story.pages.len()
                ),
            );
        }

        let mut pages = Vec::with_capacity(story.pages.len());
        for (index, page) in story.pages.into_iter().enumerate() {
            let (Some(text), Some(image_prompt)) =
                (non_blank(page.text), non_blank(page.image_prompt))
            else {
                return ParseOutcome::malformed(raw, format!("page {} is incomplete", index + 1));
            };
            pages.push(StoryPageDraft { text, image_prompt });
        }

        let slug = non_blank(story.slug)
            .map(|s| slugify(&s))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| slugify(&title));
        if slug.is_empty() {
            return ParseOutcome::malformed(raw, "title yields an empty slug");
        }

        ParseOutcome::Parsed(StoryScript {
            title,
            slug,
            summary: non_blank(story.summary),
            pages,
        })
    }
}

fn parse_object<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    let json = extract_json_object(raw).ok_or_else(|| "no JSON object in output".to_string())?;
    serde_json::from_str(json).map_err(|e| format!("invalid JSON: {}", e))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}
