//! Operator-defined generation schedules.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of text a schedule asks the pipeline to write.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContentKind {
    /// Reflection on a randomly chosen Bible verse
    Devotional,
    /// Article on the schedule's fixed theme
    Thematic,
    /// Summary of a source article
    Summary,
}

/// How a schedule obtains the raw input for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceStrategy {
    /// Random not-yet-used verse
    Verse,
    /// The configured theme string, always available
    Theme,
    /// Newest not-yet-used source article
    Article,
}

impl ContentKind {
    /// Source strategy implied by this kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use vesper_core::{ContentKind, SourceStrategy};
    ///
    /// assert_eq!(ContentKind::Devotional.source_strategy(), SourceStrategy::Verse);
    /// assert_eq!(ContentKind::Summary.source_strategy(), SourceStrategy::Article);
    /// ```
    pub fn source_strategy(&self) -> SourceStrategy {
        match self {
            ContentKind::Devotional => SourceStrategy::Verse,
            ContentKind::Thematic => SourceStrategy::Theme,
            ContentKind::Summary => SourceStrategy::Article,
        }
    }
}

/// Shape of the record a schedule produces.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScheduleOutput {
    /// Long-form article with one cover image and translations
    #[default]
    Article,
    /// Multi-page web story with one image per page
    WebStory,
}

/// Generation schedule, read-only to the pipeline.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Getters, derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct Schedule {
    /// Schedule identifier
    id: Uuid,
    /// Human-readable name
    name: String,
    /// Kind of text to write
    kind: ContentKind,
    /// Record shape to produce
    #[builder(default)]
    output: ScheduleOutput,
    /// Fixed theme for thematic schedules
    #[builder(default)]
    theme: Option<String>,
    /// Author the content is attributed to (also the image storage namespace)
    author_id: Uuid,
    /// Categories associated with every generated record
    #[builder(default)]
    category_ids: Vec<Uuid>,
    /// Restricts article sources to one category
    #[builder(default)]
    source_category_id: Option<Uuid>,
    /// Template for the image prompt; `{title}` and `{summary}` are substituted
    #[builder(default)]
    image_prompt_template: Option<String>,
    /// Whether a run must produce an image
    #[builder(default = "true")]
    require_image: bool,
    /// Publish immediately instead of saving a draft
    #[builder(default)]
    publish_automatically: bool,
    /// Language the content is written in
    #[builder(default = "\"en\".to_string()")]
    source_language: String,
    /// Languages to translate into after creation
    #[builder(default)]
    target_languages: Vec<String>,
    /// Inactive schedules are never run
    #[builder(default = "true")]
    active: bool,
    /// Cron expression for the trigger loop
    #[builder(default = "\"0 0 6 * * * *\".to_string()")]
    cron_expression: String,
}

impl Schedule {
    /// Returns a builder for constructing a Schedule.
    pub fn builder() -> ScheduleBuilder {
        ScheduleBuilder::default()
    }

    /// Source strategy for this schedule's kind.
    pub fn source_strategy(&self) -> SourceStrategy {
        self.kind.source_strategy()
    }

    /// Image prompt for a finalized title and summary.
    ///
    /// Falls back to the title alone when no template is configured.
    pub fn image_prompt(&self, title: &str, summary: Option<&str>) -> String {
        let Some(template) = &self.image_prompt_template else {
            return title.to_string();
        };
        let summary = summary.unwrap_or(title);

        // Single pass so substituted text is never scanned again
        let mut prompt = String::with_capacity(template.len() + title.len());
        let mut rest = template.as_str();
        while let Some(start) = rest.find('{') {
            prompt.push_str(&rest[..start]);
            let tail = &rest[start..];
            if let Some(after) = tail.strip_prefix("{title}") {
                prompt.push_str(title);
                rest = after;
            } else if let Some(after) = tail.strip_prefix("{summary}") {
                prompt.push_str(summary);
                rest = after;
            } else {
                prompt.push('{');
                rest = &tail[1..];
            }
        }
        prompt.push_str(rest);
        prompt
    }
}
