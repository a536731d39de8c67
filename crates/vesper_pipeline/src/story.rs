//! The web story variant of a run.
//!
//! Same source selection, drafting and fallback chain as articles, but the
//! chain produces a paged script and every page gets its own image. Pages
//! are illustrated one after another; any image failure ends the run.

use crate::pipeline::{RunStage, StageFailure, at};
use crate::{ContentPipeline, RunOutcome, StorySchema, prompts};
use serde_json::json;
use tracing::debug;
use vesper_core::{Schedule, StoryPage};

impl ContentPipeline {
    pub(crate) async fn run_story(&self, schedule: &Schedule) -> Result<RunOutcome, StageFailure> {
        let Some(source) = self.select(schedule).await? else {
            return Ok(RunOutcome::NoEligibleSource);
        };

        let draft = self.draft(schedule, &source).await?;

        self.enter(schedule, RunStage::Refining, json!({ "schema": "web_story" }))
            .await;
        let refined = self
            .refinement
            .refine(
                &StorySchema::new(),
                &prompts::story_prompt(&draft, schedule.source_language()),
            )
            .await
            .map_err(at(RunStage::Refining))?;
        if refined.used_fallback() {
            self.note_fallback(&refined.provider, &refined.failures);
        }
        let script = refined.value;

        self.enter(
            schedule,
            RunStage::ImageGeneration,
            json!({ "pages": script.pages.len() }),
        )
        .await;
        let mut pages = Vec::with_capacity(script.pages.len());
        for (index, page) in script.pages.iter().enumerate() {
            let image_url = self
                .images
                .generate(&page.image_prompt, *schedule.author_id())
                .await
                .map_err(at(RunStage::ImageGeneration))?;
            debug!(page = index + 1, "Page illustrated");
            pages.push(StoryPage {
                text: page.text.clone(),
                image_url,
            });
        }

        self.enter(schedule, RunStage::Persisting, json!({ "slug": script.slug }))
            .await;
        let page_count = pages.len();
        let story = self
            .writer
            .persist_story(schedule, script, pages)
            .await
            .map_err(at(RunStage::Persisting))?;

        let report = self.writer.post_commit_story(schedule, &source, &story).await;

        Ok(RunOutcome::StoryCreated {
            story_id: story.id,
            slug: story.story.slug,
            title: story.story.title,
            pages: page_count,
            failed_tasks: report.failed_tasks(),
        })
    }
}
