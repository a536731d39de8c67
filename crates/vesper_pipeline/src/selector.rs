//! Source selection with the per-schedule ledger.

use tracing::{debug, instrument};
use vesper_core::{Schedule, Source, SourceStrategy};
use vesper_database::SourceRepository;
use vesper_error::{PipelineError, PipelineErrorKind};

/// Picks the input for one run of `schedule`.
///
/// Themes are always available. Verses are drawn at random among those the
/// schedule has not consumed; articles are the newest unconsumed one in the
/// schedule's source category. `Ok(None)` means the pool is exhausted, which
/// is a normal outcome.
///
/// # Errors
///
/// A thematic schedule without a theme is rejected as unsupported. Query
/// failures are reported as persistence errors.
#[instrument(skip_all, fields(schedule_id = %schedule.id(), strategy = ?schedule.source_strategy()))]
pub async fn select_source<R>(
    repository: &R,
    schedule: &Schedule,
) -> Result<Option<Source>, PipelineError>
where
    R: SourceRepository + ?Sized,
{
    let source = match schedule.source_strategy() {
        SourceStrategy::Theme => {
            let theme = schedule
                .theme()
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    PipelineError::new(PipelineErrorKind::UnsupportedSchedule(format!(
                        "thematic schedule '{}' has no theme",
                        schedule.name()
                    )))
                })?;
            Some(Source::Theme {
                theme: theme.to_string(),
            })
        }
        SourceStrategy::Verse => repository
            .random_unused_verse(*schedule.id())
            .await
            .map_err(persistence)?
            .map(Source::Verse),
        SourceStrategy::Article => repository
            .newest_unused_article(*schedule.id(), *schedule.source_category_id())
            .await
            .map_err(persistence)?
            .map(Source::Article),
    };

    match &source {
        Some(s) => debug!(source = %s.label(), "Selected source"),
        None => debug!("No eligible source remains"),
    }
    Ok(source)
}

#[track_caller]
pub(crate) fn persistence(e: vesper_error::DatabaseError) -> PipelineError {
    PipelineError::new(PipelineErrorKind::Persistence(e.to_string()))
}
