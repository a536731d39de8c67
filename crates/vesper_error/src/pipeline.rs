//! Pipeline orchestration error types.

/// Terminal failure conditions of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PipelineErrorKind {
    /// No schedule exists with the requested id
    ScheduleNotFound(String),
    /// Schedule exists but is switched off
    ScheduleInactive(String),
    /// Schedule configuration cannot be executed
    UnsupportedSchedule(String),
    /// Initial draft could not be produced
    Draft(String),
    /// Every refinement provider failed; one reason per attempted provider
    RefinementExhausted(Vec<String>),
    /// Image generation, download or upload failed
    Image(String),
    /// Primary content write failed
    Persistence(String),
}

impl std::fmt::Display for PipelineErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineErrorKind::ScheduleNotFound(id) => write!(f, "Schedule '{}' not found", id),
            PipelineErrorKind::ScheduleInactive(id) => write!(f, "Schedule '{}' is inactive", id),
            PipelineErrorKind::UnsupportedSchedule(msg) => {
                write!(f, "Unsupported schedule configuration: {}", msg)
            }
            PipelineErrorKind::Draft(msg) => write!(f, "Draft generation failed: {}", msg),
            PipelineErrorKind::RefinementExhausted(reasons) => write!(
                f,
                "All refinement providers failed: {}",
                reasons.join("; ")
            ),
            PipelineErrorKind::Image(msg) => write!(f, "Image generation failed: {}", msg),
            PipelineErrorKind::Persistence(msg) => write!(f, "Content write failed: {}", msg),
        }
    }
}

/// Pipeline error with source location tracking.
///
/// # Examples
///
/// ```
/// use vesper_error::{PipelineError, PipelineErrorKind};
///
/// let err = PipelineError::new(PipelineErrorKind::RefinementExhausted(vec![
///     "primary: timeout".to_string(),
///     "fallback: invalid JSON".to_string(),
/// ]));
/// assert!(format!("{}", err).contains("fallback: invalid JSON"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Pipeline Error: {} at line {} in {}", kind, line, file)]
pub struct PipelineError {
    /// The kind of error that occurred
    pub kind: PipelineErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl PipelineError {
    /// Create a new pipeline error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PipelineErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
