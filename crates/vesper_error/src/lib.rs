//! Error types for the Vesper content pipeline.
//!
//! Every layer (configuration, model services, media storage, database and
//! pipeline orchestration) has its own error struct that records the source
//! location where it was created. [`VesperError`] wraps any of them so callers
//! can propagate with `?` across crate boundaries.

mod config;
mod database;
mod model;
mod pipeline;
mod storage;

pub use config::ConfigError;
pub use database::{DatabaseError, DatabaseErrorKind};
pub use model::{ModelError, ModelErrorKind};
pub use pipeline::{PipelineError, PipelineErrorKind};
pub use storage::{StorageError, StorageErrorKind};

/// Crate-level error variants.
#[derive(Debug, derive_more::From)]
pub enum VesperErrorKind {
    /// Configuration error
    Config(ConfigError),
    /// Generation service error
    Model(ModelError),
    /// Media storage error
    Storage(StorageError),
    /// Database error
    Database(DatabaseError),
    /// Pipeline orchestration error
    Pipeline(PipelineError),
}

impl std::fmt::Display for VesperErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VesperErrorKind::Config(e) => write!(f, "{}", e),
            VesperErrorKind::Model(e) => write!(f, "{}", e),
            VesperErrorKind::Storage(e) => write!(f, "{}", e),
            VesperErrorKind::Database(e) => write!(f, "{}", e),
            VesperErrorKind::Pipeline(e) => write!(f, "{}", e),
        }
    }
}

/// Vesper error with kind discrimination.
///
/// # Examples
///
/// ```
/// use vesper_error::{ConfigError, VesperError, VesperErrorKind};
///
/// let err: VesperError = ConfigError::new("missing draft credential").into();
/// assert!(matches!(err.kind(), VesperErrorKind::Config(_)));
/// assert!(err.to_string().contains("missing draft credential"));
/// ```
#[derive(Debug)]
pub struct VesperError(Box<VesperErrorKind>);

impl VesperError {
    /// Create a new error from a kind.
    pub fn new(kind: VesperErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &VesperErrorKind {
        &self.0
    }
}

impl std::fmt::Display for VesperError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Vesper Error: {}", self.0)
    }
}

impl std::error::Error for VesperError {}

// Generic From implementation for any type that converts to VesperErrorKind
impl<T> From<T> for VesperError
where
    T: Into<VesperErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Vesper operations.
pub type VesperResult<T> = std::result::Result<T, VesperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_errors_convert_into_vesper_error() {
        let storage: VesperError =
            StorageError::new(StorageErrorKind::Download("status 404".to_string())).into();
        assert!(matches!(storage.kind(), VesperErrorKind::Storage(_)));
        assert!(storage.to_string().starts_with("Vesper Error: Storage Error: Download failed"));

        let database: VesperError = DatabaseError::new(DatabaseErrorKind::NotFound).into();
        assert!(matches!(database.kind(), VesperErrorKind::Database(_)));

        let pipeline: VesperError =
            PipelineError::new(PipelineErrorKind::ScheduleNotFound("s-1".to_string())).into();
        assert!(pipeline.to_string().contains("Schedule 's-1' not found"));
    }
}
