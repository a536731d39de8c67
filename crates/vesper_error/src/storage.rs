//! Media storage error types.

/// Kinds of storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum StorageErrorKind {
    /// I/O error during a filesystem operation
    #[display("I/O error: {}", _0)]
    Io(String),
    /// Downloading a transient asset failed
    #[display("Download failed: {}", _0)]
    Download(String),
    /// Durable upload was rejected
    #[display("Upload failed (status {}): {}", status, message)]
    Upload {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },
    /// Invalid storage configuration
    #[display("Invalid configuration: {}", _0)]
    InvalidConfig(String),
}

/// Storage error with location tracking.
///
/// # Examples
///
/// ```
/// use vesper_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::Download("status 404".to_string()));
/// assert!(format!("{}", err).contains("Download failed: status 404"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The kind of error that occurred
    pub kind: StorageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StorageError {
    /// Create a new storage error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
