//! Generation service error types.

/// Error conditions reported by text and image generation services.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelErrorKind {
    /// Credential for the provider is not configured
    MissingCredential(String),
    /// Request could not be sent or the connection failed
    Request(String),
    /// Service returned a non-success status
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or error message
        message: String,
    },
    /// Response body could not be decoded
    ResponseParsing(String),
    /// Service answered but produced no usable output
    EmptyResponse,
}

impl std::fmt::Display for ModelErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelErrorKind::MissingCredential(var) => {
                write!(f, "Credential not configured: {}", var)
            }
            ModelErrorKind::Request(msg) => write!(f, "Request failed: {}", msg),
            ModelErrorKind::Api { status, message } => {
                write!(f, "API error (status {}): {}", status, message)
            }
            ModelErrorKind::ResponseParsing(msg) => write!(f, "Response parsing failed: {}", msg),
            ModelErrorKind::EmptyResponse => write!(f, "Service returned no output"),
        }
    }
}

/// Generation service error with source location tracking.
///
/// # Examples
///
/// ```
/// use vesper_error::{ModelError, ModelErrorKind};
///
/// let err = ModelError::new(ModelErrorKind::Api {
///     status: 503,
///     message: "overloaded".to_string(),
/// });
/// assert!(format!("{}", err).contains("503"));
/// ```
#[derive(Debug, Clone)]
pub struct ModelError {
    /// The kind of error that occurred
    pub kind: ModelErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ModelError {
    /// Create a new ModelError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ModelErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Model Error: {} at line {} in {}",
            self.kind, self.line, self.file
        )
    }
}

impl std::error::Error for ModelError {}
