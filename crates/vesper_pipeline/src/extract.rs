//! Strict parsing of free-text model output.
//!
//! Language models wrap JSON in prose or code fences. Parsing never fails with
//! an error: it returns a [`ParseOutcome`] the refinement chain inspects.

/// Result of parsing model output against a schema.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    /// Output matched the schema
    Parsed(T),
    /// Output could not be used
    Malformed {
        /// The text as received
        raw: String,
        /// Why it was rejected
        reason: String,
    },
}

impl<T> ParseOutcome<T> {
    /// Rejects `raw` with `reason`.
    pub fn malformed(raw: &str, reason: impl Into<String>) -> Self {
        ParseOutcome::Malformed {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }

    /// Converts into a `Result`, keeping only the rejection reason.
    pub fn into_result(self) -> Result<T, String> {
        match self {
            ParseOutcome::Parsed(value) => Ok(value),
            ParseOutcome::Malformed { reason, .. } => Err(reason),
        }
    }
}

/// Returns the first balanced `{...}` region in `text`.
///
/// Braces inside JSON strings are ignored, so `{"body": "a } b"}` is
/// returned whole.
///
/// # Examples
///
/// ```
/// use vesper_pipeline::extract_json_object;
///
/// let text = "Sure! Here it is:\n```json\n{\"title\": \"Hope\"}\n```";
/// assert_eq!(extract_json_object(text), Some("{\"title\": \"Hope\"}"));
/// assert_eq!(extract_json_object("no json here"), None);
/// ```
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
