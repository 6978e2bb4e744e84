//! Text preprocessing before embedding generation
//!
//! Questions arrive straight from a chat box, so they are normalized the same
//! way regardless of the backend that embeds them.

use tracing::debug;
use tracing::warn;

use crate::errors::FeedbackRagError;

/// Longest text (in characters) sent to an embedding backend
pub const MAX_EMBEDDING_CHARS: usize = 2000;

/// Preprocess text for embedding generation
///
/// This function handles:
/// - Normalizing whitespace and newlines
/// - Replacing control characters
/// - Truncating very long text at a word boundary
pub fn preprocess_text_for_embedding(text: &str) -> Result<String, FeedbackRagError> {
    let sanitized = sanitize_text(text);

    if sanitized.is_empty() {
        return Err(FeedbackRagError::ValidationError(
            "text is empty after preprocessing".to_string(),
        ));
    }

    if sanitized.chars().count() > MAX_EMBEDDING_CHARS {
        warn!(
            "Text too long ({} chars), truncating to {}",
            sanitized.chars().count(),
            MAX_EMBEDDING_CHARS
        );
        return Ok(smart_truncate_text(&sanitized, MAX_EMBEDDING_CHARS));
    }

    debug!(
        "Preprocessed text: {} -> {} chars",
        text.len(),
        sanitized.len()
    );
    Ok(sanitized)
}

/// Replace control characters and collapse all whitespace runs to one space
fn sanitize_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Truncate to `max_chars` characters, preferring the last word boundary
/// in the final quarter
fn smart_truncate_text(text: &str, max_chars: usize) -> String {
    let truncated: String = text.chars().take(max_chars).collect();
    if let Some(last_space) = truncated.rfind(' ') {
        if last_space > truncated.len() * 3 / 4 {
            return truncated[..last_space].to_string();
        }
    }
    truncated
}
