use serde::Deserialize;
use serde::Serialize;

/// Placeholder shown for a metadata field the document does not carry
pub const UNKNOWN_METADATA: &str = "unknown";

/// Structured attributes attached to a feedback document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedbackMetadata {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
}

impl FeedbackMetadata {
    /// Category, or the placeholder when absent or blank
    #[must_use]
    pub fn category_or_default(&self) -> &str {
        non_blank(self.category.as_deref())
    }

    /// Area, or the placeholder when absent or blank
    #[must_use]
    pub fn area_or_default(&self) -> &str {
        non_blank(self.area.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => UNKNOWN_METADATA,
    }
}

/// A single piece of customer feedback as stored in the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackDocument {
    pub text: String,
    #[serde(default)]
    pub metadata: FeedbackMetadata,
}

impl FeedbackDocument {
    pub fn new(text: impl Into<String>, category: Option<&str>, area: Option<&str>) -> Self {
        Self {
            text: text.into(),
            metadata: FeedbackMetadata {
                category: category.map(str::to_string),
                area: area.map(str::to_string),
            },
        }
    }
}

/// A retrieved document with its similarity to the question
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: FeedbackDocument,
    pub score: f32,
}

/// Ranked retrieval output, best match first
pub type RetrievalResult = Vec<ScoredDocument>;
