//! Context assembly from retrieved documents

use crate::models::FeedbackDocument;
use crate::models::ScoredDocument;

/// Formats ranked feedback into the context block shown to the model
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler;

impl ContextAssembler {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// One tagged line per document, in rank order, joined by `\n`.
    ///
    /// Nothing is dropped or shortened; `top_k` is the only size bound.
    #[must_use]
    pub fn assemble(&self, results: &[ScoredDocument]) -> String {
        results
            .iter()
            .map(|result| Self::format_line(&result.document))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// `[Category: <category> | Area: <area>] <text>`
    #[must_use]
    pub fn format_line(document: &FeedbackDocument) -> String {
        format!(
            "[Category: {} | Area: {}] {}",
            document.metadata.category_or_default(),
            document.metadata.area_or_default(),
            document.text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(text: &str, category: Option<&str>, area: Option<&str>, score: f32) -> ScoredDocument {
        ScoredDocument {
            document: FeedbackDocument::new(text, category, area),
            score,
        }
    }

    #[test]
    fn test_single_document_line() {
        let results = vec![scored(
            "Milk delayed in Koramangala due to vendor stockout",
            Some("Delivery"),
            Some("Koramangala"),
            0.9,
        )];

        assert_eq!(
            ContextAssembler::new().assemble(&results),
            "[Category: Delivery | Area: Koramangala] Milk delayed in Koramangala due to vendor stockout"
        );
    }

    #[test]
    fn test_preserves_rank_order_and_line_count() {
        let results = vec![
            scored("third best", Some("Quality"), Some("HSR Layout"), 0.2),
            scored("best", Some("Delivery"), Some("Indiranagar"), 0.9),
            scored("second", Some("Pricing"), Some("Whitefield"), 0.5),
        ];

        let context = ContextAssembler::new().assemble(&results);
        let lines: Vec<&str> = context.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("third best"));
        assert!(lines[1].ends_with("best"));
        assert!(lines[2].ends_with("second"));
    }

    #[test]
    fn test_missing_metadata_uses_placeholder() {
        let results = vec![
            scored("no tags at all", None, None, 0.4),
            scored("area only", None, Some("Bellandur"), 0.3),
        ];

        let context = ContextAssembler::new().assemble(&results);
        assert_eq!(
            context,
            "[Category: unknown | Area: unknown] no tags at all\n\
             [Category: unknown | Area: Bellandur] area only"
        );
    }

    #[test]
    fn test_long_text_not_truncated() {
        let long = "stale bread ".repeat(500);
        let results = vec![scored(long.trim(), Some("Quality"), None, 0.1)];
        assert!(ContextAssembler::new().assemble(&results).ends_with(long.trim()));
    }

    #[test]
    fn test_empty_results() {
        assert_eq!(ContextAssembler::new().assemble(&[]), "");
    }
}
