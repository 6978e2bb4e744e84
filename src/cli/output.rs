//! CLI output formatting utilities

use crate::models::ScoredDocument;
use crate::rag::ContextAssembler;
use crate::AppConfig;

/// Safely truncate a string at character boundary (not byte boundary)
///
/// Returns the original string when it fits, otherwise the first
/// `max_chars` characters followed by "..."
#[must_use]
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// Print the answer block
pub fn print_answer(answer: &str) {
    println!("\n{}", "═".repeat(80));
    println!("📝 Answer:\n");
    println!("{}", answer.trim());
    println!("{}", "═".repeat(80));
}

/// Print ranked feedback, one line per excerpt
pub fn print_sources(results: &[ScoredDocument]) {
    println!("\n📚 Sources ({} excerpts):", results.len());
    for (idx, result) in results.iter().enumerate() {
        println!(
            "  {}. [{:.3}] {}",
            idx + 1,
            result.score,
            truncate_str(&ContextAssembler::format_line(&result.document), 160)
        );
    }
}

/// Numbered summary of retrieved feedback for `search`
#[must_use]
pub fn format_summary(results: &[ScoredDocument]) -> String {
    if results.is_empty() {
        return "No feedback found.".to_string();
    }

    let mut summary = format!("Found {} relevant feedback excerpt(s):\n\n", results.len());

    for (idx, result) in results.iter().enumerate() {
        summary.push_str(&format!(
            "{}. [{} | {}] Score: {:.3}\n   {}\n\n",
            idx + 1,
            result.document.metadata.category_or_default(),
            result.document.metadata.area_or_default(),
            result.score,
            truncate_str(&result.document.text, 120)
        ));
    }

    summary
}

/// Print configuration
pub fn print_config(config: &AppConfig) {
    println!("📋 feedback-rag configuration:");
    println!();

    println!("📝 Logging:");
    println!("  Level: {}", config.logging.level);
    println!();

    println!("🧠 Embeddings:");
    println!("  Provider: {:?}", config.embeddings.provider);
    println!("  Model: {}", config.embedding_model());
    println!("  Dimension: {}", config.embedding_dimension());
    println!();

    println!("🗂️  Index:");
    println!("  Path: {}", config.index_path().display());
    println!("  Trusted root: {}", config.index.trusted_root.display());
    println!("  Require checksum: {}", config.index.require_checksum);
    println!();

    println!("🤖 LLM:");
    println!("  Endpoint: {}", config.llm_endpoint());
    println!("  Model: {}", config.llm_model());
    println!(
        "  Key: {}",
        if config.has_llm_api_key() {
            "configured"
        } else {
            "missing"
        }
    );
    println!("  Enforce format: {}", config.llm.enforce_format);
    println!("  Default top_k: {}", config.default_top_k());
}

pub fn print_info(msg: &str) {
    println!("ℹ️  {msg}");
}

pub fn print_success(msg: &str) {
    println!("✅ {msg}");
}

pub fn print_warning(msg: &str) {
    println!("⚠️  {msg}");
}

pub fn print_error(msg: &str) {
    eprintln!("❌ {msg}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeedbackDocument;

    fn scored(text: &str, category: Option<&str>, area: Option<&str>, score: f32) -> ScoredDocument {
        ScoredDocument {
            document: FeedbackDocument::new(text, category, area),
            score,
        }
    }

    #[test]
    fn test_summary_lists_every_result() {
        let results = vec![
            scored("a", Some("Delivery"), Some("Koramangala"), 0.91),
            scored("b", None, None, 0.5),
        ];
        let summary = format_summary(&results);
        assert!(summary.starts_with("Found 2 relevant"));
        assert!(summary.contains("1. [Delivery | Koramangala] Score: 0.910"));
        assert!(summary.contains("2. [unknown | unknown]"));
    }

    #[test]
    fn test_summary_of_nothing() {
        assert_eq!(format_summary(&[]), "No feedback found.");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate_str("दूध देर से आया", 3), "दूध...");
        assert_eq!(truncate_str("short", 10), "short");
    }
}
