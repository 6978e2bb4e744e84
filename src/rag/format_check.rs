//! Shape check for root-cause answers

use std::sync::OnceLock;

use regex::Regex;

fn root_cause_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"^"?Customers are reporting that [^.!?]+? in the [^.!?]+? are facing [^.!?]+? due to [^.!?]+\."?$"#,
        )
        .expect("root-cause pattern is a valid regex")
    })
}

/// Whether `text` is a single sentence in the root-cause format.
///
/// Surrounding whitespace and one pair of double quotes are tolerated.
pub fn is_root_cause_sentence(text: &str) -> bool {
    root_cause_pattern().is_match(text.trim())
}
