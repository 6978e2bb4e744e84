//! Prompt templates for root-cause questions

use std::collections::HashMap;

/// Sentence shape every answer is asked to follow
pub const ROOT_CAUSE_FORMAT: &str =
    "Customers are reporting that <product> in the <area> are facing <issue> due to <cause>.";

/// Template with `{{name}}` placeholders
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Create a new prompt template
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Fill in the template with variables.
    ///
    /// Substitution is a single pass over the template, so placeholder-like
    /// text inside a value is never expanded. Unknown placeholders are kept.
    #[must_use]
    pub fn render(&self, values: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after_open = &rest[start + 2..];
            match after_open.find("}}") {
                Some(end) => {
                    let name = &after_open[..end];
                    match values.get(name) {
                        Some(value) => result.push_str(value),
                        None => {
                            result.push_str("{{");
                            result.push_str(name);
                            result.push_str("}}");
                        }
                    }
                    rest = &after_open[end + 2..];
                }
                None => {
                    result.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        result.push_str(rest);
        result
    }
}

/// Standard prompts used by the answer synthesizer
pub struct RagPrompts;

impl RagPrompts {
    /// Root-cause question over feedback excerpts. Variables: `context`, `question`.
    #[must_use]
    pub fn root_cause() -> PromptTemplate {
        PromptTemplate::new(format!(
            r#"You are a senior business analyst reviewing customer feedback.

Customer feedback excerpts:
{{{{context}}}}

Question:
{{{{question}}}}

Instructions:
- Identify ONE clear root cause
- Be specific about PRODUCT and LOCATION
- Do NOT give generic reasons
- Answer in ONE sentence only
- Follow this format strictly:

"{ROOT_CAUSE_FORMAT}"
"#
        ))
    }

    /// Second attempt after a reply that broke the format.
    /// Variables: `context`, `question`, `previous_answer`.
    #[must_use]
    pub fn root_cause_correction() -> PromptTemplate {
        PromptTemplate::new(format!(
            r#"{}
Your previous reply did not follow the required format:
{{{{previous_answer}}}}

Rewrite it as exactly one sentence that matches the format above, with no other text."#,
            Self::root_cause().template
        ))
    }
}

/// Build the root-cause prompt for a question and its context block
pub fn build_root_cause_prompt(question: &str, context: &str) -> String {
    let mut values = HashMap::new();
    values.insert("context".to_string(), context.to_string());
    values.insert("question".to_string(), question.to_string());
    RagPrompts::root_cause().render(&values)
}

/// Build the corrective prompt that follows a malformed answer
pub fn build_correction_prompt(question: &str, context: &str, previous_answer: &str) -> String {
    let mut values = HashMap::new();
    values.insert("context".to_string(), context.to_string());
    values.insert("question".to_string(), question.to_string());
    values.insert("previous_answer".to_string(), previous_answer.to_string());
    RagPrompts::root_cause_correction().render(&values)
}
