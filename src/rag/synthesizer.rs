//! Answer synthesis: one prompt, one root-cause sentence

use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use super::format_check::is_root_cause_sentence;
use crate::errors::Result;
use crate::llm::prompts::build_correction_prompt;
use crate::llm::prompts::build_root_cause_prompt;
use crate::llm::LanguageModel;

/// Wraps a language model behind the root-cause prompt
pub struct AnswerSynthesizer {
    llm: Arc<dyn LanguageModel>,
    enforce_format: bool,
}

impl AnswerSynthesizer {
    /// Plain synthesizer: the model's text is returned untouched
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            llm,
            enforce_format: false,
        }
    }

    /// When enabled, a reply that breaks the sentence format gets exactly one
    /// corrective follow-up call
    #[must_use]
    pub fn with_format_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_format = enforce;
        self
    }

    /// Ask the model for a root cause.
    ///
    /// # Errors
    /// Any model failure is returned as-is; nothing is retried.
    pub async fn synthesize(&self, question: &str, context: &str) -> Result<String> {
        let prompt = build_root_cause_prompt(question, context);
        debug!("=== LLM PROMPT ===\n{}\n=== END PROMPT ===", prompt);

        let answer = self.llm.generate(&prompt).await?;

        if !self.enforce_format || is_root_cause_sentence(&answer) {
            return Ok(answer);
        }

        warn!(
            "Answer from {} broke the root-cause format, asking once more",
            self.llm.model_name()
        );
        let correction = build_correction_prompt(question, context, answer.trim());
        let corrected = self.llm.generate(&correction).await?;

        if !is_root_cause_sentence(&corrected) {
            warn!("Corrected answer still deviates from the root-cause format");
        }
        Ok(corrected)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::errors::FeedbackRagError;

    const GOOD: &str = "Customers are reporting that milk in the Koramangala are facing late deliveries due to a vendor stockout.";

    /// Replays canned replies and records prompts
    struct ScriptedModel {
        replies: Mutex<Vec<Result<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(FeedbackRagError::LlmError("no more replies".to_string())))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn test_returns_raw_output_without_enforcement() {
        let model = ScriptedModel::new(vec![Ok("  not the format  ".to_string())]);
        let synthesizer = AnswerSynthesizer::new(model.clone());

        let answer = synthesizer.synthesize("why?", "ctx").await.unwrap();
        assert_eq!(answer, "  not the format  ");
        assert_eq!(model.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_prompt_embeds_question_and_context() {
        let model = ScriptedModel::new(vec![Ok(GOOD.to_string())]);
        let synthesizer = AnswerSynthesizer::new(model.clone());

        synthesizer
            .synthesize("why is milk late in Koramangala", "[Category: Delivery | Area: Koramangala] Milk delayed")
            .await
            .unwrap();

        let prompt = &model.prompts()[0];
        assert!(prompt.contains("why is milk late in Koramangala"));
        assert!(prompt.contains("[Category: Delivery | Area: Koramangala] Milk delayed"));
    }

    #[tokio::test]
    async fn test_model_failure_propagates_without_retry() {
        let model = ScriptedModel::new(vec![
            Err(FeedbackRagError::LlmError("timeout".to_string())),
            Ok(GOOD.to_string()),
        ]);
        let synthesizer = AnswerSynthesizer::new(model.clone()).with_format_enforcement(true);

        let err = synthesizer.synthesize("why?", "ctx").await.unwrap_err();
        assert!(matches!(err, FeedbackRagError::LlmError(_)));
        assert_eq!(model.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_enforcement_accepts_good_answer_first_time() {
        let model = ScriptedModel::new(vec![Ok(GOOD.to_string())]);
        let synthesizer = AnswerSynthesizer::new(model.clone()).with_format_enforcement(true);

        assert_eq!(synthesizer.synthesize("why?", "ctx").await.unwrap(), GOOD);
        assert_eq!(model.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_enforcement_corrects_once() {
        let model = ScriptedModel::new(vec![
            Ok("Probably logistics.".to_string()),
            Ok(GOOD.to_string()),
        ]);
        let synthesizer = AnswerSynthesizer::new(model.clone()).with_format_enforcement(true);

        assert_eq!(synthesizer.synthesize("why?", "ctx").await.unwrap(), GOOD);
        let prompts = model.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("Probably logistics."));
    }

    #[tokio::test]
    async fn test_enforcement_gives_up_after_one_correction() {
        let model = ScriptedModel::new(vec![
            Ok("Probably logistics.".to_string()),
            Ok("Still logistics.".to_string()),
            Ok(GOOD.to_string()),
        ]);
        let synthesizer = AnswerSynthesizer::new(model.clone()).with_format_enforcement(true);

        assert_eq!(
            synthesizer.synthesize("why?", "ctx").await.unwrap(),
            "Still logistics."
        );
        assert_eq!(model.prompts().len(), 2);
    }
}
