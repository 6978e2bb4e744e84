//! Language model access
//!
//! One prompt in, one completion out. The hosted endpoint speaks the
//! OpenAI-compatible chat completions protocol (Groq, OpenAI, Ollama's `/v1`).

pub mod prompts;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

pub use prompts::PromptTemplate;
pub use prompts::RagPrompts;

use crate::config::AppConfig;
use crate::errors::FeedbackRagError;
use crate::errors::Result;

/// A model that completes a single prompt
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;

    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: usize,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint
pub struct LlmService {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl std::fmt::Debug for LlmService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmService")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl LlmService {
    /// Create the client from application config
    ///
    /// # Errors
    /// - `ConfigError` when no API key is configured
    /// - HTTP client build errors
    pub fn new(config: &AppConfig) -> Result<Self> {
        let api_key = config.llm_api_key()?;
        Self::with_params(
            config.llm_endpoint(),
            api_key,
            config.llm_model(),
            config.llm.temperature,
            config.llm.max_tokens,
            Duration::from_secs(config.llm.timeout_secs),
        )
    }

    pub fn with_params(
        endpoint: &str,
        api_key: String,
        model: &str,
        temperature: f32,
        max_tokens: usize,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(FeedbackRagError::ConfigError(
                "LLM API key is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FeedbackRagError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            temperature,
            max_tokens,
        })
    }

    /// Send a single prompt with explicit sampling parameters
    ///
    /// # Errors
    /// - Network errors (timeouts, connection failures)
    /// - Non-success status (rate limits, auth failures)
    /// - Malformed or empty completions
    pub async fn generate_with_params(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: usize,
    ) -> Result<String> {
        let url = format!("{}/chat/completions", self.endpoint);
        debug!("Calling chat completions API: {} (model={})", url, self.model);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage::user(prompt)],
            temperature,
            max_tokens,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| FeedbackRagError::LlmError(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FeedbackRagError::LlmError(format!(
                "API error ({status}): {error_text}"
            )));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| FeedbackRagError::LlmError(format!("Failed to parse response: {e}")))?;

        result
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| FeedbackRagError::LlmError("No completion in response".to_string()))
    }
}

#[async_trait]
impl LanguageModel for LlmService {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_params(prompt, self.temperature, self.max_tokens)
            .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
