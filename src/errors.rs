use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedbackRagError {
    /// Missing or invalid credentials, paths, or settings. Never retried.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The persisted vector index is missing, corrupt, untrusted, or built
    /// for a different embedding model.
    #[error("Index load error: {0}")]
    LoadError(String),

    #[error("Retrieval error: {0}")]
    RetrievalError(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    /// The language model call failed or returned an unusable response.
    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Invalid input: {0}")]
    ValidationError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for FeedbackRagError {
    fn from(err: reqwest::Error) -> Self {
        Self::HttpError(err.to_string())
    }
}

impl FeedbackRagError {
    /// Whether the error stems from configuration or persisted state and
    /// will not go away without operator action.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigError(_) | Self::LoadError(_) | Self::TomlParsing(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FeedbackRagError>;
