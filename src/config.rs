use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::errors::FeedbackRagError;
use crate::errors::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub backtrace: bool,
}

/// Which backend turns text into vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    /// Local sentence-transformers model through `fastembed`
    #[serde(rename = "fastembed")]
    FastEmbed,
    /// Offline feature hashing; only loads indexes built with the same hasher
    Hashing,
    /// Ollama `/api/embeddings`
    Ollama,
    /// Any OpenAI-compatible `/embeddings` endpoint
    #[serde(rename = "openai")]
    OpenAI,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_embedding_backend")]
    pub provider: EmbeddingBackend,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Where local models are downloaded (fastembed default when unset)
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

fn default_embedding_backend() -> EmbeddingBackend {
    EmbeddingBackend::FastEmbed
}

fn default_embedding_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

const fn default_embedding_dimension() -> usize {
    384
}

fn default_embedding_endpoint() -> String {
    "http://localhost:11434".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
    /// Index files must resolve to a location under this directory
    #[serde(default = "default_trusted_root")]
    pub trusted_root: PathBuf,
    #[serde(default)]
    pub require_checksum: bool,
}

fn default_index_path() -> PathBuf {
    PathBuf::from("data/feedback_index.json")
}

fn default_trusted_root() -> PathBuf {
    PathBuf::from("data")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_endpoint")]
    pub llm_endpoint: String,
    /// Inline key; leave empty to read it from `api_key_env`
    #[serde(default)]
    pub llm_key: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub enforce_format: bool,
}

fn default_llm_endpoint() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

fn default_llm_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

const fn default_temperature() -> f32 {
    0.2
}

const fn default_max_tokens() -> usize {
    256
}

const fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
}

const fn default_top_k() -> usize {
    crate::DEFAULT_TOP_K
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub embeddings: EmbeddingsConfig,
    pub index: IndexConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default config file path
    pub fn load() -> Result<Self> {
        // A missing .env is fine; the key may come from the real environment
        let _ = dotenvy::dotenv();

        // Try to load from config.toml first, then fall back to config.example.toml
        if Path::new("config.toml").exists() {
            Self::from_file("config.toml")
        } else if Path::new("config.example.toml").exists() {
            tracing::warn!(
                "Using config.example.toml. Please create config.toml for production use."
            );
            Self::from_file("config.example.toml")
        } else {
            Err(FeedbackRagError::ConfigError(
                "No config file found. Please create config.toml or config.example.toml"
                    .to_string(),
            ))
        }
    }

    /// Check values that would otherwise fail later in confusing ways
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.llm.llm_endpoint).map_err(|e| {
            FeedbackRagError::ConfigError(format!(
                "invalid llm_endpoint `{}`: {e}",
                self.llm.llm_endpoint
            ))
        })?;

        if matches!(
            self.embeddings.provider,
            EmbeddingBackend::Ollama | EmbeddingBackend::OpenAI
        ) {
            url::Url::parse(&self.embeddings.endpoint).map_err(|e| {
                FeedbackRagError::ConfigError(format!(
                    "invalid embeddings endpoint `{}`: {e}",
                    self.embeddings.endpoint
                ))
            })?;
        }

        if self.embeddings.dimension == 0 {
            return Err(FeedbackRagError::ConfigError(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(FeedbackRagError::ConfigError(format!(
                "temperature must be within [0, 2], got {}",
                self.llm.temperature
            )));
        }

        if self.retrieval.default_top_k == 0 {
            return Err(FeedbackRagError::ConfigError(
                "default_top_k must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve the LLM API key: inline `llm_key` first, then the environment.
    ///
    /// Returns `ConfigError` when neither is set.
    pub fn llm_api_key(&self) -> Result<String> {
        if !self.llm.llm_key.trim().is_empty() {
            return Ok(self.llm.llm_key.clone());
        }

        match std::env::var(&self.llm.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(FeedbackRagError::ConfigError(format!(
                "LLM API key not configured: set llm.llm_key or the {} environment variable",
                self.llm.api_key_env
            ))),
        }
    }

    /// Whether a credential is available, without exposing it
    pub fn has_llm_api_key(&self) -> bool {
        self.llm_api_key().is_ok()
    }

    /// Get embedding dimension
    pub fn embedding_dimension(&self) -> usize {
        self.embeddings.dimension
    }

    /// Get embedding model name
    pub fn embedding_model(&self) -> &str {
        &self.embeddings.model
    }

    /// Get vector index path
    pub fn index_path(&self) -> &Path {
        &self.index.path
    }

    /// Get LLM endpoint
    pub fn llm_endpoint(&self) -> &str {
        &self.llm.llm_endpoint
    }

    /// Get LLM model
    pub fn llm_model(&self) -> &str {
        &self.llm.llm_model
    }

    pub fn default_top_k(&self) -> usize {
        self.retrieval.default_top_k
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                backtrace: true,
            },
            embeddings: EmbeddingsConfig {
                provider: default_embedding_backend(),
                model: default_embedding_model(),
                dimension: default_embedding_dimension(),
                endpoint: default_embedding_endpoint(),
                api_key: None,
                cache_dir: None,
            },
            index: IndexConfig {
                path: default_index_path(),
                trusted_root: default_trusted_root(),
                require_checksum: false,
            },
            llm: LlmConfig {
                llm_endpoint: default_llm_endpoint(),
                llm_key: String::new(),
                api_key_env: default_api_key_env(),
                llm_model: default_llm_model(),
                temperature: default_temperature(),
                max_tokens: default_max_tokens(),
                timeout_secs: default_timeout_secs(),
                enforce_format: false,
            },
            retrieval: RetrievalConfig::default(),
        }
    }
}
