//! Embeddings generation module
//!
//! This module turns text into fixed-length dense vectors using one of:
//! - Local sentence-transformers models (`fastembed`, default)
//! - A deterministic offline hashing embedder
//! - Ollama (local models)
//! - OpenAI-compatible endpoints
//!
//! # Examples
//!
//! ```rust,no_run
//! use feedback_rag::config::AppConfig;
//! use feedback_rag::embeddings::EmbeddingService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let service = EmbeddingService::new(&config)?;
//!
//!     let embedding = service.generate("Why is milk late in Koramangala?").await?;
//!     println!("Generated embedding with {} dimensions", embedding.len());
//!
//!     Ok(())
//! }
//! ```

pub mod client;
#[cfg(feature = "fastembed-engine")]
pub mod fastembed_engine;
pub mod generator;
pub mod hashing;
pub mod text_preprocessing;

use std::path::PathBuf;

use async_trait::async_trait;

pub use client::EmbeddingClient;
pub use client::EmbeddingProvider;
#[cfg(feature = "fastembed-engine")]
pub use fastembed_engine::FastEmbedEmbedder;
pub use generator::EmbeddingService;
pub use hashing::HashingEmbedder;
pub use text_preprocessing::preprocess_text_for_embedding;

use crate::config::EmbeddingBackend;
use crate::errors::Result;

/// Anything that maps text to a vector of a fixed dimension.
///
/// Implementations must be deterministic for a given model.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Configuration for embedding generation
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    pub model: String,
    pub dimension: usize,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub cache_dir: Option<PathBuf>,
}

impl EmbeddingConfig {
    pub fn from_app_config(config: &crate::config::AppConfig) -> Self {
        Self {
            backend: config.embeddings.provider,
            model: config.embedding_model().to_string(),
            dimension: config.embedding_dimension(),
            endpoint: config.embeddings.endpoint.clone(),
            api_key: config.embeddings.api_key.clone(),
            cache_dir: config.embeddings.cache_dir.clone(),
        }
    }
}
