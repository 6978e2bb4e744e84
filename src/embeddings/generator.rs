//! Embedding generation service with preprocessing and shape checks

use std::sync::Arc;

use tracing::info;

use super::client::EmbeddingClient;
use super::client::EmbeddingProvider;
use super::hashing::HashingEmbedder;
use super::preprocess_text_for_embedding;
use super::Embedder;
use super::EmbeddingConfig;
use crate::config::EmbeddingBackend;
use crate::errors::FeedbackRagError;
use crate::errors::Result;

/// Service for generating query embeddings from the configured backend
pub struct EmbeddingService {
    embedder: Arc<dyn Embedder>,
    dimension: usize,
}

impl EmbeddingService {
    /// Create a new embedding service
    pub fn new(config: &crate::config::AppConfig) -> Result<Self> {
        Self::from_config(EmbeddingConfig::from_app_config(config))
    }

    /// Create from custom config
    pub fn from_config(config: EmbeddingConfig) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = match config.backend {
            #[cfg(feature = "fastembed-engine")]
            EmbeddingBackend::FastEmbed => Arc::new(super::FastEmbedEmbedder::try_new(
                &config.model,
                config.dimension,
                config.cache_dir.clone(),
            )?),
            #[cfg(not(feature = "fastembed-engine"))]
            EmbeddingBackend::FastEmbed => {
                return Err(FeedbackRagError::ConfigError(
                    "provider = \"fastembed\" needs the `fastembed-engine` feature".to_string(),
                ))
            }
            EmbeddingBackend::Hashing => Arc::new(HashingEmbedder::new(config.dimension)?),
            EmbeddingBackend::Ollama => Arc::new(EmbeddingClient::new(
                EmbeddingProvider::Ollama,
                config.model.clone(),
                config.endpoint.clone(),
                config.api_key.clone(),
                config.dimension,
            )?),
            EmbeddingBackend::OpenAI => Arc::new(EmbeddingClient::new(
                EmbeddingProvider::OpenAI,
                config.model.clone(),
                config.endpoint.clone(),
                config.api_key.clone(),
                config.dimension,
            )?),
        };

        info!(
            "Embedding service ready: backend={:?}, model={}, dimension={}",
            config.backend,
            embedder.model_name(),
            config.dimension
        );

        Ok(Self::from_embedder(embedder))
    }

    /// Wrap an existing embedder
    pub fn from_embedder(embedder: Arc<dyn Embedder>) -> Self {
        let dimension = embedder.dimension();
        Self {
            embedder,
            dimension,
        }
    }

    /// Generate embedding for a single text
    ///
    /// A vector whose length differs from the configured dimension means the
    /// backend serves a different model, which is a configuration problem.
    pub async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        let processed_text = preprocess_text_for_embedding(text)?;
        let embedding = self.embedder.embed(&processed_text).await?;

        if embedding.len() != self.dimension {
            return Err(FeedbackRagError::ConfigError(format!(
                "embedding backend for `{}` returned {} dimensions, expected {}",
                self.embedder.model_name(),
                embedding.len(),
                self.dimension
            )));
        }

        Ok(embedding)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct WrongShape;

    #[async_trait]
    impl Embedder for WrongShape {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.5; 3])
        }

        fn dimension(&self) -> usize {
            384
        }

        fn model_name(&self) -> &str {
            "wrong-shape"
        }
    }

    #[tokio::test]
    async fn test_hashing_backend_from_config() {
        let service = EmbeddingService::from_config(EmbeddingConfig {
            backend: EmbeddingBackend::Hashing,
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            endpoint: String::new(),
            api_key: None,
            cache_dir: None,
        })
        .unwrap();

        let embedding = service.generate("why is milk late").await.unwrap();
        assert_eq!(embedding.len(), 384);
        // The hasher never claims the configured neural model's name
        assert_eq!(service.model_name(), "feature-hashing-v1/384");
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_config_error() {
        let service = EmbeddingService::from_embedder(Arc::new(WrongShape));
        let err = service.generate("anything").await.unwrap_err();
        assert!(matches!(err, FeedbackRagError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_blank_text_rejected_before_backend() {
        let service = EmbeddingService::from_embedder(Arc::new(WrongShape));
        let err = service.generate("   ").await.unwrap_err();
        assert!(matches!(err, FeedbackRagError::ValidationError(_)));
    }
}
