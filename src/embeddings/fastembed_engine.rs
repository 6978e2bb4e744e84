//! Local ONNX sentence embeddings via `fastembed`

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use fastembed::EmbeddingModel;
use fastembed::TextEmbedding;
use fastembed::TextInitOptions;
use parking_lot::Mutex;
use tracing::info;

use super::Embedder;
use crate::errors::FeedbackRagError;
use crate::errors::Result;

/// Runs a sentence-transformers model in process.
///
/// A single `TextEmbedding` is kept behind a mutex and reused for every call.
pub struct FastEmbedEmbedder {
    model_label: String,
    dimension: usize,
    inner: Arc<Mutex<TextEmbedding>>,
}

impl std::fmt::Debug for FastEmbedEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedEmbedder")
            .field("model_label", &self.model_label)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

/// Map a Hugging Face model id to the matching `fastembed` model.
///
/// Accepts fastembed's own codes (`Qdrant/all-MiniLM-L6-v2-onnx`) and the
/// `sentence-transformers/*` ids that indexes are usually labelled with.
pub fn resolve_model(label: &str) -> Result<EmbeddingModel> {
    let label = label.trim();
    if label.is_empty() {
        return Err(FeedbackRagError::ConfigError(
            "fastembed model name cannot be empty".to_string(),
        ));
    }

    if let Ok(model) = EmbeddingModel::from_str(label) {
        return Ok(model);
    }

    let short = label
        .rsplit('/')
        .next()
        .unwrap_or(label)
        .to_ascii_lowercase();
    match short.as_str() {
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "paraphrase-multilingual-minilm-l12-v2" => Ok(EmbeddingModel::ParaphraseMLMiniLML12V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        _ => Err(FeedbackRagError::ConfigError(format!(
            "no local fastembed model matches `{label}`"
        ))),
    }
}

impl FastEmbedEmbedder {
    /// Load the model, downloading it into `cache_dir` on first use.
    ///
    /// # Errors
    /// `ConfigError` for an unknown model or when `dimension` differs from
    /// what the model produces; `EmbeddingError` when the model fails to load.
    pub fn try_new(
        model_name: impl AsRef<str>,
        dimension: usize,
        cache_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let label = model_name.as_ref().trim();
        let embedding_model = resolve_model(label)?;

        let model_info = TextEmbedding::get_model_info(&embedding_model).map_err(|err| {
            FeedbackRagError::ConfigError(format!(
                "unable to read metadata for fastembed model `{label}`: {err}"
            ))
        })?;
        if model_info.dim != dimension {
            return Err(FeedbackRagError::ConfigError(format!(
                "model `{label}` produces {}-dimensional vectors but dimension = {dimension} is configured",
                model_info.dim
            )));
        }

        let mut init_options = TextInitOptions::new(embedding_model);
        if let Some(dir) = cache_dir {
            init_options = init_options.with_cache_dir(dir);
        }
        let text_embedding = TextEmbedding::try_new(init_options).map_err(|err| {
            FeedbackRagError::EmbeddingError(format!(
                "failed to initialise fastembed model `{label}`: {err}"
            ))
        })?;

        info!("Local embedding model ready: {} ({} dims)", label, dimension);

        Ok(Self {
            model_label: label.to_string(),
            dimension,
            inner: Arc::new(Mutex::new(text_embedding)),
        })
    }
}

#[async_trait]
impl Embedder for FastEmbedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let inner = Arc::clone(&self.inner);
        let text = text.to_string();

        // Inference is CPU-bound; keep it off the async workers
        let embeddings = tokio::task::spawn_blocking(move || {
            let mut model = inner.lock();
            model.embed(vec![text], None)
        })
        .await
        .map_err(|e| FeedbackRagError::EmbeddingError(format!("embedding task failed: {e}")))?
        .map_err(|e| FeedbackRagError::EmbeddingError(format!("fastembed inference failed: {e}")))?;

        embeddings.into_iter().next().ok_or_else(|| {
            FeedbackRagError::EmbeddingError("fastembed returned no embedding".to_string())
        })
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_label
    }
}
