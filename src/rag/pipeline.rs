//! Complete RAG pipeline: Retrieve -> Assemble -> Synthesize

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::AppConfig;
use crate::embeddings::EmbeddingConfig;
use crate::embeddings::EmbeddingService;
use crate::errors::FeedbackRagError;
use crate::errors::Result;
use crate::index::IndexLoadOptions;
use crate::index::VectorIndex;
use crate::llm::LanguageModel;
use crate::llm::LlmService;
use crate::models::RetrievalResult;
use crate::rag::AnswerSynthesizer;
use crate::rag::ContextAssembler;

/// Returned instead of calling the model when retrieval finds nothing
pub const NO_FEEDBACK_ANSWER: &str =
    "Not enough customer feedback was found to identify a root cause for this question.";

/// Builds the shared embedding service; runs once, on a blocking thread
pub type EmbeddingLoader = Arc<dyn Fn() -> Result<EmbeddingService> + Send + Sync>;

/// Answers business questions from the feedback index.
///
/// The embedder, index, and model client are created on first use and shared
/// by every later call. Concurrent first calls wait on a single construction.
pub struct RagService {
    config: Option<AppConfig>,
    embedding_loader: Option<EmbeddingLoader>,
    embedding: OnceCell<Arc<EmbeddingService>>,
    index: OnceCell<Arc<VectorIndex>>,
    synthesizer: OnceCell<Arc<AnswerSynthesizer>>,
    context_assembler: ContextAssembler,
}

impl RagService {
    /// Create a service that builds its handles from `config` on demand.
    ///
    /// Nothing is loaded here; configuration problems surface on first use.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        let embedding_config = EmbeddingConfig::from_app_config(&config);
        let embedding_loader: EmbeddingLoader =
            Arc::new(move || EmbeddingService::from_config(embedding_config.clone()));
        Self {
            config: Some(config),
            embedding_loader: Some(embedding_loader),
            embedding: OnceCell::new(),
            index: OnceCell::new(),
            synthesizer: OnceCell::new(),
            context_assembler: ContextAssembler::new(),
        }
    }

    /// Create from handles that are already loaded
    #[must_use]
    pub fn from_handles(index: Arc<VectorIndex>, llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            config: None,
            embedding_loader: None,
            embedding: OnceCell::new(),
            index: OnceCell::new_with(Some(index)),
            synthesizer: OnceCell::new_with(Some(Arc::new(AnswerSynthesizer::new(llm)))),
            context_assembler: ContextAssembler::new(),
        }
    }

    /// Use `llm` instead of the configured hosted model
    #[must_use]
    pub fn with_language_model(mut self, llm: Arc<dyn LanguageModel>) -> Self {
        let enforce = self
            .config
            .as_ref()
            .is_some_and(|config| config.llm.enforce_format);
        let synthesizer = AnswerSynthesizer::new(llm).with_format_enforcement(enforce);
        self.synthesizer = OnceCell::new_with(Some(Arc::new(synthesizer)));
        self
    }

    /// Replace how the embedding service is built
    #[must_use]
    pub fn with_embedding_loader(mut self, loader: EmbeddingLoader) -> Self {
        self.embedding_loader = Some(loader);
        self
    }

    fn config(&self) -> Result<&AppConfig> {
        self.config.as_ref().ok_or_else(|| {
            FeedbackRagError::ConfigError(
                "service was built from handles and has no configuration to load more".to_string(),
            )
        })
    }

    /// Shared embedding service
    pub async fn embedding_service(&self) -> Result<&Arc<EmbeddingService>> {
        self.embedding
            .get_or_try_init(|| async {
                let loader = self.embedding_loader.clone().ok_or_else(|| {
                    FeedbackRagError::ConfigError(
                        "service was built from handles and has no embedding loader".to_string(),
                    )
                })?;
                // Local models may download and load weights here
                let service = tokio::task::spawn_blocking(move || loader())
                    .await
                    .map_err(|e| {
                        FeedbackRagError::EmbeddingError(format!("embedding loader panicked: {e}"))
                    })??;
                Ok(Arc::new(service))
            })
            .await
    }

    /// Shared vector index, loaded from the configured path on first use
    pub async fn index(&self) -> Result<&Arc<VectorIndex>> {
        self.index
            .get_or_try_init(|| async {
                let config = self.config()?;
                let embedding = Arc::clone(self.embedding_service().await?);
                let path = config.index_path().to_path_buf();
                let options = IndexLoadOptions::from_app_config(config);

                info!("Loading feedback index from {}", path.display());
                let index = tokio::task::spawn_blocking(move || {
                    VectorIndex::load(&path, &options, embedding)
                })
                .await
                .map_err(|e| FeedbackRagError::LoadError(format!("index loader panicked: {e}")))??;

                Ok(Arc::new(index))
            })
            .await
    }

    /// Shared answer synthesizer around the hosted model client
    pub async fn synthesizer(&self) -> Result<&Arc<AnswerSynthesizer>> {
        self.synthesizer
            .get_or_try_init(|| async {
                let config = self.config()?;
                let llm: Arc<dyn LanguageModel> = Arc::new(LlmService::new(config)?);
                info!("LLM client ready: model={}", llm.model_name());
                Ok(Arc::new(
                    AnswerSynthesizer::new(llm).with_format_enforcement(config.llm.enforce_format),
                ))
            })
            .await
    }

    /// Load every handle now instead of on the first question
    pub async fn warm_up(&self) -> Result<()> {
        self.index().await?;
        self.synthesizer().await?;
        Ok(())
    }

    /// Retrieve ranked feedback without asking the model.
    ///
    /// A failed nearest-neighbor search degrades to an empty result.
    pub async fn search(&self, question: &str, top_k: usize) -> Result<RetrievalResult> {
        validate_request(question, top_k)?;
        let index = self.index().await?;

        match index.query(question, top_k).await {
            Ok(results) => Ok(results),
            Err(FeedbackRagError::RetrievalError(reason)) => {
                warn!("Retrieval failed, continuing without feedback: {}", reason);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Answer a question from its `top_k` nearest feedback excerpts
    pub async fn answer_question(&self, question: &str, top_k: usize) -> Result<String> {
        let response = self
            .ask(RagQuery {
                question: question.to_string(),
                top_k,
            })
            .await?;
        Ok(response.answer)
    }

    /// Perform a complete RAG query
    ///
    /// # Errors
    /// - `ValidationError` for an empty question or `top_k` of zero
    /// - `ConfigError` / `LoadError` while creating handles on first use
    /// - Embedding backend errors while embedding the question
    /// - `LlmError` when the model call fails
    pub async fn ask(&self, query: RagQuery) -> Result<RagResponse> {
        validate_request(&query.question, query.top_k)?;
        info!("Processing business question: {}", query.question);

        let synthesizer = Arc::clone(self.synthesizer().await?);

        // Step 1: Retrieve relevant feedback
        debug!("Step 1: Retrieving feedback (top_k={})", query.top_k);
        let sources = self.search(&query.question, query.top_k).await?;
        debug!("Retrieved {} documents", sources.len());

        if sources.is_empty() {
            warn!("No feedback retrieved; returning the no-data answer");
            return Ok(RagResponse {
                answer: NO_FEEDBACK_ANSWER.to_string(),
                sources,
                context: String::new(),
                query: query.question,
                grounded: false,
            });
        }

        // Step 2: Assemble context
        debug!("Step 2: Assembling context");
        let context = self.context_assembler.assemble(&sources);

        // Step 3: Generate answer using LLM
        debug!("Step 3: Generating answer");
        let answer = synthesizer.synthesize(&query.question, &context).await?;

        info!("Business question answered from {} excerpts", sources.len());

        Ok(RagResponse {
            answer,
            sources,
            context,
            query: query.question,
            grounded: true,
        })
    }
}

fn validate_request(question: &str, top_k: usize) -> Result<()> {
    if question.trim().is_empty() {
        return Err(FeedbackRagError::ValidationError(
            "question must not be empty".to_string(),
        ));
    }
    if top_k == 0 {
        return Err(FeedbackRagError::ValidationError(
            "top_k must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// RAG query configuration
#[derive(Debug, Clone)]
pub struct RagQuery {
    pub question: String,
    pub top_k: usize,
}

impl RagQuery {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            top_k: crate::DEFAULT_TOP_K,
        }
    }
}

/// RAG response
#[derive(Debug, Clone)]
pub struct RagResponse {
    pub answer: String,
    pub sources: RetrievalResult,
    pub context: String,
    pub query: String,
    /// False when the no-data answer was returned without calling the model
    pub grounded: bool,
}

impl RagResponse {
    /// Get a formatted string representation
    #[must_use]
    pub fn format(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("Question: {}\n\n", self.query));
        output.push_str(&format!("Answer:\n{}\n\n", self.answer));
        output.push_str(&format!("Sources ({} excerpts):\n", self.sources.len()));

        for (idx, source) in self.sources.iter().enumerate() {
            output.push_str(&format!(
                "  {}. {} (Score: {:.3})\n",
                idx + 1,
                ContextAssembler::format_line(&source.document),
                source.score
            ));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::embeddings::HashingEmbedder;
    use crate::index::IndexFile;
    use crate::index::IndexedDocument;
    use crate::index::Metric;
    use crate::models::FeedbackDocument;

    struct EchoModel;

    #[async_trait]
    impl LanguageModel for EchoModel {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok("Customers are reporting that milk in the Koramangala are facing delays due to a vendor stockout.".to_string())
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    fn index_with(docs: &[FeedbackDocument]) -> Arc<VectorIndex> {
        let embedder = HashingEmbedder::new(64).unwrap();
        let mut file = IndexFile::new(HashingEmbedder::model_id(64), 64, Metric::Cosine);
        for doc in docs {
            file.documents
                .push(IndexedDocument::new(doc.clone(), embedder.embed_sync(&doc.text)));
        }
        let service = Arc::new(EmbeddingService::from_embedder(Arc::new(embedder)));
        Arc::new(VectorIndex::from_index_file(file, service).unwrap())
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let service = RagService::from_handles(index_with(&[]), Arc::new(EchoModel));
        assert!(matches!(
            service.answer_question("why?", 0).await,
            Err(FeedbackRagError::ValidationError(_))
        ));
        assert!(matches!(
            service.answer_question("  ", 8).await,
            Err(FeedbackRagError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_grounded_response() {
        let docs = vec![FeedbackDocument::new(
            "Milk delayed in Koramangala due to vendor stockout",
            Some("Delivery"),
            Some("Koramangala"),
        )];
        let service = RagService::from_handles(index_with(&docs), Arc::new(EchoModel));

        let response = service
            .ask(RagQuery::new("why is milk late in Koramangala"))
            .await
            .unwrap();
        assert!(response.grounded);
        assert_eq!(response.sources.len(), 1);
        assert!(response.format().contains("Sources (1 excerpts)"));
    }

    #[tokio::test]
    async fn test_handles_without_config_cannot_load_more() {
        let service = RagService::from_handles(index_with(&[]), Arc::new(EchoModel));
        assert!(matches!(
            service.embedding_service().await,
            Err(FeedbackRagError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_on_first_use() {
        let mut config = AppConfig::default();
        config.llm.api_key_env = "FEEDBACK_RAG_PIPELINE_TEST_UNSET".to_string();
        let service = RagService::new(config);

        assert!(matches!(
            service.answer_question("why is milk late", 8).await,
            Err(FeedbackRagError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_index_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.embeddings.provider = crate::config::EmbeddingBackend::Hashing;
        config.index.trusted_root = dir.path().to_path_buf();
        config.index.path = dir.path().join("absent.json");
        let service = RagService::new(config).with_language_model(Arc::new(EchoModel));

        assert!(matches!(
            service.answer_question("why is milk late", 8).await,
            Err(FeedbackRagError::LoadError(_))
        ));
    }
}
