pub mod cli;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod index;
pub mod llm;
pub mod logging;
pub mod models;
pub mod rag;


pub use config::AppConfig;
pub use errors::*;
pub use models::FeedbackDocument;
pub use models::ScoredDocument;
pub use rag::RagQuery;
pub use rag::RagResponse;
pub use rag::RagService;
use tokio::sync::OnceCell;

/// Number of feedback excerpts retrieved per question unless told otherwise
pub const DEFAULT_TOP_K: usize = 8;

static DEFAULT_SERVICE: OnceCell<rag::RagService> = OnceCell::const_new();

/// Answer a business question with the process-wide service.
///
/// The first call loads configuration from `config.toml` (or
/// `config.example.toml`); the index and model client are then created once
/// and reused by every later call, including concurrent ones.
pub async fn answer_question(question: &str, top_k: usize) -> Result<String> {
    let service = DEFAULT_SERVICE
        .get_or_try_init(|| async { AppConfig::load().map(rag::RagService::new) })
        .await?;
    service.answer_question(question, top_k).await
}
