//! Retrieval-augmented answers to "why" questions over customer feedback
//!
//! - Nearest-neighbor retrieval from the feedback index
//! - Context assembly with category and area tags
//! - One-sentence root-cause synthesis by a hosted model
//!
//! # Examples
//!
//! ```rust,no_run
//! use feedback_rag::config::AppConfig;
//! use feedback_rag::rag::RagService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let service = RagService::new(config);
//!
//!     let answer = service
//!         .answer_question("Why are milk deliveries late in Koramangala?", 8)
//!         .await?;
//!     println!("{answer}");
//!
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod format_check;
pub mod pipeline;
pub mod synthesizer;

pub use context::ContextAssembler;
pub use format_check::is_root_cause_sentence;
pub use pipeline::RagQuery;
pub use pipeline::RagResponse;
pub use pipeline::RagService;
pub use pipeline::NO_FEEDBACK_ANSWER;
pub use synthesizer::AnswerSynthesizer;
