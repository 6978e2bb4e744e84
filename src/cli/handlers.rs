//! Command handlers

use crate::cli::output::*;
use crate::rag::RagQuery;
use crate::rag::RagService;
use crate::AppConfig;
use crate::FeedbackRagError;
use crate::Result;

fn resolve_top_k(config: &AppConfig, top_k: Option<u64>) -> Result<usize> {
    match top_k {
        Some(k) => usize::try_from(k)
            .map_err(|_| FeedbackRagError::ValidationError(format!("top_k {k} is too large"))),
        None => Ok(config.default_top_k()),
    }
}

pub async fn handle_ask(
    config: AppConfig,
    question: String,
    top_k: Option<u64>,
    show_sources: bool,
) -> Result<()> {
    let top_k = resolve_top_k(&config, top_k)?;
    let service = RagService::new(config);

    print_info(&format!("Question: \"{question}\" (top_k={top_k})"));
    let response = service.ask(RagQuery { question, top_k }).await?;

    print_answer(&response.answer);
    if !response.grounded {
        print_warning("No matching feedback; the model was not consulted");
    }

    if show_sources {
        print_sources(&response.sources);
    } else if !response.sources.is_empty() {
        println!("\n💡 Use --show-sources to see the feedback behind this answer");
    }

    Ok(())
}

pub async fn handle_search(config: AppConfig, question: String, top_k: Option<u64>) -> Result<()> {
    let top_k = resolve_top_k(&config, top_k)?;
    let service = RagService::new(config);

    let results = service.search(&question, top_k).await?;
    if results.is_empty() {
        print_warning("No feedback found");
        return Ok(());
    }

    println!("{}", format_summary(&results));
    Ok(())
}

pub async fn handle_check(config: AppConfig) -> Result<()> {
    print_config(&config);
    println!();

    let has_key = config.has_llm_api_key();
    if !has_key {
        print_warning(&format!(
            "No LLM credential: set llm.llm_key or {}",
            config.llm.api_key_env
        ));
    }

    let service = RagService::new(config);
    if has_key {
        service.warm_up().await?;
        print_success("LLM client ready");
    }
    let index = service.index().await?;
    print_success(&format!(
        "Index loaded: {} documents, dimension {}, metric {:?}, model {}",
        index.len(),
        index.dimension(),
        index.metric(),
        index.embedding_model()
    ));
    if let Some(built_at) = index.built_at() {
        print_info(&format!("Index built at {}", built_at.format("%Y-%m-%d %H:%M:%S UTC")));
    }

    Ok(())
}
