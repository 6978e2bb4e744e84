use clap::Parser;
use feedback_rag::cli::print_error;
use feedback_rag::cli::Cli;
use feedback_rag::cli::Commands;
use feedback_rag::AppConfig;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // A missing .env is fine; the key may come from the real environment
    let _ = dotenvy::dotenv();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::load()?,
    };

    // Initialize logging
    if cli.verbose {
        feedback_rag::logging::init_logging_with_level("debug")?;
    } else {
        feedback_rag::logging::init_logging_with_config(Some(&config))?;
    }
    info!("Configuration loaded successfully");

    let result = match cli.command {
        Commands::Ask {
            question,
            top_k,
            show_sources,
        } => feedback_rag::cli::handle_ask(config, question, top_k, show_sources).await,
        Commands::Search { question, top_k } => {
            feedback_rag::cli::handle_search(config, question, top_k).await
        }
        Commands::Check => feedback_rag::cli::handle_check(config).await,
    };

    if let Err(e) = result {
        print_error(&e.to_string());
        std::process::exit(if e.is_fatal() { 2 } else { 1 });
    }
    Ok(())
}
