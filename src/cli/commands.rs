//! CLI command definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(name = "feedback-rag")]
#[command(about = "Root-cause answers to business questions from customer feedback")]
#[command(version)]
pub struct Cli {
    /// Enable verbose debug logging (default: config level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file to use instead of config.toml / config.example.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask a "why" question and get a one-sentence root cause
    Ask {
        /// The business question
        question: String,
        /// Number of feedback excerpts to retrieve (default: from config)
        #[arg(short = 'k', long, value_parser = clap::value_parser!(u64).range(1..))]
        top_k: Option<u64>,
        /// Print the retrieved excerpts after the answer
        #[arg(short, long)]
        show_sources: bool,
    },
    /// Show the feedback nearest to a question without calling the model
    Search {
        /// Text to search for
        question: String,
        /// Number of excerpts to return (default: from config)
        #[arg(short = 'k', long, value_parser = clap::value_parser!(u64).range(1..))]
        top_k: Option<u64>,
    },
    /// Validate configuration, credentials and the index file
    Check,
}
