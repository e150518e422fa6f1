//! kbrag CLI entry point

use clap::{Parser, Subcommand};
use kbrag::{
    commands::{build_state, cmd_ask, cmd_ingest_file, cmd_serve, print_ingest_stats},
    config::Config,
    error::Result,
};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "kbrag")]
#[command(version, about = "Retrieval-augmented chat over crawled documentation", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Bind address, overrides the configured one
        #[arg(long)]
        addr: Option<String>,
    },

    /// Bulk-ingest crawled pages from a JSON Lines file
    Ingest {
        /// Path to the .jsonl file, one {url, title, content} per line
        file: PathBuf,

        /// Number of pages ingested concurrently
        #[arg(long, default_value = "2")]
        concurrency: usize,
    },

    /// Ask a question and stream the answer
    Ask {
        /// The question to answer
        question: String,

        /// Number of pages retrieved as context
        #[arg(short)]
        k: Option<usize>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kbrag=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kbrag=info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    if let Err(e) = run(cli).await {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { addr } => {
            let state = build_state(&config).await?;
            let addr = addr.unwrap_or_else(|| config.server.bind_addr.clone());
            cmd_serve(state, &addr).await
        }
        Commands::Ingest { file, concurrency } => {
            let state = build_state(&config).await?;
            let stats = cmd_ingest_file(&state.ingestor, &file, concurrency).await?;
            print_ingest_stats(&stats);
            Ok(())
        }
        Commands::Ask { question, k } => {
            let state = build_state(&config).await?;
            cmd_ask(state, &question, k).await
        }
    }
}
