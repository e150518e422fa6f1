//! One-shot question answering from the command line

use crate::error::Result;
use crate::server::AppState;
use std::io::Write;
use std::sync::Arc;
use tracing::info;

/// Retrieve context for the question and stream the answer to stdout
pub async fn cmd_ask(state: Arc<AppState>, question: &str, k: Option<usize>) -> Result<()> {
    let k = k.unwrap_or(state.default_k);
    let pages = state.retriever.retrieve(question, k).await?;
    info!("Answering with {} retrieved pages", pages.len());

    let mut rx = state.composer.compose(question, &pages).await?;
    let mut stdout = std::io::stdout();
    while let Some(fragment) = rx.recv().await {
        stdout.write_all(fragment.as_bytes())?;
        stdout.flush()?;
    }
    println!();
    Ok(())
}
