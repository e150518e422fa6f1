//! Page ingestion transaction
//!
//! All-or-nothing unit of work: a page and the embeddings of all of its
//! sections are committed together, or nothing remains. Embedding requests
//! for the sections of one page fan out concurrently and are awaited as a
//! barrier; any failure rolls the whole page back. Retrieval correctness
//! depends on this: an under-embedded page would silently narrow recall
//! with no visible signal.

use crate::chunk::split_sections;
use crate::embed::{section_input, Embedder};
use crate::error::{Error, Result};
use crate::store::PageStore;
use futures::future;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Maximum accepted title length, in characters
pub const MAX_TITLE_CHARS: usize = 400;

/// Orchestrates the ingestion of crawled pages
#[derive(Clone)]
pub struct Ingestor {
    store: PageStore,
    embedder: Arc<dyn Embedder>,
}

impl Ingestor {
    pub fn new(store: PageStore, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Ingest one page: validate, store, chunk, embed every section
    /// concurrently, then persist the embeddings. Returns the page id.
    ///
    /// On any embedding failure the page row is deleted (cascade removes
    /// embeddings) and the triggering error is returned; sibling embedding
    /// tasks are allowed to finish before the rollback runs.
    pub async fn ingest(&self, url: &str, title: &str, text: &str) -> Result<i64> {
        validate_page(url, title, text)?;

        let page_id = self.store.insert_page(url, title, text).await?;
        let sections = split_sections(text);
        info!("Ingesting {} in {} sections", url, sections.len());

        let tasks: Vec<_> = sections
            .iter()
            .map(|section| {
                let embedder = Arc::clone(&self.embedder);
                let input = section_input(url, title, &section.text());
                tokio::spawn(async move { embedder.embed(&input).await })
            })
            .collect();

        // fan-in barrier: every task completes before the outcome is decided
        let results = future::join_all(tasks).await;

        let mut vectors = Vec::with_capacity(results.len());
        for result in results {
            let vector = match result {
                Ok(Ok(vector)) => vector,
                Ok(Err(e)) => return self.rollback(page_id, e).await,
                Err(e) => {
                    return self
                        .rollback(page_id, Error::Transport(format!("embedding task failed: {}", e)))
                        .await
                }
            };
            vectors.push(vector);
        }

        if let Err(e) = self.store.insert_embeddings(page_id, &vectors).await {
            return self.rollback(page_id, e).await;
        }

        info!("Ingested page {} with {} embeddings", page_id, vectors.len());
        Ok(page_id)
    }

    async fn rollback(&self, page_id: i64, cause: Error) -> Result<i64> {
        warn!("Rolling back page {}: {}", page_id, cause);
        if let Err(e) = self.store.delete_page(page_id).await {
            warn!("Rollback of page {} failed: {}", page_id, e);
        }
        Err(cause)
    }
}

/// Validate an incoming `{url, title, content}` record
pub fn validate_page(url: &str, title: &str, text: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(Error::Validation("url must not be empty".to_string()));
    }
    if title.trim().is_empty() {
        return Err(Error::Validation("title must not be empty".to_string()));
    }
    if text.trim().is_empty() {
        return Err(Error::Validation("content must not be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(Error::Validation(format!(
            "title exceeds {} characters",
            MAX_TITLE_CHARS
        )));
    }
    Url::parse(url).map_err(|e| Error::Validation(format!("invalid url '{}': {}", url, e)))?;
    Ok(())
}
