//! Nearest-neighbor retrieval over stored embeddings
//!
//! Brute-force scan: the question is embedded once, cosine distance is
//! computed against every stored embedding, and candidates are ranked by
//! ascending distance with ties broken by smallest embedding id so results
//! are deterministic. Multiple sections of one page can rank highly; the
//! candidate walk collapses them to unique pages keeping each page's
//! best-ranked section, so at most K distinct pages come back.

use crate::embed::Embedder;
use crate::error::{Error, Result};
use crate::store::{Page, PageStore};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// Default number of pages retrieved per question
pub const DEFAULT_K: usize = 15;

/// Retrieval index over the page store
#[derive(Clone)]
pub struct Retriever {
    store: PageStore,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(store: PageStore, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Return the up-to-`k` distinct pages most similar to the question,
    /// most similar first.
    ///
    /// Fails with `Validation` for `k == 0` and `RetrievalUnavailable`
    /// when the question cannot be embedded; there is no cached fallback.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<Page>> {
        if k == 0 {
            return Err(Error::Validation("k must be a positive integer".to_string()));
        }

        let query_vector = self
            .embedder
            .embed(question)
            .await
            .map_err(|e| Error::RetrievalUnavailable(e.to_string()))?;

        let mut candidates = self.store.all_embeddings().await?;
        debug!("Scanning {} stored embeddings", candidates.len());

        candidates.sort_by(|a, b| {
            let da = cosine_distance(&query_vector, &a.vector);
            let db = cosine_distance(&query_vector, &b.vector);
            da.partial_cmp(&db)
                .unwrap_or(Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });

        // collapse to distinct pages, best rank wins
        let mut page_ids: Vec<i64> = Vec::with_capacity(k);
        for row in &candidates {
            if !page_ids.contains(&row.page_id) {
                page_ids.push(row.page_id);
                if page_ids.len() == k {
                    break;
                }
            }
        }

        let pages = self.store.pages_by_ids(&page_ids).await?;
        debug!("Retrieved {} pages", pages.len());
        Ok(pages)
    }
}

/// Cosine distance in [0, 2]; mismatched or zero-norm vectors rank last
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 2.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        2.0
    } else {
        1.0 - dot / denom
    }
}
