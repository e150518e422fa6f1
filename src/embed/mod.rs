//! Embedding generation
//!
//! This module provides an abstraction over embedding services with:
//! - A trait for different embedding backends
//! - An OpenAI-compatible HTTP backend
//! - A deterministic in-process fake for tests and offline runs

mod fake;
mod http_backend;

pub use fake::FakeEmbedder;
pub use http_backend::HttpEmbedder;

use crate::config::EmbeddingConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for embedding providers.
///
/// Implementations must be safe to call from many concurrent tasks; the
/// ingestion path issues one call per section of a page in parallel. Empty
/// input text is valid and must produce a vector, not an error.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text into a fixed-length vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Build the labeled embedding input for one section of a page.
///
/// URL and title are prepended so identity metadata participates in the
/// similarity signal alongside the section text.
pub fn section_input(url: &str, title: &str, text: &str) -> String {
    format!("URL:{}\n\n TITLE:{}\n\n CONTENT: {}", url, title, text)
}

/// Create the network-backed embedder from configuration
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    Ok(Arc::new(HttpEmbedder::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_input_labels_fixed_order() {
        let input = section_input("https://x/a", "A", "## H\nbody");
        assert!(input.starts_with("URL:https://x/a"));
        let title_at = input.find("TITLE:A").unwrap();
        let content_at = input.find("CONTENT: ## H\nbody").unwrap();
        assert!(title_at < content_at);
    }

    #[test]
    fn test_section_input_accepts_empty_section() {
        let input = section_input("https://x/a", "A", "");
        assert!(input.ends_with("CONTENT: "));
    }
}
