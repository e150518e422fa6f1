//! Streamed text generation
//!
//! Abstraction over the external language-model completion service. The
//! contract is stream-first: a successful call yields a channel of text
//! fragments that ends when the upstream signals completion. Failures
//! before the first fragment surface as `Error::GenerationUnavailable`;
//! a mid-stream failure simply ends the channel early. That lossy
//! truncation is accepted behavior, not retried.

mod fake;
mod http_backend;

pub use fake::FakeGenerator;
pub use http_backend::HttpGenerator;

use crate::config::GenerationConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Trait for streamed completion providers.
///
/// The returned receiver is single-consumer and forward-only. Dropping it
/// cancels the upstream request; implementations must stop producing when
/// the consumer goes away.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Request a streamed completion for the given prompts
    async fn stream(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<mpsc::Receiver<String>>;
}

/// Create the network-backed generator from configuration
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    Ok(Arc::new(HttpGenerator::new(config)?))
}
