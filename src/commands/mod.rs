//! CLI command implementations

mod ask;
mod ingest;
mod serve;

pub use ask::cmd_ask;
pub use ingest::{cmd_ingest_file, print_ingest_stats, IngestStats};
pub use serve::cmd_serve;

use crate::answer::AnswerComposer;
use crate::config::Config;
use crate::embed::create_embedder;
use crate::error::Result;
use crate::generate::create_generator;
use crate::ingest::Ingestor;
use crate::retrieve::Retriever;
use crate::server::AppState;
use crate::store::PageStore;
use std::sync::Arc;

/// Wire the full pipeline from configuration: store, network-backed
/// embedder and generator, ingestion, retrieval and composition.
pub async fn build_state(config: &Config) -> Result<Arc<AppState>> {
    let store = PageStore::open(&config.database.path).await?;
    let embedder = create_embedder(&config.embedding)?;
    let generator = create_generator(&config.generation)?;

    Ok(Arc::new(AppState {
        ingestor: Ingestor::new(store.clone(), Arc::clone(&embedder)),
        retriever: Retriever::new(store, embedder),
        composer: AnswerComposer::new(generator),
        default_k: config.query.default_k,
    }))
}
