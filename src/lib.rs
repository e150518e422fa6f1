//! kbrag: retrieval-augmented chat over crawled documentation
//!
//! Ingestion turns `{url, title, content}` records into header-delimited
//! sections, embeds each section through an external service, and stores
//! the page together with all of its embeddings atomically. Queries embed
//! the question, rank stored embeddings by cosine distance, and stream a
//! language-model answer composed from the top-ranked pages.

pub mod answer;
pub mod chunk;
pub mod commands;
pub mod config;
pub mod embed;
pub mod error;
pub mod generate;
pub mod ingest;
pub mod retrieve;
pub mod server;
pub mod store;
