//! Bulk ingestion from a JSON Lines file
//!
//! One `{url, title, content}` record per line. Each record succeeds or
//! fails independently; a malformed line is reported and skipped without
//! stopping the batch.

use crate::error::{Error, Result};
use crate::ingest::Ingestor;
use futures::StreamExt;
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct PageRecord {
    url: String,
    title: String,
    content: String,
}

/// Outcome counts for one bulk run
#[derive(Debug, Default)]
pub struct IngestStats {
    pub ingested: usize,
    pub failed: usize,
}

/// Ingest every record in the file with bounded concurrency
pub async fn cmd_ingest_file(
    ingestor: &Ingestor,
    path: &Path,
    concurrency: usize,
) -> Result<IngestStats> {
    if concurrency == 0 {
        return Err(Error::Validation(
            "concurrency must be a positive integer".to_string(),
        ));
    }

    let raw = tokio::fs::read_to_string(path).await?;
    info!("Ingesting records from {}", path.display());

    let ingested = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    futures::stream::iter(raw.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()))
        .for_each_concurrent(concurrency, |(line_no, line)| {
            let ingested = &ingested;
            let failed = &failed;
            async move {
                let record: PageRecord = match serde_json::from_str(line.trim()) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!("Line {}: invalid JSON: {}", line_no + 1, e);
                        failed.fetch_add(1, Ordering::Relaxed);
                        return;
                    }
                };

                match ingestor
                    .ingest(&record.url, &record.title, &record.content)
                    .await
                {
                    Ok(_) => {
                        info!("Ingested {}", record.url);
                        ingested.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        warn!("Failed to ingest {}: {}", record.url, e);
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        })
        .await;

    Ok(IngestStats {
        ingested: ingested.into_inner(),
        failed: failed.into_inner(),
    })
}

/// Print bulk ingestion results to the console
pub fn print_ingest_stats(stats: &IngestStats) {
    println!(
        "Ingested {} pages, {} failed",
        stats.ingested, stats.failed
    );
}
