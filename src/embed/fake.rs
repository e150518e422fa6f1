//! Deterministic in-process embedder for tests and offline runs

use super::Embedder;
use crate::error::{Error, Result};
use async_trait::async_trait;

const DIMENSION: usize = 8;

/// Embedder that derives a fixed-length vector from the input bytes.
///
/// The same text always maps to the same vector, so retrieval over it is
/// fully reproducible without a network. Optionally fails on inputs that
/// contain a configured marker, which lets tests trigger the ingestion
/// rollback path for a single section.
#[derive(Debug, Clone, Default)]
pub struct FakeEmbedder {
    fail_on: Option<String>,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with a transport error whenever the input contains `marker`
    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_on: Some(marker.to_string()),
        }
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(marker) = &self.fail_on {
            if text.contains(marker.as_str()) {
                return Err(Error::Transport(format!(
                    "fake embedder failing on '{}'",
                    marker
                )));
            }
        }

        // byte histogram folded into a small fixed dimension
        let mut vector = vec![0.0f32; DIMENSION];
        for (i, b) in text.bytes().enumerate() {
            vector[(b as usize + i) % DIMENSION] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}
