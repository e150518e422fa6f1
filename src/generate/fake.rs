//! Deterministic in-process generator for tests and offline runs

use super::Generator;
use crate::error::{Error, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Generator that streams a fixed sequence of fragments.
///
/// When constructed with `unavailable()`, every call fails before
/// streaming begins, mimicking an unreachable completion service.
#[derive(Debug, Clone)]
pub struct FakeGenerator {
    fragments: Vec<String>,
    unavailable: bool,
}

impl FakeGenerator {
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            unavailable: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            fragments: Vec::new(),
            unavailable: true,
        }
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn stream(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<mpsc::Receiver<String>> {
        if self.unavailable {
            return Err(Error::GenerationUnavailable(
                "fake generator is unavailable".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel(32);
        let fragments = self.fragments.clone();
        tokio::spawn(async move {
            for fragment in fragments {
                if tx.send(fragment).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_streams_fragments_in_order() {
        let generator = FakeGenerator::new(["one", "two", "three"]);
        let mut rx = generator.stream("s", "u").await.unwrap();

        let mut out = Vec::new();
        while let Some(fragment) = rx.recv().await {
            out.push(fragment);
        }
        assert_eq!(out, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_unavailable_fails_before_streaming() {
        let generator = FakeGenerator::unavailable();
        let err = generator.stream("s", "u").await.unwrap_err();
        assert!(matches!(err, Error::GenerationUnavailable(_)));
    }

    #[tokio::test]
    async fn test_dropped_receiver_stops_producer() {
        let generator = FakeGenerator::new(vec!["x"; 1000]);
        let rx = generator.stream("s", "u").await.unwrap();
        drop(rx);
        // producer task exits on first failed send; nothing to assert
        // beyond not hanging
    }
}
