//! OpenAI-compatible streaming chat completion backend

use super::Generator;
use crate::config::{Config, GenerationConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Generator that streams from an OpenAI-compatible
/// `/v1/chat/completions` endpoint with `stream: true`.
pub struct HttpGenerator {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    idle_timeout: Duration,
}

impl HttpGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = Config::api_key(&config.api_key_env)?;
        Self::with_key(config, api_key)
    }

    pub fn with_key(config: &GenerationConfig, api_key: String) -> Result<Self> {
        // No overall request timeout: the response body is an open stream.
        // Connect timeout bounds the pre-stream wait, idle_timeout bounds
        // each gap between chunks once streaming.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/v1/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            model: config.model.clone(),
            api_key,
            idle_timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn stream(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<mpsc::Receiver<String>> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "stream": true,
        });

        // send() resolves once response headers arrive; bound that wait so
        // a service that accepts the connection but never answers cannot
        // hang the caller
        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send();
        let response = tokio::time::timeout(self.idle_timeout, request)
            .await
            .map_err(|_| {
                Error::GenerationUnavailable(format!(
                    "completion service did not respond within {:?}",
                    self.idle_timeout
                ))
            })?
            .map_err(|e| Error::GenerationUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::GenerationUnavailable(format!(
                "completion service returned {}: {}",
                status, text
            )));
        }

        let (tx, rx) = mpsc::channel(32);
        let mut byte_stream = response.bytes_stream();
        let idle_timeout = self.idle_timeout;

        tokio::spawn(async move {
            // SSE lines can straddle chunk boundaries; carry the partial tail
            let mut pending = String::new();

            loop {
                let item =
                    match tokio::time::timeout(idle_timeout, byte_stream.next()).await {
                        Ok(item) => item,
                        Err(_) => {
                            warn!("Completion stream idle past timeout, ending early");
                            return;
                        }
                    };

                let bytes = match item {
                    Some(Ok(bytes)) => bytes,
                    Some(Err(e)) => {
                        // mid-stream failure: end the stream, accepted lossy behavior
                        warn!("Completion stream failed mid-stream: {}", e);
                        return;
                    }
                    None => return,
                };

                pending.push_str(&String::from_utf8_lossy(&bytes));
                while let Some(newline) = pending.find('\n') {
                    let line = pending[..newline].trim().to_string();
                    pending.drain(..=newline);

                    if line.is_empty() {
                        continue;
                    }
                    if line == "data: [DONE]" {
                        debug!("Completion stream done");
                        return;
                    }
                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    let Ok(parsed) = serde_json::from_str::<Value>(data) else {
                        continue;
                    };
                    if let Some(content) =
                        parsed["choices"][0]["delta"]["content"].as_str()
                    {
                        if !content.is_empty() && tx.send(content.to_string()).await.is_err() {
                            // consumer dropped the receiver; close the connection
                            return;
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}
