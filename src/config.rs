//! Configuration management for kbrag
//!
//! Handles loading and validating configuration from TOML files. API keys
//! are never stored in the file; each service section names an environment
//! variable that holds its key.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Generation service configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Query configuration
    #[serde(default)]
    pub query: QueryConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// SQLite database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Embedding service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL of the OpenAI-compatible embedding service
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Embedding model identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_embedding_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Generation (chat completion) service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of the OpenAI-compatible completion service
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Chat model identifier
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Connect/request timeout in seconds; also bounds mid-stream idle time
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_generation_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Default number of pages retrieved per question
    #[serde(default = "default_k")]
    pub default_k: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_k: default_k(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for `kbrag serve`
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kbrag")
        .join("kbrag.db")
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_generation_model() -> String {
    "gpt-4".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_k() -> usize {
    15
}

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

impl Config {
    /// Default config file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kbrag")
            .join("config.toml")
    }

    /// Load configuration from a TOML file, or defaults if it does not exist
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_path);

        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        debug!("Loading config from {}", path.display());
        let raw = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Resolve the API key named by `api_key_env`, if set in the environment
    pub fn api_key(env_name: &str) -> Result<String> {
        std::env::var(env_name).map_err(|_| {
            Error::Config(format!(
                "API key environment variable '{}' is not set",
                env_name
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.query.default_k, 15);
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
        assert_eq!(config.generation.model, "gpt-4");
        assert_eq!(config.server.bind_addr, "127.0.0.1:8000");
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[embedding]\nbase_url = \"http://localhost:9000\"\n\n[query]\ndefault_k = 5"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.embedding.base_url, "http://localhost:9000");
        assert_eq!(config.query.default_k, 5);
        // untouched sections keep defaults
        assert_eq!(config.generation.model, "gpt-4");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/kbrag.toml"))).unwrap();
        assert_eq!(config.query.default_k, 15);
    }
}
