//! Engine configuration.
//!
//! An [`EngineConfig`] is built once, validated, and moved into a
//! [`crate::engine::RagEngine`]. Nothing in the crate mutates it afterwards; switching models,
//! endpoints, or collections means building a new engine (and therefore a fresh history log).

use std::env;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed or is out of range.
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

/// Runtime configuration for one engine instance.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Base URL of the Ollama runtime serving embeddings.
    pub embedding_url: String,
    /// Embedding model identifier passed to Ollama.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors; fixed for the whole collection.
    pub embedding_dimension: usize,
    /// Base URL of the OpenAI-compatible completion service (including `/v1`).
    pub completion_url: String,
    /// Chat model requested from the completion service.
    pub completion_model: String,
    /// Bearer credential for the completion service.
    pub completion_api_key: String,
    /// Base URL of the Qdrant instance that persists collections.
    pub qdrant_url: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Name of the collection holding ingested fragments.
    pub collection_name: String,
    /// Number of fragments retrieved per query.
    pub top_k: usize,
    /// Maximum fragment length, in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive fragments.
    pub chunk_overlap: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            embedding_url: "http://127.0.0.1:11434".into(),
            embedding_model: "nomic-embed-text:v1.5".into(),
            embedding_dimension: 768,
            completion_url: "http://127.0.0.1:8000/v1".into(),
            completion_model: "Qwen/Qwen3-4B-Instruct-2507-FP8".into(),
            completion_api_key: "k".into(),
            qdrant_url: "http://127.0.0.1:6333".into(),
            qdrant_api_key: None,
            collection_name: "rag_collection".into(),
            top_k: 3,
            chunk_size: 800,
            chunk_overlap: 80,
            server_port: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment (and `.env` when present), falling back to
    /// defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let config = Self {
            embedding_url: load_env_or("OLLAMA_URL", defaults.embedding_url),
            embedding_model: load_env_or("EMBEDDING_MODEL", defaults.embedding_model),
            embedding_dimension: parse_env_or("EMBEDDING_DIMENSION", defaults.embedding_dimension)?,
            completion_url: load_env_or("LLM_BASE_URL", defaults.completion_url),
            completion_model: load_env_or("LLM_MODEL", defaults.completion_model),
            completion_api_key: load_env_or("LLM_API_KEY", defaults.completion_api_key),
            qdrant_url: load_env_or("QDRANT_URL", defaults.qdrant_url),
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            collection_name: load_env_or("COLLECTION_NAME", defaults.collection_name),
            top_k: parse_env_or("RETRIEVAL_TOP_K", defaults.top_k)?,
            chunk_size: parse_env_or("CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: parse_env_or("CHUNK_OVERLAP", defaults.chunk_overlap)?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        };

        config.validate()?;
        tracing::debug!(
            embedding_url = %config.embedding_url,
            embedding_model = %config.embedding_model,
            completion_url = %config.completion_url,
            completion_model = %config.completion_model,
            qdrant_url = %config.qdrant_url,
            collection = %config.collection_name,
            top_k = config.top_k,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Reject combinations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }
        if self.top_k == 0 {
            return Err(ConfigError::InvalidValue("RETRIEVAL_TOP_K".into()));
        }
        if self.collection_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue("COLLECTION_NAME".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::InvalidValue("CHUNK_OVERLAP".into()));
        }
        Ok(())
    }
}

fn load_env_or(key: &str, default: String) -> String {
    load_env_optional(key).unwrap_or(default)
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}
