//! Embedding client abstraction and the Ollama adapter.
//!
//! Embedding failures never abort ingestion or retrieval. [`embed_or_degrade`] turns any client
//! error into [`EmbeddingOutcome::Degraded`] carrying a zero vector of the configured dimension.
//! A zero vector has no meaningful cosine similarity to anything, so a degraded fragment is
//! effectively invisible to search and a degraded query retrieves arbitrary (usually no useful)
//! context. Callers that need stricter behavior inspect the outcome instead of the raw vector.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// HTTP layer failed before a response arrived.
    #[error("embedding request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Provider answered with a non-success status.
    #[error("embedding service returned {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Response body, for diagnostics.
        body: String,
    },
    /// Provider answered successfully but without a usable vector.
    #[error("malformed embedding response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for a single text.
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError>;
}

/// Result of embedding a text, distinguishing real vectors from the zero-vector fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingOutcome {
    /// Vector produced by the embedding service.
    Ready(Vec<f32>),
    /// Service failed; `vector` is all zeros.
    Degraded {
        /// Zero vector of the configured dimension.
        vector: Vec<f32>,
        /// Why the service call failed.
        reason: String,
    },
}

impl EmbeddingOutcome {
    /// Whether this outcome is the zero-vector fallback.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// Borrow the vector regardless of provenance.
    pub fn vector(&self) -> &[f32] {
        match self {
            Self::Ready(vector) | Self::Degraded { vector, .. } => vector,
        }
    }

    /// Take the vector regardless of provenance.
    pub fn into_vector(self) -> Vec<f32> {
        match self {
            Self::Ready(vector) | Self::Degraded { vector, .. } => vector,
        }
    }
}

/// Embed `text`, falling back to a zero vector of `dimension` on any client error.
pub async fn embed_or_degrade(
    client: &dyn EmbeddingClient,
    text: &str,
    dimension: usize,
) -> EmbeddingOutcome {
    match client.generate_embedding(text).await {
        Ok(vector) => EmbeddingOutcome::Ready(vector),
        Err(error) => {
            tracing::warn!(
                error = %error,
                dimension,
                chars = text.chars().count(),
                "Embedding failed; substituting zero vector"
            );
            EmbeddingOutcome::Degraded {
                vector: vec![0.0; dimension],
                reason: error.to_string(),
            }
        }
    }
}

/// Embedding client speaking Ollama's `/api/embeddings` protocol.
pub struct OllamaEmbeddingClient {
    http: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

impl OllamaEmbeddingClient {
    /// Build a client for the given runtime URL and model.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, EmbeddingClientError> {
        let http = Client::builder().user_agent("minirag/embedding").build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embeddings", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        let payload = json!({
            "model": self.model,
            "prompt": text,
        });

        let response = self.http.post(self.endpoint()).json(&payload).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::UnexpectedStatus { status, body });
        }

        let body: OllamaEmbeddingResponse = response
            .json()
            .await
            .map_err(|error| EmbeddingClientError::InvalidResponse(error.to_string()))?;
        if body.embedding.is_empty() {
            return Err(EmbeddingClientError::InvalidResponse(
                "embedding field missing or empty".into(),
            ));
        }

        tracing::trace!(model = %self.model, dimension = body.embedding.len(), "Embedding generated");
        Ok(body.embedding)
    }
}
