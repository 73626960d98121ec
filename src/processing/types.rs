//! Core data types and error definitions for the ingestion pipeline.

use thiserror::Error;
use uuid::Uuid;

/// Errors produced while turning raw text into fragments.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// The window would never advance (`overlap >= chunk_size`).
    #[error("invalid chunking configuration: overlap {overlap} must be smaller than chunk size {chunk_size}")]
    InvalidConfiguration {
        /// Requested window length.
        chunk_size: usize,
        /// Requested overlap.
        overlap: usize,
    },
}

/// A contiguous slice of extracted text with a globally unique identifier.
///
/// Fragments are immutable once created; the vector store owns them after ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// UUIDv4 assigned at creation.
    pub id: String,
    /// Fragment contents.
    pub text: String,
}

impl Fragment {
    /// Wrap `text` with a freshly generated identifier.
    pub fn new(text: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text,
        }
    }
}

/// Summary of a completed ingestion produced by [`crate::engine::RagEngine::ingest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Number of fragments written to the collection.
    pub fragment_count: usize,
    /// Fragments stored with a zero vector because the embedding service failed.
    ///
    /// Such fragments are effectively unreachable by similarity search until re-ingested.
    pub degraded_embeddings: usize,
}
