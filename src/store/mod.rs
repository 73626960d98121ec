//! Vector store contract over a single named collection.
//!
//! The engine never ranks vectors itself; it delegates to a durable store that persists
//! `(fragment text, embedding, id)` triples and answers cosine nearest-neighbour queries.

mod qdrant;

pub use qdrant::QdrantStore;

use crate::qdrant::QdrantError;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by vector store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `add` received batches of different lengths.
    #[error(
        "batch length mismatch: {fragments} fragments, {vectors} vectors, {ids} ids"
    )]
    ContractViolation {
        /// Number of fragment texts supplied.
        fragments: usize,
        /// Number of vectors supplied.
        vectors: usize,
        /// Number of identifiers supplied.
        ids: usize,
    },
    /// A vector does not match the collection's dimensionality.
    #[error("embedding dimension mismatch: collection expects {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the collection was created with.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },
    /// Backing storage was unreachable or rejected the request.
    #[error("vector store unavailable: {0}")]
    Unavailable(#[from] QdrantError),
}

/// A fragment returned by a similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFragment {
    /// Identifier assigned at ingestion.
    pub id: String,
    /// Fragment text.
    pub text: String,
    /// Cosine similarity to the query vector (higher is closer).
    pub score: f32,
}

/// Interface implemented by durable collection stores.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Name of the collection this store operates on.
    fn collection(&self) -> &str;

    /// Append `(fragment, vector, id)` triples. Lengths must match; ids that already exist are
    /// overwritten. Returns the number of triples written.
    async fn add(
        &self,
        fragments: Vec<String>,
        vectors: Vec<Vec<f32>>,
        ids: Vec<String>,
    ) -> Result<usize, StoreError>;

    /// Up to `k` fragments ordered by ascending cosine distance to `vector`. An empty collection
    /// yields an empty result.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<StoredFragment>, StoreError>;

    /// Remove every member while keeping the collection's name and metric. Idempotent.
    async fn clear(&self) -> Result<(), StoreError>;

    /// Number of stored fragments.
    async fn count(&self) -> Result<usize, StoreError>;
}

/// Check that an `add` batch is well formed: equal lengths and uniform `dimension`.
pub fn validate_batch(
    fragments: &[String],
    vectors: &[Vec<f32>],
    ids: &[String],
    dimension: usize,
) -> Result<(), StoreError> {
    if fragments.len() != vectors.len() || fragments.len() != ids.len() {
        return Err(StoreError::ContractViolation {
            fragments: fragments.len(),
            vectors: vectors.len(),
            ids: ids.len(),
        });
    }
    vectors
        .iter()
        .try_for_each(|vector| ensure_dimension(vector, dimension))
}

/// Reject a vector whose length differs from the collection's dimension.
pub fn ensure_dimension(vector: &[f32], dimension: usize) -> Result<(), StoreError> {
    if vector.len() != dimension {
        return Err(StoreError::DimensionMismatch {
            expected: dimension,
            actual: vector.len(),
        });
    }
    Ok(())
}
