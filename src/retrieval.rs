//! Query-time retrieval: embed the query, then ask the store for its nearest fragments.

use crate::embedding::{EmbeddingClient, embed_or_degrade};
use crate::store::{StoreError, VectorStore};

/// Ranked fragment texts for one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Retrieval {
    /// Fragment texts, closest first.
    pub fragments: Vec<String>,
    /// The query was embedded as a zero vector, so the ranking carries no meaning.
    pub degraded: bool,
}

impl Retrieval {
    /// Drop the degradation flag and keep the texts.
    pub fn into_fragments(self) -> Vec<String> {
        self.fragments
    }

    /// Whether nothing was retrieved.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Embed `query` and fetch up to `k` fragments from `store`.
///
/// Query embeddings are recomputed on every call. An empty collection or `k == 0` returns an
/// empty [`Retrieval`]; only store failures are errors.
pub async fn retrieve(
    embedder: &dyn EmbeddingClient,
    store: &dyn VectorStore,
    dimension: usize,
    query: &str,
    k: usize,
) -> Result<Retrieval, StoreError> {
    let outcome = embed_or_degrade(embedder, query, dimension).await;
    let degraded = outcome.is_degraded();
    let hits = store.query(outcome.vector(), k).await?;

    tracing::debug!(
        collection = store.collection(),
        k,
        hits = hits.len(),
        degraded,
        "Retrieved fragments"
    );
    Ok(Retrieval {
        fragments: hits.into_iter().map(|hit| hit.text).collect(),
        degraded,
    })
}
