//! The engine facade tying extraction, chunking, embedding, storage, retrieval, history and
//! generation together.
//!
//! One [`RagEngine`] is driven by one caller at a time. Ingestion and retrieval take `&self`;
//! only the history log needs `&mut self`, and it is touched by the caller through
//! [`RagEngine::record_exchange`] or [`RagEngine::history_mut`] once a generation stream has been
//! drained. Nothing here spawns tasks.

use crate::config::{ConfigError, EngineConfig};
use crate::embedding::{
    EmbeddingClient, EmbeddingClientError, OllamaEmbeddingClient, embed_or_degrade,
};
use crate::extract::{Document, ExtractionError, extract_text};
use crate::generation::{
    CompletionClient, CompletionStream, GenerationError, OpenAiCompletionClient,
    build_grounding_prompt, build_messages,
};
use crate::history::{HistoryManager, Role};
use crate::processing::{ChunkingError, ChunkingOptions, IngestOutcome, split_into_fragments};
use crate::qdrant::{QdrantError, QdrantService};
use crate::retrieval::{self, Retrieval};
use crate::store::{QdrantStore, StoreError, VectorStore};
use thiserror::Error;

/// Any failure surfaced by [`RagEngine`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A document could not be turned into text.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// Chunking parameters were invalid.
    #[error(transparent)]
    Chunking(#[from] ChunkingError),
    /// The embedding client could not be constructed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// The vector store failed or rejected a batch.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The Qdrant client could not be constructed.
    #[error(transparent)]
    Qdrant(#[from] QdrantError),
    /// The completion request failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Retrieval-augmented generation over one named collection.
pub struct RagEngine {
    config: EngineConfig,
    embedder: Box<dyn EmbeddingClient>,
    store: Box<dyn VectorStore>,
    completion: Box<dyn CompletionClient>,
    history: HistoryManager,
}

impl RagEngine {
    /// Build an engine wired to Ollama, Qdrant and the OpenAI-compatible completion service
    /// named in `config`. The collection is created if it does not exist yet.
    pub async fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let embedder = OllamaEmbeddingClient::new(
            config.embedding_url.clone(),
            config.embedding_model.clone(),
        )?;
        let service = QdrantService::new(&config.qdrant_url, config.qdrant_api_key.clone())?;
        let store = QdrantStore::connect(
            service,
            config.collection_name.clone(),
            config.embedding_dimension,
        )
        .await?;
        let completion = OpenAiCompletionClient::new(
            config.completion_url.clone(),
            config.completion_model.clone(),
            config.completion_api_key.clone(),
        )?;

        tracing::info!(
            collection = %config.collection_name,
            embedding_model = %config.embedding_model,
            completion_model = %config.completion_model,
            "Engine ready"
        );
        Self::with_components(
            config,
            Box::new(embedder),
            Box::new(store),
            Box::new(completion),
        )
    }

    /// Build an engine from already constructed collaborators.
    pub fn with_components(
        config: EngineConfig,
        embedder: Box<dyn EmbeddingClient>,
        store: Box<dyn VectorStore>,
        completion: Box<dyn CompletionClient>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            embedder,
            store,
            completion,
            history: HistoryManager::new(),
        })
    }

    /// Configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Extract, chunk, embed and store `document`.
    ///
    /// Embedding failures degrade individual fragments to zero vectors instead of aborting
    /// the batch; extraction, chunking and store failures abort before anything is written.
    pub async fn ingest(&self, document: Document) -> Result<IngestOutcome, EngineError> {
        let name = document.name.clone();
        let text = extract_text(document)?;
        let options = ChunkingOptions {
            chunk_size: self.config.chunk_size,
            overlap: self.config.chunk_overlap,
        };
        let fragments = split_into_fragments(&text, &options)?;
        if fragments.is_empty() {
            tracing::info!(document = %name, "Document produced no text; nothing stored");
            return Ok(IngestOutcome {
                fragment_count: 0,
                degraded_embeddings: 0,
            });
        }

        let mut texts = Vec::with_capacity(fragments.len());
        let mut vectors = Vec::with_capacity(fragments.len());
        let mut ids = Vec::with_capacity(fragments.len());
        let mut degraded_embeddings = 0;
        for fragment in fragments {
            let outcome = embed_or_degrade(
                self.embedder.as_ref(),
                &fragment.text,
                self.config.embedding_dimension,
            )
            .await;
            if outcome.is_degraded() {
                degraded_embeddings += 1;
            }
            vectors.push(outcome.into_vector());
            texts.push(fragment.text);
            ids.push(fragment.id);
        }

        let fragment_count = self.store.add(texts, vectors, ids).await?;
        if degraded_embeddings > 0 {
            tracing::warn!(
                document = %name,
                degraded_embeddings,
                "Some fragments were stored with zero vectors and will not be found by search"
            );
        }
        tracing::info!(
            document = %name,
            collection = self.store.collection(),
            fragment_count,
            "Document ingested"
        );
        Ok(IngestOutcome {
            fragment_count,
            degraded_embeddings,
        })
    }

    /// Up to `k` stored fragment texts most similar to `query`, closest first.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Retrieval, EngineError> {
        Ok(retrieval::retrieve(
            self.embedder.as_ref(),
            self.store.as_ref(),
            self.config.embedding_dimension,
            query,
            k,
        )
        .await?)
    }

    /// Ask the completion service to answer `query` grounded in `fragments` and the current
    /// history, returning the answer as a stream of text increments.
    ///
    /// History is left untouched; call [`RagEngine::record_exchange`] once the stream has been
    /// consumed.
    pub async fn generate<S: AsRef<str>>(
        &self,
        query: &str,
        fragments: &[S],
    ) -> Result<CompletionStream, EngineError> {
        let prompt = build_grounding_prompt(fragments, &self.history.render());
        tracing::debug!(
            fragments = fragments.len(),
            history = self.history.len(),
            "Requesting completion"
        );
        Ok(self
            .completion
            .stream_chat(build_messages(query, prompt))
            .await?)
    }

    /// Append one answered exchange to the history: the user entry always, the assistant entry
    /// only when `answer` is non-empty.
    pub fn record_exchange(&mut self, query: &str, answer: &str) {
        self.history.append(Role::User, query);
        if !answer.is_empty() {
            self.history.append(Role::Assistant, answer);
        }
    }

    /// Remove every fragment from the collection. Failures are logged and reported as `false`.
    pub async fn clear_collection(&self) -> bool {
        match self.store.clear().await {
            Ok(()) => true,
            Err(error) => {
                tracing::error!(
                    collection = self.store.collection(),
                    error = %error,
                    "Failed to clear collection"
                );
                false
            }
        }
    }

    /// Number of fragments currently stored.
    pub async fn fragment_count(&self) -> Result<usize, EngineError> {
        Ok(self.store.count().await?)
    }

    /// Conversation history.
    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    /// Mutable conversation history, for callers appending entries themselves.
    pub fn history_mut(&mut self) -> &mut HistoryManager {
        &mut self.history
    }
}
