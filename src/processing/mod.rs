//! Ingestion building blocks: positional chunking and the fragment model.

pub mod chunking;
pub mod types;

pub use chunking::{ChunkingOptions, chunk_text, split_into_fragments};
pub use types::{ChunkingError, Fragment, IngestOutcome};
