#![deny(missing_docs)]

//! Core library for the minirag retrieval-augmented generation engine.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Engine facade composing ingestion, retrieval and generation.
pub mod engine;
/// Document text extraction.
pub mod extract;
/// Grounding prompt assembly and streamed completions.
pub mod generation;
/// Bounded conversation history.
pub mod history;
/// Structured logging and tracing setup.
pub mod logging;
/// Chunking and the fragment model.
pub mod processing;
/// Qdrant vector store integration.
pub mod qdrant;
/// Query embedding and nearest-fragment lookup.
pub mod retrieval;
/// Vector store contract and adapters.
pub mod store;
