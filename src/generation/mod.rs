//! Grounded answer generation.
//!
//! [`prompt`] assembles the grounding instruction from retrieved fragments and the rendered
//! history; [`client`] sends it to an OpenAI-compatible completion service and hands back a
//! pull-based [`CompletionStream`] of text deltas decoded by [`stream`].

pub mod client;
pub mod prompt;
pub mod stream;

pub use client::{CompletionClient, OpenAiCompletionClient};
pub use prompt::{ChatMessage, ChatRole, build_grounding_prompt, build_messages};
pub use stream::CompletionStream;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while requesting or consuming a completion.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The request could not be sent (network, TLS, invalid URL).
    #[error("completion request failed: {0}")]
    Request(#[source] reqwest::Error),
    /// The service refused the request (auth, quota, unknown model).
    #[error("completion service returned {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the service.
        status: StatusCode,
        /// Response body, for diagnostics.
        body: String,
    },
    /// The connection failed after streaming had started.
    #[error("completion stream interrupted: {0}")]
    Stream(#[source] reqwest::Error),
    /// An event could not be decoded.
    #[error("malformed completion event: {0}")]
    InvalidEvent(String),
    /// The service reported an error inside the stream.
    #[error("completion service reported an error: {0}")]
    Upstream(String),
}
