//! HTTP surface for the RAG engine.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /ingest?name=<file name>` – Extract, chunk, embed and store the raw request body.
//!   A `.pdf` name selects PDF extraction; anything else is read as UTF-8 text. Returns
//!   `{ "fragments": number, "degraded_embeddings": number }`.
//! - `POST /ask` – Retrieve context for `{ "query": string, "top_k"?: number }` and stream the
//!   grounded answer back as `text/plain`. The exchange is recorded in the history once the
//!   stream ends.
//! - `GET /history` – Current conversation log, oldest entry first.
//! - `DELETE /collection` – Remove every stored fragment (`{ "cleared": bool }`).
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! A single engine sits behind a [`tokio::sync::Mutex`]. An `/ask` response keeps the lock
//! until its body has been streamed (or dropped by the client), so exchanges never interleave.

use crate::engine::{EngineError, RagEngine};
use crate::extract::Document;
use crate::generation::GenerationError;
use crate::history::HistoryEntry;
use crate::store::StoreError;
use async_stream::stream;
use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Engine handle shared by every request.
pub type SharedEngine = Arc<Mutex<RagEngine>>;

const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;
const DEFAULT_UPLOAD_NAME: &str = "upload.txt";

/// Build the HTTP router exposing the engine.
pub fn create_router(engine: SharedEngine) -> Router {
    Router::new()
        .route(
            "/ingest",
            post(ingest_document).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/ask", post(ask))
        .route("/history", get(get_history))
        .route("/collection", delete(clear_collection))
        .route("/commands", get(get_commands))
        .with_state(engine)
}

/// Query string for `POST /ingest`.
#[derive(Deserialize)]
struct IngestParams {
    /// File name of the upload; its extension selects the extractor.
    #[serde(default)]
    name: Option<String>,
}

/// Success response for `POST /ingest`.
#[derive(Serialize)]
struct IngestResponse {
    fragments: usize,
    degraded_embeddings: usize,
}

/// Ingest the raw request body as one document.
async fn ingest_document(
    State(engine): State<SharedEngine>,
    Query(params): Query<IngestParams>,
    body: Bytes,
) -> Result<Json<IngestResponse>, AppError> {
    let name = params
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_UPLOAD_NAME.to_string());
    let document = Document::from_upload(name, body.to_vec());
    let outcome = engine.lock().await.ingest(document).await?;
    Ok(Json(IngestResponse {
        fragments: outcome.fragment_count,
        degraded_embeddings: outcome.degraded_embeddings,
    }))
}

/// Request body for `POST /ask`.
#[derive(Deserialize)]
struct AskRequest {
    /// Question to answer.
    query: String,
    /// Number of fragments to retrieve (defaults to `RETRIEVAL_TOP_K`).
    #[serde(default)]
    top_k: Option<usize>,
}

/// Retrieve context and stream the answer.
///
/// Failures before the first increment map to an error status. A failure mid-stream aborts the
/// body after the partial answer has been recorded.
async fn ask(
    State(engine): State<SharedEngine>,
    Json(request): Json<AskRequest>,
) -> Result<Response, AppError> {
    let AskRequest { query, top_k } = request;
    if query.trim().is_empty() {
        return Err(AppError::BadRequest("query must not be empty".into()));
    }

    let mut guard = engine.lock_owned().await;
    let k = top_k.unwrap_or(guard.config().top_k);
    if k == 0 {
        return Err(AppError::BadRequest("top_k must be at least 1".into()));
    }

    let retrieval = guard.retrieve(&query, k).await?;
    if retrieval.degraded {
        tracing::warn!("Query embedding degraded; answering without meaningful context");
    }
    let mut increments = guard.generate(&query, &retrieval.fragments).await?;

    let body = stream! {
        let mut answer = String::new();
        let mut failure = None;
        while let Some(item) = increments.next().await {
            match item {
                Ok(text) => {
                    answer.push_str(&text);
                    yield Ok::<_, GenerationError>(text);
                }
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            }
        }
        guard.record_exchange(&query, &answer);
        if let Some(error) = failure {
            tracing::warn!(error = %error, partial_chars = answer.len(), "Answer stream failed");
            yield Err(error);
        } else {
            tracing::info!(chars = answer.len(), "Answer streamed");
        }
    };

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(body),
    )
        .into_response())
}

/// Response body for `GET /history`.
#[derive(Serialize)]
struct HistoryResponse {
    entries: Vec<HistoryEntry>,
}

/// Return the conversation log.
async fn get_history(State(engine): State<SharedEngine>) -> Json<HistoryResponse> {
    let engine = engine.lock().await;
    Json(HistoryResponse {
        entries: engine.history().entries().cloned().collect(),
    })
}

/// Empty the collection. Reports `cleared: false` with 503 when the store refused.
async fn clear_collection(State(engine): State<SharedEngine>) -> Response {
    let cleared = engine.lock().await.clear_collection().await;
    let status = if cleared {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(json!({ "cleared": cleared }))).into_response()
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "ingest",
                method: "POST",
                path: "/ingest?name=<file name>",
                description: "Upload a PDF or plain-text document as the raw request body; it is chunked, embedded and stored. Response returns { \"fragments\": number, \"degraded_embeddings\": number }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "ask",
                method: "POST",
                path: "/ask",
                description: "Answer a question grounded in retrieved fragments and recent history. Streams the answer as text/plain.",
                request_example: Some(json!({
                    "query": "What does the report conclude?",
                    "top_k": 3
                })),
            },
            CommandDescriptor {
                name: "history",
                method: "GET",
                path: "/history",
                description: "Return the most recent conversation entries, oldest first.",
                request_example: None,
            },
            CommandDescriptor {
                name: "clear_collection",
                method: "DELETE",
                path: "/collection",
                description: "Delete every stored fragment while keeping the collection.",
                request_example: None,
            },
        ],
    })
}

/// Errors returned by handlers before a response body starts.
enum AppError {
    BadRequest(String),
    Engine(EngineError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Engine(EngineError::Extraction(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Engine(EngineError::Store(StoreError::Unavailable(_)))
            | Self::Engine(EngineError::Generation(_)) => StatusCode::BAD_GATEWAY,
            Self::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match self {
            Self::BadRequest(message) => message,
            Self::Engine(error) => {
                tracing::error!(error = %error, "Request failed");
                error.to_string()
            }
        };
        (status, message).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(inner: EngineError) -> Self {
        Self::Engine(inner)
    }
}
