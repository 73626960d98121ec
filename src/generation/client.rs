//! Completion clients.

use super::{ChatMessage, CompletionStream, GenerationError, stream::completion_stream};
use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::json;

/// Interface implemented by streaming chat completion providers.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `messages` and return the response as a stream of text increments.
    ///
    /// Errors detected before the first increment (unreachable service, rejected request) are
    /// returned here; later failures arrive through the stream.
    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<CompletionStream, GenerationError>;
}

/// Client for OpenAI-compatible `/chat/completions` endpoints (vLLM, LM Studio, OpenAI).
pub struct OpenAiCompletionClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiCompletionClient {
    /// Build a client for `base_url` (including any `/v1` prefix).
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        let http = Client::builder()
            .user_agent("minirag/completion")
            .build()
            .map_err(GenerationError::Request)?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<CompletionStream, GenerationError> {
        let payload = json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .header(header::ACCEPT, "text/event-stream")
            .json(&payload)
            .send()
            .await
            .map_err(GenerationError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, model = %self.model, "Completion request rejected");
            return Err(GenerationError::UnexpectedStatus { status, body });
        }

        tracing::debug!(model = %self.model, "Completion stream opened");
        Ok(completion_stream(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use httpmock::{Method::POST, MockServer};
    use reqwest::StatusCode;

    const SSE_BODY: &str = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"!\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
    );

    fn client_for(server: &MockServer) -> OpenAiCompletionClient {
        OpenAiCompletionClient::new(format!("{}/v1", server.base_url()), "test-model", "k")
            .expect("client")
    }

    #[tokio::test]
    async fn streams_increments_until_done_marker() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer k")
                    .json_body_partial(r#"{ "model": "test-model", "stream": true }"#);
                then.status(200)
                    .header("content-type", "text/event-stream")
                    .body(SSE_BODY);
            })
            .await;

        let stream = client_for(&server)
            .stream_chat(vec![ChatMessage::user("hi")])
            .await
            .expect("stream");
        let increments: Vec<String> = stream
            .map(|item| item.expect("increment"))
            .collect()
            .await;

        mock.assert_async().await;
        assert_eq!(increments, vec!["Hel", "lo", "!"]);
        assert_eq!(increments.concat(), "Hello!");
    }

    #[tokio::test]
    async fn partial_consumption_yields_prefix() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).body(SSE_BODY);
            })
            .await;

        let mut stream = client_for(&server)
            .stream_chat(vec![ChatMessage::user("hi")])
            .await
            .expect("stream");
        let first = stream.next().await.expect("item").expect("increment");
        drop(stream);

        assert_eq!(first, "Hel");
    }

    #[tokio::test]
    async fn stream_without_done_marker_flushes_trailing_line() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).body(concat!(
                    "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
                    "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}",
                ));
            })
            .await;

        let increments: Vec<String> = client_for(&server)
            .stream_chat(vec![ChatMessage::user("hi")])
            .await
            .expect("stream")
            .map(|item| item.expect("increment"))
            .collect()
            .await;

        assert_eq!(increments, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn rejected_request_fails_before_any_increment() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(401).body("invalid api key");
            })
            .await;

        let error = client_for(&server)
            .stream_chat(vec![ChatMessage::user("hi")])
            .await
            .err()
            .expect("error");

        match error {
            GenerationError::UnexpectedStatus { status, body } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(body, "invalid api key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_service_is_a_request_error() {
        let client = OpenAiCompletionClient::new("http://127.0.0.1:9/v1", "m", "k").expect("client");
        let error = client
            .stream_chat(vec![ChatMessage::user("hi")])
            .await
            .err()
            .expect("error");
        assert!(matches!(error, GenerationError::Request(_)));
    }

    #[tokio::test]
    async fn malformed_event_surfaces_mid_stream() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).body(concat!(
                    "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\n",
                    "data: {broken\n\n",
                ));
            })
            .await;

        let items: Vec<_> = client_for(&server)
            .stream_chat(vec![ChatMessage::user("hi")])
            .await
            .expect("stream")
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_deref().ok(), Some("ok"));
        assert!(matches!(items[1], Err(GenerationError::InvalidEvent(_))));
    }
}
