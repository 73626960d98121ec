//! Server-sent event decoding for streamed chat completions.

use super::GenerationError;
use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use serde::Deserialize;
use std::pin::Pin;

/// Ordered, finite sequence of text increments. Pulling drives the upstream read; dropping
/// the stream early closes the connection without further work.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<String, GenerationError>> + Send>>;

const DATA_PREFIX: &str = "data:";
const DONE_MARKER: &str = "[DONE]";

/// One decoded `data:` line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SseEvent {
    /// Text to hand to the caller (possibly empty).
    Delta(String),
    /// The service signalled completion.
    Done,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Splits a byte stream into complete lines, holding back partial lines (and partial UTF-8
/// sequences) until the next chunk arrives.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Feed a chunk and return every line it completed.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(position) = self.pending.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=position).collect();
            lines.push(decode_line(&line));
        }
        lines
    }

    /// Whatever is left once the upstream closes.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(decode_line(&rest))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

/// Interpret one SSE line. Comments, blank separators and non-data fields yield `None`.
pub(crate) fn parse_line(line: &str) -> Result<Option<SseEvent>, GenerationError> {
    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(None);
    };
    let data = data.trim();
    if data.is_empty() {
        return Ok(None);
    }
    if data == DONE_MARKER {
        return Ok(Some(SseEvent::Done));
    }

    let chunk: ChatChunk = serde_json::from_str(data)
        .map_err(|err| GenerationError::InvalidEvent(format!("{err}: {data}")))?;
    if let Some(error) = chunk.error {
        let message = error
            .get("message")
            .and_then(|value| value.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(GenerationError::Upstream(message));
    }

    let text = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .unwrap_or_default();
    Ok(Some(SseEvent::Delta(text)))
}

/// Turn a streaming completion response into a [`CompletionStream`].
///
/// Empty deltas (role announcements, finish markers) are skipped. The stream ends at the
/// `[DONE]` marker or when the connection closes; transport failures after the first increment
/// surface as [`GenerationError::Stream`].
pub fn completion_stream(response: reqwest::Response) -> CompletionStream {
    Box::pin(decode_increments(response))
}

fn decode_increments(
    response: reqwest::Response,
) -> impl Stream<Item = Result<String, GenerationError>> + Send + 'static {
    try_stream! {
        let mut bytes = Box::pin(response.bytes_stream());
        let mut buffer = LineBuffer::default();
        let mut finished = false;

        'read: while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(GenerationError::Stream)?;
            for line in buffer.push(&chunk) {
                match parse_line(&line)? {
                    Some(SseEvent::Done) => {
                        finished = true;
                        break 'read;
                    }
                    Some(SseEvent::Delta(text)) if !text.is_empty() => yield text,
                    _ => {}
                }
            }
        }

        if !finished {
            if let Some(line) = buffer.finish() {
                if let Some(SseEvent::Delta(text)) = parse_line(&line)? {
                    if !text.is_empty() {
                        yield text;
                    }
                }
            }
            tracing::debug!("Completion stream closed without a done marker");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_buffer_holds_partial_lines_across_chunks() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(b"data: {\"a\"").is_empty());
        let lines = buffer.push(b":1}\r\n\ndata: [DO");
        assert_eq!(lines, vec!["data: {\"a\":1}".to_string(), String::new()]);
        assert_eq!(buffer.finish().as_deref(), Some("data: [DO"));
        assert!(buffer.finish().is_none());
    }

    #[test]
    fn line_buffer_keeps_split_multibyte_characters_intact() {
        let mut buffer = LineBuffer::default();
        let encoded = "data: é\n".as_bytes();
        assert!(buffer.push(&encoded[..7]).is_empty());
        assert_eq!(buffer.push(&encoded[7..]), vec!["data: é".to_string()]);
    }

    #[test]
    fn parse_line_extracts_delta_content() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"},"finish_reason":null}]}"#;
        assert_eq!(
            parse_line(line).expect("parse"),
            Some(SseEvent::Delta("Hel".into()))
        );
    }

    #[test]
    fn parse_line_handles_markers_and_noise() {
        assert_eq!(parse_line("data: [DONE]").expect("parse"), Some(SseEvent::Done));
        assert_eq!(parse_line("").expect("parse"), None);
        assert_eq!(parse_line(": keep-alive").expect("parse"), None);
        assert_eq!(parse_line("event: message").expect("parse"), None);
        assert_eq!(
            parse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#).expect("parse"),
            Some(SseEvent::Delta(String::new()))
        );
    }

    #[test]
    fn parse_line_rejects_malformed_json() {
        let error = parse_line("data: {not json").unwrap_err();
        assert!(matches!(error, GenerationError::InvalidEvent(_)));
    }

    #[test]
    fn parse_line_surfaces_upstream_errors() {
        let error = parse_line(r#"data: {"error":{"message":"model overloaded"}}"#).unwrap_err();
        match error {
            GenerationError::Upstream(message) => assert_eq!(message, "model overloaded"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
