//! Helpers for constructing Qdrant payloads.

use serde_json::{Map, Value};
use time::OffsetDateTime;

/// Build the payload object stored alongside each indexed fragment.
pub(crate) fn build_payload(
    fragment_id: &str,
    text: &str,
    timestamp_rfc3339: &str,
) -> Value {
    let mut payload = Map::new();
    payload.insert("fragment_id".into(), Value::String(fragment_id.to_string()));
    payload.insert("text".into(), Value::String(text.to_string()));
    payload.insert(
        "ingested_at".into(),
        Value::String(timestamp_rfc3339.to_string()),
    );

    Value::Object(payload)
}

/// Pull the fragment text back out of a stored payload.
pub(crate) fn payload_text(payload: Option<&Map<String, Value>>) -> Option<String> {
    match payload?.get("text")? {
        Value::String(text) => Some(text.clone()),
        _ => None,
    }
}

/// Current timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
