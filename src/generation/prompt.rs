//! Grounding prompt assembly.

use serde::Serialize;

/// Fixed system role placed ahead of the retrieved context.
pub const SYSTEM_ROLE: &str = "You are a helpful assistant. Use the following context and conversation history to answer the question.";

/// Role of a chat completion message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Grounding instruction.
    System,
    /// End-user query.
    User,
    /// Model output.
    Assistant,
}

/// One `{role, content}` message sent to the completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Speaker.
    pub role: ChatRole,
    /// Message body.
    pub content: String,
}

impl ChatMessage {
    /// System message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// User message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Combine the system role, the context fragments (blank line between each) and the rendered
/// history into one instruction. No fragments means an empty context block, not an error.
pub fn build_grounding_prompt<S: AsRef<str>>(fragments: &[S], rendered_history: &str) -> String {
    let context = fragments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{SYSTEM_ROLE}\n\nContext:\n{context}\n\nHistory:\n{rendered_history}\n")
}

/// The two-message conversation sent for one query.
pub fn build_messages(query: &str, grounding_prompt: String) -> Vec<ChatMessage> {
    vec![ChatMessage::system(grounding_prompt), ChatMessage::user(query)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_joins_fragments_with_blank_lines() {
        let prompt = build_grounding_prompt(&["alpha", "beta"], "User: hi\n");
        assert!(prompt.starts_with(SYSTEM_ROLE));
        assert!(prompt.contains("Context:\nalpha\n\nbeta\n\nHistory:\nUser: hi\n"));
    }

    #[test]
    fn prompt_without_context_keeps_empty_block() {
        let prompt = build_grounding_prompt::<&str>(&[], "");
        assert_eq!(
            prompt,
            format!("{SYSTEM_ROLE}\n\nContext:\n\n\nHistory:\n\n")
        );
    }

    #[test]
    fn messages_are_system_then_user() {
        let messages = build_messages("why?", "grounding".into());
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ChatMessage::system("grounding"));
        assert_eq!(messages[1], ChatMessage::user("why?"));

        let json = serde_json::to_value(&messages).expect("json");
        assert_eq!(json[0]["role"], "system");
        assert_eq!(json[1]["role"], "user");
    }
}
