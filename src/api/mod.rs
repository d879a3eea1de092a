//! Wire payloads for the local `/api/chat` endpoint.
//!
//! The local backend speaks the Ollama chat protocol: a JSON request body
//! and a newline-delimited JSON response where every line is one frame.

use serde::{Deserialize, Serialize};

pub mod gemini;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == "system"
    }
}

#[derive(Serialize, Debug)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

#[derive(Deserialize, Debug, Default)]
pub struct ChatFrameMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// One line of a streamed `/api/chat` response.
#[derive(Deserialize, Debug, Default)]
pub struct ChatFrame {
    #[serde(default)]
    pub message: Option<ChatFrameMessage>,
    #[serde(default)]
    pub done: Option<bool>,
}

impl ChatFrame {
    /// Non-empty message text carried by this frame, if any.
    pub fn content(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|message| message.content.as_deref())
            .filter(|content| !content.is_empty())
    }

    pub fn is_done(&self) -> bool {
        self.done.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_stream_flag() {
        let request = ChatRequest {
            model: "llama3".to_string(),
            messages: vec![ChatMessage::new("user", "hi")],
            stream: true,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "model": "llama3",
                "messages": [{"role": "user", "content": "hi"}],
                "stream": true
            })
        );
    }

    #[test]
    fn frame_ignores_empty_content() {
        let frame: ChatFrame =
            serde_json::from_str(r#"{"message":{"role":"assistant","content":""},"done":true}"#)
                .unwrap();
        assert_eq!(frame.content(), None);
        assert!(frame.is_done());
    }

    #[test]
    fn frame_without_message_or_done_is_inert() {
        let frame: ChatFrame = serde_json::from_str(r#"{"model":"llama3"}"#).unwrap();
        assert_eq!(frame.content(), None);
        assert!(!frame.is_done());
    }
}
