//! Stateless local backend speaking the Ollama `/api/chat` protocol.
//!
//! The server keeps no conversation state, so every turn replays the full
//! transcript plus the current system instruction.

use futures_util::StreamExt;
use tracing::debug;

use super::framing::LineFramer;
use super::{FragmentSink, StreamError};
use crate::api::{ChatFrame, ChatMessage, ChatRequest};
use crate::core::message::Turn;
use crate::utils::url::construct_api_url;

pub const CHAT_ENDPOINT: &str = "api/chat";

/// Rebuild the message list for one local turn.
///
/// Error and info turns are dropped, the composed message is appended as the
/// final user entry, and index 0 always carries `instruction` as a system
/// message (overwriting an existing leading system entry).
pub fn build_local_messages(history: &[Turn], composed: &str, instruction: &str) -> Vec<ChatMessage> {
    let mut messages: Vec<ChatMessage> = history
        .iter()
        .filter_map(|turn| {
            turn.role
                .to_api_role()
                .map(|role| ChatMessage::new(role, turn.content.clone()))
        })
        .collect();

    messages.push(ChatMessage::new("user", composed));

    match messages.first_mut() {
        Some(first) if first.is_system() => first.content = instruction.to_string(),
        _ => messages.insert(0, ChatMessage::new("system", instruction)),
    }

    messages
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DecodeStep {
    pub fragments: Vec<String>,
    pub done: bool,
}

/// Incremental decoder for the newline-delimited JSON response body.
#[derive(Debug, Default)]
pub struct LocalStreamDecoder {
    framer: LineFramer,
}

impl LocalStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one body buffer. Once a frame reports `done`, decoding stops and
    /// anything after it is left unread.
    pub fn push(&mut self, bytes: &[u8]) -> DecodeStep {
        self.framer.push(bytes);
        let mut step = DecodeStep::default();

        while let Some(line) = self.framer.next_line() {
            match serde_json::from_str::<ChatFrame>(&line) {
                Ok(frame) => {
                    if let Some(content) = frame.content() {
                        step.fragments.push(content.to_string());
                    }
                    if frame.is_done() {
                        step.done = true;
                        break;
                    }
                }
                Err(err) => {
                    debug!(error = %err, "skipping malformed local frame");
                }
            }
        }

        step
    }

    pub fn pending(&self) -> &[u8] {
        self.framer.pending()
    }
}

pub struct LocalTurn {
    pub client: reqwest::Client,
    pub endpoint_url: String,
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl LocalTurn {
    pub async fn run(self, sink: &FragmentSink) -> Result<(), StreamError> {
        let LocalTurn {
            client,
            endpoint_url,
            model,
            messages,
        } = self;

        let url = construct_api_url(&endpoint_url, CHAT_ENDPOINT);
        debug!(%url, %model, messages = messages.len(), "sending local chat request");

        let request = ChatRequest {
            model,
            messages,
            stream: true,
        };

        let response = client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StreamError::http_status("Local", status, &body));
        }

        let mut body = response.bytes_stream();
        let mut decoder = LocalStreamDecoder::new();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            let step = decoder.push(&chunk);
            for fragment in step.fragments {
                if !sink.emit(fragment) {
                    return Ok(());
                }
            }
            if step.done {
                return Ok(());
            }
        }

        Ok(())
    }
}
