//! Session-oriented cloud backend (Gemini) with search grounding.
//!
//! A [`CloudSession`] is the handle for one server-side conversation: it is
//! bound to a model, a system instruction and a capability set at creation
//! and accumulates completed turns. Handles are shared through `Arc`, so a
//! stream that already captured one keeps using it after the configuration
//! drops its cached copy.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::StreamExt;
use tracing::{debug, info};

use super::framing::LineFramer;
use super::{extract_error_summary, FragmentSink, StreamError};
use crate::api::gemini::{Content, GenerateContentRequest, GenerateContentResponse, Tool};
use crate::utils::url::normalize_base_url;

pub const DEFAULT_CLOUD_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];
pub const BASE_URL_VAR: &str = "GEMINI_BASE_URL";

/// Where the cloud API key comes from. The environment is consulted lazily,
/// on the first cloud turn, never at startup.
#[derive(Clone, Debug)]
pub enum CloudCredentials {
    Environment,
    Fixed(String),
}

impl CloudCredentials {
    pub fn resolve(&self) -> Result<String, StreamError> {
        match self {
            CloudCredentials::Fixed(key) if !key.trim().is_empty() => Ok(key.clone()),
            CloudCredentials::Fixed(_) => Err(StreamError::MissingCredentials),
            CloudCredentials::Environment => API_KEY_VARS
                .iter()
                .filter_map(|var| std::env::var(var).ok())
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
                .ok_or(StreamError::MissingCredentials),
        }
    }
}

pub fn cloud_base_url_from_env() -> String {
    std::env::var(BASE_URL_VAR)
        .ok()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| DEFAULT_CLOUD_BASE_URL.to_string())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloudCapability {
    SearchGrounding,
}

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub struct CloudSession {
    id: u64,
    model: String,
    system_instruction: String,
    capabilities: Vec<CloudCapability>,
    history: Mutex<Vec<Content>>,
}

impl CloudSession {
    pub fn create(
        model: &str,
        system_instruction: &str,
        capabilities: &[CloudCapability],
    ) -> Arc<Self> {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        info!(session = id, %model, "creating cloud session");
        Arc::new(Self {
            id,
            model: model.to_string(),
            system_instruction: system_instruction.to_string(),
            capabilities: capabilities.to_vec(),
            history: Mutex::new(Vec::new()),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn capabilities(&self) -> &[CloudCapability] {
        &self.capabilities
    }

    /// Number of completed user/model exchanges held by the session.
    pub fn turn_count(&self) -> usize {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
            / 2
    }

    pub fn build_request(&self, text: &str) -> GenerateContentRequest {
        let mut contents = self
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        contents.push(Content::user(text));

        let system_instruction = if self.system_instruction.trim().is_empty() {
            None
        } else {
            Some(Content::instruction(self.system_instruction.clone()))
        };

        let tools = self
            .capabilities
            .iter()
            .map(|capability| match capability {
                CloudCapability::SearchGrounding => Tool::google_search(),
            })
            .collect();

        GenerateContentRequest {
            contents,
            system_instruction,
            tools,
        }
    }

    fn record_turn(&self, user_text: String, reply: String) {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.push(Content::user(user_text));
        history.push(Content::model(reply));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundingCitation {
    pub uri: Option<String>,
    pub title: Option<String>,
}

impl GroundingCitation {
    pub fn new(uri: &str, title: &str) -> Self {
        Self {
            uri: Some(uri.to_string()),
            title: Some(title.to_string()),
        }
    }
}

/// One decoded provider chunk: optional text plus the grounding list it
/// carried, if any.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CloudChunk {
    pub text: Option<String>,
    pub citations: Option<Vec<GroundingCitation>>,
}

impl From<GenerateContentResponse> for CloudChunk {
    fn from(response: GenerateContentResponse) -> Self {
        let citations = response.grounding_chunks().map(|chunks| {
            chunks
                .iter()
                .map(|chunk| GroundingCitation {
                    uri: chunk.web.as_ref().and_then(|web| web.uri.clone()),
                    title: chunk.web.as_ref().and_then(|web| web.title.clone()),
                })
                .collect()
        });
        CloudChunk {
            text: response.text(),
            citations,
        }
    }
}

fn decode_sse_line(line: &str) -> Result<Option<CloudChunk>, StreamError> {
    let Some(payload) = line.strip_prefix("data:").map(str::trim_start) else {
        return Ok(None);
    };
    if payload.is_empty() || payload == "[DONE]" {
        return Ok(None);
    }

    let value: serde_json::Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(err) => {
            debug!(error = %err, "skipping malformed cloud event");
            return Ok(None);
        }
    };

    if value.get("error").is_some() {
        let message = extract_error_summary(&value).unwrap_or_else(|| payload.to_string());
        return Err(StreamError::Api {
            backend: "Cloud",
            message,
        });
    }

    match serde_json::from_value::<GenerateContentResponse>(value) {
        Ok(response) => Ok(Some(response.into())),
        Err(err) => {
            debug!(error = %err, "skipping unrecognised cloud event");
            Ok(None)
        }
    }
}

/// Incremental decoder for the server-sent-events body.
#[derive(Debug, Default)]
pub struct CloudStreamDecoder {
    framer: LineFramer,
}

impl CloudStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<CloudChunk>, StreamError> {
        self.framer.push(bytes);
        let mut chunks = Vec::new();
        while let Some(line) = self.framer.next_line() {
            if let Some(chunk) = decode_sse_line(&line)? {
                chunks.push(chunk);
            }
        }
        Ok(chunks)
    }

    /// Decode a final event that arrived without a trailing newline.
    pub fn finish(&mut self) -> Result<Option<CloudChunk>, StreamError> {
        match self.framer.take_remainder() {
            Some(line) => decode_sse_line(&line),
            None => Ok(None),
        }
    }
}

/// Markdown "Sources" appendix for the grounding list seen during a turn.
///
/// Only citations carrying both a URI and a title count. Duplicate URIs keep
/// the first title; order is first-seen. Returns `None` when nothing
/// qualifies.
pub fn sources_section(citations: &[GroundingCitation]) -> Option<String> {
    let mut seen = HashSet::new();
    let mut section = String::from("\n\n---\n**Sources:**\n");
    let mut index = 1;

    for citation in citations {
        let (Some(uri), Some(title)) = (citation.uri.as_deref(), citation.title.as_deref()) else {
            continue;
        };
        if uri.is_empty() || title.is_empty() {
            continue;
        }
        if seen.insert(uri) {
            section.push_str(&format!("{index}. [{title}]({uri})\n"));
            index += 1;
        }
    }

    if seen.is_empty() {
        None
    } else {
        Some(section)
    }
}

#[derive(Default)]
struct TurnAccumulator {
    reply: String,
    citations: Vec<GroundingCitation>,
}

impl TurnAccumulator {
    /// Forward the chunk's text and keep its grounding list. Returns false
    /// when the consumer has gone away.
    fn absorb(&mut self, chunk: CloudChunk, sink: &FragmentSink) -> bool {
        // Grounding arrives as a growing list; the latest list wins.
        if let Some(citations) = chunk.citations {
            self.citations = citations;
        }
        match chunk.text {
            Some(text) => {
                self.reply.push_str(&text);
                sink.emit(text)
            }
            None => true,
        }
    }
}

pub struct CloudTurn {
    pub client: reqwest::Client,
    pub base_url: String,
    pub api_key: String,
    pub session: Arc<CloudSession>,
    pub text: String,
}

impl CloudTurn {
    pub async fn run(self, sink: &FragmentSink) -> Result<(), StreamError> {
        let CloudTurn {
            client,
            base_url,
            api_key,
            session,
            text,
        } = self;

        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            normalize_base_url(&base_url),
            session.model()
        );
        debug!(session = session.id(), %url, "sending cloud turn");

        let request = session.build_request(&text);
        let response = client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("accept", "text/event-stream")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StreamError::http_status("Cloud", status, &body));
        }

        let mut body = response.bytes_stream();
        let mut decoder = CloudStreamDecoder::new();
        let mut turn = TurnAccumulator::default();

        while let Some(bytes) = body.next().await {
            let bytes = bytes?;
            for chunk in decoder.push(&bytes)? {
                if !turn.absorb(chunk, sink) {
                    return Ok(());
                }
            }
        }
        if let Some(chunk) = decoder.finish()? {
            if !turn.absorb(chunk, sink) {
                return Ok(());
            }
        }

        let sources = sources_section(&turn.citations);
        session.record_turn(text, turn.reply);

        if let Some(sources) = sources {
            sink.emit(sources);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_dedupe_by_uri_keeping_first_title() {
        let citations = vec![
            GroundingCitation::new("a", "A1"),
            GroundingCitation::new("b", "B"),
            GroundingCitation::new("a", "A2"),
        ];
        let section = sources_section(&citations).unwrap();
        assert_eq!(section, "\n\n---\n**Sources:**\n1. [A1](a)\n2. [B](b)\n");
    }

    #[test]
    fn sources_require_uri_and_title() {
        let citations = vec![
            GroundingCitation {
                uri: Some("a".to_string()),
                title: None,
            },
            GroundingCitation {
                uri: None,
                title: Some("B".to_string()),
            },
        ];
        assert_eq!(sources_section(&citations), None);
        assert_eq!(sources_section(&[]), None);
    }

    #[test]
    fn decoder_reads_text_and_grounding() {
        let mut decoder = CloudStreamDecoder::new();
        let body = concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hel\"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"lo\"}]},",
            "\"groundingMetadata\":{\"groundingChunks\":[{\"web\":{\"uri\":\"u\",\"title\":\"t\"}}]}}]}\r\n\r\n"
        );
        let (head, tail) = body.as_bytes().split_at(30);
        let mut chunks = decoder.push(head).unwrap();
        assert!(chunks.is_empty());
        chunks.extend(decoder.push(tail).unwrap());

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text.as_deref(), Some("Hel"));
        assert_eq!(chunks[0].citations, None);
        assert_eq!(chunks[1].text.as_deref(), Some("lo"));
        assert_eq!(
            chunks[1].citations,
            Some(vec![GroundingCitation::new("u", "t")])
        );
    }

    #[test]
    fn decoder_surfaces_stream_errors() {
        let mut decoder = CloudStreamDecoder::new();
        let err = decoder
            .push(b"data: {\"error\":{\"code\":429,\"message\":\"quota exhausted\"}}\n")
            .unwrap_err();
        assert_eq!(err.to_string(), "Cloud API error: quota exhausted");
    }

    #[test]
    fn decoder_finishes_unterminated_event() {
        let mut decoder = CloudStreamDecoder::new();
        assert!(decoder
            .push(b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"end\"}]}}]}")
            .unwrap()
            .is_empty());
        let chunk = decoder.finish().unwrap().unwrap();
        assert_eq!(chunk.text.as_deref(), Some("end"));
    }

    #[test]
    fn accumulator_keeps_latest_grounding_list() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = FragmentSink::new(tx);
        let mut turn = TurnAccumulator::default();
        turn.absorb(
            CloudChunk {
                text: Some("x".to_string()),
                citations: Some(vec![GroundingCitation::new("a", "A")]),
            },
            &sink,
        );
        turn.absorb(
            CloudChunk {
                text: None,
                citations: Some(vec![
                    GroundingCitation::new("b", "B"),
                    GroundingCitation::new("c", "C"),
                ]),
            },
            &sink,
        );
        turn.absorb(CloudChunk::default(), &sink);
        assert_eq!(turn.reply, "x");
        assert_eq!(turn.citations.len(), 2);
        assert_eq!(turn.citations[0].uri.as_deref(), Some("b"));
    }

    #[test]
    fn session_request_carries_history_instruction_and_search() {
        let session = CloudSession::create("m", "be brief", &[CloudCapability::SearchGrounding]);
        session.record_turn("q1".to_string(), "a1".to_string());
        let request = session.build_request("q2");
        assert_eq!(request.contents.len(), 3);
        assert_eq!(request.contents[2], Content::user("q2"));
        assert_eq!(
            request.system_instruction,
            Some(Content::instruction("be brief"))
        );
        assert_eq!(request.tools, vec![Tool::google_search()]);
        assert_eq!(session.turn_count(), 1);
    }

    #[test]
    fn fixed_credentials_must_be_non_empty() {
        assert!(CloudCredentials::Fixed("  ".to_string()).resolve().is_err());
        assert_eq!(
            CloudCredentials::Fixed("k".to_string()).resolve().unwrap(),
            "k"
        );
    }
}
