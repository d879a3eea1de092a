//! The response stream engine: one entry point for both backends.
//!
//! `stream()` snapshots the configuration, composes the outgoing text and
//! returns a [`ResponseStream`]. Nothing touches the network until the
//! stream is first polled; at that point the selected transport runs on a
//! spawned task and feeds fragments through a channel. Failures never
//! escape: they arrive as one final `[CONNECTION ERROR]` fragment.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::context::{compose_message, DocumentContext};
use super::message::Turn;
use super::providers::cloud::{cloud_base_url_from_env, CloudCredentials};
use super::providers::local::build_local_messages;
use super::providers::{CloudTurn, FragmentSink, LocalTurn, StreamError, TransportAdapter};
use super::session::{Provider, SessionConfig};

#[derive(Clone)]
pub struct ResponseStreamEngine {
    client: reqwest::Client,
    credentials: CloudCredentials,
    cloud_base_url: String,
}

impl ResponseStreamEngine {
    pub fn new(credentials: CloudCredentials, cloud_base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            cloud_base_url: cloud_base_url.into(),
        }
    }

    /// Engine reading its API key and base URL from the environment.
    pub fn from_env() -> Self {
        Self::new(CloudCredentials::Environment, cloud_base_url_from_env())
    }

    /// Start one turn. `history` holds the turns before the current message.
    pub fn stream(
        &self,
        session: &mut SessionConfig,
        message: &str,
        history: &[Turn],
        contexts: &[DocumentContext],
    ) -> ResponseStream {
        let composed = compose_message(contexts, message);

        let adapter = match session.provider() {
            Provider::Cloud => {
                let api_key = match self.credentials.resolve() {
                    Ok(key) => key,
                    Err(err) => {
                        warn!(error = %err, "cloud turn aborted");
                        return ResponseStream::failed(err);
                    }
                };
                TransportAdapter::Cloud(CloudTurn {
                    client: self.client.clone(),
                    base_url: self.cloud_base_url.clone(),
                    api_key,
                    session: session.cloud_session(),
                    text: composed,
                })
            }
            Provider::Local => TransportAdapter::Local(LocalTurn {
                client: self.client.clone(),
                endpoint_url: session.endpoint_url().to_string(),
                model: session.model().to_string(),
                messages: build_local_messages(history, &composed, session.system_instruction()),
            }),
        };

        debug!(
            backend = adapter.backend(),
            contexts = contexts.len(),
            "prepared turn"
        );
        ResponseStream::pending(adapter)
    }
}

async fn drive(adapter: TransportAdapter, sink: FragmentSink) {
    let backend = adapter.backend();
    match adapter.run(&sink).await {
        Ok(()) => debug!(backend, "turn complete"),
        Err(err) => {
            warn!(backend, error = %err, "turn failed");
            sink.emit(err.as_fragment());
        }
    }
}

/// Lazy, finite sequence of text fragments for one turn.
pub struct ResponseStream {
    pending: Option<TransportAdapter>,
    rx: Option<mpsc::UnboundedReceiver<String>>,
}

impl ResponseStream {
    fn pending(adapter: TransportAdapter) -> Self {
        Self {
            pending: Some(adapter),
            rx: None,
        }
    }

    fn failed(err: StreamError) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(err.as_fragment());
        Self {
            pending: None,
            rx: Some(rx),
        }
    }
}

impl Stream for ResponseStream {
    type Item = String;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        let this = self.get_mut();
        if let Some(adapter) = this.pending.take() {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(drive(adapter, FragmentSink::new(tx)));
            this.rx = Some(rx);
        }
        match this.rx.as_mut() {
            Some(rx) => rx.poll_recv(cx),
            None => Poll::Ready(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::{ContextStore, ExtractedDocument};
    use crate::core::message::TurnRole;
    use crate::utils::test_utils::{spawn_http_server, CannedResponse};
    use futures_util::StreamExt;

    fn local_config(url: &str) -> SessionConfig {
        SessionConfig::new(Provider::Local, "llama3", url, "be helpful")
    }

    fn cloud_config() -> SessionConfig {
        SessionConfig::new(Provider::Cloud, "gemini-test", "", "be brief")
    }

    async fn collect(stream: ResponseStream) -> Vec<String> {
        stream.collect().await
    }

    #[tokio::test]
    async fn local_stream_yields_frames_until_done() {
        let server = spawn_http_server(CannedResponse::ok(vec![
            b"{\"message\":{\"content\":\"He\"}}\n{\"mess".to_vec(),
            b"age\":{\"content\":\"llo\"}}\nnot-json\n".to_vec(),
            b"{\"message\":{\"content\":\"\"},\"done\":true}\n{\"message\":{\"content\":\"ignored\"}}\n"
                .to_vec(),
        ]))
        .await;

        let engine = ResponseStreamEngine::new(CloudCredentials::Fixed("unused".into()), "");
        let mut config = local_config(&server.base_url);
        let history = vec![
            Turn::new(1, TurnRole::User, "earlier"),
            Turn::new(2, TurnRole::Assistant, "reply"),
            Turn::new(3, TurnRole::Error, "oops"),
        ];

        let fragments = collect(engine.stream(&mut config, "now", &history, &[])).await;
        assert_eq!(fragments, vec!["He".to_string(), "llo".to_string()]);

        let request = server.request().await;
        assert_eq!(request.path, "/api/chat");
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "llama3",
                "stream": true,
                "messages": [
                    {"role": "system", "content": "be helpful"},
                    {"role": "user", "content": "earlier"},
                    {"role": "assistant", "content": "reply"},
                    {"role": "user", "content": "now"}
                ]
            })
        );
        assert!(config.cached_session().is_none());
    }

    #[tokio::test]
    async fn local_stream_resends_context_every_turn() {
        let mut store = ContextStore::new();
        store.add(ExtractedDocument {
            name: "notes.md".to_string(),
            mime_type: "text/markdown".to_string(),
            content: "alpha".to_string(),
        });
        let engine = ResponseStreamEngine::new(CloudCredentials::Fixed("unused".into()), "");

        for _ in 0..2 {
            let server = spawn_http_server(CannedResponse::ok(vec![
                b"{\"done\":true}\n".to_vec(),
            ]))
            .await;
            let mut config = local_config(&server.base_url);
            let fragments =
                collect(engine.stream(&mut config, "q", &[], store.as_slice())).await;
            assert!(fragments.is_empty());

            let body: serde_json::Value =
                serde_json::from_slice(&server.request().await.body).unwrap();
            assert_eq!(
                body["messages"][1]["content"],
                serde_json::json!(compose_message(store.as_slice(), "q"))
            );
        }
    }

    #[tokio::test]
    async fn local_http_error_becomes_fragment() {
        let server = spawn_http_server(CannedResponse::status(
            500,
            "Internal Server Error",
            br#"{"error":"model not loaded"}"#.to_vec(),
        ))
        .await;
        let engine = ResponseStreamEngine::new(CloudCredentials::Fixed("unused".into()), "");
        let mut config = local_config(&server.base_url);

        let fragments = collect(engine.stream(&mut config, "hi", &[], &[])).await;
        assert_eq!(
            fragments,
            vec![
                "\n[CONNECTION ERROR]: Local server error: 500 Internal Server Error. model not loaded"
                    .to_string()
            ]
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_becomes_fragment() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let engine = ResponseStreamEngine::new(CloudCredentials::Fixed("unused".into()), "");
        let mut config = local_config(&format!("http://{addr}"));
        let fragments = collect(engine.stream(&mut config, "hi", &[], &[])).await;
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].starts_with("\n[CONNECTION ERROR]: "));
    }

    #[tokio::test]
    async fn missing_cloud_key_fails_without_creating_session() {
        let engine = ResponseStreamEngine::new(CloudCredentials::Fixed(String::new()), "");
        let mut config = cloud_config();
        let fragments = collect(engine.stream(&mut config, "hi", &[], &[])).await;
        assert_eq!(fragments, vec![StreamError::MissingCredentials.as_fragment()]);
        assert!(config.cached_session().is_none());
    }

    #[tokio::test]
    async fn cloud_stream_appends_sources_and_keeps_session() {
        let event = |json: &str| format!("data: {json}\r\n\r\n").into_bytes();
        let body = vec![
            event(r#"{"candidates":[{"content":{"parts":[{"text":"Answer"}]},"groundingMetadata":{"groundingChunks":[{"web":{"uri":"a","title":"A1"}}]}}]}"#),
            event(r#"{"candidates":[{"content":{"parts":[{"text":" here"}]},"groundingMetadata":{"groundingChunks":[{"web":{"uri":"a","title":"A1"}},{"web":{"uri":"b","title":"B"}},{"web":{"uri":"a","title":"A2"}}]}}]}"#),
        ];
        let server = spawn_http_server(CannedResponse::ok(body)).await;

        let engine =
            ResponseStreamEngine::new(CloudCredentials::Fixed("key-123".into()), &server.base_url);
        let mut config = cloud_config();

        let fragments = collect(engine.stream(&mut config, "question", &[], &[])).await;
        assert_eq!(
            fragments,
            vec![
                "Answer".to_string(),
                " here".to_string(),
                "\n\n---\n**Sources:**\n1. [A1](a)\n2. [B](b)\n".to_string(),
            ]
        );

        let request = server.request().await;
        assert_eq!(
            request.path,
            "/models/gemini-test:streamGenerateContent?alt=sse"
        );
        assert_eq!(request.header("x-goog-api-key"), Some("key-123"));
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["tools"], serde_json::json!([{"googleSearch": {}}]));
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            serde_json::json!("be brief")
        );

        let session = config.cached_session().unwrap();
        assert_eq!(session.turn_count(), 1);
    }

    #[tokio::test]
    async fn stream_is_lazy_until_polled() {
        let server = spawn_http_server(CannedResponse::ok(vec![
            b"{\"message\":{\"content\":\"x\"},\"done\":true}\n".to_vec(),
        ]))
        .await;
        let engine = ResponseStreamEngine::new(CloudCredentials::Fixed("unused".into()), "");
        let mut config = local_config(&server.base_url);

        let stream = engine.stream(&mut config, "hi", &[], &[]);
        assert!(stream.pending.is_some());
        assert_eq!(collect(stream).await, vec!["x".to_string()]);
    }
}
