//! Transport adapters for the two backends.
//!
//! Both adapters share one capability: drive a single turn and push text
//! fragments into a [`FragmentSink`]. Any failure comes back as a
//! [`StreamError`]; turning it into user-visible text is the stream
//! engine's job.

pub mod cloud;
pub mod framing;
pub mod local;

use std::error::Error as StdError;

use thiserror::Error;
use tokio::sync::mpsc;

pub use cloud::{CloudCapability, CloudCredentials, CloudSession, CloudTurn};
pub use local::LocalTurn;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("API key not found in environment. Set GEMINI_API_KEY (or API_KEY) to use the cloud provider.")]
    MissingCredentials,

    #[error("{backend} server error: {status}{}", detail_suffix(.detail))]
    HttpStatus {
        backend: &'static str,
        status: reqwest::StatusCode,
        detail: Option<String>,
    },

    #[error("{backend} API error: {message}")]
    Api {
        backend: &'static str,
        message: String,
    },

    #[error("{}", describe_transport(.0))]
    Transport(#[from] reqwest::Error),
}

impl StreamError {
    pub fn http_status(backend: &'static str, status: reqwest::StatusCode, body: &str) -> Self {
        let detail = serde_json::from_str::<serde_json::Value>(body.trim())
            .ok()
            .and_then(|value| extract_error_summary(&value))
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty() && trimmed.len() <= 200).then(|| trimmed.to_string())
            });
        StreamError::HttpStatus {
            backend,
            status,
            detail,
        }
    }

    /// Text of the terminal fragment emitted in place of the error.
    pub fn as_fragment(&self) -> String {
        format!("\n[CONNECTION ERROR]: {self}")
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(detail) if !detail.is_empty() => format!(". {detail}"),
        _ => String::new(),
    }
}

fn describe_transport(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

pub(crate) fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value
                .get("error")
                .and_then(|v| v.as_str())
                .map(str::to_owned)
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str())
                .map(str::to_owned)
        })?;

    let collapsed = summary.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Sending half of a fragment stream.
#[derive(Clone, Debug)]
pub struct FragmentSink {
    tx: mpsc::UnboundedSender<String>,
}

impl FragmentSink {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    /// Deliver one fragment. Returns false once the consumer is gone.
    pub fn emit(&self, fragment: impl Into<String>) -> bool {
        self.tx.send(fragment.into()).is_ok()
    }
}

/// A single turn ready to run against one backend.
pub enum TransportAdapter {
    Cloud(CloudTurn),
    Local(LocalTurn),
}

impl TransportAdapter {
    pub fn backend(&self) -> &'static str {
        match self {
            TransportAdapter::Cloud(_) => "cloud",
            TransportAdapter::Local(_) => "local",
        }
    }

    pub async fn run(self, sink: &FragmentSink) -> Result<(), StreamError> {
        match self {
            TransportAdapter::Cloud(turn) => turn.run(sink).await,
            TransportAdapter::Local(turn) => turn.run(sink).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_uses_json_summary() {
        let err = StreamError::http_status(
            "Local",
            reqwest::StatusCode::NOT_FOUND,
            r#"{"error":"model \"llama9\" not found"}"#,
        );
        assert_eq!(
            err.to_string(),
            "Local server error: 404 Not Found. model \"llama9\" not found"
        );
    }

    #[test]
    fn http_status_without_body() {
        let err =
            StreamError::http_status("Cloud", reqwest::StatusCode::INTERNAL_SERVER_ERROR, "");
        assert_eq!(err.to_string(), "Cloud server error: 500 Internal Server Error");
        assert_eq!(
            err.as_fragment(),
            "\n[CONNECTION ERROR]: Cloud server error: 500 Internal Server Error"
        );
    }

    #[test]
    fn missing_credentials_fragment() {
        assert!(StreamError::MissingCredentials
            .as_fragment()
            .starts_with("\n[CONNECTION ERROR]: API key not found"));
    }

    #[test]
    fn sink_reports_closed_consumer() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = FragmentSink::new(tx);
        assert!(sink.emit("a"));
        drop(rx);
        assert!(!sink.emit("b"));
    }
}
