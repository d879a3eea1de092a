use crate::core::app::{App, ConnectionDefaults};
use crate::core::modes::Mode;
use crate::core::session::{Provider, SessionConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

pub fn create_test_app() -> App {
    let defaults = ConnectionDefaults {
        cloud_model: "gemini-test".to_string(),
        local_model: "llama3".to_string(),
        local_url: "http://localhost:11434".to_string(),
    };
    let session = SessionConfig::new(
        Provider::Cloud,
        defaults.cloud_model.clone(),
        defaults.local_url.clone(),
        Mode::Chat.instruction(),
    );
    App::new(session, defaults)
}

/// What the test server answers with. Body chunks are written one at a time
/// so clients see them as separate reads.
pub struct CannedResponse {
    status: u16,
    reason: &'static str,
    chunks: Vec<Vec<u8>>,
}

impl CannedResponse {
    pub fn ok(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            status: 200,
            reason: "OK",
            chunks,
        }
    }

    pub fn status(status: u16, reason: &'static str, body: Vec<u8>) -> Self {
        Self {
            status,
            reason,
            chunks: vec![body],
        }
    }
}

#[derive(Debug)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub struct TestServer {
    pub base_url: String,
    captured: oneshot::Receiver<CapturedRequest>,
}

impl TestServer {
    /// The single request the server accepted.
    pub async fn request(self) -> CapturedRequest {
        self.captured.await.expect("server should capture a request")
    }
}

/// One-shot HTTP/1.1 server on an ephemeral port. It answers exactly one
/// request and closes the connection to end the body.
pub async fn spawn_http_server(response: CannedResponse) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr should resolve");
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let request = read_http_request(&mut stream).await.expect("read request");
        let _ = tx.send(request);

        let head = format!(
            "HTTP/1.1 {} {}\r\ncontent-type: application/octet-stream\r\nconnection: close\r\n\r\n",
            response.status, response.reason
        );
        stream.write_all(head.as_bytes()).await.expect("write head");
        for chunk in response.chunks {
            stream.write_all(&chunk).await.expect("write chunk");
            stream.flush().await.expect("flush");
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        let _ = stream.shutdown().await;
    });

    TestServer {
        base_url: format!("http://{addr}"),
        captured: rx,
    }
}

async fn read_http_request(stream: &mut TcpStream) -> Result<CapturedRequest, String> {
    let mut buffer = Vec::new();
    let header_end = loop {
        let mut chunk = [0_u8; 1024];
        let read = stream.read(&mut chunk).await.map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("unexpected EOF while reading headers".to_string());
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(index) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break index + 4;
        }
    };

    let header_text =
        std::str::from_utf8(&buffer[..header_end]).map_err(|err| err.to_string())?;
    let mut lines = header_text.split("\r\n").filter(|line| !line.is_empty());
    let request_line = lines.next().ok_or("missing request line")?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut headers = Vec::new();
    let mut content_length = 0_usize;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse().map_err(|_| "bad content-length")?;
        }
        headers.push((name.to_string(), value));
    }

    let mut body = buffer[header_end..].to_vec();
    while body.len() < content_length {
        let mut chunk = vec![0_u8; content_length - body.len()];
        let read = stream.read(&mut chunk).await.map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("unexpected EOF while reading body".to_string());
        }
        body.extend_from_slice(&chunk[..read]);
    }
    body.truncate(content_length);

    Ok(CapturedRequest {
        method,
        path,
        headers,
        body,
    })
}
