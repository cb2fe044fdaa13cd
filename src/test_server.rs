//! Local HTTP server answering scripted responses, one connection per request
use std::sync::{Arc, Mutex};

use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

/// Request received by the server
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Received {
    pub method: String,
    /// Path with its query string
    pub path: String,
    pub body: Value,
}

/// Server answering its scripted responses in order, then 404
pub(crate) struct TestServer {
    url: String,
    received: Arc<Mutex<Vec<Received>>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Bind a free local port and start answering
    pub async fn start(answers: Vec<(u16, Value)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let received = Arc::new(Mutex::new(vec![]));
        let log = Arc::clone(&received);
        let handle = tokio::spawn(async move {
            let mut answers = answers.into_iter();
            while let Ok((mut stream, _)) = listener.accept().await {
                let Some(request) = read_request(&mut stream).await else {
                    continue;
                };
                log.lock().unwrap().push(request);
                let (status, body) = answers
                    .next()
                    .unwrap_or((404, json!({ "message": "Not Found" })));
                write_response(&mut stream, status, &body).await;
            }
        });
        Self {
            url,
            received,
            handle,
        }
    }

    /// Base url, `http://127.0.0.1:<port>`
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Requests received so far
    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    /// `METHOD path` of every request received so far
    pub fn calls(&self) -> Vec<String> {
        self.received()
            .into_iter()
            .map(|request| format!("{} {}", request.method, request.path))
            .collect()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Read the request line, the headers and a `Content-Length` body
async fn read_request(stream: &mut TcpStream) -> Option<Received> {
    let mut buffer = vec![];
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(position) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break position + 4;
        }
    };
    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buffer.len() < header_end + length {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }
    let body = serde_json::from_slice(&buffer[header_end..]).unwrap_or(Value::Null);
    Some(Received { method, path, body })
}

/// Write a JSON answer and close the connection
async fn write_response(stream: &mut TcpStream, status: u16, body: &Value) {
    let body = match body {
        Value::Null => String::new(),
        other => other.to_string(),
    };
    let reason = StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unknown");
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}
