#![allow(dead_code)]
//! Shared fixtures for agora-link integration tests.
//!
//! - [`ScriptedTransport`]: an in-memory [`StreamTransport`] whose `open`
//!   outcomes are queued by the test, so reconnect timing can be checked
//!   under a paused tokio clock.
//! - [`MockHttpServer`]: a minimal HTTP/1.1 server on a local
//!   `TcpListener` for exercising the reqwest-based code paths.

use agora_link::{
    AgoraLinkError, AuthProvider, ByteStream, ConnectionError, ConnectionStatus, DisconnectReason, EventHandlers,
    Notification, NotificationKind, Result, StreamTransport,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::Instant;

static LOGGER: Once = Once::new();

pub fn init_logging() {
    LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

// ---------------------------------------------------------------------------
// Scripted stream transport
// ---------------------------------------------------------------------------

enum Script {
    Fail(AgoraLinkError),
    Open(mpsc::UnboundedReceiver<Result<Bytes>>),
    Hang,
}

/// One call to `open`.
#[derive(Debug, Clone)]
pub struct OpenRecord {
    pub url: String,
    pub at: Instant,
    pub auth: AuthProvider,
    pub last_event_id: Option<String>,
}

/// Test-side handle feeding an opened stream.
pub struct StreamFeed {
    tx: mpsc::UnboundedSender<Result<Bytes>>,
}

impl StreamFeed {
    /// Send raw SSE text. Returns false once the manager dropped the stream.
    pub fn send(&self, raw: &str) -> bool {
        self.tx.send(Ok(Bytes::copy_from_slice(raw.as_bytes()))).is_ok()
    }

    /// Send one `data:` event carrying `json`.
    pub fn event(&self, json: &str) -> bool {
        self.send(&format!("data: {}\n\n", json))
    }

    pub fn heartbeat(&self) -> bool {
        self.send(": keep-alive\n\n")
    }

    /// Fail the stream with a transport error.
    pub fn fail(self, message: &str) {
        let _ = self.tx.send(Err(AgoraLinkError::NetworkError(message.to_string())));
    }

    /// End the stream cleanly.
    pub fn close(self) {}
}

/// `open` outcomes are consumed in order; with nothing queued, `open` fails.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    opens: Mutex<Vec<OpenRecord>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_failure(&self, message: &str) {
        self.scripts
            .lock()
            .unwrap()
            .push_back(Script::Fail(AgoraLinkError::NetworkError(message.to_string())));
    }

    pub fn push_error(&self, error: AgoraLinkError) {
        self.scripts.lock().unwrap().push_back(Script::Fail(error));
    }

    /// Queue a successful open; the returned feed drives its body.
    pub fn push_stream(&self) -> StreamFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        self.scripts.lock().unwrap().push_back(Script::Open(rx));
        StreamFeed { tx }
    }

    /// Queue an open that never completes.
    pub fn push_hang(&self) {
        self.scripts.lock().unwrap().push_back(Script::Hang);
    }

    pub fn opens(&self) -> Vec<OpenRecord> {
        self.opens.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.opens.lock().unwrap().len()
    }
}

#[async_trait]
impl StreamTransport for ScriptedTransport {
    async fn open(&self, url: &str, auth: &AuthProvider, last_event_id: Option<&str>) -> Result<ByteStream> {
        self.opens.lock().unwrap().push(OpenRecord {
            url: url.to_string(),
            at: Instant::now(),
            auth: auth.clone(),
            last_event_id: last_event_id.map(str::to_string),
        });
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Open(rx)) => {
                let stream = futures_util::stream::unfold(rx, |mut rx| async move {
                    rx.recv().await.map(|item| (item, rx))
                });
                Ok(Box::pin(stream))
            },
            Some(Script::Fail(error)) => Err(error),
            Some(Script::Hang) => futures_util::future::pending().await,
            None => Err(AgoraLinkError::NetworkError("connection refused".to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Event recording
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Lifecycle {
    Connected,
    Disconnected(DisconnectReason),
    Error(ConnectionError),
    Status(ConnectionStatus),
}

/// Collects every lifecycle callback in order.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<(Instant, Lifecycle)>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handlers(&self) -> EventHandlers {
        let on_connect = self.clone();
        let on_disconnect = self.clone();
        let on_error = self.clone();
        let on_status = self.clone();
        EventHandlers::new()
            .on_connect(move || on_connect.push(Lifecycle::Connected))
            .on_disconnect(move |reason| on_disconnect.push(Lifecycle::Disconnected(reason)))
            .on_error(move |error| on_error.push(Lifecycle::Error(error)))
            .on_status_change(move |status| on_status.push(Lifecycle::Status(status.clone())))
    }

    fn push(&self, event: Lifecycle) {
        self.events.lock().unwrap().push((Instant::now(), event));
    }

    pub fn events(&self) -> Vec<Lifecycle> {
        self.events.lock().unwrap().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn statuses(&self) -> Vec<ConnectionStatus> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Lifecycle::Status(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<ConnectionError> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Lifecycle::Error(err) => Some(err),
                _ => None,
            })
            .collect()
    }

    pub fn disconnects(&self) -> Vec<DisconnectReason> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Lifecycle::Disconnected(reason) => Some(reason),
                _ => None,
            })
            .collect()
    }
}

pub fn notification_json(id: i64, message: &str) -> String {
    serde_json::json!({
        "kind": "item",
        "data": { "id": id, "kind": "reply", "message": message, "read": false }
    })
    .to_string()
}

pub fn count_json(count: u64) -> String {
    serde_json::json!({ "kind": "count", "data": count }).to_string()
}

pub fn notification(id: i64) -> Notification {
    Notification {
        id,
        kind: NotificationKind::Reply,
        message: format!("reply {}", id),
        actor: None,
        post_id: None,
        post_slug: None,
        comment_id: None,
        read: false,
        created_at: String::new(),
    }
}

// ---------------------------------------------------------------------------
// Minimal HTTP server
// ---------------------------------------------------------------------------

/// A request as seen by [`MockHttpServer`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or("")
    }

    pub fn query(&self) -> &str {
        self.target.split_once('?').map(|(_, q)| q).unwrap_or("")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// A canned response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    pub delay: Duration,
}

impl MockResponse {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn sse(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "text/event-stream",
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    /// Hold the response back for `delay` before writing it.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: String::new(),
            delay: Duration::ZERO,
        }
    }
}

type Handler = Arc<dyn Fn(&RecordedRequest) -> MockResponse + Send + Sync>;

/// Serves every connection with `handler`, one request per connection.
pub struct MockHttpServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: tokio::task::JoinHandle<()>,
}

impl MockHttpServer {
    pub async fn start(handler: impl Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
        let addr = listener.local_addr().expect("mock server addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Handler = Arc::new(handler);

        let recorded = requests.clone();
        let task = tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let handler = handler.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let Some(request) = read_request(&mut socket).await else {
                        return;
                    };
                    recorded.lock().unwrap().push(request.clone());
                    let response = handler(&request);
                    if !response.delay.is_zero() {
                        tokio::time::sleep(response.delay).await;
                    }
                    let head = format!(
                        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        response.status,
                        reason_phrase(response.status),
                        response.content_type,
                        response.body.len()
                    );
                    let _ = socket.write_all(head.as_bytes()).await;
                    let _ = socket.write_all(response.body.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            requests,
            task,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockHttpServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length: usize = headers.get("content-length").and_then(|v| v.parse().ok()).unwrap_or(0);
    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(RecordedRequest {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    })
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
