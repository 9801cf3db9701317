//! `HttpSseTransport` against a local HTTP server.

mod common;

use agora_link::{
    AgoraLinkError, AgoraLinkTimeouts, AuthProvider, ConnectionOptions, ConnectionStatus, HttpSseTransport,
    StreamConnectionManager, StreamTransport,
};
use common::{count_json, init_logging, notification_json, MockHttpServer, MockResponse, Recorder};
use futures_util::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn transport() -> HttpSseTransport {
    HttpSseTransport::new(Duration::from_secs(5)).expect("build transport")
}

#[tokio::test]
async fn test_open_sends_stream_headers_and_yields_body() {
    init_logging();
    let body = format!("id: 3\ndata: {}\n\n", count_json(2));
    let server = MockHttpServer::start(move |_| MockResponse::sse(&body)).await;
    let url = format!("{}/api/notifications/stream/42", server.base_url);

    let mut stream = transport()
        .open(&url, &AuthProvider::jwt_token("tok".into()), Some("2"))
        .await
        .expect("open stream");

    let mut received = Vec::new();
    while let Some(chunk) = stream.next().await {
        received.extend_from_slice(&chunk.expect("chunk"));
    }
    assert!(String::from_utf8_lossy(&received).contains("\"count\""));

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "GET");
    assert_eq!(request.path(), "/api/notifications/stream/42");
    assert_eq!(request.header("accept"), Some("text/event-stream"));
    assert_eq!(request.header("cache-control"), Some("no-cache"));
    assert_eq!(request.header("authorization"), Some("Bearer tok"));
    assert_eq!(request.header("last-event-id"), Some("2"));
}

#[tokio::test]
async fn test_anonymous_open_has_no_authorization() {
    let server = MockHttpServer::start(|_| MockResponse::sse(": hi\n\n")).await;
    let url = format!("{}/api/notifications/stream/1", server.base_url);
    let _stream = transport().open(&url, &AuthProvider::None, None).await.unwrap();

    let request = &server.requests()[0];
    assert_eq!(request.header("authorization"), None);
    assert_eq!(request.header("last-event-id"), None);
}

#[tokio::test]
async fn test_zero_connect_timeout_means_unbounded() {
    let server = MockHttpServer::start(|_| MockResponse::sse(": hi\n\n")).await;
    let url = format!("{}/api/notifications/stream/1", server.base_url);
    let transport = HttpSseTransport::new(Duration::ZERO).expect("build transport");
    transport
        .open(&url, &AuthProvider::None, None)
        .await
        .expect("zero connect timeout must not fail the handshake");
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication_error() {
    let server = MockHttpServer::start(|_| MockResponse::json(401, serde_json::json!({"message": "expired"}))).await;
    let url = format!("{}/api/notifications/stream/1", server.base_url);
    let err = transport().open(&url, &AuthProvider::None, None).await.err().unwrap();
    assert!(matches!(err, AgoraLinkError::AuthenticationError(_)), "{:?}", err);
}

#[tokio::test]
async fn test_server_error_carries_message() {
    let server =
        MockHttpServer::start(|_| MockResponse::json(503, serde_json::json!({"message": "draining"}))).await;
    let url = format!("{}/api/notifications/stream/1", server.base_url);
    let err = transport().open(&url, &AuthProvider::None, None).await.err().unwrap();
    assert_eq!(
        err,
        AgoraLinkError::ServerError {
            status_code: 503,
            message: "draining".into()
        }
    );
}

#[tokio::test]
async fn test_wrong_content_type_is_stream_error() {
    let server = MockHttpServer::start(|_| MockResponse::json(200, serde_json::json!({"ok": true}))).await;
    let url = format!("{}/api/notifications/stream/1", server.base_url);
    let err = transport().open(&url, &AuthProvider::None, None).await.err().unwrap();
    assert!(matches!(err, AgoraLinkError::StreamError(ref m) if m.contains("application/json")), "{:?}", err);
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    // Bind then drop to get a port nobody listens on.
    let port = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let url = format!("http://127.0.0.1:{}/api/notifications/stream/1", port);
    let err = transport().open(&url, &AuthProvider::None, None).await.err().unwrap();
    assert!(matches!(err, AgoraLinkError::NetworkError(_)), "{:?}", err);
}

#[tokio::test]
async fn test_manager_over_http_delivers_and_resumes() {
    init_logging();
    let body = format!(
        ": keep-alive\n\nid: n-1\ndata: {}\n\nevent: ping\ndata: {{}}\n\n",
        notification_json(1, "first")
    );
    let served = AtomicUsize::new(0);
    let server = MockHttpServer::start(move |_| {
        if served.fetch_add(1, Ordering::SeqCst) < 2 {
            MockResponse::sse(&body)
        } else {
            MockResponse::empty(503)
        }
    })
    .await;

    let recorder = Recorder::new();
    let manager: StreamConnectionManager = StreamConnectionManager::builder()
        .base_url(server.base_url.clone())
        .auth(AuthProvider::jwt_token("tok".into()))
        .connection_options(
            ConnectionOptions::new()
                .with_reconnect_delay_ms(20)
                .with_max_reconnect_attempts(Some(1)),
        )
        .timeouts(AgoraLinkTimeouts::builder().heartbeat_timeout(Duration::ZERO).build())
        .event_handlers(recorder.handlers())
        .build()
        .unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    manager.add_listener(move |m| {
        let _ = tx.send(m.clone());
    });
    manager.connect("42");

    // Each response ends after its body; the third open is refused.
    let first = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert_eq!(first.item().map(|n| n.id), Some(1));
    let second = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert_eq!(second.item().map(|n| n.id), Some(1));

    let mut status = manager.status_receiver();
    timeout(
        Duration::from_secs(5),
        status.wait_for(|s| matches!(s, ConnectionStatus::ClosedExhausted { .. })),
    )
    .await
    .unwrap()
    .unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].path(), "/api/notifications/stream/42");
    assert_eq!(requests[0].header("last-event-id"), None);
    assert_eq!(requests[1].header("last-event-id"), Some("n-1"));
    assert!(requests.iter().all(|r| r.header("authorization") == Some("Bearer tok")));
    assert_eq!(recorder.disconnects().len(), 2);
    assert_eq!(manager.connection_status(), ConnectionStatus::ClosedExhausted { attempts: 1 });
}

#[tokio::test]
async fn test_default_transport_is_http() {
    let server = MockHttpServer::start(|_| MockResponse::sse(&format!("data: {}\n\n", count_json(9)))).await;
    let manager: StreamConnectionManager = StreamConnectionManager::builder()
        .base_url(format!("{}/", server.base_url))
        .connection_options(ConnectionOptions::new().with_auto_reconnect(false))
        .build()
        .unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    manager.add_listener(move |m| {
        let _ = tx.send(m.count());
    });
    manager.connect("5");

    let count = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert_eq!(count, Some(9));
    assert_eq!(server.requests()[0].path(), "/api/notifications/stream/5");
}
