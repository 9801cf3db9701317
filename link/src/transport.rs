//! Push-channel transport.
//!
//! [`StreamTransport`] opens one long-lived byte stream for a channel URL.
//! [`HttpSseTransport`] is the production implementation over `reqwest`; the
//! trait exists so the connection manager can be driven by other transports
//! (an in-memory script in tests, a platform HTTP stack elsewhere).

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{Stream, StreamExt};
use reqwest::header::{HeaderValue, ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use std::pin::Pin;
use std::time::Duration;

use crate::auth::AuthProvider;
use crate::error::{AgoraLinkError, Result};
use crate::models::ErrorDetail;
use crate::timeouts::AgoraLinkTimeouts;

/// Raw body chunks of an open push channel.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Header carrying the last seen event ID when resuming.
pub const LAST_EVENT_ID_HEADER: &str = "Last-Event-ID";

/// Opens push-channel connections.
///
/// `open` resolves once the server has accepted the channel (for HTTP: the
/// response headers arrived with a success status). Errors returned here, and
/// errors yielded by the stream, are transport errors: the manager logs them
/// and schedules a reconnect.
#[async_trait]
pub trait StreamTransport: Send + Sync + 'static {
    /// Open the channel at `url`.
    async fn open(
        &self,
        url: &str,
        auth: &AuthProvider,
        last_event_id: Option<&str>,
    ) -> Result<ByteStream>;
}

/// Server-Sent Events over HTTP using `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpSseTransport {
    http_client: reqwest::Client,
}

impl HttpSseTransport {
    /// Build a transport whose TCP/TLS handshake is bounded by `connect_timeout`.
    /// A zero duration leaves the handshake unbounded.
    ///
    /// No total request timeout is set: the response body is meant to stay
    /// open indefinitely, and liveness is tracked by the heartbeat watchdog.
    pub fn new(connect_timeout: Duration) -> Result<Self> {
        let mut builder = reqwest::Client::builder().tcp_keepalive(Duration::from_secs(30));
        if !AgoraLinkTimeouts::is_no_timeout(connect_timeout) {
            builder = builder.connect_timeout(connect_timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| {
                AgoraLinkError::ConfigurationError(format!("Failed to build stream HTTP client: {}", e))
            })?;
        Ok(Self { http_client })
    }

    /// Use an existing client. It must not carry a total request timeout.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl StreamTransport for HttpSseTransport {
    async fn open(
        &self,
        url: &str,
        auth: &AuthProvider,
        last_event_id: Option<&str>,
    ) -> Result<ByteStream> {
        log::debug!("[agora-link] Opening SSE stream {}", url);
        let mut request = self
            .http_client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        if let Some(id) = last_event_id {
            request = request.header(LAST_EVENT_ID_HEADER, id);
        }
        request = auth.apply_to_request(request);

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorDetail>(&body)
                .map(|detail| detail.message)
                .unwrap_or(body);
            return Err(match status.as_u16() {
                401 => AgoraLinkError::AuthenticationError(
                    "Unauthorized: notification stream requires a valid token".to_string(),
                ),
                403 => AgoraLinkError::AuthenticationError(
                    "Forbidden: access to this notification stream denied".to_string(),
                ),
                code => AgoraLinkError::ServerError {
                    status_code: code,
                    message: if message.is_empty() {
                        format!("Stream HTTP error: {}", code)
                    } else {
                        message
                    },
                },
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !content_type.starts_with("text/event-stream") {
            return Err(AgoraLinkError::StreamError(format!(
                "Expected text/event-stream, server sent '{}'",
                content_type
            )));
        }

        Ok(Box::pin(
            response.bytes_stream().map(|chunk| chunk.map_err(AgoraLinkError::from)),
        ))
    }
}
