//! Connection lifecycle event handlers for the notification stream.
//!
//! Provides callback-based hooks for monitoring the stream connection:
//!
//! - [`on_connect`](EventHandlers::on_connect): Fired when the stream opens
//! - [`on_disconnect`](EventHandlers::on_disconnect): Fired when an open stream closes
//! - [`on_error`](EventHandlers::on_error): Fired on transport or protocol errors
//! - [`on_status_change`](EventHandlers::on_status_change): Fired on every status transition
//! - [`on_receive`](EventHandlers::on_receive): Optional debug hook for raw frames
//!
//! These are separate from message listeners registered with
//! [`StreamConnectionManager::add_listener`](crate::StreamConnectionManager::add_listener):
//! handlers observe the connection, listeners consume its payload.
//!
//! # Example
//!
//! ```rust,no_run
//! use agora_link::{AgoraLinkClient, EventHandlers};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handlers = EventHandlers::new()
//!     .on_connect(|| log::info!("notifications live"))
//!     .on_disconnect(|reason| log::info!("notifications paused: {}", reason))
//!     .on_error(|error| log::warn!("stream error: {}", error));
//!
//! let client = AgoraLinkClient::builder()
//!     .base_url("https://forum.example.com")
//!     .event_handlers(handlers)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use crate::stream::ConnectionStatus;

/// Reason for a disconnect event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectReason {
    /// Human-readable description of why the connection closed.
    pub message: String,
    /// HTTP status code, when the close was caused by one.
    pub code: Option<u16>,
}

impl DisconnectReason {
    /// Create a new disconnect reason with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Create a new disconnect reason with a message and status code.
    pub fn with_code(message: impl Into<String>, code: u16) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.code {
            write!(f, "{} (code: {})", self.message, code)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

/// Error information passed to the `on_error` handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionError {
    /// Human-readable error message.
    pub message: String,
    /// Whether this error is recoverable (i.e. a reconnect may succeed).
    pub recoverable: bool,
}

impl ConnectionError {
    /// Create a new connection error.
    pub fn new(message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            message: message.into(),
            recoverable,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Type alias for the on_connect callback.
pub type OnConnectCallback = Arc<dyn Fn() + Send + Sync>;

/// Type alias for the on_disconnect callback.
pub type OnDisconnectCallback = Arc<dyn Fn(DisconnectReason) + Send + Sync>;

/// Type alias for the on_error callback.
pub type OnErrorCallback = Arc<dyn Fn(ConnectionError) + Send + Sync>;

/// Type alias for the on_status_change callback.
pub type OnStatusChangeCallback = Arc<dyn Fn(&ConnectionStatus) + Send + Sync>;

/// Type alias for the on_receive callback (debug hook for raw frames).
pub type OnReceiveCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Connection lifecycle event handlers.
///
/// All handlers are optional. Handlers are `Send + Sync` and run on the
/// connection's background task, so keep them short.
#[derive(Clone, Default)]
pub struct EventHandlers {
    pub(crate) on_connect: Option<OnConnectCallback>,
    pub(crate) on_disconnect: Option<OnDisconnectCallback>,
    pub(crate) on_error: Option<OnErrorCallback>,
    pub(crate) on_status_change: Option<OnStatusChangeCallback>,
    pub(crate) on_receive: Option<OnReceiveCallback>,
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_status_change", &self.on_status_change.is_some())
            .field("on_receive", &self.on_receive.is_some())
            .finish()
    }
}

impl EventHandlers {
    /// Create a new empty `EventHandlers` (no callbacks registered).
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback invoked when the stream opens.
    pub fn on_connect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Arc::new(f));
        self
    }

    /// Register a callback invoked when an open stream closes, whether by
    /// transport failure, heartbeat timeout or [`disconnect`](crate::StreamConnectionManager::disconnect).
    ///
    /// # Example
    /// ```rust
    /// use agora_link::EventHandlers;
    ///
    /// let handlers = EventHandlers::new()
    ///     .on_disconnect(|reason| log::info!("Disconnected: {}", reason));
    /// ```
    pub fn on_disconnect(mut self, f: impl Fn(DisconnectReason) + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Arc::new(f));
        self
    }

    /// Register a callback invoked when a connection error occurs.
    ///
    /// The callback receives a [`ConnectionError`] indicating whether the
    /// manager will keep retrying (`recoverable`) or has given up.
    pub fn on_error(mut self, f: impl Fn(ConnectionError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Register a callback invoked on every [`ConnectionStatus`] transition.
    ///
    /// Useful for driving a "live / reconnecting / offline" indicator.
    pub fn on_status_change(mut self, f: impl Fn(&ConnectionStatus) + Send + Sync + 'static) -> Self {
        self.on_status_change = Some(Arc::new(f));
        self
    }

    /// Register a callback invoked for every raw data payload received.
    ///
    /// This is a **debug/tracing hook**; it sees the payload before parsing,
    /// heartbeats excluded.
    pub fn on_receive(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_receive = Some(Arc::new(f));
        self
    }

    /// Returns `true` if any handler is registered.
    pub fn has_any(&self) -> bool {
        self.on_connect.is_some()
            || self.on_disconnect.is_some()
            || self.on_error.is_some()
            || self.on_status_change.is_some()
            || self.on_receive.is_some()
    }

    // ---------------------------------------------------------------
    // Internal dispatch helpers
    // ---------------------------------------------------------------

    pub(crate) fn emit_connect(&self) {
        if let Some(cb) = &self.on_connect {
            cb();
        }
    }

    pub(crate) fn emit_disconnect(&self, reason: DisconnectReason) {
        if let Some(cb) = &self.on_disconnect {
            cb(reason);
        }
    }

    pub(crate) fn emit_error(&self, error: ConnectionError) {
        if let Some(cb) = &self.on_error {
            cb(error);
        }
    }

    pub(crate) fn emit_status(&self, status: &ConnectionStatus) {
        if let Some(cb) = &self.on_status_change {
            cb(status);
        }
    }

    pub(crate) fn emit_receive(&self, raw: &str) {
        if let Some(cb) = &self.on_receive {
            cb(raw);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_empty_handlers() {
        let handlers = EventHandlers::new();
        assert!(!handlers.has_any());
        // Dispatching with nothing registered is a no-op.
        handlers.emit_connect();
        handlers.emit_error(ConnectionError::new("x", true));
    }

    #[test]
    fn test_dispatch_reaches_registered_callbacks() {
        let connects = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));
        let c = connects.clone();
        let e = errors.clone();
        let handlers = EventHandlers::new()
            .on_connect(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .on_error(move |err| {
                assert!(err.recoverable);
                e.fetch_add(1, Ordering::SeqCst);
            });

        assert!(handlers.has_any());
        handlers.emit_connect();
        handlers.emit_connect();
        handlers.emit_error(ConnectionError::new("dropped", true));
        handlers.emit_disconnect(DisconnectReason::new("ignored"));

        assert_eq!(connects.load(Ordering::SeqCst), 2);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disconnect_reason_display() {
        assert_eq!(DisconnectReason::new("bye").to_string(), "bye");
        assert_eq!(
            DisconnectReason::with_code("Unauthorized", 401).to_string(),
            "Unauthorized (code: 401)"
        );
    }

    #[test]
    fn test_debug_shows_registration_only() {
        let handlers = EventHandlers::new().on_receive(|_| {});
        let dbg = format!("{:?}", handlers);
        assert!(dbg.contains("on_receive: true"));
        assert!(dbg.contains("on_connect: false"));
    }
}
