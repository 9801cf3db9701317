//! Timeout configuration for agora-link operations.
//!
//! Centralizes the time budgets used by the REST client and the
//! notification stream.

use std::time::Duration;

/// Timeout configuration for agora-link operations.
///
/// # Examples
///
/// ```rust
/// use agora_link::AgoraLinkTimeouts;
/// use std::time::Duration;
///
/// // Defaults suit most deployments
/// let timeouts = AgoraLinkTimeouts::default();
///
/// // Tolerate a slow proxy in front of the stream endpoint
/// let timeouts = AgoraLinkTimeouts::builder()
///     .connection_timeout(Duration::from_secs(30))
///     .heartbeat_timeout_secs(90)
///     .build();
///
/// // Local development against a dev server
/// let timeouts = AgoraLinkTimeouts::fast();
/// ```
#[derive(Debug, Clone)]
pub struct AgoraLinkTimeouts {
    /// Timeout for opening a connection (TCP + TLS + response headers).
    /// Applies to both REST requests and the stream handshake.
    /// Default: 10 seconds
    pub connection_timeout: Duration,

    /// Total timeout for a single REST request.
    /// Default: 30 seconds
    pub request_timeout: Duration,

    /// Maximum silence tolerated on an open stream. Any frame, including
    /// heartbeat comments, resets the window. When it elapses the connection
    /// is treated as dead and the reconnect path runs.
    /// Set to 0 to disable.
    /// Default: 45 seconds
    pub heartbeat_timeout: Duration,
}

impl Default for AgoraLinkTimeouts {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            heartbeat_timeout: Duration::from_secs(45),
        }
    }
}

impl AgoraLinkTimeouts {
    /// Create a new builder for custom timeout configuration.
    pub fn builder() -> AgoraLinkTimeoutsBuilder {
        AgoraLinkTimeoutsBuilder::new()
    }

    /// Short timeouts for a localhost backend.
    pub fn fast() -> Self {
        Self {
            connection_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(5),
            heartbeat_timeout: Duration::from_secs(20),
        }
    }

    /// Long timeouts for high-latency or unreliable networks.
    pub fn relaxed() -> Self {
        Self {
            connection_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
            heartbeat_timeout: Duration::from_secs(120),
        }
    }

    /// Check if a duration represents "no timeout" (zero or very large).
    pub fn is_no_timeout(duration: Duration) -> bool {
        duration.is_zero() || duration > Duration::from_secs(86400 * 365)
    }
}

/// Builder for creating custom [`AgoraLinkTimeouts`] configurations.
#[derive(Debug, Clone)]
pub struct AgoraLinkTimeoutsBuilder {
    timeouts: AgoraLinkTimeouts,
}

impl AgoraLinkTimeoutsBuilder {
    fn new() -> Self {
        Self {
            timeouts: AgoraLinkTimeouts::default(),
        }
    }

    /// Set the connection timeout.
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connection_timeout = timeout;
        self
    }

    /// Set the connection timeout in seconds.
    pub fn connection_timeout_secs(self, secs: u64) -> Self {
        self.connection_timeout(Duration::from_secs(secs))
    }

    /// Set the REST request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.request_timeout = timeout;
        self
    }

    /// Set the REST request timeout in seconds.
    pub fn request_timeout_secs(self, secs: u64) -> Self {
        self.request_timeout(Duration::from_secs(secs))
    }

    /// Set the stream heartbeat window.
    /// Set to 0 to disable.
    pub fn heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.heartbeat_timeout = timeout;
        self
    }

    /// Set the stream heartbeat window in seconds.
    /// Set to 0 to disable.
    pub fn heartbeat_timeout_secs(self, secs: u64) -> Self {
        self.heartbeat_timeout(Duration::from_secs(secs))
    }

    /// Build the timeout configuration.
    pub fn build(self) -> AgoraLinkTimeouts {
        self.timeouts
    }
}
