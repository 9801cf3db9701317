//! File-based client configuration.
//!
//! # Configuration Format
//!
//! ```toml
//! [server]
//! url = "https://forum.example.com"
//! timeout = 30                   # REST request timeout, seconds
//! max_retries = 3                # per-request retry budget
//!
//! [connection]
//! auto_reconnect = true
//! reconnect_delay_ms = 1000      # first backoff step
//! max_reconnect_delay_ms = 30000
//! max_reconnect_attempts = 5     # 0 = unlimited
//! connect_timeout = 10           # seconds
//!
//! [stream]
//! heartbeat_timeout = 45         # seconds of silence before reconnecting, 0 = off
//! feed_capacity = 200
//!
//! [pagination]
//! page_size = 20
//! strict_sequence = false
//!
//! [auth]
//! jwt_token = "..."
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AgoraLinkError, Result};
use crate::models::{ConnectionOptions, PageRequest, DEFAULT_PAGE_SIZE};
use crate::pagination::SequencePolicy;
use crate::stream::DEFAULT_FEED_CAPACITY;
use crate::timeouts::AgoraLinkTimeouts;

/// Client configuration loaded from a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AgoraConfig {
    pub server: ServerConfig,
    pub connection: ConnectionConfig,
    pub stream: StreamConfig,
    pub pagination: PaginationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Forum base URL
    pub url: String,
    /// REST request timeout in seconds
    pub timeout: u64,
    /// Per-request retry budget
    pub max_retries: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".to_string(),
            timeout: 30,
            max_retries: 3,
        }
    }
}

/// Reconnection behaviour of the notification stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub auto_reconnect: bool,
    pub reconnect_delay_ms: u64,
    pub max_reconnect_delay_ms: u64,
    /// 0 = unlimited
    pub max_reconnect_attempts: u32,
    /// Seconds allowed for opening a connection
    pub connect_timeout: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        let options = ConnectionOptions::default();
        Self {
            auto_reconnect: options.auto_reconnect,
            reconnect_delay_ms: options.reconnect_delay_ms,
            max_reconnect_delay_ms: options.max_reconnect_delay_ms,
            max_reconnect_attempts: options.max_reconnect_attempts.unwrap_or(0),
            connect_timeout: AgoraLinkTimeouts::default().connection_timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Seconds of silence tolerated on an open stream (0 = no watchdog)
    pub heartbeat_timeout: u64,
    /// Notifications kept in memory
    pub feed_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout: AgoraLinkTimeouts::default().heartbeat_timeout.as_secs(),
            feed_capacity: DEFAULT_FEED_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub page_size: u32,
    /// Drop pages that arrive out of sequence
    pub strict_sequence: bool,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            strict_sequence: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Bearer token used when no session user is signed in
    pub jwt_token: Option<String>,
}

/// Expand a leading `~/` to the home directory.
pub fn expand_config_path(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(rest);
        }
    }
    path.to_path_buf()
}

/// `<config dir>/agora/config.toml`, falling back to `~/.agora/config.toml`.
pub fn default_config_path() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join("agora").join("config.toml"),
        None => expand_config_path(Path::new("~/.agora/config.toml")),
    }
}

impl AgoraConfig {
    /// Load configuration from file.
    ///
    /// Returns the default configuration if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        let path = expand_config_path(path);
        if !path.exists() {
            log::debug!("[agora-link] No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path).map_err(|e| {
            AgoraLinkError::ConfigurationError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: AgoraConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let path = expand_config_path(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| AgoraLinkError::ConfigurationError(format!("Failed to serialize: {}", e)))?;
        std::fs::write(&path, contents)?;
        Ok(())
    }

    pub fn to_connection_options(&self) -> ConnectionOptions {
        let conn = &self.connection;
        let max_attempts = match conn.max_reconnect_attempts {
            0 => None,
            n => Some(n),
        };
        ConnectionOptions::new()
            .with_auto_reconnect(conn.auto_reconnect)
            .with_reconnect_delay_ms(conn.reconnect_delay_ms)
            .with_max_reconnect_delay_ms(conn.max_reconnect_delay_ms)
            .with_max_reconnect_attempts(max_attempts)
    }

    pub fn to_timeouts(&self) -> AgoraLinkTimeouts {
        AgoraLinkTimeouts::builder()
            .connection_timeout(Duration::from_secs(self.connection.connect_timeout))
            .request_timeout(Duration::from_secs(self.server.timeout))
            .heartbeat_timeout(Duration::from_secs(self.stream.heartbeat_timeout))
            .build()
    }

    pub fn sequence_policy(&self) -> SequencePolicy {
        if self.pagination.strict_sequence {
            SequencePolicy::Strict
        } else {
            SequencePolicy::Trusting
        }
    }

    /// First-page request with the configured page size.
    pub fn first_page(&self) -> PageRequest {
        PageRequest::new(1, self.pagination.page_size)
    }

    pub fn jwt_token(&self) -> Option<&str> {
        self.auth.as_ref().and_then(|auth| auth.jwt_token.as_deref())
    }
}
