//! Error types for the agora-link client library.

use thiserror::Error;

/// Errors produced by agora-link operations.
///
/// Stream transport failures never reach callers of
/// [`StreamConnectionManager::connect`](crate::StreamConnectionManager::connect);
/// they are reported through connection status and
/// [`EventHandlers`](crate::EventHandlers) instead. This type covers the REST
/// surface, configuration loading, and the transport seam itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgoraLinkError {
    /// Network-level failure (DNS, connect, reset).
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Push-channel failure (bad status, wrong content type, stream ended).
    #[error("Stream error: {0}")]
    StreamError(String),

    /// An operation exceeded its configured timeout.
    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// The server answered with a non-success status.
    #[error("Server error ({status_code}): {message}")]
    ServerError {
        /// HTTP status code.
        status_code: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// Credentials were rejected or are missing.
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// Invalid client configuration (bad URL, unreadable config file).
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal invariant violation.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<reqwest::Error> for AgoraLinkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AgoraLinkError::TimeoutError(err.to_string())
        } else if err.is_decode() {
            AgoraLinkError::SerializationError(err.to_string())
        } else {
            AgoraLinkError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AgoraLinkError {
    fn from(err: serde_json::Error) -> Self {
        AgoraLinkError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for AgoraLinkError {
    fn from(err: toml::de::Error) -> Self {
        AgoraLinkError::ConfigurationError(format!("Invalid config file: {}", err))
    }
}

impl From<std::io::Error> for AgoraLinkError {
    fn from(err: std::io::Error) -> Self {
        AgoraLinkError::ConfigurationError(err.to_string())
    }
}

impl AgoraLinkError {
    /// Whether retrying the same request may succeed.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::NetworkError(_) | Self::TimeoutError(_) | Self::StreamError(_) => true,
            Self::ServerError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

/// Result alias used throughout agora-link.
pub type Result<T> = std::result::Result<T, AgoraLinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let err = AgoraLinkError::ServerError {
            status_code: 404,
            message: "post not found".to_string(),
        };
        assert_eq!(err.to_string(), "Server error (404): post not found");
    }

    #[test]
    fn test_retriable_classification() {
        assert!(AgoraLinkError::NetworkError("reset".into()).is_retriable());
        assert!(AgoraLinkError::ServerError { status_code: 503, message: String::new() }.is_retriable());
        assert!(!AgoraLinkError::ServerError { status_code: 400, message: String::new() }.is_retriable());
        assert!(!AgoraLinkError::AuthenticationError("expired".into()).is_retriable());
    }

    #[test]
    fn test_json_error_maps_to_serialization() {
        let err: AgoraLinkError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, AgoraLinkError::SerializationError(_)));
    }
}
