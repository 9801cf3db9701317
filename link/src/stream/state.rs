use std::fmt;
use std::time::Duration;

/// Connection state of a [`StreamConnectionManager`](super::StreamConnectionManager).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// No connection and none wanted: never connected, or `disconnect()` was called.
    #[default]
    Disconnected,
    /// Opening the transport.
    Connecting,
    /// The transport is open and messages flow to listeners.
    Open,
    /// The transport closed; a reconnect is scheduled.
    ClosedRetrying {
        /// 1-based number of the scheduled attempt.
        attempt: u32,
        /// Backoff delay before that attempt.
        retry_in: Duration,
    },
    /// The retry budget is spent. Nothing happens until `connect()` is called again.
    ClosedExhausted {
        /// Reconnection attempts made before giving up.
        attempts: u32,
    },
}

impl ConnectionStatus {
    /// Whether messages are currently flowing.
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionStatus::Open)
    }

    /// Whether the manager is between attempts and will retry on its own.
    pub fn is_retrying(&self) -> bool {
        matches!(self, ConnectionStatus::ClosedRetrying { .. })
    }

    /// Whether the manager will make no further progress without `connect()`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Disconnected | ConnectionStatus::ClosedExhausted { .. }
        )
    }

    /// Short machine-friendly label.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Open => "open",
            ConnectionStatus::ClosedRetrying { .. } => "retrying",
            ConnectionStatus::ClosedExhausted { .. } => "exhausted",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::ClosedRetrying { attempt, retry_in } => {
                write!(f, "retrying (attempt {} in {}ms)", attempt, retry_in.as_millis())
            },
            ConnectionStatus::ClosedExhausted { attempts } => {
                write!(f, "exhausted after {} attempts", attempts)
            },
            other => f.write_str(other.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(ConnectionStatus::Open.is_open());
        assert!(ConnectionStatus::Disconnected.is_terminal());
        assert!(ConnectionStatus::ClosedExhausted { attempts: 5 }.is_terminal());
        let retrying = ConnectionStatus::ClosedRetrying {
            attempt: 2,
            retry_in: Duration::from_secs(2),
        };
        assert!(retrying.is_retrying());
        assert!(!retrying.is_terminal());
        assert!(!ConnectionStatus::Connecting.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectionStatus::default().to_string(), "disconnected");
        assert_eq!(
            ConnectionStatus::ClosedRetrying {
                attempt: 3,
                retry_in: Duration::from_millis(4000)
            }
            .to_string(),
            "retrying (attempt 3 in 4000ms)"
        );
        assert_eq!(
            ConnectionStatus::ClosedExhausted { attempts: 5 }.to_string(),
            "exhausted after 5 attempts"
        );
    }
}
