//! Live notification stream.
//!
//! - [`StreamConnectionManager`]: one SSE channel per subscriber with
//!   exponential-backoff reconnects and a heartbeat watchdog.
//! - [`ConnectionStatus`]: observable lifecycle state.
//! - [`NotificationFeed`] and [`NotificationCenter`]: apply stream messages to
//!   a client-side list and follow the session's sign-in state.

mod center;
mod feed;
mod manager;
mod state;

pub use center::NotificationCenter;
pub use feed::{FeedChange, NotificationFeed, DEFAULT_FEED_CAPACITY};
pub use manager::{StreamConnectionManager, StreamConnectionManagerBuilder};
pub use state::ConnectionStatus;
