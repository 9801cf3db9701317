//! # agora-link: Agora forum client library
//!
//! Client-side plumbing for the Agora community forum:
//!
//! - **Notification stream**: [`StreamConnectionManager`] keeps one
//!   Server-Sent Events channel open per signed-in user, reconnecting with
//!   exponential backoff and a heartbeat watchdog.
//! - **Infinite scroll**: [`PaginatedAccumulator`] merges fetched pages into
//!   one list and, through a [`Viewport`], holds the reader's scroll position
//!   while appended pages render.
//! - **REST**: [`AgoraLinkClient`] covers posts, comments, reactions and
//!   notifications, with optimistic toggles via [`Optimistic`].
//! - **Session**: [`Session`] carries the signed-in user and notifies
//!   observers; [`NotificationCenter`] connects and disconnects the stream as
//!   users sign in and out.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agora_link::{AgoraLinkClient, EventHandlers, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::new();
//!     let client = AgoraLinkClient::builder()
//!         .base_url("https://forum.example.com")
//!         .session(session.clone())
//!         .event_handlers(
//!             EventHandlers::new().on_status_change(|status| log::info!("stream {}", status)),
//!         )
//!         .build()?;
//!
//!     let center = client.notification_center()?;
//!     client.login("ada@example.com", "hunter2").await?;
//!
//!     // The stream is now connecting for the signed-in user.
//!     println!("{} unread", center.unread_count());
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod event_handlers;
mod listeners;
pub mod models;
pub mod optimistic;
pub mod pagination;
mod rest;
pub mod session;
pub mod sse;
pub mod stream;
pub mod timeouts;
pub mod transport;

pub use auth::AuthProvider;
pub use client::{AgoraLinkClient, AgoraLinkClientBuilder};
pub use config::AgoraConfig;
pub use error::{AgoraLinkError, Result};
pub use event_handlers::{ConnectionError, DisconnectReason, EventHandlers};
pub use listeners::ListenerId;
pub use models::{
    Category, Comment, CommentTree, ConnectionOptions, HealthCheckResponse, LoginRequest, LoginResponse, NewComment,
    NewPost, Notification, NotificationKind, Page, PageRequest, PaginatedResponse, Post, PostQuery, PostSort,
    ReactionState, StreamMessage, Subcategory, UnreadCount, UserProfile, UserSummary,
};
pub use optimistic::{MutationOutcome, Optimistic, PendingMutation};
pub use pagination::{AccumulatorState, PageApplied, PaginatedAccumulator, ScrollGuard, SequencePolicy, Viewport};
pub use session::{AuthEvent, AuthState, Session};
pub use stream::{
    ConnectionStatus, FeedChange, NotificationCenter, NotificationFeed, StreamConnectionManager,
    StreamConnectionManagerBuilder,
};
pub use timeouts::{AgoraLinkTimeouts, AgoraLinkTimeoutsBuilder};
pub use transport::{ByteStream, HttpSseTransport, StreamTransport};
