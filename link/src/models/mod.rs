//! Data models for the agora-link client library.
//!
//! Defines the REST request/response structures and the messages pushed
//! over the notification stream.

pub mod category;
pub mod comment;
pub mod connection_options;
pub mod error_detail;
pub mod health_check_response;
pub mod login;
pub mod notification;
pub mod page;
pub mod post;
pub mod reaction_state;
pub mod stream_message;
pub mod user;


pub use category::{Category, Subcategory};
pub use comment::{Comment, CommentTree, NewComment};
pub use connection_options::ConnectionOptions;
pub use error_detail::ErrorDetail;
pub use health_check_response::HealthCheckResponse;
pub use login::{LoginRequest, LoginResponse};
pub use notification::{Notification, NotificationKind, UnreadCount};
pub use page::{Page, PageRequest, PaginatedResponse, DEFAULT_PAGE_SIZE};
pub use post::{NewPost, Post, PostQuery, PostSort};
pub use reaction_state::ReactionState;
pub use stream_message::StreamMessage;
pub use user::{UserProfile, UserSummary};
