//! Main Agora client with builder pattern.
//!
//! Provides the REST surface of the forum (posts, comments, reactions,
//! notifications) and hands out notification stream managers that share the
//! client's credentials and connection settings.

use crate::{
    auth::{AuthProvider, AuthSource},
    config::AgoraConfig,
    error::{AgoraLinkError, Result},
    event_handlers::EventHandlers,
    models::{
        Category, Comment, CommentTree, ConnectionOptions, HealthCheckResponse, LoginRequest, LoginResponse,
        NewComment, NewPost, Notification, PageRequest, PaginatedResponse, Post, PostQuery, ReactionState,
        UnreadCount, UserProfile,
    },
    optimistic::{MutationOutcome, Optimistic},
    rest::RestExecutor,
    session::Session,
    stream::{NotificationCenter, NotificationFeed, StreamConnectionManager, DEFAULT_FEED_CAPACITY},
    timeouts::AgoraLinkTimeouts,
};
use reqwest::Method;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

const HEALTH_CHECK_TTL: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
struct HealthCheckCache {
    last_check: Option<Instant>,
    last_response: Option<HealthCheckResponse>,
}

/// Main Agora client.
///
/// Use [`AgoraLinkClientBuilder`] to construct instances.
///
/// # Examples
///
/// ```rust,no_run
/// use agora_link::{AgoraLinkClient, PageRequest, PostQuery, PostSort};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = AgoraLinkClient::builder()
///     .base_url("https://forum.example.com")
///     .timeout(std::time::Duration::from_secs(15))
///     .build()?;
///
/// let trending = PostQuery::new().with_sort(PostSort::Trending);
/// let page = client.list_posts(&trending, PageRequest::default()).await?;
/// for post in &page.data {
///     println!("{} by {}", post.title, post.author.label());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AgoraLinkClient {
    base_url: String,
    rest: RestExecutor,
    session: Option<Session>,
    health_cache: Arc<Mutex<HealthCheckCache>>,
    timeouts: AgoraLinkTimeouts,
    connection_options: ConnectionOptions,
    event_handlers: EventHandlers,
    feed_capacity: usize,
}

impl std::fmt::Debug for AgoraLinkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgoraLinkClient")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl AgoraLinkClient {
    /// Create a new builder for configuring the client
    pub fn builder() -> AgoraLinkClientBuilder {
        AgoraLinkClientBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeouts(&self) -> &AgoraLinkTimeouts {
        &self.timeouts
    }

    /// The session this client reads its token from, if any.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Check server health. Responses are cached for ten seconds.
    pub async fn health_check(&self) -> Result<HealthCheckResponse> {
        {
            let cache = self.health_cache.lock().await;
            if let (Some(last_check), Some(response)) = (cache.last_check, cache.last_response.clone()) {
                if last_check.elapsed() < HEALTH_CHECK_TTL {
                    log::debug!(
                        "[agora-link] Returning cached health response (age: {:?})",
                        last_check.elapsed()
                    );
                    return Ok(response);
                }
            }
        }

        let response: HealthCheckResponse = self.rest.get("/health", &[]).await?;

        let mut cache = self.health_cache.lock().await;
        cache.last_check = Some(Instant::now());
        cache.last_response = Some(response.clone());
        Ok(response)
    }

    /// Log in with email and password.
    ///
    /// When the client was built with a [`Session`], the session is signed in
    /// and later requests carry the new token automatically.
    ///
    /// # Example
    /// ```rust,no_run
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// use agora_link::{AgoraLinkClient, Session};
    ///
    /// let session = Session::new();
    /// let client = AgoraLinkClient::builder()
    ///     .base_url("https://forum.example.com")
    ///     .session(session.clone())
    ///     .build()?;
    ///
    /// client.login("ada@example.com", "hunter2").await?;
    /// assert!(session.is_authenticated());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        log::debug!("[agora-link] Logging in '{}'", email);
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let login: LoginResponse = self.rest.post("/auth/login", &request).await.map_err(|e| match e {
            AgoraLinkError::ServerError {
                status_code: 400 | 403,
                message,
            } => AgoraLinkError::AuthenticationError(format!("Login failed: {}", message)),
            other => other,
        })?;

        if let Some(session) = &self.session {
            session.sign_in(login.clone());
        }
        Ok(login)
    }

    /// Sign the attached session out. Returns whether a user was signed in.
    pub fn logout(&self) -> bool {
        self.session.as_ref().is_some_and(Session::sign_out)
    }

    // -----------------------------------------------------------------
    // Posts, categories, comments
    // -----------------------------------------------------------------

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.rest.get("/categories", &[]).await
    }

    /// One page of posts matching `query`.
    pub async fn list_posts(&self, query: &PostQuery, page: PageRequest) -> Result<PaginatedResponse<Post>> {
        let mut pairs = query.query_pairs();
        pairs.extend(page.query_pairs());
        self.rest.get("/posts", &pairs).await
    }

    pub async fn get_post(&self, slug: &str) -> Result<Post> {
        self.rest.get(&format!("/posts/{}", encode_segment(slug)), &[]).await
    }

    pub async fn create_post(&self, post: &NewPost) -> Result<Post> {
        self.rest.post("/posts", post).await
    }

    /// Comments of a post, nested into reply threads.
    pub async fn list_comments(&self, post_id: i64) -> Result<CommentTree> {
        let flat: Vec<Comment> = self.rest.get(&format!("/posts/{}/comments", post_id), &[]).await?;
        Ok(CommentTree::build(flat))
    }

    pub async fn create_comment(&self, comment: &NewComment) -> Result<Comment> {
        self.rest.post(&format!("/posts/{}/comments", comment.post_id), comment).await
    }

    pub async fn get_user_profile(&self, user_id: i64) -> Result<UserProfile> {
        self.rest.get(&format!("/users/{}", user_id), &[]).await
    }

    // -----------------------------------------------------------------
    // Reactions
    // -----------------------------------------------------------------

    pub async fn like_post(&self, post_id: i64) -> Result<ReactionState> {
        self.rest.call(Method::POST, &format!("/posts/{}/like", post_id)).await
    }

    pub async fn unlike_post(&self, post_id: i64) -> Result<ReactionState> {
        self.rest.call(Method::DELETE, &format!("/posts/{}/like", post_id)).await
    }

    pub async fn bookmark_post(&self, post_id: i64) -> Result<ReactionState> {
        self.rest.call(Method::POST, &format!("/posts/{}/bookmark", post_id)).await
    }

    pub async fn unbookmark_post(&self, post_id: i64) -> Result<ReactionState> {
        self.rest.call(Method::DELETE, &format!("/posts/{}/bookmark", post_id)).await
    }

    pub async fn follow_user(&self, user_id: i64) -> Result<ReactionState> {
        self.rest.call(Method::POST, &format!("/users/{}/follow", user_id)).await
    }

    pub async fn unfollow_user(&self, user_id: i64) -> Result<ReactionState> {
        self.rest.call(Method::DELETE, &format!("/users/{}/follow", user_id)).await
    }

    /// Flip the like on `post_id`, updating `state` before the server answers.
    ///
    /// # Example
    /// ```rust,no_run
    /// # async fn example(client: agora_link::AgoraLinkClient, post: agora_link::Post) {
    /// use agora_link::{Optimistic, ReactionState};
    ///
    /// let like = Optimistic::new(ReactionState::new(post.liked_by_me, post.like_count));
    /// let outcome = client.toggle_like(post.id, &like).await;
    /// if let Some(err) = outcome.error() {
    ///     log::warn!("like failed, reverted: {}", err);
    /// }
    /// # }
    /// ```
    pub async fn toggle_like(&self, post_id: i64, state: &Optimistic<ReactionState>) -> MutationOutcome<ReactionState> {
        let tentative = state.get().toggled();
        let path = format!("/posts/{}/like", post_id);
        state.run(tentative, self.reaction_request(tentative.active, path)).await
    }

    /// Flip the bookmark on `post_id` optimistically.
    pub async fn toggle_bookmark(
        &self,
        post_id: i64,
        state: &Optimistic<ReactionState>,
    ) -> MutationOutcome<ReactionState> {
        let tentative = state.get().toggled();
        let path = format!("/posts/{}/bookmark", post_id);
        state.run(tentative, self.reaction_request(tentative.active, path)).await
    }

    /// Follow or unfollow `user_id` optimistically. `count` is the follower count.
    pub async fn toggle_follow(&self, user_id: i64, state: &Optimistic<ReactionState>) -> MutationOutcome<ReactionState> {
        let tentative = state.get().toggled();
        let path = format!("/users/{}/follow", user_id);
        state.run(tentative, self.reaction_request(tentative.active, path)).await
    }

    async fn reaction_request(&self, activate: bool, path: String) -> Result<ReactionState> {
        let method = if activate { Method::POST } else { Method::DELETE };
        self.rest.call(method, &path).await
    }

    // -----------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------

    pub async fn list_notifications(&self, page: PageRequest) -> Result<PaginatedResponse<Notification>> {
        self.rest.get("/notifications", &page.query_pairs()).await
    }

    pub async fn unread_count(&self) -> Result<u64> {
        let unread: UnreadCount = self.rest.get("/notifications/unread-count", &[]).await?;
        Ok(unread.count)
    }

    pub async fn mark_notification_read(&self, notification_id: i64) -> Result<()> {
        self.rest
            .call_empty(Method::POST, &format!("/notifications/{}/read", notification_id))
            .await
    }

    pub async fn mark_all_notifications_read(&self) -> Result<()> {
        self.rest.call_empty(Method::POST, "/notifications/read-all").await
    }

    /// A stream manager for this forum, sharing credentials, reconnect
    /// policy, timeouts and event handlers with the client.
    pub fn notification_stream(&self) -> Result<StreamConnectionManager> {
        let builder = StreamConnectionManager::builder()
            .base_url(self.base_url.clone())
            .connection_options(self.connection_options.clone())
            .timeouts(self.timeouts.clone())
            .event_handlers(self.event_handlers.clone());
        let builder = match self.rest.auth() {
            AuthSource::Static(auth) => builder.auth(auth.clone()),
            AuthSource::Session { session, fallback } => builder.session(session.clone()).auth(fallback.clone()),
        };
        builder.build()
    }

    /// A [`NotificationCenter`] that follows this client's session.
    pub fn notification_center(&self) -> Result<NotificationCenter> {
        let session = self.session.clone().ok_or_else(|| {
            AgoraLinkError::ConfigurationError("notification_center requires a session".into())
        })?;
        let feed = NotificationFeed::with_capacity(self.feed_capacity);
        Ok(NotificationCenter::with_feed(session, self.notification_stream()?, feed))
    }
}

fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Builder for configuring [`AgoraLinkClient`] instances.
pub struct AgoraLinkClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    auth: AuthProvider,
    session: Option<Session>,
    max_retries: u32,
    timeouts: AgoraLinkTimeouts,
    connection_options: ConnectionOptions,
    event_handlers: EventHandlers,
    feed_capacity: usize,
}

impl AgoraLinkClientBuilder {
    fn new() -> Self {
        Self {
            base_url: None,
            timeout: None,
            auth: AuthProvider::None,
            session: None,
            max_retries: 3,
            timeouts: AgoraLinkTimeouts::default(),
            connection_options: ConnectionOptions::default(),
            event_handlers: EventHandlers::default(),
            feed_capacity: DEFAULT_FEED_CAPACITY,
        }
    }

    /// Start from a loaded [`AgoraConfig`]: server URL, retries, timeouts,
    /// reconnect policy, feed capacity and the static token if one is set.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use agora_link::{AgoraConfig, AgoraLinkClientBuilder};
    ///
    /// # fn example() -> agora_link::Result<()> {
    /// let config = AgoraConfig::load(&agora_link::config::default_config_path())?;
    /// let client = AgoraLinkClientBuilder::from_config(&config).build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_config(config: &AgoraConfig) -> Self {
        let mut builder = Self::new()
            .base_url(config.server.url.clone())
            .max_retries(config.server.max_retries)
            .timeouts(config.to_timeouts())
            .connection_options(config.to_connection_options())
            .feed_capacity(config.stream.feed_capacity);
        if let Some(token) = config.jwt_token() {
            builder = builder.jwt_token(token);
        }
        builder
    }

    /// Forum base URL, e.g. `https://forum.example.com`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Total timeout per REST request. Overrides `timeouts.request_timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Static bearer token.
    pub fn jwt_token(mut self, token: impl Into<String>) -> Self {
        self.auth = AuthProvider::jwt_token(token.into());
        self
    }

    /// Static credentials. With a [`session`](Self::session) these are the
    /// fallback while nobody is signed in.
    pub fn auth(mut self, auth: AuthProvider) -> Self {
        self.auth = auth;
        self
    }

    /// Read the bearer token from `session` on every request.
    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Retry budget per request (default 3).
    ///
    /// Connect failures are retried for every method. Timeouts and 5xx
    /// responses are retried only for idempotent methods, so a POST that
    /// may have reached the server is never sent twice.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set timeout configuration
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use agora_link::{AgoraLinkClient, AgoraLinkTimeouts};
    ///
    /// # fn example() -> agora_link::Result<()> {
    /// let client = AgoraLinkClient::builder()
    ///     .base_url("https://forum.example.com")
    ///     .timeouts(AgoraLinkTimeouts::relaxed())
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn timeouts(mut self, timeouts: AgoraLinkTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Reconnect policy for streams created by this client.
    pub fn connection_options(mut self, options: ConnectionOptions) -> Self {
        self.connection_options = options;
        self
    }

    /// Lifecycle callbacks for streams created by this client.
    pub fn event_handlers(mut self, handlers: EventHandlers) -> Self {
        self.event_handlers = handlers;
        self
    }

    /// Notifications kept by [`AgoraLinkClient::notification_center`] (default 200).
    pub fn feed_capacity(mut self, capacity: usize) -> Self {
        self.feed_capacity = capacity;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<AgoraLinkClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| AgoraLinkError::ConfigurationError("base_url is required".into()))?;
        let parsed = url::Url::parse(base_url.trim()).map_err(|e| {
            AgoraLinkError::ConfigurationError(format!("Invalid base URL '{}': {}", base_url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AgoraLinkError::ConfigurationError(format!(
                "Base URL must be http or https, got '{}'",
                parsed.scheme()
            )));
        }
        let base_url = base_url.trim().trim_end_matches('/').to_string();

        let mut timeouts = self.timeouts;
        if let Some(timeout) = self.timeout {
            timeouts.request_timeout = timeout;
        }

        let mut client_builder = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90));
        if !AgoraLinkTimeouts::is_no_timeout(timeouts.connection_timeout) {
            client_builder = client_builder.connect_timeout(timeouts.connection_timeout);
        }
        if !AgoraLinkTimeouts::is_no_timeout(timeouts.request_timeout) {
            client_builder = client_builder.timeout(timeouts.request_timeout);
        }
        let http_client = client_builder
            .build()
            .map_err(|e| AgoraLinkError::ConfigurationError(e.to_string()))?;

        let auth = match self.session.clone() {
            Some(session) => AuthSource::Session {
                session,
                fallback: self.auth,
            },
            None => AuthSource::Static(self.auth),
        };

        Ok(AgoraLinkClient {
            rest: RestExecutor::new(&base_url, http_client, auth, self.max_retries),
            base_url,
            session: self.session,
            health_cache: Arc::new(Mutex::new(HealthCheckCache::default())),
            timeouts,
            connection_options: self.connection_options,
            event_handlers: self.event_handlers,
            feed_capacity: self.feed_capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_pattern() {
        let client = AgoraLinkClient::builder()
            .base_url("https://forum.example.com/")
            .timeout(Duration::from_secs(10))
            .jwt_token("test_token")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "https://forum.example.com");
        assert_eq!(client.timeouts().request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_builder_missing_url() {
        assert!(matches!(
            AgoraLinkClient::builder().build(),
            Err(AgoraLinkError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_builder_rejects_non_http_url() {
        assert!(AgoraLinkClient::builder().base_url("ws://forum.example.com").build().is_err());
        assert!(AgoraLinkClient::builder().base_url("forum.example.com").build().is_err());
    }

    #[test]
    fn test_logout_without_session() {
        let client = AgoraLinkClient::builder().base_url("http://localhost:3000").build().unwrap();
        assert!(!client.logout());
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("hello-world"), "hello-world");
        assert_eq!(encode_segment("a b/c"), "a%20b%2Fc");
    }
}
