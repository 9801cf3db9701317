//! Push-channel connection manager.
//!
//! One [`StreamConnectionManager`] owns at most one background task. The task
//! opens the channel through a [`StreamTransport`], decodes SSE frames, hands
//! parsed [`StreamMessage`]s to listeners, and runs the reconnect loop with
//! exponential backoff when the channel drops.
//!
//! Every task carries a generation number. `connect()` and `disconnect()` bump
//! the generation under the same lock that guards status writes, so a task
//! that has been superseded can neither change the status nor deliver another
//! message once it notices.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant as TokioInstant;
use url::Url;

use super::state::ConnectionStatus;
use crate::auth::{AuthProvider, AuthSource};
use crate::error::{AgoraLinkError, Result};
use crate::event_handlers::{ConnectionError, DisconnectReason, EventHandlers};
use crate::listeners::{ListenerId, ListenerSet};
use crate::models::{ConnectionOptions, Notification, StreamMessage};
use crate::session::Session;
use crate::sse::{SseDecoder, SseFrame};
use crate::timeouts::AgoraLinkTimeouts;
use crate::transport::{ByteStream, HttpSseTransport, StreamTransport};

/// Stands in for "no deadline" when the heartbeat watchdog is off.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

const STREAM_PATH: [&str; 3] = ["api", "notifications", "stream"];

/// Event types some servers use for keep-alives sent as regular events.
const KEEPALIVE_EVENTS: [&str; 2] = ["ping", "heartbeat"];

struct ActiveTask {
    subscriber_id: String,
    handle: JoinHandle<()>,
}

struct Shared<T> {
    channel_base: Url,
    transport: Arc<dyn StreamTransport>,
    auth: AuthSource,
    options: ConnectionOptions,
    timeouts: AgoraLinkTimeouts,
    handlers: EventHandlers,
    listeners: ListenerSet<StreamMessage<T>>,
    status_tx: watch::Sender<ConnectionStatus>,
    active: Mutex<Option<ActiveTask>>,
    generation: AtomicU64,
}

impl<T> Shared<T> {
    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveTask>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Publish `status` if `generation` is still the live task.
    fn transition(&self, generation: u64, status: ConnectionStatus) -> bool {
        {
            let _active = self.lock_active();
            if !self.is_current(generation) {
                return false;
            }
            self.status_tx.send_replace(status.clone());
        }
        log::debug!("[agora-link] Stream status -> {}", status);
        self.handlers.emit_status(&status);
        true
    }
}

impl<T: DeserializeOwned> Shared<T> {
    /// Parse and fan out one payload. Listeners stop receiving it as soon as
    /// `generation` is superseded, even mid-dispatch.
    fn deliver(&self, generation: u64, payload: &str) {
        self.handlers.emit_receive(payload);
        match serde_json::from_str::<StreamMessage<T>>(payload) {
            Ok(message) => {
                let reached = self
                    .listeners
                    .dispatch_while(&message, || self.is_current(generation));
                log::trace!("[agora-link] Stream message delivered to {} listener(s)", reached);
            },
            Err(e) => {
                log::warn!("[agora-link] Dropping unparseable stream message: {}", e);
                log::debug!("[agora-link] Offending payload: {}", payload);
            },
        }
    }
}

/// Why an open (or opening) channel stopped.
enum Closed {
    Ended,
    Failed(AgoraLinkError),
    HeartbeatTimeout(Duration),
}

impl Closed {
    fn reason(&self) -> DisconnectReason {
        match self {
            Closed::Ended => DisconnectReason::new("Stream closed by server"),
            Closed::Failed(AgoraLinkError::ServerError {
                status_code,
                message,
            }) => DisconnectReason::with_code(message.clone(), *status_code),
            Closed::Failed(e) => DisconnectReason::new(e.to_string()),
            Closed::HeartbeatTimeout(window) => DisconnectReason::new(format!(
                "No data received for {}s",
                window.as_secs()
            )),
        }
    }
}

/// Manages the long-lived notification channel for one subscriber.
///
/// `connect` and `disconnect` never block and never fail; outcomes are
/// observable through [`connection_status`](Self::connection_status),
/// [`status_receiver`](Self::status_receiver) and the [`EventHandlers`]
/// given at build time. The manager must be used from within a tokio runtime.
///
/// # Example
///
/// ```rust,no_run
/// use agora_link::{StreamConnectionManager, StreamMessage};
///
/// # async fn example() -> agora_link::Result<()> {
/// let manager: StreamConnectionManager = StreamConnectionManager::builder()
///     .base_url("https://forum.example.com")
///     .build()?;
///
/// manager.add_listener(|message: &StreamMessage| match message {
///     StreamMessage::Item(n) => log::info!("new notification: {}", n.message),
///     StreamMessage::Count(c) => log::info!("{} unread", c),
/// });
/// manager.connect("42");
/// # Ok(())
/// # }
/// ```
pub struct StreamConnectionManager<T = Notification> {
    shared: Arc<Shared<T>>,
}

impl<T> fmt::Debug for StreamConnectionManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConnectionManager")
            .field("channel_base", &self.shared.channel_base.as_str())
            .field("status", &*self.shared.status_tx.borrow())
            .field("listeners", &self.shared.listeners.len())
            .finish()
    }
}

impl<T> StreamConnectionManager<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Create a builder.
    pub fn builder() -> StreamConnectionManagerBuilder<T> {
        StreamConnectionManagerBuilder::new()
    }

    /// Open the channel for `subscriber_id`, replacing any existing connection.
    ///
    /// Status moves to `Connecting` immediately. Listeners stay registered
    /// across calls.
    pub fn connect(&self, subscriber_id: impl Into<String>) {
        let subscriber_id = subscriber_id.into();
        if subscriber_id.trim().is_empty() {
            log::error!("[agora-link] Refusing to connect notification stream without a subscriber id");
            self.shared
                .handlers
                .emit_error(ConnectionError::new("Subscriber id must not be empty", false));
            return;
        }

        let url = match channel_url(&self.shared.channel_base, &subscriber_id) {
            Ok(url) => url,
            Err(e) => {
                log::error!("[agora-link] Cannot build stream URL for '{}': {}", subscriber_id, e);
                self.shared.handlers.emit_error(ConnectionError::new(e.to_string(), false));
                return;
            },
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                log::error!("[agora-link] connect() called outside a tokio runtime");
                self.shared.handlers.emit_error(ConnectionError::new(
                    "connect() requires a running tokio runtime",
                    false,
                ));
                return;
            },
        };

        let (previous, was_open) = {
            let mut active = self.shared.lock_active();
            let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let was_open = self.shared.status_tx.borrow().is_open();
            self.shared.status_tx.send_replace(ConnectionStatus::Connecting);
            let handle = runtime.spawn(run_connection(self.shared.clone(), url, generation));
            let previous = active.replace(ActiveTask {
                subscriber_id: subscriber_id.clone(),
                handle,
            });
            (previous, was_open)
        };

        if let Some(task) = previous {
            task.handle.abort();
            log::debug!(
                "[agora-link] Replaced notification stream for '{}' with '{}'",
                task.subscriber_id,
                subscriber_id
            );
        }
        log::info!("[agora-link] Connecting notification stream for '{}'", subscriber_id);
        if was_open {
            self.shared.handlers.emit_disconnect(DisconnectReason::new("Replaced by a new connection"));
        }
        self.shared.handlers.emit_status(&ConnectionStatus::Connecting);
    }

    /// Close the channel and cancel any pending reconnect.
    ///
    /// No-op when already disconnected.
    pub fn disconnect(&self) {
        let (previous, was_open) = {
            let mut active = self.shared.lock_active();
            let status = self.shared.status_tx.borrow().clone();
            if active.is_none() && status == ConnectionStatus::Disconnected {
                return;
            }
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            self.shared.status_tx.send_replace(ConnectionStatus::Disconnected);
            (active.take(), status.is_open())
        };

        if let Some(task) = previous {
            task.handle.abort();
            log::info!("[agora-link] Notification stream for '{}' disconnected", task.subscriber_id);
        }
        self.shared.handlers.emit_status(&ConnectionStatus::Disconnected);
        if was_open {
            self.shared.handlers.emit_disconnect(DisconnectReason::new("Client disconnected"));
        }
    }

    /// Register a callback for every parsed message from now on.
    pub fn add_listener(
        &self,
        listener: impl Fn(&StreamMessage<T>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.shared.listeners.add(listener)
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.shared.listeners.remove(id)
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.shared.listeners.len()
    }

    /// Whether the channel is open right now.
    pub fn is_connected(&self) -> bool {
        self.shared.status_tx.borrow().is_open()
    }

    /// Current status snapshot.
    pub fn connection_status(&self) -> ConnectionStatus {
        self.shared.status_tx.borrow().clone()
    }

    /// Watch status transitions.
    pub fn status_receiver(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status_tx.subscribe()
    }

    /// Subscriber of the current (or last) connection.
    pub fn subscriber_id(&self) -> Option<String> {
        self.shared.lock_active().as_ref().map(|task| task.subscriber_id.clone())
    }
}

impl<T> Drop for StreamConnectionManager<T> {
    fn drop(&mut self) {
        let mut active = self.shared.lock_active();
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = active.take() {
            task.handle.abort();
        }
    }
}

/// Builder for [`StreamConnectionManager`].
pub struct StreamConnectionManagerBuilder<T = Notification> {
    base_url: Option<String>,
    transport: Option<Arc<dyn StreamTransport>>,
    auth: AuthProvider,
    session: Option<Session>,
    connection_options: ConnectionOptions,
    timeouts: AgoraLinkTimeouts,
    event_handlers: EventHandlers,
    _message: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for StreamConnectionManagerBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConnectionManagerBuilder")
            .field("base_url", &self.base_url)
            .field("custom_transport", &self.transport.is_some())
            .field("connection_options", &self.connection_options)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl<T> StreamConnectionManagerBuilder<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    fn new() -> Self {
        Self {
            base_url: None,
            transport: None,
            auth: AuthProvider::None,
            session: None,
            connection_options: ConnectionOptions::default(),
            timeouts: AgoraLinkTimeouts::default(),
            event_handlers: EventHandlers::default(),
            _message: PhantomData,
        }
    }

    /// Forum base URL; the channel lives at `{base}/api/notifications/stream/{id}`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Replace the default HTTP/SSE transport.
    pub fn transport(mut self, transport: Arc<dyn StreamTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Static credentials, used when no session user is signed in.
    pub fn auth(mut self, auth: AuthProvider) -> Self {
        self.auth = auth;
        self
    }

    /// Take the bearer token from `session` on every (re)connect.
    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Reconnect policy.
    pub fn connection_options(mut self, options: ConnectionOptions) -> Self {
        self.connection_options = options;
        self
    }

    /// Open and heartbeat timeouts.
    pub fn timeouts(mut self, timeouts: AgoraLinkTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Lifecycle callbacks.
    pub fn event_handlers(mut self, handlers: EventHandlers) -> Self {
        self.event_handlers = handlers;
        self
    }

    /// Validate the configuration and build the manager.
    pub fn build(self) -> Result<StreamConnectionManager<T>> {
        let base_url = self
            .base_url
            .ok_or_else(|| AgoraLinkError::ConfigurationError("base_url is required".into()))?;
        let channel_base = stream_base_url(&base_url)?;

        let transport: Arc<dyn StreamTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpSseTransport::new(self.timeouts.connection_timeout)?),
        };

        let auth = match self.session {
            Some(session) => AuthSource::Session {
                session,
                fallback: self.auth,
            },
            None => AuthSource::Static(self.auth),
        };

        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);

        Ok(StreamConnectionManager {
            shared: Arc::new(Shared {
                channel_base,
                transport,
                auth,
                options: self.connection_options,
                timeouts: self.timeouts,
                handlers: self.event_handlers,
                listeners: ListenerSet::new(),
                status_tx,
                active: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        })
    }
}

fn stream_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url.trim()).map_err(|e| {
        AgoraLinkError::ConfigurationError(format!("Invalid base URL '{}': {}", base_url, e))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AgoraLinkError::ConfigurationError(format!(
            "Base URL must be http or https, got '{}'",
            url.scheme()
        )));
    }
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| AgoraLinkError::ConfigurationError(format!("Base URL '{}' cannot carry a path", base_url)))?
        .pop_if_empty()
        .extend(STREAM_PATH);
    Ok(url)
}

fn channel_url(channel_base: &Url, subscriber_id: &str) -> Result<String> {
    let mut url = channel_base.clone();
    url.path_segments_mut()
        .map_err(|_| AgoraLinkError::InternalError("Stream base URL lost its path".into()))?
        .push(subscriber_id);
    Ok(url.into())
}

async fn run_connection<T>(shared: Arc<Shared<T>>, url: String, generation: u64)
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let mut attempts: u32 = 0;
    let mut last_event_id: Option<String> = None;

    loop {
        if attempts > 0 && !shared.transition(generation, ConnectionStatus::Connecting) {
            return;
        }

        let closed = match open_channel(&shared, &url, last_event_id.as_deref()).await {
            Ok(stream) => {
                attempts = 0;
                if !shared.transition(generation, ConnectionStatus::Open) {
                    return;
                }
                log::info!("[agora-link] Notification stream open: {}", url);
                shared.handlers.emit_connect();

                let Some(closed) = pump(&shared, generation, stream, &mut last_event_id).await else {
                    return;
                };
                if !shared.is_current(generation) {
                    return;
                }
                let reason = closed.reason();
                log::warn!("[agora-link] Notification stream closed: {}", reason);
                shared.handlers.emit_disconnect(reason);
                closed
            },
            Err(e) => {
                log::warn!("[agora-link] Failed to open notification stream: {}", e);
                Closed::Failed(e)
            },
        };

        if !shared.is_current(generation) {
            return;
        }

        if !shared.options.allows_attempt(attempts) {
            let message = if shared.options.auto_reconnect {
                format!("Giving up after {} reconnection attempts", attempts)
            } else {
                "Stream closed and auto-reconnect is disabled".to_string()
            };
            log::warn!("[agora-link] {}", message);
            shared.handlers.emit_error(ConnectionError::new(message, false));
            shared.transition(generation, ConnectionStatus::ClosedExhausted { attempts });
            return;
        }

        attempts += 1;
        let delay = shared.options.backoff_delay(attempts);
        if let Closed::Failed(e) = &closed {
            shared.handlers.emit_error(ConnectionError::new(e.to_string(), true));
        }
        if !shared.transition(
            generation,
            ConnectionStatus::ClosedRetrying {
                attempt: attempts,
                retry_in: delay,
            },
        ) {
            return;
        }
        log::info!(
            "[agora-link] Reconnecting notification stream in {}ms (attempt {})",
            delay.as_millis(),
            attempts
        );

        tokio::time::sleep(delay).await;

        if !shared.is_current(generation) || !shared.status_tx.borrow().is_retrying() {
            log::debug!("[agora-link] Reconnect timer fired for a superseded connection");
            return;
        }
    }
}

async fn open_channel<T>(
    shared: &Shared<T>,
    url: &str,
    last_event_id: Option<&str>,
) -> Result<ByteStream> {
    let auth = shared.auth.resolve();
    let open = shared.transport.open(url, &auth, last_event_id);
    let limit = shared.timeouts.connection_timeout;
    if AgoraLinkTimeouts::is_no_timeout(limit) {
        return open.await;
    }
    match tokio::time::timeout(limit, open).await {
        Ok(result) => result,
        Err(_) => Err(AgoraLinkError::TimeoutError(format!(
            "Opening notification stream timed out after {}ms",
            limit.as_millis()
        ))),
    }
}

/// Read frames until the channel closes. `None` means the task was superseded.
async fn pump<T>(
    shared: &Shared<T>,
    generation: u64,
    mut stream: ByteStream,
    last_event_id: &mut Option<String>,
) -> Option<Closed>
where
    T: DeserializeOwned,
{
    let mut decoder = SseDecoder::new();
    let heartbeat = shared.timeouts.heartbeat_timeout;
    let watchdog = !AgoraLinkTimeouts::is_no_timeout(heartbeat);
    let idle_window = if watchdog { heartbeat } else { FAR_FUTURE };
    let mut idle_deadline = TokioInstant::now() + idle_window;

    loop {
        let idle_sleep = tokio::time::sleep_until(idle_deadline);
        tokio::pin!(idle_sleep);

        tokio::select! {
            biased;

            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => {
                    idle_deadline = TokioInstant::now() + idle_window;
                    for frame in decoder.feed(&bytes) {
                        if !shared.is_current(generation) {
                            return None;
                        }
                        match frame {
                            SseFrame::Heartbeat(_) => {
                                log::trace!("[agora-link] Stream heartbeat");
                            },
                            SseFrame::Retry(hint) => {
                                log::debug!(
                                    "[agora-link] Ignoring server retry hint of {}ms",
                                    hint.as_millis()
                                );
                            },
                            SseFrame::Event(event) => {
                                if event.id.is_some() {
                                    *last_event_id = event.id.clone();
                                }
                                if KEEPALIVE_EVENTS.contains(&event.event_type()) {
                                    log::trace!("[agora-link] Stream keep-alive event");
                                    continue;
                                }
                                shared.deliver(generation, &event.data);
                            },
                        }
                    }
                },
                Some(Err(e)) => {
                    decoder.finish();
                    return Some(Closed::Failed(e));
                },
                None => {
                    decoder.finish();
                    return Some(Closed::Ended);
                },
            },

            _ = &mut idle_sleep, if watchdog => {
                return Some(Closed::HeartbeatTimeout(heartbeat));
            }
        }
    }
}
