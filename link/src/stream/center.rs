use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use super::feed::NotificationFeed;
use super::manager::StreamConnectionManager;
use super::state::ConnectionStatus;
use crate::listeners::ListenerId;
use crate::session::{AuthEvent, Session};

/// Keeps the notification stream in step with the signed-in user.
///
/// Sign-in connects the stream with the user's id; sign-out disconnects it
/// and clears the feed, so nothing addressed to the previous user arrives
/// after they leave. Incoming messages are applied to a [`NotificationFeed`].
///
/// Dropping the center detaches it from the session and closes the stream.
pub struct NotificationCenter {
    session: Session,
    manager: Arc<StreamConnectionManager>,
    feed: Arc<Mutex<NotificationFeed>>,
    observer: ListenerId,
    listener: ListenerId,
}

impl fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationCenter")
            .field("status", &self.manager.connection_status())
            .field("unread", &self.unread_count())
            .finish()
    }
}

fn lock(feed: &Mutex<NotificationFeed>) -> MutexGuard<'_, NotificationFeed> {
    feed.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl NotificationCenter {
    /// Attach `manager` to `session` with an empty feed.
    pub fn new(session: Session, manager: StreamConnectionManager) -> Self {
        Self::with_feed(session, manager, NotificationFeed::new())
    }

    /// Attach with a pre-seeded feed (e.g. from `list_notifications`).
    ///
    /// Connects right away when a user is already signed in.
    pub fn with_feed(session: Session, manager: StreamConnectionManager, feed: NotificationFeed) -> Self {
        let manager = Arc::new(manager);
        let feed = Arc::new(Mutex::new(feed));

        let sink = feed.clone();
        let listener = manager.add_listener(move |message| {
            lock(&sink).apply(message);
        });

        // Weak: the session outlives the center and must not keep the stream alive.
        let weak_manager = Arc::downgrade(&manager);
        let observed_feed = feed.clone();
        let observer = session.subscribe(move |event| {
            let Some(manager) = weak_manager.upgrade() else {
                return;
            };
            match event {
                AuthEvent::SignedIn(user) => manager.connect(user.id.to_string()),
                AuthEvent::SignedOut(user) => {
                    log::debug!("[agora-link] Closing notification stream of '{}'", user.username);
                    manager.disconnect();
                    lock(&observed_feed).clear();
                },
            }
        });

        if let Some(user) = session.current_user() {
            manager.connect(user.id.to_string());
        }

        Self {
            session,
            manager,
            feed,
            observer,
            listener,
        }
    }

    /// Snapshot of the feed.
    pub fn feed(&self) -> NotificationFeed {
        lock(&self.feed).clone()
    }

    /// Mutate the feed in place, e.g. after marking notifications read.
    pub fn update_feed<R>(&self, f: impl FnOnce(&mut NotificationFeed) -> R) -> R {
        f(&mut lock(&self.feed))
    }

    pub fn unread_count(&self) -> u64 {
        lock(&self.feed).unread_count()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.manager.connection_status()
    }

    /// The underlying manager, for status watching or extra listeners.
    pub fn manager(&self) -> &StreamConnectionManager {
        &self.manager
    }
}

impl Drop for NotificationCenter {
    fn drop(&mut self) {
        self.session.unsubscribe(self.observer);
        self.manager.remove_listener(self.listener);
        self.manager.disconnect();
    }
}
