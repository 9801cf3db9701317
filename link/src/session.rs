//! Signed-in user context.
//!
//! A [`Session`] is created by the application and handed to whatever needs
//! the current user: the REST client, the notification stream, UI state. There
//! is no global instance. Components that care about sign-in and sign-out
//! register an observer instead of listening for a broadcast event.

use std::fmt;
use std::sync::{Arc, RwLock};

use crate::listeners::{ListenerId, ListenerSet};
use crate::models::{LoginResponse, UserSummary};

/// Authentication state held by a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// No user signed in.
    #[default]
    Anonymous,
    /// A user is signed in with a bearer token.
    Authenticated {
        /// The signed-in user.
        user: UserSummary,
        /// Bearer token for API calls.
        token: String,
    },
}

/// A session state transition, delivered to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A user signed in. Also sent when one user replaces another.
    SignedIn(UserSummary),
    /// The previously signed-in user signed out.
    SignedOut(UserSummary),
}

struct SessionInner {
    state: RwLock<AuthState>,
    observers: ListenerSet<AuthEvent>,
}

/// Cloneable handle to the signed-in user context.
///
/// # Example
///
/// ```rust
/// use agora_link::{AuthEvent, Session};
///
/// let session = Session::new();
/// let observer = session.subscribe(|event| match event {
///     AuthEvent::SignedIn(user) => log::info!("welcome {}", user.username),
///     AuthEvent::SignedOut(_) => log::info!("goodbye"),
/// });
/// assert!(!session.is_authenticated());
/// session.unsubscribe(observer);
/// ```
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.current_user().map(|u| u.username))
            .field("observers", &self.inner.observers.len())
            .finish()
    }
}

impl Session {
    /// Create an anonymous session.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionInner {
                state: RwLock::new(AuthState::Anonymous),
                observers: ListenerSet::new(),
            }),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> AuthState {
        self.read_state().clone()
    }

    /// The signed-in user, if any.
    pub fn current_user(&self) -> Option<UserSummary> {
        match &*self.read_state() {
            AuthState::Authenticated { user, .. } => Some(user.clone()),
            AuthState::Anonymous => None,
        }
    }

    /// Bearer token of the signed-in user, if any.
    pub fn token(&self) -> Option<String> {
        match &*self.read_state() {
            AuthState::Authenticated { token, .. } => Some(token.clone()),
            AuthState::Anonymous => None,
        }
    }

    /// Whether a user is signed in.
    pub fn is_authenticated(&self) -> bool {
        matches!(&*self.read_state(), AuthState::Authenticated { .. })
    }

    /// Record a successful login and notify observers.
    ///
    /// Signing in over an existing user emits `SignedOut` for the old user
    /// first, so observers can release per-user resources.
    pub fn sign_in(&self, login: LoginResponse) {
        let previous = {
            let mut state = self.write_state();
            let previous = std::mem::replace(
                &mut *state,
                AuthState::Authenticated {
                    user: login.user.clone(),
                    token: login.access_token,
                },
            );
            match previous {
                AuthState::Authenticated { user, .. } => Some(user),
                AuthState::Anonymous => None,
            }
        };

        if let Some(old) = previous {
            if old.id != login.user.id {
                log::info!("[agora-link] Session switching from '{}' to '{}'", old.username, login.user.username);
                self.inner.observers.dispatch(&AuthEvent::SignedOut(old));
            }
        }
        log::info!("[agora-link] Signed in as '{}'", login.user.username);
        self.inner.observers.dispatch(&AuthEvent::SignedIn(login.user));
    }

    /// Clear the signed-in user and notify observers.
    ///
    /// Returns `false` (and notifies nobody) when already anonymous.
    pub fn sign_out(&self) -> bool {
        let previous = std::mem::take(&mut *self.write_state());
        match previous {
            AuthState::Authenticated { user, .. } => {
                log::info!("[agora-link] Signed out '{}'", user.username);
                self.inner.observers.dispatch(&AuthEvent::SignedOut(user));
                true
            },
            AuthState::Anonymous => false,
        }
    }

    /// Register an observer for sign-in/sign-out transitions.
    pub fn subscribe(&self, observer: impl Fn(&AuthEvent) + Send + Sync + 'static) -> ListenerId {
        self.inner.observers.add(observer)
    }

    /// Remove an observer. Returns whether it was registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.observers.remove(id)
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, AuthState> {
        self.inner.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, AuthState> {
        self.inner.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn login(id: i64, name: &str) -> LoginResponse {
        LoginResponse {
            access_token: format!("token-{}", id),
            user: UserSummary {
                id,
                username: name.to_string(),
                display_name: None,
                avatar_url: None,
            },
            expires_at: None,
        }
    }

    fn recorder(session: &Session) -> Arc<Mutex<Vec<AuthEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        session.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
        events
    }

    #[test]
    fn test_sign_in_and_out_notify_observers() {
        let session = Session::new();
        let events = recorder(&session);

        session.sign_in(login(1, "ada"));
        assert!(session.is_authenticated());
        assert_eq!(session.token().as_deref(), Some("token-1"));

        assert!(session.sign_out());
        assert!(!session.is_authenticated());
        assert!(session.current_user().is_none());

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], AuthEvent::SignedIn(u) if u.username == "ada"));
        assert!(matches!(&events[1], AuthEvent::SignedOut(u) if u.username == "ada"));
    }

    #[test]
    fn test_sign_out_when_anonymous_is_silent() {
        let session = Session::new();
        let events = recorder(&session);
        assert!(!session.sign_out());
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_switching_users_signs_out_previous() {
        let session = Session::new();
        session.sign_in(login(1, "ada"));
        let events = recorder(&session);

        session.sign_in(login(2, "grace"));

        let events = events.lock().unwrap();
        assert_eq!(
            events.iter().map(|e| matches!(e, AuthEvent::SignedIn(_))).collect::<Vec<_>>(),
            vec![false, true]
        );
        assert_eq!(session.current_user().map(|u| u.id), Some(2));
    }

    #[test]
    fn test_clones_share_state() {
        let session = Session::new();
        let other = session.clone();
        session.sign_in(login(3, "linus"));
        assert_eq!(other.current_user().map(|u| u.username), Some("linus".to_string()));
    }

    #[test]
    fn test_unsubscribed_observer_is_not_called() {
        let session = Session::new();
        let calls = Arc::new(Mutex::new(0));
        let c = calls.clone();
        let id = session.subscribe(move |_| *c.lock().unwrap() += 1);
        assert!(session.unsubscribe(id));
        session.sign_in(login(1, "ada"));
        assert_eq!(*calls.lock().unwrap(), 0);
    }
}
