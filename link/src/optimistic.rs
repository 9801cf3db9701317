//! Optimistic UI updates with rollback.
//!
//! Likes, bookmarks and follows flip immediately on screen and are confirmed
//! or undone once the server answers. [`Optimistic`] tracks a version number
//! per write so a slow response can never clobber a newer tap.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::AgoraLinkError;

struct Slot<T> {
    value: T,
    version: u64,
}

/// Shared, versioned value that supports tentative writes.
pub struct Optimistic<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Clone for Optimistic<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> Optimistic<T> {
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: fmt::Debug> fmt::Debug for Optimistic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.lock();
        f.debug_struct("Optimistic")
            .field("value", &slot.value)
            .field("version", &slot.version)
            .finish()
    }
}

/// A tentative write waiting for the server.
#[derive(Debug)]
#[must_use = "confirm or roll back the mutation"]
pub struct PendingMutation<T> {
    previous: T,
    version: u64,
}

impl<T> PendingMutation<T> {
    /// Value shown before the tentative write.
    pub fn previous(&self) -> &T {
        &self.previous
    }
}

/// How a mutation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome<T, E = AgoraLinkError> {
    /// The server accepted it; its value is now shown.
    Confirmed(T),
    /// The server refused it; the prior value is shown again.
    RolledBack { restored: T, error: E },
    /// A newer mutation owns the value. This result was discarded.
    Superseded { current: T, error: Option<E> },
}

impl<T, E> MutationOutcome<T, E> {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, MutationOutcome::Confirmed(_))
    }

    /// The error, if the request failed.
    pub fn error(&self) -> Option<&E> {
        match self {
            MutationOutcome::Confirmed(_) => None,
            MutationOutcome::RolledBack { error, .. } => Some(error),
            MutationOutcome::Superseded { error, .. } => error.as_ref(),
        }
    }
}

impl<T: Clone> Optimistic<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot { value, version: 0 })),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.lock().value.clone()
    }

    /// Overwrite without tracking, e.g. after a refetch. Invalidates pending mutations.
    pub fn set(&self, value: T) {
        let mut slot = self.lock();
        slot.value = value;
        slot.version += 1;
    }

    /// Show `tentative` now.
    pub fn apply(&self, tentative: T) -> PendingMutation<T> {
        let mut slot = self.lock();
        slot.version += 1;
        let previous = std::mem::replace(&mut slot.value, tentative);
        PendingMutation {
            previous,
            version: slot.version,
        }
    }

    /// Accept the server's value for `pending`.
    pub fn confirm<E>(&self, pending: PendingMutation<T>, server_value: T) -> MutationOutcome<T, E> {
        let mut slot = self.lock();
        if slot.version != pending.version {
            return MutationOutcome::Superseded {
                current: slot.value.clone(),
                error: None,
            };
        }
        slot.value = server_value.clone();
        MutationOutcome::Confirmed(server_value)
    }

    /// Undo `pending` after a failed request.
    pub fn roll_back<E>(&self, pending: PendingMutation<T>, error: E) -> MutationOutcome<T, E> {
        let mut slot = self.lock();
        if slot.version != pending.version {
            return MutationOutcome::Superseded {
                current: slot.value.clone(),
                error: Some(error),
            };
        }
        slot.value = pending.previous.clone();
        slot.version += 1;
        MutationOutcome::RolledBack {
            restored: pending.previous,
            error,
        }
    }

    /// Apply `tentative`, await `request`, then confirm or roll back.
    pub async fn run<E, F>(&self, tentative: T, request: F) -> MutationOutcome<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let pending = self.apply(tentative);
        match request.await {
            Ok(server_value) => self.confirm(pending, server_value),
            Err(error) => self.roll_back(pending, error),
        }
    }
}
