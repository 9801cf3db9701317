//! Callback registry shared by the stream manager and the session.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Handle returned when registering a callback; pass it back to remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Ordered set of callbacks.
///
/// Dispatch snapshots the set before invoking anything, so a callback may
/// register or remove callbacks (itself included) without deadlocking. A
/// callback added during a dispatch first fires on the next one.
pub(crate) struct ListenerSet<E> {
    next_id: AtomicU64,
    entries: RwLock<Vec<(ListenerId, Callback<E>)>>,
}

impl<E> Default for ListenerSet<E> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl<E> ListenerSet<E> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, callback: impl Fn(&E) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((id, Arc::new(callback)));
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    /// Invoke every registered callback once. Returns how many ran.
    pub(crate) fn dispatch(&self, event: &E) -> usize {
        self.dispatch_while(event, || true)
    }

    /// Like [`dispatch`](Self::dispatch), but `live` is checked before each
    /// callback and the rest are skipped once it turns false.
    pub(crate) fn dispatch_while(&self, event: &E, live: impl Fn() -> bool) -> usize {
        let snapshot: Vec<Callback<E>> = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        let mut ran = 0;
        for cb in &snapshot {
            if !live() {
                break;
            }
            cb(event);
            ran += 1;
        }
        ran
    }
}

impl<E> fmt::Debug for ListenerSet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet").field("len", &self.len()).finish()
    }
}
