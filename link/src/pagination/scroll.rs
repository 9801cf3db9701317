//! Scroll-position preservation across appended pages.
//!
//! When a page is appended the host re-renders the list, and some layouts
//! jump the scroll position while doing so (images loading, virtualized rows
//! being measured). The guard captures the offset before the append and
//! re-asserts it a few times while the layout settles.

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant as TokioInstant;

/// Delays (from the append) at which the captured offset is re-applied.
pub const RESTORE_SCHEDULE: [Duration; 4] = [
    Duration::from_millis(0),
    Duration::from_millis(10),
    Duration::from_millis(50),
    Duration::from_millis(100),
];

/// Length of one frame for the default [`Viewport::next_frame`].
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// The host's scrollable surface.
#[async_trait]
pub trait Viewport: Send + Sync + 'static {
    /// Current vertical offset.
    fn scroll_offset(&self) -> f64;

    /// Jump to `offset` without animation.
    fn scroll_to(&self, offset: f64);

    /// Resolves after the host has rendered the next frame.
    async fn next_frame(&self) {
        tokio::time::sleep(FRAME_INTERVAL).await;
    }
}

#[derive(Debug, Default)]
struct GuardState {
    epoch: AtomicU64,
    appending: AtomicBool,
    anchor_bits: AtomicU64,
}

impl GuardState {
    fn anchor(&self) -> f64 {
        f64::from_bits(self.anchor_bits.load(Ordering::SeqCst))
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }
}

/// Re-asserts a captured scroll offset while appended content settles.
///
/// A newer [`preserve`](Self::preserve) or a [`cancel`](Self::cancel)
/// supersedes the running sequence.
#[derive(Clone)]
pub struct ScrollGuard {
    viewport: Arc<dyn Viewport>,
    state: Arc<GuardState>,
}

impl fmt::Debug for ScrollGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollGuard")
            .field("restoring", &self.is_restoring())
            .field("anchor", &self.state.anchor())
            .finish()
    }
}

impl ScrollGuard {
    pub fn new(viewport: Arc<dyn Viewport>) -> Self {
        Self {
            viewport,
            state: Arc::new(GuardState::default()),
        }
    }

    /// Capture the current offset and start the restore sequence.
    ///
    /// Call this right before the new items are added. Returns the handle of
    /// the restore task, or `None` outside a tokio runtime (the offset is
    /// then restored once, synchronously).
    pub fn preserve(&self) -> Option<JoinHandle<()>> {
        let anchor = self.viewport.scroll_offset();
        let epoch = self.state.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.anchor_bits.store(anchor.to_bits(), Ordering::SeqCst);
        self.state.appending.store(true, Ordering::SeqCst);

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                log::debug!("[agora-link] No runtime for scroll restore, restoring once");
                self.viewport.scroll_to(anchor);
                self.state.appending.store(false, Ordering::SeqCst);
                return None;
            },
        };

        let viewport = self.viewport.clone();
        let state = self.state.clone();
        Some(runtime.spawn(async move {
            let started = TokioInstant::now();
            for delay in RESTORE_SCHEDULE {
                tokio::time::sleep_until(started + delay).await;
                if !state.is_current(epoch) {
                    return;
                }
                viewport.scroll_to(anchor);
            }

            viewport.next_frame().await;
            if !state.is_current(epoch) {
                return;
            }
            viewport.scroll_to(anchor);
            state.appending.store(false, Ordering::SeqCst);
            log::trace!("[agora-link] Scroll restore settled at {}", anchor);
        }))
    }

    /// Report a scroll from the host. While a restore is running, any
    /// movement away from the anchor is undone. Returns whether it snapped.
    pub fn on_scroll(&self, offset: f64) -> bool {
        if !self.state.appending.load(Ordering::SeqCst) {
            return false;
        }
        let anchor = self.state.anchor();
        if offset == anchor {
            return false;
        }
        self.viewport.scroll_to(anchor);
        true
    }

    /// Stop any running restore sequence.
    pub fn cancel(&self) {
        self.state.epoch.fetch_add(1, Ordering::SeqCst);
        self.state.appending.store(false, Ordering::SeqCst);
    }

    /// Whether a restore sequence is in progress.
    pub fn is_restoring(&self) -> bool {
        self.state.appending.load(Ordering::SeqCst)
    }
}
