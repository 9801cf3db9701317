use std::fmt;
use std::sync::Arc;

use super::scroll::{ScrollGuard, Viewport};
use crate::error::AgoraLinkError;
use crate::models::Page;

/// Accumulated list state.
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatorState<T, E = AgoraLinkError> {
    /// Every item received so far, in server page order.
    pub collected: Vec<T>,
    /// Page the next fetch should request (1-based).
    pub current_page: u32,
    /// Whether the server reported another page.
    pub has_more: bool,
    /// Whether a fetch is in flight.
    pub is_loading: bool,
    /// Error of the last failed fetch.
    pub last_error: Option<E>,
}

impl<T, E> Default for AccumulatorState<T, E> {
    fn default() -> Self {
        Self {
            collected: Vec::new(),
            current_page: 1,
            has_more: true,
            is_loading: false,
            last_error: None,
        }
    }
}

/// What [`PaginatedAccumulator::set_data`] did with a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageApplied {
    /// First page: the list was replaced.
    Replaced,
    /// Later page: items were appended.
    Appended,
    /// Rejected by [`SequencePolicy::Strict`].
    Ignored,
}

/// How pages that arrive out of sequence are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequencePolicy {
    /// Append every later page as it arrives.
    #[default]
    Trusting,
    /// Only accept page 1 or the page `load_more` last asked for, once.
    /// Late responses from an older query and repeated deliveries of a page
    /// are dropped.
    Strict,
}

/// Merges fetched pages into one growing list for infinite scroll.
///
/// The accumulator does no I/O. The caller fetches `current_page()` whenever
/// `load_more()` returns `true` (or on first render) and feeds the result back
/// through [`apply_result`](Self::apply_result) or [`set_data`](Self::set_data).
///
/// # Example
///
/// ```rust
/// use agora_link::{Page, PageApplied, PaginatedAccumulator};
///
/// let mut feed: PaginatedAccumulator<&str> = PaginatedAccumulator::new();
/// assert_eq!(feed.set_data(Page::new(1, 2, vec!["a", "b"], true)), PageApplied::Replaced);
/// assert!(feed.load_more());
/// assert_eq!(feed.current_page(), 2);
/// feed.set_data(Page::new(2, 2, vec!["c"], false));
/// assert_eq!(feed.collected(), &["a", "b", "c"]);
/// assert!(!feed.load_more());
/// ```
pub struct PaginatedAccumulator<T, E = AgoraLinkError> {
    state: AccumulatorState<T, E>,
    policy: SequencePolicy,
    /// Page number of the last page merged into the list; 0 before any.
    last_applied: u32,
    scroll: Option<ScrollGuard>,
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for PaginatedAccumulator<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginatedAccumulator")
            .field("state", &self.state)
            .field("policy", &self.policy)
            .field("last_applied", &self.last_applied)
            .field("scroll", &self.scroll)
            .finish()
    }
}

impl<T, E> Default for PaginatedAccumulator<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> PaginatedAccumulator<T, E> {
    pub fn new() -> Self {
        Self {
            state: AccumulatorState::default(),
            policy: SequencePolicy::default(),
            last_applied: 0,
            scroll: None,
        }
    }

    pub fn with_policy(mut self, policy: SequencePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Preserve the scroll position of `viewport` whenever a page is appended.
    pub fn with_viewport(mut self, viewport: Arc<dyn Viewport>) -> Self {
        self.attach_viewport(viewport);
        self
    }

    /// Attach (or replace) the viewport after construction.
    pub fn attach_viewport(&mut self, viewport: Arc<dyn Viewport>) {
        if let Some(old) = self.scroll.take() {
            old.cancel();
        }
        self.scroll = Some(ScrollGuard::new(viewport));
    }

    /// Detach the viewport; appends stop touching the scroll position.
    pub fn detach_viewport(&mut self) {
        if let Some(old) = self.scroll.take() {
            old.cancel();
        }
    }

    /// Apply a fetched page.
    ///
    /// Page 1 replaces the list and rewinds to page 1; later pages append.
    /// Both update `has_more`. Items are never deduplicated or reordered.
    pub fn set_data(&mut self, page: Page<T>) -> PageApplied {
        if page.is_first() {
            if let Some(scroll) = &self.scroll {
                scroll.cancel();
            }
            self.state.collected = page.items;
            self.state.current_page = 1;
            self.state.has_more = page.has_next_page;
            self.last_applied = 1;
            return PageApplied::Replaced;
        }

        if self.policy == SequencePolicy::Strict
            && (page.page_number != self.state.current_page || page.page_number <= self.last_applied)
        {
            log::debug!(
                "[agora-link] Ignoring page {} while expecting page {} (last applied {})",
                page.page_number,
                self.state.current_page,
                self.last_applied
            );
            return PageApplied::Ignored;
        }

        if let Some(scroll) = &self.scroll {
            scroll.preserve();
        }
        self.last_applied = page.page_number;
        self.state.collected.extend(page.items);
        self.state.has_more = page.has_next_page;
        PageApplied::Appended
    }

    /// Advance to the next page. Returns `false` (and changes nothing) while
    /// a fetch is in flight or when the server reported no more pages.
    pub fn load_more(&mut self) -> bool {
        if !self.state.has_more || self.state.is_loading {
            return false;
        }
        self.state.current_page += 1;
        true
    }

    /// Back to the initial state, e.g. when filters change.
    pub fn reset(&mut self) {
        if let Some(scroll) = &self.scroll {
            scroll.cancel();
        }
        self.state = AccumulatorState::default();
        self.last_applied = 0;
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.state.is_loading = loading;
    }

    /// Record (or clear) a fetch error. The list and page are untouched.
    pub fn set_error(&mut self, error: Option<E>) {
        self.state.last_error = error;
    }

    /// Finish a fetch: clear loading, then store the page or the error.
    pub fn apply_result(&mut self, result: Result<Page<T>, E>) -> PageApplied {
        self.state.is_loading = false;
        match result {
            Ok(page) => {
                self.state.last_error = None;
                self.set_data(page)
            },
            Err(error) => {
                self.state.last_error = Some(error);
                PageApplied::Ignored
            },
        }
    }

    /// Forward a host scroll event; see [`ScrollGuard::on_scroll`].
    pub fn on_scroll(&self, offset: f64) -> bool {
        self.scroll.as_ref().is_some_and(|scroll| scroll.on_scroll(offset))
    }

    /// Whether a scroll restore is running.
    pub fn is_restoring_scroll(&self) -> bool {
        self.scroll.as_ref().is_some_and(ScrollGuard::is_restoring)
    }

    pub fn collected(&self) -> &[T] {
        &self.state.collected
    }

    pub fn current_page(&self) -> u32 {
        self.state.current_page
    }

    pub fn has_more(&self) -> bool {
        self.state.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    pub fn last_error(&self) -> Option<&E> {
        self.state.last_error.as_ref()
    }

    pub fn policy(&self) -> SequencePolicy {
        self.policy
    }

    /// Borrow the full state.
    pub fn state(&self) -> &AccumulatorState<T, E> {
        &self.state
    }
}

impl<T: Clone, E: Clone> PaginatedAccumulator<T, E> {
    /// Owned copy of the state.
    pub fn snapshot(&self) -> AccumulatorState<T, E> {
        self.state.clone()
    }
}

impl<T, E> Drop for PaginatedAccumulator<T, E> {
    fn drop(&mut self) {
        if let Some(scroll) = &self.scroll {
            scroll.cancel();
        }
    }
}
