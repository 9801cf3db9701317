use crate::models::{Notification, StreamMessage};

/// Default number of notifications kept in memory.
pub const DEFAULT_FEED_CAPACITY: usize = 200;

/// Effect of applying a stream message to a [`NotificationFeed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedChange {
    /// A notification was prepended.
    Prepended,
    /// The unread counter was replaced.
    CountChanged { from: u64, to: u64 },
    /// Nothing changed (duplicate item or identical count).
    Unchanged,
}

/// Client-side notification list plus unread counter.
///
/// Items from the stream are newer than anything already held, so they go to
/// the front. Count messages replace the counter outright; the server's
/// number wins over any local arithmetic.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationFeed {
    items: Vec<Notification>,
    unread: u64,
    capacity: usize,
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` notifications; the oldest are dropped first.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            unread: 0,
            capacity: capacity.max(1),
        }
    }

    /// Most notifications kept before the oldest are dropped.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Apply one stream message.
    pub fn apply(&mut self, message: &StreamMessage<Notification>) -> FeedChange {
        match message {
            StreamMessage::Item(notification) => {
                // A reconnect resuming from Last-Event-ID may replay the newest item.
                if self.items.first().is_some_and(|head| head.id == notification.id) {
                    return FeedChange::Unchanged;
                }
                self.items.insert(0, notification.clone());
                self.items.truncate(self.capacity);
                FeedChange::Prepended
            },
            StreamMessage::Count(count) => {
                let from = std::mem::replace(&mut self.unread, *count);
                if from == *count {
                    FeedChange::Unchanged
                } else {
                    FeedChange::CountChanged { from, to: *count }
                }
            },
        }
    }

    /// Seed from a REST listing, newest first. Replaces current items.
    pub fn replace_items(&mut self, items: Vec<Notification>) {
        self.items = items;
        self.items.truncate(self.capacity);
    }

    /// Seed the counter from a REST call.
    pub fn set_unread_count(&mut self, count: u64) {
        self.unread = count;
    }

    /// Mark one notification read locally. Returns whether it was unread.
    pub fn mark_read(&mut self, id: i64) -> bool {
        match self.items.iter_mut().find(|n| n.id == id && !n.read) {
            Some(notification) => {
                notification.read = true;
                self.unread = self.unread.saturating_sub(1);
                true
            },
            None => false,
        }
    }

    /// Mark everything read locally.
    pub fn mark_all_read(&mut self) {
        self.items.iter_mut().for_each(|n| n.read = true);
        self.unread = 0;
    }

    /// Drop everything (sign-out).
    pub fn clear(&mut self) {
        self.items.clear();
        self.unread = 0;
    }

    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    pub fn unread_count(&self) -> u64 {
        self.unread
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationKind;

    fn note(id: i64) -> Notification {
        Notification {
            id,
            kind: NotificationKind::Comment,
            message: format!("notification {}", id),
            actor: None,
            post_id: None,
            post_slug: None,
            comment_id: None,
            read: false,
            created_at: String::new(),
        }
    }

    #[test]
    fn test_items_prepend_and_count_replaces() {
        let mut feed = NotificationFeed::new();
        feed.set_unread_count(4);

        assert_eq!(feed.apply(&StreamMessage::Item(note(1))), FeedChange::Prepended);
        assert_eq!(feed.apply(&StreamMessage::Item(note(2))), FeedChange::Prepended);
        assert_eq!(feed.items().iter().map(|n| n.id).collect::<Vec<_>>(), vec![2, 1]);
        // Items do not touch the counter.
        assert_eq!(feed.unread_count(), 4);

        assert_eq!(
            feed.apply(&StreamMessage::Count(9)),
            FeedChange::CountChanged { from: 4, to: 9 }
        );
        assert_eq!(feed.apply(&StreamMessage::Count(9)), FeedChange::Unchanged);
        assert_eq!(feed.apply(&StreamMessage::Count(0)), FeedChange::CountChanged { from: 9, to: 0 });
    }

    #[test]
    fn test_replayed_head_is_skipped() {
        let mut feed = NotificationFeed::new();
        feed.apply(&StreamMessage::Item(note(5)));
        assert_eq!(feed.apply(&StreamMessage::Item(note(5))), FeedChange::Unchanged);
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut feed = NotificationFeed::with_capacity(2);
        for id in 1..=3 {
            feed.apply(&StreamMessage::Item(note(id)));
        }
        assert_eq!(feed.items().iter().map(|n| n.id).collect::<Vec<_>>(), vec![3, 2]);
    }

    #[test]
    fn test_mark_read() {
        let mut feed = NotificationFeed::new();
        feed.replace_items(vec![note(2), note(1)]);
        feed.set_unread_count(2);

        assert!(feed.mark_read(1));
        assert!(!feed.mark_read(1));
        assert!(!feed.mark_read(99));
        assert_eq!(feed.unread_count(), 1);

        feed.mark_all_read();
        assert_eq!(feed.unread_count(), 0);
        assert!(feed.items().iter().all(|n| n.read));

        feed.clear();
        assert!(feed.is_empty());
    }
}
