//! Message timeline for the active conversation.
//!
//! The timeline is a collection window whose sequence is kept in
//! chronological order (oldest first). Pagination runs in reverse: the first
//! page is the most recent one, and every further page holds older messages
//! that go in front of what is already loaded.

use chrono::{FixedOffset, NaiveDate};
use serde::Serialize;
use sync_types::{Message, Page};

use crate::CollectionWindow;

/// One row of the grouped timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TimelineEntry {
    /// A calendar date change between adjacent messages.
    DateBoundary(NaiveDate),
    /// A message.
    Message(Message),
}

/// Chronologically ordered messages exchanged with one peer.
#[derive(Debug, Clone, Default)]
pub struct MessageTimeline {
    window: CollectionWindow<Message>,
}

impl MessageTimeline {
    /// Create an empty timeline.
    pub fn new() -> Self {
        Self {
            window: CollectionWindow::new(),
        }
    }

    /// Apply a page fetched at `offset`.
    ///
    /// `offset == 0` replaces the timeline with the most recent page;
    /// larger offsets prepend older messages.
    ///
    /// A replace keeps held messages newer than everything in the page: a
    /// send confirmed while the page was in flight is not in it.
    pub fn apply_page(&mut self, offset: u64, page: Page<Message>) -> usize {
        let kept = if offset == 0 {
            self.newer_than(&page)
        } else {
            Vec::new()
        };
        let mut inserted = self.window.apply_older_page(offset, page);
        for message in kept {
            if self.window.push_created_back(message) {
                inserted += 1;
            }
        }
        self.normalize();
        inserted
    }

    /// Append a message the viewer just sent (or just received).
    ///
    /// Returns false if the message is already present.
    pub fn append(&mut self, message: Message) -> bool {
        let added = self.window.push_created_back(message);
        if added {
            self.normalize();
        }
        added
    }

    /// Merge a freshly polled most-recent page without replacing what is
    /// already loaded.
    ///
    /// Messages not yet held are added; each one grows the counters as a
    /// newly created message would. Returns the number added.
    pub fn merge_latest(&mut self, page: Page<Message>) -> usize {
        let mut added = 0;
        for message in page.items {
            if self.window.push_created_back(message) {
                added += 1;
            }
        }
        if added > 0 {
            self.normalize();
        }
        added
    }

    /// Messages in chronological order.
    pub fn messages(&self) -> &[Message] {
        self.window.items()
    }

    /// Whether older messages remain on the server.
    pub fn has_more(&self) -> bool {
        self.window.has_more()
    }

    /// Offset to request for the next older page.
    pub fn next_offset(&self) -> u64 {
        self.window.next_offset()
    }

    /// Number of messages held.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Whether no messages are held.
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Drop all messages and start a new generation.
    pub fn reset(&mut self) {
        self.window.reset();
    }

    /// Current generation of the underlying window.
    pub fn generation(&self) -> u64 {
        self.window.generation()
    }

    /// The timeline with date boundaries inserted, in the given UTC offset.
    pub fn grouped(&self, offset: FixedOffset) -> Vec<TimelineEntry> {
        group_by_date(self.messages(), offset)
    }

    fn newer_than(&self, page: &Page<Message>) -> Vec<Message> {
        let newest = page.items.iter().map(|m| (m.created_at, m.id)).max();
        self.messages()
            .iter()
            .filter(|m| newest.map_or(true, |n| (m.created_at, m.id) > n))
            .cloned()
            .collect()
    }

    // Pages arrive newest-first from the backend; sort once after every merge.
    fn normalize(&mut self) {
        self.window
            .sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    }
}

/// Insert a date boundary before every message whose calendar date (in
/// `offset`) differs from the previous message's.
///
/// `messages` must already be in chronological order.
pub fn group_by_date(messages: &[Message], offset: FixedOffset) -> Vec<TimelineEntry> {
    let mut entries = Vec::with_capacity(messages.len() + 1);
    let mut current: Option<NaiveDate> = None;

    for message in messages {
        let date = message.created_at.with_timezone(&offset).date_naive();
        if current != Some(date) {
            current = Some(date);
            entries.push(TimelineEntry::DateBoundary(date));
        }
        entries.push(TimelineEntry::Message(message.clone()));
    }

    entries
}
