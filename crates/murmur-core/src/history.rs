//! Cursor-based backward pagination over a chat's messages.
//!
//! Message ids are monotonically increasing in creation order and serve as
//! the cursor: a page contains up to `n` messages with id strictly below the
//! cursor, returned oldest-to-newest for display. Callers detect
//! end-of-history when a page comes back shorter than `n`, and fetch the
//! next older page by passing the smallest id they saw.

use serde::{Deserialize, Serialize};

use crate::types::{Message, MessageView};

/// Where a page starts: the newest messages, or strictly before a known id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum StartIndex {
    /// The "most recent" sentinel.
    Latest,
    /// Exclusive upper bound: only messages with a smaller id qualify.
    Before(u64),
}

/// Select one backward page from `messages`, which must be sorted by id
/// ascending. The returned slice preserves that order.
pub fn page_backward(messages: &[Message], start: StartIndex, n: usize) -> &[Message] {
    if n == 0 {
        return &[];
    }

    let end = match start {
        StartIndex::Latest => messages.len(),
        StartIndex::Before(id) => messages.partition_point(|m| m.id < id),
    };
    let begin = end.saturating_sub(n);
    &messages[begin..end]
}

/// A backward page shaped for display clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
    pub messages: Vec<MessageView>,
    /// Cursor for the next older page, if this page was full.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_before: Option<u64>,
}

impl HistoryPage {
    /// Build a display page from one `page_backward` result.
    pub fn from_messages(page: &[Message], n: usize) -> Self {
        let next_before = if page.len() == n {
            page.first().map(|m| m.id)
        } else {
            None
        };
        Self {
            messages: page.iter().map(MessageView::from).collect(),
            next_before,
        }
    }
}
