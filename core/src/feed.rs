//! Read-side change feed over the `events` table.
//!
//! Presentation layers subscribe to keep displayed seat counts live. The feed
//! is downstream of the store: the seat ledger never publishes to it and never
//! reads from it, so a lagging or dropped subscription cannot affect
//! write-path consistency.

use crate::types::{Event, EventId};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Kind of row change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOp {
    /// Row created
    Insert,
    /// Row modified (including seat count changes)
    Update,
    /// Row removed
    Delete,
}

/// One change to an event row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotice {
    /// What happened
    pub op: ChangeOp,
    /// Which row
    pub event_id: EventId,
    /// Row after the change; `None` for deletes
    pub event: Option<Event>,
}

/// Which changes a subscriber wants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedScope {
    /// Every event row
    AllEvents,
    /// A single event row
    Event(EventId),
}

impl FeedScope {
    /// Whether a notice falls within this scope.
    #[must_use]
    pub fn includes(&self, notice: &ChangeNotice) -> bool {
        match self {
            Self::AllEvents => true,
            Self::Event(id) => notice.event_id == *id,
        }
    }
}

/// Stream of change notices for one subscriber.
pub type ChangeStream = Pin<Box<dyn Stream<Item = ChangeNotice> + Send>>;

/// Source of change notices.
pub trait ChangeFeed: Send + Sync {
    /// Subscribe to changes within `scope`.
    ///
    /// The stream only yields changes committed after subscription; a
    /// subscriber that falls behind skips notices rather than blocking writers.
    fn subscribe(&self, scope: FeedScope) -> ChangeStream;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_filters_by_event() {
        let id = EventId::new();
        let notice = ChangeNotice {
            op: ChangeOp::Delete,
            event_id: id,
            event: None,
        };
        assert!(FeedScope::AllEvents.includes(&notice));
        assert!(FeedScope::Event(id).includes(&notice));
        assert!(!FeedScope::Event(EventId::new()).includes(&notice));
    }
}
