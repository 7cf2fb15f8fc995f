//! Out-of-band notification dispatch.
//!
//! Notifications are fire-and-forget: [`Notifier::dispatch`] returns
//! immediately, delivery failures are logged by the implementation and never
//! retried, and they never affect the ledger operation that triggered them.

use crate::types::{EventId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a user is being notified.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// A seat was claimed
    Registration,
    /// The event starts soon
    Reminder,
    /// A seat was given back
    Cancellation,
}

impl NotificationKind {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::Reminder => "reminder",
            Self::Cancellation => "cancellation",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification request, serialized as `{"eventId", "userId", "type"}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Event the notification is about
    pub event_id: EventId,
    /// Recipient
    pub user_id: UserId,
    /// What happened
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}

impl Notification {
    /// Build a notification.
    #[must_use]
    pub const fn new(event_id: EventId, user_id: UserId, kind: NotificationKind) -> Self {
        Self {
            event_id,
            user_id,
            kind,
        }
    }
}

/// Sink for notification requests.
pub trait Notifier: Send + Sync {
    /// Hand off a notification without waiting for delivery.
    fn dispatch(&self, notification: Notification);
}

/// Notifier that only records the request in the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn dispatch(&self, notification: Notification) {
        tracing::info!(
            event_id = %notification.event_id,
            user_id = %notification.user_id,
            kind = %notification.kind,
            "Notification requested"
        );
    }
}
