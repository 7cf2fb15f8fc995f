//! Reminder dispatch for events starting soon.

use crate::catalog::require_admin;
use crate::environment::Clock;
use crate::error::{LedgerError, Result};
use crate::notifier::{Notification, NotificationKind, Notifier};
use crate::store::{CatalogStore, RegistrationStore};
use crate::types::{Actor, EventOrder, EventQuery};
use chrono::Duration;
use std::sync::Arc;

/// Default look-ahead for reminders, in hours.
pub const DEFAULT_REMINDER_WINDOW_HOURS: i64 = 24;

/// Sends `reminder` notifications to attendees of upcoming events.
#[derive(Clone)]
pub struct ReminderService {
    events: Arc<dyn CatalogStore>,
    registrations: Arc<dyn RegistrationStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl ReminderService {
    /// Create a reminder service.
    #[must_use]
    pub fn new(
        events: Arc<dyn CatalogStore>,
        registrations: Arc<dyn RegistrationStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events,
            registrations,
            notifier,
            clock,
        }
    }

    /// Remind every registered user of each event starting in `(now, now + window]`.
    ///
    /// Returns the number of notifications dispatched. Delivery is
    /// fire-and-forget, so the count is of requests, not of delivered emails.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AdminOnly`]
    /// - [`LedgerError::Invalid`] for a non-positive window
    /// - [`LedgerError::Unavailable`]
    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn send_reminders(&self, actor: &Actor, window: Duration) -> Result<usize> {
        require_admin(actor)?;
        if window <= Duration::zero() {
            return Err(LedgerError::Invalid(
                "reminder window must be positive".to_string(),
            ));
        }

        let now = self.clock.now();
        let upcoming = self
            .events
            .list_events(EventQuery {
                starting_from: Some(now),
                starting_until: Some(now + window),
                order: EventOrder::DateAscending,
                ..EventQuery::default()
            })
            .await?;

        let mut sent = 0usize;
        for event in upcoming.iter().filter(|e| !e.has_started(now)) {
            let attendees = self.registrations.registrations_for_event(event.id).await?;
            for registration in &attendees {
                self.notifier.dispatch(Notification::new(
                    event.id,
                    registration.user_id,
                    NotificationKind::Reminder,
                ));
            }
            tracing::debug!(event_id = %event.id, attendees = attendees.len(), "Reminders queued");
            sent += attendees.len();
        }

        tracing::info!(events = upcoming.len(), sent, "Reminder run finished");
        metrics::counter!("seatledger_reminders_sent_total")
            .increment(u64::try_from(sent).unwrap_or(u64::MAX));
        Ok(sent)
    }
}
