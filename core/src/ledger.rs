//! The seat ledger.
//!
//! Mediates every mutation of `available_seats` so that, for each event,
//! `available_seats = total_seats - |confirmed registrations|` holds at every
//! point observable by another session.
//!
//! **Concurrency Strategy**: no in-process locking. Every operation is a single
//! atomic call on [`SeatStore`], which serializes mutations per event row (row
//! lock or conditional update). Calls for different events never coordinate.
//!
//! # Failure semantics
//!
//! Nothing is retried here. A losing concurrent Register surfaces
//! [`LedgerError::SoldOut`]; infrastructure failures surface
//! [`LedgerError::Unavailable`]. Cancel is naturally idempotent (a repeat
//! reports [`LedgerError::RegistrationNotFound`] and changes nothing);
//! Register must not be blindly retried without first checking for an
//! existing registration, since an abandoned call may already have committed.
//!
//! # Registration lifecycle
//!
//! ```text
//! none ──Register──▶ confirmed ──Cancel──▶ (deleted)
//! ```
//!
//! A cancelled registration is never reinstated; registering again creates a
//! fresh one.

use crate::environment::Clock;
use crate::error::{LedgerError, Result};
use crate::notifier::{Notification, NotificationKind, Notifier};
use crate::store::{ClaimOutcome, ClaimRequest, ReleaseOutcome, ResizeOutcome, SeatStore};
use crate::types::{Actor, Availability, EventId, Registration, RegistrationId};
use std::sync::Arc;

/// Seat-accounting service.
#[derive(Clone)]
pub struct SeatLedger {
    store: Arc<dyn SeatStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl SeatLedger {
    /// Create a ledger over a seat store.
    #[must_use]
    pub fn new(
        store: Arc<dyn SeatStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            clock,
            notifier,
        }
    }

    /// Claim one seat of `event_id` for the caller.
    ///
    /// The existence check, start-time check, duplicate check and conditional
    /// decrement run as ordered steps inside one atomic store operation, so
    /// each failure maps to exactly one error.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::EventNotFound`]
    /// - [`LedgerError::EventAlreadyStarted`]
    /// - [`LedgerError::AlreadyRegistered`]
    /// - [`LedgerError::SoldOut`]
    /// - [`LedgerError::Unavailable`]
    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn register(&self, actor: &Actor, event_id: EventId) -> Result<Registration> {
        let request = ClaimRequest {
            event_id,
            user_id: actor.user_id,
            registration_id: RegistrationId::new(),
            now: self.clock.now(),
        };

        let outcome = self.store.claim_seat(request).await.inspect_err(|e| {
            tracing::warn!(error = %e, "Seat claim failed in store");
            record_registration("unavailable");
        })?;

        match outcome {
            ClaimOutcome::Claimed(registration) => {
                tracing::info!(registration_id = %registration.id, "Seat claimed");
                record_registration("confirmed");
                self.notifier.dispatch(Notification::new(
                    event_id,
                    actor.user_id,
                    NotificationKind::Registration,
                ));
                Ok(registration)
            }
            ClaimOutcome::EventMissing => {
                record_registration("event_not_found");
                Err(LedgerError::EventNotFound(event_id))
            }
            ClaimOutcome::EventStarted => {
                record_registration("event_started");
                Err(LedgerError::EventAlreadyStarted(event_id))
            }
            ClaimOutcome::AlreadyRegistered => {
                record_registration("already_registered");
                Err(LedgerError::AlreadyRegistered {
                    event_id,
                    user_id: actor.user_id,
                })
            }
            ClaimOutcome::SoldOut => {
                tracing::debug!("Seat claim lost: sold out");
                record_registration("sold_out");
                Err(LedgerError::SoldOut(event_id))
            }
        }
    }

    /// Cancel the caller's registration and give the seat back.
    ///
    /// The seat increment is capped at capacity, so a duplicate cancel racing
    /// the first can never push availability above `total_seats`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::RegistrationNotFound`] (also for an already-cancelled id)
    /// - [`LedgerError::NotOwner`]
    /// - [`LedgerError::Unavailable`]
    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn cancel(&self, actor: &Actor, registration_id: RegistrationId) -> Result<()> {
        match self
            .store
            .release_seat(registration_id, actor.user_id)
            .await?
        {
            ReleaseOutcome::Released(registration) => {
                tracing::info!(event_id = %registration.event_id, "Seat released");
                metrics::counter!("seatledger_cancellations_total").increment(1);
                self.notifier.dispatch(Notification::new(
                    registration.event_id,
                    actor.user_id,
                    NotificationKind::Cancellation,
                ));
                Ok(())
            }
            ReleaseOutcome::Missing => Err(LedgerError::RegistrationNotFound(registration_id)),
            ReleaseOutcome::NotOwner => {
                tracing::warn!("Cancel attempted on another user's registration");
                Err(LedgerError::NotOwner(registration_id))
            }
        }
    }

    /// Change the capacity of an event (admin only).
    ///
    /// Availability is recomputed as `new_total - confirmed registrations`.
    /// Shrinking capacity below the confirmed registrations is refused and
    /// leaves both counters unchanged.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AdminOnly`]
    /// - [`LedgerError::Invalid`] for a zero capacity
    /// - [`LedgerError::EventNotFound`]
    /// - [`LedgerError::CapacityBelowDemand`]
    /// - [`LedgerError::Unavailable`]
    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn adjust_capacity(
        &self,
        actor: &Actor,
        event_id: EventId,
        new_total: u32,
    ) -> Result<Availability> {
        if !actor.is_admin() {
            return Err(LedgerError::AdminOnly);
        }
        if new_total == 0 {
            return Err(LedgerError::Invalid(
                "total seats must be greater than 0".to_string(),
            ));
        }

        match self.store.resize(event_id, new_total).await? {
            ResizeOutcome::Resized(availability) => {
                tracing::info!(
                    total_seats = availability.total_seats,
                    available_seats = availability.available_seats,
                    "Capacity adjusted"
                );
                record_availability(&availability);
                Ok(availability)
            }
            ResizeOutcome::EventMissing => Err(LedgerError::EventNotFound(event_id)),
            ResizeOutcome::BelowDemand { active } => Err(LedgerError::CapacityBelowDemand {
                requested: new_total,
                active,
            }),
        }
    }

    /// Committed seat counts of an event.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::EventNotFound`]
    /// - [`LedgerError::Unavailable`]
    pub async fn view_availability(&self, event_id: EventId) -> Result<Availability> {
        let availability = self
            .store
            .availability(event_id)
            .await?
            .ok_or(LedgerError::EventNotFound(event_id))?;
        record_availability(&availability);
        Ok(availability)
    }

    /// Recompute an event's availability from its registrations (admin only).
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AdminOnly`]
    /// - [`LedgerError::EventNotFound`]
    /// - [`LedgerError::Unavailable`]
    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn reconcile(&self, actor: &Actor, event_id: EventId) -> Result<Availability> {
        if !actor.is_admin() {
            return Err(LedgerError::AdminOnly);
        }
        let availability = self
            .store
            .reconcile(event_id)
            .await?
            .ok_or(LedgerError::EventNotFound(event_id))?;
        tracing::info!(
            available_seats = availability.available_seats,
            "Availability reconciled"
        );
        record_availability(&availability);
        Ok(availability)
    }
}

fn record_registration(outcome: &'static str) {
    metrics::counter!("seatledger_registrations_total", "outcome" => outcome).increment(1);
}

fn record_availability(availability: &Availability) {
    metrics::gauge!(
        "seatledger_available_seats",
        "event_id" => availability.event_id.to_string()
    )
    .set(f64::from(availability.available_seats));
}
