//! Persistence contracts.
//!
//! The seat ledger never holds state of its own: every consistency guarantee is
//! delegated to the persistence service through [`SeatStore`], whose operations
//! are each one atomic unit scoped to a single event row. Independent client
//! sessions coordinate only through these operations.
//!
//! # Implementations
//!
//! - `PostgresStore` (in `seatledger-postgres`): row locks plus conditional updates
//! - `InMemoryStore` (in `seatledger-testing`): fast, deterministic testing
//!
//! All traits return boxed futures so services can hold them as `Arc<dyn …>`.

use crate::error::StoreError;
use crate::types::{
    Availability, Event, EventId, EventPatch, EventQuery, Feedback, Profile, Registration,
    RegistrationId, RegistrationWithEvent, UserId,
};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by every store operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

// ============================================================================
// Seat accounting
// ============================================================================

/// Everything the store needs to claim one seat.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClaimRequest {
    /// Event to claim a seat of
    pub event_id: EventId,
    /// Claiming user
    pub user_id: UserId,
    /// Identity for the registration row, chosen by the caller
    pub registration_id: RegistrationId,
    /// Time of the request; the claim fails if the event starts at or before it
    pub now: DateTime<Utc>,
}

/// Result of [`SeatStore::claim_seat`].
///
/// The variants are the distinguishable steps of the claim, checked in this
/// order under the event's row lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Registration inserted and `available_seats` decremented by one
    Claimed(Registration),
    /// No such event
    EventMissing,
    /// The event starts at or before `now`
    EventStarted,
    /// The user already holds an active registration for the event
    AlreadyRegistered,
    /// `available_seats` was zero
    SoldOut,
}

/// Result of [`SeatStore::release_seat`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Registration deleted and `available_seats` incremented (capped at capacity)
    Released(Registration),
    /// No such registration; also the answer to a repeated cancel
    Missing,
    /// The registration belongs to another user; nothing changed
    NotOwner,
}

/// Result of [`SeatStore::resize`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResizeOutcome {
    /// Capacity updated and availability recomputed
    Resized(Availability),
    /// No such event
    EventMissing,
    /// The new capacity is lower than the confirmed registrations; nothing changed
    BelowDemand {
        /// Confirmed registrations at the time of the request
        active: u32,
    },
}

/// The only writer of `available_seats`.
///
/// Each method must be atomic as a unit: no concurrent reader may observe a
/// registration without its seat decrement or vice versa, and two calls for
/// the same event must not interleave their read-modify-write steps.
pub trait SeatStore: Send + Sync {
    /// Claim one seat for a user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only for infrastructure failures; business
    /// outcomes are reported through [`ClaimOutcome`].
    fn claim_seat(&self, request: ClaimRequest) -> StoreFuture<'_, ClaimOutcome>;

    /// Delete a registration owned by `user_id` and give its seat back.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only for infrastructure failures.
    fn release_seat(
        &self,
        registration_id: RegistrationId,
        user_id: UserId,
    ) -> StoreFuture<'_, ReleaseOutcome>;

    /// Change capacity and recompute availability from the registration count.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only for infrastructure failures.
    fn resize(&self, event_id: EventId, new_total: u32) -> StoreFuture<'_, ResizeOutcome>;

    /// Committed seat counts of an event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    fn availability(&self, event_id: EventId) -> StoreFuture<'_, Option<Availability>>;

    /// Recompute `available_seats` from the registration set.
    ///
    /// Repairs counters written by a non-atomic writer. Returns the corrected
    /// availability, or `None` if the event does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only for infrastructure failures.
    fn reconcile(&self, event_id: EventId) -> StoreFuture<'_, Option<Availability>>;
}

// ============================================================================
// Catalog, registrations, feedback, profiles
// ============================================================================

/// Event rows.
///
/// `update_event` never touches seat counts; see [`SeatStore`].
pub trait CatalogStore: Send + Sync {
    /// Insert a new event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    fn insert_event(&self, event: Event) -> StoreFuture<'_, Event>;

    /// Fetch an event by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    fn get_event(&self, event_id: EventId) -> StoreFuture<'_, Option<Event>>;

    /// Apply a patch; returns the updated event or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    fn update_event(&self, event_id: EventId, patch: EventPatch)
    -> StoreFuture<'_, Option<Event>>;

    /// Delete an event together with its registrations and feedback.
    ///
    /// Returns whether a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the delete fails.
    fn delete_event(&self, event_id: EventId) -> StoreFuture<'_, bool>;

    /// List events matching a query.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    fn list_events(&self, query: EventQuery) -> StoreFuture<'_, Vec<Event>>;

    /// Cheap round trip used by readiness checks.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend is unreachable.
    fn ping(&self) -> StoreFuture<'_, ()>;
}

/// Read access to registrations.
pub trait RegistrationStore: Send + Sync {
    /// Active registration of a user for an event, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    fn find_registration(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> StoreFuture<'_, Option<Registration>>;

    /// All registrations of a user with their events, newest registration first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    fn registrations_for_user(&self, user_id: UserId)
    -> StoreFuture<'_, Vec<RegistrationWithEvent>>;

    /// All registrations for an event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    fn registrations_for_event(&self, event_id: EventId) -> StoreFuture<'_, Vec<Registration>>;

    /// Whether the user ever held a registration for the event.
    ///
    /// Written together with each successful claim and kept after a cancel;
    /// removed only when the event itself is deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    fn has_attended(&self, event_id: EventId, user_id: UserId) -> StoreFuture<'_, bool>;
}

/// Whether an upsert created or replaced a feedback row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// First submission
    Created(Feedback),
    /// Rating and comment of an existing row replaced
    Updated(Feedback),
}

impl FeedbackOutcome {
    /// The stored feedback.
    #[must_use]
    pub const fn feedback(&self) -> &Feedback {
        match self {
            Self::Created(f) | Self::Updated(f) => f,
        }
    }
}

/// Feedback rows, unique per (event, user).
pub trait FeedbackStore: Send + Sync {
    /// Insert, or replace rating and comment of the existing row for
    /// `(feedback.event_id, feedback.user_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    fn upsert_feedback(&self, feedback: Feedback) -> StoreFuture<'_, FeedbackOutcome>;

    /// Feedback of a user for an event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    fn find_feedback(&self, event_id: EventId, user_id: UserId)
    -> StoreFuture<'_, Option<Feedback>>;

    /// All feedback for an event, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    fn feedback_for_event(&self, event_id: EventId) -> StoreFuture<'_, Vec<Feedback>>;
}

/// Profile rows.
pub trait ProfileStore: Send + Sync {
    /// Fetch a profile.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    fn get_profile(&self, user_id: UserId) -> StoreFuture<'_, Option<Profile>>;

    /// Insert a profile, or update the email and name of an existing one.
    ///
    /// An existing profile keeps its stored role and creation time; roles
    /// are granted outside this path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    fn upsert_profile(&self, profile: Profile) -> StoreFuture<'_, Profile>;
}
