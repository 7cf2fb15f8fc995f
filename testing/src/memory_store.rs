//! In-memory persistence service.
//!
//! One mutex guards every table, so each trait call is trivially atomic and
//! serialized, which is exactly the contract the Postgres store provides per
//! event row. Mutations of `events` are published to subscribers the same way
//! the database trigger does.

use seatledger_core::error::StoreError;
use seatledger_core::feed::{ChangeFeed, ChangeNotice, ChangeOp, ChangeStream, FeedScope};
use seatledger_core::store::{
    CatalogStore, ClaimOutcome, ClaimRequest, FeedbackOutcome, FeedbackStore, ProfileStore,
    RegistrationStore, ReleaseOutcome, ResizeOutcome, SeatStore, StoreFuture,
};
use seatledger_core::types::{
    Availability, Event, EventId, EventOrder, EventPatch, EventQuery, Feedback, Profile,
    Registration, RegistrationId, RegistrationStatus, RegistrationWithEvent, UserId,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

const FEED_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct Tables {
    events: HashMap<EventId, Event>,
    registrations: HashMap<RegistrationId, Registration>,
    attendance: HashSet<(EventId, UserId)>,
    feedback: HashMap<(EventId, UserId), Feedback>,
    profiles: HashMap<UserId, Profile>,
}

impl Tables {
    fn active_count(&self, event_id: EventId) -> u32 {
        let count = self
            .registrations
            .values()
            .filter(|r| r.event_id == event_id)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

/// In-memory implementation of every store trait and of [`ChangeFeed`].
///
/// Clones share the same tables.
///
/// # Example
///
/// ```
/// use seatledger_testing::InMemoryStore;
/// use seatledger_core::store::SeatStore;
/// use seatledger_core::types::EventId;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryStore::new();
/// assert!(store.availability(EventId::new()).await?.is_none());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    changes: broadcast::Sender<ChangeNotice>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            changes,
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Insert an event row directly, bypassing the catalog service.
    pub fn seed_event(&self, event: Event) -> Event {
        self.tables().events.insert(event.id, event.clone());
        event
    }

    /// Insert a profile row directly.
    pub fn seed_profile(&self, profile: Profile) {
        self.tables().profiles.insert(profile.id, profile);
    }

    /// Current row of an event.
    #[must_use]
    pub fn event(&self, event_id: EventId) -> Option<Event> {
        self.tables().events.get(&event_id).cloned()
    }

    /// Number of registrations held for an event.
    #[must_use]
    pub fn registration_count(&self, event_id: EventId) -> u32 {
        self.tables().active_count(event_id)
    }

    /// Overwrite `available_seats` without touching registrations.
    ///
    /// Simulates drift left by a non-atomic writer so reconciliation can be
    /// exercised.
    pub fn force_available_seats(&self, event_id: EventId, available: u32) {
        if let Some(event) = self.tables().events.get_mut(&event_id) {
            event.available_seats = available;
        }
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("in-memory store offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn publish(&self, op: ChangeOp, event_id: EventId, event: Option<Event>) {
        // No subscribers is not an error.
        let _ = self.changes.send(ChangeNotice {
            op,
            event_id,
            event,
        });
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SeatStore for InMemoryStore {
    fn claim_seat(&self, request: ClaimRequest) -> StoreFuture<'_, ClaimOutcome> {
        Box::pin(async move {
            self.check_available()?;
            let (outcome, updated) = {
                let mut tables = self.tables();
                let Some(event) = tables.events.get(&request.event_id) else {
                    return Ok(ClaimOutcome::EventMissing);
                };
                if event.has_started(request.now) {
                    return Ok(ClaimOutcome::EventStarted);
                }
                if tables
                    .registrations
                    .values()
                    .any(|r| r.event_id == request.event_id && r.user_id == request.user_id)
                {
                    return Ok(ClaimOutcome::AlreadyRegistered);
                }
                if event.available_seats == 0 {
                    return Ok(ClaimOutcome::SoldOut);
                }

                let registration = Registration {
                    id: request.registration_id,
                    event_id: request.event_id,
                    user_id: request.user_id,
                    registered_at: request.now,
                    status: RegistrationStatus::Confirmed,
                };
                tables
                    .registrations
                    .insert(registration.id, registration.clone());
                tables
                    .attendance
                    .insert((request.event_id, request.user_id));
                let event = tables
                    .events
                    .get_mut(&request.event_id)
                    .ok_or_else(|| StoreError::Corrupt("event vanished under lock".to_string()))?;
                event.available_seats -= 1;
                (ClaimOutcome::Claimed(registration), event.clone())
            };
            self.publish(ChangeOp::Update, updated.id, Some(updated));
            Ok(outcome)
        })
    }

    fn release_seat(
        &self,
        registration_id: RegistrationId,
        user_id: UserId,
    ) -> StoreFuture<'_, ReleaseOutcome> {
        Box::pin(async move {
            self.check_available()?;
            let (registration, updated) = {
                let mut tables = self.tables();
                let Some(registration) = tables.registrations.get(&registration_id) else {
                    return Ok(ReleaseOutcome::Missing);
                };
                if registration.user_id != user_id {
                    return Ok(ReleaseOutcome::NotOwner);
                }
                let Some(registration) = tables.registrations.remove(&registration_id) else {
                    return Ok(ReleaseOutcome::Missing);
                };
                let updated = tables.events.get_mut(&registration.event_id).map(|event| {
                    event.available_seats = (event.available_seats + 1).min(event.total_seats);
                    event.clone()
                });
                (registration, updated)
            };
            if let Some(event) = updated {
                self.publish(ChangeOp::Update, event.id, Some(event));
            }
            Ok(ReleaseOutcome::Released(registration))
        })
    }

    fn resize(&self, event_id: EventId, new_total: u32) -> StoreFuture<'_, ResizeOutcome> {
        Box::pin(async move {
            self.check_available()?;
            let updated = {
                let mut tables = self.tables();
                let active = tables.active_count(event_id);
                let Some(event) = tables.events.get_mut(&event_id) else {
                    return Ok(ResizeOutcome::EventMissing);
                };
                if new_total < active {
                    return Ok(ResizeOutcome::BelowDemand { active });
                }
                event.total_seats = new_total;
                event.available_seats = new_total - active;
                event.clone()
            };
            let availability = updated.availability();
            self.publish(ChangeOp::Update, event_id, Some(updated));
            Ok(ResizeOutcome::Resized(availability))
        })
    }

    fn availability(&self, event_id: EventId) -> StoreFuture<'_, Option<Availability>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self.tables().events.get(&event_id).map(Event::availability))
        })
    }

    fn reconcile(&self, event_id: EventId) -> StoreFuture<'_, Option<Availability>> {
        Box::pin(async move {
            self.check_available()?;
            let updated = {
                let mut tables = self.tables();
                let active = tables.active_count(event_id);
                let Some(event) = tables.events.get_mut(&event_id) else {
                    return Ok(None);
                };
                event.available_seats = event.total_seats.saturating_sub(active);
                event.clone()
            };
            let availability = updated.availability();
            self.publish(ChangeOp::Update, event_id, Some(updated));
            Ok(Some(availability))
        })
    }
}

impl CatalogStore for InMemoryStore {
    fn insert_event(&self, event: Event) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            self.check_available()?;
            self.tables().events.insert(event.id, event.clone());
            self.publish(ChangeOp::Insert, event.id, Some(event.clone()));
            Ok(event)
        })
    }

    fn get_event(&self, event_id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self.event(event_id))
        })
    }

    fn update_event(
        &self,
        event_id: EventId,
        patch: EventPatch,
    ) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            self.check_available()?;
            let updated = self.tables().events.get_mut(&event_id).map(|event| {
                patch.apply_to(event);
                event.clone()
            });
            if let Some(event) = &updated {
                self.publish(ChangeOp::Update, event_id, Some(event.clone()));
            }
            Ok(updated)
        })
    }

    fn delete_event(&self, event_id: EventId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            self.check_available()?;
            let removed = {
                let mut tables = self.tables();
                let removed = tables.events.remove(&event_id).is_some();
                if removed {
                    tables.registrations.retain(|_, r| r.event_id != event_id);
                    tables.attendance.retain(|(event, _)| *event != event_id);
                    tables.feedback.retain(|(event, _), _| *event != event_id);
                }
                removed
            };
            if removed {
                self.publish(ChangeOp::Delete, event_id, None);
            }
            Ok(removed)
        })
    }

    fn list_events(&self, query: EventQuery) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            self.check_available()?;
            let mut events: Vec<Event> = self
                .tables()
                .events
                .values()
                .filter(|e| query.matches(e))
                .cloned()
                .collect();
            match query.order {
                EventOrder::DateAscending => events.sort_by_key(|e| e.event_date),
                EventOrder::DateDescending => {
                    events.sort_by(|a, b| b.event_date.cmp(&a.event_date));
                }
            }
            Ok(events)
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move { self.check_available() })
    }
}

impl RegistrationStore for InMemoryStore {
    fn find_registration(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> StoreFuture<'_, Option<Registration>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self
                .tables()
                .registrations
                .values()
                .find(|r| r.event_id == event_id && r.user_id == user_id)
                .cloned())
        })
    }

    fn registrations_for_user(
        &self,
        user_id: UserId,
    ) -> StoreFuture<'_, Vec<RegistrationWithEvent>> {
        Box::pin(async move {
            self.check_available()?;
            let tables = self.tables();
            let mut rows: Vec<RegistrationWithEvent> = tables
                .registrations
                .values()
                .filter(|r| r.user_id == user_id)
                .filter_map(|r| {
                    tables.events.get(&r.event_id).map(|e| RegistrationWithEvent {
                        registration: r.clone(),
                        event: e.clone(),
                    })
                })
                .collect();
            rows.sort_by(|a, b| b.registration.registered_at.cmp(&a.registration.registered_at));
            Ok(rows)
        })
    }

    fn registrations_for_event(&self, event_id: EventId) -> StoreFuture<'_, Vec<Registration>> {
        Box::pin(async move {
            self.check_available()?;
            let mut rows: Vec<Registration> = self
                .tables()
                .registrations
                .values()
                .filter(|r| r.event_id == event_id)
                .cloned()
                .collect();
            rows.sort_by_key(|r| r.registered_at);
            Ok(rows)
        })
    }

    fn has_attended(&self, event_id: EventId, user_id: UserId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self.tables().attendance.contains(&(event_id, user_id)))
        })
    }
}

impl FeedbackStore for InMemoryStore {
    fn upsert_feedback(&self, feedback: Feedback) -> StoreFuture<'_, FeedbackOutcome> {
        Box::pin(async move {
            self.check_available()?;
            let mut tables = self.tables();
            let key = (feedback.event_id, feedback.user_id);
            if let Some(existing) = tables.feedback.get_mut(&key) {
                existing.rating = feedback.rating;
                existing.comment = feedback.comment;
                return Ok(FeedbackOutcome::Updated(existing.clone()));
            }
            tables.feedback.insert(key, feedback.clone());
            Ok(FeedbackOutcome::Created(feedback))
        })
    }

    fn find_feedback(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> StoreFuture<'_, Option<Feedback>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self.tables().feedback.get(&(event_id, user_id)).cloned())
        })
    }

    fn feedback_for_event(&self, event_id: EventId) -> StoreFuture<'_, Vec<Feedback>> {
        Box::pin(async move {
            self.check_available()?;
            let mut rows: Vec<Feedback> = self
                .tables()
                .feedback
                .values()
                .filter(|f| f.event_id == event_id)
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(rows)
        })
    }
}

impl ProfileStore for InMemoryStore {
    fn get_profile(&self, user_id: UserId) -> StoreFuture<'_, Option<Profile>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self.tables().profiles.get(&user_id).cloned())
        })
    }

    fn upsert_profile(&self, profile: Profile) -> StoreFuture<'_, Profile> {
        Box::pin(async move {
            self.check_available()?;
            let mut tables = self.tables();
            let stored = match tables.profiles.get(&profile.id) {
                Some(existing) => Profile {
                    role: existing.role,
                    created_at: existing.created_at,
                    ..profile
                },
                None => profile,
            };
            tables.profiles.insert(stored.id, stored.clone());
            Ok(stored)
        })
    }
}

impl ChangeFeed for InMemoryStore {
    fn subscribe(&self, scope: FeedScope) -> ChangeStream {
        let mut rx = self.changes.subscribe();
        Box::pin(async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(notice) if scope.includes(&notice) => yield notice,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
