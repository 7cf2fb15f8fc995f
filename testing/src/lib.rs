//! # Seatledger Testing
//!
//! Testing utilities for the seat ledger and its services.
//!
//! This crate provides:
//! - [`InMemoryStore`]: an in-process persistence service implementing every
//!   store trait plus the change feed
//! - Mock implementations of the injected dependencies (clock, notifier, blobs)
//! - Fixture builders and proptest strategies
//!
//! ## Example
//!
//! ```ignore
//! use seatledger_testing::{InMemoryStore, fixtures, test_clock};
//!
//! #[tokio::test]
//! async fn test_register() {
//!     let store = InMemoryStore::new();
//!     let event = store.seed_event(fixtures::event(&test_clock()).seats(1).build());
//!     let ledger = fixtures::ledger(&store, &test_clock());
//!     ledger.register(&fixtures::attendee(), event.id).await.unwrap();
//! }
//! ```

use chrono::{DateTime, Duration, Utc};
use seatledger_core::environment::Clock;

mod memory_store;

pub use memory_store::InMemoryStore;

/// Mock implementations of injected dependencies.
pub mod mocks {
    use super::{Clock, DateTime, Duration, Utc};
    use seatledger_core::blob::{BlobStore, validate_key};
    use seatledger_core::notifier::{Notification, NotificationKind, Notifier};
    use seatledger_core::store::StoreFuture;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex, PoisonError, RwLock};

    /// Controllable clock for deterministic tests
    ///
    /// Returns the same time until moved with [`FixedClock::set`] or
    /// [`FixedClock::advance`]. Clones share the same time.
    ///
    /// # Example
    ///
    /// ```
    /// use seatledger_testing::mocks::FixedClock;
    /// use seatledger_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let start = Utc::now();
    /// let clock = FixedClock::new(start);
    /// assert_eq!(clock.now(), clock.now());
    ///
    /// clock.advance(Duration::hours(1));
    /// assert_eq!(clock.now(), start + Duration::hours(1));
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Jump to an absolute time.
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.write().unwrap_or_else(PoisonError::into_inner) = time;
        }

        /// Move the clock forward.
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.write().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Notifier that captures every dispatched notification.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingNotifier {
        sent: Arc<Mutex<Vec<Notification>>>,
    }

    impl RecordingNotifier {
        /// Create an empty recorder
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Everything dispatched so far, in order.
        #[must_use]
        pub fn notifications(&self) -> Vec<Notification> {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// How many notifications of one kind were dispatched.
        #[must_use]
        pub fn count(&self, kind: NotificationKind) -> usize {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .filter(|n| n.kind == kind)
                .count()
        }
    }

    impl Notifier for RecordingNotifier {
        fn dispatch(&self, notification: Notification) {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(notification);
        }
    }

    /// Blob store keeping uploads in memory, served from `memory://`.
    #[derive(Debug, Clone, Default)]
    pub struct MemoryBlobStore {
        blobs: Arc<Mutex<HashMap<String, (Vec<u8>, String)>>>,
        offline_after_put: Option<crate::InMemoryStore>,
    }

    impl MemoryBlobStore {
        /// Create an empty blob store
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Bytes and content type stored under `key`.
        #[must_use]
        pub fn get(&self, key: &str) -> Option<(Vec<u8>, String)> {
            self.blobs
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(key)
                .cloned()
        }

        /// Number of stored blobs
        #[must_use]
        pub fn len(&self) -> usize {
            self.blobs.lock().unwrap_or_else(PoisonError::into_inner).len()
        }

        /// Whether nothing was stored
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        /// Take `store` offline right after each successful put, so the
        /// write that follows an upload fails.
        #[must_use]
        pub fn taking_offline_after_put(mut self, store: &crate::InMemoryStore) -> Self {
            self.offline_after_put = Some(store.clone());
            self
        }
    }

    impl BlobStore for MemoryBlobStore {
        fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StoreFuture<'_, String> {
            let key = key.to_string();
            let content_type = content_type.to_string();
            Box::pin(async move {
                validate_key(&key)?;
                self.blobs
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key.clone(), (bytes, content_type));
                if let Some(store) = &self.offline_after_put {
                    store.set_unavailable(true);
                }
                Ok(format!("memory://{key}"))
            })
        }

        fn delete(&self, key: &str) -> StoreFuture<'_, ()> {
            let key = key.to_string();
            Box::pin(async move {
                validate_key(&key)?;
                self.blobs
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&key);
                Ok(())
            })
        }
    }
}

/// Fixture builders.
pub mod fixtures {
    use super::{Clock, Duration};
    use crate::InMemoryStore;
    use crate::mocks::{FixedClock, RecordingNotifier};
    use seatledger_core::ledger::SeatLedger;
    use seatledger_core::types::{Actor, Event, EventId, Profile, Role, UserId};
    use std::sync::Arc;

    /// Builder for [`Event`] rows, starting one week after the clock's time.
    #[derive(Debug, Clone)]
    pub struct EventBuilder {
        event: Event,
    }

    /// Start building an event relative to `clock`.
    #[must_use]
    pub fn event(clock: &FixedClock) -> EventBuilder {
        let now = clock.now();
        EventBuilder {
            event: Event {
                id: EventId::new(),
                title: "Rust Meetup".to_string(),
                description: "Lightning talks and pizza".to_string(),
                location: "Community Hall".to_string(),
                event_date: now + Duration::days(7),
                created_at: now,
                total_seats: 10,
                available_seats: 10,
                image_url: None,
                creator_id: UserId::new(),
            },
        }
    }

    impl EventBuilder {
        /// Capacity, with every seat available
        #[must_use]
        pub const fn seats(mut self, total: u32) -> Self {
            self.event.total_seats = total;
            self.event.available_seats = total;
            self
        }

        /// Title
        #[must_use]
        pub fn title(mut self, title: &str) -> Self {
            self.event.title = title.to_string();
            self
        }

        /// Location
        #[must_use]
        pub fn location(mut self, location: &str) -> Self {
            self.event.location = location.to_string();
            self
        }

        /// Start time relative to the builder's clock time
        #[must_use]
        pub fn starts_in(mut self, offset: Duration) -> Self {
            self.event.event_date = self.event.created_at + offset;
            self
        }

        /// Finish building
        #[must_use]
        pub fn build(self) -> Event {
            self.event
        }
    }

    /// A fresh standard user.
    #[must_use]
    pub fn attendee() -> Actor {
        Actor::standard(UserId::new())
    }

    /// A fresh admin.
    #[must_use]
    pub fn admin() -> Actor {
        Actor::admin(UserId::new())
    }

    /// Profile row for an actor.
    #[must_use]
    pub fn profile(actor: &Actor, clock: &FixedClock) -> Profile {
        Profile {
            id: actor.user_id,
            email: format!("{}@example.com", actor.user_id),
            full_name: "Test User".to_string(),
            role: if actor.is_admin() {
                Role::Admin
            } else {
                Role::Standard
            },
            created_at: clock.now(),
        }
    }

    /// A ledger over an in-memory store, discarding notifications.
    #[must_use]
    pub fn ledger(store: &InMemoryStore, clock: &FixedClock) -> SeatLedger {
        ledger_with_notifier(store, clock, &RecordingNotifier::new())
    }

    /// A ledger over an in-memory store, recording notifications.
    #[must_use]
    pub fn ledger_with_notifier(
        store: &InMemoryStore,
        clock: &FixedClock,
        notifier: &RecordingNotifier,
    ) -> SeatLedger {
        SeatLedger::new(
            Arc::new(store.clone()),
            Arc::new(clock.clone()),
            Arc::new(notifier.clone()),
        )
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// One step of a random ledger workload; users are indices into a pool.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LedgerOp {
        /// User registers
        Register(usize),
        /// User cancels their registration, if any
        Cancel(usize),
        /// Admin sets capacity
        Resize(u32),
    }

    /// Strategy over [`LedgerOp`] for a pool of `users` users.
    pub fn ledger_op(users: usize, max_seats: u32) -> impl Strategy<Value = LedgerOp> {
        prop_oneof![
            4 => (0..users).prop_map(LedgerOp::Register),
            2 => (0..users).prop_map(LedgerOp::Cancel),
            1 => (0..=max_seats).prop_map(LedgerOp::Resize),
        ]
    }
}

/// Install a fmt subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, MemoryBlobStore, RecordingNotifier, test_clock};
