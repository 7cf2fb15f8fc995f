//! Seat ledger behaviour against the in-memory persistence service.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use chrono::Duration;
use seatledger_core::environment::Clock;
use seatledger_core::error::{ErrorKind, LedgerError};
use seatledger_core::notifier::NotificationKind;
use seatledger_core::types::{EventId, RegistrationId, RegistrationStatus};
use seatledger_testing::{InMemoryStore, RecordingNotifier, fixtures, test_clock};
use std::sync::Arc;

/// Checks `available = total - registrations` and `0 <= available <= total`.
fn assert_invariant(store: &InMemoryStore, event_id: EventId) {
    let event = store.event(event_id).expect("event exists");
    let held = store.registration_count(event_id);
    assert!(event.available_seats <= event.total_seats);
    assert_eq!(event.available_seats, event.total_seats - held);
}

#[tokio::test]
async fn register_claims_one_seat_and_notifies() {
    let clock = test_clock();
    let store = InMemoryStore::new();
    let notifier = RecordingNotifier::new();
    let ledger = fixtures::ledger_with_notifier(&store, &clock, &notifier);
    let event = store.seed_event(fixtures::event(&clock).seats(10).build());
    let alice = fixtures::attendee();

    let registration = ledger.register(&alice, event.id).await.unwrap();

    assert_eq!(registration.status, RegistrationStatus::Confirmed);
    assert_eq!(registration.user_id, alice.user_id);
    assert_eq!(registration.registered_at, clock.now());
    assert_eq!(store.event(event.id).unwrap().available_seats, 9);
    assert_eq!(notifier.count(NotificationKind::Registration), 1);
    assert_invariant(&store, event.id);
}

#[tokio::test]
async fn register_distinguishes_failures() {
    let clock = test_clock();
    let store = InMemoryStore::new();
    let ledger = fixtures::ledger(&store, &clock);
    let user = fixtures::attendee();

    let missing = EventId::new();
    assert_eq!(
        ledger.register(&user, missing).await,
        Err(LedgerError::EventNotFound(missing))
    );

    let past = store.seed_event(fixtures::event(&clock).starts_in(Duration::hours(-1)).build());
    assert_eq!(
        ledger.register(&user, past.id).await,
        Err(LedgerError::EventAlreadyStarted(past.id))
    );

    let full = store.seed_event(fixtures::event(&clock).seats(1).build());
    ledger.register(&fixtures::attendee(), full.id).await.unwrap();
    let err = ledger.register(&user, full.id).await.unwrap_err();
    assert_eq!(err, LedgerError::SoldOut(full.id));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.code(), "SOLD_OUT");
}

#[tokio::test]
async fn registration_closes_exactly_at_start_time() {
    let clock = test_clock();
    let store = InMemoryStore::new();
    let ledger = fixtures::ledger(&store, &clock);
    let event = store.seed_event(fixtures::event(&clock).starts_in(Duration::minutes(1)).build());

    clock.advance(Duration::minutes(1));

    assert_eq!(
        ledger.register(&fixtures::attendee(), event.id).await,
        Err(LedgerError::EventAlreadyStarted(event.id))
    );
    assert_eq!(store.event(event.id).unwrap().available_seats, 10);
}

#[tokio::test]
async fn second_register_by_same_user_is_rejected() {
    let clock = test_clock();
    let store = InMemoryStore::new();
    let ledger = fixtures::ledger(&store, &clock);
    let event = store.seed_event(fixtures::event(&clock).seats(5).build());
    let alice = fixtures::attendee();

    ledger.register(&alice, event.id).await.unwrap();
    let err = ledger.register(&alice, event.id).await.unwrap_err();

    assert_eq!(
        err,
        LedgerError::AlreadyRegistered {
            event_id: event.id,
            user_id: alice.user_id
        }
    );
    assert_eq!(store.event(event.id).unwrap().available_seats, 4);
    assert_invariant(&store, event.id);
}

#[tokio::test]
async fn cancel_gives_the_seat_back_once() {
    let clock = test_clock();
    let store = InMemoryStore::new();
    let notifier = RecordingNotifier::new();
    let ledger = fixtures::ledger_with_notifier(&store, &clock, &notifier);
    let event = store.seed_event(fixtures::event(&clock).seats(3).build());
    let alice = fixtures::attendee();
    let registration = ledger.register(&alice, event.id).await.unwrap();

    ledger.cancel(&alice, registration.id).await.unwrap();
    assert_eq!(store.event(event.id).unwrap().available_seats, 3);

    // Retried cancel
    assert_eq!(
        ledger.cancel(&alice, registration.id).await,
        Err(LedgerError::RegistrationNotFound(registration.id))
    );
    assert_eq!(store.event(event.id).unwrap().available_seats, 3);
    assert_eq!(notifier.count(NotificationKind::Cancellation), 1);
    assert_invariant(&store, event.id);
}

#[tokio::test]
async fn cancel_by_someone_else_is_forbidden() {
    let clock = test_clock();
    let store = InMemoryStore::new();
    let ledger = fixtures::ledger(&store, &clock);
    let event = store.seed_event(fixtures::event(&clock).seats(3).build());
    let alice = fixtures::attendee();
    let registration = ledger.register(&alice, event.id).await.unwrap();

    let err = ledger
        .cancel(&fixtures::attendee(), registration.id)
        .await
        .unwrap_err();

    assert_eq!(err, LedgerError::NotOwner(registration.id));
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(store.event(event.id).unwrap().available_seats, 2);

    let unknown = RegistrationId::new();
    assert_eq!(
        ledger.cancel(&alice, unknown).await,
        Err(LedgerError::RegistrationNotFound(unknown))
    );
}

#[tokio::test]
async fn re_registering_after_cancel_creates_a_fresh_registration() {
    let clock = test_clock();
    let store = InMemoryStore::new();
    let ledger = fixtures::ledger(&store, &clock);
    let event = store.seed_event(fixtures::event(&clock).seats(2).build());
    let alice = fixtures::attendee();

    let first = ledger.register(&alice, event.id).await.unwrap();
    ledger.cancel(&alice, first.id).await.unwrap();
    let second = ledger.register(&alice, event.id).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(store.event(event.id).unwrap().available_seats, 1);
}

#[tokio::test]
async fn adjust_capacity_recomputes_from_registrations() {
    let clock = test_clock();
    let store = InMemoryStore::new();
    let ledger = fixtures::ledger(&store, &clock);
    let event = store.seed_event(fixtures::event(&clock).seats(5).build());
    for _ in 0..3 {
        ledger.register(&fixtures::attendee(), event.id).await.unwrap();
    }

    let grown = ledger
        .adjust_capacity(&fixtures::admin(), event.id, 8)
        .await
        .unwrap();
    assert_eq!((grown.total_seats, grown.available_seats), (8, 5));

    let shrunk = ledger
        .adjust_capacity(&fixtures::admin(), event.id, 3)
        .await
        .unwrap();
    assert_eq!((shrunk.total_seats, shrunk.available_seats), (3, 0));
    assert_invariant(&store, event.id);
}

#[tokio::test]
async fn adjust_capacity_below_demand_changes_nothing() {
    let clock = test_clock();
    let store = InMemoryStore::new();
    let ledger = fixtures::ledger(&store, &clock);
    let event = store.seed_event(fixtures::event(&clock).seats(5).build());
    for _ in 0..3 {
        ledger.register(&fixtures::attendee(), event.id).await.unwrap();
    }

    let err = ledger
        .adjust_capacity(&fixtures::admin(), event.id, 2)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        LedgerError::CapacityBelowDemand {
            requested: 2,
            active: 3
        }
    );
    let row = store.event(event.id).unwrap();
    assert_eq!((row.total_seats, row.available_seats), (5, 2));
}

#[tokio::test]
async fn adjust_capacity_requires_admin_and_positive_total() {
    let clock = test_clock();
    let store = InMemoryStore::new();
    let ledger = fixtures::ledger(&store, &clock);
    let event = store.seed_event(fixtures::event(&clock).build());

    assert_eq!(
        ledger
            .adjust_capacity(&fixtures::attendee(), event.id, 50)
            .await,
        Err(LedgerError::AdminOnly)
    );
    let zero = ledger
        .adjust_capacity(&fixtures::admin(), event.id, 0)
        .await
        .unwrap_err();
    assert_eq!(zero.kind(), ErrorKind::Invalid);

    let missing = EventId::new();
    assert_eq!(
        ledger.adjust_capacity(&fixtures::admin(), missing, 5).await,
        Err(LedgerError::EventNotFound(missing))
    );
}

#[tokio::test]
async fn reconcile_repairs_drifted_counter() {
    let clock = test_clock();
    let store = InMemoryStore::new();
    let ledger = fixtures::ledger(&store, &clock);
    let event = store.seed_event(fixtures::event(&clock).seats(10).build());
    for _ in 0..4 {
        ledger.register(&fixtures::attendee(), event.id).await.unwrap();
    }
    store.force_available_seats(event.id, 9);

    assert_eq!(
        ledger.reconcile(&fixtures::attendee(), event.id).await,
        Err(LedgerError::AdminOnly)
    );
    let fixed = ledger.reconcile(&fixtures::admin(), event.id).await.unwrap();

    assert_eq!(fixed.available_seats, 6);
    assert_invariant(&store, event.id);
}

#[tokio::test]
async fn view_availability_reads_committed_counts() {
    let clock = test_clock();
    let store = InMemoryStore::new();
    let ledger = fixtures::ledger(&store, &clock);
    let event = store.seed_event(fixtures::event(&clock).seats(2).build());
    ledger.register(&fixtures::attendee(), event.id).await.unwrap();

    let availability = ledger.view_availability(event.id).await.unwrap();
    assert_eq!(availability.available_seats, 1);
    assert_eq!(availability.taken(), 1);

    let missing = EventId::new();
    assert_eq!(
        ledger.view_availability(missing).await,
        Err(LedgerError::EventNotFound(missing))
    );
}

#[tokio::test]
async fn store_outage_surfaces_as_unavailable() {
    let clock = test_clock();
    let store = InMemoryStore::new();
    let notifier = RecordingNotifier::new();
    let ledger = fixtures::ledger_with_notifier(&store, &clock, &notifier);
    let event = store.seed_event(fixtures::event(&clock).build());

    store.set_unavailable(true);
    let err = ledger
        .register(&fixtures::attendee(), event.id)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert!(err.is_retryable());
    assert!(notifier.notifications().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_seat_race_has_exactly_one_winner() {
    let clock = test_clock();
    let store = InMemoryStore::new();
    let ledger = Arc::new(fixtures::ledger(&store, &clock));
    let event = store.seed_event(fixtures::event(&clock).seats(1).build());

    let contenders: Vec<_> = (0..2)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move { ledger.register(&fixtures::attendee(), event.id).await })
        })
        .collect();
    let mut results = Vec::new();
    for handle in contenders {
        results.push(handle.await.unwrap());
    }

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| *r == Err(LedgerError::SoldOut(event.id)))
    );
    assert_eq!(store.event(event.id).unwrap().available_seats, 0);
    assert_invariant(&store, event.id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_concurrent_registrations_never_oversell() {
    let clock = test_clock();
    let store = InMemoryStore::new();
    let ledger = Arc::new(fixtures::ledger(&store, &clock));
    let event = store.seed_event(fixtures::event(&clock).seats(25).build());

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move { ledger.register(&fixtures::attendee(), event.id).await })
        })
        .collect();
    let mut confirmed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => confirmed += 1,
            Err(e) => assert_eq!(e, LedgerError::SoldOut(event.id)),
        }
    }

    assert_eq!(confirmed, 25);
    assert_invariant(&store, event.id);
}

/// Ten seats: register, cancel, fill to one left, then race for the last seat.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn end_to_end_scenario() {
    let clock = test_clock();
    let store = InMemoryStore::new();
    let ledger = Arc::new(fixtures::ledger(&store, &clock));
    let event = store.seed_event(fixtures::event(&clock).seats(10).build());

    let user_a = fixtures::attendee();
    let registration_a = ledger.register(&user_a, event.id).await.unwrap();
    assert_eq!(registration_a.status, RegistrationStatus::Confirmed);
    assert_eq!(ledger.view_availability(event.id).await.unwrap().available_seats, 9);

    ledger.cancel(&user_a, registration_a.id).await.unwrap();
    assert_eq!(ledger.view_availability(event.id).await.unwrap().available_seats, 10);
    assert_eq!(store.registration_count(event.id), 0);

    for _ in 0..9 {
        ledger.register(&fixtures::attendee(), event.id).await.unwrap();
    }
    assert_eq!(ledger.view_availability(event.id).await.unwrap().available_seats, 1);

    let (attendee_a, attendee_b) = (fixtures::attendee(), fixtures::attendee());
    let (first, second) = tokio::join!(
        ledger.register(&attendee_a, event.id),
        ledger.register(&attendee_b, event.id),
    );
    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|r| *r == Err(LedgerError::SoldOut(event.id)))
    );
    assert_eq!(ledger.view_availability(event.id).await.unwrap().available_seats, 0);
    assert_invariant(&store, event.id);
}
