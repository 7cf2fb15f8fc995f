//! Catalog, feedback and reminder services.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use chrono::Duration;
use seatledger_core::environment::Clock;
use seatledger_core::error::{ErrorKind, LedgerError};
use seatledger_core::notifier::NotificationKind;
use seatledger_core::store::FeedbackOutcome;
use seatledger_core::types::{EventPatch, NewEvent, RegistrationFilter};
use seatledger_core::{CatalogService, FeedbackService, ReminderService, SeatLedger};
use seatledger_testing::{FixedClock, InMemoryStore, RecordingNotifier, fixtures, test_clock};
use std::sync::Arc;

struct Harness {
    clock: FixedClock,
    store: InMemoryStore,
    notifier: RecordingNotifier,
    ledger: SeatLedger,
    catalog: CatalogService,
    feedback: FeedbackService,
    reminders: ReminderService,
}

fn harness() -> Harness {
    let clock = test_clock();
    let store = InMemoryStore::new();
    let notifier = RecordingNotifier::new();
    let shared = Arc::new(store.clone());
    let clock_dyn = Arc::new(clock.clone());
    Harness {
        ledger: fixtures::ledger_with_notifier(&store, &clock, &notifier),
        catalog: CatalogService::new(shared.clone(), shared.clone(), clock_dyn.clone()),
        feedback: FeedbackService::new(
            shared.clone(),
            shared.clone(),
            shared.clone(),
            clock_dyn.clone(),
        ),
        reminders: ReminderService::new(
            shared.clone(),
            shared,
            Arc::new(notifier.clone()),
            clock_dyn,
        ),
        clock,
        store,
        notifier,
    }
}

fn new_event(h: &Harness, title: &str, starts_in: Duration) -> NewEvent {
    NewEvent {
        title: title.to_string(),
        description: "An evening of talks".to_string(),
        location: "Main Hall".to_string(),
        event_date: h.clock.now() + starts_in,
        total_seats: 20,
        image_url: None,
    }
}

// ----------------------------------------------------------------------------
// Catalog
// ----------------------------------------------------------------------------

#[tokio::test]
async fn create_event_starts_with_every_seat_available() {
    let h = harness();
    let admin = fixtures::admin();

    let event = h
        .catalog
        .create_event(&admin, new_event(&h, "  Rust Night ", Duration::days(3)))
        .await
        .unwrap();

    assert_eq!(event.title, "Rust Night");
    assert_eq!(event.available_seats, event.total_seats);
    assert_eq!(event.creator_id, admin.user_id);
    assert_eq!(event.created_at, h.clock.now());
    assert_eq!(h.catalog.get_event(event.id).await.unwrap(), event);
}

#[tokio::test]
async fn create_event_validates_input_and_role() {
    let h = harness();

    assert_eq!(
        h.catalog
            .create_event(&fixtures::attendee(), new_event(&h, "Nope", Duration::days(1)))
            .await,
        Err(LedgerError::AdminOnly)
    );

    let mut zero = new_event(&h, "Empty room", Duration::days(1));
    zero.total_seats = 0;
    let err = h.catalog.create_event(&fixtures::admin(), zero).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);

    let blank = new_event(&h, "   ", Duration::days(1));
    let err = h.catalog.create_event(&fixtures::admin(), blank).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);
}

#[tokio::test]
async fn update_event_never_touches_seats() {
    let h = harness();
    let admin = fixtures::admin();
    let event = h
        .catalog
        .create_event(&admin, new_event(&h, "Rust Night", Duration::days(3)))
        .await
        .unwrap();
    h.ledger.register(&fixtures::attendee(), event.id).await.unwrap();

    let updated = h
        .catalog
        .update_event(
            &admin,
            event.id,
            EventPatch {
                location: Some("Annex".to_string()),
                ..EventPatch::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.location, "Annex");
    assert_eq!((updated.total_seats, updated.available_seats), (20, 19));
}

#[tokio::test]
async fn delete_event_cascades_and_reports_missing() {
    let h = harness();
    let admin = fixtures::admin();
    let event = h
        .catalog
        .create_event(&admin, new_event(&h, "Rust Night", Duration::days(3)))
        .await
        .unwrap();
    let attendee = fixtures::attendee();
    h.ledger.register(&attendee, event.id).await.unwrap();

    h.catalog.delete_event(&admin, event.id).await.unwrap();

    assert_eq!(
        h.catalog.delete_event(&admin, event.id).await,
        Err(LedgerError::EventNotFound(event.id))
    );
    let mine = h
        .catalog
        .my_registrations(&attendee, RegistrationFilter::All, None)
        .await
        .unwrap();
    assert!(mine.is_empty());
}

#[tokio::test]
async fn browse_lists_upcoming_soonest_first() {
    let h = harness();
    let later = h.store.seed_event(
        fixtures::event(&h.clock)
            .title("Compiler Club")
            .starts_in(Duration::days(9))
            .build(),
    );
    let sooner = h.store.seed_event(
        fixtures::event(&h.clock)
            .title("Async Workshop")
            .starts_in(Duration::days(2))
            .build(),
    );
    h.store.seed_event(
        fixtures::event(&h.clock)
            .title("Last Year")
            .starts_in(Duration::days(-30))
            .build(),
    );

    let listed = h.catalog.browse(None).await.unwrap();
    let ids: Vec<_> = listed.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![sooner.id, later.id]);

    let searched = h.catalog.browse(Some("compiler".to_string())).await.unwrap();
    assert_eq!(searched.len(), 1);
    assert_eq!(searched[0].id, later.id);
}

#[tokio::test]
async fn manage_lists_everything_latest_first() {
    let h = harness();
    let past = h.store.seed_event(
        fixtures::event(&h.clock)
            .location("Lisbon")
            .starts_in(Duration::days(-3))
            .build(),
    );
    let future = h.store.seed_event(fixtures::event(&h.clock).starts_in(Duration::days(3)).build());

    assert_eq!(
        h.catalog.manage(&fixtures::attendee(), None).await,
        Err(LedgerError::AdminOnly)
    );
    let all = h.catalog.manage(&fixtures::admin(), None).await.unwrap();
    let ids: Vec<_> = all.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![future.id, past.id]);

    let by_location = h
        .catalog
        .manage(&fixtures::admin(), Some("lisbon".to_string()))
        .await
        .unwrap();
    assert_eq!(by_location.len(), 1);
}

#[tokio::test]
async fn my_registrations_filters_by_date_and_search() {
    let h = harness();
    let attendee = fixtures::attendee();
    let soon = h.store.seed_event(
        fixtures::event(&h.clock)
            .title("Rust Meetup")
            .starts_in(Duration::hours(2))
            .build(),
    );
    let later = h.store.seed_event(
        fixtures::event(&h.clock)
            .title("Go Meetup")
            .starts_in(Duration::days(5))
            .build(),
    );
    h.ledger.register(&attendee, soon.id).await.unwrap();
    h.clock.advance(Duration::minutes(1));
    h.ledger.register(&attendee, later.id).await.unwrap();

    let all = h
        .catalog
        .my_registrations(&attendee, RegistrationFilter::All, None)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].event.id, later.id, "newest registration first");

    h.clock.advance(Duration::hours(3));
    let past = h
        .catalog
        .my_registrations(&attendee, RegistrationFilter::Past, None)
        .await
        .unwrap();
    assert_eq!(past.len(), 1);
    assert_eq!(past[0].event.id, soon.id);

    let upcoming = h
        .catalog
        .my_registrations(&attendee, RegistrationFilter::Upcoming, Some("go"))
        .await
        .unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].event.id, later.id);
}

// ----------------------------------------------------------------------------
// Feedback
// ----------------------------------------------------------------------------

#[tokio::test]
async fn feedback_opens_after_start_for_attendees_only() {
    let h = harness();
    let attendee = fixtures::attendee();
    let event = h.store.seed_event(fixtures::event(&h.clock).starts_in(Duration::hours(1)).build());
    h.ledger.register(&attendee, event.id).await.unwrap();

    assert_eq!(
        h.feedback
            .submit_feedback(&attendee, event.id, 5, "Great".to_string())
            .await,
        Err(LedgerError::EventNotFinished(event.id))
    );

    h.clock.advance(Duration::hours(2));
    let stranger = fixtures::attendee();
    assert_eq!(
        h.feedback
            .submit_feedback(&stranger, event.id, 4, String::new())
            .await,
        Err(LedgerError::NotRegistered {
            event_id: event.id,
            user_id: stranger.user_id
        })
    );

    let outcome = h
        .feedback
        .submit_feedback(&attendee, event.id, 5, "Great".to_string())
        .await
        .unwrap();
    assert!(matches!(outcome, FeedbackOutcome::Created(_)));
}

#[tokio::test]
async fn cancelled_attendee_can_still_leave_feedback() {
    let h = harness();
    let attendee = fixtures::attendee();
    let event = h.store.seed_event(fixtures::event(&h.clock).starts_in(Duration::hours(1)).build());
    let registration = h.ledger.register(&attendee, event.id).await.unwrap();
    h.ledger.cancel(&attendee, registration.id).await.unwrap();

    h.clock.advance(Duration::hours(2));
    let outcome = h
        .feedback
        .submit_feedback(&attendee, event.id, 4, "ok".to_string())
        .await
        .unwrap();
    assert!(matches!(outcome, FeedbackOutcome::Created(_)));
    assert_eq!(h.store.registration_count(event.id), 0);
}

#[tokio::test]
async fn resubmitted_feedback_replaces_the_first() {
    let h = harness();
    let attendee = fixtures::attendee();
    let event = h.store.seed_event(fixtures::event(&h.clock).starts_in(Duration::hours(1)).build());
    h.ledger.register(&attendee, event.id).await.unwrap();
    h.clock.advance(Duration::days(1));

    let first = h
        .feedback
        .submit_feedback(&attendee, event.id, 2, "Meh".to_string())
        .await
        .unwrap();
    let second = h
        .feedback
        .submit_feedback(&attendee, event.id, 4, "Better on reflection".to_string())
        .await
        .unwrap();

    let FeedbackOutcome::Updated(updated) = second else {
        unreachable!("second submission must update");
    };
    assert_eq!(updated.id, first.feedback().id);
    assert_eq!(updated.rating.value(), 4);

    let mine = h.feedback.my_feedback(&attendee, event.id).await.unwrap().unwrap();
    assert_eq!(mine.comment, "Better on reflection");

    let all = h
        .feedback
        .event_feedback(&fixtures::admin(), event.id)
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(
        h.feedback.event_feedback(&attendee, event.id).await,
        Err(LedgerError::AdminOnly)
    );
}

#[tokio::test]
async fn feedback_rating_must_be_one_to_five() {
    let h = harness();
    let attendee = fixtures::attendee();
    let event = h.store.seed_event(fixtures::event(&h.clock).build());

    for rating in [0, 6] {
        let err = h
            .feedback
            .submit_feedback(&attendee, event.id, rating, String::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }
}

// ----------------------------------------------------------------------------
// Reminders
// ----------------------------------------------------------------------------

#[tokio::test]
async fn reminders_go_to_attendees_of_events_inside_the_window() {
    let h = harness();
    let tomorrow = h.store.seed_event(fixtures::event(&h.clock).starts_in(Duration::hours(20)).build());
    let next_week = h.store.seed_event(fixtures::event(&h.clock).starts_in(Duration::days(7)).build());
    for _ in 0..3 {
        h.ledger.register(&fixtures::attendee(), tomorrow.id).await.unwrap();
    }
    h.ledger.register(&fixtures::attendee(), next_week.id).await.unwrap();

    assert_eq!(
        h.reminders
            .send_reminders(&fixtures::attendee(), Duration::hours(24))
            .await,
        Err(LedgerError::AdminOnly)
    );
    let sent = h
        .reminders
        .send_reminders(&fixtures::admin(), Duration::hours(24))
        .await
        .unwrap();

    assert_eq!(sent, 3);
    assert_eq!(h.notifier.count(NotificationKind::Reminder), 3);
    assert!(
        h.notifier
            .notifications()
            .iter()
            .filter(|n| n.kind == NotificationKind::Reminder)
            .all(|n| n.event_id == tomorrow.id)
    );
}
