//! Property tests: the seat invariant holds after every step of a random workload.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use proptest::prelude::*;
use seatledger_core::error::LedgerError;
use seatledger_core::types::{Actor, Registration};
use seatledger_testing::properties::{LedgerOp, ledger_op};
use seatledger_testing::{InMemoryStore, fixtures, test_clock};
use std::collections::HashMap;

const USERS: usize = 6;
const MAX_SEATS: u32 = 8;

fn run_workload(initial_seats: u32, ops: &[LedgerOp]) -> Result<(), TestCaseError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");

    runtime.block_on(async {
        let clock = test_clock();
        let store = InMemoryStore::new();
        let ledger = fixtures::ledger(&store, &clock);
        let admin = fixtures::admin();
        let event = store.seed_event(fixtures::event(&clock).seats(initial_seats).build());
        let users: Vec<Actor> = (0..USERS).map(|_| fixtures::attendee()).collect();
        let mut held: HashMap<usize, Registration> = HashMap::new();

        for op in ops {
            let before = store.event(event.id).unwrap();
            match *op {
                LedgerOp::Register(i) => match ledger.register(&users[i], event.id).await {
                    Ok(registration) => {
                        prop_assert!(!held.contains_key(&i));
                        prop_assert!(before.available_seats > 0);
                        held.insert(i, registration);
                    }
                    Err(LedgerError::AlreadyRegistered { .. }) => {
                        prop_assert!(held.contains_key(&i));
                    }
                    Err(LedgerError::SoldOut(_)) => {
                        prop_assert_eq!(before.available_seats, 0);
                    }
                    Err(other) => prop_assert!(false, "unexpected error {other:?}"),
                },
                LedgerOp::Cancel(i) => {
                    if let Some(registration) = held.remove(&i) {
                        prop_assert!(ledger.cancel(&users[i], registration.id).await.is_ok());
                    }
                }
                LedgerOp::Resize(total) => {
                    match ledger.adjust_capacity(&admin, event.id, total).await {
                        Ok(availability) => prop_assert_eq!(availability.total_seats, total),
                        Err(LedgerError::CapacityBelowDemand { active, .. }) => {
                            prop_assert!(total < active);
                            let after = store.event(event.id).unwrap();
                            prop_assert_eq!(after.total_seats, before.total_seats);
                            prop_assert_eq!(after.available_seats, before.available_seats);
                        }
                        Err(LedgerError::Invalid(_)) => prop_assert_eq!(total, 0),
                        Err(other) => prop_assert!(false, "unexpected error {other:?}"),
                    }
                }
            }

            let after = store.event(event.id).unwrap();
            let active = u32::try_from(held.len()).unwrap();
            prop_assert!(after.available_seats <= after.total_seats);
            prop_assert_eq!(store.registration_count(event.id), active);
            prop_assert_eq!(after.available_seats, after.total_seats - active);
        }
        Ok(())
    })
}

proptest! {
    #[test]
    fn seat_counts_match_registrations(
        initial_seats in 1..=MAX_SEATS,
        ops in prop::collection::vec(ledger_op(USERS, MAX_SEATS), 1..60),
    ) {
        run_workload(initial_seats, &ops)?;
    }
}
