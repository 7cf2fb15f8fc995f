//! # Seatledger Core
//!
//! Domain types, persistence contracts and services for event registration.
//!
//! The centrepiece is the [`SeatLedger`](ledger::SeatLedger), which owns the
//! invariant that an event's `available_seats` always equals `total_seats`
//! minus its confirmed registrations, under concurrent mutation from
//! independent sessions.
//!
//! ## Architecture
//!
//! - **Services** (`ledger`, `catalog`, `feedback`, `reminders`) hold no state
//!   and take the caller as an explicit [`Actor`](types::Actor).
//! - **Stores** (`store`) are object-safe traits; every seat mutation is one
//!   atomic store call scoped to a single event row.
//! - **Side channels** (`notifier`, `feed`, `blob`) are downstream of the
//!   store and never influence write-path consistency.
//!
//! ## Example
//!
//! ```ignore
//! use seatledger_core::{ledger::SeatLedger, types::Actor};
//!
//! let ledger = SeatLedger::new(store, clock, notifier);
//! let registration = ledger.register(&Actor::standard(user_id), event_id).await?;
//! ledger.cancel(&Actor::standard(user_id), registration.id).await?;
//! ```

pub use chrono::{DateTime, Utc};

pub mod blob;
pub mod catalog;
pub mod environment;
pub mod error;
pub mod feed;
pub mod feedback;
pub mod ledger;
pub mod notifier;
pub mod reminders;
pub mod store;
pub mod types;

pub use catalog::CatalogService;
pub use error::{ErrorKind, LedgerError, Result, StoreError};
pub use feedback::FeedbackService;
pub use ledger::SeatLedger;
pub use reminders::ReminderService;
