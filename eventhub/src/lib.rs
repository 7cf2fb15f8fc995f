//! Event registration service.
//!
//! REST API and live seat feed over the seat ledger. Users browse upcoming
//! events, register while seats last, cancel, and leave feedback afterwards;
//! admins manage the catalog, adjust capacity and send reminders.
//!
//! # Architecture
//!
//! ```text
//! HTTP / WebSocket
//!        │
//!        ▼
//! ┌──────────────┐   SessionUser / RequireAdmin (JWT + profile role)
//! │  api::*      │
//! └──────────────┘
//!        │
//!        ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │ SeatLedger  CatalogService  FeedbackService  Reminders   │  seatledger-core
//! └──────────────────────────────────────────────────────────┘
//!        │                                   │
//!        ▼                                   ▼
//! ┌──────────────┐  LISTEN/NOTIFY  ┌─────────────────┐
//! │ PostgresStore│ ──────────────▶ │ PostgresChange- │ ──▶ /api/ws/events
//! └──────────────┘                 │ Feed            │
//!                                  └─────────────────┘
//! ```
//!
//! Side effects leave through [`notifier::HttpNotifier`] (confirmation and
//! reminder emails) and [`blob::LocalBlobStore`] (cover images).

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod auth;
pub mod blob;
pub mod config;
pub mod metrics;
pub mod notifier;
pub mod server;

pub use config::Config;
