//! Application state for the eventhub HTTP server.
//!
//! Holds the services every handler works through. Cloned per request; all
//! fields are shared behind `Arc`.

use crate::auth::jwt::JwtVerifier;
use axum::extract::FromRef;
use seatledger_core::blob::BlobStore;
use seatledger_core::environment::Clock;
use seatledger_core::feed::ChangeFeed;
use seatledger_core::notifier::Notifier;
use seatledger_core::store::{
    CatalogStore, FeedbackStore, ProfileStore, RegistrationStore, SeatStore,
};
use seatledger_core::{CatalogService, FeedbackService, ReminderService, SeatLedger};
use std::sync::Arc;

/// Everything the state needs besides the store itself.
pub struct Integrations {
    /// Source of live event changes
    pub feed: Arc<dyn ChangeFeed>,
    /// Email function client
    pub notifier: Arc<dyn Notifier>,
    /// Image storage
    pub blobs: Arc<dyn BlobStore>,
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Access token verification
    pub jwt: Arc<JwtVerifier>,
    /// Reminder look-ahead when the request names none
    pub reminder_window: chrono::Duration,
    /// Largest accepted image upload
    pub max_upload_bytes: usize,
}

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Seat accounting
    pub ledger: Arc<SeatLedger>,
    /// Event catalog and "my events"
    pub catalog: Arc<CatalogService>,
    /// Post-event feedback
    pub feedback: Arc<FeedbackService>,
    /// Reminder dispatch
    pub reminders: Arc<ReminderService>,
    /// Profiles, for role lookup
    pub profiles: Arc<dyn ProfileStore>,
    /// Catalog store, for readiness probes
    pub events: Arc<dyn CatalogStore>,
    /// Source of live event changes
    pub feed: Arc<dyn ChangeFeed>,
    /// Image storage
    pub blobs: Arc<dyn BlobStore>,
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Access token verification
    pub jwt: Arc<JwtVerifier>,
    /// Default reminder look-ahead
    pub reminder_window: chrono::Duration,
    /// Largest accepted image upload
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Wire every service onto one store.
    #[must_use]
    pub fn new<S>(store: Arc<S>, integrations: Integrations) -> Self
    where
        S: SeatStore + CatalogStore + RegistrationStore + FeedbackStore + ProfileStore + 'static,
    {
        let Integrations {
            feed,
            notifier,
            blobs,
            clock,
            jwt,
            reminder_window,
            max_upload_bytes,
        } = integrations;

        let seats: Arc<dyn SeatStore> = store.clone();
        let events: Arc<dyn CatalogStore> = store.clone();
        let registrations: Arc<dyn RegistrationStore> = store.clone();
        let feedback: Arc<dyn FeedbackStore> = store.clone();
        let profiles: Arc<dyn ProfileStore> = store;

        Self {
            ledger: Arc::new(SeatLedger::new(
                seats,
                Arc::clone(&clock),
                Arc::clone(&notifier),
            )),
            catalog: Arc::new(CatalogService::new(
                Arc::clone(&events),
                Arc::clone(&registrations),
                Arc::clone(&clock),
            )),
            feedback: Arc::new(FeedbackService::new(
                Arc::clone(&events),
                Arc::clone(&registrations),
                feedback,
                Arc::clone(&clock),
            )),
            reminders: Arc::new(ReminderService::new(
                Arc::clone(&events),
                registrations,
                notifier,
                Arc::clone(&clock),
            )),
            profiles,
            events,
            feed,
            blobs,
            clock,
            jwt,
            reminder_window,
            max_upload_bytes,
        }
    }
}

// Lets the shared readiness handler extract the catalog store
impl FromRef<AppState> for Arc<dyn CatalogStore> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.events)
    }
}
