//! Event catalog and attendee listings.
//!
//! Admins create, edit and delete events here. Seat counts are initialised on
//! creation and never written again by this service; capacity changes go
//! through [`SeatLedger::adjust_capacity`](crate::ledger::SeatLedger::adjust_capacity).

use crate::environment::Clock;
use crate::error::{LedgerError, Result};
use crate::store::{CatalogStore, RegistrationStore};
use crate::types::{
    Actor, Event, EventId, EventOrder, EventPatch, EventQuery, NewEvent, RegistrationFilter,
    RegistrationWithEvent, SearchFields,
};
use std::sync::Arc;

/// Admin-managed event catalog.
#[derive(Clone)]
pub struct CatalogService {
    events: Arc<dyn CatalogStore>,
    registrations: Arc<dyn RegistrationStore>,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    /// Create a catalog service.
    #[must_use]
    pub fn new(
        events: Arc<dyn CatalogStore>,
        registrations: Arc<dyn RegistrationStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events,
            registrations,
            clock,
        }
    }

    /// Create an event with every seat available.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AdminOnly`]
    /// - [`LedgerError::Invalid`] for a blank title or zero seats
    /// - [`LedgerError::Unavailable`]
    #[tracing::instrument(skip(self, new_event), fields(user_id = %actor.user_id, title = %new_event.title))]
    pub async fn create_event(&self, actor: &Actor, new_event: NewEvent) -> Result<Event> {
        require_admin(actor)?;
        if new_event.title.trim().is_empty() {
            return Err(LedgerError::Invalid("title must not be empty".to_string()));
        }
        if new_event.total_seats == 0 {
            return Err(LedgerError::Invalid(
                "total seats must be greater than 0".to_string(),
            ));
        }

        let event = Event {
            id: EventId::new(),
            title: new_event.title.trim().to_string(),
            description: new_event.description,
            location: new_event.location,
            event_date: new_event.event_date,
            created_at: self.clock.now(),
            total_seats: new_event.total_seats,
            available_seats: new_event.total_seats,
            image_url: new_event.image_url,
            creator_id: actor.user_id,
        };
        let event = self.events.insert_event(event).await?;
        tracing::info!(event_id = %event.id, "Event created");
        Ok(event)
    }

    /// Edit the descriptive fields of an event.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AdminOnly`]
    /// - [`LedgerError::Invalid`] for a blank title
    /// - [`LedgerError::EventNotFound`]
    /// - [`LedgerError::Unavailable`]
    #[tracing::instrument(skip(self, patch), fields(user_id = %actor.user_id))]
    pub async fn update_event(
        &self,
        actor: &Actor,
        event_id: EventId,
        mut patch: EventPatch,
    ) -> Result<Event> {
        require_admin(actor)?;
        if let Some(title) = patch.title.as_mut() {
            let trimmed = title.trim();
            if trimmed.is_empty() {
                return Err(LedgerError::Invalid("title must not be empty".to_string()));
            }
            *title = trimmed.to_string();
        }
        if patch.is_empty() {
            return self.get_event(event_id).await;
        }

        self.events
            .update_event(event_id, patch)
            .await?
            .ok_or(LedgerError::EventNotFound(event_id))
    }

    /// Delete an event together with its registrations and feedback.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AdminOnly`]
    /// - [`LedgerError::EventNotFound`]
    /// - [`LedgerError::Unavailable`]
    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn delete_event(&self, actor: &Actor, event_id: EventId) -> Result<()> {
        require_admin(actor)?;
        if self.events.delete_event(event_id).await? {
            tracing::info!("Event deleted");
            Ok(())
        } else {
            Err(LedgerError::EventNotFound(event_id))
        }
    }

    /// Fetch one event.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::EventNotFound`]
    /// - [`LedgerError::Unavailable`]
    pub async fn get_event(&self, event_id: EventId) -> Result<Event> {
        self.events
            .get_event(event_id)
            .await?
            .ok_or(LedgerError::EventNotFound(event_id))
    }

    /// Public listing: upcoming events, soonest first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unavailable`] if the store fails.
    pub async fn browse(&self, search: Option<String>) -> Result<Vec<Event>> {
        let query = EventQuery {
            starting_from: Some(self.clock.now()),
            search,
            search_fields: SearchFields::All,
            order: EventOrder::DateAscending,
            ..EventQuery::default()
        };
        Ok(self.events.list_events(query).await?)
    }

    /// Admin listing: every event, latest first, searched on title and location.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AdminOnly`]
    /// - [`LedgerError::Unavailable`]
    pub async fn manage(&self, actor: &Actor, search: Option<String>) -> Result<Vec<Event>> {
        require_admin(actor)?;
        let query = EventQuery {
            search,
            search_fields: SearchFields::TitleAndLocation,
            order: EventOrder::DateDescending,
            ..EventQuery::default()
        };
        Ok(self.events.list_events(query).await?)
    }

    /// The caller's registrations with their events, newest registration first.
    ///
    /// `search` matches event title or location, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unavailable`] if the store fails.
    pub async fn my_registrations(
        &self,
        actor: &Actor,
        filter: RegistrationFilter,
        search: Option<&str>,
    ) -> Result<Vec<RegistrationWithEvent>> {
        let now = self.clock.now();
        let term = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut rows: Vec<_> = self
            .registrations
            .registrations_for_user(actor.user_id)
            .await?
            .into_iter()
            .filter(|row| match filter {
                RegistrationFilter::All => true,
                RegistrationFilter::Upcoming => !row.event.has_started(now),
                RegistrationFilter::Past => row.event.has_started(now),
            })
            .filter(|row| {
                term.as_ref().is_none_or(|term| {
                    row.event.title.to_lowercase().contains(term)
                        || row.event.location.to_lowercase().contains(term)
                })
            })
            .collect();
        rows.sort_by(|a, b| b.registration.registered_at.cmp(&a.registration.registered_at));
        Ok(rows)
    }
}

/// Reject non-admin callers.
pub(crate) const fn require_admin(actor: &Actor) -> Result<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(LedgerError::AdminOnly)
    }
}
