//! Post-event feedback.
//!
//! Feedback opens once an event has started and is limited to users who
//! registered for it, including those who later cancelled. One row per (event, user); resubmitting replaces the
//! rating and comment.

use crate::catalog::require_admin;
use crate::environment::Clock;
use crate::error::{LedgerError, Result};
use crate::store::{CatalogStore, FeedbackOutcome, FeedbackStore, RegistrationStore};
use crate::types::{Actor, EventId, Feedback, FeedbackId, Rating};
use std::sync::Arc;

/// Longest accepted comment, in characters.
pub const MAX_COMMENT_CHARS: usize = 2000;

/// Feedback service.
#[derive(Clone)]
pub struct FeedbackService {
    events: Arc<dyn CatalogStore>,
    registrations: Arc<dyn RegistrationStore>,
    feedback: Arc<dyn FeedbackStore>,
    clock: Arc<dyn Clock>,
}

impl FeedbackService {
    /// Create a feedback service.
    #[must_use]
    pub fn new(
        events: Arc<dyn CatalogStore>,
        registrations: Arc<dyn RegistrationStore>,
        feedback: Arc<dyn FeedbackStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events,
            registrations,
            feedback,
            clock,
        }
    }

    /// Leave or replace feedback for an event.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Invalid`] for a rating outside 1..=5 or an oversized comment
    /// - [`LedgerError::EventNotFound`]
    /// - [`LedgerError::EventNotFinished`] before the event starts
    /// - [`LedgerError::NotRegistered`] if the caller never registered
    /// - [`LedgerError::Unavailable`]
    #[tracing::instrument(skip(self, comment), fields(user_id = %actor.user_id))]
    pub async fn submit_feedback(
        &self,
        actor: &Actor,
        event_id: EventId,
        rating: u8,
        comment: String,
    ) -> Result<FeedbackOutcome> {
        let rating = Rating::try_from(rating).map_err(LedgerError::Invalid)?;
        if comment.chars().count() > MAX_COMMENT_CHARS {
            return Err(LedgerError::Invalid(format!(
                "comment must be at most {MAX_COMMENT_CHARS} characters"
            )));
        }

        let now = self.clock.now();
        let event = self
            .events
            .get_event(event_id)
            .await?
            .ok_or(LedgerError::EventNotFound(event_id))?;
        if !event.has_started(now) {
            return Err(LedgerError::EventNotFinished(event_id));
        }
        if !self
            .registrations
            .has_attended(event_id, actor.user_id)
            .await?
        {
            return Err(LedgerError::NotRegistered {
                event_id,
                user_id: actor.user_id,
            });
        }

        let outcome = self
            .feedback
            .upsert_feedback(Feedback {
                id: FeedbackId::new(),
                event_id,
                user_id: actor.user_id,
                rating,
                comment: comment.trim().to_string(),
                created_at: now,
            })
            .await?;

        let label = match outcome {
            FeedbackOutcome::Created(_) => "created",
            FeedbackOutcome::Updated(_) => "updated",
        };
        tracing::info!(rating = rating.value(), outcome = label, "Feedback stored");
        metrics::counter!("seatledger_feedback_total", "outcome" => label).increment(1);
        Ok(outcome)
    }

    /// The caller's feedback for an event, if any.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unavailable`] if the store fails.
    pub async fn my_feedback(&self, actor: &Actor, event_id: EventId) -> Result<Option<Feedback>> {
        Ok(self.feedback.find_feedback(event_id, actor.user_id).await?)
    }

    /// Every feedback entry for an event, newest first (admin only).
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AdminOnly`]
    /// - [`LedgerError::EventNotFound`]
    /// - [`LedgerError::Unavailable`]
    pub async fn event_feedback(&self, actor: &Actor, event_id: EventId) -> Result<Vec<Feedback>> {
        require_admin(actor)?;
        if self.events.get_event(event_id).await?.is_none() {
            return Err(LedgerError::EventNotFound(event_id));
        }
        Ok(self.feedback.feedback_for_event(event_id).await?)
    }
}
