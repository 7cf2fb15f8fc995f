//! Catalog, registration, feedback and profile queries.

use crate::rows::{
    EVENT_COLUMNS, EventRow, FeedbackRow, ProfileRow, RegistrationEventRow, RegistrationRow,
    seats_param,
};
use crate::{PostgresStore, db_error};
use seatledger_core::store::{
    CatalogStore, FeedbackOutcome, FeedbackStore, ProfileStore, RegistrationStore, StoreFuture,
};
use seatledger_core::types::{
    Event, EventId, EventOrder, EventPatch, EventQuery, Feedback, Profile, Registration,
    RegistrationWithEvent, SearchFields, UserId,
};
use sqlx::{Postgres, QueryBuilder};

/// Escape `LIKE` metacharacters and wrap in `%…%`.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn list_events_query(query: &EventQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {EVENT_COLUMNS} FROM events WHERE TRUE"));
    if let Some(from) = query.starting_from {
        builder.push(" AND event_date >= ").push_bind(from);
    }
    if let Some(until) = query.starting_until {
        builder.push(" AND event_date <= ").push_bind(until);
    }
    if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = like_pattern(term);
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR location ILIKE ")
            .push_bind(pattern.clone());
        if query.search_fields == SearchFields::All {
            builder.push(" OR description ILIKE ").push_bind(pattern);
        }
        builder.push(")");
    }
    builder.push(match query.order {
        EventOrder::DateAscending => " ORDER BY event_date ASC",
        EventOrder::DateDescending => " ORDER BY event_date DESC",
    });
    builder
}

impl CatalogStore for PostgresStore {
    fn insert_event(&self, event: Event) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            let row = sqlx::query_as::<_, EventRow>(&format!(
                "INSERT INTO events ({EVENT_COLUMNS}) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
                 RETURNING {EVENT_COLUMNS}"
            ))
            .bind(event.id.as_uuid())
            .bind(&event.title)
            .bind(&event.description)
            .bind(&event.location)
            .bind(event.event_date)
            .bind(event.created_at)
            .bind(seats_param(event.total_seats)?)
            .bind(seats_param(event.available_seats)?)
            .bind(event.image_url.as_deref())
            .bind(event.creator_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to insert event"))?;
            Event::try_from(row)
        })
    }

    fn get_event(&self, event_id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            sqlx::query_as::<_, EventRow>(&format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
            ))
            .bind(event_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get event"))?
            .map(Event::try_from)
            .transpose()
        })
    }

    fn update_event(
        &self,
        event_id: EventId,
        patch: EventPatch,
    ) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            let (set_image, image_url) = match patch.image_url {
                Some(url) => (true, url),
                None => (false, None),
            };
            sqlx::query_as::<_, EventRow>(&format!(
                "UPDATE events SET \
                     title = COALESCE($2, title), \
                     description = COALESCE($3, description), \
                     location = COALESCE($4, location), \
                     event_date = COALESCE($5, event_date), \
                     image_url = CASE WHEN $6 THEN $7 ELSE image_url END \
                 WHERE id = $1 \
                 RETURNING {EVENT_COLUMNS}"
            ))
            .bind(event_id.as_uuid())
            .bind(patch.title)
            .bind(patch.description)
            .bind(patch.location)
            .bind(patch.event_date)
            .bind(set_image)
            .bind(image_url)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to update event"))?
            .map(Event::try_from)
            .transpose()
        })
    }

    fn delete_event(&self, event_id: EventId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            // Registrations and feedback go with it (ON DELETE CASCADE)
            let result = sqlx::query("DELETE FROM events WHERE id = $1")
                .bind(event_id.as_uuid())
                .execute(&self.pool)
                .await
                .map_err(db_error("Failed to delete event"))?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn list_events(&self, query: EventQuery) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            list_events_query(&query)
                .build_query_as::<EventRow>()
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("Failed to list events"))?
                .into_iter()
                .map(Event::try_from)
                .collect()
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(db_error("Ping failed"))?;
            Ok(())
        })
    }
}

impl RegistrationStore for PostgresStore {
    fn find_registration(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> StoreFuture<'_, Option<Registration>> {
        Box::pin(async move {
            sqlx::query_as::<_, RegistrationRow>(
                "SELECT id, event_id, user_id, registration_date, status FROM registrations \
                 WHERE event_id = $1 AND user_id = $2 AND status = 'confirmed'",
            )
            .bind(event_id.as_uuid())
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find registration"))?
            .map(Registration::try_from)
            .transpose()
        })
    }

    fn registrations_for_user(
        &self,
        user_id: UserId,
    ) -> StoreFuture<'_, Vec<RegistrationWithEvent>> {
        Box::pin(async move {
            sqlx::query_as::<_, RegistrationEventRow>(
                "SELECT r.id AS registration_id, r.user_id AS registration_user_id, \
                        r.registration_date, r.status AS registration_status, \
                        e.id, e.title, e.description, e.location, e.event_date, e.created_at, \
                        e.total_seats, e.available_seats, e.image_url, e.creator_id \
                 FROM registrations r JOIN events e ON e.id = r.event_id \
                 WHERE r.user_id = $1 \
                 ORDER BY r.registration_date DESC",
            )
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list user registrations"))?
            .into_iter()
            .map(RegistrationWithEvent::try_from)
            .collect()
        })
    }

    fn registrations_for_event(&self, event_id: EventId) -> StoreFuture<'_, Vec<Registration>> {
        Box::pin(async move {
            sqlx::query_as::<_, RegistrationRow>(
                "SELECT id, event_id, user_id, registration_date, status FROM registrations \
                 WHERE event_id = $1 ORDER BY registration_date ASC",
            )
            .bind(event_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list event registrations"))?
            .into_iter()
            .map(Registration::try_from)
            .collect()
        })
    }

    fn has_attended(&self, event_id: EventId, user_id: UserId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM attendance WHERE event_id = $1 AND user_id = $2)",
            )
            .bind(event_id.as_uuid())
            .bind(user_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to check attendance"))
        })
    }
}

/// Feedback row plus whether the upsert inserted it.
#[derive(Debug, sqlx::FromRow)]
struct UpsertedFeedbackRow {
    #[sqlx(flatten)]
    feedback: FeedbackRow,
    inserted: bool,
}

impl FeedbackStore for PostgresStore {
    fn upsert_feedback(&self, feedback: Feedback) -> StoreFuture<'_, FeedbackOutcome> {
        Box::pin(async move {
            // xmax = 0 only for a freshly inserted tuple
            let row = sqlx::query_as::<_, UpsertedFeedbackRow>(
                "INSERT INTO feedback (id, event_id, user_id, rating, comment, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 ON CONFLICT (event_id, user_id) \
                 DO UPDATE SET rating = EXCLUDED.rating, comment = EXCLUDED.comment \
                 RETURNING id, event_id, user_id, rating, comment, created_at, \
                           (xmax = 0) AS inserted",
            )
            .bind(feedback.id.as_uuid())
            .bind(feedback.event_id.as_uuid())
            .bind(feedback.user_id.as_uuid())
            .bind(i16::from(feedback.rating.value()))
            .bind(&feedback.comment)
            .bind(feedback.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to upsert feedback"))?;

            let stored = Feedback::try_from(row.feedback)?;
            Ok(if row.inserted {
                FeedbackOutcome::Created(stored)
            } else {
                FeedbackOutcome::Updated(stored)
            })
        })
    }

    fn find_feedback(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> StoreFuture<'_, Option<Feedback>> {
        Box::pin(async move {
            sqlx::query_as::<_, FeedbackRow>(
                "SELECT id, event_id, user_id, rating, comment, created_at FROM feedback \
                 WHERE event_id = $1 AND user_id = $2",
            )
            .bind(event_id.as_uuid())
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find feedback"))?
            .map(Feedback::try_from)
            .transpose()
        })
    }

    fn feedback_for_event(&self, event_id: EventId) -> StoreFuture<'_, Vec<Feedback>> {
        Box::pin(async move {
            sqlx::query_as::<_, FeedbackRow>(
                "SELECT id, event_id, user_id, rating, comment, created_at FROM feedback \
                 WHERE event_id = $1 ORDER BY created_at DESC",
            )
            .bind(event_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list feedback"))?
            .into_iter()
            .map(Feedback::try_from)
            .collect()
        })
    }
}

impl ProfileStore for PostgresStore {
    fn get_profile(&self, user_id: UserId) -> StoreFuture<'_, Option<Profile>> {
        Box::pin(async move {
            let row = sqlx::query_as::<_, ProfileRow>(
                "SELECT id, email, full_name, role, created_at FROM profiles WHERE id = $1",
            )
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get profile"))?;
            Ok(row.map(Profile::from))
        })
    }

    fn upsert_profile(&self, profile: Profile) -> StoreFuture<'_, Profile> {
        Box::pin(async move {
            let row = sqlx::query_as::<_, ProfileRow>(
                "INSERT INTO profiles (id, email, full_name, role, created_at) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (id) DO UPDATE SET \
                     email = EXCLUDED.email, full_name = EXCLUDED.full_name \
                 RETURNING id, email, full_name, role, created_at",
            )
            .bind(profile.id.as_uuid())
            .bind(&profile.email)
            .bind(&profile.full_name)
            .bind(profile.role.as_str())
            .bind(profile.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to upsert profile"))?;
            Ok(Profile::from(row))
        })
    }
}
