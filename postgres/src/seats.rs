//! Seat accounting transactions.
//!
//! Each operation is one transaction that starts by locking the event row
//! (`SELECT … FOR UPDATE`). Under READ COMMITTED this serializes every seat
//! mutation of one event while leaving other events untouched:
//!
//! ```text
//! Session A: SELECT … FOR UPDATE   (acquires lock, available = 1)
//! Session B: SELECT … FOR UPDATE   (blocks)
//! Session A: INSERT registration, available = 0, COMMIT
//! Session B: SELECT completes, reads available = 0 → SoldOut
//! ```

use crate::rows::{AvailabilityRow, RegistrationRow, seats_param};
use crate::{PostgresStore, db_error, is_unique_violation};
use chrono::{DateTime, Utc};
use seatledger_core::error::StoreError;
use seatledger_core::store::{
    ClaimOutcome, ClaimRequest, ReleaseOutcome, ResizeOutcome, SeatStore, StoreFuture,
};
use seatledger_core::types::{Availability, EventId, Registration, RegistrationId, UserId};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Lock an event row, returning its seat counts and start time.
async fn lock_event(
    tx: &mut Transaction<'_, Postgres>,
    event_id: EventId,
) -> Result<Option<(i32, i32, DateTime<Utc>)>, StoreError> {
    sqlx::query_as::<_, (i32, i32, DateTime<Utc>)>(
        "SELECT total_seats, available_seats, event_date FROM events WHERE id = $1 FOR UPDATE",
    )
    .bind(event_id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(db_error("Failed to lock event"))
}

async fn active_registrations(
    tx: &mut Transaction<'_, Postgres>,
    event_id: EventId,
) -> Result<i64, StoreError> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM registrations WHERE event_id = $1 AND status = 'confirmed'",
    )
    .bind(event_id.as_uuid())
    .fetch_one(&mut **tx)
    .await
    .map_err(db_error("Failed to count registrations"))
}

async fn rollback(tx: Transaction<'_, Postgres>) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(error = %e, "Rollback failed; connection will be discarded");
    }
}

impl PostgresStore {
    async fn claim(&self, request: ClaimRequest) -> Result<ClaimOutcome, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;

        // Step 1: lock the event row
        let Some((_, available, event_date)) = lock_event(&mut tx, request.event_id).await? else {
            rollback(tx).await;
            return Ok(ClaimOutcome::EventMissing);
        };
        if event_date <= request.now {
            rollback(tx).await;
            return Ok(ClaimOutcome::EventStarted);
        }

        // Step 2: duplicate check, ahead of the seat check so the caller
        // learns they are already in even when the event is full
        let duplicate = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM registrations \
             WHERE event_id = $1 AND user_id = $2 AND status = 'confirmed')",
        )
        .bind(request.event_id.as_uuid())
        .bind(request.user_id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to check registration"))?;
        if duplicate {
            rollback(tx).await;
            return Ok(ClaimOutcome::AlreadyRegistered);
        }
        if available <= 0 {
            rollback(tx).await;
            return Ok(ClaimOutcome::SoldOut);
        }

        // Step 3: insert, guarded by the partial unique index
        let inserted = sqlx::query_as::<_, RegistrationRow>(
            "INSERT INTO registrations (id, event_id, user_id, registration_date, status) \
             VALUES ($1, $2, $3, $4, 'confirmed') \
             RETURNING id, event_id, user_id, registration_date, status",
        )
        .bind(request.registration_id.as_uuid())
        .bind(request.event_id.as_uuid())
        .bind(request.user_id.as_uuid())
        .bind(request.now)
        .fetch_one(&mut *tx)
        .await;
        let row = match inserted {
            Ok(row) => row,
            Err(e) if is_unique_violation(&e) => {
                rollback(tx).await;
                return Ok(ClaimOutcome::AlreadyRegistered);
            }
            Err(e) => return Err(db_error("Failed to insert registration")(e)),
        };

        // Step 4: conditional decrement
        let decremented = sqlx::query(
            "UPDATE events SET available_seats = available_seats - 1 \
             WHERE id = $1 AND available_seats > 0",
        )
        .bind(request.event_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to decrement seats"))?;
        if decremented.rows_affected() != 1 {
            rollback(tx).await;
            return Ok(ClaimOutcome::SoldOut);
        }

        // Step 5: attendance survives a later cancel
        sqlx::query(
            "INSERT INTO attendance (event_id, user_id, first_registered_at) \
             VALUES ($1, $2, $3) ON CONFLICT (event_id, user_id) DO NOTHING",
        )
        .bind(request.event_id.as_uuid())
        .bind(request.user_id.as_uuid())
        .bind(request.now)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to record attendance"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit claim"))?;
        Ok(ClaimOutcome::Claimed(Registration::try_from(row)?))
    }

    async fn release(
        &self,
        registration_id: RegistrationId,
        user_id: UserId,
    ) -> Result<ReleaseOutcome, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;

        let owner = sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT event_id, user_id FROM registrations WHERE id = $1",
        )
        .bind(registration_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to read registration"))?;
        let Some((event_id, owner_id)) = owner else {
            rollback(tx).await;
            return Ok(ReleaseOutcome::Missing);
        };
        if owner_id != *user_id.as_uuid() {
            rollback(tx).await;
            return Ok(ReleaseOutcome::NotOwner);
        }

        // Event row first, then the registration row
        let event_id = EventId::from_uuid(event_id);
        lock_event(&mut tx, event_id).await?;

        let deleted = sqlx::query_as::<_, RegistrationRow>(
            "DELETE FROM registrations WHERE id = $1 \
             RETURNING id, event_id, user_id, registration_date, status",
        )
        .bind(registration_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to delete registration"))?;
        let Some(row) = deleted else {
            // A concurrent cancel got here first
            rollback(tx).await;
            return Ok(ReleaseOutcome::Missing);
        };

        sqlx::query(
            "UPDATE events SET available_seats = LEAST(available_seats + 1, total_seats) \
             WHERE id = $1",
        )
        .bind(event_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to increment seats"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit release"))?;
        Ok(ReleaseOutcome::Released(Registration::try_from(row)?))
    }

    async fn resize_event(
        &self,
        event_id: EventId,
        new_total: u32,
    ) -> Result<ResizeOutcome, StoreError> {
        let new_total_param = seats_param(new_total)?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;

        if lock_event(&mut tx, event_id).await?.is_none() {
            rollback(tx).await;
            return Ok(ResizeOutcome::EventMissing);
        }
        let active = active_registrations(&mut tx, event_id).await?;
        if i64::from(new_total_param) < active {
            rollback(tx).await;
            return Ok(ResizeOutcome::BelowDemand {
                active: u32::try_from(active).unwrap_or(u32::MAX),
            });
        }

        let row = sqlx::query_as::<_, AvailabilityRow>(
            "UPDATE events SET total_seats = $2, available_seats = $2 - $3::INTEGER \
             WHERE id = $1 RETURNING id, total_seats, available_seats",
        )
        .bind(event_id.as_uuid())
        .bind(new_total_param)
        .bind(i32::try_from(active).unwrap_or(i32::MAX))
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to resize event"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit resize"))?;
        Ok(ResizeOutcome::Resized(Availability::try_from(row)?))
    }

    async fn reconcile_event(&self, event_id: EventId) -> Result<Option<Availability>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;

        if lock_event(&mut tx, event_id).await?.is_none() {
            rollback(tx).await;
            return Ok(None);
        }
        let row = sqlx::query_as::<_, AvailabilityRow>(
            "UPDATE events SET available_seats = GREATEST(total_seats - ( \
                 SELECT COUNT(*) FROM registrations \
                 WHERE event_id = $1 AND status = 'confirmed')::INTEGER, 0) \
             WHERE id = $1 RETURNING id, total_seats, available_seats",
        )
        .bind(event_id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to reconcile event"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit reconcile"))?;
        Ok(Some(Availability::try_from(row)?))
    }
}

impl SeatStore for PostgresStore {
    fn claim_seat(&self, request: ClaimRequest) -> StoreFuture<'_, ClaimOutcome> {
        Box::pin(self.claim(request))
    }

    fn release_seat(
        &self,
        registration_id: RegistrationId,
        user_id: UserId,
    ) -> StoreFuture<'_, ReleaseOutcome> {
        Box::pin(self.release(registration_id, user_id))
    }

    fn resize(&self, event_id: EventId, new_total: u32) -> StoreFuture<'_, ResizeOutcome> {
        Box::pin(self.resize_event(event_id, new_total))
    }

    fn availability(&self, event_id: EventId) -> StoreFuture<'_, Option<Availability>> {
        Box::pin(async move {
            sqlx::query_as::<_, AvailabilityRow>(
                "SELECT id, total_seats, available_seats FROM events WHERE id = $1",
            )
            .bind(event_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to read availability"))?
            .map(Availability::try_from)
            .transpose()
        })
    }

    fn reconcile(&self, event_id: EventId) -> StoreFuture<'_, Option<Availability>> {
        Box::pin(self.reconcile_event(event_id))
    }
}
