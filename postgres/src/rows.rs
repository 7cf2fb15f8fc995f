//! Row types and their conversion into domain types.

use chrono::{DateTime, Utc};
use seatledger_core::error::StoreError;
use seatledger_core::types::{
    Availability, Event, EventId, Feedback, FeedbackId, Profile, Rating, Registration,
    RegistrationId, RegistrationStatus, RegistrationWithEvent, Role, UserId,
};
use uuid::Uuid;

/// Columns selected for an event, in [`EventRow`] order.
pub(crate) const EVENT_COLUMNS: &str = "id, title, description, location, event_date, created_at, \
     total_seats, available_seats, image_url, creator_id";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EventRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub event_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub total_seats: i32,
    pub available_seats: i32,
    pub image_url: Option<String>,
    pub creator_id: Uuid,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: EventId::from_uuid(row.id),
            title: row.title,
            description: row.description,
            location: row.location,
            event_date: row.event_date,
            created_at: row.created_at,
            total_seats: seats(row.total_seats, row.id)?,
            available_seats: seats(row.available_seats, row.id)?,
            image_url: row.image_url,
            creator_id: UserId::from_uuid(row.creator_id),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AvailabilityRow {
    pub id: Uuid,
    pub total_seats: i32,
    pub available_seats: i32,
}

impl TryFrom<AvailabilityRow> for Availability {
    type Error = StoreError;

    fn try_from(row: AvailabilityRow) -> Result<Self, Self::Error> {
        Ok(Self {
            event_id: EventId::from_uuid(row.id),
            total_seats: seats(row.total_seats, row.id)?,
            available_seats: seats(row.available_seats, row.id)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RegistrationRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub registration_date: DateTime<Utc>,
    pub status: String,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = StoreError;

    fn try_from(row: RegistrationRow) -> Result<Self, Self::Error> {
        let status = match row.status.as_str() {
            "confirmed" => RegistrationStatus::Confirmed,
            other => {
                return Err(StoreError::Corrupt(format!(
                    "registration {} has unknown status {other}",
                    row.id
                )));
            }
        };
        Ok(Self {
            id: RegistrationId::from_uuid(row.id),
            event_id: EventId::from_uuid(row.event_id),
            user_id: UserId::from_uuid(row.user_id),
            registered_at: row.registration_date,
            status,
        })
    }
}

/// A registration joined with its event.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RegistrationEventRow {
    pub registration_id: Uuid,
    pub registration_user_id: Uuid,
    pub registration_date: DateTime<Utc>,
    pub registration_status: String,
    #[sqlx(flatten)]
    pub event: EventRow,
}

impl TryFrom<RegistrationEventRow> for RegistrationWithEvent {
    type Error = StoreError;

    fn try_from(row: RegistrationEventRow) -> Result<Self, Self::Error> {
        let registration = Registration::try_from(RegistrationRow {
            id: row.registration_id,
            event_id: row.event.id,
            user_id: row.registration_user_id,
            registration_date: row.registration_date,
            status: row.registration_status,
        })?;
        Ok(Self {
            registration,
            event: Event::try_from(row.event)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FeedbackRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<FeedbackRow> for Feedback {
    type Error = StoreError;

    fn try_from(row: FeedbackRow) -> Result<Self, Self::Error> {
        let rating = u8::try_from(row.rating)
            .ok()
            .and_then(Rating::new)
            .ok_or_else(|| {
                StoreError::Corrupt(format!("feedback {} has rating {}", row.id, row.rating))
            })?;
        Ok(Self {
            id: FeedbackId::from_uuid(row.id),
            event_id: EventId::from_uuid(row.event_id),
            user_id: UserId::from_uuid(row.user_id),
            rating,
            comment: row.comment,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProfileRow {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: UserId::from_uuid(row.id),
            email: row.email,
            full_name: row.full_name,
            role: Role::parse(&row.role),
            created_at: row.created_at,
        }
    }
}

fn seats(value: i32, event_id: Uuid) -> Result<u32, StoreError> {
    u32::try_from(value)
        .map_err(|_| StoreError::Corrupt(format!("event {event_id} has seat count {value}")))
}

/// Convert a seat count for binding.
pub(crate) fn seats_param(value: u32) -> Result<i32, StoreError> {
    i32::try_from(value)
        .map_err(|_| StoreError::Corrupt(format!("seat count {value} exceeds i32::MAX")))
}
