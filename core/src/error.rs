//! Error taxonomy for ledger and catalog operations.
//!
//! Every failure the caller can observe is a [`LedgerError`]. Variants are
//! specific (sold out vs. already registered vs. not found) and each one
//! belongs to exactly one [`ErrorKind`], which is what transports such as HTTP
//! map onto status codes.

use crate::types::{EventId, RegistrationId, UserId};
use thiserror::Error;

/// Coarse classification of a [`LedgerError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The referenced event, registration or profile does not exist
    NotFound,
    /// The request conflicts with current state
    Conflict,
    /// The caller may not perform the operation
    Forbidden,
    /// The request itself is malformed
    Invalid,
    /// The persistence service could not be reached or failed
    Unavailable,
}

/// Errors surfaced by seat ledger, catalog and feedback operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// No event with this id
    #[error("Event {0} not found")]
    EventNotFound(EventId),

    /// No registration with this id (or it was already cancelled)
    #[error("Registration {0} not found")]
    RegistrationNotFound(RegistrationId),

    /// No profile for this user
    #[error("Profile for user {0} not found")]
    ProfileNotFound(UserId),

    /// Registration is closed because the event has started
    #[error("Event {0} has already started")]
    EventAlreadyStarted(EventId),

    /// Feedback opens only once the event has started
    #[error("Event {0} has not taken place yet")]
    EventNotFinished(EventId),

    /// The user already holds an active registration for this event
    #[error("User {user_id} is already registered for event {event_id}")]
    AlreadyRegistered {
        /// Event in question
        event_id: EventId,
        /// User in question
        user_id: UserId,
    },

    /// No seat left
    #[error("Event {0} is sold out")]
    SoldOut(EventId),

    /// Capacity may not drop below the number of confirmed registrations
    #[error("Cannot set capacity to {requested}: {active} seats are already taken")]
    CapacityBelowDemand {
        /// Capacity the admin asked for
        requested: u32,
        /// Confirmed registrations at the time of the request
        active: u32,
    },

    /// The registration belongs to someone else
    #[error("Registration {0} belongs to another user")]
    NotOwner(RegistrationId),

    /// Operation restricted to admins
    #[error("Operation requires the admin role")]
    AdminOnly,

    /// Feedback requires a registration for the event
    #[error("User {user_id} holds no registration for event {event_id}")]
    NotRegistered {
        /// Event in question
        event_id: EventId,
        /// User in question
        user_id: UserId,
    },

    /// Input failed validation
    #[error("Invalid request: {0}")]
    Invalid(String),

    /// Persistence service failure
    #[error("Persistence unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    /// Classification used by transports.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EventNotFound(_) | Self::RegistrationNotFound(_) | Self::ProfileNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::EventAlreadyStarted(_)
            | Self::EventNotFinished(_)
            | Self::AlreadyRegistered { .. }
            | Self::SoldOut(_)
            | Self::CapacityBelowDemand { .. } => ErrorKind::Conflict,
            Self::NotOwner(_) | Self::AdminOnly | Self::NotRegistered { .. } => {
                ErrorKind::Forbidden
            }
            Self::Invalid(_) => ErrorKind::Invalid,
            Self::Unavailable(_) => ErrorKind::Unavailable,
        }
    }

    /// Stable machine-readable code for clients.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EventNotFound(_) => "EVENT_NOT_FOUND",
            Self::RegistrationNotFound(_) => "REGISTRATION_NOT_FOUND",
            Self::ProfileNotFound(_) => "PROFILE_NOT_FOUND",
            Self::EventAlreadyStarted(_) => "EVENT_ALREADY_STARTED",
            Self::EventNotFinished(_) => "EVENT_NOT_FINISHED",
            Self::AlreadyRegistered { .. } => "ALREADY_REGISTERED",
            Self::SoldOut(_) => "SOLD_OUT",
            Self::CapacityBelowDemand { .. } => "CAPACITY_BELOW_DEMAND",
            Self::NotOwner(_) => "NOT_OWNER",
            Self::AdminOnly => "ADMIN_ONLY",
            Self::NotRegistered { .. } => "NOT_REGISTERED",
            Self::Invalid(_) => "VALIDATION_ERROR",
            Self::Unavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Whether a caller may retry the same request unchanged.
    ///
    /// Only infrastructure failures qualify. Register must still check for an
    /// existing registration before re-issuing.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Failures reported by a persistence backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connection, timeout or query failure
    #[error("Database error: {0}")]
    Unavailable(String),

    /// A stored row could not be turned back into a domain value
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Result alias for service operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_kinds() {
        let event_id = EventId::new();
        assert_eq!(LedgerError::SoldOut(event_id).kind(), ErrorKind::Conflict);
        assert_eq!(
            LedgerError::CapacityBelowDemand {
                requested: 1,
                active: 2
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            LedgerError::AlreadyRegistered {
                event_id,
                user_id: UserId::new()
            }
            .code(),
            "ALREADY_REGISTERED"
        );
    }

    #[test]
    fn ownership_is_forbidden() {
        let err = LedgerError::NotOwner(RegistrationId::new());
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert!(!err.is_retryable());
    }

    #[test]
    fn store_errors_become_unavailable() {
        let err: LedgerError = StoreError::Unavailable("connection reset".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "Persistence unavailable: Database error: connection reset"
        );
    }
}
