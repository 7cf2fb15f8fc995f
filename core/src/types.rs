//! Domain types for event registration.
//!
//! Value objects and entities shared by the seat ledger, the catalog and the
//! feedback services. Identifiers are UUID newtypes so an `EventId` can never be
//! passed where a `UserId` is expected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an event
    EventId
);
uuid_id!(
    /// Unique identifier for a registration (one claimed seat)
    RegistrationId
);
uuid_id!(
    /// Unique identifier for a user; mirrors the auth provider's subject
    UserId
);
uuid_id!(
    /// Unique identifier for a feedback entry
    FeedbackId
);

// ============================================================================
// Caller context
// ============================================================================

/// Role held by a profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May create, edit and delete events and adjust capacity
    Admin,
    /// Regular attendee
    #[default]
    Standard,
}

impl Role {
    /// Parse the role column of a profile.
    ///
    /// Only the literal `"admin"` grants admin rights; anything else is a
    /// standard user.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("admin") {
            Self::Admin
        } else {
            Self::Standard
        }
    }

    /// Database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Standard => "user",
        }
    }
}

/// The authenticated caller of an operation.
///
/// Passed explicitly into every mutating operation; services never look up
/// "the current user" from ambient state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Who is calling
    pub user_id: UserId,
    /// What they are allowed to do
    pub role: Role,
}

impl Actor {
    /// A standard (non-admin) caller.
    #[must_use]
    pub const fn standard(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Standard,
        }
    }

    /// An admin caller.
    #[must_use]
    pub const fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    /// Whether the caller holds the admin role.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

// ============================================================================
// Events
// ============================================================================

/// A scheduled activity with a finite number of seats.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event identity
    pub id: EventId,
    /// Title shown in listings
    pub title: String,
    /// Long description
    pub description: String,
    /// Where it takes place
    pub location: String,
    /// When it starts
    pub event_date: DateTime<Utc>,
    /// When the row was created
    pub created_at: DateTime<Utc>,
    /// Seat capacity
    pub total_seats: u32,
    /// Seats not held by a confirmed registration
    pub available_seats: u32,
    /// Public URL of the cover image
    pub image_url: Option<String>,
    /// Admin who created the event
    pub creator_id: UserId,
}

impl Event {
    /// Whether the event has started at `now`.
    #[must_use]
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.event_date <= now
    }

    /// Seats held by confirmed registrations.
    #[must_use]
    pub const fn seats_taken(&self) -> u32 {
        self.total_seats.saturating_sub(self.available_seats)
    }

    /// Current availability snapshot.
    #[must_use]
    pub const fn availability(&self) -> Availability {
        Availability {
            event_id: self.id,
            total_seats: self.total_seats,
            available_seats: self.available_seats,
        }
    }
}

/// Input for creating an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Title shown in listings
    pub title: String,
    /// Long description
    pub description: String,
    /// Where it takes place
    pub location: String,
    /// When it starts
    pub event_date: DateTime<Utc>,
    /// Seat capacity; also the initial availability
    pub total_seats: u32,
    /// Public URL of the cover image
    pub image_url: Option<String>,
}

/// Partial update of an event's descriptive fields.
///
/// Seat counts are deliberately absent: capacity only changes through the
/// ledger's capacity adjustment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPatch {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New location
    pub location: Option<String>,
    /// New start time
    pub event_date: Option<DateTime<Utc>>,
    /// New image URL (`Some(None)` clears it)
    pub image_url: Option<Option<String>>,
}

impl EventPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.event_date.is_none()
            && self.image_url.is_none()
    }

    /// Apply the patch to an event in place.
    pub fn apply_to(&self, event: &mut Event) {
        if let Some(title) = &self.title {
            event.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            event.description.clone_from(description);
        }
        if let Some(location) = &self.location {
            event.location.clone_from(location);
        }
        if let Some(date) = self.event_date {
            event.event_date = date;
        }
        if let Some(image_url) = &self.image_url {
            event.image_url.clone_from(image_url);
        }
    }
}

/// Seat counts of one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    /// Which event
    pub event_id: EventId,
    /// Capacity
    pub total_seats: u32,
    /// Seats not held by a confirmed registration
    pub available_seats: u32,
}

impl Availability {
    /// Seats held by confirmed registrations.
    #[must_use]
    pub const fn taken(&self) -> u32 {
        self.total_seats.saturating_sub(self.available_seats)
    }

    /// Whether no seat is left.
    #[must_use]
    pub const fn is_sold_out(&self) -> bool {
        self.available_seats == 0
    }
}

/// Listing order for event queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EventOrder {
    /// Soonest first
    #[default]
    DateAscending,
    /// Latest first
    DateDescending,
}

/// Which fields a text search matches against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SearchFields {
    /// Title, description and location
    #[default]
    All,
    /// Title and location only
    TitleAndLocation,
}

/// Query over the event catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventQuery {
    /// Only events starting at or after this instant
    pub starting_from: Option<DateTime<Utc>>,
    /// Only events starting at or before this instant
    pub starting_until: Option<DateTime<Utc>>,
    /// Case-insensitive substring filter
    pub search: Option<String>,
    /// Fields the search applies to
    pub search_fields: SearchFields,
    /// Sort order
    pub order: EventOrder,
}

impl EventQuery {
    /// Whether an event satisfies the date window and search filter.
    ///
    /// Stores that cannot push the filter down use this to evaluate it.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        if self.starting_from.is_some_and(|from| event.event_date < from) {
            return false;
        }
        if self.starting_until.is_some_and(|until| event.event_date > until) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                let hit = |s: &str| s.to_lowercase().contains(&term);
                match self.search_fields {
                    SearchFields::All => {
                        hit(&event.title) || hit(&event.description) || hit(&event.location)
                    }
                    SearchFields::TitleAndLocation => hit(&event.title) || hit(&event.location),
                }
            }
        }
    }
}

// ============================================================================
// Registrations
// ============================================================================

/// Lifecycle of a registration.
///
/// Cancellation deletes the row, so the only persisted status is `Confirmed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    /// Holds one seat
    #[default]
    Confirmed,
}

impl RegistrationStatus {
    /// Database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
        }
    }
}

/// A user's claim on one seat of an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Registration identity
    pub id: RegistrationId,
    /// Event the seat belongs to
    pub event_id: EventId,
    /// Holder of the seat
    pub user_id: UserId,
    /// When the seat was claimed
    pub registered_at: DateTime<Utc>,
    /// Current status
    pub status: RegistrationStatus,
}

/// A registration joined with its event, for "my events" listings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationWithEvent {
    /// The registration
    pub registration: Registration,
    /// The event it is for
    pub event: Event,
}

/// Date filter for a user's registrations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationFilter {
    /// Everything
    #[default]
    All,
    /// Events that have not started yet
    Upcoming,
    /// Events that already started
    Past,
}

// ============================================================================
// Feedback
// ============================================================================

/// A star rating between 1 and 5 inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Lowest accepted rating
    pub const MIN: u8 = 1;
    /// Highest accepted rating
    pub const MAX: u8 = 5;

    /// Validate a raw rating.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value >= Self::MIN && value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    /// The numeric value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("rating must be between 1 and 5, got {value}"))
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// Post-event feedback left by an attendee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    /// Feedback identity
    pub id: FeedbackId,
    /// Event being rated
    pub event_id: EventId,
    /// Author
    pub user_id: UserId,
    /// Star rating
    pub rating: Rating,
    /// Free text
    pub comment: String,
    /// When first submitted
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Profiles
// ============================================================================

/// Application profile mirroring an auth identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Same id as the auth identity
    pub id: UserId,
    /// Contact address
    pub email: String,
    /// Display name
    pub full_name: String,
    /// Granted role
    pub role: Role,
    /// When the profile was created
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample_event() -> Event {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 18, 0, 0).single().unwrap_or_default();
        Event {
            id: EventId::new(),
            title: "Rust Meetup".to_string(),
            description: "Talks about async".to_string(),
            location: "Berlin".to_string(),
            event_date: at,
            created_at: at - Duration::days(30),
            total_seats: 10,
            available_seats: 7,
            image_url: None,
            creator_id: UserId::new(),
        }
    }

    #[test]
    fn role_parse_only_admin_literal_is_admin() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("ADMIN"), Role::Admin);
        assert_eq!(Role::parse("user"), Role::Standard);
        assert_eq!(Role::parse(""), Role::Standard);
    }

    #[test]
    fn rating_bounds() {
        assert!(Rating::new(0).is_none());
        assert_eq!(Rating::new(1).map(Rating::value), Some(1));
        assert_eq!(Rating::new(5).map(Rating::value), Some(5));
        assert!(Rating::new(6).is_none());
    }

    #[test]
    fn rating_rejects_out_of_range_json() {
        assert!(serde_json::from_str::<Rating>("4").is_ok());
        assert!(serde_json::from_str::<Rating>("9").is_err());
    }

    #[test]
    fn seats_taken_from_counts() {
        let event = sample_event();
        assert_eq!(event.seats_taken(), 3);
        assert_eq!(event.availability().taken(), 3);
        assert!(!event.availability().is_sold_out());
    }

    #[test]
    fn patch_leaves_seats_alone() {
        let mut event = sample_event();
        let patch = EventPatch {
            title: Some("Rust Meetup #2".to_string()),
            image_url: Some(Some("https://cdn/x.png".to_string())),
            ..EventPatch::default()
        };
        patch.apply_to(&mut event);
        assert_eq!(event.title, "Rust Meetup #2");
        assert_eq!(event.image_url.as_deref(), Some("https://cdn/x.png"));
        assert_eq!(event.total_seats, 10);
        assert_eq!(event.available_seats, 7);
    }

    #[test]
    fn query_search_fields() {
        let event = sample_event();
        let by_description = EventQuery {
            search: Some("ASYNC".to_string()),
            ..EventQuery::default()
        };
        assert!(by_description.matches(&event));

        let title_and_location = EventQuery {
            search: Some("async".to_string()),
            search_fields: SearchFields::TitleAndLocation,
            ..EventQuery::default()
        };
        assert!(!title_and_location.matches(&event));
    }

    #[test]
    fn query_date_window() {
        let event = sample_event();
        let after = EventQuery {
            starting_from: Some(event.event_date + Duration::seconds(1)),
            ..EventQuery::default()
        };
        assert!(!after.matches(&event));

        let blank_search = EventQuery {
            search: Some("   ".to_string()),
            starting_from: Some(event.event_date),
            ..EventQuery::default()
        };
        assert!(blank_search.matches(&event));
    }
}
