//! Classrooms, user profiles, and attendance records.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::geo::Coordinate;

/// Maximum length of a classroom identifier.
pub const MAX_CLASSROOM_ID_LENGTH: usize = 64;

/// Maximum length of a user identifier.
pub const MAX_USER_ID_LENGTH: usize = 128;

static CLASSROOM_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 _.\-]*$").expect("valid classroom id regex"));

static USER_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-]+$").expect("valid user id regex"));

/// Whether `id` can name a classroom.
///
/// Identifiers double as document keys and QR payloads, so they are limited to
/// ASCII letters, digits, space, `_`, `-` and `.`, and must start with a
/// letter or digit.
#[must_use]
pub fn is_valid_classroom_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_CLASSROOM_ID_LENGTH
        && id.trim() == id
        && CLASSROOM_ID_RE.is_match(id)
}

/// Whether `id` can name a user.
#[must_use]
pub fn is_valid_user_id(id: &str) -> bool {
    id.len() <= MAX_USER_ID_LENGTH && USER_ID_RE.is_match(id)
}

/// A physical classroom students can check into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "RoomA",
    "anchor": { "latitude": 1.0, "longitude": 2.0 },
    "created_at": "2025-01-15T08:00:00Z"
}))]
pub struct Classroom {
    /// Identifier encoded in the classroom's QR code. Never changes.
    #[schema(example = "RoomA")]
    pub id: String,

    /// Where the administrator stood when creating the classroom.
    pub anchor: Coordinate,

    /// When the classroom was created.
    pub created_at: DateTime<Utc>,
}

/// A user's profile as kept by the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "0b6f1c2e-2f55-4c8e-9d63-0f4b8a0c2d11",
    "name": "Ada Lovelace",
    "email": "adalovelace@uni.edu",
    "is_admin": false,
    "classroom_id": "RoomA"
}))]
pub struct UserProfile {
    /// Stable user identifier.
    pub id: String,

    /// Display name.
    #[schema(example = "Ada Lovelace")]
    pub name: String,

    /// Contact email.
    #[schema(example = "adalovelace@uni.edu")]
    pub email: String,

    /// Administrators manage classrooms and are not enrolled anywhere.
    #[serde(default)]
    pub is_admin: bool,

    /// The classroom a student belongs to.
    #[serde(default)]
    #[schema(example = "RoomA")]
    pub classroom_id: Option<String>,
}

impl UserProfile {
    /// Whether this user is enrolled in `classroom_id`.
    #[must_use]
    pub fn belongs_to(&self, classroom_id: &str) -> bool {
        self.classroom_id.as_deref() == Some(classroom_id)
    }
}

/// Composite identity of an attendance record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub struct AttendanceKey {
    /// Classroom the user checked into.
    #[schema(example = "RoomA")]
    pub classroom_id: String,

    /// Calendar day of the check-in.
    #[schema(value_type = String, example = "2025-01-15")]
    pub date: NaiveDate,

    /// The user who checked in.
    pub user_id: String,
}

impl AttendanceKey {
    /// Creates a key.
    pub fn new(classroom_id: impl Into<String>, date: NaiveDate, user_id: impl Into<String>) -> Self {
        Self {
            classroom_id: classroom_id.into(),
            date,
            user_id: user_id.into(),
        }
    }
}

impl fmt::Display for AttendanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}_{}",
            self.classroom_id,
            self.date.format("%Y-%m-%d"),
            self.user_id
        )
    }
}

/// Proof that a user was present in a classroom on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "classroom_id": "RoomA",
    "date": "2025-01-15",
    "user_id": "u1",
    "captured_at": "2025-01-15T09:02:11Z"
}))]
pub struct AttendanceRecord {
    /// Classroom the user checked into.
    pub classroom_id: String,

    /// Calendar day of the check-in.
    #[schema(value_type = String, example = "2025-01-15")]
    pub date: NaiveDate,

    /// The user who checked in.
    pub user_id: String,

    /// When the scan succeeded.
    pub captured_at: DateTime<Utc>,
}

impl AttendanceRecord {
    /// Creates a record for `key` captured at `captured_at`.
    #[must_use]
    pub fn new(key: AttendanceKey, captured_at: DateTime<Utc>) -> Self {
        Self {
            classroom_id: key.classroom_id,
            date: key.date,
            user_id: key.user_id,
            captured_at,
        }
    }

    /// The composite key this record is stored under.
    #[must_use]
    pub fn key(&self) -> AttendanceKey {
        AttendanceKey::new(self.classroom_id.clone(), self.date, self.user_id.clone())
    }
}
