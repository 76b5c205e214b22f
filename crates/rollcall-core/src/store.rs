//! Persistence for classrooms, profiles, and attendance records.
//!
//! The core never owns durable state. It talks to a backing document store
//! through [`AttendanceStore`], which exposes only the reads and conditional
//! writes the rest of the crate needs.
//!
//! Two backends ship with the crate:
//!
//! - [`MemoryStore`] keeps everything in process, for tests and demos
//! - [`JsonFileStore`] keeps one JSON document per entity under a directory

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AttendanceKey, AttendanceRecord, Classroom, UserProfile};

mod json;
mod memory;

pub use json::JsonFileStore;
pub use memory::MemoryStore;

/// Errors from the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A document could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    ReadError {
        /// Document path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A document could not be written.
    #[error("Failed to write {}: {source}", path.display())]
    WriteError {
        /// Document path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A directory could not be created.
    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDirError {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A stored document is not valid JSON for its type.
    #[error("Failed to parse {}: {source}", path.display())]
    ParseError {
        /// Document path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A document could not be serialized.
    #[error("Failed to serialize document: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// An identifier cannot address a document in this backend.
    #[error("Invalid document key: {0}")]
    InvalidKey(String),

    /// The backend cannot be reached right now.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Outcome of a write that only succeeds when the key is not taken yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertOutcome {
    /// The document was written.
    Inserted,
    /// A document already existed under the key; nothing was written.
    AlreadyExists,
}

/// Document store operations used by the core.
///
/// Conditional inserts must be atomic with respect to their key: two
/// concurrent calls for the same key yield exactly one `Inserted`.
///
/// Only identifiers accepted by [`is_valid_classroom_id`] and
/// [`is_valid_user_id`] can exist. Writes naming any other identifier fail
/// with [`StoreError::InvalidKey`]; lookups of them find nothing.
///
/// [`is_valid_classroom_id`]: crate::model::is_valid_classroom_id
/// [`is_valid_user_id`]: crate::model::is_valid_user_id
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Short name of the backend, for diagnostics.
    fn backend_name(&self) -> &'static str;

    /// Looks up a classroom by identifier.
    async fn get_classroom(&self, id: &str) -> StoreResult<Option<Classroom>>;

    /// All classrooms, ordered by identifier.
    async fn list_classrooms(&self) -> StoreResult<Vec<Classroom>>;

    /// Creates a classroom unless one with the same identifier exists.
    async fn insert_classroom_if_absent(&self, classroom: &Classroom) -> StoreResult<InsertOutcome>;

    /// Looks up a user profile.
    async fn get_user_profile(&self, id: &str) -> StoreResult<Option<UserProfile>>;

    /// Creates or replaces a user profile.
    async fn put_user_profile(&self, profile: &UserProfile) -> StoreResult<()>;

    /// Profiles enrolled in a classroom, ordered by name then identifier.
    async fn list_classroom_members(&self, classroom_id: &str) -> StoreResult<Vec<UserProfile>>;

    /// Whether an attendance record exists under `key`.
    async fn record_exists(&self, key: &AttendanceKey) -> StoreResult<bool>;

    /// Writes `record` unless a record already exists under its key.
    async fn insert_record_if_absent(&self, record: &AttendanceRecord) -> StoreResult<InsertOutcome>;

    /// Every attendance record of a classroom, ordered by date then user.
    async fn list_records(&self, classroom_id: &str) -> StoreResult<Vec<AttendanceRecord>>;
}

pub(crate) fn sort_members(members: &mut [UserProfile]) {
    members.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
}

pub(crate) fn sort_records(records: &mut [AttendanceRecord]) {
    records.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.user_id.cmp(&b.user_id)));
}
