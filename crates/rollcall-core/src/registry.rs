//! Classroom and enrollment management.
//!
//! Administrators create a classroom while standing in it, so the classroom's
//! anchor is wherever the administrator's device says they are. Students are
//! enrolled into exactly one classroom.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::calendar::{Clock, SystemClock};
use crate::location::{LocationError, LocationProvider};
use crate::model::{is_valid_classroom_id, Classroom, UserProfile, MAX_CLASSROOM_ID_LENGTH};
use crate::store::{AttendanceStore, InsertOutcome, StoreError};

/// Errors from registry and register operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The classroom identifier was blank.
    #[error("Classroom ID is required")]
    EmptyClassroomId,

    /// The classroom identifier contains characters it cannot hold.
    #[error(
        "Invalid classroom ID '{0}'. Use ASCII letters, digits, spaces, '_', '-' or '.' (accented and other non-ASCII characters are not accepted), starting with a letter or digit."
    )]
    InvalidClassroomId(String),

    /// A classroom with this identifier already exists.
    #[error("Classroom '{0}' already exists")]
    ClassroomAlreadyExists(String),

    /// No classroom has this identifier.
    #[error("Classroom '{0}' not found")]
    ClassroomNotFound(String),

    /// The student name was blank.
    #[error("Student name is required")]
    EmptyStudentName,

    /// No profile exists for this user.
    #[error("User '{0}' not found")]
    UserNotFound(String),

    /// The user is not enrolled in any classroom.
    #[error("User '{0}' has no classroom assigned")]
    NoClassroomAssigned(String),

    /// The administrator's position could not be read.
    #[error(transparent)]
    Location(#[from] LocationError),

    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Derives a student's email from their name: whitespace removed, lower-cased.
#[must_use]
pub fn student_email(name: &str, domain: &str) -> String {
    let local: String = name.split_whitespace().collect();
    format!("{}@{domain}", local.to_lowercase())
}

/// Creates classrooms and enrolls students.
#[derive(Clone)]
pub struct ClassroomRegistry {
    store: Arc<dyn AttendanceStore>,
    email_domain: String,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for ClassroomRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassroomRegistry")
            .field("store", &self.store.backend_name())
            .field("email_domain", &self.email_domain)
            .finish_non_exhaustive()
    }
}

impl ClassroomRegistry {
    /// Creates a registry generating student emails under `email_domain`.
    pub fn new(store: Arc<dyn AttendanceStore>, email_domain: impl Into<String>) -> Self {
        Self {
            store,
            email_domain: email_domain.into(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used for creation timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Creates a classroom anchored at the administrator's current position.
    ///
    /// # Errors
    ///
    /// Fails if the identifier is blank or invalid, if the position cannot be
    /// read, or if the identifier is taken. An existing classroom is never
    /// moved.
    pub async fn create_classroom(
        &self,
        id: &str,
        location: &dyn LocationProvider,
    ) -> RegistryResult<Classroom> {
        let id = id.trim();
        if id.is_empty() {
            return Err(RegistryError::EmptyClassroomId);
        }
        if !is_valid_classroom_id(id) {
            return Err(RegistryError::InvalidClassroomId(
                id.chars().take(MAX_CLASSROOM_ID_LENGTH + 1).collect(),
            ));
        }

        let anchor = location.current_location().await?;
        let classroom = Classroom {
            id: id.to_string(),
            anchor,
            created_at: self.clock.now(),
        };

        match self.store.insert_classroom_if_absent(&classroom).await? {
            InsertOutcome::Inserted => {
                info!(
                    classroom_id = %classroom.id,
                    latitude = anchor.latitude,
                    longitude = anchor.longitude,
                    "Classroom created"
                );
                Ok(classroom)
            }
            InsertOutcome::AlreadyExists => Err(RegistryError::ClassroomAlreadyExists(classroom.id)),
        }
    }

    /// All classrooms, ordered by identifier.
    ///
    /// # Errors
    ///
    /// Fails if the store fails.
    pub async fn list_classrooms(&self) -> RegistryResult<Vec<Classroom>> {
        Ok(self.store.list_classrooms().await?)
    }

    /// Enrolls a new student called `name` into `classroom_id`.
    ///
    /// # Errors
    ///
    /// Fails if the name is blank, the classroom does not exist, or the store
    /// fails.
    pub async fn enroll_student(&self, classroom_id: &str, name: &str) -> RegistryResult<UserProfile> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::EmptyStudentName);
        }
        let classroom = self.require_classroom(classroom_id).await?;

        let profile = UserProfile {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: student_email(name, &self.email_domain),
            is_admin: false,
            classroom_id: Some(classroom.id),
        };
        self.store.put_user_profile(&profile).await?;

        info!(user_id = %profile.id, classroom_id = %classroom_id, "Student enrolled");
        Ok(profile)
    }

    /// Students enrolled in `classroom_id`, ordered by name.
    ///
    /// # Errors
    ///
    /// Fails if the classroom does not exist or the store fails.
    pub async fn list_students(&self, classroom_id: &str) -> RegistryResult<Vec<UserProfile>> {
        self.require_classroom(classroom_id).await?;
        Ok(self.store.list_classroom_members(classroom_id).await?)
    }

    async fn require_classroom(&self, classroom_id: &str) -> RegistryResult<Classroom> {
        self.store
            .get_classroom(classroom_id)
            .await?
            .ok_or_else(|| RegistryError::ClassroomNotFound(classroom_id.to_string()))
    }
}
