//! Unified error types for the rollcall core library.
//!
//! [`RollcallError`] covers every failure the crate can report outside of an
//! admission attempt. Modules keep their own error enums ([`ConfigError`],
//! [`StoreError`], [`RegistryError`], [`LocationError`]) and convert into this
//! one at the crate boundary.
//!
//! Admission rejections are not errors: they come back as
//! [`Outcome::Rejected`](crate::admission::Outcome::Rejected) with a
//! [`RejectReason`](crate::admission::RejectReason).
//!
//! # Example
//!
//! ```rust
//! use rollcall_core::error::{Result, RollcallError};
//!
//! fn require_name(name: &str) -> Result<&str> {
//!     if name.trim().is_empty() {
//!         return Err(RollcallError::EmptyStudentName);
//!     }
//!     Ok(name)
//! }
//!
//! assert!(require_name(" ").is_err());
//! ```

use thiserror::Error;

use crate::config::ConfigError;
use crate::location::LocationError;
use crate::registry::RegistryError;
use crate::store::StoreError;

/// The unified error type for rollcall operations.
#[derive(Debug, Error)]
pub enum RollcallError {
    // =========================================================================
    // CLASSROOM & ENROLLMENT ERRORS
    // =========================================================================
    /// The classroom identifier was blank.
    #[error("Classroom ID is required")]
    EmptyClassroomId,

    /// The classroom identifier holds characters it cannot contain.
    #[error(
        "Invalid classroom ID '{0}'. Use ASCII letters, digits, spaces, '_', '-' or '.' (accented and other non-ASCII characters are not accepted), starting with a letter or digit."
    )]
    InvalidClassroomId(String),

    /// A classroom with this identifier already exists.
    #[error("Classroom '{0}' already exists. Classroom IDs cannot be reused.")]
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

    /// The user is not enrolled anywhere.
    #[error("User '{0}' has no classroom assigned")]
    NoClassroomAssigned(String),

    /// A coordinate was outside the valid latitude/longitude range.
    #[error("Invalid coordinate ({latitude}, {longitude}). Latitude must be within [-90, 90] and longitude within [-180, 180].")]
    InvalidCoordinate {
        /// Latitude provided.
        latitude: f64,
        /// Longitude provided.
        longitude: f64,
    },

    // =========================================================================
    // LOCATION ERRORS
    // =========================================================================
    /// Location access was refused.
    #[error("Location permission denied")]
    LocationPermissionDenied,

    /// The position could not be determined.
    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found.
    #[error("Configuration not found: {0}")]
    ConfigNotFound(String),

    /// A configuration source could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but holds invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // PERSISTENCE & I/O ERRORS
    // =========================================================================
    /// The backing store failed.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored document is corrupt or could not be written.
    #[error("Persistence error: {0}")]
    PersistenceError(String),

    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A specialized [`Result`] type for rollcall operations.
pub type Result<T> = std::result::Result<T, RollcallError>;

impl RollcallError {
    /// Returns `true` if this error is about classrooms or enrollment.
    #[inline]
    #[must_use]
    pub const fn is_registry_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyClassroomId
                | Self::InvalidClassroomId(_)
                | Self::ClassroomAlreadyExists(_)
                | Self::ClassroomNotFound(_)
                | Self::EmptyStudentName
                | Self::UserNotFound(_)
                | Self::NoClassroomAssigned(_)
                | Self::InvalidCoordinate { .. }
        )
    }

    /// Returns `true` if this error is about reading the device position.
    #[inline]
    #[must_use]
    pub const fn is_location_error(&self) -> bool {
        matches!(
            self,
            Self::LocationPermissionDenied | Self::LocationUnavailable(_)
        )
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigParseError(_) | Self::ConfigValidationError(_)
        )
    }

    /// Returns `true` if this error is related to I/O or persistence.
    #[inline]
    #[must_use]
    pub const fn is_io_error(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::PersistenceError(_) | Self::IoError(_)
        )
    }

    /// Returns `true` if retrying the same request later may succeed.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::LocationUnavailable(_))
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed input
            Self::EmptyClassroomId
            | Self::InvalidClassroomId(_)
            | Self::EmptyStudentName
            | Self::InvalidCoordinate { .. } => 400,

            // 403 Forbidden - the user withheld their location
            Self::LocationPermissionDenied => 403,

            // 404 Not Found
            Self::ClassroomNotFound(_) | Self::UserNotFound(_) | Self::ConfigNotFound(_) => 404,

            // 409 Conflict
            Self::ClassroomAlreadyExists(_) => 409,

            // 422 Unprocessable Entity - semantic errors
            Self::NoClassroomAssigned(_)
            | Self::LocationUnavailable(_)
            | Self::ConfigParseError(_)
            | Self::ConfigValidationError(_) => 422,

            // 500 Internal Server Error
            Self::PersistenceError(_) | Self::IoError(_) => 500,

            // 503 Service Unavailable
            Self::StoreUnavailable(_) => 503,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyClassroomId => "EMPTY_CLASSROOM_ID",
            Self::InvalidClassroomId(_) => "INVALID_CLASSROOM_ID",
            Self::ClassroomAlreadyExists(_) => "CLASSROOM_ALREADY_EXISTS",
            Self::ClassroomNotFound(_) => "CLASSROOM_NOT_FOUND",
            Self::EmptyStudentName => "EMPTY_STUDENT_NAME",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::NoClassroomAssigned(_) => "NO_CLASSROOM_ASSIGNED",
            Self::InvalidCoordinate { .. } => "INVALID_COORDINATE",
            Self::LocationPermissionDenied => "LOCATION_PERMISSION_DENIED",
            Self::LocationUnavailable(_) => "LOCATION_UNAVAILABLE",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::PersistenceError(_) => "PERSISTENCE_ERROR",
            Self::IoError(_) => "IO_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<ConfigError> for RollcallError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotFound(what) => Self::ConfigNotFound(what),
            ConfigError::ReadError { path, source } => {
                Self::PersistenceError(format!("Failed to read {path}: {source}"))
            }
            ConfigError::WriteError { path, source } => {
                Self::PersistenceError(format!("Failed to write {path}: {source}"))
            }
            ConfigError::ParseError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::SerializeError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::ValidationError { field, message } => {
                Self::ConfigValidationError(format!("{field}: {message}"))
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

impl From<StoreError> for RollcallError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(message) => Self::StoreUnavailable(message),
            StoreError::ReadError { .. } | StoreError::WriteError { .. } | StoreError::CreateDirError { .. } => {
                Self::StoreUnavailable(err.to_string())
            }
            StoreError::ParseError { .. } | StoreError::SerializeError(_) | StoreError::InvalidKey(_) => {
                Self::PersistenceError(err.to_string())
            }
        }
    }
}

impl From<LocationError> for RollcallError {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::PermissionDenied => Self::LocationPermissionDenied,
            LocationError::Unavailable(message) => Self::LocationUnavailable(message),
        }
    }
}

impl From<RegistryError> for RollcallError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::EmptyClassroomId => Self::EmptyClassroomId,
            RegistryError::InvalidClassroomId(id) => Self::InvalidClassroomId(id),
            RegistryError::ClassroomAlreadyExists(id) => Self::ClassroomAlreadyExists(id),
            RegistryError::ClassroomNotFound(id) => Self::ClassroomNotFound(id),
            RegistryError::EmptyStudentName => Self::EmptyStudentName,
            RegistryError::UserNotFound(id) => Self::UserNotFound(id),
            RegistryError::NoClassroomAssigned(id) => Self::NoClassroomAssigned(id),
            RegistryError::Location(e) => e.into(),
            RegistryError::Store(e) => e.into(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
