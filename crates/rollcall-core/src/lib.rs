//! # rollcall-core
//!
//! Core logic for the rollcall geofenced attendance system.
//!
//! This crate provides:
//! - Great-circle distance and geofence checks
//! - The admission pipeline that decides whether a scan becomes an attendance record
//! - Classroom creation, student enrollment, and attendance registers
//! - Pluggable persistence (in-memory and JSON files)
//! - Configuration loading, saving, and validation
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`geo`] - Coordinates and haversine distance
//! - [`admission`] - The five-step admission pipeline and its outcomes
//! - [`calendar`] - Clocks and the calendar-day policy
//! - [`location`] - Device position capability
//! - [`model`] - Classrooms, user profiles, and attendance records
//! - [`store`] - The storage seam and its backends
//! - [`registry`] - Classroom creation and enrollment
//! - [`register`] - Attendance matrix and per-student history views
//! - [`config`] - Layered configuration
//! - [`error`] - Unified error types for the crate

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod admission;
pub mod calendar;
pub mod config;
pub mod error;
pub mod geo;
pub mod location;
pub mod model;
pub mod register;
pub mod registry;
pub mod store;

// Re-export primary types for convenience
pub use admission::{AdmissionController, AdmissionPolicy, AdmissionStep, Outcome, RejectReason};
pub use calendar::{
    format_date, is_valid_date_string, parse_date, CalendarPolicy, Clock, FixedClock, SystemClock,
    DATE_FORMAT,
};
pub use crate::config::{
    default_data_dir, is_valid_timezone, CalendarConfig, Config, ConfigError, ConfigResult,
    EnrollmentConfig, GeofenceConfig, ServerConfig, StorageBackend, StorageConfig,
};
pub use error::{Result, RollcallError};
pub use geo::{distance_m, within_radius, Coordinate, EARTH_RADIUS_M};
pub use location::{FixedLocation, LocationError, LocationProvider, LocationResult};
pub use model::{
    is_valid_classroom_id, is_valid_user_id, AttendanceKey, AttendanceRecord, Classroom,
    UserProfile,
};
pub use register::{AttendanceRegister, ClassroomRegister, HistoryEntry, RegisterRow, StudentHistory};
pub use registry::{student_email, ClassroomRegistry, RegistryError, RegistryResult};
pub use store::{
    AttendanceStore, InsertOutcome, JsonFileStore, MemoryStore, StoreError, StoreResult,
};
