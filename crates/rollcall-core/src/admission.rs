//! Attendance admission.
//!
//! One admission attempt walks five steps in order and stops at the first one
//! that decides the outcome:
//!
//! 1. [`AdmissionStep::ClassroomExistence`]: the scanned classroom exists
//! 2. [`AdmissionStep::Membership`]: the user has a profile and is enrolled there
//! 3. [`AdmissionStep::Geofence`]: the user is within the configured radius
//! 4. [`AdmissionStep::DuplicateCheck`]: no record exists for today yet
//! 5. [`AdmissionStep::Commit`]: the record is written
//!
//! Only the commit writes. It is a conditional insert on the
//! (classroom, date, user) key, so two attempts racing past the duplicate check
//! still produce a single record; the loser reports `AlreadyRecorded`.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::calendar::{CalendarPolicy, Clock, SystemClock};
use crate::geo::{distance_m, Coordinate};
use crate::location::{LocationError, LocationProvider};
use crate::model::{is_valid_classroom_id, AttendanceKey, AttendanceRecord};
use crate::store::{AttendanceStore, InsertOutcome, StoreError};

/// Tunable admission rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdmissionPolicy {
    /// Maximum distance from the classroom anchor, in meters (inclusive).
    pub radius_m: f64,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self { radius_m: 50.0 }
    }
}

/// The steps of an admission attempt, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionStep {
    /// Look up the scanned classroom.
    ClassroomExistence,
    /// Look up the user's profile and compare its classroom.
    Membership,
    /// Compare the user's position with the classroom anchor.
    Geofence,
    /// Look for an existing record for today.
    DuplicateCheck,
    /// Write the record.
    Commit,
}

impl fmt::Display for AdmissionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ClassroomExistence => "classroom_existence",
            Self::Membership => "membership",
            Self::Geofence => "geofence",
            Self::DuplicateCheck => "duplicate_check",
            Self::Commit => "commit",
        };
        f.write_str(name)
    }
}

/// Why an attempt was turned down.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RejectReason {
    /// No classroom has the scanned identifier.
    #[error("Unknown classroom '{classroom_id}'. The scanned code does not belong to any classroom.")]
    UnknownClassroom {
        /// The scanned identifier.
        classroom_id: String,
    },

    /// The acting user has no profile record.
    #[error("No profile found for user '{user_id}'. Ask an administrator to finish account setup.")]
    MissingUserProfile {
        /// The acting user.
        user_id: String,
    },

    /// The user is enrolled in a different classroom (or none).
    #[error("You do not belong to classroom '{scanned}'.")]
    WrongClassroom {
        /// The scanned identifier.
        scanned: String,
        /// The classroom on the user's profile.
        enrolled: Option<String>,
    },

    /// The user is too far from the classroom anchor.
    #[error("You are {distance_m:.0} m from the classroom; scans must be within {radius_m:.0} m.")]
    OutOfRange {
        /// Measured distance in meters.
        distance_m: f64,
        /// Allowed radius in meters.
        radius_m: f64,
    },

    /// The user refused location access.
    #[error("Location permission denied. Allow location access to check in.")]
    LocationPermissionDenied,

    /// The user's position could not be determined.
    #[error("Could not determine your location: {0}")]
    LocationUnavailable(String),

    /// The backing store failed; the whole attempt may be retried.
    #[error("Attendance store unavailable: {0}")]
    StoreUnavailable(String),
}

impl RejectReason {
    /// Machine-readable code for this reason.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownClassroom { .. } => "UNKNOWN_CLASSROOM",
            Self::MissingUserProfile { .. } => "MISSING_USER_PROFILE",
            Self::WrongClassroom { .. } => "WRONG_CLASSROOM",
            Self::OutOfRange { .. } => "OUT_OF_RANGE",
            Self::LocationPermissionDenied => "LOCATION_PERMISSION_DENIED",
            Self::LocationUnavailable(_) => "LOCATION_UNAVAILABLE",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
        }
    }

    /// Whether retrying the same attempt later could succeed without the user
    /// doing anything different.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::LocationUnavailable(_))
    }
}

impl From<StoreError> for RejectReason {
    fn from(err: StoreError) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<LocationError> for RejectReason {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::PermissionDenied => Self::LocationPermissionDenied,
            LocationError::Unavailable(message) => Self::LocationUnavailable(message),
        }
    }
}

/// Terminal result of one admission attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A new record was written.
    Admitted(AttendanceRecord),

    /// The user was already marked present today. Not an error.
    AlreadyRecorded {
        /// Key of the existing record.
        key: AttendanceKey,
        /// Duplicate check, or commit when a concurrent attempt won the race.
        step: AdmissionStep,
    },

    /// The attempt was turned down at `step`.
    Rejected {
        /// The step that rejected the attempt.
        step: AdmissionStep,
        /// Why.
        reason: RejectReason,
    },
}

impl Outcome {
    /// The step that produced this outcome.
    #[must_use]
    pub const fn step(&self) -> AdmissionStep {
        match self {
            Self::Admitted(_) => AdmissionStep::Commit,
            Self::AlreadyRecorded { step, .. } | Self::Rejected { step, .. } => *step,
        }
    }

    /// Whether this outcome is a fresh admission.
    #[must_use]
    pub const fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted(_))
    }

    /// The rejection reason, if any.
    #[must_use]
    pub const fn rejection(&self) -> Option<&RejectReason> {
        match self {
            Self::Rejected { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Tags an error with the step it happened in.
fn at_step<E: Into<RejectReason>>(
    step: AdmissionStep,
) -> impl FnOnce(E) -> (AdmissionStep, RejectReason) {
    move |err| (step, err.into())
}

/// Where the user's position comes from during the geofence step.
enum Position<'a> {
    Known(Coordinate),
    Provider(&'a dyn LocationProvider),
}

/// Runs admission attempts against a store.
///
/// Holds no state between attempts; cloning is cheap.
#[derive(Clone)]
pub struct AdmissionController {
    store: Arc<dyn AttendanceStore>,
    policy: AdmissionPolicy,
    calendar: CalendarPolicy,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for AdmissionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionController")
            .field("store", &self.store.backend_name())
            .field("policy", &self.policy)
            .field("calendar", &self.calendar)
            .field("clock", &self.clock)
            .finish()
    }
}

impl AdmissionController {
    /// Creates a controller using the system clock.
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        policy: AdmissionPolicy,
        calendar: CalendarPolicy,
    ) -> Self {
        Self {
            store,
            policy,
            calendar,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The rules this controller applies.
    #[must_use]
    pub const fn policy(&self) -> AdmissionPolicy {
        self.policy
    }

    /// Attempts to admit `user_id` into `classroom_id` from `current`.
    #[instrument(skip(self), fields(outcome = tracing::field::Empty))]
    pub async fn attempt(&self, classroom_id: &str, user_id: &str, current: Coordinate) -> Outcome {
        self.run(classroom_id, user_id, Position::Known(current)).await
    }

    /// Like [`attempt`](Self::attempt), but asks `location` for the user's
    /// position once the geofence step is reached.
    #[instrument(skip(self, location), fields(outcome = tracing::field::Empty))]
    pub async fn attempt_with_location(
        &self,
        classroom_id: &str,
        user_id: &str,
        location: &dyn LocationProvider,
    ) -> Outcome {
        self.run(classroom_id, user_id, Position::Provider(location)).await
    }

    async fn run(&self, classroom_id: &str, user_id: &str, position: Position<'_>) -> Outcome {
        let outcome = match self.steps(classroom_id, user_id, position).await {
            Ok(outcome) => outcome,
            Err((step, reason)) => Outcome::Rejected { step, reason },
        };

        match &outcome {
            Outcome::Admitted(record) => {
                tracing::Span::current().record("outcome", "admitted");
                info!(key = %record.key(), "Attendance admitted");
            }
            Outcome::AlreadyRecorded { key, .. } => {
                tracing::Span::current().record("outcome", "already_recorded");
                info!(%key, "Attendance already recorded today");
            }
            Outcome::Rejected { step, reason } => {
                tracing::Span::current().record("outcome", "rejected");
                if reason.is_transient() {
                    warn!(%step, code = reason.code(), %reason, "Admission failed");
                } else {
                    info!(%step, code = reason.code(), "Admission rejected");
                }
            }
        }
        outcome
    }

    async fn steps(
        &self,
        classroom_id: &str,
        user_id: &str,
        position: Position<'_>,
    ) -> Result<Outcome, (AdmissionStep, RejectReason)> {
        use AdmissionStep::{ClassroomExistence, Commit, DuplicateCheck, Geofence, Membership};

        // 1. Classroom existence. Identifiers that cannot name a classroom
        // are unknown without asking the store.
        let unknown = || RejectReason::UnknownClassroom {
            classroom_id: classroom_id.to_string(),
        };
        if !is_valid_classroom_id(classroom_id) {
            return Err((ClassroomExistence, unknown()));
        }
        let classroom = self
            .store
            .get_classroom(classroom_id)
            .await
            .map_err(at_step(ClassroomExistence))?
            .ok_or_else(|| (ClassroomExistence, unknown()))?;

        // 2. Membership.
        let profile = self
            .store
            .get_user_profile(user_id)
            .await
            .map_err(at_step(Membership))?
            .ok_or_else(|| {
                (
                    Membership,
                    RejectReason::MissingUserProfile {
                        user_id: user_id.to_string(),
                    },
                )
            })?;
        if !profile.belongs_to(&classroom.id) {
            return Err((
                Membership,
                RejectReason::WrongClassroom {
                    scanned: classroom.id,
                    enrolled: profile.classroom_id,
                },
            ));
        }

        // 3. Geofence.
        let current = match position {
            Position::Known(current) => current,
            Position::Provider(provider) => provider
                .current_location()
                .await
                .map_err(at_step(Geofence))?,
        };
        let distance = distance_m(classroom.anchor, current);
        if distance > self.policy.radius_m {
            return Err((
                Geofence,
                RejectReason::OutOfRange {
                    distance_m: distance,
                    radius_m: self.policy.radius_m,
                },
            ));
        }

        // 4. Duplicate check.
        let now = self.clock.now();
        let key = AttendanceKey::new(classroom.id, self.calendar.today(now), profile.id);
        if self
            .store
            .record_exists(&key)
            .await
            .map_err(at_step(DuplicateCheck))?
        {
            return Ok(Outcome::AlreadyRecorded {
                key,
                step: DuplicateCheck,
            });
        }

        // 5. Commit.
        let record = AttendanceRecord::new(key, now);
        match self
            .store
            .insert_record_if_absent(&record)
            .await
            .map_err(at_step(Commit))?
        {
            InsertOutcome::Inserted => Ok(Outcome::Admitted(record)),
            InsertOutcome::AlreadyExists => Ok(Outcome::AlreadyRecorded {
                key: record.key(),
                step: Commit,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::calendar::FixedClock;
    use crate::location::FixedLocation;
    use crate::model::{Classroom, UserProfile};
    use crate::store::{MemoryStore, StoreResult};

    fn at(latitude: f64, longitude: f64) -> Coordinate {
        Coordinate::new(latitude, longitude).unwrap()
    }

    fn morning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap()
    }

    fn student(id: &str, classroom_id: &str) -> UserProfile {
        UserProfile {
            id: id.into(),
            name: id.to_uppercase(),
            email: format!("{id}@uni.edu"),
            is_admin: false,
            classroom_id: Some(classroom_id.into()),
        }
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (id, anchor) in [("RoomA", at(1.0, 2.0)), ("RoomB", at(1.5, 2.5))] {
            store
                .insert_classroom_if_absent(&Classroom {
                    id: id.into(),
                    anchor,
                    created_at: morning(),
                })
                .await
                .unwrap();
        }
        store.put_user_profile(&student("u1", "RoomA")).await.unwrap();
        store.put_user_profile(&student("u2", "RoomB")).await.unwrap();
        store
    }

    fn controller(store: Arc<dyn AttendanceStore>) -> AdmissionController {
        AdmissionController::new(store, AdmissionPolicy::default(), CalendarPolicy::default())
            .with_clock(Arc::new(FixedClock(morning())))
    }

    fn rejected(outcome: &Outcome) -> (AdmissionStep, &RejectReason) {
        match outcome {
            Outcome::Rejected { step, reason } => (*step, reason),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_admitted_in_place() {
        let store = seeded_store().await;
        let outcome = controller(store.clone()).attempt("RoomA", "u1", at(1.0, 2.0)).await;

        let Outcome::Admitted(record) = &outcome else {
            panic!("expected admission, got {outcome:?}");
        };
        let today = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(record.key(), AttendanceKey::new("RoomA", today, "u1"));
        assert_eq!(record.captured_at, morning());
        assert_eq!(outcome.step(), AdmissionStep::Commit);
        assert!(store.record_exists(&record.key()).await.unwrap());
    }

    #[tokio::test]
    async fn test_out_of_range() {
        let store = seeded_store().await;
        let outcome = controller(store.clone()).attempt("RoomA", "u1", at(1.01, 2.0)).await;

        let (step, reason) = rejected(&outcome);
        assert_eq!(step, AdmissionStep::Geofence);
        match reason {
            RejectReason::OutOfRange { distance_m, radius_m } => {
                assert!(*distance_m > 1000.0);
                assert!((*radius_m - 50.0).abs() < f64::EPSILON);
            }
            other => panic!("expected OutOfRange, got {other:?}"),
        }
        assert_eq!(store.record_count().await, 0);
    }

    #[tokio::test]
    async fn test_second_attempt_same_day_is_already_recorded() {
        let store = seeded_store().await;
        let controller = controller(store.clone());

        assert!(controller.attempt("RoomA", "u1", at(1.0, 2.0)).await.is_admitted());
        let again = controller.attempt("RoomA", "u1", at(1.0, 2.0)).await;

        assert!(matches!(again, Outcome::AlreadyRecorded { .. }));
        assert_eq!(again.step(), AdmissionStep::DuplicateCheck);
        assert_eq!(store.record_count().await, 1);
    }

    #[tokio::test]
    async fn test_next_day_is_admitted_again() {
        let store = seeded_store().await;
        assert!(controller(store.clone())
            .attempt("RoomA", "u1", at(1.0, 2.0))
            .await
            .is_admitted());

        let tomorrow = Utc.with_ymd_and_hms(2025, 1, 16, 9, 0, 0).unwrap();
        let next_day = controller(store.clone()).with_clock(Arc::new(FixedClock(tomorrow)));
        assert!(next_day.attempt("RoomA", "u1", at(1.0, 2.0)).await.is_admitted());
        assert_eq!(store.record_count().await, 2);
    }

    #[tokio::test]
    async fn test_day_boundary_follows_calendar_timezone() {
        let store = seeded_store().await;
        let tokyo = CalendarPolicy::new(chrono_tz::Asia::Tokyo);
        let scan_at = |hour| {
            let now = Utc.with_ymd_and_hms(2025, 3, 9, hour, 0, 0).unwrap();
            AdmissionController::new(store.clone(), AdmissionPolicy::default(), tokyo)
                .with_clock(Arc::new(FixedClock(now)))
        };

        // 23:00 and 01:00 in Tokyo: same UTC day, different local days.
        let late = scan_at(14).attempt("RoomA", "u1", at(1.0, 2.0)).await;
        let early = scan_at(16).attempt("RoomA", "u1", at(1.0, 2.0)).await;

        let (Outcome::Admitted(first), Outcome::Admitted(second)) = (&late, &early) else {
            panic!("expected two admissions, got {late:?} and {early:?}");
        };
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
        assert_eq!(second.date, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(store.record_count().await, 2);
    }

    #[tokio::test]
    async fn test_wrong_classroom_even_when_in_range() {
        let store = seeded_store().await;
        let outcome = controller(store).attempt("RoomA", "u2", at(1.0, 2.0)).await;

        let (step, reason) = rejected(&outcome);
        assert_eq!(step, AdmissionStep::Membership);
        assert_eq!(
            reason,
            &RejectReason::WrongClassroom {
                scanned: "RoomA".into(),
                enrolled: Some("RoomB".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_classroom_regardless_of_user_or_location() {
        let store = seeded_store().await;
        let controller = controller(store);

        for (classroom, user) in [("RoomZ", "u1"), ("RoomZ", "nobody"), ("../RoomA", "u1"), ("", "u1")] {
            let outcome = controller.attempt(classroom, user, at(1.0, 2.0)).await;
            let (step, reason) = rejected(&outcome);
            assert_eq!(step, AdmissionStep::ClassroomExistence);
            assert_eq!(reason.code(), "UNKNOWN_CLASSROOM");
        }
    }

    #[tokio::test]
    async fn test_missing_profile() {
        let store = seeded_store().await;
        let outcome = controller(store).attempt("RoomA", "ghost", at(1.0, 2.0)).await;
        let (step, reason) = rejected(&outcome);
        assert_eq!(step, AdmissionStep::Membership);
        assert!(matches!(reason, RejectReason::MissingUserProfile { .. }));
    }

    #[tokio::test]
    async fn test_configured_radius_applies() {
        let store = seeded_store().await;
        // About 111 m north of the anchor.
        let nearby = at(1.001, 2.0);

        assert!(!controller(store.clone()).attempt("RoomA", "u1", nearby).await.is_admitted());

        let wide = AdmissionController::new(
            store,
            AdmissionPolicy { radius_m: 150.0 },
            CalendarPolicy::default(),
        )
        .with_clock(Arc::new(FixedClock(morning())));
        assert!(wide.attempt("RoomA", "u1", nearby).await.is_admitted());
    }

    #[tokio::test]
    async fn test_location_is_not_requested_before_geofence() {
        struct CountingLocation(AtomicUsize);

        #[async_trait]
        impl LocationProvider for CountingLocation {
            async fn current_location(&self) -> crate::location::LocationResult<Coordinate> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(Coordinate::new(1.0, 2.0).unwrap())
            }
        }

        let store = seeded_store().await;
        let controller = controller(store);
        let location = CountingLocation(AtomicUsize::new(0));

        let outcome = controller.attempt_with_location("RoomA", "u2", &location).await;
        assert_eq!(outcome.step(), AdmissionStep::Membership);
        assert_eq!(location.0.load(Ordering::SeqCst), 0);

        let outcome = controller.attempt_with_location("RoomA", "u1", &location).await;
        assert!(outcome.is_admitted());
        assert_eq!(location.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_location_failures_reject_at_geofence() {
        let store = seeded_store().await;
        let controller = controller(store);

        let denied = FixedLocation::failing(LocationError::PermissionDenied);
        let outcome = controller.attempt_with_location("RoomA", "u1", &denied).await;
        assert_eq!(
            rejected(&outcome),
            (AdmissionStep::Geofence, &RejectReason::LocationPermissionDenied)
        );

        let lost = FixedLocation::failing(LocationError::Unavailable("no fix".into()));
        let outcome = controller.attempt_with_location("RoomA", "u1", &lost).await;
        let (step, reason) = rejected(&outcome);
        assert_eq!(step, AdmissionStep::Geofence);
        assert!(reason.is_transient());
    }

    /// Delegates to a memory store but fails the selected operation.
    struct FlakyStore {
        inner: MemoryStore,
        fail_exists: bool,
        fail_insert: bool,
        report_duplicate_on_insert: bool,
    }

    impl FlakyStore {
        async fn new() -> Self {
            let inner = MemoryStore::new();
            inner
                .insert_classroom_if_absent(&Classroom {
                    id: "RoomA".into(),
                    anchor: at(1.0, 2.0),
                    created_at: morning(),
                })
                .await
                .unwrap();
            inner.put_user_profile(&student("u1", "RoomA")).await.unwrap();
            Self {
                inner,
                fail_exists: false,
                fail_insert: false,
                report_duplicate_on_insert: false,
            }
        }
    }

    #[async_trait]
    impl AttendanceStore for FlakyStore {
        fn backend_name(&self) -> &'static str {
            "flaky"
        }
        async fn get_classroom(&self, id: &str) -> StoreResult<Option<Classroom>> {
            self.inner.get_classroom(id).await
        }
        async fn list_classrooms(&self) -> StoreResult<Vec<Classroom>> {
            self.inner.list_classrooms().await
        }
        async fn insert_classroom_if_absent(&self, c: &Classroom) -> StoreResult<InsertOutcome> {
            self.inner.insert_classroom_if_absent(c).await
        }
        async fn get_user_profile(&self, id: &str) -> StoreResult<Option<UserProfile>> {
            self.inner.get_user_profile(id).await
        }
        async fn put_user_profile(&self, p: &UserProfile) -> StoreResult<()> {
            self.inner.put_user_profile(p).await
        }
        async fn list_classroom_members(&self, id: &str) -> StoreResult<Vec<UserProfile>> {
            self.inner.list_classroom_members(id).await
        }
        async fn record_exists(&self, key: &AttendanceKey) -> StoreResult<bool> {
            if self.fail_exists {
                return Err(StoreError::Unavailable("timeout".into()));
            }
            self.inner.record_exists(key).await
        }
        async fn insert_record_if_absent(&self, r: &AttendanceRecord) -> StoreResult<InsertOutcome> {
            if self.fail_insert {
                return Err(StoreError::Unavailable("connection reset".into()));
            }
            if self.report_duplicate_on_insert {
                return Ok(InsertOutcome::AlreadyExists);
            }
            self.inner.insert_record_if_absent(r).await
        }
        async fn list_records(&self, id: &str) -> StoreResult<Vec<AttendanceRecord>> {
            self.inner.list_records(id).await
        }
    }

    #[tokio::test]
    async fn test_store_failure_reports_its_step() {
        let mut store = FlakyStore::new().await;
        store.fail_exists = true;
        let outcome = controller(Arc::new(store)).attempt("RoomA", "u1", at(1.0, 2.0)).await;
        let (step, reason) = rejected(&outcome);
        assert_eq!(step, AdmissionStep::DuplicateCheck);
        assert_eq!(reason.code(), "STORE_UNAVAILABLE");

        let mut store = FlakyStore::new().await;
        store.fail_insert = true;
        let outcome = controller(Arc::new(store)).attempt("RoomA", "u1", at(1.0, 2.0)).await;
        assert_eq!(rejected(&outcome).0, AdmissionStep::Commit);
    }

    #[tokio::test]
    async fn test_lost_race_at_commit_is_already_recorded() {
        let mut store = FlakyStore::new().await;
        store.report_duplicate_on_insert = true;
        let outcome = controller(Arc::new(store)).attempt("RoomA", "u1", at(1.0, 2.0)).await;
        assert!(matches!(outcome, Outcome::AlreadyRecorded { .. }));
        assert_eq!(outcome.step(), AdmissionStep::Commit);
    }

    #[tokio::test]
    async fn test_concurrent_attempts_admit_once() {
        let store = seeded_store().await;
        let controller = controller(store.clone());

        let mut handles = Vec::new();
        for _ in 0..10 {
            let controller = controller.clone();
            handles.push(tokio::spawn(async move {
                controller.attempt("RoomA", "u1", at(1.0, 2.0)).await
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Outcome::Admitted(_) => admitted += 1,
                Outcome::AlreadyRecorded { .. } => {}
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(store.record_count().await, 1);
    }

    #[test]
    fn test_reason_messages() {
        let reason = RejectReason::OutOfRange {
            distance_m: 1111.9,
            radius_m: 50.0,
        };
        assert!(reason.to_string().contains("1112 m"));
        assert!(reason.to_string().contains("50 m"));
        assert!(!reason.is_transient());
        assert!(RejectReason::from(StoreError::Unavailable("x".into())).is_transient());
    }
}
