//! Attendance registers: who was present on which day.
//!
//! A classroom's dates are the days anyone checked in, plus today so the
//! current day always shows up even before the first scan.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::calendar::CalendarPolicy;
use crate::model::AttendanceRecord;
use crate::registry::{RegistryError, RegistryResult};
use crate::store::AttendanceStore;

/// One student's row in a classroom register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RegisterRow {
    /// Student identifier.
    pub user_id: String,

    /// Student display name.
    #[schema(example = "Ada Lovelace")]
    pub name: String,

    /// Presence per date, aligned with [`ClassroomRegister::dates`].
    pub present: Vec<bool>,
}

impl RegisterRow {
    /// Days this student was present.
    #[must_use]
    pub fn days_present(&self) -> usize {
        self.present.iter().filter(|p| **p).count()
    }
}

/// Every enrolled student against every attendance date of a classroom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "classroom_id": "RoomA",
    "dates": ["2025-01-14", "2025-01-15"],
    "rows": [
        { "user_id": "u1", "name": "Ada Lovelace", "present": [true, false] }
    ]
}))]
pub struct ClassroomRegister {
    /// Classroom identifier.
    pub classroom_id: String,

    /// Attendance dates, ascending.
    #[schema(value_type = Vec<String>)]
    pub dates: Vec<NaiveDate>,

    /// One row per enrolled student, ordered by name.
    pub rows: Vec<RegisterRow>,
}

/// One day in a student's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntry {
    /// Calendar day.
    #[schema(value_type = String, example = "2025-01-15")]
    pub date: NaiveDate,

    /// Whether the student checked in that day.
    pub present: bool,
}

/// A student's presence across their classroom's attendance dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StudentHistory {
    /// Student identifier.
    pub user_id: String,

    /// The student's classroom.
    pub classroom_id: String,

    /// One entry per date, ascending.
    pub entries: Vec<HistoryEntry>,
}

/// Builds register views from stored records.
#[derive(Clone)]
pub struct AttendanceRegister {
    store: Arc<dyn AttendanceStore>,
    calendar: CalendarPolicy,
}

impl std::fmt::Debug for AttendanceRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttendanceRegister")
            .field("store", &self.store.backend_name())
            .field("calendar", &self.calendar)
            .finish()
    }
}

/// Distinct record dates with `today` included, ascending.
fn register_dates(records: &[AttendanceRecord], today: NaiveDate) -> Vec<NaiveDate> {
    let mut dates: BTreeSet<NaiveDate> = records.iter().map(|r| r.date).collect();
    dates.insert(today);
    dates.into_iter().collect()
}

impl AttendanceRegister {
    /// Creates a register over `store`, splitting days per `calendar`.
    pub fn new(store: Arc<dyn AttendanceStore>, calendar: CalendarPolicy) -> Self {
        Self { store, calendar }
    }

    /// The register of `classroom_id` as of `now`.
    ///
    /// # Errors
    ///
    /// Fails if the classroom does not exist or the store fails.
    pub async fn classroom_register(
        &self,
        classroom_id: &str,
        now: DateTime<Utc>,
    ) -> RegistryResult<ClassroomRegister> {
        if self.store.get_classroom(classroom_id).await?.is_none() {
            return Err(RegistryError::ClassroomNotFound(classroom_id.to_string()));
        }

        let records = self.store.list_records(classroom_id).await?;
        let students = self.store.list_classroom_members(classroom_id).await?;

        let dates = register_dates(&records, self.calendar.today(now));
        let seen: HashSet<(NaiveDate, &str)> = records
            .iter()
            .map(|r| (r.date, r.user_id.as_str()))
            .collect();

        let rows = students
            .into_iter()
            .map(|student| {
                let present = dates
                    .iter()
                    .map(|date| seen.contains(&(*date, student.id.as_str())))
                    .collect();
                RegisterRow {
                    user_id: student.id,
                    name: student.name,
                    present,
                }
            })
            .collect();

        Ok(ClassroomRegister {
            classroom_id: classroom_id.to_string(),
            dates,
            rows,
        })
    }

    /// The attendance history of `user_id` as of `now`.
    ///
    /// # Errors
    ///
    /// Fails if the user has no profile or no classroom, or the store fails.
    pub async fn student_history(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> RegistryResult<StudentHistory> {
        let profile = self
            .store
            .get_user_profile(user_id)
            .await?
            .ok_or_else(|| RegistryError::UserNotFound(user_id.to_string()))?;
        let classroom_id = profile
            .classroom_id
            .ok_or_else(|| RegistryError::NoClassroomAssigned(user_id.to_string()))?;

        let records = self.store.list_records(&classroom_id).await?;
        let mine: HashSet<NaiveDate> = records
            .iter()
            .filter(|r| r.user_id == profile.id)
            .map(|r| r.date)
            .collect();

        let entries = register_dates(&records, self.calendar.today(now))
            .into_iter()
            .map(|date| HistoryEntry {
                date,
                present: mine.contains(&date),
            })
            .collect();

        Ok(StudentHistory {
            user_id: profile.id,
            classroom_id,
            entries,
        })
    }
}
