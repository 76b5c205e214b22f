//! Check-in endpoint.
//!
//! A student's device scans the classroom QR code and posts the decoded
//! classroom ID together with its current position. The admission pipeline
//! decides whether that becomes today's attendance record.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use rollcall_core::{Coordinate, Outcome, RollcallError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::{ApiError, ApiResult};
use crate::state::SharedState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// A check-in attempt.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "classroom_id": "RoomA",
    "user_id": "0b6f1c2e-2f55-4c8e-9d63-0f4b8a0c2d11",
    "latitude": 51.5074,
    "longitude": -0.1278
}))]
pub struct ScanRequest {
    /// Classroom ID decoded from the QR code.
    #[schema(example = "RoomA")]
    pub classroom_id: String,

    /// The user checking in.
    pub user_id: String,

    /// Current latitude in degrees.
    #[schema(minimum = -90.0, maximum = 90.0)]
    pub latitude: f64,

    /// Current longitude in degrees.
    #[schema(minimum = -180.0, maximum = 180.0)]
    pub longitude: f64,
}

/// How a successful scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// A new attendance record was written.
    Admitted,
    /// The user was already marked present today.
    AlreadyRecorded,
}

/// Result of a successful scan.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "status": "admitted",
    "classroom_id": "RoomA",
    "user_id": "0b6f1c2e-2f55-4c8e-9d63-0f4b8a0c2d11",
    "date": "2025-01-15",
    "captured_at": "2025-01-15T09:02:11Z"
}))]
pub struct ScanResponse {
    /// Whether this scan created the record.
    pub status: ScanStatus,

    /// Classroom checked into.
    pub classroom_id: String,

    /// The user checked in.
    pub user_id: String,

    /// Attendance day.
    #[schema(value_type = String, example = "2025-01-15")]
    pub date: NaiveDate,

    /// When the record was captured. Absent for repeat scans.
    #[schema(nullable)]
    pub captured_at: Option<DateTime<Utc>>,
}

impl ScanResponse {
    /// Maps a non-rejected outcome to a status code and body.
    fn from_outcome(outcome: Outcome) -> Result<(StatusCode, Self), ApiError> {
        match outcome {
            Outcome::Admitted(record) => Ok((
                StatusCode::CREATED,
                Self {
                    status: ScanStatus::Admitted,
                    classroom_id: record.classroom_id,
                    user_id: record.user_id,
                    date: record.date,
                    captured_at: Some(record.captured_at),
                },
            )),
            Outcome::AlreadyRecorded { key, .. } => Ok((
                StatusCode::OK,
                Self {
                    status: ScanStatus::AlreadyRecorded,
                    classroom_id: key.classroom_id,
                    user_id: key.user_id,
                    date: key.date,
                    captured_at: None,
                },
            )),
            Outcome::Rejected { step, reason } => Err(ApiError::rejected(step, &reason)),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Check into a classroom.
#[utoipa::path(
    post,
    path = "/api/scan",
    tag = "attendance",
    operation_id = "scan",
    summary = "Check into a classroom",
    description = "Runs the admission pipeline: the classroom must exist, the user \
        must be enrolled in it, the position must be within the geofence radius of \
        the classroom anchor, and the user must not already be marked present today. \
        Rejections name the step that failed in `details.step`.",
    request_body = ScanRequest,
    responses(
        (status = 201, description = "Attendance recorded", body = ScanResponse),
        (status = 200, description = "Already marked present today", body = ScanResponse),
        (status = 400, description = "Coordinates out of range", body = super::error::ErrorResponse),
        (status = 403, description = "Wrong classroom or outside the geofence", body = super::error::ErrorResponse),
        (status = 404, description = "Unknown classroom or missing user profile", body = super::error::ErrorResponse),
        (status = 503, description = "Attendance store unavailable", body = super::error::ErrorResponse)
    )
)]
pub async fn scan(
    State(state): State<SharedState>,
    Json(request): Json<ScanRequest>,
) -> ApiResult<(StatusCode, Json<ScanResponse>)> {
    let current = Coordinate::new(request.latitude, request.longitude).ok_or(
        RollcallError::InvalidCoordinate {
            latitude: request.latitude,
            longitude: request.longitude,
        },
    )?;

    let outcome = state
        .admission()
        .attempt(&request.classroom_id, &request.user_id, current)
        .await;

    let (status, body) = ScanResponse::from_outcome(outcome)?;
    Ok((status, Json(body)))
}

#[cfg(test)]
mod tests {
    use rollcall_core::{AdmissionStep, AttendanceKey, AttendanceRecord, RejectReason};

    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    #[test]
    fn test_scan_request_deserialization() {
        let json = r#"{"classroom_id":"RoomA","user_id":"u1","latitude":1.0,"longitude":2.0}"#;
        let request: ScanRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.classroom_id, "RoomA");
        assert!((request.longitude - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_admitted_is_created() {
        let record = AttendanceRecord::new(AttendanceKey::new("RoomA", day(), "u1"), Utc::now());
        let (status, body) = ScanResponse::from_outcome(Outcome::Admitted(record)).unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.status, ScanStatus::Admitted);
        assert!(body.captured_at.is_some());
    }

    #[test]
    fn test_already_recorded_is_ok() {
        let outcome = Outcome::AlreadyRecorded {
            key: AttendanceKey::new("RoomA", day(), "u1"),
            step: AdmissionStep::DuplicateCheck,
        };
        let (status, body) = ScanResponse::from_outcome(outcome).unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, ScanStatus::AlreadyRecorded);
        assert_eq!(body.date, day());
        assert!(body.captured_at.is_none());
    }

    #[test]
    fn test_rejection_becomes_error() {
        let outcome = Outcome::Rejected {
            step: AdmissionStep::Membership,
            reason: RejectReason::WrongClassroom {
                scanned: "RoomA".into(),
                enrolled: None,
            },
        };
        let err = ScanResponse::from_outcome(outcome).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ScanStatus::AlreadyRecorded).unwrap(),
            "\"already_recorded\""
        );
    }
}
