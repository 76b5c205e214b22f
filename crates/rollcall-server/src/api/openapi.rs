//! OpenAPI specification for the rollcall API.
//!
//! Served at `/api/openapi.json` and written to disk by the `gen-openapi`
//! binary for client generation.

use axum::Json;
use rollcall_core::{
    AdmissionStep, Classroom, ClassroomRegister, Coordinate, HistoryEntry, RegisterRow,
    StudentHistory, UserProfile,
};
use utoipa::OpenApi;

use super::classrooms::{
    ClassroomListResponse, CreateClassroomRequest, EnrollStudentRequest, StudentListResponse,
};
use super::error::ErrorResponse;
use super::health::HealthResponse;
use super::scan::{ScanRequest, ScanResponse, ScanStatus};

/// Serve the OpenAPI specification as JSON.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> serde_json::Result<String> {
    ApiDoc::openapi().to_pretty_json()
}

/// Main OpenAPI document structure for rollcall.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "rollcall API",
        version = "0.1.0",
        description = r#"
# rollcall API

rollcall records classroom attendance by QR code, at most once per student per day.

## Overview

1. **Classrooms**: an administrator creates a classroom while standing in it. The
   position sent at creation becomes the classroom's geofence anchor.
2. **Enrollment**: students are enrolled by name into exactly one classroom.
3. **Check-in**: a student scans the classroom's QR code. The scan is admitted only
   if the classroom exists, the student belongs to it, the student is within the
   geofence radius, and the student has not already checked in today.
4. **Registers**: per-classroom attendance matrices and per-student histories.

## Rejections

A rejected scan returns an error body whose `details.step` names the check that
failed: `classroom_existence`, `membership`, `geofence`, `duplicate_check` or
`commit`. Scanning twice on the same day is not an error and returns `200` with
`status: already_recorded`.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local rollcall server")
    ),
    tags(
        (name = "system", description = "Health checks"),
        (name = "attendance", description = "Check-in and attendance registers"),
        (name = "classrooms", description = "Classroom creation and student enrollment")
    ),
    paths(
        // Health endpoints
        super::health::health_check,
        // Attendance endpoints
        super::scan::scan,
        super::classrooms::classroom_attendance,
        super::users::user_attendance,
        // Classroom endpoints
        super::classrooms::list_classrooms,
        super::classrooms::create_classroom,
        super::classrooms::list_students,
        super::classrooms::enroll_student,
    ),
    components(
        schemas(
            // Error types
            ErrorResponse,
            // Health types
            HealthResponse,
            // Attendance types
            ScanRequest,
            ScanResponse,
            ScanStatus,
            AdmissionStep,
            ClassroomRegister,
            RegisterRow,
            StudentHistory,
            HistoryEntry,
            // Classroom types
            Coordinate,
            Classroom,
            UserProfile,
            CreateClassroomRequest,
            ClassroomListResponse,
            EnrollStudentRequest,
            StudentListResponse,
        )
    )
)]
pub struct ApiDoc;
