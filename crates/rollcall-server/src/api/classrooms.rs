//! Classroom management API endpoints.
//!
//! Administrators create a classroom from inside it: the client sends its own
//! position and that becomes the classroom's geofence anchor. Students are then
//! enrolled by name and the attendance register can be read back.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use rollcall_core::{
    Classroom, ClassroomRegister, Coordinate, FixedLocation, RollcallError, UserProfile,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::ApiResult;
use crate::state::SharedState;

/// Creates the classrooms router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_classrooms).post(create_classroom))
        .route("/{id}/students", get(list_students).post(enroll_student))
        .route("/{id}/attendance", get(classroom_attendance))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a classroom.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "RoomA",
    "latitude": 51.5074,
    "longitude": -0.1278
}))]
pub struct CreateClassroomRequest {
    /// Classroom ID, also the payload of its QR code. Cannot be changed later.
    #[schema(example = "RoomA", max_length = 64)]
    pub id: String,

    /// Administrator's current latitude.
    #[schema(minimum = -90.0, maximum = 90.0)]
    pub latitude: f64,

    /// Administrator's current longitude.
    #[schema(minimum = -180.0, maximum = 180.0)]
    pub longitude: f64,
}

/// All classrooms.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClassroomListResponse {
    /// Classrooms ordered by ID.
    pub classrooms: Vec<Classroom>,
}

/// Request body for enrolling a student.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({ "name": "Ada Lovelace" }))]
pub struct EnrollStudentRequest {
    /// Student's full name. The email address is derived from it.
    #[schema(example = "Ada Lovelace", min_length = 1)]
    pub name: String,
}

/// Students of one classroom.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentListResponse {
    /// Classroom ID.
    #[schema(example = "RoomA")]
    pub classroom_id: String,

    /// Enrolled students ordered by name.
    pub students: Vec<UserProfile>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List all classrooms.
#[utoipa::path(
    get,
    path = "/api/classrooms",
    tag = "classrooms",
    operation_id = "listClassrooms",
    summary = "List classrooms",
    responses(
        (status = 200, description = "Classrooms retrieved", body = ClassroomListResponse),
        (status = 503, description = "Attendance store unavailable", body = super::error::ErrorResponse)
    )
)]
pub async fn list_classrooms(
    State(state): State<SharedState>,
) -> ApiResult<Json<ClassroomListResponse>> {
    let classrooms = state.registry().list_classrooms().await?;
    Ok(Json(ClassroomListResponse { classrooms }))
}

/// Create a classroom at the administrator's position.
#[utoipa::path(
    post,
    path = "/api/classrooms",
    tag = "classrooms",
    operation_id = "createClassroom",
    summary = "Create a classroom",
    description = "Creates a classroom whose geofence anchor is the position sent \
        in the request. Classroom IDs are permanent: creating an ID that already \
        exists fails and leaves the existing anchor untouched.",
    request_body = CreateClassroomRequest,
    responses(
        (status = 201, description = "Classroom created", body = Classroom),
        (status = 400, description = "Missing or invalid ID, or coordinates out of range", body = super::error::ErrorResponse),
        (status = 409, description = "Classroom ID already taken", body = super::error::ErrorResponse)
    )
)]
pub async fn create_classroom(
    State(state): State<SharedState>,
    Json(request): Json<CreateClassroomRequest>,
) -> ApiResult<(StatusCode, Json<Classroom>)> {
    let anchor = Coordinate::new(request.latitude, request.longitude).ok_or(
        RollcallError::InvalidCoordinate {
            latitude: request.latitude,
            longitude: request.longitude,
        },
    )?;

    let classroom = state
        .registry()
        .create_classroom(&request.id, &FixedLocation::at(anchor))
        .await?;

    Ok((StatusCode::CREATED, Json(classroom)))
}

/// List students enrolled in a classroom.
#[utoipa::path(
    get,
    path = "/api/classrooms/{id}/students",
    tag = "classrooms",
    operation_id = "listStudents",
    summary = "List enrolled students",
    params(("id" = String, Path, description = "Classroom ID")),
    responses(
        (status = 200, description = "Students retrieved", body = StudentListResponse),
        (status = 404, description = "Classroom not found", body = super::error::ErrorResponse)
    )
)]
pub async fn list_students(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<StudentListResponse>> {
    let students = state.registry().list_students(&id).await?;
    Ok(Json(StudentListResponse {
        classroom_id: id,
        students,
    }))
}

/// Enroll a student into a classroom.
#[utoipa::path(
    post,
    path = "/api/classrooms/{id}/students",
    tag = "classrooms",
    operation_id = "enrollStudent",
    summary = "Enroll a student",
    description = "Creates a student profile in the classroom. The email address is \
        the name without whitespace, lower-cased, at the configured domain.",
    params(("id" = String, Path, description = "Classroom ID")),
    request_body = EnrollStudentRequest,
    responses(
        (status = 201, description = "Student enrolled", body = UserProfile),
        (status = 400, description = "Name is empty", body = super::error::ErrorResponse),
        (status = 404, description = "Classroom not found", body = super::error::ErrorResponse)
    )
)]
pub async fn enroll_student(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(request): Json<EnrollStudentRequest>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    let profile = state.registry().enroll_student(&id, &request.name).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Get the attendance register of a classroom.
#[utoipa::path(
    get,
    path = "/api/classrooms/{id}/attendance",
    tag = "attendance",
    operation_id = "getClassroomAttendance",
    summary = "Get a classroom's attendance register",
    description = "Returns every date with at least one check-in plus today, and \
        one row per enrolled student marking the dates they were present.",
    params(("id" = String, Path, description = "Classroom ID")),
    responses(
        (status = 200, description = "Register retrieved", body = ClassroomRegister),
        (status = 404, description = "Classroom not found", body = super::error::ErrorResponse)
    )
)]
pub async fn classroom_attendance(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ClassroomRegister>> {
    let now = state.clock().now();
    let register = state.register().classroom_register(&id, now).await?;
    Ok(Json(register))
}
