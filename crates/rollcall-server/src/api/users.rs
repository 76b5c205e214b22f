//! Per-user attendance endpoint.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use rollcall_core::StudentHistory;

use crate::api::error::ApiResult;
use crate::state::SharedState;

/// Creates the users router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/{id}/attendance", get(user_attendance))
}

/// Get a student's attendance history.
#[utoipa::path(
    get,
    path = "/api/users/{id}/attendance",
    tag = "attendance",
    operation_id = "getUserAttendance",
    summary = "Get a student's attendance history",
    description = "Lists every attendance date of the student's classroom, plus \
        today, with whether the student was present.",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "History retrieved", body = StudentHistory),
        (status = 404, description = "User not found", body = super::error::ErrorResponse),
        (status = 422, description = "User is not enrolled in a classroom", body = super::error::ErrorResponse)
    )
)]
pub async fn user_attendance(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<StudentHistory>> {
    let now = state.clock().now();
    let history = state.register().student_history(&id, now).await?;
    Ok(Json(history))
}
