//! HTTP API routes and handlers.
//!
//! - `scan` - Classroom check-in
//! - `classrooms` - Classroom creation, enrollment, and registers
//! - `users` - Per-student attendance history
//! - `health` - Service health checks
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

pub mod classrooms;
pub mod error;
pub mod health;
pub mod openapi;
pub mod scan;
pub mod users;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                          - Health check
/// /api
/// ├── /scan                        - Check into a classroom
/// ├── /classrooms                  - List and create classrooms
/// │   ├── /{id}/students           - List and enroll students
/// │   └── /{id}/attendance         - Classroom register
/// ├── /users/{id}/attendance       - Student history
/// └── /openapi.json                - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                .route("/scan", post(scan::scan))
                .route("/openapi.json", get(openapi::get_openapi_spec))
                .nest("/classrooms", classrooms::router())
                .nest("/users", users::router()),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
