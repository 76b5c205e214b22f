//! API error types and response handling.
//!
//! Every handler failure becomes an [`ApiError`], which renders as an HTTP
//! status plus a JSON [`ErrorResponse`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rollcall_core::{AdmissionStep, RegistryError, RejectReason, RollcallError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// 400 Bad Request - Invalid input from client.
    BadRequest {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 403 Forbidden - The request is understood but not allowed for this user.
    Forbidden {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
        /// Optional additional details.
        details: Option<Value>,
    },

    /// 404 Not Found - Resource does not exist.
    NotFound {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
        /// Optional additional details.
        details: Option<Value>,
    },

    /// 409 Conflict - Operation cannot be completed due to current state.
    Conflict {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 422 Unprocessable Entity - Well-formed request that cannot be acted on.
    Unprocessable {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
        /// Optional additional details.
        details: Option<Value>,
    },

    /// 500 Internal Server Error - Unexpected server-side error.
    InternalError {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 503 Service Unavailable - The attendance store cannot be reached.
    ServiceUnavailable {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
        /// Optional additional details.
        details: Option<Value>,
    },
}

/// Standard JSON error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "OUT_OF_RANGE",
    "message": "You are 1112 m from the classroom; scans must be within 50 m.",
    "details": { "step": "geofence", "distance_m": 1111.95, "radius_m": 50.0 }
}))]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "WRONG_CLASSROOM").
    #[schema(example = "WRONG_CLASSROOM")]
    pub error: String,

    /// Human-readable error message.
    #[schema(example = "You do not belong to classroom 'RoomA'.")]
    pub message: String,

    /// Optional additional details.
    #[schema(nullable)]
    pub details: Option<Value>,
}

impl ApiError {
    /// Builds the error for an admission attempt rejected at `step`.
    #[must_use]
    pub fn rejected(step: AdmissionStep, reason: &RejectReason) -> Self {
        let error_code = reason.code().to_string();
        let message = reason.to_string();

        let mut details = json!({ "step": step });
        match reason {
            RejectReason::OutOfRange {
                distance_m,
                radius_m,
            } => {
                details["distance_m"] = json!(distance_m);
                details["radius_m"] = json!(radius_m);
            }
            RejectReason::WrongClassroom { enrolled, .. } => {
                details["enrolled_classroom_id"] = json!(enrolled);
            }
            _ => {}
        }
        let details = Some(details);

        match reason {
            RejectReason::UnknownClassroom { .. } | RejectReason::MissingUserProfile { .. } => {
                Self::NotFound {
                    error_code,
                    message,
                    details,
                }
            }
            RejectReason::WrongClassroom { .. }
            | RejectReason::OutOfRange { .. }
            | RejectReason::LocationPermissionDenied => Self::Forbidden {
                error_code,
                message,
                details,
            },
            RejectReason::LocationUnavailable(_) => Self::Unprocessable {
                error_code,
                message,
                details,
            },
            RejectReason::StoreUnavailable(_) => Self::ServiceUnavailable {
                error_code,
                message,
                details,
            },
        }
    }

    /// The HTTP status this error renders with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::BadRequest {
                error_code,
                message,
            }
            | Self::Conflict {
                error_code,
                message,
            } => ErrorResponse {
                error: error_code,
                message,
                details: None,
            },

            Self::InternalError {
                error_code,
                message,
            } => {
                tracing::error!(error_code = %error_code, message = %message, "Internal server error");
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                }
            }

            Self::Forbidden {
                error_code,
                message,
                details,
            }
            | Self::NotFound {
                error_code,
                message,
                details,
            }
            | Self::Unprocessable {
                error_code,
                message,
                details,
            }
            | Self::ServiceUnavailable {
                error_code,
                message,
                details,
            } => ErrorResponse {
                error: error_code,
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest { message, .. } => write!(f, "Bad Request: {message}"),
            Self::Forbidden { message, .. } => write!(f, "Forbidden: {message}"),
            Self::NotFound { message, .. } => write!(f, "Not Found: {message}"),
            Self::Conflict { message, .. } => write!(f, "Conflict: {message}"),
            Self::Unprocessable { message, .. } => write!(f, "Unprocessable: {message}"),
            Self::InternalError { message, .. } => write!(f, "Internal Error: {message}"),
            Self::ServiceUnavailable { message, .. } => {
                write!(f, "Service Unavailable: {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl From<RollcallError> for ApiError {
    fn from(err: RollcallError) -> Self {
        let error_code = err.error_code().to_string();
        let message = err.to_string();

        match err.http_status_code() {
            400 => Self::BadRequest {
                error_code,
                message,
            },
            403 => Self::Forbidden {
                error_code,
                message,
                details: None,
            },
            404 => Self::NotFound {
                error_code,
                message,
                details: None,
            },
            409 => Self::Conflict {
                error_code,
                message,
            },
            422 => Self::Unprocessable {
                error_code,
                message,
                details: None,
            },
            503 => Self::ServiceUnavailable {
                error_code,
                message,
                details: None,
            },
            _ => Self::InternalError {
                error_code,
                message,
            },
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        Self::from(RollcallError::from(err))
    }
}
