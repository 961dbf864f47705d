use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::policy::DenyPayload;

/// Status returned when the policy rejects the submitted address.
pub const DENY_STATUS: StatusCode = StatusCode::UNPROCESSABLE_ENTITY;

impl IntoResponse for DenyPayload {
    /// 422 with the payload as JSON.
    fn into_response(self) -> Response {
        (DENY_STATUS, Json(self)).into_response()
    }
}
