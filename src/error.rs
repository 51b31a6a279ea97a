//! Error reporting shared by every route.
//!
//! DESIGN
//! ======
//! Services return their own `thiserror` enums. Each implements `ErrorCode`
//! so routes can turn any of them into an `ApiError`, which renders one
//! human-readable message plus a grepable code:
//!
//! ```json
//! { "error": "task not found", "code": "E_NOT_FOUND" }
//! ```
//!
//! Database failures are logged in full and reported with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

/// Grepable error code for structured error bodies.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    code: &'a str,
}

/// HTTP status for a grepable error code.
#[must_use]
pub fn status_for_code(code: &str) -> StatusCode {
    match code {
        "E_NOT_FOUND" => StatusCode::NOT_FOUND,
        "E_FORBIDDEN" => StatusCode::FORBIDDEN,
        "E_INVALID" => StatusCode::BAD_REQUEST,
        "E_CONFLICT" => StatusCode::CONFLICT,
        "E_UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into() }
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "E_UNAUTHORIZED", "authentication required")
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "E_FORBIDDEN", message)
    }

    /// Convert a typed service error. Server-side failures are logged and
    /// their details withheld from the client.
    #[must_use]
    pub fn from_error(err: &(impl ErrorCode + ?Sized)) -> Self {
        let code = err.error_code();
        let status = status_for_code(code);
        if status.is_server_error() {
            tracing::error!(error = %err, code, "request failed");
            return Self { status, code, message: "something went wrong, please try again".to_owned() };
        }
        Self { status, code, message: err.to_string() }
    }
}

impl<E> From<E> for ApiError
where
    E: ErrorCode,
{
    fn from(err: E) -> Self {
        Self::from_error(&err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: &self.message, code: self.code };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
