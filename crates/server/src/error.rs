use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use cleanops_api::{ApiError, FieldErrors, ServiceError};

/// Unified API error type.
///
/// Renders `{"error", "message"?, "details"?, "statusCode"}`. When a machine
/// code is set it goes in `error` and the human text moves to `message`.
#[derive(Debug)]
pub struct ApiErr {
    status: StatusCode,
    message: String,
    code: Option<&'static str>,
    details: Option<FieldErrors>,
}

impl ApiErr {
    fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            code: None,
            details: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Build a closure that logs a DB/IO error and returns `500 Internal Server Error`.
    pub fn from_db<E: fmt::Display>(context: &str) -> impl FnOnce(E) -> Self + '_ {
        move |e| {
            tracing::error!("{context}: {e}");
            Self::internal("internal server error")
        }
    }
}

impl From<ServiceError> for ApiErr {
    fn from(e: ServiceError) -> Self {
        if let ServiceError::Internal(msg) = &e {
            tracing::error!("{msg}");
            return Self::internal("internal server error");
        }
        let status =
            StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            message: e.message().to_string(),
            code: e.code(),
            details: e.details().cloned(),
        }
    }
}

impl From<JsonRejection> for ApiErr {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        let body = match self.code {
            Some(code) => ApiError {
                error: code.to_string(),
                message: Some(self.message),
                details: None,
                status_code: self.status.as_u16(),
            },
            None => ApiError {
                error: self.message,
                message: None,
                details: self.details,
                status_code: self.status.as_u16(),
            },
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_hide_details() {
        let err = ApiErr::from(ServiceError::Internal("disk on fire".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "internal server error");
    }

    #[test]
    fn clock_conflicts_keep_their_code() {
        let err = ApiErr::from(ServiceError::AlreadyClockedIn("busy".into()));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code, Some("AlreadyClockedIn"));
    }

    #[test]
    fn validation_keeps_field_errors() {
        let mut errs = FieldErrors::default();
        errs.push("title", "required");
        let err = ApiErr::from(ServiceError::Invalid(errs));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.details.is_some_and(|d| d.contains("title")));
    }
}
