use crate::services::error::{ErrorKind, ServiceError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// HTTP-facing error: a status plus a message that is safe to show users.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err.kind() {
            ErrorKind::NotFound => AppError::new(StatusCode::NOT_FOUND, err.to_string()),
            ErrorKind::NotAuthorized => AppError::new(StatusCode::FORBIDDEN, err.to_string()),
            ErrorKind::Validation => AppError::bad_request(err.to_string()),
            ErrorKind::Conflict => AppError::new(StatusCode::CONFLICT, err.to_string()),
            ErrorKind::StorageFailure => {
                tracing::error!("storage failure: {}", err);
                AppError::internal("internal storage failure")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::error::Access;
    use uuid::Uuid;

    #[test]
    fn kinds_map_to_stable_statuses() {
        let id = Uuid::new_v4();
        let cases = [
            (ServiceError::ImageNotFound(id), StatusCode::NOT_FOUND),
            (ServiceError::NotAuthorized(Access::Read), StatusCode::FORBIDDEN),
            (ServiceError::validation("bad"), StatusCode::BAD_REQUEST),
            (
                ServiceError::Conflict {
                    expected: id,
                    current: None,
                },
                StatusCode::CONFLICT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status, status);
        }
    }

    #[test]
    fn storage_errors_are_not_leaked() {
        let err = AppError::from(ServiceError::Storage(sqlx::Error::PoolTimedOut));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "internal storage failure");
    }
}
