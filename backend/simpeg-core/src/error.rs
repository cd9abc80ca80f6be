// src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::attendance::AttendanceError;
use crate::store::StoreError;
use crate::validation::ValidationErrors;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Report export failed: {0}")]
    Export(String),

    #[error("Missing or unknown session")]
    Unauthorized,

    #[error("Role '{0}' cannot use this portal")]
    Forbidden(String),
}

impl AppError {
    pub fn not_found(kind: &'static str, id: &str) -> Self {
        AppError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Store(_) | AppError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl From<AttendanceError> for AppError {
    fn from(err: AttendanceError) -> Self {
        match err {
            AttendanceError::InvalidMonth(value) => AppError::Validation(ValidationErrors::single(
                "month",
                &format!("'{}' is not a YYYY-MM month", value),
            )),
            AttendanceError::UnknownEmployee(id) => AppError::not_found("Employee", &id),
            other => AppError::Export(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected ({}): {}", status.as_u16(), self);
        }

        let body = match &self {
            AppError::Validation(errors) => json!({
                "error": "Validation failed",
                "fields": errors.errors,
            }),
            // Storage details stay in the log
            AppError::Store(_) => json!({ "error": "Failed to save data. Previous state kept." }),
            AppError::Export(_) => json!({ "error": "Failed to export report." }),
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;

    #[test]
    fn errors_map_to_status_codes() {
        assert_eq!(
            AppError::from(ValidationErrors::single("name", "is required")).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(AppError::not_found("Employee", "e9").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Conflict("dup".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(StoreError::Storage(StorageError::ReadOnly)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Forbidden("user".into()).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn attendance_errors_are_translated() {
        let invalid = AppError::from(AttendanceError::InvalidMonth("2024-13".into()));
        assert!(matches!(&invalid, AppError::Validation(e) if e.has_field("month")));

        let unknown = AppError::from(AttendanceError::UnknownEmployee("e9".into()));
        assert_eq!(unknown.to_string(), "Employee not found: e9");
    }
}
