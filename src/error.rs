use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    DuplicateName(String),

    #[error("{0}")]
    ReferentialIntegrity(String),

    #[error("external service error: {0}")]
    ExternalService(String),

    #[error("external service timed out")]
    Timeout,

    #[error("invalid response from external service: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateName(_) | AppError::ReferentialIntegrity(_) => StatusCode::CONFLICT,
            AppError::ExternalService(_) | AppError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Persistence(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// Postgres SQLSTATE codes for constraint violations.
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";
const NUMERIC_OUT_OF_RANGE: &str = "22003";

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error() {
            match db.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    return AppError::DuplicateName("a record with this name already exists".into())
                }
                Some(FOREIGN_KEY_VIOLATION) => {
                    return AppError::ReferentialIntegrity(
                        "record is still referenced by other records".into(),
                    )
                }
                Some(CHECK_VIOLATION) | Some(NUMERIC_OUT_OF_RANGE) => {
                    return AppError::Validation("value is out of the allowed range".into())
                }
                _ => {}
            }
        }
        AppError::Persistence(e.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(format!("{e:#}"))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Persistence(detail) => {
                error!(error = %detail, "persistence failure");
                "internal server error".to_string()
            }
            AppError::Internal(detail) => {
                error!(error = %detail, "internal failure");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
