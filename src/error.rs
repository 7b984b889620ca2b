use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt::Display;

use crate::nas::{FailureKind, NasError, RemoteStoreError};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "resource not found")
    }

    pub fn internal<E: Display>(error: E) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn store_failure(kind: FailureKind, message: &str) -> AppError {
    let prefix = match kind {
        FailureKind::Unreachable | FailureKind::Timeout => "file store unreachable",
        FailureKind::Unauthorized => "file store rejected credentials",
        FailureKind::Unknown => "file store upload failed",
    };
    AppError::new(StatusCode::BAD_GATEWAY, format!("{prefix}: {message}"))
}

impl From<NasError> for AppError {
    fn from(value: NasError) -> Self {
        match value {
            NasError::NotFound(message) => AppError::new(StatusCode::NOT_FOUND, message),
            NasError::InvalidInput(message) => AppError::bad_request(message),
            NasError::Misconfigured(message) => {
                AppError::new(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            NasError::UploadFailed { kind, message } => store_failure(kind, &message),
            NasError::RemoteStore(RemoteStoreError::NotFound(path)) => {
                AppError::new(StatusCode::NOT_FOUND, format!("file {path} is missing on the NAS"))
            }
            NasError::RemoteStore(RemoteStoreError::Failed { kind, message }) => {
                AppError::new(StatusCode::BAD_GATEWAY, format!("file store {kind}: {message}"))
            }
            NasError::Index(err) => AppError::internal(err),
        }
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(value: diesel::result::Error) -> Self {
        match value {
            diesel::result::Error::NotFound => AppError::not_found(),
            _ => AppError::internal(value),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::internal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_failures_name_the_failing_side() {
        let unreachable: AppError = NasError::UploadFailed {
            kind: FailureKind::Timeout,
            message: "ftp store did not answer within 5s".into(),
        }
        .into();
        assert_eq!(unreachable.status(), StatusCode::BAD_GATEWAY);
        assert!(unreachable.message().starts_with("file store unreachable:"));

        let rejected: AppError = NasError::UploadFailed {
            kind: FailureKind::Unauthorized,
            message: "401".into(),
        }
        .into();
        assert!(rejected
            .message()
            .starts_with("file store rejected credentials:"));
    }

    #[test]
    fn misconfiguration_is_a_server_error() {
        let err: AppError = NasError::Misconfigured("no NAS store".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let err: AppError = NasError::NotFound("gone".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
