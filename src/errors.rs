use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use async_graphql::ErrorExtensions;
use mongodb::error::{ErrorKind, WriteFailure};
use serde::Serialize;
use thiserror::Error;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Locked: {0}")]
    Locked(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::AlreadyExists(_) => "ALREADY_EXISTS",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::Locked(_) => "LOCKED",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Store failures may succeed on a later call; nothing else will.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::DatabaseError(_))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    pub kind: &'static str,
    pub retryable: bool,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::InvalidState(_) => StatusCode::CONFLICT,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Locked(_) => StatusCode::FORBIDDEN,
            AppError::DatabaseError(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            code: self.status_code().as_u16(),
            kind: self.error_code(),
            retryable: self.is_retryable(),
        })
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            return AppError::AlreadyExists(err.to_string());
        }
        AppError::DatabaseError(err.to_string())
    }
}
impl From<mongodb::bson::ser::Error> for AppError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        AppError::InternalError(format!("BSON serialization error: {}", err))
    }
}
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}
impl From<async_graphql::Error> for AppError {
    fn from(err: async_graphql::Error) -> Self {
        AppError::InternalError(err.message)
    }
}
impl ErrorExtensions for AppError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_err, e| {
            e.set("code", self.error_code());
            e.set("retryable", self.is_retryable());
        })
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        // upserts via findAndModify report the conflict as a command error
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

pub type AppResult<T> = Result<T, AppError>;
