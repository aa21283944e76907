//! Mapping from handler failures to HTTP status codes and error envelopes.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use scribe_db::{DbError, ErrorKind};
use scribe_types::envelope::{ErrorCode, ErrorEnvelope};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("{0}")]
    BadRequest(String),

    /// Field name to message.
    #[error("request failed validation")]
    Validation(BTreeMap<String, String>),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Expired(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Db(err) => db_status(err.kind()),
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized(_) | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Expired(_) => StatusCode::GONE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn envelope(&self) -> ErrorEnvelope {
        match self {
            Self::Db(err) => db_envelope(err),
            Self::BadRequest(msg) => ErrorEnvelope::new(ErrorCode::BadRequest, json!(msg)),
            Self::Validation(fields) => {
                ErrorEnvelope::new(ErrorCode::ValidationError, json!(fields))
            }
            Self::Unauthorized(msg) => ErrorEnvelope::new(ErrorCode::Unauthorized, json!(msg)),
            Self::InvalidCredentials => {
                ErrorEnvelope::new(ErrorCode::Unauthorized, json!(self.to_string()))
            }
            Self::Forbidden(msg) => ErrorEnvelope::new(ErrorCode::Forbidden, json!(msg)),
            Self::Expired(msg) => ErrorEnvelope::new(ErrorCode::Expired, json!(msg)),
            Self::Internal(_) => internal_envelope(),
        }
    }
}

fn db_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::RecordNotFound => StatusCode::NOT_FOUND,
        ErrorKind::DuplicateKey | ErrorKind::EditConflict => StatusCode::CONFLICT,
        ErrorKind::CheckConstraint | ErrorKind::ForeignKeyViolation => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::ConnectionFailed | ErrorKind::Uncategorized => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn db_envelope(err: &DbError) -> ErrorEnvelope {
    let (code, message) = match err.kind() {
        ErrorKind::RecordNotFound => (
            ErrorCode::NotFound,
            "the requested resource could not be found",
        ),
        ErrorKind::DuplicateKey => (ErrorCode::DuplicateEntry, "a record with this value already exists"),
        ErrorKind::EditConflict => (
            ErrorCode::DuplicateEntry,
            "the record was changed by another request, please retry",
        ),
        ErrorKind::CheckConstraint => (ErrorCode::ValidationError, "the change is not allowed"),
        ErrorKind::ForeignKeyViolation => (
            ErrorCode::ValidationError,
            "a referenced record does not exist",
        ),
        ErrorKind::InvalidInput => (ErrorCode::InvalidInput, "the request contains an invalid value"),
        ErrorKind::ConnectionFailed | ErrorKind::Uncategorized => return internal_envelope(),
    };
    ErrorEnvelope::new(code, json!(message))
        .detail("operation", err.operation())
        .detail("detail", err.detail())
}

fn internal_envelope() -> ErrorEnvelope {
    ErrorEnvelope::new(
        ErrorCode::InternalError,
        json!("the server encountered a problem and could not process your request"),
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(self.envelope())).into_response()
    }
}
