//! Translation of rusqlite failures into a closed set of domain error kinds.
//!
//! Every store operation funnels its failure through [`classify`] together
//! with a short operation tag (`"article_create"`, `"tag_deletebyid"`, ...).
//! Callers match on [`DbError::kind`], never on message text.

use std::fmt;

use rusqlite::ErrorCode;
use rusqlite::ffi;
use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Zero rows where exactly one was expected.
    RecordNotFound,
    /// Integrity violation without a more specific classification.
    EditConflict,
    DuplicateKey,
    ForeignKeyViolation,
    CheckConstraint,
    /// A value that cannot be represented at the storage boundary.
    InvalidInput,
    /// The connection or transaction can no longer be used, including
    /// statements interrupted by an expired or cancelled deadline.
    ConnectionFailed,
    Uncategorized,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RecordNotFound => "record not found",
            Self::EditConflict => "edit conflict",
            Self::DuplicateKey => "duplicate key value violates unique constraint",
            Self::ForeignKeyViolation => "foreign key violation",
            Self::CheckConstraint => "check constraint violation",
            Self::InvalidInput => "invalid input syntax",
            Self::ConnectionFailed => "connection failed",
            Self::Uncategorized => "uncategorized database error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("database error during {operation}: {kind} - {detail}")]
pub struct DbError {
    kind: ErrorKind,
    operation: &'static str,
    detail: String,
    #[source]
    source: Option<rusqlite::Error>,
}

impl DbError {
    pub fn new(kind: ErrorKind, operation: &'static str, detail: impl Into<String>) -> Self {
        Self {
            kind,
            operation,
            detail: detail.into(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    fn with_source(mut self, source: rusqlite::Error) -> Self {
        self.source = Some(source);
        self
    }
}

/// Map a raw rusqlite error to a classified [`DbError`].
pub fn classify(err: rusqlite::Error, operation: &'static str) -> DbError {
    let (kind, detail) = match &err {
        rusqlite::Error::QueryReturnedNoRows => (
            ErrorKind::RecordNotFound,
            "requested record does not exist".to_string(),
        ),
        rusqlite::Error::SqliteFailure(code, message) => {
            let kind = classify_sqlite_code(code);
            let detail = message.clone().unwrap_or_else(|| code.to_string());
            (kind, detail)
        }
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::IntegralValueOutOfRange(..)
        | rusqlite::Error::ToSqlConversionFailure(..)
        | rusqlite::Error::InvalidParameterName(..)
        | rusqlite::Error::InvalidParameterCount(..)
        | rusqlite::Error::Utf8Error(..)
        | rusqlite::Error::NulError(..) => (ErrorKind::InvalidInput, err.to_string()),
        other => (ErrorKind::Uncategorized, other.to_string()),
    };
    DbError::new(kind, operation, detail).with_source(err)
}

fn classify_sqlite_code(code: &ffi::Error) -> ErrorKind {
    match code.code {
        ErrorCode::ConstraintViolation => match code.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                ErrorKind::DuplicateKey
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ErrorKind::ForeignKeyViolation,
            ffi::SQLITE_CONSTRAINT_CHECK => ErrorKind::CheckConstraint,
            ffi::SQLITE_CONSTRAINT_NOTNULL => ErrorKind::InvalidInput,
            _ => ErrorKind::EditConflict,
        },
        ErrorCode::TypeMismatch | ErrorCode::ParameterOutOfRange | ErrorCode::TooBig => {
            ErrorKind::InvalidInput
        }
        ErrorCode::OperationInterrupted
        | ErrorCode::CannotOpen
        | ErrorCode::NotADatabase
        | ErrorCode::SystemIoFailure
        | ErrorCode::DatabaseBusy
        | ErrorCode::DatabaseLocked => ErrorKind::ConnectionFailed,
        _ => ErrorKind::Uncategorized,
    }
}

/// Attach an operation tag to a rusqlite result.
pub trait Classify<T> {
    fn classify(self, operation: &'static str) -> DbResult<T>;
}

impl<T> Classify<T> for rusqlite::Result<T> {
    fn classify(self, operation: &'static str) -> DbResult<T> {
        self.map_err(|e| classify(e, operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(code: ErrorCode, extended_code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            ffi::Error {
                code,
                extended_code,
            },
            Some("constraint detail".to_string()),
        )
    }

    #[test]
    fn no_rows_is_record_not_found() {
        let err = classify(rusqlite::Error::QueryReturnedNoRows, "article_getbyid");
        assert!(err.is(ErrorKind::RecordNotFound));
        assert_eq!(err.operation(), "article_getbyid");
    }

    #[test]
    fn unique_violation_is_duplicate_key() {
        for extended in [ffi::SQLITE_CONSTRAINT_UNIQUE, ffi::SQLITE_CONSTRAINT_PRIMARYKEY] {
            let err = classify(failure(ErrorCode::ConstraintViolation, extended), "tag_create");
            assert_eq!(err.kind(), ErrorKind::DuplicateKey);
            assert_eq!(err.operation(), "tag_create");
            assert_eq!(err.detail(), "constraint detail");
        }
    }

    #[test]
    fn constraint_family() {
        let cases = [
            (ffi::SQLITE_CONSTRAINT_FOREIGNKEY, ErrorKind::ForeignKeyViolation),
            (ffi::SQLITE_CONSTRAINT_CHECK, ErrorKind::CheckConstraint),
            (ffi::SQLITE_CONSTRAINT_NOTNULL, ErrorKind::InvalidInput),
            (ffi::SQLITE_CONSTRAINT_TRIGGER, ErrorKind::EditConflict),
            (ffi::SQLITE_CONSTRAINT, ErrorKind::EditConflict),
        ];
        for (extended, expected) in cases {
            let err = classify(failure(ErrorCode::ConstraintViolation, extended), "op");
            assert_eq!(err.kind(), expected, "extended code {extended}");
        }
    }

    #[test]
    fn interrupted_statement_is_connection_failure() {
        let err = classify(failure(ErrorCode::OperationInterrupted, ffi::SQLITE_INTERRUPT), "op");
        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
    }

    #[test]
    fn conversion_failure_is_invalid_input() {
        let err = classify(
            rusqlite::Error::InvalidColumnType(0, "id".into(), rusqlite::types::Type::Null),
            "user_getbyid",
        );
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn unknown_failures_stay_wrapped() {
        let err = classify(rusqlite::Error::InvalidQuery, "comment_create");
        assert_eq!(err.kind(), ErrorKind::Uncategorized);
        assert_eq!(err.operation(), "comment_create");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn display_carries_operation_and_detail() {
        let err = DbError::new(ErrorKind::CheckConstraint, "article_update", "published -> draft");
        assert_eq!(
            err.to_string(),
            "database error during article_update: check constraint violation - published -> draft"
        );
    }
}
