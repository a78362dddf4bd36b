//! Error types for the article repository.

use std::fmt;
use thiserror::Error;

/// Article error kinds. The first five map onto the named error surface
/// callers match on; `Database`/`Serialization` exist only to carry
/// conversions from lower-level errors without losing information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Conflict,
    Database,
    Serialization,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Database => "database",
            ErrorKind::Serialization => "serialization",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Article repository error type. Callers are expected to match on `.kind`,
/// not on the message text.
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct ArticleError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl ArticleError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }
}

impl From<sqlx::Error> for ArticleError {
    fn from(err: sqlx::Error) -> Self {
        if matches!(err, sqlx::Error::RowNotFound) {
            return ArticleError::not_found("row not found").with_source(err);
        }
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return ArticleError::conflict(db_err.message().to_string()).with_source(err);
            }
        }
        ArticleError::database(format!("sqlite error: {err}")).with_source(err)
    }
}

impl From<serde_json::Error> for ArticleError {
    fn from(err: serde_json::Error) -> Self {
        ArticleError::serialization(format!("json error: {err}")).with_source(err)
    }
}

/// Result type alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ArticleError>;
