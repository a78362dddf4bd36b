//! Error types for the hot-topics aggregator.

use std::fmt;
use thiserror::Error;

/// Topics error kinds. `Database`/`Serialization`/`Internal` exist only to
/// carry conversions from lower-level errors without losing information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Provider,
    Database,
    Serialization,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Provider => "provider",
            ErrorKind::Database => "database",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Hot-topics error type. Callers are expected to match on `.kind`, not on
/// the message text.
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct TopicsError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl TopicsError {
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

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Provider, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl From<sqlx::Error> for TopicsError {
    fn from(err: sqlx::Error) -> Self {
        if matches!(err, sqlx::Error::RowNotFound) {
            return TopicsError::not_found("row not found").with_source(err);
        }
        TopicsError::database(format!("sqlite error: {err}")).with_source(err)
    }
}

impl From<reqwest::Error> for TopicsError {
    fn from(err: reqwest::Error) -> Self {
        TopicsError::provider(format!("transport error: {err}")).with_source(err)
    }
}

impl From<serde_json::Error> for TopicsError {
    fn from(err: serde_json::Error) -> Self {
        TopicsError::provider(format!("json decode error: {err}")).with_source(err)
    }
}

/// Result type alias used throughout this crate.
pub type Result<T> = std::result::Result<T, TopicsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let err = TopicsError::provider("weibo returned 503");
        assert_eq!(err.to_string(), "[provider] weibo returned 503");
    }

    #[test]
    fn from_sqlx_row_not_found_is_not_found() {
        let err: TopicsError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn kind_as_str_matches_named_surface() {
        assert_eq!(ErrorKind::InvalidArgument.as_str(), "invalid_argument");
        assert_eq!(ErrorKind::Provider.as_str(), "provider");
    }
}
