/// Human-readable detail attached to a [`SyncError::Described`].
///
/// The detail is usually produced by a [`Translator`](crate::Translator),
/// so UI layers can show the generic message and the localized detail
/// side by side.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{detail}")]
pub struct ErrorCause {
    pub detail: String,
}

impl ErrorCause {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Errors that can occur while reading from or writing to a repository.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("operation aborted")]
    Aborted,

    #[error("{path} was changed since it was last fetched")]
    Conflict { path: String },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid change to {path}: {reason}")]
    InvalidChange { path: String, reason: &'static str },

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("{message}")]
    Described {
        message: String,
        #[source]
        cause: ErrorCause,
    },
}

impl SyncError {
    /// Build an error carrying a generic message plus a detailed cause.
    pub fn described(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Described {
            message: message.into(),
            cause: ErrorCause::new(detail),
        }
    }

    /// The detailed cause text, if this error carries one.
    pub fn cause_detail(&self) -> Option<&str> {
        match self {
            Self::Described { cause, .. } => Some(&cause.detail),
            _ => None,
        }
    }

    /// HTTP status code for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || self.status() == Some(404)
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn described_error_exposes_cause_as_source() {
        let err = SyncError::described(
            "Failed to retrieve the last commit hash.",
            "Branch “main” was not found.",
        );

        assert_eq!(err.to_string(), "Failed to retrieve the last commit hash.");
        assert_eq!(err.cause_detail(), Some("Branch “main” was not found."));

        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "Branch “main” was not found.");
    }

    #[test]
    fn plain_errors_have_no_cause() {
        let err = SyncError::Network("connection reset".into());
        assert!(err.cause_detail().is_none());
        assert!(err.source().is_none());
    }

    #[test]
    fn not_found_covers_http_404() {
        let err = SyncError::Api {
            status: 404,
            message: "missing".into(),
        };
        assert!(err.is_not_found());
        assert!(SyncError::NotFound("x".into()).is_not_found());
        assert!(!SyncError::Aborted.is_not_found());
    }
}
