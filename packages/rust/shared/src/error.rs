//! Error types for eventdigest.
//!
//! Library crates use [`EventDigestError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all eventdigest operations.
#[derive(Debug, thiserror::Error)]
pub enum EventDigestError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The input collection is not a sequence of event records.
    ///
    /// `index` is the offending record, or `None` when the top-level value
    /// itself has the wrong shape.
    #[error("input shape error{}: {message}", index.map(|i| format!(" at record {i}")).unwrap_or_default())]
    InputShape {
        index: Option<usize>,
        message: String,
    },

    /// JSON or text parsing error outside the per-record path.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Network/HTTP error during webhook delivery.
    #[error("network error: {0}")]
    Network(String),

    /// Known-URL ledger error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (schema mismatch, invalid argument, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EventDigestError>;

impl EventDigestError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an input shape error, optionally pinned to a record index.
    pub fn input_shape(index: Option<usize>, msg: impl Into<String>) -> Self {
        Self::InputShape {
            index,
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = EventDigestError::config("missing webhook env var");
        assert_eq!(err.to_string(), "config error: missing webhook env var");

        let err = EventDigestError::validation("schema_version 99 not supported");
        assert!(err.to_string().contains("schema_version 99"));
    }

    #[test]
    fn input_shape_mentions_record_index() {
        let err = EventDigestError::input_shape(Some(3), "missing field `title`");
        assert_eq!(
            err.to_string(),
            "input shape error at record 3: missing field `title`"
        );

        let err = EventDigestError::input_shape(None, "expected a JSON array");
        assert_eq!(err.to_string(), "input shape error: expected a JSON array");
    }
}
