//! Error types for ListScout.
//!
//! Library crates use [`ListScoutError`] via `thiserror`.
//! The CLI app wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all ListScout operations.
#[derive(Debug, thiserror::Error)]
pub enum ListScoutError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while loading the corpus or calling a collaborator.
    #[error("network error: {0}")]
    Network(String),

    /// Corpus or taxonomy structure error (missing parent, cycle, bad shape).
    #[error("corpus error: {message}")]
    Corpus { message: String },

    /// Collaborator (planner/searcher/idea-writer) call or response error.
    #[error("agent error: {0}")]
    Agent(String),

    /// A research plan could not be obtained. Fatal for the run.
    #[error("planning error: {0}")]
    Plan(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (schema mismatch, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ListScoutError>;

impl ListScoutError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a corpus error from any displayable message.
    pub fn corpus(msg: impl Into<String>) -> Self {
        Self::Corpus {
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
        let err = ListScoutError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = ListScoutError::corpus("category 'player' references unknown parent 'media'");
        assert!(err.to_string().contains("unknown parent"));
    }
}
