//! Errors and their classification.
//!
//! Absence of a task or comment on update/delete is not an error: those
//! operations return `bool`. Everything else is a typed error below.

use std::path::PathBuf;

use thiserror::Error;

use super::CommentId;

/// Classification of failures, used by callers to pick a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-side input validation failed.
    Validation,
    /// A reply referenced a parent comment that does not exist.
    OrphanReply,
    /// The external task fetch failed.
    LoadFailure,
    /// Invalid configuration or wiring.
    Configuration,
}

/// Comment store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommentError {
    #[error("parent comment not found: {0}")]
    ParentNotFound(CommentId),
}

impl CommentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommentError::ParentNotFound(_) => ErrorKind::OrphanReply,
        }
    }
}

/// Failure while fetching or decoding the initial task list.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed task list: {0}")]
    Json(#[from] serde_json::Error),

    #[error("task {task}: invalid {field} value {value:?}")]
    InvalidDate {
        task: String,
        field: &'static str,
        value: String,
    },

    #[error("task source unavailable: {0}")]
    Source(String),
}

impl LoadError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::LoadFailure
    }
}

/// Caller-side validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be at least {required} characters (got {actual})")]
    TooShort {
        field: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("deadline must not be in the past")]
    DeadlineInPast,

    #[error("deadline must be within {max_days} days")]
    DeadlineTooFar { max_days: u32 },

    #[error("replies cannot be nested deeper than level {max_depth}")]
    ReplyTooDeep { max_depth: usize },
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// Failures of the observation layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObserveError {
    #[error("a delayed reaction needs a running tokio runtime")]
    NoRuntime,
}

impl ObserveError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}
