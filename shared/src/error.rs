use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure of a remote workflow call, as reported to the frontend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowFailure {
    /// Connection refused, DNS failure, aborted transfer.
    Network(String),
    /// Non-2xx HTTP status.
    Status { code: u16, body: String },
    /// 2xx response whose body did not have the expected shape.
    MalformedResponse(String),
    /// Backend is missing the endpoint or key for this call.
    Config(String),
}

impl WorkflowFailure {
    /// Transient failures are worth a retry button; the others need a fix elsewhere.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Status { .. })
    }
}

impl fmt::Display for WorkflowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(detail) => write!(f, "Network error: {detail}"),
            Self::Status { code, body } if body.is_empty() => write!(f, "Server returned HTTP {code}"),
            Self::Status { code, body } => write!(f, "Server returned HTTP {code}: {body}"),
            Self::MalformedResponse(detail) => write!(f, "Data format error: {detail}"),
            Self::Config(detail) => write!(f, "Configuration error: {detail}"),
        }
    }
}

impl std::error::Error for WorkflowFailure {}

/// User input violation; the request is blocked and state stays unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Please select at least one column")]
    Empty,
    #[error("Too many columns selected ({count}), the limit is {max}")]
    TooMany { count: usize, max: usize },
    #[error("End time must be later than start time")]
    InvalidTimeRange,
    #[error("Cannot parse time '{0}'")]
    UnparseableTime(String),
    #[error("No table is loaded")]
    NoActiveTask,
    #[error("This table is already saved in the library")]
    AlreadySaved,
    #[error("Please choose a model")]
    NoModel,
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ViewportError {
    #[error("viewport height {0} cannot be measured")]
    NotMeasurable(f64),
    #[error("item height must be positive, got {0}")]
    InvalidItemHeight(f64),
}
