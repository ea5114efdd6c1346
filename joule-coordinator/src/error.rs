//! Coordinator error taxonomy
//!
//! Every error is logged with full request context at the point of failure
//! and then surfaced to the caller; nothing is swallowed and nothing is
//! retried here. Retry, if desired, is an external policy wrapping these
//! calls.

use thiserror::Error;

use joule_client::ClientError;
use joule_core::domain::job::InvalidTransition;

use crate::dispatch::DispatchError;
use crate::repository::MetadataError;
use crate::transport::TransportError;

/// Result type alias for coordinator operations
pub type Result<T> = std::result::Result<T, CoordinatorError>;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Null/malformed arguments; fails fast, no retry
    #[error("validation error: {0}")]
    Validation(String),

    /// Unparseable process type or row payload; fatal to that single result
    #[error("parse error: {0}")]
    Parse(String),

    /// Cluster failed to reach running state within the configured budget
    #[error("cluster {cluster_id} failed to start within {minutes} minutes")]
    ClusterStartTimeout { cluster_id: String, minutes: u64 },

    /// The engine completed the run with a failed outcome
    #[error("engine run {run_id} completed with failure")]
    RunFailed { run_id: i64 },

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    /// Engine submit/run/poll call failed
    #[error("engine error: {0}")]
    Engine(#[from] ClientError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The caller's cancellation signal fired; not a failure
    #[error("operation cancelled")]
    Cancelled,
}

impl From<serde_json::Error> for CoordinatorError {
    fn from(err: serde_json::Error) -> Self {
        CoordinatorError::Parse(err.to_string())
    }
}
