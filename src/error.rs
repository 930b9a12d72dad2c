//! Error types for the kshape-ts library.

use thiserror::Error;

/// Result type alias for clustering operations.
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Errors that can occur while fitting or applying a clustering model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    /// Input dataset (or one of its series) is empty.
    #[error("empty input data")]
    EmptyData,

    /// Series length or feature dimension does not match.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// NaN or infinite values detected in a series.
    #[error("missing values detected in data")]
    MissingValues,

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// An assignment left a cluster without members.
    ///
    /// Recoverable: the fit loop discards the current attempt and retries
    /// with the next seed.
    #[error("cluster {cluster} has no members")]
    EmptyCluster { cluster: usize },

    /// Every restart attempt ended with an empty cluster.
    #[error("no successful initialization after {attempts} attempts")]
    NoSuccessfulInit { attempts: usize },
}

impl ClusterError {
    /// Whether the error only invalidates the current restart attempt.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ClusterError::EmptyCluster { .. })
    }
}
