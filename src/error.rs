//! Error types for kube-stress

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Setup error. Any of these aborts the process before the dispatch loop exists.
#[derive(Error, Debug)]
pub enum Error {
    /// Run parameters failed validation
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Kubeconfig could not be read or resolved
    #[error("kubeconfig error ({path:?}): {message}")]
    KubeConfig { path: PathBuf, message: String },

    /// A pool slot could not be constructed
    #[error("failed to create client {index}: {source}")]
    ClientBuild {
        index: usize,
        #[source]
        source: reqwest::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Latency histogram could not be allocated
    #[error("histogram error: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),

    /// Latency file error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub fn kubeconfig(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::KubeConfig {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Invalid run parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("qps must be a finite number greater than zero, got {0}")]
    InvalidRate(f64),

    #[error("number of clients must be at least 1")]
    EmptyPool,

    #[error("object count must be greater than zero")]
    ZeroCount,

    #[error("total duration must be greater than zero")]
    ZeroDuration,

    #[error("total duration {0:?} is too long to schedule")]
    DurationTooLong(Duration),

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("object count and total duration are mutually exclusive")]
    ConflictingStopConditions,

    #[error("unsupported object type '{0}' (supported values: configmaps)")]
    UnsupportedObjectType(String),
}

/// Failure of a single API call. Counted and logged, never propagated past the call.
#[derive(Error, Debug)]
pub enum CallError {
    /// Connection, TLS or body transfer failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The call did not finish within its deadline
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// The request body could not be encoded
    #[error("failed to encode request: {0}")]
    Encode(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
