//src/error.rs

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the annotation pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    #[error("{path}: missing column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{path}:{line}: {reason}")]
    MalformedRow {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("lookup client: {0}")]
    Lookup(#[from] LookupError),

    #[error("cannot build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("{0} not found in PATH")]
    MissingExecutable(String),

    #[error("{tool} failed (exit code: {code:?}): {stderr}")]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a single lookup against the record service.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service returned status {0}")]
    Status(u16),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("retrieve called before search")]
    NoSearch,

    #[error("{0}")]
    Service(String),
}

impl LookupError {
    /// Short label for the failure, used in per-identifier log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            LookupError::Transport(_) => "Transport",
            LookupError::Status(_) => "Status",
            LookupError::Decode(_) => "Decode",
            LookupError::NoSearch => "NoSearch",
            LookupError::Service(_) => "Service",
        }
    }
}
