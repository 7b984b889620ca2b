use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Why a remote store call failed. Callers use this to decide whether to try
/// the next store and what to tell the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Unreachable,
    Timeout,
    Unauthorized,
    Unknown,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Unreachable => "unreachable",
            FailureKind::Timeout => "timeout",
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
pub enum RemoteStoreError {
    #[error("remote path {0} not found")]
    NotFound(String),
    #[error("{kind}: {message}")]
    Failed { kind: FailureKind, message: String },
}

impl RemoteStoreError {
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::failed(FailureKind::Unreachable, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::failed(FailureKind::Timeout, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::failed(FailureKind::Unauthorized, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::failed(FailureKind::Unknown, message)
    }

    /// Failure kind, `Unknown` for a not-found path.
    pub fn kind(&self) -> FailureKind {
        match self {
            RemoteStoreError::NotFound(_) => FailureKind::Unknown,
            RemoteStoreError::Failed { kind, .. } => *kind,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteStoreError::NotFound(_))
    }
}

pub type StoreResult<T> = Result<T, RemoteStoreError>;

#[derive(Debug, Error)]
pub enum NasError {
    #[error(transparent)]
    RemoteStore(#[from] RemoteStoreError),
    #[error("upload failed ({kind}): {message}")]
    UploadFailed { kind: FailureKind, message: String },
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Misconfigured(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("index store error: {0}")]
    Index(#[from] anyhow::Error),
}

impl NasError {
    pub fn upload_failed(last: &RemoteStoreError) -> Self {
        let message = match last {
            RemoteStoreError::Failed { message, .. } => message.clone(),
            other => other.to_string(),
        };
        NasError::UploadFailed {
            kind: last.kind(),
            message,
        }
    }
}

pub type NasResult<T> = Result<T, NasError>;
