use std::fmt;

use paper_core::{ContractViolation, JobId, JobSnapshot};

use crate::poller::StopReason;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A fetch succeeded and produced a contract-valid snapshot.
    Snapshot {
        job_id: JobId,
        generation: u64,
        seq: u64,
        snapshot: JobSnapshot,
    },
    /// A fetch failed in a recoverable way; polling continues.
    SyncFailed {
        job_id: JobId,
        generation: u64,
        seq: u64,
        error: FetchError,
    },
    /// A fetch failed terminally (not found, contract breach); polling stopped.
    Rejected {
        job_id: JobId,
        generation: u64,
        seq: u64,
        error: FetchError,
    },
    /// The poll loop for `generation` exited.
    PollingStopped {
        job_id: JobId,
        generation: u64,
        reason: StopReason,
    },
    /// A document submission finished.
    Uploaded { result: Result<JobId, FetchError> },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    /// Body was not valid JSON or did not match the resource shape.
    Malformed,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    NotFound,
    ContractViolation(ContractViolation),
    UploadRejected { status: u16, detail: String },
    UnsupportedFile,
    Io,
}

impl FailureKind {
    /// Terminal failures stop polling; everything else is a retryable sync error.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FailureKind::NotFound | FailureKind::ContractViolation(_))
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Malformed => write!(f, "malformed response"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "payload too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::NotFound => write!(f, "job not found"),
            FailureKind::ContractViolation(violation) => {
                write!(f, "contract violation: {violation}")
            }
            FailureKind::UploadRejected { status, detail } => {
                write!(f, "upload rejected ({status}): {detail}")
            }
            FailureKind::UnsupportedFile => write!(f, "unsupported file"),
            FailureKind::Io => write!(f, "io error"),
        }
    }
}
