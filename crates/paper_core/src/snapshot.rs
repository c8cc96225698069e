use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Opaque server-assigned job identifier. Never reused once issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(String);

impl JobId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for JobId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<u64> for JobId {
    fn from(raw: u64) -> Self {
        Self(raw.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Position along the expected `PENDING -> PROCESSING -> terminal` path.
    pub(crate) fn rank(self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Processing => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    /// Parses a wire status. Case-insensitive; the legacy worker value
    /// `error` is read as `FAILED`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("pending") {
            Some(JobStatus::Pending)
        } else if raw.eq_ignore_ascii_case("processing") {
            Some(JobStatus::Processing)
        } else if raw.eq_ignore_ascii_case("completed") {
            Some(JobStatus::Completed)
        } else if raw.eq_ignore_ascii_case("failed") || raw.eq_ignore_ascii_case("error") {
            Some(JobStatus::Failed)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of sections an analysis result is made of, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKey {
    ExecSummary,
    Background,
    Methods,
    Results,
    Discussion,
    QuickRef,
}

impl SectionKey {
    pub const ALL: [SectionKey; 6] = [
        SectionKey::ExecSummary,
        SectionKey::Background,
        SectionKey::Methods,
        SectionKey::Results,
        SectionKey::Discussion,
        SectionKey::QuickRef,
    ];

    /// Field name used by the analysis payload.
    pub fn wire_key(self) -> &'static str {
        match self {
            SectionKey::ExecSummary => "exec_summary",
            SectionKey::Background => "background",
            SectionKey::Methods => "methods",
            SectionKey::Results => "results",
            SectionKey::Discussion => "discussion",
            SectionKey::QuickRef => "quick_ref",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            SectionKey::ExecSummary => "Executive Summary",
            SectionKey::Background => "Background & Motivation",
            SectionKey::Methods => "Core Concepts & Methods",
            SectionKey::Results => "Experiments & Results",
            SectionKey::Discussion => "Discussion & Evaluation",
            SectionKey::QuickRef => "Quick Reference",
        }
    }

    /// 1-based position, as shown to the user.
    pub fn ordinal(self) -> usize {
        Self::ALL
            .iter()
            .position(|key| *key == self)
            .map_or(0, |index| index + 1)
    }

    pub fn from_ordinal(ordinal: usize) -> Option<Self> {
        ordinal
            .checked_sub(1)
            .and_then(|index| Self::ALL.get(index).copied())
    }
}

/// Breach of the status/result contract between server and client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("job reported COMPLETED without an analysis result")]
    MissingResult,
    #[error("job reported {status} but carried an analysis result")]
    UnexpectedResult { status: JobStatus },
    #[error("analysis result is missing section `{}`", .0.wire_key())]
    MissingSection(SectionKey),
}

/// Structured result of a completed job: a title plus one body per section key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    title: String,
    bodies: BTreeMap<SectionKey, String>,
}

impl AnalysisResult {
    /// Builds a result, requiring a body for every key in [`SectionKey::ALL`].
    pub fn new(
        title: impl Into<String>,
        bodies: impl IntoIterator<Item = (SectionKey, String)>,
    ) -> Result<Self, ContractViolation> {
        let bodies: BTreeMap<SectionKey, String> = bodies.into_iter().collect();
        if let Some(missing) = SectionKey::ALL.iter().find(|key| !bodies.contains_key(key)) {
            return Err(ContractViolation::MissingSection(*missing));
        }
        Ok(Self {
            title: title.into(),
            bodies,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self, key: SectionKey) -> &str {
        self.bodies.get(&key).map(String::as_str).unwrap_or_default()
    }

    /// Sections in display order.
    pub fn sections(&self) -> impl Iterator<Item = (SectionKey, &str)> + '_ {
        SectionKey::ALL.iter().map(|key| (*key, self.body(*key)))
    }
}

/// One fetched observation of a job. Replaced wholesale on every poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub source_name: String,
    pub status: JobStatus,
    pub result: Option<AnalysisResult>,
}

impl JobSnapshot {
    /// `result` must be present exactly when `status` is `COMPLETED`.
    pub fn check_contract(&self) -> Result<(), ContractViolation> {
        match (self.status, self.result.is_some()) {
            (JobStatus::Completed, true) => Ok(()),
            (JobStatus::Completed, false) => Err(ContractViolation::MissingResult),
            (status, true) => Err(ContractViolation::UnexpectedResult { status }),
            (_, false) => Ok(()),
        }
    }
}
