//! JSON shapes of the paper service and their conversion into core types.

use paper_core::{AnalysisResult, JobId, JobSnapshot, JobStatus, SectionKey};
use serde::Deserialize;

use crate::{FailureKind, FetchError};

/// Identifiers arrive as integers from the reference backend, but strings are accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireId {
    Number(u64),
    Text(String),
}

impl From<WireId> for JobId {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Number(n) => JobId::from(n),
            WireId::Text(s) => JobId::from(s),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PaperRecord {
    paper_id: WireId,
    #[serde(default)]
    filename: Option<String>,
    status: String,
    #[serde(default)]
    analysis: Option<AnalysisRecord>,
}

#[derive(Debug, Deserialize)]
struct AnalysisRecord {
    #[serde(default)]
    title: Option<String>,
    exec_summary: Option<String>,
    background: Option<String>,
    methods: Option<String>,
    results: Option<String>,
    discussion: Option<String>,
    quick_ref: Option<String>,
}

impl AnalysisRecord {
    fn into_result(self) -> Result<AnalysisResult, FetchError> {
        let bodies = [
            (SectionKey::ExecSummary, self.exec_summary),
            (SectionKey::Background, self.background),
            (SectionKey::Methods, self.methods),
            (SectionKey::Results, self.results),
            (SectionKey::Discussion, self.discussion),
            (SectionKey::QuickRef, self.quick_ref),
        ];
        AnalysisResult::new(
            self.title.unwrap_or_default(),
            bodies
                .into_iter()
                .filter_map(|(key, body)| body.map(|body| (key, body))),
        )
        .map_err(contract_error)
    }
}

#[derive(Debug, Deserialize)]
struct UploadRecord {
    #[serde(default)]
    paper_id: Option<WireId>,
    #[serde(default)]
    id: Option<WireId>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// Decodes a `GET /paper/{id}` body into a snapshot for `expected`.
///
/// Shape problems are [`FailureKind::Malformed`] (retryable); status/result
/// mismatches are [`FailureKind::ContractViolation`] (terminal).
pub fn decode_snapshot(body: &[u8], expected: &JobId) -> Result<JobSnapshot, FetchError> {
    let record: PaperRecord = serde_json::from_slice(body)
        .map_err(|err| FetchError::new(FailureKind::Malformed, err.to_string()))?;

    let job_id = JobId::from(record.paper_id);
    if &job_id != expected {
        return Err(FetchError::new(
            FailureKind::Malformed,
            format!("response is for job {job_id}, expected {expected}"),
        ));
    }

    let status = JobStatus::parse(&record.status).ok_or_else(|| {
        FetchError::new(
            FailureKind::Malformed,
            format!("unknown status `{}`", record.status),
        )
    })?;

    let result = record.analysis.map(AnalysisRecord::into_result).transpose()?;
    let snapshot = JobSnapshot {
        job_id,
        source_name: record.filename.unwrap_or_default(),
        status,
        result,
    };
    snapshot.check_contract().map_err(contract_error)?;
    Ok(snapshot)
}

/// Decodes a successful `POST /upload` body into the new job identifier.
pub fn decode_upload(body: &[u8]) -> Result<JobId, FetchError> {
    let record: UploadRecord = serde_json::from_slice(body)
        .map_err(|err| FetchError::new(FailureKind::Malformed, err.to_string()))?;
    record
        .paper_id
        .or(record.id)
        .map(JobId::from)
        .ok_or_else(|| FetchError::new(FailureKind::Malformed, "upload response has no job id"))
}

/// Extracts the human-readable `detail` of an error body, if there is one.
pub(crate) fn error_detail(body: &[u8]) -> Option<String> {
    let error: ErrorBody = serde_json::from_slice(body).ok()?;
    match error.detail {
        serde_json::Value::String(text) => Some(text),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn contract_error(violation: paper_core::ContractViolation) -> FetchError {
    FetchError::new(
        FailureKind::ContractViolation(violation.clone()),
        violation.to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use paper_core::ContractViolation;
    use pretty_assertions::assert_eq;

    const COMPLETED: &str = r#"{
        "paper_id": 42,
        "filename": "attention.pdf",
        "status": "COMPLETED",
        "analysis": {
            "title": "Attention",
            "exec_summary": "s", "background": "b", "methods": "m",
            "results": "r", "discussion": "d", "quick_ref": "q"
        }
    }"#;

    #[test]
    fn decodes_completed_snapshot() {
        let snapshot = decode_snapshot(COMPLETED.as_bytes(), &JobId::from("42")).unwrap();
        assert_eq!(snapshot.status, JobStatus::Completed);
        assert_eq!(snapshot.source_name, "attention.pdf");
        let result = snapshot.result.unwrap();
        assert_eq!(result.title(), "Attention");
        assert_eq!(result.body(SectionKey::QuickRef), "q");
    }

    #[test]
    fn decodes_lowercase_pending_with_string_id() {
        let body = br#"{"paper_id":"abc","filename":"x.pdf","status":"processing","analysis":null}"#;
        let snapshot = decode_snapshot(body, &JobId::from("abc")).unwrap();
        assert_eq!(snapshot.status, JobStatus::Processing);
        assert!(snapshot.result.is_none());
    }

    #[test]
    fn completed_without_analysis_is_contract_violation() {
        let body = br#"{"paper_id":1,"filename":"x.pdf","status":"COMPLETED","analysis":null}"#;
        let err = decode_snapshot(body, &JobId::from("1")).unwrap_err();
        assert_eq!(
            err.kind,
            FailureKind::ContractViolation(ContractViolation::MissingResult)
        );
        assert!(err.kind.is_terminal());
    }

    #[test]
    fn missing_section_is_contract_violation() {
        let body = br#"{"paper_id":1,"status":"COMPLETED","analysis":{"exec_summary":"s"}}"#;
        let err = decode_snapshot(body, &JobId::from("1")).unwrap_err();
        assert_eq!(
            err.kind,
            FailureKind::ContractViolation(ContractViolation::MissingSection(
                SectionKey::Background
            ))
        );
    }

    #[test]
    fn unknown_status_and_bad_json_are_malformed() {
        let body = br#"{"paper_id":1,"status":"QUEUED","analysis":null}"#;
        let err = decode_snapshot(body, &JobId::from("1")).unwrap_err();
        assert_eq!(err.kind, FailureKind::Malformed);
        assert!(!err.kind.is_terminal());

        let err = decode_snapshot(b"<html>", &JobId::from("1")).unwrap_err();
        assert_eq!(err.kind, FailureKind::Malformed);
    }

    #[test]
    fn mismatched_id_is_malformed() {
        let err = decode_snapshot(COMPLETED.as_bytes(), &JobId::from("7")).unwrap_err();
        assert_eq!(err.kind, FailureKind::Malformed);
    }

    #[test]
    fn upload_accepts_paper_id_or_id() {
        assert_eq!(decode_upload(br#"{"paper_id": 9}"#).unwrap(), JobId::from("9"));
        assert_eq!(decode_upload(br#"{"id": "x1"}"#).unwrap(), JobId::from("x1"));
        assert_eq!(
            decode_upload(b"{}").unwrap_err().kind,
            FailureKind::Malformed
        );
    }

    #[test]
    fn error_detail_reads_string_or_structured_detail() {
        assert_eq!(
            error_detail(br#"{"detail":"file too large"}"#).as_deref(),
            Some("file too large")
        );
        assert_eq!(
            error_detail(br#"{"detail":[{"msg":"field required"}]}"#).as_deref(),
            Some(r#"[{"msg":"field required"}]"#)
        );
        assert_eq!(error_detail(b"nope"), None);
    }
}
