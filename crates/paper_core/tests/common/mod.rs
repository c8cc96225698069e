#![allow(dead_code)]

use std::sync::Once;

use paper_core::{AnalysisResult, JobId, JobSnapshot, JobStatus, SectionKey};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(paper_logging::initialize_for_tests);
}

pub fn analysis() -> AnalysisResult {
    AnalysisResult::new(
        "Attention Is All You Need",
        SectionKey::ALL
            .iter()
            .map(|key| (*key, format!("{} text", key.wire_key()))),
    )
    .unwrap()
}

pub fn snapshot(job_id: &str, status: JobStatus) -> JobSnapshot {
    JobSnapshot {
        job_id: JobId::from(job_id),
        source_name: format!("paper-{job_id}.pdf"),
        status,
        result: (status == JobStatus::Completed).then(analysis),
    }
}
