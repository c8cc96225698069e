#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Mutex, Once};

use paper_core::{AnalysisResult, JobId, JobSnapshot, JobStatus, SectionKey};
use paper_engine::{EngineEvent, EventSink, FailureKind, FetchError, PaperClient};
use tokio::time::Instant;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(paper_logging::initialize_for_tests);
}

pub fn snapshot(job_id: &str, status: JobStatus) -> JobSnapshot {
    let result = (status == JobStatus::Completed).then(|| {
        AnalysisResult::new(
            "Title",
            SectionKey::ALL
                .iter()
                .map(|key| (*key, format!("{} text", key.wire_key()))),
        )
        .unwrap()
    });
    JobSnapshot {
        job_id: JobId::from(job_id),
        source_name: "paper.pdf".into(),
        status,
        result,
    }
}

pub fn error(kind: FailureKind) -> FetchError {
    FetchError {
        message: kind.to_string(),
        kind,
    }
}

/// Replays canned fetch results in order; once exhausted, every fetch hangs.
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<JobSnapshot, FetchError>>>,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedClient {
    pub fn new(script: Vec<Result<JobSnapshot, FetchError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Milliseconds between `start` and each fetch.
    pub fn call_offsets_ms(&self, start: Instant) -> Vec<u128> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|at| at.duration_since(start).as_millis())
            .collect()
    }
}

/// Compares fetch offsets allowing for timer rounding to the next millisecond tick.
pub fn assert_offsets_ms(actual: &[u128], expected: &[u128]) {
    assert_eq!(actual.len(), expected.len(), "offsets {actual:?} vs {expected:?}");
    for (got, want) in actual.iter().zip(expected) {
        assert!(
            got.abs_diff(*want) <= 5,
            "offsets {actual:?} vs {expected:?}"
        );
    }
}

#[async_trait::async_trait]
impl PaperClient for ScriptedClient {
    async fn fetch_snapshot(&self, _job_id: &JobId) -> Result<JobSnapshot, FetchError> {
        self.calls.lock().unwrap().push(Instant::now());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    async fn upload(&self, _path: &Path) -> Result<JobId, FetchError> {
        Ok(JobId::from("uploaded"))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingSink {
    pub fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}
