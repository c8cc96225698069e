use crate::{
    ContractViolation, JobId, JobSnapshot, JobStatus, Phase, SectionKey, SectionVisibility,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackerViewModel {
    pub job_id: Option<JobId>,
    pub body: ResultView,
    pub sync_banner: Option<SyncBanner>,
    pub polling: bool,
    pub dirty: bool,
}

/// Non-blocking notice about transport trouble; never replaces the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncBanner {
    pub message: String,
    pub consecutive_failures: u32,
    /// Retrying stopped after too many consecutive failures.
    pub halted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResultView {
    #[default]
    Loading,
    Progress {
        status: JobStatus,
        source_name: String,
    },
    Sections(SectionsView),
    JobFailed {
        source_name: String,
    },
    ContractViolation {
        detail: String,
    },
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionsView {
    pub title: String,
    pub source_name: String,
    pub sections: Vec<SectionView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionView {
    pub key: SectionKey,
    pub title: &'static str,
    pub body: String,
    pub expanded: bool,
}

/// Pure mapping from lifecycle phase, latest snapshot and visibility to a view.
///
/// A completed job without visibility state renders fully expanded.
pub fn render(
    phase: &Phase,
    snapshot: Option<&JobSnapshot>,
    visibility: Option<&SectionVisibility>,
) -> ResultView {
    let source_name = snapshot
        .map(|snapshot| snapshot.source_name.clone())
        .unwrap_or_default();

    match phase {
        Phase::AwaitingSnapshot => ResultView::Loading,
        Phase::Active(status) => ResultView::Progress {
            status: *status,
            source_name,
        },
        Phase::JobFailed => ResultView::JobFailed { source_name },
        Phase::ContractViolation(violation) => ResultView::ContractViolation {
            detail: violation.to_string(),
        },
        Phase::NotFound => ResultView::NotFound,
        Phase::Completed => {
            let Some(result) = snapshot.and_then(|snapshot| snapshot.result.as_ref()) else {
                return ResultView::ContractViolation {
                    detail: ContractViolation::MissingResult.to_string(),
                };
            };
            let sections = result
                .sections()
                .map(|(key, body)| SectionView {
                    key,
                    title: key.title(),
                    body: body.to_string(),
                    expanded: visibility.map_or(true, |v| v.is_expanded(key)),
                })
                .collect();
            ResultView::Sections(SectionsView {
                title: result.title().to_string(),
                source_name,
                sections,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AnalysisResult, TogglePolicy};

    fn completed() -> JobSnapshot {
        JobSnapshot {
            job_id: JobId::from("5"),
            source_name: "attention.pdf".into(),
            status: JobStatus::Completed,
            result: Some(
                AnalysisResult::new(
                    "Attention",
                    SectionKey::ALL
                        .iter()
                        .map(|key| (*key, format!("{} text", key.wire_key()))),
                )
                .unwrap(),
            ),
        }
    }

    #[test]
    fn no_snapshot_renders_loading() {
        assert_eq!(render(&Phase::AwaitingSnapshot, None, None), ResultView::Loading);
    }

    #[test]
    fn active_renders_progress_with_label() {
        let mut snapshot = completed();
        snapshot.status = JobStatus::Processing;
        snapshot.result = None;
        let view = render(&Phase::Active(JobStatus::Processing), Some(&snapshot), None);
        assert_eq!(
            view,
            ResultView::Progress {
                status: JobStatus::Processing,
                source_name: "attention.pdf".into()
            }
        );
    }

    #[test]
    fn completed_renders_sections_with_visibility_flags() {
        let snapshot = completed();
        let mut visibility =
            SectionVisibility::all_expanded(JobId::from("5"), TogglePolicy::Independent);
        visibility.toggle(SectionKey::Background);

        let ResultView::Sections(view) =
            render(&Phase::Completed, Some(&snapshot), Some(&visibility))
        else {
            panic!("expected sections");
        };
        assert_eq!(view.title, "Attention");
        assert_eq!(view.sections.len(), 6);
        let flags: Vec<_> = view.sections.iter().map(|s| (s.key, s.expanded)).collect();
        assert_eq!(flags[1], (SectionKey::Background, false));
        assert!(flags.iter().filter(|(_, expanded)| *expanded).count() == 5);
        assert_eq!(view.sections[0].body, "exec_summary text");
    }

    #[test]
    fn completed_without_result_is_contract_violation() {
        let mut snapshot = completed();
        snapshot.result = None;
        let view = render(&Phase::Completed, Some(&snapshot), None);
        assert!(matches!(view, ResultView::ContractViolation { .. }));
    }

    #[test]
    fn render_is_deterministic() {
        let snapshot = completed();
        let a = render(&Phase::Completed, Some(&snapshot), None);
        let b = render(&Phase::Completed, Some(&snapshot), None);
        assert_eq!(a, b);
    }
}
