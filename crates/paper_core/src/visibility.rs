use std::collections::BTreeSet;

use crate::{JobId, SectionKey};

/// How a toggle interacts with the other sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TogglePolicy {
    /// Each section opens and closes on its own.
    #[default]
    Independent,
    /// Opening a section closes every other one (accordion).
    Exclusive,
}

/// Expanded-section set for exactly one completed job.
///
/// Created once per job identifier with every section expanded; only user
/// actions change it afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionVisibility {
    job_id: JobId,
    policy: TogglePolicy,
    expanded: BTreeSet<SectionKey>,
}

impl SectionVisibility {
    pub fn all_expanded(job_id: JobId, policy: TogglePolicy) -> Self {
        Self {
            job_id,
            policy,
            expanded: SectionKey::ALL.into_iter().collect(),
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn policy(&self) -> TogglePolicy {
        self.policy
    }

    pub fn is_expanded(&self, key: SectionKey) -> bool {
        self.expanded.contains(&key)
    }

    pub fn expanded(&self) -> &BTreeSet<SectionKey> {
        &self.expanded
    }

    /// Flips `key` and returns whether it is now expanded.
    ///
    /// Under [`TogglePolicy::Exclusive`], expanding a key collapses all others;
    /// collapsing a key leaves the rest untouched.
    pub fn toggle(&mut self, key: SectionKey) -> bool {
        if self.expanded.remove(&key) {
            return false;
        }
        if self.policy == TogglePolicy::Exclusive {
            self.expanded.clear();
        }
        self.expanded.insert(key);
        true
    }

    pub fn expand_all(&mut self) {
        self.expanded = SectionKey::ALL.into_iter().collect();
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }
}
