//! Job batch and completion rule.

use dotd_common::JobStatus;

/// The locators submitted in one run. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobBatch(Vec<String>);

impl JobBatch {
    /// Build a batch, dropping blank locators.
    #[must_use]
    pub fn new(locators: impl IntoIterator<Item = String>) -> Self {
        Self(
            locators
                .into_iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
        )
    }

    #[must_use]
    pub fn locators(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// `true` iff at least one job exists and every job is complete.
#[must_use]
pub fn is_batch_complete(jobs: &[JobStatus]) -> bool {
    !jobs.is_empty() && jobs.iter().all(JobStatus::is_complete)
}
