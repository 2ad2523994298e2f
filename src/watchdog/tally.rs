use std::collections::HashMap;

/// Per-repository count of failed or canceled observations, keyed by job name.
///
/// Keyed by name so a retried job, which GitLab re-creates with a new id,
/// keeps accumulating against the same entry. Counts only ever go up.
#[derive(Debug, Default)]
pub struct FailureTally {
    counts: HashMap<String, u32>,
}

impl FailureTally {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn count(&self, job_name: &str) -> u32 {
        self.counts.get(job_name).copied().unwrap_or(0)
    }

    /// Records one more failure and returns the new count.
    pub fn record(&mut self, job_name: &str) -> u32 {
        let count = self.counts.entry(job_name.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}
