use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::repositories::RepositoryRef;
use crate::watchdog::WorkerResult;

/// One failure reason tagged with the repository it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub repository: RepositoryRef,
    pub reason: String,
}

/// Aggregate outcome of a monitoring run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub total_retries: u32,
    pub failures: Vec<FailureEntry>,
    /// Per-repository results in input order
    pub repositories: Vec<WorkerResult>,
}

impl Report {
    /// Aggregates worker results, stamped with `generated_at`.
    pub fn from_results(results: Vec<WorkerResult>, generated_at: DateTime<Utc>) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        let failures = results
            .iter()
            .filter(|r| !r.success)
            .flat_map(|r| {
                r.failures.iter().map(|reason| FailureEntry {
                    repository: r.repository.clone(),
                    reason: reason.clone(),
                })
            })
            .collect();

        Self {
            generated_at,
            total: results.len(),
            passed,
            failed: results.len() - passed,
            total_retries: results.iter().map(|r| r.retries).sum(),
            failures,
            repositories: results,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watchdog::TerminalState;

    fn generated_at() -> DateTime<Utc> {
        "2024-06-10T12:00:00Z".parse().unwrap()
    }

    fn results() -> Vec<WorkerResult> {
        vec![
            WorkerResult::succeeded(
                RepositoryRef::new("org/app"),
                "https://gitlab.example.com/org/app/-/pipelines/1".to_string(),
                2,
            ),
            WorkerResult::failed(
                RepositoryRef::new("org/lib"),
                TerminalState::FailedThreshold,
                "job 'deploy' failed 3 times, reaching the retry threshold of 3",
                3,
            ),
            WorkerResult::failed(
                RepositoryRef::new("org/docs"),
                TerminalState::NoPipeline,
                "no pipeline found",
                0,
            ),
        ]
    }

    #[test]
    fn test_counts_passed_and_failed() {
        let report = Report::from_results(results(), generated_at());

        assert_eq!(report.total, 3);
        assert_eq!(report.passed, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(report.total_retries, 5);
        assert!(report.failures.len() >= report.failed);
        assert!(!report.all_passed());
    }

    #[test]
    fn test_failures_are_tagged_in_input_order() {
        let report = Report::from_results(results(), generated_at());

        let tagged: Vec<_> = report
            .failures
            .iter()
            .map(|f| f.repository.as_str())
            .collect();
        assert_eq!(tagged, vec!["org/lib", "org/docs"]);
        assert_eq!(report.failures[1].reason, "no pipeline found");
    }

    #[test]
    fn test_empty_run() {
        let report = Report::from_results(Vec::new(), generated_at());
        assert_eq!(report.total, 0);
        assert!(report.failures.is_empty());
        assert!(report.all_passed());
        assert_eq!(report.generated_at, generated_at());
    }
}
