use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::api::PipelineApi;
use super::tally::FailureTally;
use crate::error::Result;
use crate::providers::gitlab::{Job, PipelineStatus};
use crate::repositories::RepositoryRef;

pub const DEFAULT_THRESHOLD: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(10);

/// How a repository's monitoring session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    Succeeded,
    NoPipeline,
    FailedThreshold,
    /// Pipeline finished without success and had no job left to retry
    FailedSettled,
    FailedException,
    FailedTimeout,
}

/// Final record of one repository's worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResult {
    pub repository: RepositoryRef,
    pub state: TerminalState,
    pub success: bool,
    pub failures: Vec<String>,
    pub pipeline_url: Option<String>,
    pub retries: u32,
}

impl WorkerResult {
    pub fn succeeded(repository: RepositoryRef, pipeline_url: String, retries: u32) -> Self {
        Self {
            repository,
            state: TerminalState::Succeeded,
            success: true,
            failures: Vec::new(),
            pipeline_url: Some(pipeline_url),
            retries,
        }
    }

    pub fn failed(
        repository: RepositoryRef,
        state: TerminalState,
        reason: impl Into<String>,
        retries: u32,
    ) -> Self {
        Self {
            repository,
            state,
            success: false,
            failures: vec![reason.into()],
            pipeline_url: None,
            retries,
        }
    }
}

/// Tuning for a watchdog run.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchdogSettings {
    /// Failures of one job name that end the session; retries stop there
    pub threshold: u32,
    /// Pause between polls and after each retry
    pub backoff: Duration,
    /// Per-repository deadline; `None` polls until a terminal state
    pub timeout: Option<Duration>,
}

impl Default for WatchdogSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            backoff: DEFAULT_BACKOFF,
            timeout: None,
        }
    }
}

enum Outcome {
    Succeeded { pipeline_url: String },
    NoPipeline,
    ThresholdExceeded { job: String, failures: u32 },
    Settled { status: PipelineStatus },
    TimedOut { after: Duration },
}

enum JobCheck {
    Clear,
    Retried,
    Exhausted { job: String, failures: u32 },
}

/// Follows a repository's latest pipeline to completion, retrying failed jobs.
pub struct Watchdog<A: ?Sized> {
    api: Arc<A>,
    settings: WatchdogSettings,
}

impl<A> Watchdog<A>
where
    A: PipelineApi + ?Sized,
{
    pub fn new(api: Arc<A>, settings: WatchdogSettings) -> Self {
        Self { api, settings }
    }

    /// Monitors one repository until it reaches a terminal state.
    ///
    /// Never fails: every GitLab error ends the session as
    /// `TerminalState::FailedException` with the error text as reason.
    pub async fn monitor(&self, repository: &RepositoryRef) -> WorkerResult {
        let mut tally = FailureTally::new();
        let mut retries = 0;

        let outcome = self.drive(repository, &mut tally, &mut retries).await;
        let repository = repository.clone();

        match outcome {
            Ok(Outcome::Succeeded { pipeline_url }) => {
                info!("Pipeline for repository {repository} succeeded: {pipeline_url}");
                WorkerResult::succeeded(repository, pipeline_url, retries)
            }
            Ok(Outcome::NoPipeline) => {
                warn!("No pipeline found for repository {repository}");
                WorkerResult::failed(repository, TerminalState::NoPipeline, "no pipeline found", 0)
            }
            Ok(Outcome::ThresholdExceeded { job, failures }) => {
                let reason = format!(
                    "job '{job}' failed {failures} times, reaching the retry threshold of {}",
                    self.settings.threshold
                );
                error!("Repository {repository}: {reason}");
                WorkerResult::failed(repository, TerminalState::FailedThreshold, reason, retries)
            }
            Ok(Outcome::Settled { status }) => {
                let reason = format!("pipeline finished with status {status}");
                error!("Repository {repository}: {reason}");
                WorkerResult::failed(repository, TerminalState::FailedSettled, reason, retries)
            }
            Ok(Outcome::TimedOut { after }) => {
                let reason = format!("gave up after {}s without a final result", after.as_secs());
                error!("Repository {repository}: {reason}");
                WorkerResult::failed(repository, TerminalState::FailedTimeout, reason, retries)
            }
            Err(e) => {
                error!("Error monitoring repository {repository}: {e}");
                WorkerResult::failed(
                    repository,
                    TerminalState::FailedException,
                    e.to_string(),
                    retries,
                )
            }
        }
    }

    async fn drive(
        &self,
        repository: &RepositoryRef,
        tally: &mut FailureTally,
        retries: &mut u32,
    ) -> Result<Outcome> {
        let started = Instant::now();

        let Some(mut pipeline) = self.api.latest_pipeline(repository).await? else {
            return Ok(Outcome::NoPipeline);
        };

        info!(
            "Monitoring repository: {repository}, latest pipeline ID: {}, Status: {}",
            pipeline.id, pipeline.status
        );

        loop {
            if let Some(timeout) = self.settings.timeout {
                if started.elapsed() >= timeout {
                    return Ok(Outcome::TimedOut { after: timeout });
                }
            }

            pipeline = self.api.refresh_pipeline(repository, &pipeline).await?;

            if pipeline.status == PipelineStatus::Success {
                return Ok(Outcome::Succeeded {
                    pipeline_url: pipeline.web_url,
                });
            }

            let jobs = self.api.list_jobs(repository, &pipeline).await?;

            match self.check_jobs(repository, &jobs, tally, retries).await? {
                JobCheck::Retried => {
                    tokio::time::sleep(self.settings.backoff).await;
                    continue;
                }
                JobCheck::Exhausted { job, failures } => {
                    return Ok(Outcome::ThresholdExceeded { job, failures });
                }
                JobCheck::Clear => {}
            }

            if !pipeline.status.is_active() {
                return Ok(Outcome::Settled {
                    status: pipeline.status,
                });
            }

            info!(
                "Pipeline {} is {}, checking again in {}s...",
                pipeline.id,
                pipeline.status,
                self.settings.backoff.as_secs()
            );
            tokio::time::sleep(self.settings.backoff).await;
        }
    }

    /// Records the first failed or canceled job and retries it while its
    /// tally stays under the threshold.
    async fn check_jobs(
        &self,
        repository: &RepositoryRef,
        jobs: &[Job],
        tally: &mut FailureTally,
        retries: &mut u32,
    ) -> Result<JobCheck> {
        if let Some(job) = jobs.iter().find(|job| job.status.is_retryable()) {
            let failures = tally.record(&job.name);

            if failures >= self.settings.threshold {
                return Ok(JobCheck::Exhausted {
                    job: job.name.clone(),
                    failures,
                });
            }

            *retries += 1;
            warn!(
                "Job '{}' ({}) in {repository} is {}, retrying ({failures}/{})...",
                job.name, job.id, job.status, self.settings.threshold
            );
            self.api.retry_job(repository, job).await?;

            return Ok(JobCheck::Retried);
        }

        Ok(JobCheck::Clear)
    }
}
