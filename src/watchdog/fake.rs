//! Scripted in-memory `PipelineApi` for watchdog tests.

use std::sync::Mutex;

use async_trait::async_trait;

use super::api::PipelineApi;
use crate::error::{PipewatchError, Result};
use crate::providers::gitlab::{Job, Pipeline, PipelineStatus};
use crate::repositories::RepositoryRef;

pub fn job(id: u64, name: &str, status: PipelineStatus) -> Job {
    Job {
        id,
        name: name.to_string(),
        stage: "test".to_string(),
        status,
        web_url: None,
    }
}

fn pipeline(id: u64, status: PipelineStatus) -> Pipeline {
    Pipeline {
        id,
        status,
        ref_: "main".to_string(),
        web_url: format!("https://gitlab.example.com/org/app/-/pipelines/{id}"),
        updated_at: None,
    }
}

struct Poll {
    status: PipelineStatus,
    jobs: Vec<Job>,
}

#[derive(Default)]
struct Calls {
    refreshes: usize,
    retried: Vec<String>,
}

/// Each `refresh_pipeline` call advances to the next scripted poll; the last
/// poll repeats forever. `list_jobs` answers with the current poll's jobs.
/// Without any scripted poll the pipeline stays `running` with no jobs.
pub struct FakePipelineApi {
    pipeline_id: Option<u64>,
    polls: Vec<Poll>,
    fail_refresh: Option<(usize, String)>,
    reject_retries: bool,
    calls: Mutex<Calls>,
}

impl FakePipelineApi {
    pub fn with_pipeline(id: u64) -> Self {
        Self {
            pipeline_id: Some(id),
            polls: Vec::new(),
            fail_refresh: None,
            reject_retries: false,
            calls: Mutex::new(Calls::default()),
        }
    }

    pub fn without_pipeline() -> Self {
        Self {
            pipeline_id: None,
            ..Self::with_pipeline(0)
        }
    }

    pub fn poll(mut self, status: PipelineStatus, jobs: Vec<Job>) -> Self {
        self.polls.push(Poll { status, jobs });
        self
    }

    /// Makes the `call`-th refresh (1-based) fail with `message`.
    pub fn fail_refresh_on(mut self, call: usize, message: &str) -> Self {
        self.fail_refresh = Some((call, message.to_string()));
        self
    }

    pub fn reject_retries(mut self) -> Self {
        self.reject_retries = true;
        self
    }

    pub fn retried(&self) -> Vec<String> {
        self.calls.lock().unwrap().retried.clone()
    }

    pub fn refresh_calls(&self) -> usize {
        self.calls.lock().unwrap().refreshes
    }

    fn current_poll(&self) -> Option<&Poll> {
        let refreshes = self.calls.lock().unwrap().refreshes;
        let index = refreshes
            .saturating_sub(1)
            .min(self.polls.len().saturating_sub(1));
        self.polls.get(index)
    }
}

#[async_trait]
impl PipelineApi for FakePipelineApi {
    async fn latest_pipeline(&self, _repository: &RepositoryRef) -> Result<Option<Pipeline>> {
        Ok(self
            .pipeline_id
            .map(|id| pipeline(id, PipelineStatus::Pending)))
    }

    async fn refresh_pipeline(
        &self,
        _repository: &RepositoryRef,
        current: &Pipeline,
    ) -> Result<Pipeline> {
        let refreshes = {
            let mut calls = self.calls.lock().unwrap();
            calls.refreshes += 1;
            calls.refreshes
        };

        if let Some((call, message)) = &self.fail_refresh {
            if *call == refreshes {
                return Err(PipewatchError::Api {
                    status: 502,
                    message: message.clone(),
                });
            }
        }

        let status = self
            .current_poll()
            .map_or(PipelineStatus::Running, |poll| poll.status.clone());
        Ok(pipeline(current.id, status))
    }

    async fn list_jobs(&self, _repository: &RepositoryRef, _pipeline: &Pipeline) -> Result<Vec<Job>> {
        Ok(self
            .current_poll()
            .map(|poll| poll.jobs.clone())
            .unwrap_or_default())
    }

    async fn retry_job(&self, _repository: &RepositoryRef, job: &Job) -> Result<()> {
        self.calls.lock().unwrap().retried.push(job.name.clone());

        if self.reject_retries {
            return Err(PipewatchError::Retry {
                job: job.name.clone(),
                message: "403 Forbidden".to_string(),
            });
        }
        Ok(())
    }
}
