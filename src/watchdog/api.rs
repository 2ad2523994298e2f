use async_trait::async_trait;

use crate::error::Result;
use crate::providers::gitlab::{Job, Pipeline};
use crate::repositories::RepositoryRef;

/// The pipeline operations the watchdog drives.
///
/// Implemented by the GitLab REST client; tests substitute an in-memory fake.
/// Implementations must be safe to share across workers.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Most recent pipeline of the repository, if it has any.
    async fn latest_pipeline(&self, repository: &RepositoryRef) -> Result<Option<Pipeline>>;

    /// Re-fetches a pipeline to pick up its current status.
    async fn refresh_pipeline(
        &self,
        repository: &RepositoryRef,
        pipeline: &Pipeline,
    ) -> Result<Pipeline>;

    /// All jobs of a pipeline, latest attempt of each.
    async fn list_jobs(&self, repository: &RepositoryRef, pipeline: &Pipeline) -> Result<Vec<Job>>;

    /// Asks GitLab to run a job again.
    ///
    /// Fails with `PipewatchError::Retry` when GitLab rejects the retry.
    async fn retry_job(&self, repository: &RepositoryRef, job: &Job) -> Result<()>;
}
