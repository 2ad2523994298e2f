use async_trait::async_trait;
use log::debug;

use super::core::GitLabClient;
use crate::error::{PipewatchError, Result};
use crate::providers::gitlab::types::{Job, Pipeline, PipelineFilter};
use crate::repositories::RepositoryRef;
use crate::watchdog::PipelineApi;

impl GitLabClient {
    /// Creates a pipeline for `branch` (`POST /projects/:id/pipeline`).
    ///
    /// # Errors
    ///
    /// Returns `ProjectNotFound` when the project is missing or not visible to
    /// the token, or an API error when GitLab refuses to create the pipeline.
    pub async fn create_pipeline(&self, repository: &RepositoryRef, branch: &str) -> Result<Pipeline> {
        let url = Self::join(&self.project_url(repository)?, "pipeline")?;
        debug!("POST {url} ref={branch}");

        let response = self
            .send(self.client().post(url).query(&[("ref", branch)]))
            .await
            .map_err(|e| match e {
                PipewatchError::Api { status: 404, .. } => {
                    PipewatchError::ProjectNotFound(repository.to_string())
                }
                other => other,
            })?;

        Ok(response.json().await?)
    }

    /// Lists every pipeline of a project matching `filter`, newest first.
    pub async fn list_pipelines(
        &self,
        repository: &RepositoryRef,
        filter: &PipelineFilter,
    ) -> Result<Vec<Pipeline>> {
        let url = Self::join(&self.project_url(repository)?, "pipelines")?;
        self.get_paginated(url, &filter.query_pairs()).await
    }

    /// Cancels a pipeline's running and pending jobs.
    pub async fn cancel_pipeline(&self, repository: &RepositoryRef, pipeline: &Pipeline) -> Result<()> {
        let url = Self::join(
            &self.project_url(repository)?,
            &format!("pipelines/{}/cancel", pipeline.id),
        )?;
        debug!("POST {url}");

        self.send(self.client().post(url)).await?;
        Ok(())
    }
}

#[async_trait]
impl PipelineApi for GitLabClient {
    async fn latest_pipeline(&self, repository: &RepositoryRef) -> Result<Option<Pipeline>> {
        let url = Self::join(&self.project_url(repository)?, "pipelines")?;
        let query = [
            ("per_page", "1".to_string()),
            ("order_by", "id".to_string()),
            ("sort", "desc".to_string()),
        ];

        let pipelines: Vec<Pipeline> = self.get_json(url, &query).await?;
        Ok(pipelines.into_iter().next())
    }

    async fn refresh_pipeline(
        &self,
        repository: &RepositoryRef,
        pipeline: &Pipeline,
    ) -> Result<Pipeline> {
        let url = Self::join(
            &self.project_url(repository)?,
            &format!("pipelines/{}", pipeline.id),
        )?;
        self.get_json(url, &[]).await
    }

    async fn list_jobs(&self, repository: &RepositoryRef, pipeline: &Pipeline) -> Result<Vec<Job>> {
        let url = Self::join(
            &self.project_url(repository)?,
            &format!("pipelines/{}/jobs", pipeline.id),
        )?;
        self.get_paginated(url, &[]).await
    }

    async fn retry_job(&self, repository: &RepositoryRef, job: &Job) -> Result<()> {
        let url = Self::join(
            &self.project_url(repository)?,
            &format!("jobs/{}/retry", job.id),
        )?;
        debug!("POST {url}");

        self.send(self.client().post(url))
            .await
            .map_err(|e| PipewatchError::Retry {
                job: job.name.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}
