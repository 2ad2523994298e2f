use chrono::{DateTime, Utc};
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::providers::gitlab::GitLabClient;
use crate::repositories::RepositoryRef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredPipeline {
    pub repository: RepositoryRef,
    pub pipeline_id: u64,
    pub web_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedTrigger {
    pub repository: RepositoryRef,
    pub error: String,
}

/// Outcome of triggering one branch across many repositories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerReport {
    pub branch: String,
    pub generated_at: DateTime<Utc>,
    pub triggered: Vec<TriggeredPipeline>,
    pub failed: Vec<FailedTrigger>,
}

impl TriggerReport {
    pub fn processed(&self) -> usize {
        self.triggered.len() + self.failed.len()
    }
}

/// Creates a pipeline on `branch` for each repository, one after another.
///
/// A repository that cannot be triggered is recorded and skipped.
pub async fn trigger_pipelines(
    client: &GitLabClient,
    repositories: &[RepositoryRef],
    branch: &str,
) -> TriggerReport {
    let mut triggered = Vec::new();
    let mut failed = Vec::new();

    for repository in repositories {
        info!("Processing repository: {repository}");

        match client.create_pipeline(repository, branch).await {
            Ok(pipeline) => {
                info!(
                    "Triggered pipeline ID {} on branch '{branch}' for repository '{repository}'. Pipeline URL: {}",
                    pipeline.id, pipeline.web_url
                );
                triggered.push(TriggeredPipeline {
                    repository: repository.clone(),
                    pipeline_id: pipeline.id,
                    web_url: pipeline.web_url,
                });
            }
            Err(e) => {
                error!("Failed to trigger pipeline for '{repository}': {e}");
                failed.push(FailedTrigger {
                    repository: repository.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    TriggerReport {
        branch: branch.to_string(),
        generated_at: Utc::now(),
        triggered,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_trigger_collects_successes_and_failures() {
        let mut server = mockito::Server::new_async().await;
        let _created = server
            .mock("POST", "/api/v4/projects/org%2Fapp/pipeline")
            .match_query(Matcher::UrlEncoded("ref".into(), "feature/x".into()))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id": 61, "status": "created", "ref": "feature/x",
                    "web_url": "https://gitlab.example.com/org/app/-/pipelines/61"}"#,
            )
            .create_async()
            .await;
        let _missing = server
            .mock("POST", "/api/v4/projects/org%2Fgone/pipeline")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message":"404 Project Not Found"}"#)
            .create_async()
            .await;
        let _rejected = server
            .mock("POST", "/api/v4/projects/org%2Fnobranch/pipeline")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"message":{"base":["Reference not found"]}}"#)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None, false).unwrap();
        let repositories = vec![
            RepositoryRef::new("org/app"),
            RepositoryRef::new("org/gone"),
            RepositoryRef::new("org/nobranch"),
        ];
        let report = trigger_pipelines(&client, &repositories, "feature/x").await;

        assert_eq!(report.processed(), 3);
        assert_eq!(report.triggered.len(), 1);
        assert_eq!(report.triggered[0].pipeline_id, 61);
        assert_eq!(report.failed.len(), 2);
        assert!(report.failed[0].error.contains("not found"));
        assert!(report.failed[1].error.contains("Reference not found"));
    }
}
