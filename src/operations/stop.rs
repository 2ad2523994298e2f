use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::error::{PipewatchError, Result};
use crate::providers::gitlab::{GitLabClient, Pipeline, PipelineFilter};
use crate::repositories::RepositoryRef;

/// Which pipelines, by last update time, the stop command looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    All,
    UpdatedAfter(DateTime<Utc>),
    UpdatedBefore(DateTime<Utc>),
}

impl TimeWindow {
    fn filter(self) -> PipelineFilter {
        match self {
            Self::All => PipelineFilter::default(),
            Self::UpdatedAfter(after) => PipelineFilter {
                updated_after: Some(after),
                updated_before: None,
            },
            Self::UpdatedBefore(before) => PipelineFilter {
                updated_after: None,
                updated_before: Some(before),
            },
        }
    }
}

/// Parses a point in time given as whole days ago or as an ISO datetime.
///
/// Accepted: `3`, `2024-05-01`, `2024-05-01T08:30:00`, RFC 3339.
pub fn parse_point_in_time(value: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(days) = value.parse::<i64>() {
        return TimeDelta::try_days(days)
            .and_then(|delta| now.checked_sub_signed(delta))
            .ok_or_else(|| PipewatchError::Config(format!("{days} days is out of range")));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Ok(parsed.and_utc());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
        .ok_or_else(|| {
            PipewatchError::Config(format!(
                "Invalid time '{value}': expected a number of days or YYYY-MM-DDTHH:MM:SS"
            ))
        })
}

#[derive(Debug, Clone)]
pub struct StopOptions {
    pub window: TimeWindow,
    /// Only pipelines on these refs are cancelled; empty means every ref
    pub branches: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoppedPipeline {
    pub id: u64,
    #[serde(rename = "ref")]
    pub ref_: String,
    pub web_url: String,
}

/// Per-repository tally of the stop run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryStops {
    pub detected: usize,
    pub stopped: usize,
    pub skipped: usize,
    pub pipelines: Vec<StoppedPipeline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopTotals {
    pub detected: usize,
    pub stopped: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopReport {
    pub generated_at: DateTime<Utc>,
    pub repositories: IndexMap<RepositoryRef, RepositoryStops>,
}

impl StopReport {
    pub fn totals(&self) -> StopTotals {
        self.repositories
            .values()
            .fold(StopTotals::default(), |mut totals, stops| {
                totals.detected += stops.detected;
                totals.stopped += stops.stopped;
                totals.skipped += stops.skipped;
                totals
            })
    }
}

/// Cancels running and pending pipelines matching `options` in every repository.
///
/// Listing failures are recorded against the repository; a failed cancel is
/// logged and counted as neither stopped nor skipped.
pub async fn stop_pipelines(
    client: &GitLabClient,
    repositories: &[RepositoryRef],
    options: &StopOptions,
) -> StopReport {
    let filter = options.window.filter();
    info!(
        "Stopping pipelines updated after: {:?}, before: {:?}, branches: {:?}",
        filter.updated_after, filter.updated_before, options.branches
    );

    let mut report = IndexMap::new();

    for repository in repositories {
        info!("Checking repository: {repository}");

        let stops = match client.list_pipelines(repository, &filter).await {
            Ok(pipelines) => stop_repository(client, repository, pipelines, options).await,
            Err(e) => {
                error!("Error fetching pipelines for repository {repository}: {e}");
                RepositoryStops {
                    error: Some(e.to_string()),
                    ..RepositoryStops::default()
                }
            }
        };

        report.insert(repository.clone(), stops);
    }

    StopReport {
        generated_at: Utc::now(),
        repositories: report,
    }
}

async fn stop_repository(
    client: &GitLabClient,
    repository: &RepositoryRef,
    pipelines: Vec<Pipeline>,
    options: &StopOptions,
) -> RepositoryStops {
    let mut stops = RepositoryStops {
        detected: pipelines.len(),
        ..RepositoryStops::default()
    };

    let (eligible, ineligible): (Vec<_>, Vec<_>) = pipelines.into_iter().partition(|pipeline| {
        let on_branch = options.branches.is_empty() || options.branches.contains(&pipeline.ref_);
        on_branch && pipeline.status.is_cancelable()
    });
    stops.skipped = ineligible.len();

    let cancels = eligible
        .iter()
        .map(|pipeline| client.cancel_pipeline(repository, pipeline));
    let outcomes = futures::future::join_all(cancels).await;

    for (pipeline, outcome) in eligible.into_iter().zip(outcomes) {
        match outcome {
            Ok(()) => {
                info!("Stopped pipeline {} on branch {}.", pipeline.id, pipeline.ref_);
                stops.stopped += 1;
                stops.pipelines.push(StoppedPipeline {
                    id: pipeline.id,
                    ref_: pipeline.ref_,
                    web_url: pipeline.web_url,
                });
            }
            Err(e) => error!("Failed to stop pipeline {}: {e}", pipeline.id),
        }
    }

    stops
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn now() -> DateTime<Utc> {
        "2024-06-10T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_parse_days_ago() {
        let parsed = parse_point_in_time("2", now()).unwrap();
        assert_eq!(parsed, "2024-06-08T12:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_parse_iso_forms() {
        let expected: DateTime<Utc> = "2024-05-01T08:30:00Z".parse().unwrap();
        assert_eq!(parse_point_in_time("2024-05-01T08:30:00", now()).unwrap(), expected);
        assert_eq!(
            parse_point_in_time("2024-05-01T10:30:00+02:00", now()).unwrap(),
            expected
        );
        assert_eq!(
            parse_point_in_time("2024-05-01", now()).unwrap(),
            "2024-05-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_point_in_time("yesterday", now()).unwrap_err();
        assert!(matches!(err, PipewatchError::Config(_)));
    }

    #[test]
    fn test_window_filter() {
        let at = now();
        assert_eq!(TimeWindow::All.filter(), PipelineFilter::default());
        assert_eq!(TimeWindow::UpdatedBefore(at).filter().updated_before, Some(at));
        assert_eq!(TimeWindow::UpdatedAfter(at).filter().updated_after, Some(at));
    }

    fn pipeline_json(id: u64, status: &str, ref_: &str) -> String {
        format!(
            r#"{{"id": {id}, "status": "{status}", "ref": "{ref_}", "web_url": "https://gitlab.example.com/org/app/-/pipelines/{id}"}}"#
        )
    }

    #[tokio::test]
    async fn test_stop_cancels_active_pipelines_on_branch() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", "/api/v4/projects/org%2Fapp/pipelines")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                "[{},{},{},{},{}]",
                pipeline_json(5, "running", "main"),
                pipeline_json(4, "pending", "main"),
                pipeline_json(3, "running", "feature/a"),
                pipeline_json(2, "success", "main"),
                pipeline_json(1, "running", "main"),
            ))
            .create_async()
            .await;
        let cancel_5 = server
            .mock("POST", "/api/v4/projects/org%2Fapp/pipelines/5/cancel")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        let cancel_4 = server
            .mock("POST", "/api/v4/projects/org%2Fapp/pipelines/4/cancel")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        let _cancel_1 = server
            .mock("POST", "/api/v4/projects/org%2Fapp/pipelines/1/cancel")
            .with_status(403)
            .with_body(r#"{"message":"403 Forbidden"}"#)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None, false).unwrap();
        let options = StopOptions {
            window: TimeWindow::All,
            branches: vec!["main".to_string()],
        };
        let report = stop_pipelines(&client, &[RepositoryRef::new("org/app")], &options).await;

        let stops = &report.repositories[&RepositoryRef::new("org/app")];
        assert_eq!(stops.detected, 5);
        assert_eq!(stops.stopped, 2);
        assert_eq!(stops.skipped, 2);
        assert_eq!(
            stops.pipelines.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![5, 4]
        );
        assert_eq!(
            report.totals(),
            StopTotals {
                detected: 5,
                stopped: 2,
                skipped: 2
            }
        );
        cancel_5.assert_async().await;
        cancel_4.assert_async().await;
    }

    #[tokio::test]
    async fn test_stop_records_listing_error() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", "/api/v4/projects/org%2Fgone/pipelines")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message":"404 Project Not Found"}"#)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None, false).unwrap();
        let options = StopOptions {
            window: TimeWindow::All,
            branches: Vec::new(),
        };
        let report = stop_pipelines(&client, &[RepositoryRef::new("org/gone")], &options).await;

        let stops = &report.repositories[&RepositoryRef::new("org/gone")];
        assert_eq!(stops.detected, 0);
        assert!(stops.error.as_deref().unwrap().contains("404"));
    }
}
