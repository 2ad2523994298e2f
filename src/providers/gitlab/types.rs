use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status shared by GitLab pipelines and jobs.
///
/// Values GitLab adds later land in `Other` instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PipelineStatus {
    Created,
    WaitingForResource,
    Preparing,
    Pending,
    Running,
    Canceling,
    WaitingForCallback,
    Success,
    Failed,
    Canceled,
    Skipped,
    Manual,
    Scheduled,
    Other(String),
}

impl PipelineStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::WaitingForResource => "waiting_for_resource",
            Self::Preparing => "preparing",
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Canceling => "canceling",
            Self::WaitingForCallback => "waiting_for_callback",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Skipped => "skipped",
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
            Self::Other(value) => value,
        }
    }

    /// Still on its way to a final status.
    ///
    /// Unknown values count as active, so the watchdog keeps polling them.
    pub fn is_active(&self) -> bool {
        !matches!(
            self,
            Self::Success | Self::Failed | Self::Canceled | Self::Skipped | Self::Manual
        )
    }

    /// Job outcomes the watchdog retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed | Self::Canceled)
    }

    /// Pipelines the stop command is allowed to cancel.
    pub fn is_cancelable(&self) -> bool {
        matches!(self, Self::Running | Self::Pending)
    }
}

impl From<String> for PipelineStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "created" => Self::Created,
            "waiting_for_resource" => Self::WaitingForResource,
            "preparing" => Self::Preparing,
            "pending" => Self::Pending,
            "running" => Self::Running,
            "canceling" => Self::Canceling,
            "waiting_for_callback" => Self::WaitingForCallback,
            "success" => Self::Success,
            "failed" => Self::Failed,
            "canceled" => Self::Canceled,
            "skipped" => Self::Skipped,
            "manual" => Self::Manual,
            "scheduled" => Self::Scheduled,
            _ => Self::Other(value),
        }
    }
}

impl From<PipelineStatus> for String {
    fn from(status: PipelineStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A GitLab pipeline as returned by the REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: u64,
    pub status: PipelineStatus,
    /// Branch or tag the pipeline ran on
    #[serde(rename = "ref", default)]
    pub ref_: String,
    pub web_url: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A job within a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    /// Job name as defined in .gitlab-ci.yml
    pub name: String,
    #[serde(default)]
    pub stage: String,
    pub status: PipelineStatus,
    #[serde(default)]
    pub web_url: Option<String>,
}

/// Query filters for listing a project's pipelines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineFilter {
    pub updated_after: Option<DateTime<Utc>>,
    pub updated_before: Option<DateTime<Utc>>,
}

impl PipelineFilter {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(after) = self.updated_after {
            pairs.push(("updated_after", after.to_rfc3339()));
        }
        if let Some(before) = self.updated_before {
            pairs.push(("updated_before", before.to_rfc3339()));
        }
        pairs
    }
}
