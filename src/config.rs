use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::Token;
use crate::error::PipewatchError;
use crate::watchdog::{
    WatchdogSettings, DEFAULT_BACKOFF, DEFAULT_MAX_CONCURRENT, DEFAULT_THRESHOLD,
};

/// Configuration file structure for pipewatch.
///
/// Every value can also come from the command line or the environment, which
/// take precedence over the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub gitlab: GitLabConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitLabConfig {
    /// GitLab instance base URL
    pub base_url: Option<String>,

    /// GitLab personal access token
    pub token: Option<String>,

    /// File listing one repository per line
    pub repos_file: Option<PathBuf>,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MonitorConfig {
    /// Failures per job name that end a repository as failed
    #[serde(default = "default_threshold")]
    pub threshold: u32,

    /// Seconds between status checks
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Give up on a repository after this many seconds
    pub timeout_secs: Option<u64>,

    /// Repositories polled at the same time
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Format of the persisted summary
    #[serde(default)]
    pub format: ReportFormat,

    /// Pretty-print JSON summaries
    #[serde(default)]
    pub pretty: bool,

    /// Where to write the persisted summary
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            interval_secs: default_interval_secs(),
            timeout_secs: None,
            max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_threshold() -> u32 {
    DEFAULT_THRESHOLD
}

fn default_interval_secs() -> u64 {
    DEFAULT_BACKOFF.as_secs()
}

fn default_max_concurrent() -> usize {
    DEFAULT_MAX_CONCURRENT
}

pub const DEFAULT_REPOS_FILE: &str = "repositories.txt";

/// Values from the command line and environment that override the file.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub repos_file: Option<PathBuf>,
    pub insecure: bool,
}

/// Everything needed to reach GitLab and find the repository list.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub base_url: String,
    pub token: Token,
    pub repos_file: PathBuf,
    pub insecure: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MonitorOverrides {
    pub threshold: Option<u32>,
    pub interval_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub max_concurrent: Option<usize>,
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./pipewatch.toml
    /// 3. ./pipewatch.json
    /// 4. ./pipewatch.yaml
    /// 5. ./pipewatch.yml
    ///
    /// Returns default configuration if no path is given and no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "pipewatch.toml",
            "pipewatch.json",
            "pipewatch.yaml",
            "pipewatch.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Merges connection settings, failing when URL or token is missing.
    pub fn connection(&self, overrides: ConnectionOverrides) -> Result<ConnectionSettings> {
        let base_url = overrides
            .base_url
            .or_else(|| self.gitlab.base_url.clone())
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| PipewatchError::Config("GITLAB_URL is not set.".to_string()))?;

        let token = overrides
            .token
            .or_else(|| self.gitlab.token.clone())
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| PipewatchError::Config("PRIVATE_TOKEN is not set.".to_string()))?;

        let repos_file = overrides
            .repos_file
            .or_else(|| self.gitlab.repos_file.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REPOS_FILE));

        Ok(ConnectionSettings {
            base_url,
            token: Token::from(token),
            repos_file,
            insecure: overrides.insecure || self.gitlab.insecure,
        })
    }

    /// Watchdog tuning and concurrency limit.
    pub fn monitor(&self, overrides: MonitorOverrides) -> (WatchdogSettings, usize) {
        let interval = overrides.interval_secs.unwrap_or(self.monitor.interval_secs);
        let settings = WatchdogSettings {
            threshold: overrides.threshold.unwrap_or(self.monitor.threshold),
            backoff: Duration::from_secs(interval),
            timeout: overrides
                .timeout_secs
                .or(self.monitor.timeout_secs)
                .map(Duration::from_secs),
        };
        let max_concurrent = overrides.max_concurrent.unwrap_or(self.monitor.max_concurrent);

        (settings, max_concurrent)
    }
}
