use anyhow::Result;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Config, ConnectionOverrides, MonitorOverrides, ReportFormat};
use crate::operations::{
    parse_point_in_time, stop_pipelines, trigger_pipelines, StopOptions, TimeWindow,
};
use crate::output::{
    print_monitor_summary, print_stop_summary, print_trigger_summary, write_report_file,
    MonitorProgress,
};
use crate::providers::gitlab::GitLabClient;
use crate::repositories::{load_repositories, RepositoryRef};
use crate::report::Report;
use crate::watchdog::{monitor_all, Watchdog};

#[derive(Parser)]
#[command(name = "pipewatch")]
#[command(author, version, about = "GitLab pipeline watchdog", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./pipewatch.{toml,json,yaml,yml} when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// GitLab instance URL
    #[arg(long, env = "GITLAB_URL", global = true)]
    url: Option<String>,

    /// GitLab personal access token
    #[arg(long, env = "PRIVATE_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// File listing one repository path or clone URL per line
    #[arg(long, env = "REPOS_FILE", global = true)]
    repos_file: Option<PathBuf>,

    /// Skip TLS certificate verification
    #[arg(long, global = true, default_value_t = false)]
    insecure: bool,

    /// Also write the summary to this file
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Format of the summary file
    #[arg(long, global = true, value_enum)]
    format: Option<ReportFormat>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow each repository's latest pipeline, retrying failed jobs
    Monitor {
        /// Failures per job name that end the repository as failed
        #[arg(long, env = "THRESHOLD")]
        threshold: Option<u32>,

        /// Seconds between status checks
        #[arg(short, long)]
        interval: Option<u64>,

        /// Give up on a repository after this many seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Repositories polled at the same time
        #[arg(long)]
        max_concurrent: Option<usize>,
    },
    /// Create a pipeline on a branch in every repository
    Trigger {
        /// Target branch to run pipelines on
        #[arg(short, long)]
        branch: String,
    },
    /// Cancel running and pending pipelines
    Stop {
        #[command(flatten)]
        window: WindowArgs,

        /// Only cancel pipelines on these branches
        #[arg(long = "branch", num_args = 1..)]
        branches: Vec<String>,

        /// List every stopped pipeline
        #[arg(short, long, default_value_t = false)]
        verbose: bool,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct WindowArgs {
    /// Pipelines updated after this point (days ago or YYYY-MM-DDTHH:MM:SS)
    #[arg(short, long)]
    after: Option<String>,

    /// Pipelines updated before this point (days ago or YYYY-MM-DDTHH:MM:SS)
    #[arg(short, long)]
    before: Option<String>,

    /// Every pipeline, ignoring update time
    #[arg(long, default_value_t = false)]
    all: bool,
}

impl WindowArgs {
    fn window(&self) -> Result<TimeWindow> {
        let now = Utc::now();
        let window = match (&self.after, &self.before) {
            (Some(after), _) => TimeWindow::UpdatedAfter(parse_point_in_time(after, now)?),
            (None, Some(before)) => TimeWindow::UpdatedBefore(parse_point_in_time(before, now)?),
            (None, None) => TimeWindow::All,
        };
        Ok(window)
    }
}

/// Settings shared by every subcommand once configuration is resolved.
struct Session {
    client: GitLabClient,
    repositories: Vec<RepositoryRef>,
    format: ReportFormat,
    pretty: bool,
    output: Option<PathBuf>,
}

impl Cli {
    /// Resolves configuration, loads repositories and authenticates.
    ///
    /// Every failure here is fatal and happens before any GitLab work starts.
    async fn open_session(&self, config: &Config) -> Result<Session> {
        let connection = config.connection(ConnectionOverrides {
            base_url: self.url.clone(),
            token: self.token.clone(),
            repos_file: self.repos_file.clone(),
            insecure: self.insecure,
        })?;
        info!("GITLAB_URL: {}", connection.base_url);

        let repositories = load_repositories(&connection.repos_file, &connection.base_url)?;

        let client = GitLabClient::new(
            &connection.base_url,
            Some(connection.token),
            connection.insecure,
        )?;
        client.authenticate().await?;

        Ok(Session {
            client,
            repositories,
            format: self.format.unwrap_or(config.output.format),
            pretty: self.pretty || config.output.pretty,
            output: self.output.clone().or_else(|| config.output.path.clone()),
        })
    }

    async fn execute_monitor(
        &self,
        config: &Config,
        session: Session,
        overrides: MonitorOverrides,
    ) -> Result<()> {
        let (settings, max_concurrent) = config.monitor(overrides);
        let threshold = settings.threshold;
        info!(
            "Retry threshold: {threshold}, poll interval: {}s",
            settings.backoff.as_secs()
        );

        let watchdog = Arc::new(Watchdog::new(Arc::new(session.client), settings));

        let progress = MonitorProgress::start(session.repositories.len());
        let tracker = progress.clone();
        let results = monitor_all(watchdog, session.repositories, max_concurrent, move |result| {
            tracker.repository_finished(&result.repository);
        })
        .await;
        progress.finish();

        let report = Report::from_results(results, Utc::now());
        if report.all_passed() {
            info!("All {} repositories passed.", report.total);
        } else {
            warn!(
                "Passed: {}/{}, Failed: {}/{}",
                report.passed, report.total, report.failed, report.total
            );
        }

        print_monitor_summary(&report, threshold);

        if let Some(path) = &session.output {
            write_report_file(&report, session.format, session.pretty, path)?;
        }

        Ok(())
    }

    async fn execute_trigger(&self, session: Session, branch: &str) -> Result<()> {
        let report = trigger_pipelines(&session.client, &session.repositories, branch).await;
        print_trigger_summary(&report);

        if let Some(path) = &session.output {
            write_report_file(&report, session.format, session.pretty, path)?;
        }

        info!("Pipeline processing completed for all repositories.");
        Ok(())
    }

    async fn execute_stop(
        &self,
        session: Session,
        window: TimeWindow,
        branches: &[String],
        verbose: bool,
    ) -> Result<()> {
        let options = StopOptions {
            window,
            branches: branches.to_vec(),
        };
        let report = stop_pipelines(&session.client, &session.repositories, &options).await;
        print_stop_summary(&report, verbose);

        if let Some(path) = &session.output {
            write_report_file(&report, session.format, session.pretty, path)?;
        }

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        match &self.command {
            Commands::Monitor {
                threshold,
                interval,
                timeout,
                max_concurrent,
            } => {
                let overrides = MonitorOverrides {
                    threshold: *threshold,
                    interval_secs: *interval,
                    timeout_secs: *timeout,
                    max_concurrent: *max_concurrent,
                };
                let session = self.open_session(&config).await?;
                self.execute_monitor(&config, session, overrides).await
            }
            Commands::Trigger { branch } => {
                let session = self.open_session(&config).await?;
                self.execute_trigger(session, branch).await
            }
            Commands::Stop {
                window,
                branches,
                verbose,
            } => {
                let window = window.window()?;
                let session = self.open_session(&config).await?;
                self.execute_stop(session, window, branches, *verbose).await
            }
        }
    }
}
