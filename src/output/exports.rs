use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use log::info;

use crate::config::ReportFormat;
use crate::operations::{StopReport, TriggerReport};
use crate::report::Report;

/// Plain-text rendering used for persisted summaries.
pub trait TextReport {
    fn write_text(&self, output: &mut dyn Write) -> Result<()>;
}

/// Writes a report in the requested format.
pub fn export_report<T>(
    report: &T,
    format: ReportFormat,
    pretty: bool,
    output: &mut dyn Write,
) -> Result<()>
where
    T: Serialize + TextReport,
{
    match format {
        ReportFormat::Text => report.write_text(output),
        ReportFormat::Json => {
            let json = if pretty {
                serde_json::to_string_pretty(report)?
            } else {
                serde_json::to_string(report)?
            };
            writeln!(output, "{json}")?;
            Ok(())
        }
    }
}

/// Persists a report to `path`.
pub fn write_report_file<T>(report: &T, format: ReportFormat, pretty: bool, path: &Path) -> Result<()>
where
    T: Serialize + TextReport,
{
    let mut buffer = Vec::new();
    export_report(report, format, pretty, &mut buffer)?;
    std::fs::write(path, buffer)?;
    info!("Summary written to: {}", path.display());
    Ok(())
}

impl TextReport for Report {
    fn write_text(&self, output: &mut dyn Write) -> Result<()> {
        writeln!(output, "--- Summary Report ---")?;
        writeln!(output, "Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(output, "Total Repositories: {}", self.total)?;
        writeln!(output, "Passed: {}/{}", self.passed, self.total)?;
        writeln!(output, "Failed: {}/{}", self.failed, self.total)?;
        writeln!(output, "Retries Issued: {}", self.total_retries)?;

        writeln!(output, "\n--- Repositories ---")?;
        for result in &self.repositories {
            match &result.pipeline_url {
                Some(url) => writeln!(
                    output,
                    "{} | passed | retries: {} | {url}",
                    result.repository, result.retries
                )?,
                None => writeln!(
                    output,
                    "{} | failed | retries: {}",
                    result.repository, result.retries
                )?,
            }
        }

        if !self.failures.is_empty() {
            writeln!(output, "\n--- Failures ---")?;
            for failure in &self.failures {
                writeln!(output, "Repository: {} | Reason: {}", failure.repository, failure.reason)?;
            }
        }
        Ok(())
    }
}

impl TextReport for TriggerReport {
    fn write_text(&self, output: &mut dyn Write) -> Result<()> {
        writeln!(output, "--- Summary Report ---")?;
        writeln!(output, "Branch: {}", self.branch)?;
        writeln!(output, "Total Repositories Processed: {}", self.processed())?;
        writeln!(output, "Total Successful Pipeline Triggers: {}", self.triggered.len())?;
        writeln!(output, "Total Failed Pipeline Triggers: {}", self.failed.len())?;

        if !self.triggered.is_empty() {
            writeln!(output, "\n--- Triggered Pipeline URLs ---")?;
            for triggered in &self.triggered {
                writeln!(output, "{}", triggered.web_url)?;
            }
        }

        if !self.failed.is_empty() {
            writeln!(output, "\n--- Failed Pipeline Triggers ---")?;
            for failed in &self.failed {
                writeln!(output, "Repository: {} | Error: {}", failed.repository, failed.error)?;
            }
        }
        Ok(())
    }
}

impl TextReport for StopReport {
    fn write_text(&self, output: &mut dyn Write) -> Result<()> {
        writeln!(output, "REPORT")?;
        for (repository, stops) in &self.repositories {
            writeln!(output, "{repository}:")?;
            writeln!(output, "Total pipelines detected: {}", stops.detected)?;
            writeln!(output, "Total pipelines stopped: {}", stops.stopped)?;
            writeln!(output, "Total pipelines skipped: {}", stops.skipped)?;
            if let Some(error) = &stops.error {
                writeln!(output, "Error: {error}")?;
            }
            for pipeline in &stops.pipelines {
                writeln!(
                    output,
                    "  Pipeline ID: {}, Branch: {}, URL: {}",
                    pipeline.id, pipeline.ref_, pipeline.web_url
                )?;
            }
        }

        let totals = self.totals();
        writeln!(output, "SUMMARY")?;
        writeln!(output, "Total pipelines stopped: {}/{}", totals.stopped, totals.detected)?;
        writeln!(output, "Total pipelines skipped: {}/{}", totals.skipped, totals.detected)?;
        Ok(())
    }
}
