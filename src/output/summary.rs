use std::fmt::Write;

use comfy_table::{Cell, Color as TableColor};

use crate::operations::{StopReport, TriggerReport};
use crate::report::Report;

use super::styling::{bright, bright_yellow, cyan, dim, failed_ratio, passed_ratio};
use super::tables::{color_coded_retries_cell, create_cyan_header, create_table, state_cell};

/// Prints the watchdog report to stdout.
///
/// One row per repository, in input order, with the pipeline URL for passing
/// repositories and the failure reasons for the rest, followed by totals.
pub fn print_monitor_summary(report: &Report, threshold: u32) {
    println!("{}", render_monitor_summary(report, threshold));
}

pub fn print_trigger_summary(report: &TriggerReport) {
    println!("{}", render_trigger_summary(report));
}

/// Prints per-repository stop counts; `verbose` lists every cancelled pipeline.
pub fn print_stop_summary(report: &StopReport, verbose: bool) {
    println!("{}", render_stop_summary(report, verbose));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn render_monitor_summary(report: &Report, threshold: u32) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Summary Report");
    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n",
        dim("Total repositories:"),
        bright_yellow(report.total),
        dim("Passed:"),
        passed_ratio(report.passed, report.total),
        dim("Failed:"),
        failed_ratio(report.failed, report.total),
        dim("Retries issued:"),
        bright_yellow(report.total_retries),
    );

    if report.repositories.is_empty() {
        let _ = writeln!(output, "{}", bright_yellow("No repositories monitored."));
        return output;
    }

    add_section_header(&mut output, "📋", "Repositories");

    let mut table = create_table();
    table.set_header(create_cyan_header(&["Repository", "Result", "Retries", "Details"]));

    for result in &report.repositories {
        let details = match &result.pipeline_url {
            Some(url) => Cell::new(url),
            None => Cell::new(result.failures.join("\n")).fg(TableColor::Red),
        };

        table.add_row(vec![
            Cell::new(result.repository.as_str()),
            state_cell(result.state),
            color_coded_retries_cell(result.retries, threshold),
            details,
        ]);
    }

    let _ = writeln!(output, "{table}");
    output
}

fn render_trigger_summary(report: &TriggerReport) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "🚀", "Pipeline Triggers");
    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n",
        dim("Branch:"),
        cyan(&report.branch),
        dim("Repositories processed:"),
        bright_yellow(report.processed()),
        dim("Triggered:"),
        passed_ratio(report.triggered.len(), report.processed()),
        dim("Failed:"),
        failed_ratio(report.failed.len(), report.processed()),
    );

    if !report.triggered.is_empty() {
        let mut table = create_table();
        table.set_header(create_cyan_header(&["Repository", "Pipeline", "URL"]));
        for triggered in &report.triggered {
            table.add_row(vec![
                Cell::new(triggered.repository.as_str()),
                Cell::new(triggered.pipeline_id),
                Cell::new(&triggered.web_url),
            ]);
        }
        let _ = writeln!(output, "{table}\n");
    }

    if !report.failed.is_empty() {
        add_section_header(&mut output, "❌", "Failed Triggers");
        let mut table = create_table();
        table.set_header(create_cyan_header(&["Repository", "Error"]));
        for failed in &report.failed {
            table.add_row(vec![
                Cell::new(failed.repository.as_str()),
                Cell::new(&failed.error).fg(TableColor::Red),
            ]);
        }
        let _ = writeln!(output, "{table}");
    }

    output
}

fn render_stop_summary(report: &StopReport, verbose: bool) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "🛑", "Stopped Pipelines");

    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "Repository",
        "Detected",
        "Stopped",
        "Skipped",
    ]));

    for (repository, stops) in &report.repositories {
        let name = match &stops.error {
            Some(error) => Cell::new(format!("{repository}\n{error}")).fg(TableColor::Red),
            None => Cell::new(repository.as_str()),
        };
        table.add_row(vec![
            name,
            Cell::new(stops.detected),
            Cell::new(stops.stopped),
            Cell::new(stops.skipped),
        ]);
    }
    let _ = writeln!(output, "{table}\n");

    if verbose {
        for (repository, stops) in report.repositories.iter().filter(|(_, s)| s.stopped > 0) {
            let _ = writeln!(output, "  {} {}", dim("Stopped pipelines for"), cyan(repository));
            for pipeline in &stops.pipelines {
                let _ = writeln!(
                    output,
                    "    Pipeline ID: {}, Branch: {}, URL: {}",
                    pipeline.id, pipeline.ref_, pipeline.web_url
                );
            }
        }
        let _ = writeln!(output);
    }

    let totals = report.totals();
    let _ = writeln!(
        output,
        "  {} {}\n  {} {}",
        dim("Total pipelines stopped:"),
        bright_yellow(format!("{}/{}", totals.stopped, totals.detected)),
        dim("Total pipelines skipped:"),
        bright_yellow(format!("{}/{}", totals.skipped, totals.detected)),
    );

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::stop::{RepositoryStops, StoppedPipeline};
    use crate::operations::trigger::{FailedTrigger, TriggeredPipeline};
    use crate::repositories::RepositoryRef;
    use crate::watchdog::{TerminalState, WorkerResult};
    use chrono::{DateTime, Utc};
    use indexmap::IndexMap;

    fn generated_at() -> DateTime<Utc> {
        "2024-06-10T12:00:00Z".parse().unwrap()
    }

    fn trigger_report() -> TriggerReport {
        TriggerReport {
            branch: "release".to_string(),
            generated_at: generated_at(),
            triggered: vec![TriggeredPipeline {
                repository: RepositoryRef::new("org/app"),
                pipeline_id: 41,
                web_url: "https://gitlab.example.com/org/app/-/pipelines/41".to_string(),
            }],
            failed: vec![FailedTrigger {
                repository: RepositoryRef::new("org/gone"),
                error: "project not found".to_string(),
            }],
        }
    }

    fn stop_report() -> StopReport {
        let mut repositories = IndexMap::new();
        repositories.insert(
            RepositoryRef::new("org/app"),
            RepositoryStops {
                detected: 3,
                stopped: 1,
                skipped: 2,
                pipelines: vec![StoppedPipeline {
                    id: 77,
                    ref_: "main".to_string(),
                    web_url: "https://gitlab.example.com/org/app/-/pipelines/77".to_string(),
                }],
                error: None,
            },
        );
        repositories.insert(
            RepositoryRef::new("org/lib"),
            RepositoryStops {
                error: Some("forbidden".to_string()),
                ..RepositoryStops::default()
            },
        );
        StopReport {
            generated_at: generated_at(),
            repositories,
        }
    }

    #[test]
    fn test_monitor_summary_lists_every_repository() {
        console::set_colors_enabled(false);
        let report = Report::from_results(
            vec![
                WorkerResult::succeeded(
                    RepositoryRef::new("org/app"),
                    "https://gitlab.example.com/org/app/-/pipelines/9".to_string(),
                    1,
                ),
                WorkerResult::failed(
                    RepositoryRef::new("org/lib"),
                    TerminalState::FailedException,
                    "GitLab API error (status 500): boom",
                    0,
                ),
            ],
            generated_at(),
        );

        let rendered = render_monitor_summary(&report, 3);
        assert!(rendered.contains("Total repositories: 2"));
        assert!(rendered.contains("Passed: 1/2"));
        assert!(rendered.contains("Failed: 1/2"));
        assert!(rendered.contains("org/app"));
        assert!(rendered.contains("pipelines/9"));
        assert!(rendered.contains("boom"));
    }

    #[test]
    fn test_monitor_summary_empty() {
        console::set_colors_enabled(false);
        let report = Report::from_results(Vec::new(), generated_at());
        let rendered = render_monitor_summary(&report, 3);
        assert!(rendered.contains("No repositories monitored."));
    }

    #[test]
    fn test_trigger_summary() {
        console::set_colors_enabled(false);
        let rendered = render_trigger_summary(&trigger_report());

        assert!(rendered.contains("Branch: release"));
        assert!(rendered.contains("Repositories processed: 2"));
        assert!(rendered.contains("Triggered: 1/2"));
        assert!(rendered.contains("Failed: 1/2"));
        assert!(rendered.contains("Failed Triggers"));
        assert!(rendered.contains("org/gone"));
        assert!(rendered.contains("project not found"));
    }

    #[test]
    fn test_trigger_summary_without_failures_has_no_failure_table() {
        console::set_colors_enabled(false);
        let mut report = trigger_report();
        report.failed.clear();

        let rendered = render_trigger_summary(&report);
        assert!(rendered.contains("Triggered: 1/1"));
        assert!(!rendered.contains("Failed Triggers"));
    }

    #[test]
    fn test_stop_summary_totals() {
        console::set_colors_enabled(false);
        let rendered = render_stop_summary(&stop_report(), false);

        assert!(rendered.contains("org/app"));
        assert!(rendered.contains("forbidden"));
        assert!(rendered.contains("Total pipelines stopped: 1/3"));
        assert!(rendered.contains("Total pipelines skipped: 2/3"));
        assert!(!rendered.contains("Pipeline ID: 77"));
    }

    #[test]
    fn test_stop_summary_verbose_lists_stopped_pipelines() {
        console::set_colors_enabled(false);
        let rendered = render_stop_summary(&stop_report(), true);

        assert!(rendered.contains("Stopped pipelines for org/app"));
        assert!(rendered.contains(
            "Pipeline ID: 77, Branch: main, URL: https://gitlab.example.com/org/app/-/pipelines/77"
        ));
        assert!(!rendered.contains("Stopped pipelines for org/lib"));
    }
}
