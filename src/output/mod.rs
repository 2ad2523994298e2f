mod exports;
mod progress;
mod styling;
mod summary;
mod tables;

pub use exports::write_report_file;
pub use progress::MonitorProgress;
use styling::{dim, magenta_bold};
pub use summary::{print_monitor_summary, print_stop_summary, print_trigger_summary};

/// Prints the `pipewatch` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🚦 pipewatch"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("GitLab pipeline watchdog")
    );
}
