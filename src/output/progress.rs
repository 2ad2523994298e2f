use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright, bright_green, bright_yellow};
use crate::repositories::RepositoryRef;

/// Spinner counting finished repositories while workers run.
#[derive(Clone)]
pub struct MonitorProgress {
    pb: ProgressBar,
}

impl MonitorProgress {
    pub fn start(total: usize) -> Self {
        eprintln!("{}  {}", bright("⚙️"), bright("Monitoring").underlined());
        let pb = ProgressBar::new(total as u64);
        pb.set_draw_target(ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {pos}/{len} {spinner}") {
            pb.set_style(style);
        }
        pb.set_message(bright_yellow("Waiting for pipelines").to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { pb }
    }

    pub fn repository_finished(&self, repository: &RepositoryRef) {
        self.pb
            .set_message(bright_yellow(format!("Finished {}", repository.name())).to_string());
        self.pb.inc(1);
    }

    pub fn finish(self) {
        self.pb
            .finish_with_message(bright_green("All repositories settled ✓").to_string());
        eprintln!();
    }
}
