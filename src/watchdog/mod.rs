mod api;
#[cfg(test)]
mod fake;
mod fleet;
mod monitor;
mod tally;

pub use api::PipelineApi;
pub use fleet::{monitor_all, DEFAULT_MAX_CONCURRENT};
pub use monitor::{
    TerminalState, Watchdog, WatchdogSettings, WorkerResult, DEFAULT_BACKOFF, DEFAULT_THRESHOLD,
};
