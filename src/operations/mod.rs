pub mod stop;
pub mod trigger;

pub use stop::{parse_point_in_time, stop_pipelines, StopOptions, StopReport, TimeWindow};
pub use trigger::{trigger_pipelines, TriggerReport};
