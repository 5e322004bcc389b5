//! Output
//!
//! Run reports and summary statistics built from per-round results.

pub mod report;
pub mod stats;

pub use report::{report_path, write_report, OutputError};
pub use stats::{stats_path, summarize, write_stats, RoundStats, SimulationStats, StatsCollector};
