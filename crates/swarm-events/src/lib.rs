//! Shared result types and serialization for the free-rider swarm simulation.
//!
//! This crate contains pure data structures with no simulation logic.
//! The engine produces them once per round; writers and statistics consume them.

pub mod report;
pub mod result;

#[cfg(feature = "test-fixtures")]
pub mod fixtures;

// Re-export result types
pub use result::{AgentResult, Points, RoundResults};

// Re-export report types
pub use report::{report_file_name, ReportRow, RunMetadata, RunReport};
