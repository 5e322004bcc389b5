//! Sample data fixtures for testing.
//!
//! Enable the `test-fixtures` feature to access these helpers.
//!
//! # Example
//!
//! Add `swarm-events = { path = "../swarm-events", features = ["test-fixtures"] }`
//! to `[dev-dependencies]`, then:
//!
//! ```
//! use swarm_events::fixtures;
//!
//! let report = fixtures::sample_report();
//! assert_eq!(report.metadata.strategy, "DropZeros");
//!
//! let rounds = fixtures::sample_rounds();
//! assert_eq!(rounds.len(), 2);
//! assert_eq!(rounds[0].free_rider_count(), 1);
//! ```

use crate::{RoundResults, RunReport};

/// Returns the sample run report from the fixtures file.
///
/// Contains a DropZeros run with 2 iterations and 3 agents:
/// - agents 0 and 1 cooperate and fill their download target
/// - agent 2 is a free rider and is dropped by both after round 0
pub fn sample_report() -> RunReport {
    let json = include_str!("../tests/fixtures/sample_report.json");
    RunReport::from_json(json).expect("Failed to parse sample_report.json")
}

/// Returns the sample report regrouped into per-round results.
pub fn sample_rounds() -> Vec<RoundResults> {
    sample_report().rounds()
}
