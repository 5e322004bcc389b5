//! Statistics Output
//!
//! Per-round population averages, split by the free-rider classification.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use swarm_events::RoundResults;

use super::OutputError;

/// Averages for a single round
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoundStats {
    pub iteration: usize,
    pub cooperative_count: usize,
    pub free_rider_count: usize,
    pub cooperative_mean: f64,
    pub free_rider_mean: f64,
    pub overall_mean: f64,
}

/// Overall run statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationStats {
    pub total_rounds: usize,
    pub total_acquired: u64,
    pub mean_acquired_per_round: f64,
    pub peak_free_riders: usize,
    pub final_free_riders: usize,
    pub round_history: Vec<RoundStats>,
}

/// Accumulates statistics while rounds are produced
#[derive(Debug, Default)]
pub struct StatsCollector {
    total_acquired: u64,
    round_history: Vec<RoundStats>,
}

fn mean(values: &[u32]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64
    }
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one round's results
    pub fn record_round(&mut self, round: &RoundResults) {
        let (riders, cooperative): (Vec<_>, Vec<_>) =
            round.agents.iter().partition(|a| a.free_rider);
        let acquired = |set: &[&swarm_events::AgentResult]| -> Vec<u32> {
            set.iter().map(|a| a.amount_acquired).collect()
        };
        let everyone: Vec<u32> = round.agents.iter().map(|a| a.amount_acquired).collect();

        self.total_acquired += round.total_acquired();
        self.round_history.push(RoundStats {
            iteration: round.iteration,
            cooperative_count: cooperative.len(),
            free_rider_count: riders.len(),
            cooperative_mean: mean(&acquired(&cooperative)),
            free_rider_mean: mean(&acquired(&riders)),
            overall_mean: mean(&everyone),
        });
    }

    /// Generate final statistics
    pub fn generate_stats(&self) -> SimulationStats {
        let total_rounds = self.round_history.len();
        let mean_acquired_per_round = if total_rounds > 0 {
            self.total_acquired as f64 / total_rounds as f64
        } else {
            0.0
        };

        SimulationStats {
            total_rounds,
            total_acquired: self.total_acquired,
            mean_acquired_per_round,
            peak_free_riders: self
                .round_history
                .iter()
                .map(|r| r.free_rider_count)
                .max()
                .unwrap_or(0),
            final_free_riders: self
                .round_history
                .last()
                .map_or(0, |r| r.free_rider_count),
            round_history: self.round_history.clone(),
        }
    }
}

/// Summarize a whole run in one call
pub fn summarize(rounds: &[RoundResults]) -> SimulationStats {
    let mut collector = StatsCollector::new();
    for round in rounds {
        collector.record_round(round);
    }
    collector.generate_stats()
}

/// Stats file that sits next to a run report: `foo.json` becomes `foo.stats.json`
pub fn stats_path(report_path: &Path) -> PathBuf {
    report_path.with_extension("stats.json")
}

/// Write statistics to a JSON file
pub fn write_stats(path: impl AsRef<Path>, stats: &SimulationStats) -> Result<(), OutputError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(stats)?)?;
    tracing::debug!("Wrote stats for {} rounds to {}", stats.total_rounds, path.display());
    Ok(())
}
