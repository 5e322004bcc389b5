//! Run Report Types
//!
//! Serialization structs for a complete simulation run: run metadata plus
//! every agent result flattened with its iteration index.

use serde::{Deserialize, Serialize};

use crate::{AgentResult, Points, RoundResults};

/// Builds the report file name for a run.
///
/// Format: `<iterations>_<good>_<bad>_<peer_size>_<max_up>_<max_down>.json`
pub fn report_file_name(metadata: &RunMetadata) -> String {
    format!(
        "{}_{}_{}_{}_{}_{}.json",
        metadata.iterations,
        metadata.starting_good_clients,
        metadata.starting_bad_clients,
        metadata.peer_size,
        metadata.max_up,
        metadata.max_down
    )
}

/// Parameters the run was started with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub strategy: String,
    pub iterations: usize,
    pub max_up: Points,
    pub max_down: Points,
    pub starting_good_clients: usize,
    pub starting_bad_clients: usize,
    pub peer_size: usize,
    #[serde(default)]
    pub seed: u64,
}

/// One agent result tagged with the round it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub iteration: usize,
    #[serde(flatten)]
    pub result: AgentResult,
}

/// Complete serialized run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub metadata: RunMetadata,
    pub data: Vec<ReportRow>,
}

impl RunReport {
    /// Flattens per-round results into report rows.
    pub fn new(metadata: RunMetadata, rounds: &[RoundResults]) -> Self {
        let data = rounds
            .iter()
            .flat_map(|round| {
                round.agents.iter().map(move |result| ReportRow {
                    iteration: round.iteration,
                    result: result.clone(),
                })
            })
            .collect();
        Self { metadata, data }
    }

    /// Regroups the flat rows by iteration.
    pub fn rounds(&self) -> Vec<RoundResults> {
        let mut rounds: Vec<RoundResults> = (0..self.metadata.iterations)
            .map(|i| RoundResults::new(i, Vec::new()))
            .collect();
        for row in &self.data {
            if let Some(round) = rounds.get_mut(row.iteration) {
                round.agents.push(row.result.clone());
            }
        }
        rounds
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> RunMetadata {
        RunMetadata {
            strategy: "OptimisticUnchoking".to_string(),
            iterations: 2,
            max_up: 100,
            max_down: 100,
            starting_good_clients: 8,
            starting_bad_clients: 2,
            peer_size: 4,
            seed: 0,
        }
    }

    fn agent(id: u64, acquired: Points) -> AgentResult {
        AgentResult {
            amount_acquired: acquired,
            amount_remaining: 1,
            willing_to_give: 100,
            free_rider: false,
            id,
            peers: vec![],
        }
    }

    #[test]
    fn test_report_file_name() {
        assert_eq!(report_file_name(&metadata()), "2_8_2_4_100_100.json");
    }

    #[test]
    fn test_report_flattens_rows() {
        let rounds = vec![
            RoundResults::new(0, vec![agent(0, 3), agent(1, 5)]),
            RoundResults::new(1, vec![agent(0, 7), agent(1, 0)]),
        ];
        let report = RunReport::new(metadata(), &rounds);

        assert_eq!(report.data.len(), 4);
        assert_eq!(report.data[2].iteration, 1);
        assert_eq!(report.data[2].result.amount_acquired, 7);
        assert_eq!(report.rounds(), rounds);
    }

    #[test]
    fn test_report_row_is_flat() {
        let report = RunReport::new(metadata(), &[RoundResults::new(0, vec![agent(4, 9)])]);
        let json = report.to_json().unwrap();

        assert!(json.contains("\"iteration\":0,\"amount_acquired\":9"));
        assert!(!json.contains("\"result\""));

        let parsed = RunReport::from_json(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
