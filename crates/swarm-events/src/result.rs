//! Round Results
//!
//! The externally visible state of every agent, captured once per round.

use serde::{Deserialize, Serialize};

/// Abstract unit of exchange volume
pub type Points = u32;

/// Immutable per-agent record for one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResult {
    /// Total received from all peers this round
    pub amount_acquired: Points,
    /// Upload budget left unspent at the end of the round
    pub amount_remaining: Points,
    /// Upload allowance the agent entered the round with
    pub willing_to_give: Points,
    /// Behavioral classification, not an input flag
    pub free_rider: bool,
    pub id: u64,
    /// Neighbor ids in peer-list order
    #[serde(default)]
    pub peers: Vec<u64>,
}

impl AgentResult {
    pub fn has_peer(&self, id: u64) -> bool {
        self.peers.contains(&id)
    }
}

/// All agent results for a single round, ordered by agent id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResults {
    pub iteration: usize,
    pub agents: Vec<AgentResult>,
}

impl RoundResults {
    pub fn new(iteration: usize, agents: Vec<AgentResult>) -> Self {
        Self { iteration, agents }
    }

    /// Look up one agent's result by id
    pub fn find(&self, id: u64) -> Option<&AgentResult> {
        self.agents.iter().find(|a| a.id == id)
    }

    /// Total volume exchanged this round
    pub fn total_acquired(&self) -> u64 {
        self.agents.iter().map(|a| a.amount_acquired as u64).sum()
    }

    pub fn free_rider_count(&self) -> usize {
        self.agents.iter().filter(|a| a.free_rider).count()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: u64, acquired: Points, free_rider: bool) -> AgentResult {
        AgentResult {
            amount_acquired: acquired,
            amount_remaining: 0,
            willing_to_give: 10,
            free_rider,
            id,
            peers: vec![(id + 1) % 3],
        }
    }

    #[test]
    fn test_round_results_find() {
        let round = RoundResults::new(0, vec![result(0, 4, false), result(1, 2, true)]);

        assert_eq!(round.find(1).map(|a| a.amount_acquired), Some(2));
        assert!(round.find(7).is_none());
        assert!(round.find(0).unwrap().has_peer(1));
    }

    #[test]
    fn test_round_results_aggregates() {
        let round = RoundResults::new(
            3,
            vec![result(0, 4, false), result(1, 2, true), result(2, 9, true)],
        );

        assert_eq!(round.total_acquired(), 15);
        assert_eq!(round.free_rider_count(), 2);
        assert_eq!(round.len(), 3);
        assert!(!round.is_empty());
    }

    #[test]
    fn test_agent_result_field_names() {
        let json = serde_json::to_string(&result(5, 1, false)).unwrap();

        for field in [
            "amount_acquired",
            "amount_remaining",
            "willing_to_give",
            "free_rider",
            "\"id\"",
            "peers",
        ] {
            assert!(json.contains(field), "missing {} in {}", field, json);
        }
    }
}
