//! Engine Errors
//!
//! Configuration problems are reported before a run starts. Graph
//! consistency failures abort the run at the checkpoint that detected them.

use std::fmt;

use thiserror::Error;

use crate::client::AgentId;

/// Point in a run at which the peer graph was validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    Bootstrap,
    Round(usize),
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checkpoint::Bootstrap => write!(f, "bootstrap"),
            Checkpoint::Round(round) => write!(f, "round {}", round),
        }
    }
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("unknown strategy selector '{0}'")]
    UnknownStrategy(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{checkpoint}: agent {agent} lists {peer} as a peer but {peer} does not list {agent}")]
    AsymmetricEdge {
        checkpoint: Checkpoint,
        agent: AgentId,
        peer: AgentId,
    },

    #[error("{checkpoint}: agent {agent} lists itself as a peer")]
    SelfLoop { checkpoint: Checkpoint, agent: AgentId },

    #[error("{checkpoint}: agent {agent} has in-degree {degree}, above its peer size {peer_size}")]
    DegreeOverflow {
        checkpoint: Checkpoint,
        agent: AgentId,
        degree: usize,
        peer_size: usize,
    },

    #[error("run already completed all {0} rounds")]
    RunComplete(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invariant_messages_name_the_pair() {
        let err = SimError::AsymmetricEdge {
            checkpoint: Checkpoint::Round(4),
            agent: AgentId(2),
            peer: AgentId(9),
        };
        let msg = err.to_string();

        assert!(msg.starts_with("round 4"));
        assert!(msg.contains("agent 2"));
        assert!(msg.contains("9 does not list 2"));
    }

    #[test]
    fn test_checkpoint_display() {
        assert_eq!(Checkpoint::Bootstrap.to_string(), "bootstrap");
        assert_eq!(Checkpoint::Round(0).to_string(), "round 0");
    }
}
