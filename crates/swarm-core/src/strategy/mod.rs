//! Reciprocity Strategies
//!
//! One strategy instance per agent decides who that agent starts with, who it
//! serves, and how it prunes and recruits peers between rounds.
//!
//! # Variants
//!
//! - [`NoStrategy`]: keeps every peer forever
//! - [`RandomSwap`]: replaces every peer every round
//! - [`DropZeros`]: replaces peers that delivered nothing
//! - [`DropBottomHalf`]: replaces the worse-performing half
//! - [`OptimisticUnchoking`]: chokes silent peers, recruits a random one
//! - [`GainValueUnchoking`]: same choke rule, recruits by gain value
//! - [`DemeritChoking`]: same choke rule, recruits through a demerit filter

pub mod basic;
pub mod recruit;
pub mod unchoke;

pub use basic::{DropBottomHalf, DropZeros, NoStrategy, RandomSwap};
pub use recruit::{Demerit, DemeritChoking, GainValue, GainValueUnchoking, RandomRecruit};
pub use unchoke::{HistEntry, OptimisticUnchoking, Recruit, UnchokeTable, CHOKE_TIMEOUT};

use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use swarm_events::Points;

use crate::client::AgentId;
use crate::error::SimError;
use crate::swarm::Swarm;

/// What a strategy sees while it acts for its owner: the registry, the run's
/// generator, and who it is acting for. All edge changes go through here.
pub struct PeerContext<'a> {
    swarm: &'a mut Swarm,
    rng: &'a mut SmallRng,
    owner: AgentId,
}

impl<'a> PeerContext<'a> {
    pub fn new(swarm: &'a mut Swarm, rng: &'a mut SmallRng, owner: AgentId) -> Self {
        Self { swarm, rng, owner }
    }

    pub fn owner(&self) -> AgentId {
        self.owner
    }

    pub fn swarm(&self) -> &Swarm {
        &*self.swarm
    }

    pub fn current_peers(&self) -> Vec<AgentId> {
        self.swarm.client(self.owner).peer_ids()
    }

    pub fn peer_count(&self) -> usize {
        self.swarm.client(self.owner).peer_count()
    }

    pub fn peer_size(&self) -> usize {
        self.swarm.client(self.owner).peer_size()
    }

    pub fn has_peer(&self, peer: AgentId) -> bool {
        self.swarm.client(self.owner).has_peer(peer)
    }

    pub fn sample_new_peers(&mut self, count: usize, exclude: &BTreeSet<AgentId>) -> Vec<AgentId> {
        self.swarm
            .sample_new_peers(count, exclude, self.owner, &mut *self.rng)
    }

    pub fn replace_peers(&mut self, drop: &[AgentId], keep: &[AgentId]) -> Vec<AgentId> {
        self.swarm.replace_peers(self.owner, drop, keep, &mut *self.rng)
    }

    pub fn sample_one(&mut self, exclude: &BTreeSet<AgentId>) -> Option<AgentId> {
        self.swarm.sample_one(exclude, self.owner, &mut *self.rng)
    }

    pub fn connect(&mut self, peer: AgentId) {
        self.swarm.connect(self.owner, peer);
    }

    pub fn disconnect(&mut self, peer: AgentId) {
        self.swarm.disconnect(self.owner, peer);
    }
}

/// Request enough fresh peers from the registry to reach `target_degree`.
pub fn fill_from_registry(ctx: &mut PeerContext<'_>, target_degree: usize) -> Vec<AgentId> {
    let current = ctx.current_peers();
    if target_degree > current.len() {
        let exclude: BTreeSet<AgentId> = current.iter().copied().collect();
        ctx.sample_new_peers(target_degree - current.len(), &exclude);
    }
    ctx.current_peers()
}

pub trait Strategy: fmt::Debug {
    /// Called once before the first round.
    fn bootstrap_peers(&mut self, ctx: &mut PeerContext<'_>, target_degree: usize) -> Vec<AgentId> {
        fill_from_registry(ctx, target_degree)
    }

    /// Whether the owner serves `candidate` at all this round.
    fn willing_to_give_to(&self, _candidate: AgentId) -> bool {
        true
    }

    /// Round-boundary entry point.
    ///
    /// Peers that dropped the owner earlier in this regeneration pass are
    /// already gone from its list; their stale contribution entries are
    /// discarded before the variant policy runs.
    fn reconcile_and_regenerate(
        &mut self,
        ctx: &mut PeerContext<'_>,
        old_peer_contributions: &[(AgentId, Points)],
        round: usize,
    ) -> Vec<AgentId> {
        let live: Vec<(AgentId, Points)> = old_peer_contributions
            .iter()
            .copied()
            .filter(|(peer, _)| ctx.has_peer(*peer))
            .collect();
        if live.len() < old_peer_contributions.len() {
            tracing::trace!(
                "agent {} lost {} peers before regenerating",
                ctx.owner(),
                old_peer_contributions.len() - live.len()
            );
        }
        self.regenerate(ctx, &live, round)
    }

    /// Variant policy: retain, evict and recruit. Returns the new peer set.
    fn regenerate(
        &mut self,
        ctx: &mut PeerContext<'_>,
        old_peer_contributions: &[(AgentId, Points)],
        round: usize,
    ) -> Vec<AgentId>;
}

/// Strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    NoStrategy,
    RandomSwap,
    DropZeros,
    DropBottomHalf,
    OptimisticUnchoking,
    GainValueUnchoking,
    DemeritChoking,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 7] = [
        StrategyKind::NoStrategy,
        StrategyKind::RandomSwap,
        StrategyKind::DropZeros,
        StrategyKind::DropBottomHalf,
        StrategyKind::OptimisticUnchoking,
        StrategyKind::GainValueUnchoking,
        StrategyKind::DemeritChoking,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::NoStrategy => "NoStrategy",
            StrategyKind::RandomSwap => "RandomSwap",
            StrategyKind::DropZeros => "DropZeros",
            StrategyKind::DropBottomHalf => "DropBottomHalf",
            StrategyKind::OptimisticUnchoking => "OptimisticUnchoking",
            StrategyKind::GainValueUnchoking => "GainValueUnchoking",
            StrategyKind::DemeritChoking => "DemeritChoking",
        }
    }

    /// Build a fresh instance for one agent. `iterations` sizes the history.
    pub fn build(&self, iterations: usize) -> Box<dyn Strategy> {
        match self {
            StrategyKind::NoStrategy => Box::new(NoStrategy),
            StrategyKind::RandomSwap => Box::new(RandomSwap),
            StrategyKind::DropZeros => Box::new(DropZeros),
            StrategyKind::DropBottomHalf => Box::new(DropBottomHalf),
            StrategyKind::OptimisticUnchoking => {
                Box::new(OptimisticUnchoking::<RandomRecruit>::new(iterations))
            }
            StrategyKind::GainValueUnchoking => Box::new(GainValueUnchoking::new(iterations)),
            StrategyKind::DemeritChoking => Box::new(DemeritChoking::new(iterations)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        if normalized == "randomstrategy" {
            return Ok(StrategyKind::RandomSwap);
        }
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.name().to_lowercase() == normalized)
            .ok_or_else(|| SimError::UnknownStrategy(s.to_string()))
    }
}
