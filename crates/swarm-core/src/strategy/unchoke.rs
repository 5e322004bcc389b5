//! Optimistic Unchoking
//!
//! Choke-table strategies. Service is gated per neighbor: a neighbor is served
//! only while unchoked. At each round boundary the first peer that has stayed
//! silent for [`CHOKE_TIMEOUT`] rounds since it was last unchoked is choked and
//! its edge dropped, and one replacement is recruited through a pluggable
//! [`Recruit`] hook.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Range;

use swarm_events::Points;

use super::{fill_from_registry, PeerContext, Strategy};
use crate::client::AgentId;

/// Rounds of silence after which a peer is choked
pub const CHOKE_TIMEOUT: usize = 3;

/// Per-neighbor contribution history
#[derive(Debug, Clone, PartialEq)]
pub struct HistEntry {
    /// Amount received from the neighbor, indexed by round
    pub contributions: Vec<Points>,
    /// Round at which the neighbor was last unchoked, if ever
    pub added: Option<usize>,
}

impl HistEntry {
    pub fn new(iterations: usize) -> Self {
        Self {
            contributions: vec![0; iterations],
            added: None,
        }
    }

    /// Recorded contributions for `rounds`, clamped to the history length
    pub fn window(&self, rounds: Range<usize>) -> &[Points] {
        let end = rounds.end.min(self.contributions.len());
        let start = rounds.start.min(end);
        &self.contributions[start..end]
    }

    /// Rounds in the whole history with a nonzero contribution
    pub fn nonzero_rounds(&self) -> usize {
        self.contributions.iter().filter(|&&x| x != 0).count()
    }

    pub fn nonzero_in(&self, rounds: Range<usize>) -> usize {
        self.window(rounds).iter().filter(|&&x| x != 0).count()
    }

    /// Mean contribution from the last unchoke up to (not including) `round`
    pub fn mean_since_added(&self, round: usize) -> f64 {
        let Some(added) = self.added else {
            return 0.0;
        };
        let window = self.window(added..round);
        if window.is_empty() {
            return 0.0;
        }
        window.iter().map(|&x| x as f64).sum::<f64>() / window.len() as f64
    }
}

/// Choke flags, unchoke counters and contribution history for every neighbor
/// one agent has dealt with. Unknown neighbors count as choked.
#[derive(Debug, Clone)]
pub struct UnchokeTable {
    iterations: usize,
    timeout: usize,
    unchoked: BTreeSet<AgentId>,
    times_unchoked: BTreeMap<AgentId, u32>,
    history: BTreeMap<AgentId, HistEntry>,
}

impl UnchokeTable {
    pub fn new(iterations: usize, timeout: usize) -> Self {
        Self {
            iterations,
            timeout,
            unchoked: BTreeSet::new(),
            times_unchoked: BTreeMap::new(),
            history: BTreeMap::new(),
        }
    }

    pub fn is_choked(&self, id: AgentId) -> bool {
        !self.unchoked.contains(&id)
    }

    pub fn choke(&mut self, id: AgentId) {
        self.unchoked.remove(&id);
    }

    pub fn unchoke(&mut self, id: AgentId, round: usize) {
        self.unchoked.insert(id);
        *self.times_unchoked.entry(id).or_default() += 1;
        self.entry(id).added = Some(round);
    }

    pub fn times_unchoked(&self, id: AgentId) -> u32 {
        self.times_unchoked.get(&id).copied().unwrap_or(0)
    }

    pub fn history(&self, id: AgentId) -> Option<&HistEntry> {
        self.history.get(&id)
    }

    /// Every history entry in ascending neighbor id order
    pub fn histories(&self) -> impl Iterator<Item = (AgentId, &HistEntry)> {
        self.history.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn record(&mut self, id: AgentId, round: usize, amount: Points) {
        if let Some(slot) = self.entry(id).contributions.get_mut(round) {
            *slot = amount;
        }
    }

    /// Silent for the whole timeout window and in `round` itself, with the
    /// window lying entirely after the neighbor's last unchoke.
    pub fn timed_out(&self, id: AgentId, round: usize) -> bool {
        if round < self.timeout {
            return false;
        }
        let start = round - self.timeout;
        match self.history.get(&id) {
            Some(entry) => {
                entry.added.map_or(true, |added| added <= start)
                    && entry.nonzero_in(start..round + 1) == 0
            }
            None => true,
        }
    }

    fn entry(&mut self, id: AgentId) -> &mut HistEntry {
        let iterations = self.iterations;
        self.history
            .entry(id)
            .or_insert_with(|| HistEntry::new(iterations))
    }
}

/// Picks the neighbor to unchoke after a choke.
///
/// Returning `None` skips recruitment this round. Implementations must only
/// return agents that are eligible: not the owner, not in `exclude`, not a
/// current peer and not saturated.
pub trait Recruit: fmt::Debug + Default {
    fn choose_next_person(
        &self,
        table: &UnchokeTable,
        ctx: &mut PeerContext<'_>,
        exclude: &BTreeSet<AgentId>,
        round: usize,
    ) -> Option<AgentId>;
}

#[derive(Debug)]
pub struct OptimisticUnchoking<R: Recruit> {
    table: UnchokeTable,
    recruit: R,
}

impl<R: Recruit> OptimisticUnchoking<R> {
    pub fn new(iterations: usize) -> Self {
        Self::with_timeout(iterations, CHOKE_TIMEOUT)
    }

    pub fn with_timeout(iterations: usize, timeout: usize) -> Self {
        Self {
            table: UnchokeTable::new(iterations, timeout),
            recruit: R::default(),
        }
    }

    pub fn table(&self) -> &UnchokeTable {
        &self.table
    }
}

impl<R: Recruit> Strategy for OptimisticUnchoking<R> {
    fn bootstrap_peers(&mut self, ctx: &mut PeerContext<'_>, target_degree: usize) -> Vec<AgentId> {
        let peers = fill_from_registry(ctx, target_degree);
        for &peer in &peers {
            self.table.unchoke(peer, 0);
        }
        peers
    }

    fn willing_to_give_to(&self, candidate: AgentId) -> bool {
        !self.table.is_choked(candidate)
    }

    fn regenerate(
        &mut self,
        ctx: &mut PeerContext<'_>,
        old_peer_contributions: &[(AgentId, Points)],
        round: usize,
    ) -> Vec<AgentId> {
        for &(peer, amount) in old_peer_contributions {
            self.table.record(peer, round, amount);
        }

        let victim = old_peer_contributions
            .iter()
            .map(|(peer, _)| *peer)
            .find(|peer| self.table.timed_out(*peer, round));
        let Some(victim) = victim else {
            return ctx.current_peers();
        };

        ctx.disconnect(victim);
        self.table.choke(victim);
        tracing::debug!("round {}: agent {} choked {}", round, ctx.owner(), victim);

        if ctx.peer_count() < ctx.peer_size() {
            let exclude: BTreeSet<AgentId> = old_peer_contributions
                .iter()
                .map(|(peer, _)| *peer)
                .collect();
            match self.recruit.choose_next_person(&self.table, ctx, &exclude, round) {
                Some(recruit) => {
                    ctx.connect(recruit);
                    self.table.unchoke(recruit, round);
                    tracing::debug!("round {}: agent {} unchoked {}", round, ctx.owner(), recruit);
                }
                None => {
                    tracing::trace!("round {}: agent {} found no one to unchoke", round, ctx.owner());
                }
            }
        }
        ctx.current_peers()
    }
}
