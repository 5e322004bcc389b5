//! Recruitment hooks for the unchoking family
//!
//! Each hook only decides who to unchoke next; the choke rule itself is
//! shared through [`OptimisticUnchoking`].

use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::{OptimisticUnchoking, PeerContext, Recruit, UnchokeTable};
use crate::client::AgentId;

/// Rounds the demerit filter looks back over
pub const DEMERIT_WINDOW: usize = 6;

/// A candidate with this many contributing rounds in the window is passed over
pub const DEMERIT_LIMIT: usize = 4;

/// Ranks candidates by gain value before unchoking.
pub type GainValueUnchoking = OptimisticUnchoking<GainValue>;

/// Unchokes the first history entry passing the demerit filter.
pub type DemeritChoking = OptimisticUnchoking<Demerit>;

/// Uniform random pick among eligible agents.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomRecruit;

impl Recruit for RandomRecruit {
    fn choose_next_person(
        &self,
        _table: &UnchokeTable,
        ctx: &mut PeerContext<'_>,
        exclude: &BTreeSet<AgentId>,
        _round: usize,
    ) -> Option<AgentId> {
        ctx.sample_one(exclude)
    }
}

/// Favors proven contributors while giving untried neighbors a decaying chance.
///
/// `G(j) = u(j) * n(j) / N(j)` when `j` has ever contributed, otherwise
/// `max u / (N(j) + 1)`, where `u` is the mean contribution since the last
/// unchoke, `n` the number of contributing rounds and `N` the unchoke count.
#[derive(Debug, Clone, Copy, Default)]
pub struct GainValue;

impl GainValue {
    fn mean_since_unchoke(table: &UnchokeTable, j: AgentId, round: usize) -> f64 {
        table
            .history(j)
            .map_or(0.0, |entry| entry.mean_since_added(round))
    }

    /// Highest mean contribution over every neighbor of `owner`
    pub fn max_mean(table: &UnchokeTable, neighbors: &[AgentId], round: usize) -> f64 {
        neighbors
            .iter()
            .map(|&j| Self::mean_since_unchoke(table, j, round))
            .fold(0.0, f64::max)
    }

    pub fn gain_value(table: &UnchokeTable, j: AgentId, round: usize, max_mean: f64) -> f64 {
        let unchoked = table.times_unchoked(j) as f64;
        let contributing = table.history(j).map_or(0, |entry| entry.nonzero_rounds());

        if contributing > 0 {
            Self::mean_since_unchoke(table, j, round) * contributing as f64 / unchoked.max(1.0)
        } else {
            max_mean / (unchoked + 1.0)
        }
    }
}

impl Recruit for GainValue {
    fn choose_next_person(
        &self,
        table: &UnchokeTable,
        ctx: &mut PeerContext<'_>,
        exclude: &BTreeSet<AgentId>,
        round: usize,
    ) -> Option<AgentId> {
        let owner = ctx.owner();
        let neighbors: Vec<AgentId> = ctx
            .swarm()
            .all_agents()
            .into_iter()
            .filter(|&id| id != owner)
            .collect();
        let max_mean = Self::max_mean(table, &neighbors, round);

        let mut ranked: Vec<(AgentId, f64)> = ctx
            .swarm()
            .eligible_candidates(exclude, owner)
            .into_iter()
            .map(|j| (j, Self::gain_value(table, j, round, max_mean)))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        ranked.first().map(|(j, _)| *j)
    }
}

/// Picks the first neighbor in the history table that contributed in fewer
/// than [`DEMERIT_LIMIT`] of the last [`DEMERIT_WINDOW`] rounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct Demerit;

impl Recruit for Demerit {
    fn choose_next_person(
        &self,
        table: &UnchokeTable,
        ctx: &mut PeerContext<'_>,
        exclude: &BTreeSet<AgentId>,
        round: usize,
    ) -> Option<AgentId> {
        if round < DEMERIT_WINDOW {
            return None;
        }
        let eligible: BTreeSet<AgentId> = ctx
            .swarm()
            .eligible_candidates(exclude, ctx.owner())
            .into_iter()
            .collect();

        table
            .histories()
            .find(|(id, entry)| {
                eligible.contains(id) && entry.nonzero_in(round - DEMERIT_WINDOW..round) < DEMERIT_LIMIT
            })
            .map(|(id, _)| id)
    }
}
