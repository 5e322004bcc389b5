//! Membership-only strategies
//!
//! These always serve any peer that asks and differ only in how they reshape
//! the peer set between rounds.

use swarm_events::Points;

use super::{PeerContext, Strategy};
use crate::client::AgentId;

/// Keeps every current peer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStrategy;

impl Strategy for NoStrategy {
    fn regenerate(
        &mut self,
        ctx: &mut PeerContext<'_>,
        _old_peer_contributions: &[(AgentId, Points)],
        _round: usize,
    ) -> Vec<AgentId> {
        ctx.current_peers()
    }
}

/// Replaces every peer each round.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSwap;

impl Strategy for RandomSwap {
    fn regenerate(
        &mut self,
        ctx: &mut PeerContext<'_>,
        old_peer_contributions: &[(AgentId, Points)],
        _round: usize,
    ) -> Vec<AgentId> {
        let drop: Vec<AgentId> = old_peer_contributions.iter().map(|(p, _)| *p).collect();
        ctx.replace_peers(&drop, &[]);
        ctx.current_peers()
    }
}

/// Replaces any peer that delivered nothing this round.
#[derive(Debug, Clone, Copy, Default)]
pub struct DropZeros;

impl Strategy for DropZeros {
    fn regenerate(
        &mut self,
        ctx: &mut PeerContext<'_>,
        old_peer_contributions: &[(AgentId, Points)],
        _round: usize,
    ) -> Vec<AgentId> {
        let (keep, drop): (Vec<&(AgentId, Points)>, Vec<&(AgentId, Points)>) = old_peer_contributions
            .iter()
            .partition(|(_, amount)| *amount != 0);
        let keep: Vec<AgentId> = keep.into_iter().map(|(p, _)| *p).collect();
        let drop: Vec<AgentId> = drop.into_iter().map(|(p, _)| *p).collect();

        ctx.replace_peers(&drop, &keep);
        ctx.current_peers()
    }
}

/// Keeps the better-delivering half, replaces the rest.
#[derive(Debug, Clone, Copy, Default)]
pub struct DropBottomHalf;

impl Strategy for DropBottomHalf {
    fn regenerate(
        &mut self,
        ctx: &mut PeerContext<'_>,
        old_peer_contributions: &[(AgentId, Points)],
        _round: usize,
    ) -> Vec<AgentId> {
        let mut ranked = old_peer_contributions.to_vec();
        // Stable, so ties keep peer-list order
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        let ranked: Vec<AgentId> = ranked.into_iter().map(|(p, _)| p).collect();
        let (top, bottom) = ranked.split_at(ranked.len() / 2);

        ctx.replace_peers(bottom, top);
        ctx.current_peers()
    }
}
