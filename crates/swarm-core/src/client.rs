//! Client
//!
//! A single swarm participant: capacity state, the ordered peer list with
//! per-peer receive counters, and the homeostatic capacity feedback law.
//!
//! A client only ever mutates its own side of a peer edge. Keeping the graph
//! symmetric is the job of [`Swarm`](crate::swarm::Swarm).

use serde::{Deserialize, Serialize};
use std::fmt;

use swarm_events::{AgentResult, Points};

use crate::strategy::Strategy;

/// Percentage of the download target above which upload is fully restored
pub const SATISFACTION_PERCENT: u64 = 65;

/// Stable identifier for an agent, assigned once at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out sequential agent ids for one run
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> AgentId {
        let id = AgentId(self.next);
        self.next += 1;
        id
    }
}

/// One neighbor and what it delivered this round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PeerSlot {
    id: AgentId,
    received: Points,
}

#[derive(Debug, Clone)]
pub struct Client {
    id: AgentId,
    max_upload: Points,
    max_download: Points,
    willing_to_give: Points,
    current_upload_remaining: Points,
    peer_size: usize,
    peers: Vec<PeerSlot>,
}

impl Client {
    pub fn new(id: AgentId, max_upload: Points, max_download: Points, peer_size: usize) -> Self {
        Self {
            id,
            max_upload,
            max_download,
            willing_to_give: max_upload,
            current_upload_remaining: max_upload,
            peer_size,
            peers: Vec::new(),
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn max_upload(&self) -> Points {
        self.max_upload
    }

    pub fn max_download(&self) -> Points {
        self.max_download
    }

    pub fn willing_to_give(&self) -> Points {
        self.willing_to_give
    }

    pub fn current_upload_remaining(&self) -> Points {
        self.current_upload_remaining
    }

    pub fn peer_size(&self) -> usize {
        self.peer_size
    }

    /// Neighbor ids in peer-list order
    pub fn peer_ids(&self) -> Vec<AgentId> {
        self.peers.iter().map(|slot| slot.id).collect()
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn has_peer(&self, id: AgentId) -> bool {
        self.peers.iter().any(|slot| slot.id == id)
    }

    /// Amount received from one peer this round
    pub fn received_from(&self, id: AgentId) -> Option<Points> {
        self.peers.iter().find(|slot| slot.id == id).map(|slot| slot.received)
    }

    /// Total received from all peers this round
    pub fn received(&self) -> Points {
        self.peers.iter().map(|slot| slot.received).sum()
    }

    pub fn is_free_rider(&self) -> bool {
        self.willing_to_give < self.max_download / 2
    }

    pub fn is_saturated(&self) -> bool {
        self.peers.len() >= self.peer_size
    }

    pub fn wants_content(&self) -> bool {
        self.received() < self.max_download
    }

    /// A peer asks this client for one unit. The strategy decides whether the
    /// requestor is served at all; the remaining budget decides whether it can be.
    pub fn ask_for_content(&mut self, requestor: AgentId, strategy: &dyn Strategy) -> bool {
        if strategy.willing_to_give_to(requestor) && self.current_upload_remaining > 0 {
            self.current_upload_remaining -= 1;
            true
        } else {
            false
        }
    }

    /// Record one unit received from `from` after a granted request.
    pub fn give_content(&mut self, from: AgentId) {
        let own_id = self.id;
        let slot = self
            .peers
            .iter_mut()
            .find(|slot| slot.id == from)
            .unwrap_or_else(|| panic!("agent {} received content from non-peer {}", own_id, from));
        slot.received += 1;
    }

    pub fn add_peer(&mut self, peer: AgentId) {
        assert!(
            !self.has_peer(peer),
            "agent {} already lists {} as a peer",
            self.id,
            peer
        );
        assert_ne!(peer, self.id, "agent {} cannot peer with itself", self.id);
        self.peers.push(PeerSlot { id: peer, received: 0 });
    }

    pub fn remove_peer(&mut self, peer: AgentId) {
        let index = self
            .peers
            .iter()
            .position(|slot| slot.id == peer)
            .unwrap_or_else(|| panic!("agent {} does not list {} as a peer", self.id, peer));
        self.peers.remove(index);
    }

    /// End-of-round capacity feedback.
    ///
    /// Satisfied clients (more than 65% of their download target) restore their
    /// full upload ceiling; everyone else scales their allowance down in
    /// proportion to what they received. Integer floor throughout.
    pub fn reset_capacity(&mut self) {
        let received = self.received() as u64;
        let max_download = self.max_download as u64;
        let threshold = max_download * SATISFACTION_PERCENT / 100;

        self.willing_to_give = if received > threshold {
            self.max_upload
        } else if max_download == 0 {
            0
        } else {
            (self.willing_to_give as u64 * received / max_download) as Points
        };
        self.current_upload_remaining = self.willing_to_give;
    }

    /// Returns this round's per-peer receive counters and zeroes them.
    pub fn take_contributions(&mut self) -> Vec<(AgentId, Points)> {
        self.peers
            .iter_mut()
            .map(|slot| (slot.id, std::mem::take(&mut slot.received)))
            .collect()
    }

    pub fn snapshot(&self) -> AgentResult {
        AgentResult {
            amount_acquired: self.received(),
            amount_remaining: self.current_upload_remaining,
            willing_to_give: self.willing_to_give,
            free_rider: self.is_free_rider(),
            id: self.id.0,
            peers: self.peers.iter().map(|slot| slot.id.0).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::NoStrategy;

    #[derive(Debug)]
    struct Refuse;

    impl Strategy for Refuse {
        fn willing_to_give_to(&self, _candidate: AgentId) -> bool {
            false
        }

        fn regenerate(
            &mut self,
            ctx: &mut crate::strategy::PeerContext<'_>,
            _old: &[(AgentId, Points)],
            _round: usize,
        ) -> Vec<AgentId> {
            ctx.current_peers()
        }
    }

    fn client_with_peers(willing: Points, peers: &[u64]) -> Client {
        let mut client = Client::new(AgentId(0), willing, 10, 4);
        for &p in peers {
            client.add_peer(AgentId(p));
        }
        client
    }

    fn receive(client: &mut Client, from: u64, amount: Points) {
        for _ in 0..amount {
            client.give_content(AgentId(from));
        }
    }

    #[test]
    fn test_id_allocator_is_sequential() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next_id(), AgentId(0));
        assert_eq!(ids.next_id(), AgentId(1));
        assert_eq!(ids.next_id(), AgentId(2));
    }

    #[test]
    fn test_ask_for_content_spends_budget() {
        let mut client = client_with_peers(2, &[1]);

        assert!(client.ask_for_content(AgentId(1), &NoStrategy));
        assert_eq!(client.current_upload_remaining(), 1);
        assert!(client.ask_for_content(AgentId(1), &NoStrategy));
        assert!(!client.ask_for_content(AgentId(1), &NoStrategy));
        assert_eq!(client.current_upload_remaining(), 0);
    }

    #[test]
    fn test_ask_for_content_respects_strategy() {
        let mut client = client_with_peers(5, &[1]);

        assert!(!client.ask_for_content(AgentId(1), &Refuse));
        assert_eq!(client.current_upload_remaining(), 5);
    }

    #[test]
    fn test_give_content_counts_per_peer() {
        let mut client = client_with_peers(10, &[1, 2]);
        receive(&mut client, 1, 3);
        receive(&mut client, 2, 1);

        assert_eq!(client.received_from(AgentId(1)), Some(3));
        assert_eq!(client.received(), 4);
        assert!(client.wants_content());

        receive(&mut client, 2, 6);
        assert!(!client.wants_content());
    }

    #[test]
    #[should_panic(expected = "non-peer")]
    fn test_give_content_from_stranger_panics() {
        let mut client = client_with_peers(10, &[1]);
        client.give_content(AgentId(5));
    }

    #[test]
    #[should_panic(expected = "already lists")]
    fn test_double_add_panics() {
        let mut client = client_with_peers(10, &[1]);
        client.add_peer(AgentId(1));
    }

    #[test]
    #[should_panic(expected = "does not list")]
    fn test_remove_absent_panics() {
        let mut client = client_with_peers(10, &[1]);
        client.remove_peer(AgentId(2));
    }

    #[test]
    fn test_reset_restores_when_satisfied() {
        let mut client = client_with_peers(10, &[1]);
        client.willing_to_give = 4;
        receive(&mut client, 1, 7);

        client.reset_capacity();
        assert_eq!(client.willing_to_give(), 10);
        assert_eq!(client.current_upload_remaining(), 10);
    }

    #[test]
    fn test_reset_scales_down_when_unsatisfied() {
        let mut client = client_with_peers(10, &[1]);
        receive(&mut client, 1, 3);

        client.reset_capacity();
        // floor(0.30 * 10)
        assert_eq!(client.willing_to_give(), 3);

        client.take_contributions();
        receive(&mut client, 1, 3);
        client.reset_capacity();
        // floor(0.30 * 3)
        assert_eq!(client.willing_to_give(), 0);
    }

    #[test]
    fn test_threshold_boundary_is_exclusive() {
        let mut client = Client::new(AgentId(0), 8, 20, 2);
        client.add_peer(AgentId(1));
        // 65% of 20 is exactly 13
        receive(&mut client, 1, 13);

        client.reset_capacity();
        assert_eq!(client.willing_to_give(), 8 * 13 / 20);
    }

    #[test]
    fn test_free_rider_boundary() {
        let mut client = Client::new(AgentId(0), 5, 10, 2);
        assert!(!client.is_free_rider());

        client.willing_to_give = 4;
        assert!(client.is_free_rider());
    }

    #[test]
    fn test_take_contributions_zeroes_counters() {
        let mut client = client_with_peers(10, &[3, 1]);
        receive(&mut client, 1, 2);

        let old = client.take_contributions();
        assert_eq!(old, vec![(AgentId(3), 0), (AgentId(1), 2)]);
        assert_eq!(client.received(), 0);
        assert_eq!(client.peer_ids(), vec![AgentId(3), AgentId(1)]);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut client = client_with_peers(10, &[1, 2]);
        receive(&mut client, 2, 4);
        client.ask_for_content(AgentId(1), &NoStrategy);

        let result = client.snapshot();
        assert_eq!(result.id, 0);
        assert_eq!(result.amount_acquired, 4);
        assert_eq!(result.amount_remaining, 9);
        assert_eq!(result.willing_to_give, 10);
        assert!(!result.free_rider);
        assert_eq!(result.peers, vec![1, 2]);
    }

    #[test]
    fn test_saturation() {
        let client = client_with_peers(10, &[1, 2, 3]);
        assert!(!client.is_saturated());

        let client = client_with_peers(10, &[1, 2, 3, 4]);
        assert!(client.is_saturated());
    }
}
