//! Swarm
//!
//! The topology registry. Owns every client in the run as an arena keyed by
//! [`AgentId`], performs every peer-edge change on both endpoints at once, and
//! samples fresh candidates for bootstrap and replacement.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

use crate::client::{AgentId, Client};
use crate::error::{Checkpoint, SimError};

#[derive(Debug, Default)]
pub struct Swarm {
    clients: BTreeMap<AgentId, Client>,
}

impl Swarm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client to the universe. Joining the same id twice is a caller bug.
    pub fn join(&mut self, client: Client) {
        let id = client.id();
        let previous = self.clients.insert(id, client);
        assert!(previous.is_none(), "agent {} joined the swarm twice", id);
    }

    /// Every member id. Ascending order, but callers shuffle where order matters.
    pub fn all_agents(&self) -> Vec<AgentId> {
        self.clients.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn get(&self, id: AgentId) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn client(&self, id: AgentId) -> &Client {
        self.clients
            .get(&id)
            .unwrap_or_else(|| panic!("agent {} is not in the swarm", id))
    }

    pub fn client_mut(&mut self, id: AgentId) -> &mut Client {
        self.clients
            .get_mut(&id)
            .unwrap_or_else(|| panic!("agent {} is not in the swarm", id))
    }

    pub fn clients(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }

    pub fn clients_mut(&mut self) -> impl Iterator<Item = &mut Client> {
        self.clients.values_mut()
    }

    pub fn is_saturated(&self, id: AgentId) -> bool {
        self.client(id).is_saturated()
    }

    /// Create the edge `a <-> b`.
    pub fn connect(&mut self, a: AgentId, b: AgentId) {
        self.client_mut(a).add_peer(b);
        self.client_mut(b).add_peer(a);
        tracing::trace!("connected {} <-> {}", a, b);
    }

    /// Remove the edge `a <-> b`.
    pub fn disconnect(&mut self, a: AgentId, b: AgentId) {
        self.client_mut(a).remove_peer(b);
        self.client_mut(b).remove_peer(a);
        tracing::trace!("disconnected {} <-> {}", a, b);
    }

    /// Agents `requestor` could take on as a new peer right now.
    ///
    /// Excludes the requestor, its current peers, anything in `exclude`, and
    /// saturated agents.
    pub fn eligible_candidates(
        &self,
        exclude: &BTreeSet<AgentId>,
        requestor: AgentId,
    ) -> Vec<AgentId> {
        let own = self.client(requestor);
        self.clients
            .values()
            .filter(|c| {
                let id = c.id();
                id != requestor && !exclude.contains(&id) && !own.has_peer(id) && !c.is_saturated()
            })
            .map(Client::id)
            .collect()
    }

    /// Draw up to `count` distinct eligible agents uniformly at random and
    /// connect each of them to `requestor`.
    ///
    /// Returns fewer than `count` when the pool is short, and never more than
    /// the requestor has free slots for.
    pub fn sample_new_peers<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        exclude: &BTreeSet<AgentId>,
        requestor: AgentId,
        rng: &mut R,
    ) -> Vec<AgentId> {
        let own = self.client(requestor);
        let free_slots = own.peer_size().saturating_sub(own.peer_count());
        let count = count.min(free_slots);
        if count == 0 {
            return Vec::new();
        }

        let candidates = self.eligible_candidates(exclude, requestor);
        let chosen: Vec<AgentId> = candidates.choose_multiple(rng, count).copied().collect();
        for &peer in &chosen {
            self.connect(requestor, peer);
        }
        if chosen.len() < count {
            tracing::trace!(
                "agent {} asked for {} peers, only {} eligible",
                requestor,
                count,
                chosen.len()
            );
        }
        chosen
    }

    /// Drop the edges to `drop`, then backfill the freed slots by sampling,
    /// never re-picking anything in `drop` or `keep`.
    pub fn replace_peers<R: Rng + ?Sized>(
        &mut self,
        requestor: AgentId,
        drop: &[AgentId],
        keep: &[AgentId],
        rng: &mut R,
    ) -> Vec<AgentId> {
        for &peer in drop {
            self.disconnect(requestor, peer);
        }
        let exclude: BTreeSet<AgentId> = drop.iter().chain(keep).copied().collect();
        let fresh = self.sample_new_peers(drop.len(), &exclude, requestor, rng);
        if !drop.is_empty() {
            tracing::debug!(
                "agent {} replaced {:?} with {:?}",
                requestor,
                drop,
                fresh
            );
        }
        fresh
    }

    /// Pick a single eligible candidate without connecting it.
    pub fn sample_one<R: Rng + ?Sized>(
        &self,
        exclude: &BTreeSet<AgentId>,
        requestor: AgentId,
        rng: &mut R,
    ) -> Option<AgentId> {
        self.eligible_candidates(exclude, requestor).choose(rng).copied()
    }

    /// Validate the symmetric-edge and degree invariants over the whole graph.
    pub fn check_invariants(&self, checkpoint: Checkpoint) -> Result<(), SimError> {
        let mut in_degree: BTreeMap<AgentId, usize> = BTreeMap::new();

        for client in self.clients.values() {
            let agent = client.id();
            for peer in client.peer_ids() {
                if peer == agent {
                    return Err(SimError::SelfLoop { checkpoint, agent });
                }
                let listed_back = self.get(peer).map_or(false, |p| p.has_peer(agent));
                if !listed_back {
                    return Err(SimError::AsymmetricEdge {
                        checkpoint,
                        agent,
                        peer,
                    });
                }
                *in_degree.entry(peer).or_default() += 1;
            }
        }

        for (agent, degree) in in_degree {
            let peer_size = self.client(agent).peer_size();
            if degree > peer_size {
                return Err(SimError::DegreeOverflow {
                    checkpoint,
                    agent,
                    degree,
                    peer_size,
                });
            }
        }
        Ok(())
    }
}
