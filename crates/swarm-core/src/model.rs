//! Simulation Loop
//!
//! Drives a run round by round: bootstrap once, then per round settle the
//! exchange, snapshot every agent, recompute capacities, let every strategy
//! reshape its peer set, and validate the graph.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeMap, BTreeSet};

use swarm_events::{Points, RoundResults};

use crate::client::{AgentId, Client, IdAllocator};
use crate::config::SimConfig;
use crate::error::{Checkpoint, SimError};
use crate::strategy::{PeerContext, Strategy, StrategyKind};
use crate::swarm::Swarm;

pub struct Model {
    config: SimConfig,
    kind: StrategyKind,
    swarm: Swarm,
    strategies: BTreeMap<AgentId, Box<dyn Strategy>>,
    rng: SmallRng,
    round: usize,
    bootstrapped: bool,
}

impl Model {
    /// Validates the configuration and builds both populations.
    ///
    /// Cooperative agents take the first ids, free riders the rest.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        let kind = config.validate()?;
        let mut ids = IdAllocator::new();
        let mut swarm = Swarm::new();
        let mut strategies: BTreeMap<AgentId, Box<dyn Strategy>> = BTreeMap::new();

        let populations = [
            (config.num_good_clients, config.max_upload),
            (config.num_free_riders, config.free_rider_upload),
        ];
        for (count, max_upload) in populations {
            for _ in 0..count {
                let id = ids.next_id();
                swarm.join(Client::new(id, max_upload, config.max_download, config.peer_size));
                strategies.insert(id, kind.build(config.iterations));
            }
        }

        Ok(Self {
            rng: SmallRng::seed_from_u64(config.seed),
            config,
            kind,
            swarm,
            strategies,
            round: 0,
            bootstrapped: false,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.kind
    }

    pub fn swarm(&self) -> &Swarm {
        &self.swarm
    }

    pub fn strategy(&self, id: AgentId) -> Option<&dyn Strategy> {
        self.strategies.get(&id).map(|s| s.as_ref())
    }

    /// Index of the next round to run
    pub fn current_round(&self) -> usize {
        self.round
    }

    pub fn is_complete(&self) -> bool {
        self.round >= self.config.iterations
    }

    /// Every agent requests its initial peers, in id order. Idempotent.
    pub fn bootstrap(&mut self) -> Result<(), SimError> {
        if self.bootstrapped {
            return Ok(());
        }
        let target_degree = self.config.peer_size;
        for id in self.swarm.all_agents() {
            let Some(strategy) = self.strategies.get_mut(&id) else {
                continue;
            };
            let mut ctx = PeerContext::new(&mut self.swarm, &mut self.rng, id);
            strategy.bootstrap_peers(&mut ctx, target_degree);
        }
        self.swarm.check_invariants(Checkpoint::Bootstrap)?;
        self.bootstrapped = true;

        let edges: usize = self.swarm.clients().map(Client::peer_count).sum::<usize>() / 2;
        tracing::debug!("Bootstrap complete: {} agents, {} edges", self.swarm.len(), edges);
        Ok(())
    }

    /// Run one full round and return its snapshot.
    pub fn step(&mut self) -> Result<RoundResults, SimError> {
        if self.is_complete() {
            return Err(SimError::RunComplete(self.config.iterations));
        }
        self.bootstrap()?;

        let round = self.round;
        let transfers = self.exchange();
        let results = self.snapshot(round);
        self.regenerate(round);
        self.swarm.check_invariants(Checkpoint::Round(round))?;
        self.round += 1;

        tracing::debug!(
            "[Round {:>4}] {} units exchanged, {} free riders",
            round,
            transfers,
            results.free_rider_count()
        );
        Ok(results)
    }

    /// Run every remaining round and return the snapshots in round order.
    pub fn run(&mut self) -> Result<Vec<RoundResults>, SimError> {
        tracing::info!(
            "Starting run: {} with {} cooperative + {} free riders, {} rounds, seed {}",
            self.kind,
            self.config.num_good_clients,
            self.config.num_free_riders,
            self.config.iterations,
            self.config.seed
        );
        self.bootstrap()?;

        let mut output = Vec::with_capacity(self.config.iterations - self.round);
        while !self.is_complete() {
            output.push(self.step()?);
        }

        tracing::info!("Run complete after {} rounds", self.round);
        Ok(output)
    }

    /// Repeated randomized passes until nobody can make progress.
    ///
    /// Each pass, every agent still in the working set asks its peers in
    /// random order and takes one unit from the first that grants. An agent
    /// that is done or refused by everyone leaves the working set.
    fn exchange(&mut self) -> u64 {
        let mut working: BTreeSet<AgentId> = self.swarm.all_agents().into_iter().collect();
        let mut transfers = 0u64;
        let mut passes = 0usize;

        while !working.is_empty() {
            passes += 1;
            let mut order: Vec<AgentId> = working.iter().copied().collect();
            order.shuffle(&mut self.rng);

            for agent in order {
                if !self.swarm.client(agent).wants_content() {
                    working.remove(&agent);
                    continue;
                }
                let mut peers = self.swarm.client(agent).peer_ids();
                peers.shuffle(&mut self.rng);

                match peers.into_iter().find(|&peer| self.request(agent, peer)) {
                    Some(provider) => {
                        self.swarm.client_mut(agent).give_content(provider);
                        transfers += 1;
                    }
                    None => {
                        working.remove(&agent);
                    }
                }
            }
        }

        tracing::trace!("Exchange settled after {} passes", passes);
        transfers
    }

    /// `requestor` asks `provider` for one unit.
    fn request(&mut self, requestor: AgentId, provider: AgentId) -> bool {
        let Some(strategy) = self.strategies.get(&provider) else {
            return false;
        };
        self.swarm
            .client_mut(provider)
            .ask_for_content(requestor, strategy.as_ref())
    }

    fn snapshot(&self, round: usize) -> RoundResults {
        RoundResults::new(round, self.swarm.clients().map(Client::snapshot).collect())
    }

    /// Capacity feedback for everyone, then each strategy in random order.
    ///
    /// Contribution counters are captured for all agents before any strategy
    /// runs, so edges created mid-pass start the next round at zero.
    fn regenerate(&mut self, round: usize) {
        for client in self.swarm.clients_mut() {
            client.reset_capacity();
        }
        let old: BTreeMap<AgentId, Vec<(AgentId, Points)>> = self
            .swarm
            .clients_mut()
            .map(|client| (client.id(), client.take_contributions()))
            .collect();

        let mut order = self.swarm.all_agents();
        order.shuffle(&mut self.rng);
        for id in order {
            let Some(strategy) = self.strategies.get_mut(&id) else {
                continue;
            };
            let old_peers = old.get(&id).map(Vec::as_slice).unwrap_or(&[]);
            let mut ctx = PeerContext::new(&mut self.swarm, &mut self.rng, id);
            strategy.reconcile_and_regenerate(&mut ctx, old_peers, round);
        }
    }
}

/// Build a model from `config` and run it to completion.
pub fn run(config: SimConfig) -> Result<Vec<RoundResults>, SimError> {
    Model::new(config)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(strategy: &str) -> SimConfig {
        SimConfig {
            strategy: strategy.to_string(),
            iterations: 6,
            peer_size: 3,
            num_good_clients: 8,
            num_free_riders: 2,
            max_upload: 10,
            max_download: 10,
            free_rider_upload: 0,
            seed: 42,
        }
    }

    #[test]
    fn test_new_builds_populations() {
        let model = Model::new(config("NoStrategy")).unwrap();
        let swarm = model.swarm();

        assert_eq!(swarm.len(), 10);
        assert_eq!(swarm.client(AgentId(0)).max_upload(), 10);
        assert_eq!(swarm.client(AgentId(9)).max_upload(), 0);
        assert!(swarm.client(AgentId(9)).is_free_rider());
        assert!(model.strategy(AgentId(3)).is_some());
    }

    #[test]
    fn test_new_rejects_unknown_strategy() {
        assert!(matches!(
            Model::new(config("Bogus")),
            Err(SimError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_bootstrap_fills_degrees() {
        let mut model = Model::new(config("NoStrategy")).unwrap();
        model.bootstrap().unwrap();

        for client in model.swarm().clients() {
            assert!(client.peer_count() >= 1);
            assert!(client.peer_count() <= 3);
        }
    }

    #[test]
    fn test_step_conserves_volume() {
        let mut model = Model::new(config("DropZeros")).unwrap();
        let results = model.step().unwrap();

        let given: u64 = results
            .agents
            .iter()
            .map(|a| (a.willing_to_give - a.amount_remaining) as u64)
            .sum();
        assert_eq!(given, results.total_acquired());
        for agent in &results.agents {
            assert!(agent.amount_acquired <= 10);
            assert!(agent.amount_remaining <= agent.willing_to_give);
        }
    }

    #[test]
    fn test_run_length_and_completion() {
        let mut model = Model::new(config("OptimisticUnchoking")).unwrap();
        let rounds = model.run().unwrap();

        assert_eq!(rounds.len(), 6);
        for (i, round) in rounds.iter().enumerate() {
            assert_eq!(round.iteration, i);
            assert_eq!(round.len(), 10);
        }
        assert!(model.is_complete());
        assert!(matches!(model.step(), Err(SimError::RunComplete(6))));
    }

    #[test]
    fn test_free_rider_population_has_no_upload() {
        let mut model = Model::new(config("NoStrategy")).unwrap();
        let results = model.step().unwrap();

        let rider = results.find(9).unwrap();
        assert_eq!(rider.willing_to_give, 0);
        assert_eq!(rider.amount_remaining, 0);
        assert!(rider.free_rider);
    }
}
