//! Free-rider swarm simulation engine.
//!
//! A round-based abstraction of a BitTorrent-style overlay used to study how
//! agents that contribute no upload capacity fare under different peer
//! selection and choking strategies.
//!
//! # Modules
//!
//! - [`client`]: per-agent capacity state, peer list and feedback law
//! - [`swarm`]: agent arena, symmetric edge changes and candidate sampling
//! - [`strategy`]: the reciprocity strategy family
//! - [`model`]: the round loop and graph validation
//! - [`config`]: run parameters and TOML loading
//! - [`output`]: run reports and summary statistics

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod strategy;
pub mod swarm;

pub use client::{AgentId, Client, IdAllocator};
pub use config::{ConfigError, SimConfig};
pub use error::{Checkpoint, SimError};
pub use model::{run, Model};
pub use strategy::{PeerContext, Strategy, StrategyKind};
pub use swarm::Swarm;

pub use swarm_events::{AgentResult, Points, RoundResults, RunReport};
