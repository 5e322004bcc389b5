//! Configuration System
//!
//! Run parameters, loadable from a TOML file so sweeps can be scripted
//! without recompiling.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use swarm_events::{Points, RunMetadata};

use crate::error::SimError;
use crate::strategy::StrategyKind;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "swarm.toml";

/// Parameters for a single simulation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Strategy selector, resolved by [`StrategyKind::from_str`](std::str::FromStr)
    pub strategy: String,
    /// Number of rounds to run
    pub iterations: usize,
    /// Peer-degree target for every agent
    pub peer_size: usize,
    /// Cooperative population size
    pub num_good_clients: usize,
    /// Free-rider population size
    pub num_free_riders: usize,
    /// Upload ceiling for cooperative agents
    pub max_upload: Points,
    /// Download target for every agent
    pub max_download: Points,
    /// Upload ceiling for free riders
    pub free_rider_upload: Points,
    /// Seed for the single run-wide generator
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            strategy: "OptimisticUnchoking".to_string(),
            iterations: 20,
            peer_size: 4,
            num_good_clients: 8,
            num_free_riders: 2,
            max_upload: 100,
            max_download: 100,
            free_rider_upload: 0,
            seed: 0,
        }
    }
}

impl SimConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from the default path, or use defaults if not found
    pub fn load_or_default() -> Self {
        Self::load(DEFAULT_CONFIG_PATH).unwrap_or_else(|e| {
            tracing::warn!("Could not load {}: {}. Using defaults.", DEFAULT_CONFIG_PATH, e);
            Self::default()
        })
    }

    pub fn total_agents(&self) -> usize {
        self.num_good_clients + self.num_free_riders
    }

    pub fn strategy_kind(&self) -> Result<StrategyKind, SimError> {
        self.strategy.parse()
    }

    /// Checks every parameter and resolves the strategy selector.
    pub fn validate(&self) -> Result<StrategyKind, SimError> {
        let kind = self.strategy_kind()?;
        if self.iterations == 0 {
            return Err(SimError::InvalidConfig("iterations must be positive".into()));
        }
        if self.peer_size == 0 {
            return Err(SimError::InvalidConfig("peer_size must be positive".into()));
        }
        if self.total_agents() == 0 {
            return Err(SimError::InvalidConfig("population is empty".into()));
        }
        if self.max_download == 0 {
            return Err(SimError::InvalidConfig("max_download must be positive".into()));
        }
        if self.free_rider_upload > self.max_upload {
            return Err(SimError::InvalidConfig(format!(
                "free_rider_upload {} exceeds max_upload {}",
                self.free_rider_upload, self.max_upload
            )));
        }
        Ok(kind)
    }

    /// Metadata block for the run report
    pub fn metadata(&self, kind: StrategyKind) -> RunMetadata {
        RunMetadata {
            strategy: kind.name().to_string(),
            iterations: self.iterations,
            max_up: self.max_upload,
            max_down: self.max_download,
            starting_good_clients: self.num_good_clients,
            starting_bad_clients: self.num_free_riders,
            peer_size: self.peer_size,
            seed: self.seed,
        }
    }
}

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
