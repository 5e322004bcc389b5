//! Free-rider swarm simulation
//!
//! Runs one configured simulation, optionally writing the run report and
//! printing per-round population averages.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use swarm_core::output::{stats_path, summarize, write_report, write_stats};
use swarm_core::{Model, RunReport, SimConfig};

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "swarm_sim")]
#[command(about = "Simulate free riders in a peer-to-peer swarm")]
struct Args {
    /// TOML configuration file (defaults to swarm.toml); flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Strategy selector (e.g. DropZeros, OptimisticUnchoking)
    #[arg(long)]
    strategy: Option<String>,

    /// Number of rounds to simulate
    #[arg(long)]
    iterations: Option<usize>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Cooperative population size
    #[arg(long)]
    good: Option<usize>,

    /// Free-rider population size
    #[arg(long)]
    free_riders: Option<usize>,

    /// Peer-degree target
    #[arg(long)]
    peer_size: Option<usize>,

    /// Upload ceiling for cooperative agents
    #[arg(long)]
    max_up: Option<u32>,

    /// Download target for every agent
    #[arg(long)]
    max_down: Option<u32>,

    /// Upload ceiling for free riders
    #[arg(long)]
    free_rider_up: Option<u32>,

    /// Directory to write the JSON run report and its stats file into
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print per-round population averages
    #[arg(long)]
    summary: bool,
}

impl Args {
    fn resolve_config(&self) -> Result<SimConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => SimConfig::load(path)?,
            None => SimConfig::load_or_default(),
        };
        if let Some(strategy) = &self.strategy {
            config.strategy = strategy.clone();
        }
        if let Some(v) = self.iterations {
            config.iterations = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        if let Some(v) = self.good {
            config.num_good_clients = v;
        }
        if let Some(v) = self.free_riders {
            config.num_free_riders = v;
        }
        if let Some(v) = self.peer_size {
            config.peer_size = v;
        }
        if let Some(v) = self.max_up {
            config.max_upload = v;
        }
        if let Some(v) = self.max_down {
            config.max_download = v;
        }
        if let Some(v) = self.free_rider_up {
            config.free_rider_upload = v;
        }
        Ok(config)
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.resolve_config()?;
    let mut model = Model::new(config.clone())?;
    let rounds = model.run()?;

    let stats = summarize(&rounds);

    if let Some(dir) = &args.output {
        let report = RunReport::new(config.metadata(model.strategy_kind()), &rounds);
        let path = write_report(dir, &report)?;
        write_stats(stats_path(&path), &stats)?;
        println!("Wrote {}", path.display());
    }

    if args.summary {
        println!(
            "{:>5} {:>6} {:>6} {:>10} {:>10} {:>10}",
            "round", "coop", "riders", "coop_mean", "rider_mean", "all_mean"
        );
        for r in &stats.round_history {
            println!(
                "{:>5} {:>6} {:>6} {:>10.2} {:>10.2} {:>10.2}",
                r.iteration,
                r.cooperative_count,
                r.free_rider_count,
                r.cooperative_mean,
                r.free_rider_mean,
                r.overall_mean
            );
        }
        println!(
            "Total acquired {} over {} rounds ({:.2} per round)",
            stats.total_acquired, stats.total_rounds, stats.mean_acquired_per_round
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
