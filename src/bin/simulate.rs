//! Runs the two-hour broadcast simulation and prints the attribution report.
//!
//! `SIMULATION_SEED` picks the random stream (default 2026); engine settings
//! come from the usual `ATTRIBUTION_*` config sources.

use anyhow::Context;
use live_event_attribution::config::EngineConfig;
use live_event_attribution::simulate::{default_programme, BroadcastSimulation};
use tracing_subscriber::EnvFilter;

const DEFAULT_SEED: u64 = 2026;

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cfg = EngineConfig::load()?;
    let seed = match std::env::var("SIMULATION_SEED") {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("SIMULATION_SEED must be an integer, got {raw:?}"))?,
        Err(_) => DEFAULT_SEED,
    };

    let sim = BroadcastSimulation::default();
    let programme = default_programme(sim.start);
    tracing::info!(seed, breaks = programme.len(), "simulating broadcast");

    let report = sim.run(&programme, &cfg, seed)?;

    let rule = "=".repeat(70);
    println!("{rule}");
    println!("LIVE EVENT ATTRIBUTION ENGINE - BROADCAST SIMULATION");
    println!("{rule}");
    println!();
    print!("{report}");
    println!("{rule}");
    Ok(())
}
