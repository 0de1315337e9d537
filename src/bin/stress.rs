//! Runs a batch of concurrent matches and prints latency statistics.
//!
//! Usage: `stress [matches] [moves_per_match] [seed]`. Engine settings are read from the
//! environment (see `AIConfig::from_env`).

use std::env;

use agent_arena::{
    anyhow::{self, Context},
    configuration::AIConfig,
    stress::{run_stress_test, StressSettings},
};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_thread_names(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = AIConfig::from_env().context("could not read engine settings from environment")?;

    let mut settings = StressSettings::default();
    let mut args = env::args().skip(1);
    if let Some(matches) = args.next() {
        settings.matches = matches.parse().context("matches must be a number")?;
    }
    if let Some(moves) = args.next() {
        settings.moves_per_match = moves.parse().context("moves_per_match must be a number")?;
    }
    if let Some(seed) = args.next() {
        settings.seed = seed.parse().context("seed must be a number")?;
    }

    let report = run_stress_test(&config, settings)?;
    println!("{report}");
    if report.failed > 0 {
        anyhow::bail!("{} matches failed", report.failed);
    }
    Ok(())
}
