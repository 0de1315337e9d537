//! Batch driver: many concurrent matches, each playing a fixed number of moves.
//!
//! Every match runs as one job on the [`MatchRunner`], so at most `max_concurrent_workers`
//! matches think at the same time. Results come back over a channel and are aggregated into a
//! [`StressReport`]; matches still running when `stress_test_timeout` expires count as failed.
//! Once the timeout expires, queued matches are skipped and running ones stop after their
//! current move, so the call returns shortly after the timeout.

use std::{
    fmt::Display,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use anyhow::Context;
use tracing::{info, instrument, warn};

use crate::agent_pool::AgentPool;
use crate::configuration::{AIConfig, REALTIME_LIMIT_MS};
use crate::error::Result;
use crate::match_coordinator::{MatchCoordinator, MatchResult};
use crate::match_runner::MatchRunner;
use crate::scenario::ScenarioGenerator;
use crate::types::{AgentSpec, Difficulty, Personality, Side};

/// Shape of a stress run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StressSettings {
    /// Number of matches.
    pub matches: usize,
    /// Move requests per match.
    pub moves_per_match: usize,
    /// Pieces per side in the generated positions.
    pub pieces_per_side: usize,
    /// Base seed of the generated positions.
    pub seed: u64,
}

impl Default for StressSettings {
    fn default() -> Self {
        StressSettings {
            matches: 50,
            moves_per_match: 20,
            pieces_per_side: 10,
            seed: 0,
        }
    }
}

/// Aggregated outcome of a stress run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StressReport {
    /// Matches that played every move and ended cleanly.
    pub completed: usize,
    /// Matches that errored or did not finish in time.
    pub failed: usize,
    /// Decisions measured.
    pub moves: usize,
    /// Mean decision time.
    pub avg_latency_ms: f32,
    /// 95th percentile decision time.
    pub p95_latency_ms: f32,
    /// 99th percentile decision time.
    pub p99_latency_ms: f32,
    /// Share of decisions under the 100ms real-time limit.
    pub compliance_rate: f32,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl Display for StressReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "completed: {}, failed: {}, moves: {}, avg: {:.2}ms, p95: {:.2}ms, p99: {:.2}ms, compliance: {:.2}%, elapsed: {:?}",
            self.completed,
            self.failed,
            self.moves,
            self.avg_latency_ms,
            self.p95_latency_ms,
            self.p99_latency_ms,
            self.compliance_rate * 100.0,
            self.elapsed
        )
    }
}

/// Runs `settings.matches` matches concurrently and aggregates their decision latencies.
///
/// # Errors
/// Returns an error if the configuration is invalid or the worker pool cannot start. Individual
/// match failures are counted in the report instead.
#[instrument(skip(config))]
pub fn run_stress_test(config: &AIConfig, settings: StressSettings) -> anyhow::Result<StressReport> {
    config.validate().context("invalid stress configuration")?;
    let start = Instant::now();

    let pool = Arc::new(AgentPool::new(config));
    let coordinator = Arc::new(MatchCoordinator::new(pool));
    let runner = MatchRunner::new(config, coordinator)?;

    let cancelled = Arc::new(AtomicBool::new(false));
    let receivers: Vec<_> = (0..settings.matches)
        .map(|i| {
            let specs = match_specs(i);
            let seed = settings.seed.wrapping_add(i as u64);
            let cancelled = cancelled.clone();
            runner.submit(move |coordinator| {
                play_match(coordinator, specs, settings, seed, &cancelled)
            })
        })
        .collect();

    let deadline = start + config.stress_test_timeout;
    let mut report = StressReport::default();
    let mut latencies = Vec::with_capacity(settings.matches * settings.moves_per_match);
    for (i, rx) in receivers.into_iter().enumerate() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(Ok(match_latencies)) => {
                report.completed += 1;
                latencies.extend(match_latencies);
            }
            Ok(Err(e)) => {
                warn!(match_index = i, "match failed: {e}");
                report.failed += 1;
            }
            Err(e) => {
                warn!(match_index = i, "no result: {e}");
                report.failed += 1;
            }
        }
        if config.verbose {
            print!(
                "\x1b[2K\x1b[32mStress:\x1b[39m {}/{} done, {} failed\x1b[0G",
                report.completed + report.failed,
                settings.matches,
                report.failed
            );
            let _ = std::io::Write::flush(&mut std::io::stdout());
        }
    }
    if config.verbose {
        println!();
    }
    cancelled.store(true, Ordering::Relaxed);

    summarize(&mut report, latencies);
    report.elapsed = start.elapsed();
    info!(%report, "stress test finished");
    Ok(report)
}

/// Rotates through every difficulty/personality pair.
fn match_specs(i: usize) -> (AgentSpec, AgentSpec) {
    let spec = |k: usize| {
        AgentSpec::new(
            Difficulty::ALL[k % Difficulty::ALL.len()],
            Personality::ALL[(k / Difficulty::ALL.len()) % Personality::ALL.len()],
        )
    };
    (spec(i), spec(i + 1))
}

fn play_match(
    coordinator: &MatchCoordinator,
    (one, two): (AgentSpec, AgentSpec),
    settings: StressSettings,
    seed: u64,
    cancelled: &AtomicBool,
) -> Result<Vec<f32>> {
    if cancelled.load(Ordering::Relaxed) {
        return Ok(Vec::new());
    }
    let match_id = coordinator.create_match(one, two)?;
    let mut generator = ScenarioGenerator::new(seed, settings.pieces_per_side);
    let mut latencies = Vec::with_capacity(settings.moves_per_match);

    let played: Result<()> = (0..settings.moves_per_match)
        .take_while(|_| !cancelled.load(Ordering::Relaxed))
        .try_for_each(|turn| {
            let side = if turn % 2 == 0 { Side::One } else { Side::Two };
            let scenario = generator.generate(side);
            let response =
                coordinator.request_move(match_id, &scenario.position, &scenario.legal_moves)?;
            latencies.push(response.latency_ms);
            Ok(())
        });

    // always release the agents, even after a failed move
    let ended = coordinator.end_match(match_id, MatchResult::Draw);
    played?;
    ended?;
    Ok(latencies)
}

fn summarize(report: &mut StressReport, mut latencies: Vec<f32>) {
    report.moves = latencies.len();
    if latencies.is_empty() {
        return;
    }
    latencies.sort_by(f32::total_cmp);
    let n = latencies.len();
    report.avg_latency_ms = latencies.iter().sum::<f32>() / n as f32;
    report.p95_latency_ms = percentile(&latencies, 95);
    report.p99_latency_ms = percentile(&latencies, 99);
    let compliant = latencies.iter().filter(|l| **l < REALTIME_LIMIT_MS).count();
    report.compliance_rate = compliant as f32 / n as f32;
}

/// Nearest-rank percentile of sorted, non-empty data.
fn percentile(sorted: &[f32], percent: usize) -> f32 {
    let rank = (percent * sorted.len()).div_ceil(100);
    sorted[rank.clamp(1, sorted.len()) - 1]
}
