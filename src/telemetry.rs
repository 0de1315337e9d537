//! Write-only telemetry hooks.
//!
//! The coordinator reports every move and every finished match to a [`TelemetrySink`]. Exporting
//! the numbers (Prometheus, StatsD, ...) belongs to the embedding service; the default
//! [`TelemetryRecorder`] only emits `tracing` events on the `telemetry` target and keeps in-memory
//! aggregates that tests and the stress harness can read back.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use tracing::{debug, info};

use crate::agent::AgentId;
use crate::match_coordinator::MatchId;
use crate::types::{Difficulty, Side};

/// Upper bounds (ms) of the latency histogram buckets; the last bucket is unbounded.
pub const LATENCY_BUCKETS_MS: [f32; 6] = [5.0, 10.0, 25.0, 50.0, 90.0, 100.0];

/// One decision as seen by telemetry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveEvent {
    /// Match of the decision.
    pub match_id: MatchId,
    /// Deciding agent.
    pub agent: AgentId,
    /// Its difficulty.
    pub difficulty: Difficulty,
    /// Side it played.
    pub side: Side,
    /// Decision time.
    pub latency_ms: f32,
    /// Fraud score after the decision.
    pub fraud_score: f32,
}

/// A finished match as seen by telemetry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchEndEvent {
    /// Finished match.
    pub match_id: MatchId,
    /// Number of recorded decisions.
    pub moves: usize,
    /// Match duration.
    pub duration_ms: f64,
}

/// Receiver of engine telemetry. Must not block.
pub trait TelemetrySink: Send + Sync {
    /// Called after every `request_move`.
    fn on_move(&self, event: &MoveEvent);

    /// Called after every successful `end_match`.
    fn on_match_end(&self, event: &MatchEndEvent);
}

/// Latency distribution of one difficulty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencyHistogram {
    /// Count per bucket of [`LATENCY_BUCKETS_MS`], plus the overflow bucket.
    pub buckets: [u64; LATENCY_BUCKETS_MS.len() + 1],
    /// Number of observations.
    pub count: u64,
    /// Sum of observations.
    pub sum_ms: f64,
}

impl LatencyHistogram {
    fn observe(&mut self, latency_ms: f32) {
        let bucket = LATENCY_BUCKETS_MS
            .iter()
            .position(|bound| latency_ms <= *bound)
            .unwrap_or(LATENCY_BUCKETS_MS.len());
        self.buckets[bucket] += 1;
        self.count += 1;
        self.sum_ms += latency_ms as f64;
    }
}

/// Snapshot of everything the recorder aggregated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    /// Total move requests.
    pub move_requests: u64,
    /// Finished matches.
    pub matches_ended: u64,
    /// Latencies per difficulty.
    pub latency: HashMap<Difficulty, LatencyHistogram>,
    /// Last fraud score per agent.
    pub fraud_scores: HashMap<AgentId, f32>,
}

/// Default sink: structured `tracing` events plus in-memory aggregates.
#[derive(Debug, Default)]
pub struct TelemetryRecorder {
    inner: Mutex<TelemetrySnapshot>,
}

impl TelemetryRecorder {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current aggregates.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, TelemetrySnapshot> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TelemetrySink for TelemetryRecorder {
    fn on_move(&self, event: &MoveEvent) {
        debug!(
            target: "telemetry",
            match_id = %event.match_id,
            agent = %event.agent,
            difficulty = %event.difficulty,
            side = event.side.number(),
            latency_ms = event.latency_ms,
            fraud_score = event.fraud_score,
            "move"
        );
        let mut inner = self.lock();
        inner.move_requests += 1;
        inner
            .latency
            .entry(event.difficulty)
            .or_default()
            .observe(event.latency_ms);
        inner.fraud_scores.insert(event.agent, event.fraud_score);
    }

    fn on_match_end(&self, event: &MatchEndEvent) {
        info!(
            target: "telemetry",
            match_id = %event.match_id,
            moves = event.moves,
            duration_ms = event.duration_ms,
            "match ended"
        );
        self.lock().matches_ended += 1;
    }
}

#[cfg(test)]
mod telemetry_tests {
    use super::*;

    #[test]
    fn histogram_buckets_by_upper_bound() {
        let recorder = TelemetryRecorder::new();
        for latency_ms in [1.0, 5.0, 60.0, 150.0] {
            recorder.on_move(&MoveEvent {
                match_id: MatchId(1),
                agent: AgentId(2),
                difficulty: Difficulty::Hard,
                side: Side::One,
                latency_ms,
                fraud_score: 0.25,
            });
        }
        let snapshot = recorder.snapshot();
        let histogram = &snapshot.latency[&Difficulty::Hard];
        assert_eq!(histogram.buckets, [2, 0, 0, 0, 1, 0, 1]);
        assert_eq!(snapshot.move_requests, 4);
        assert_eq!(snapshot.fraud_scores[&AgentId(2)], 0.25);
    }
}
