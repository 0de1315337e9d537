//! Decision-timing anomaly detection.
//!
//! Every decision an agent makes is timed and fed to its [`FraudMonitor`]. Two patterns raise the
//! score: answering faster than the configured minimum thinking time, and answering with
//! suspiciously uniform latencies. Each record then decays the score aggressively, so a single
//! suspicious decision fades within a handful of normal ones.

use std::collections::VecDeque;

use tracing::debug;

/// Latencies kept for the uniformity check.
pub const HISTORY_LEN: usize = 5;
/// Number of most recent latencies whose spread is checked.
pub const UNIFORMITY_WINDOW: usize = 3;
/// Standard deviation (ms) below which timing is considered uniform.
pub const UNIFORMITY_THRESHOLD_MS: f32 = 0.5;
/// Added for a decision faster than the minimum thinking time.
pub const FAST_DECISION_PENALTY: f32 = 0.1;
/// Added when the last latencies are suspiciously uniform.
pub const UNIFORM_TIMING_PENALTY: f32 = 0.05;
/// Applied to the score after every record.
pub const DECAY_FACTOR: f32 = 0.1;

/// Rolling timing statistic of one agent.
#[derive(Debug, Clone)]
pub struct FraudMonitor {
    enabled: bool,
    min_thinking_time_ms: f32,
    fraud_score: f32,
    history: VecDeque<f32>,
}

impl FraudMonitor {
    /// Monitor flagging decisions faster than `min_thinking_time_ms`.
    pub fn new(min_thinking_time_ms: f32, enabled: bool) -> Self {
        FraudMonitor {
            enabled,
            min_thinking_time_ms,
            fraud_score: 0.0,
            history: VecDeque::with_capacity(HISTORY_LEN),
        }
    }

    /// Records one decision latency and updates the score.
    pub fn record(&mut self, duration_ms: f32) {
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(duration_ms);

        if !self.enabled {
            return;
        }

        let mut score = self.fraud_score;
        if duration_ms < self.min_thinking_time_ms {
            score += FAST_DECISION_PENALTY;
        }
        if let Some(std_dev) = self.recent_std_dev() {
            if std_dev < UNIFORMITY_THRESHOLD_MS {
                score += UNIFORM_TIMING_PENALTY;
            }
        }
        if score > self.fraud_score {
            debug!(duration_ms, score, "suspicious decision timing");
        }
        self.fraud_score = (score * DECAY_FACTOR).max(0.0);
    }

    /// Current anomaly score, always `>= 0`.
    pub fn score(&self) -> f32 {
        self.fraud_score
    }

    /// Latencies kept by the monitor, oldest first.
    pub fn recent_latencies(&self) -> impl Iterator<Item = f32> + '_ {
        self.history.iter().copied()
    }

    /// Whether scoring is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn recent_std_dev(&self) -> Option<f32> {
        let n = self.history.len();
        if n < UNIFORMITY_WINDOW {
            return None;
        }
        let window = self.history.range(n - UNIFORMITY_WINDOW..);
        let mean = window.clone().sum::<f32>() / UNIFORMITY_WINDOW as f32;
        let variance =
            window.map(|d| (d - mean).powi(2)).sum::<f32>() / UNIFORMITY_WINDOW as f32;
        Some(variance.sqrt())
    }
}
