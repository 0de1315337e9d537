use std::{
    fmt::Display,
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::warn;

use crate::configuration::REALTIME_LIMIT_MS;
use crate::fraud_monitor::FraudMonitor;
use crate::neural::NeuralEvaluator;
use crate::strategy::DecisionStrategy;
use crate::types::{AgentSpec, Difficulty, Move, Personality, Position, Side};

/// Unique id of a pooled agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub u64);

impl Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

/// Immutable tuning of one agent. Changing personality means building a new agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentConfig {
    /// Behavioural bias.
    pub personality: Personality,
    /// 1 (weakest) to 10.
    pub skill_level: u8,
    /// Nominal search depth; the searches are single-ply.
    pub search_depth: u8,
    /// Weight of capture bonuses, `0..=1`.
    pub aggression: f32,
    /// `0..=1`.
    pub risk_tolerance: f32,
    /// Hard per-move limit; exceeding it is an SLA violation.
    pub max_move_time_ms: f32,
    /// Soft limit the searches aim for.
    pub target_move_time_ms: f32,
    /// Decisions faster than this look automated.
    pub min_thinking_time_ms: f32,
    /// Whether the fraud monitor scores decisions.
    pub fraud_detection_enabled: bool,
}

impl AgentConfig {
    /// Standard tuning for a difficulty/personality pair.
    pub fn for_agent(
        difficulty: Difficulty,
        personality: Personality,
        min_thinking_time_ms: f32,
    ) -> Self {
        let (skill_level, search_depth, target_move_time_ms, max_move_time_ms) = match difficulty {
            Difficulty::Easy => (3, 1, 10.0, 50.0),
            Difficulty::Medium => (6, 2, 50.0, 90.0),
            Difficulty::Hard => (9, 3, 80.0, 100.0),
        };
        let (aggression, risk_tolerance) = match personality {
            Personality::Aggressive => (0.8, 0.7),
            Personality::Balanced => (0.5, 0.5),
            Personality::Defensive => (0.2, 0.3),
        };
        AgentConfig {
            personality,
            skill_level,
            search_depth,
            aggression,
            risk_tolerance,
            max_move_time_ms,
            target_move_time_ms,
            min_thinking_time_ms,
            fraud_detection_enabled: true,
        }
        .normalized()
    }

    /// Caps every move at `timeout_ms`, keeping the target under the cap.
    pub fn with_move_timeout(mut self, timeout_ms: f32) -> Self {
        self.max_move_time_ms = self.max_move_time_ms.min(timeout_ms);
        self.normalized()
    }

    /// Enables or disables timing anomaly scoring.
    pub fn with_fraud_detection(mut self, enabled: bool) -> Self {
        self.fraud_detection_enabled = enabled;
        self
    }

    /// Clamps every field into range. Non-finite times fall back to the real-time limit.
    pub fn normalized(mut self) -> Self {
        self.skill_level = self.skill_level.clamp(1, 10);
        self.aggression = finite_or(self.aggression, 0.5).clamp(0.0, 1.0);
        self.risk_tolerance = finite_or(self.risk_tolerance, 0.5).clamp(0.0, 1.0);
        self.max_move_time_ms = finite_or(self.max_move_time_ms, REALTIME_LIMIT_MS).max(1.0);
        self.target_move_time_ms = finite_or(self.target_move_time_ms, self.max_move_time_ms)
            .clamp(0.0, self.max_move_time_ms);
        self.min_thinking_time_ms = finite_or(self.min_thinking_time_ms, 0.0).max(0.0);
        self
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// `ms` as a [`Duration`]; negative, NaN or overflowing values give `fallback`.
pub(crate) fn millis(ms: f32, fallback: Duration) -> Duration {
    Duration::try_from_secs_f32(ms / 1000.0).unwrap_or(fallback)
}

/// Cumulative results of one agent over its lifetime in the pool.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerformanceCounters {
    /// Finished matches.
    pub games_played: u32,
    /// Matches won.
    pub wins: u32,
    /// Matches lost.
    pub losses: u32,
    /// Matches drawn.
    pub draws: u32,
    /// Moves produced.
    pub moves_total: u64,
    /// Time spent producing them.
    pub time_total_ms: f64,
    /// Decisions slower than `max_move_time_ms`.
    pub sla_violations: u64,
}

impl PerformanceCounters {
    /// Mean decision time, 0 before the first move.
    pub fn average_move_time_ms(&self) -> f64 {
        if self.moves_total == 0 {
            0.0
        } else {
            self.time_total_ms / self.moves_total as f64
        }
    }
}

/// Outcome of a single decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    /// Chosen move, `None` when no legal move was offered.
    pub mv: Option<Move>,
    /// Wall-clock time of the decision.
    pub latency_ms: f32,
    /// Fraud score right after recording this decision.
    pub fraud_score: f32,
}

/// A pooled agent: strategy, tuning, timing monitor and counters.
///
/// Handles are moved out of the pool on checkout and owned by exactly one match until they are
/// checked back in, which is what keeps the monitor and counters single-writer.
#[derive(Debug)]
pub struct AgentHandle {
    id: AgentId,
    spec: AgentSpec,
    config: AgentConfig,
    strategy: DecisionStrategy,
    monitor: FraudMonitor,
    counters: PerformanceCounters,
}

impl AgentHandle {
    /// Builds an agent and its strategy.
    pub fn new(
        id: AgentId,
        spec: AgentSpec,
        config: AgentConfig,
        neural: Option<Arc<dyn NeuralEvaluator>>,
    ) -> Self {
        AgentHandle {
            id,
            spec,
            strategy: DecisionStrategy::for_agent(spec.difficulty, &config, neural),
            monitor: FraudMonitor::new(config.min_thinking_time_ms, config.fraud_detection_enabled),
            config,
            counters: PerformanceCounters::default(),
        }
    }

    /// Builds an agent around an explicit strategy, e.g. a seeded one.
    pub fn with_strategy(
        id: AgentId,
        spec: AgentSpec,
        config: AgentConfig,
        strategy: DecisionStrategy,
    ) -> Self {
        AgentHandle {
            id,
            spec,
            strategy,
            monitor: FraudMonitor::new(config.min_thinking_time_ms, config.fraud_detection_enabled),
            config,
            counters: PerformanceCounters::default(),
        }
    }

    /// Chooses a move for `side` within the agent's `max_move_time_ms`.
    ///
    /// The decision is always timed and recorded by the fraud monitor, including the empty-list
    /// case. Going over the time limit is logged and counted but the move is kept.
    pub fn decide(&mut self, position: &Position, side: Side, legal_moves: &[Move]) -> Decision {
        let start = Instant::now();
        let fallback = Duration::from_millis(REALTIME_LIMIT_MS as u64);
        let deadline = start
            .checked_add(millis(self.config.max_move_time_ms, fallback))
            .unwrap_or(start + fallback);

        let mv = self
            .strategy
            .select_move(position, side, legal_moves, deadline);

        let latency_ms = start.elapsed().as_secs_f32() * 1000.0;
        self.monitor.record(latency_ms);

        if mv.is_some() {
            self.counters.moves_total += 1;
            self.counters.time_total_ms += latency_ms as f64;
        }
        if latency_ms > self.config.max_move_time_ms {
            self.counters.sla_violations += 1;
            warn!(
                agent = %self.id,
                strategy = self.strategy.name(),
                latency_ms,
                limit_ms = self.config.max_move_time_ms,
                "move time limit exceeded"
            );
        }

        Decision {
            mv,
            latency_ms,
            fraud_score: self.monitor.score(),
        }
    }

    pub(crate) fn record_result(&mut self, outcome: GameOutcome) {
        self.counters.games_played += 1;
        match outcome {
            GameOutcome::Win => self.counters.wins += 1,
            GameOutcome::Loss => self.counters.losses += 1,
            GameOutcome::Draw => self.counters.draws += 1,
        }
    }

    /// Pool-wide id.
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Pool key of the agent.
    pub fn spec(&self) -> AgentSpec {
        self.spec
    }

    /// Tuning.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Name of the decision strategy.
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Current fraud score.
    pub fn fraud_score(&self) -> f32 {
        self.monitor.score()
    }

    /// Timing monitor.
    pub fn monitor(&self) -> &FraudMonitor {
        &self.monitor
    }

    /// Lifetime counters.
    pub fn counters(&self) -> &PerformanceCounters {
        &self.counters
    }
}

/// Result of a finished game from one agent's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GameOutcome {
    Win,
    Loss,
    Draw,
}

#[cfg(test)]
mod agent_tests {
    use super::*;
    use crate::strategy::BiasedRandom;
    use crate::types::{Coordinate, PieceKind};

    #[test]
    fn config_is_clamped_and_capped() {
        let config = AgentConfig::for_agent(Difficulty::Hard, Personality::Aggressive, -3.0)
            .with_move_timeout(60.0);
        assert_eq!(config.max_move_time_ms, 60.0);
        assert_eq!(config.target_move_time_ms, 60.0);
        assert_eq!(config.min_thinking_time_ms, 0.0);
        assert!((0.0..=1.0).contains(&config.aggression));
    }

    #[test]
    fn decisions_are_timed_and_counted() {
        let spec = AgentSpec::new(Difficulty::Easy, Personality::Balanced);
        let config = AgentConfig::for_agent(spec.difficulty, spec.personality, 5.0);
        let strategy =
            DecisionStrategy::BiasedRandom(BiasedRandom::with_seed(Personality::Balanced, 3));
        let mut agent = AgentHandle::with_strategy(AgentId(1), spec, config, strategy);

        let moves = [Move::quiet(
            PieceKind::Spy,
            Coordinate::new(0, 0),
            Coordinate::new(0, 1),
        )];
        let decision = agent.decide(&Position::new(), Side::One, &moves);
        assert_eq!(decision.mv, Some(moves[0]));
        assert_eq!(agent.counters().moves_total, 1);
        // a random pick is far below 5ms of thinking
        assert!(decision.fraud_score > 0.0);
        assert_eq!(agent.monitor().recent_latencies().count(), 1);

        let none = agent.decide(&Position::new(), Side::One, &[]);
        assert_eq!(none.mv, None);
        assert_eq!(agent.counters().moves_total, 1);
        assert_eq!(agent.monitor().recent_latencies().count(), 2);
    }

    fn quiet(col: u8) -> Move {
        Move::quiet(PieceKind::Spy, Coordinate::new(0, col), Coordinate::new(1, col))
    }

    #[test]
    fn unnormalized_times_do_not_panic() {
        let spec = AgentSpec::new(Difficulty::Easy, Personality::Balanced);
        let mut config = AgentConfig::for_agent(spec.difficulty, spec.personality, 5.0);
        config.max_move_time_ms = f32::INFINITY;
        let mut agent = AgentHandle::new(AgentId(1), spec, config, None);
        let moves = [quiet(0), quiet(1)];
        let decision = agent.decide(&Position::new(), Side::One, &moves);
        assert!(moves.contains(&decision.mv.unwrap()));

        config.max_move_time_ms = f32::MAX;
        let mut agent = AgentHandle::new(AgentId(3), spec, config, None);
        assert!(agent.decide(&Position::new(), Side::One, &moves).mv.is_some());
        assert_eq!(agent.counters().sla_violations, 0);

        let spec = AgentSpec::new(Difficulty::Medium, Personality::Defensive);
        let mut config = AgentConfig::for_agent(spec.difficulty, spec.personality, 5.0);
        config.target_move_time_ms = -1.0;
        config.max_move_time_ms = f32::NAN;
        let mut agent = AgentHandle::new(AgentId(2), spec, config, None);
        let decision = agent.decide(&Position::new(), Side::Two, &moves);
        assert!(moves.contains(&decision.mv.unwrap()));
    }

    #[test]
    fn normalized_makes_times_finite() {
        let mut config = AgentConfig::for_agent(Difficulty::Hard, Personality::Balanced, 5.0);
        config.max_move_time_ms = f32::NAN;
        config.target_move_time_ms = f32::NEG_INFINITY;
        config.min_thinking_time_ms = f32::INFINITY;
        let config = config.normalized();
        assert_eq!(config.max_move_time_ms, REALTIME_LIMIT_MS);
        assert_eq!(config.target_move_time_ms, REALTIME_LIMIT_MS);
        assert_eq!(config.min_thinking_time_ms, 0.0);

        let mut config = config;
        config.target_move_time_ms = -4.0;
        assert_eq!(config.normalized().target_move_time_ms, 0.0);
    }

    #[test]
    fn millis_falls_back_on_bad_input() {
        let fallback = Duration::from_millis(7);
        assert_eq!(millis(500.0, fallback), Duration::from_millis(500));
        assert_eq!(millis(-1.0, fallback), fallback);
        assert_eq!(millis(f32::NAN, fallback), fallback);
        assert_eq!(millis(f32::INFINITY, fallback), fallback);
    }

    #[test]
    fn results_update_counters() {
        let spec = AgentSpec::new(Difficulty::Medium, Personality::Defensive);
        let config = AgentConfig::for_agent(spec.difficulty, spec.personality, 1.0);
        let mut agent = AgentHandle::new(AgentId(9), spec, config, None);
        agent.record_result(GameOutcome::Win);
        agent.record_result(GameOutcome::Draw);
        let c = agent.counters();
        assert_eq!((c.games_played, c.wins, c.draws, c.losses), (2, 1, 1, 0));
        assert_eq!(agent.strategy_name(), "pruned-search");
    }
}
