//! Decision strategies.
//!
//! Every agent owns exactly one [`DecisionStrategy`]. The set of strategies is closed: an enum
//! dispatches to the four variants, so adding a strategy means touching every `match` below.
//!
//! # Provided Strategies
//! - [`BiasedRandom`]: capture-biased uniform choice, no search.
//! - [`PrunedSearch`]: capture-ordered one-ply search with a running alpha bound.
//! - [`BudgetedRollout`]: scores successors until an 80ms buffer is spent.
//! - [`HybridEvaluatorSearch`]: like the rollout, but scored by a [`NeuralEvaluator`] on a
//!   handful of candidates only.
//!
//! All strategies share one contract: the returned move is one of `legal_moves`, an empty list
//! yields `None`, and running out of time degrades to the best move seen so far (or the first
//! candidate) instead of failing.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::trace;

use crate::agent::AgentConfig;
use crate::error::{EngineError, Result};
use crate::neural::NeuralEvaluator;
use crate::types::{Difficulty, Move, Position, Side};

mod hybrid;
mod pruned_search;
mod random;
mod rollout;

pub use hybrid::HybridEvaluatorSearch;
pub use pruned_search::PrunedSearch;
pub use random::BiasedRandom;
pub use rollout::BudgetedRollout;

/// One of the four move-selection algorithms.
pub enum DecisionStrategy {
    /// See [`BiasedRandom`].
    BiasedRandom(BiasedRandom),
    /// See [`PrunedSearch`].
    PrunedSearch(PrunedSearch),
    /// See [`BudgetedRollout`].
    BudgetedRollout(BudgetedRollout),
    /// See [`HybridEvaluatorSearch`].
    HybridEvaluatorSearch(HybridEvaluatorSearch),
}

impl DecisionStrategy {
    /// Picks the strategy matching `difficulty`.
    ///
    /// Hard agents use the hybrid search when a neural evaluator is supplied and the budgeted
    /// rollout otherwise.
    pub fn for_agent(
        difficulty: Difficulty,
        config: &AgentConfig,
        neural: Option<Arc<dyn NeuralEvaluator>>,
    ) -> Self {
        match (difficulty, neural) {
            (Difficulty::Easy, _) => {
                DecisionStrategy::BiasedRandom(BiasedRandom::new(config.personality))
            }
            (Difficulty::Medium, _) => DecisionStrategy::PrunedSearch(PrunedSearch::new(config)),
            (Difficulty::Hard, None) => {
                DecisionStrategy::BudgetedRollout(BudgetedRollout::new(config))
            }
            (Difficulty::Hard, Some(neural)) => DecisionStrategy::HybridEvaluatorSearch(
                HybridEvaluatorSearch::new(config, neural),
            ),
        }
    }

    /// Selects one of `legal_moves` for `side`, returning by `deadline` at the latest.
    ///
    /// Returns `None` only when `legal_moves` is empty.
    pub fn select_move(
        &mut self,
        position: &Position,
        side: Side,
        legal_moves: &[Move],
        deadline: Instant,
    ) -> Option<Move> {
        let result = match self {
            DecisionStrategy::BiasedRandom(s) => s.select(legal_moves),
            DecisionStrategy::PrunedSearch(s) => s.select(position, side, legal_moves, deadline),
            DecisionStrategy::BudgetedRollout(s) => {
                s.select(position, side, legal_moves, deadline)
            }
            DecisionStrategy::HybridEvaluatorSearch(s) => {
                s.select(position, side, legal_moves, deadline)
            }
        };

        match result {
            Ok(mv) => Some(*mv),
            Err(e) => {
                trace!(strategy = self.name(), "no move: {e}");
                None
            }
        }
    }

    /// Name used in logs and telemetry.
    pub fn name(&self) -> &'static str {
        match self {
            DecisionStrategy::BiasedRandom(_) => "biased-random",
            DecisionStrategy::PrunedSearch(_) => "pruned-search",
            DecisionStrategy::BudgetedRollout(_) => "budgeted-rollout",
            DecisionStrategy::HybridEvaluatorSearch(_) => "hybrid-evaluator",
        }
    }
}

impl std::fmt::Debug for DecisionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Wall-clock budget of one decision: a soft limit relative to the start, capped by a deadline.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Budget {
    start: Instant,
    soft_limit: Duration,
    deadline: Instant,
}

impl Budget {
    pub(crate) fn new(soft_limit: Duration, deadline: Instant) -> Self {
        Budget {
            start: Instant::now(),
            soft_limit,
            deadline,
        }
    }

    pub(crate) fn exhausted(&self) -> bool {
        let now = Instant::now();
        now >= self.deadline || now.duration_since(self.start) > self.soft_limit
    }
}

fn first_move(legal_moves: &[Move]) -> Result<&Move> {
    legal_moves.first().ok_or(EngineError::EmptyLegalMoveSet)
}

/// Moves ordered by captured value, highest first. Ties keep their input order.
fn capture_ordered(legal_moves: &[Move]) -> Vec<&Move> {
    let mut ordered: Vec<&Move> = legal_moves.iter().collect();
    ordered.sort_by(|a, b| b.capture_value().total_cmp(&a.capture_value()));
    ordered
}

/// Keeps the highest-scoring move; the first candidate wins ties.
#[derive(Debug)]
struct BestSoFar<'a> {
    best: Option<(&'a Move, f32)>,
}

impl<'a> BestSoFar<'a> {
    fn new() -> Self {
        BestSoFar { best: None }
    }

    fn offer(&mut self, mv: &'a Move, score: f32) {
        match self.best {
            Some((_, best)) if score <= best => {}
            _ => self.best = Some((mv, score)),
        }
    }

    fn or(self, fallback: &'a Move) -> &'a Move {
        self.best.map(|(mv, _)| mv).unwrap_or(fallback)
    }
}
