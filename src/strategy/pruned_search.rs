use std::time::{Duration, Instant};

use tracing::trace;

use super::{capture_ordered, first_move, BestSoFar, Budget};
use crate::agent::{millis, AgentConfig};
use crate::error::Result;
use crate::evaluation::PositionEvaluator;
use crate::types::{Move, Personality, Position, Side};

/// Capture-ordered one-ply search with a running alpha bound.
///
/// Candidates are visited in descending capture value, each scored by evaluating the successor
/// position plus a personality-weighted capture bonus. The loop stops as soon as the target move
/// time is spent; whatever was scored by then is the answer.
#[derive(Debug, Clone)]
pub struct PrunedSearch {
    evaluator: PositionEvaluator,
    personality: Personality,
    aggression: f32,
    target: Duration,
}

impl PrunedSearch {
    /// Search tuned by the agent's personality, aggression and target move time.
    pub fn new(config: &AgentConfig) -> Self {
        PrunedSearch {
            evaluator: PositionEvaluator::new(),
            personality: config.personality,
            aggression: config.aggression,
            target: millis(config.target_move_time_ms, Duration::ZERO),
        }
    }

    pub(crate) fn select<'m>(
        &self,
        position: &Position,
        side: Side,
        legal_moves: &'m [Move],
        deadline: Instant,
    ) -> Result<&'m Move> {
        first_move(legal_moves)?;
        let budget = Budget::new(self.target, deadline);
        let ordered = capture_ordered(legal_moves);

        let mut alpha = f32::NEG_INFINITY;
        let mut best = BestSoFar::new();
        let mut scored = 0;
        for mv in ordered.iter().copied() {
            if budget.exhausted() {
                trace!(scored, "pruned search out of time");
                break;
            }
            let score = self.score(position, side, mv);
            scored += 1;
            if score > alpha {
                alpha = score;
                best.offer(mv, score);
            }
        }

        Ok(best.or(ordered[0]))
    }

    fn score(&self, position: &Position, side: Side, mv: &Move) -> f32 {
        let successor = position.apply(mv, side);
        let bonus =
            mv.capture_value() * (0.5 + self.aggression) * self.personality.capture_multiplier();
        self.evaluator.evaluate(&successor, side) + bonus
    }
}
