use std::time::{Duration, Instant};

use tracing::trace;

use super::{first_move, BestSoFar, Budget};
use crate::agent::AgentConfig;
use crate::error::Result;
use crate::evaluation::PositionEvaluator;
use crate::types::{Move, Personality, Position, Side};

/// Time spent scoring candidates before the rollout settles, leaving a margin under the 100ms
/// real-time limit.
pub const ROLLOUT_BUFFER: Duration = Duration::from_millis(80);

/// Time-boxed rollout: one simulated outcome per candidate, in input order.
#[derive(Debug, Clone)]
pub struct BudgetedRollout {
    evaluator: PositionEvaluator,
    personality: Personality,
}

impl BudgetedRollout {
    /// Rollout weighted by the agent's personality.
    pub fn new(config: &AgentConfig) -> Self {
        BudgetedRollout {
            evaluator: PositionEvaluator::new(),
            personality: config.personality,
        }
    }

    pub(crate) fn select<'m>(
        &self,
        position: &Position,
        side: Side,
        legal_moves: &'m [Move],
        deadline: Instant,
    ) -> Result<&'m Move> {
        let fallback = first_move(legal_moves)?;
        let budget = Budget::new(ROLLOUT_BUFFER, deadline);

        let mut best = BestSoFar::new();
        for (i, mv) in legal_moves.iter().enumerate() {
            if budget.exhausted() {
                trace!(scored = i, "rollout buffer spent");
                break;
            }
            best.offer(mv, self.simulate(position, side, mv));
        }
        Ok(best.or(fallback))
    }

    fn simulate(&self, position: &Position, side: Side, mv: &Move) -> f32 {
        let outcome = self.evaluator.evaluate(&position.apply(mv, side), side);
        outcome + mv.capture_value() * self.personality.capture_multiplier()
    }
}
