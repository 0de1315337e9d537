use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::{debug, trace};

use super::{capture_ordered, first_move, BestSoFar, Budget};
use crate::agent::AgentConfig;
use crate::error::Result;
use crate::evaluation::PositionEvaluator;
use crate::neural::NeuralEvaluator;
use crate::types::{Move, Personality, Position, Side};

/// Above this many candidates the search is skipped for a capture-first pick.
pub const MAX_SEARCHED_MOVES: usize = 6;
/// Number of capture-ordered candidates actually scored.
pub const TOP_K: usize = 3;
/// Time allowed to score the top candidates.
pub const SUB_BUDGET: Duration = Duration::from_millis(20);

/// Rollout-shaped search scored by an injected [`NeuralEvaluator`].
///
/// Whenever the neural evaluator fails, the static [`PositionEvaluator`] scores that candidate
/// instead.
pub struct HybridEvaluatorSearch {
    neural: Arc<dyn NeuralEvaluator>,
    fallback: PositionEvaluator,
    personality: Personality,
}

impl HybridEvaluatorSearch {
    /// Hybrid search using `neural` as its primary scorer.
    pub fn new(config: &AgentConfig, neural: Arc<dyn NeuralEvaluator>) -> Self {
        HybridEvaluatorSearch {
            neural,
            fallback: PositionEvaluator::new(),
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
        let first = first_move(legal_moves)?;
        if legal_moves.len() == 1 {
            return Ok(first);
        }

        let ordered = capture_ordered(legal_moves);
        if legal_moves.len() > MAX_SEARCHED_MOVES {
            trace!(moves = legal_moves.len(), "too many candidates, capture-first pick");
            return Ok(ordered[0]);
        }

        let budget = Budget::new(SUB_BUDGET, deadline);
        let mut best = BestSoFar::new();
        for mv in ordered.iter().take(TOP_K).copied() {
            if budget.exhausted() {
                break;
            }
            best.offer(mv, self.score(position, side, mv));
        }
        Ok(best.or(ordered[0]))
    }

    fn score(&self, position: &Position, side: Side, mv: &Move) -> f32 {
        let successor = position.apply(mv, side);
        let base = match self.neural.score(&successor, side) {
            Ok(score) if score.is_finite() => score,
            Ok(score) => {
                debug!(evaluator = self.neural.name(), score, "non-finite score, using static evaluation");
                self.fallback.evaluate(&successor, side)
            }
            Err(e) => {
                debug!(evaluator = self.neural.name(), "{e}, using static evaluation");
                self.fallback.evaluate(&successor, side)
            }
        };
        base + mv.capture_value() * self.personality.capture_multiplier()
    }
}

#[cfg(test)]
mod hybrid_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::neural::UnavailableEvaluator;
    use crate::types::{Coordinate, Difficulty, PieceKind};

    struct CountingEvaluator {
        calls: AtomicUsize,
    }

    impl NeuralEvaluator for CountingEvaluator {
        fn score(&self, _position: &Position, _perspective: Side) -> Result<f32> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(0.0)
        }
    }

    fn quiet_moves(n: u8) -> Vec<Move> {
        (0..n)
            .map(|col| Move::quiet(PieceKind::Private, Coordinate::new(6, col), Coordinate::new(5, col)))
            .collect()
    }

    fn search(neural: Arc<dyn NeuralEvaluator>) -> HybridEvaluatorSearch {
        let config = AgentConfig::for_agent(Difficulty::Hard, Personality::Balanced, 1.0);
        HybridEvaluatorSearch::new(&config, neural)
    }

    #[test]
    fn scores_only_top_k_candidates() {
        let neural = Arc::new(CountingEvaluator {
            calls: AtomicUsize::new(0),
        });
        let hybrid = search(neural.clone());
        let moves = quiet_moves(5);
        let deadline = Instant::now() + Duration::from_millis(100);
        hybrid.select(&Position::new(), Side::One, &moves, deadline).unwrap();
        assert_eq!(neural.calls.load(Ordering::Relaxed), TOP_K);
    }

    #[test]
    fn short_circuits_skip_the_evaluator() {
        let neural = Arc::new(CountingEvaluator {
            calls: AtomicUsize::new(0),
        });
        let hybrid = search(neural.clone());
        let deadline = Instant::now() + Duration::from_millis(100);

        let single = quiet_moves(1);
        assert_eq!(
            hybrid.select(&Position::new(), Side::One, &single, deadline).unwrap(),
            &single[0]
        );

        let mut many = quiet_moves(8);
        many.push(Move::capture(
            PieceKind::Private,
            Coordinate::new(6, 8),
            Coordinate::new(5, 8),
            PieceKind::Colonel,
        ));
        assert!(hybrid
            .select(&Position::new(), Side::One, &many, deadline)
            .unwrap()
            .is_capture);
        assert_eq!(neural.calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn unavailable_evaluator_falls_back_to_static_scoring() {
        let hybrid = search(Arc::new(UnavailableEvaluator));
        let moves = quiet_moves(3);
        let deadline = Instant::now() + Duration::from_millis(100);
        let chosen = hybrid.select(&Position::new(), Side::Two, &moves, deadline).unwrap();
        assert!(moves.contains(chosen));
    }
}
