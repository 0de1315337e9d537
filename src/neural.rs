//! Pluggable scoring capability used by the hybrid strategy.
//!
//! Weight loading and inference live outside this crate. Callers wrap their model in a type
//! implementing [`NeuralEvaluator`] and hand it to the agent pool at construction time. When no
//! model is supplied, [`UnavailableEvaluator`] is used and the hybrid strategy falls back to the
//! static [`PositionEvaluator`](crate::evaluation::PositionEvaluator).

use crate::error::{EngineError, Result};
use crate::types::{Position, Side};

/// A learned position scorer.
///
/// Implementations must be cheap enough to be called a few times within a 20ms budget and must
/// not block on I/O.
pub trait NeuralEvaluator: Send + Sync {
    /// Score of `position` from `perspective`, on the same scale as the static evaluator.
    fn score(&self, position: &Position, perspective: Side) -> Result<f32>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "neural"
    }
}

/// Default capability: always reports itself unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableEvaluator;

impl NeuralEvaluator for UnavailableEvaluator {
    fn score(&self, _position: &Position, _perspective: Side) -> Result<f32> {
        Err(EngineError::EvaluatorUnavailable(
            "no neural evaluator configured".to_owned(),
        ))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}
