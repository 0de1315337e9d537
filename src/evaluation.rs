//! Static position evaluation: material plus a center-weighted positional bonus.

use tracing::warn;

use crate::error::Result;
use crate::types::{Position, Side, BOARD_SIZE};

/// Added to a non-empty position whose raw score is exactly zero.
pub const ZERO_PLATEAU_BIAS: f32 = 10.0;

// Center-weighted: 0 on the rim, 20 in the middle.
const POSITIONAL_TABLE: [[f32; BOARD_SIZE as usize]; BOARD_SIZE as usize] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [0.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 0.0],
    [0.0, 5.0, 10.0, 10.0, 10.0, 10.0, 10.0, 5.0, 0.0],
    [0.0, 5.0, 10.0, 15.0, 15.0, 15.0, 10.0, 5.0, 0.0],
    [0.0, 5.0, 10.0, 15.0, 20.0, 15.0, 10.0, 5.0, 0.0],
    [0.0, 5.0, 10.0, 15.0, 15.0, 15.0, 10.0, 5.0, 0.0],
    [0.0, 5.0, 10.0, 10.0, 10.0, 10.0, 10.0, 5.0, 0.0],
    [0.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 0.0],
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
];

/// Stateless material + positional evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionEvaluator;

impl PositionEvaluator {
    /// Creates the evaluator.
    pub fn new() -> Self {
        PositionEvaluator
    }

    /// Score of `position` seen from `perspective`. Positive is good for `perspective`.
    ///
    /// Never fails: a malformed position scores 0 and is logged.
    pub fn evaluate(&self, position: &Position, perspective: Side) -> f32 {
        match self.try_evaluate(position, perspective) {
            Ok(score) => score,
            Err(e) => {
                warn!("evaluation fell back to 0: {e}");
                0.0
            }
        }
    }

    /// Same as [`evaluate`](Self::evaluate), but reports malformed positions.
    pub fn try_evaluate(&self, position: &Position, perspective: Side) -> Result<f32> {
        position.validate()?;

        let mut score = 0.0;
        for (side, piece) in position.iter() {
            let c = piece.coordinate;
            let value =
                piece.kind.value() + POSITIONAL_TABLE[c.row as usize][c.col as usize];
            if side == perspective {
                score += value;
            } else {
                score -= value;
            }
        }

        if score == 0.0 && position.piece_count() > 0 {
            score += ZERO_PLATEAU_BIAS;
        }
        Ok(score)
    }
}

#[cfg(test)]
mod evaluation_tests {
    use super::*;
    use crate::types::{Piece, PieceKind};

    #[test]
    fn empty_position_is_zero() {
        assert_eq!(PositionEvaluator.evaluate(&Position::new(), Side::One), 0.0);
    }

    #[test]
    fn material_and_center_bonus() {
        let position = Position::new()
            .with_pieces(Side::One, [Piece::new(PieceKind::Marshal, 4, 4)])
            .with_pieces(Side::Two, [Piece::new(PieceKind::Spy, 0, 0)]);
        let eval = PositionEvaluator::new();
        assert_eq!(eval.evaluate(&position, Side::One), 1020.0 - 50.0);
        assert_eq!(eval.evaluate(&position, Side::Two), 50.0 - 1020.0);
    }

    #[test]
    fn symmetric_position_gets_plateau_bias() {
        let position = Position::new()
            .with_pieces(Side::One, [Piece::new(PieceKind::Major, 1, 1)])
            .with_pieces(Side::Two, [Piece::new(PieceKind::Major, 7, 7)]);
        assert_eq!(
            PositionEvaluator.evaluate(&position, Side::One),
            ZERO_PLATEAU_BIAS
        );
    }

    #[test]
    fn malformed_position_scores_zero() {
        let position =
            Position::new().with_pieces(Side::One, [Piece::new(PieceKind::General, 12, 3)]);
        assert!(PositionEvaluator.try_evaluate(&position, Side::One).is_err());
        assert_eq!(PositionEvaluator.evaluate(&position, Side::One), 0.0);
    }
}
