//! Synthetic positions and move lists.
//!
//! The real rules engine is an external collaborator, so batch runs and tests need a stand-in.
//! [`ScenarioGenerator`] scatters pieces of both sides on the board and lists, for the side to
//! move, every orthogonal step to a square not held by one of its own pieces. Stepping onto an
//! opposing piece is a capture. The lists are structurally valid, not rule-accurate.

use std::collections::HashSet;

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::types::{Coordinate, Move, Piece, PieceKind, Position, Side, BOARD_SIZE};

/// One decision problem: a position and the legal moves of the side to move.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Board.
    pub position: Position,
    /// Candidates for `side`.
    pub legal_moves: Vec<Move>,
    /// Side to move.
    pub side: Side,
}

/// Seeded source of [`Scenario`]s.
pub struct ScenarioGenerator {
    rng: StdRng,
    pieces_per_side: usize,
}

impl ScenarioGenerator {
    /// Generator placing `pieces_per_side` pieces for each side (capped to fit the board).
    pub fn new(seed: u64, pieces_per_side: usize) -> Self {
        let max = (BOARD_SIZE as usize * BOARD_SIZE as usize) / 2;
        ScenarioGenerator {
            rng: StdRng::seed_from_u64(seed),
            pieces_per_side: pieces_per_side.clamp(1, max),
        }
    }

    /// Random position for `side` to move in.
    pub fn generate(&mut self, side: Side) -> Scenario {
        let mut squares: Vec<Coordinate> = (0..BOARD_SIZE)
            .flat_map(|row| (0..BOARD_SIZE).map(move |col| Coordinate::new(row, col)))
            .collect();
        squares.shuffle(&mut self.rng);

        let n = self.pieces_per_side;
        let own = self.place(&squares[..n]);
        let theirs = self.place(&squares[n..2 * n]);
        let legal_moves = Self::steps(&own, &theirs);

        Scenario {
            position: Position::new()
                .with_pieces(side, own)
                .with_pieces(side.opponent(), theirs),
            legal_moves,
            side,
        }
    }

    /// A scenario with at least `min_moves` candidates.
    pub fn generate_with_moves(&mut self, side: Side, min_moves: usize) -> Scenario {
        loop {
            let scenario = self.generate(side);
            if scenario.legal_moves.len() >= min_moves {
                return scenario;
            }
        }
    }

    fn place(&mut self, squares: &[Coordinate]) -> Vec<Piece> {
        squares
            .iter()
            .map(|c| Piece {
                kind: PieceKind::ALL[self.rng.gen_range(0..PieceKind::ALL.len())],
                coordinate: *c,
            })
            .collect()
    }

    fn steps(own: &[Piece], theirs: &[Piece]) -> Vec<Move> {
        let occupied: HashSet<Coordinate> = own.iter().map(|p| p.coordinate).collect();
        let mut moves = Vec::new();
        for piece in own {
            let c = piece.coordinate;
            let targets = [
                (c.row.checked_sub(1), Some(c.col)),
                (Some(c.row + 1), Some(c.col)),
                (Some(c.row), c.col.checked_sub(1)),
                (Some(c.row), Some(c.col + 1)),
            ];
            for (row, col) in targets {
                let (Some(row), Some(col)) = (row, col) else {
                    continue;
                };
                let to = Coordinate::new(row, col);
                if !to.is_on_board() || occupied.contains(&to) {
                    continue;
                }
                let mv = match theirs.iter().find(|p| p.coordinate == to) {
                    Some(victim) => Move::capture(piece.kind, c, to, victim.kind),
                    None => Move::quiet(piece.kind, c, to),
                };
                moves.push(mv);
            }
        }
        moves
    }
}
