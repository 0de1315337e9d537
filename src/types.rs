//! Board-level types shared by every component: sides, pieces, coordinates, moves and positions.
//!
//! These are deliberately thin. Move legality, piece movement rules and game termination are the
//! business of the external rules engine; the engine only needs enough structure to score a
//! position and to hand back one of the moves it was given.

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use crate::error::EngineError;

/// Width and height of the board.
pub const BOARD_SIZE: u8 = 9;

/// One of the two players of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    /// First player (moves first).
    One,
    /// Second player.
    Two,
}

impl Side {
    /// The other side.
    pub fn opponent(self) -> Side {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }

    /// `1` or `2`, as used in external payloads.
    pub fn number(self) -> u8 {
        match self {
            Side::One => 1,
            Side::Two => 2,
        }
    }

    pub(crate) fn index(self) -> usize {
        self.number() as usize - 1
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "side {}", self.number())
    }
}

/// Piece ranks, from the marshal down to the spy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    /// Highest-value piece.
    Marshal,
    /// General.
    General,
    /// Colonel.
    Colonel,
    /// Major.
    Major,
    /// Captain.
    Captain,
    /// Lieutenant.
    Lieutenant,
    /// Sergeant.
    Sergeant,
    /// Private.
    Private,
    /// Lowest-value piece.
    Spy,
}

impl PieceKind {
    /// Material value used by the evaluator and by capture ordering.
    pub fn value(self) -> f32 {
        match self {
            PieceKind::Marshal => 1000.0,
            PieceKind::General => 800.0,
            PieceKind::Colonel => 600.0,
            PieceKind::Major => 500.0,
            PieceKind::Captain => 400.0,
            PieceKind::Lieutenant => 300.0,
            PieceKind::Sergeant => 200.0,
            PieceKind::Private => 100.0,
            PieceKind::Spy => 50.0,
        }
    }

    /// Every rank, highest first.
    pub const ALL: [PieceKind; 9] = [
        PieceKind::Marshal,
        PieceKind::General,
        PieceKind::Colonel,
        PieceKind::Major,
        PieceKind::Captain,
        PieceKind::Lieutenant,
        PieceKind::Sergeant,
        PieceKind::Private,
        PieceKind::Spy,
    ];
}

/// A square of the board. Row and column are zero based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coordinate {
    /// Row, `0..BOARD_SIZE`.
    pub row: u8,
    /// Column, `0..BOARD_SIZE`.
    pub col: u8,
}

impl Coordinate {
    /// Builds a coordinate without bound checks; see [`Coordinate::is_on_board`].
    pub const fn new(row: u8, col: u8) -> Self {
        Coordinate { row, col }
    }

    /// True when the coordinate lies on the 9x9 board.
    pub fn is_on_board(&self) -> bool {
        self.row < BOARD_SIZE && self.col < BOARD_SIZE
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// A piece standing on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    /// Rank.
    pub kind: PieceKind,
    /// Where it stands.
    pub coordinate: Coordinate,
}

impl Piece {
    /// Shorthand constructor.
    pub fn new(kind: PieceKind, row: u8, col: u8) -> Self {
        Piece {
            kind,
            coordinate: Coordinate::new(row, col),
        }
    }
}

/// A candidate move, produced by the rules engine and never altered by the strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    /// Origin square.
    pub from: Coordinate,
    /// Destination square.
    pub to: Coordinate,
    /// The moving piece.
    pub piece: PieceKind,
    /// True when the destination holds an opposing piece.
    pub is_capture: bool,
    /// Rank of the captured piece, when known.
    pub captured: Option<PieceKind>,
}

impl Move {
    /// A quiet (non-capturing) move.
    pub fn quiet(piece: PieceKind, from: Coordinate, to: Coordinate) -> Self {
        Move {
            from,
            to,
            piece,
            is_capture: false,
            captured: None,
        }
    }

    /// A capturing move.
    pub fn capture(piece: PieceKind, from: Coordinate, to: Coordinate, captured: PieceKind) -> Self {
        Move {
            from,
            to,
            piece,
            is_capture: true,
            captured: Some(captured),
        }
    }

    /// Material won by this move, zero for quiet moves.
    ///
    /// A capture with an unknown victim is worth the cheapest piece.
    pub fn capture_value(&self) -> f32 {
        match (self.is_capture, self.captured) {
            (true, Some(kind)) => kind.value(),
            (true, None) => PieceKind::Spy.value(),
            (false, _) => 0.0,
        }
    }
}

impl Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sep = if self.is_capture { "x" } else { "-" };
        write!(f, "{:?}{}{}{}", self.piece, self.from, sep, self.to)
    }
}

/// Pieces of both sides. Immutable for the duration of a decision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Position {
    pieces: BTreeMap<Side, Vec<Piece>>,
}

impl Position {
    /// An empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `pieces` for `side`, keeping insertion order.
    pub fn with_pieces(mut self, side: Side, pieces: impl IntoIterator<Item = Piece>) -> Self {
        self.pieces.entry(side).or_default().extend(pieces);
        self
    }

    /// Pieces owned by `side`.
    pub fn pieces(&self, side: Side) -> &[Piece] {
        self.pieces.get(&side).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every piece with its owner.
    pub fn iter(&self) -> impl Iterator<Item = (Side, &Piece)> {
        self.pieces
            .iter()
            .flat_map(|(side, pieces)| pieces.iter().map(move |p| (*side, p)))
    }

    /// Total number of pieces on the board.
    pub fn piece_count(&self) -> usize {
        self.pieces.values().map(Vec::len).sum()
    }

    /// Checks that every piece stands on the board.
    pub fn validate(&self) -> Result<(), EngineError> {
        match self.iter().find(|(_, p)| !p.coordinate.is_on_board()) {
            Some((side, piece)) => Err(EngineError::MalformedPosition(format!(
                "{side}: {:?} at {} is off the board",
                piece.kind, piece.coordinate
            ))),
            None => Ok(()),
        }
    }

    /// Successor position after `side` plays `mv`.
    ///
    /// The moving piece is looked up by its origin square; any opposing piece on the destination
    /// is removed. Moves that do not match a piece of `side` leave the board unchanged.
    pub fn apply(&self, mv: &Move, side: Side) -> Position {
        let mut next = self.clone();
        if let Some(own) = next.pieces.get_mut(&side) {
            if let Some(piece) = own.iter_mut().find(|p| p.coordinate == mv.from) {
                piece.coordinate = mv.to;
            }
        }
        if let Some(theirs) = next.pieces.get_mut(&side.opponent()) {
            theirs.retain(|p| p.coordinate != mv.to);
        }
        next
    }
}

/// How hard an agent plays. Picks the decision strategy and its time budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Difficulty {
    /// Biased random play.
    Easy,
    /// One-ply pruned search.
    Medium,
    /// Time-boxed rollout (or hybrid evaluator) search.
    Hard,
}

impl Difficulty {
    /// Every difficulty.
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
}

impl FromStr for Difficulty {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(EngineError::InvalidAgentSpec(format!(
                "unknown difficulty '{other}'"
            ))),
        }
    }
}

impl Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        f.write_str(s)
    }
}

/// Fixed behavioural bias of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Personality {
    /// Prefers captures.
    Aggressive,
    /// Avoids trades.
    Defensive,
    /// In between.
    Balanced,
}

impl Personality {
    /// Every personality.
    pub const ALL: [Personality; 3] = [
        Personality::Aggressive,
        Personality::Defensive,
        Personality::Balanced,
    ];

    /// Probability that the biased random strategy restricts itself to captures.
    pub fn capture_probability(self) -> f64 {
        match self {
            Personality::Defensive => 0.6,
            Personality::Balanced => 0.7,
            Personality::Aggressive => 0.8,
        }
    }

    /// Multiplier applied to capture bonuses by the search strategies.
    pub fn capture_multiplier(self) -> f32 {
        match self {
            Personality::Aggressive => 1.5,
            Personality::Balanced => 1.0,
            Personality::Defensive => 0.6,
        }
    }
}

impl FromStr for Personality {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aggressive" => Ok(Personality::Aggressive),
            "defensive" => Ok(Personality::Defensive),
            "balanced" => Ok(Personality::Balanced),
            other => Err(EngineError::InvalidAgentSpec(format!(
                "unknown personality '{other}'"
            ))),
        }
    }
}

impl Display for Personality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Personality::Aggressive => "aggressive",
            Personality::Defensive => "defensive",
            Personality::Balanced => "balanced",
        };
        f.write_str(s)
    }
}

/// The `{difficulty, personality}` pair a match asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentSpec {
    /// Requested difficulty.
    pub difficulty: Difficulty,
    /// Requested personality.
    pub personality: Personality,
}

impl AgentSpec {
    /// Shorthand constructor.
    pub fn new(difficulty: Difficulty, personality: Personality) -> Self {
        AgentSpec {
            difficulty,
            personality,
        }
    }

    /// Parses the external string form, e.g. `("easy", "balanced")`.
    pub fn parse(difficulty: &str, personality: &str) -> Result<Self, EngineError> {
        Ok(AgentSpec {
            difficulty: difficulty.parse()?,
            personality: personality.parse()?,
        })
    }
}

impl Display for AgentSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.difficulty, self.personality)
    }
}

#[cfg(test)]
mod types_tests {
    use super::*;

    #[test]
    fn apply_moves_piece_and_removes_victim() {
        let position = Position::new()
            .with_pieces(Side::One, [Piece::new(PieceKind::Major, 4, 4)])
            .with_pieces(Side::Two, [Piece::new(PieceKind::Spy, 5, 4)]);
        let mv = Move::capture(
            PieceKind::Major,
            Coordinate::new(4, 4),
            Coordinate::new(5, 4),
            PieceKind::Spy,
        );

        let next = position.apply(&mv, Side::One);
        assert_eq!(next.pieces(Side::One)[0].coordinate, Coordinate::new(5, 4));
        assert!(next.pieces(Side::Two).is_empty());
        // original untouched
        assert_eq!(position.piece_count(), 2);
    }

    #[test]
    fn off_board_piece_is_malformed() {
        let position = Position::new().with_pieces(Side::Two, [Piece::new(PieceKind::Spy, 9, 0)]);
        assert!(matches!(
            position.validate(),
            Err(EngineError::MalformedPosition(_))
        ));
    }

    #[test]
    fn agent_spec_parsing_is_case_insensitive() {
        let spec = AgentSpec::parse("Medium", " AGGRESSIVE").unwrap();
        assert_eq!(spec, AgentSpec::new(Difficulty::Medium, Personality::Aggressive));
        assert!(AgentSpec::parse("impossible", "balanced").is_err());
    }

    #[test]
    fn capture_value_of_unknown_victim_is_cheapest_piece() {
        let mut mv = Move::quiet(PieceKind::Private, Coordinate::new(0, 0), Coordinate::new(0, 1));
        assert_eq!(mv.capture_value(), 0.0);
        mv.is_capture = true;
        assert_eq!(mv.capture_value(), PieceKind::Spy.value());
    }
}
