use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use super::first_move;
use crate::error::Result;
use crate::types::{Move, Personality};

/// Uniform choice biased toward captures.
///
/// With probability [`Personality::capture_probability`] the move is drawn among captures,
/// otherwise among quiet moves. When one of the two groups is empty the draw falls back to the
/// whole list, so the capture rate on a mixed list equals the personality probability.
pub struct BiasedRandom {
    personality: Personality,
    rng: StdRng,
}

impl BiasedRandom {
    /// Entropy-seeded strategy.
    pub fn new(personality: Personality) -> Self {
        BiasedRandom {
            personality,
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible strategy, for tests and replays.
    pub fn with_seed(personality: Personality, seed: u64) -> Self {
        BiasedRandom {
            personality,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub(crate) fn select<'m>(&mut self, legal_moves: &'m [Move]) -> Result<&'m Move> {
        let fallback = first_move(legal_moves)?;

        let (captures, quiet): (Vec<&Move>, Vec<&Move>) =
            legal_moves.iter().partition(|m| m.is_capture);

        let wants_capture = self.rng.gen_bool(self.personality.capture_probability());
        let pool = match (wants_capture, captures.is_empty(), quiet.is_empty()) {
            (true, false, _) => &captures,
            (false, _, false) => &quiet,
            _ => return Ok(legal_moves.choose(&mut self.rng).unwrap_or(fallback)),
        };
        Ok(pool.choose(&mut self.rng).copied().unwrap_or(fallback))
    }
}
