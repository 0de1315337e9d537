//! Error kinds surfaced by the engine core.

use thiserror::Error;

use crate::{agent::AgentId, match_coordinator::MatchId, types::AgentSpec};

/// Result alias used by the core.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Everything that can go wrong inside the engine core.
///
/// Lifecycle misuse (`MatchNotFound`, `MatchNotActive`) is a protocol violation by the caller and
/// is always returned. `EvaluatorUnavailable` and `MalformedPosition` are recovered locally by the
/// strategies and only show up through the lower-level APIs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// No pool is registered for this difficulty/personality pair.
    #[error("no agent pool registered for {0}")]
    UnknownAgentCombination(AgentSpec),

    /// The external agent spec could not be parsed.
    #[error("invalid agent spec: {0}")]
    InvalidAgentSpec(String),

    /// The pool reached its growth limit for this pair.
    #[error("agent pool for {spec} exhausted ({limit} agents in use)")]
    PoolExhausted {
        /// Requested pair.
        spec: AgentSpec,
        /// Live agents allowed for the pair.
        limit: usize,
    },

    /// A handle was returned to the pool while not checked out.
    #[error("agent {0} is not checked out")]
    AgentNotCheckedOut(AgentId),

    /// Unknown match id.
    #[error("match {0} not found")]
    MatchNotFound(MatchId),

    /// The match exists but is already completed.
    #[error("match {0} is not active")]
    MatchNotActive(MatchId),

    /// No legal move was supplied; the decision is "no move".
    #[error("empty legal move set")]
    EmptyLegalMoveSet,

    /// The injected neural evaluator is missing or failed.
    #[error("neural evaluator unavailable: {0}")]
    EvaluatorUnavailable(String),

    /// A position that cannot be scored.
    #[error("malformed position: {0}")]
    MalformedPosition(String),
}
