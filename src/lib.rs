//! # Agent Arena
//!
//! The AI decision engine of a real-time, two-sided board game. Given a position and the legal
//! moves of the side to move, an agent picks one within a strict time budget (100ms).
//!
//! It provides:
//! - Four decision strategies, from a personality-biased random mover to a hybrid search
//!   delegating its scoring to a pluggable neural evaluator (see [`strategy`])
//! - A static [`PositionEvaluator`](crate::evaluation::PositionEvaluator) shared by the
//!   search-based strategies
//! - Per-agent decision timing and anomaly scoring (see [`fraud_monitor`])
//! - A pool of reusable agents per difficulty/personality pair (see [`agent_pool`])
//! - Match lifecycle management (see [`match_coordinator`]) and a bounded worker pool running
//!   many matches concurrently (see [`match_runner`])
//!
//! Move legality, win detection and board rules belong to the rules engine that calls into this
//! crate: the engine only ever picks among the moves it is given.
//!
//! # Documentation Overview
//!
//! - For the difficulty/personality matrix and the behavior of each agent, see
//!   [`AgentConfig`](crate::agent::AgentConfig) and [`DecisionStrategy`](crate::strategy::DecisionStrategy).
//! - For process-wide settings (worker count, pool size, time limits), see
//!   [`AIConfig`](crate::configuration::AIConfig).
//! - For running many matches at once and measuring latencies, see [`stress`].
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use agent_arena::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = AIConfig::new().with_agent_pool_size(2);
//!     let pool = Arc::new(AgentPool::new(&config));
//!     let coordinator = MatchCoordinator::new(pool);
//!
//!     let match_id = coordinator.create_match(
//!         AgentSpec::parse("easy", "balanced")?,
//!         AgentSpec::parse("hard", "aggressive")?,
//!     )?;
//!
//!     // Positions and legal moves come from the rules engine
//!     let mut generator = ScenarioGenerator::new(42, 10);
//!     for turn in 0..10 {
//!         let side = if turn % 2 == 0 { Side::One } else { Side::Two };
//!         let scenario = generator.generate(side);
//!         let response =
//!             coordinator.request_move(match_id, &scenario.position, &scenario.legal_moves)?;
//!         println!("{side:?}: {:?} in {:.2}ms", response.mv, response.latency_ms);
//!     }
//!
//!     coordinator.end_match(match_id, MatchResult::Winner(Side::One))?;
//!     Ok(())
//! }
//! ```
#![warn(missing_docs)]

pub use anyhow;

/// Agents: one strategy, its timing monitor and its performance counters.
pub mod agent;
pub mod agent_pool;
pub mod configuration;
pub mod error;
pub mod evaluation;
pub mod fraud_monitor;
mod logger;
pub mod match_coordinator;
pub mod match_runner;
pub mod neural;
pub mod scenario;
pub mod strategy;
pub mod stress;
pub mod telemetry;
pub mod types;

/// Commonly used types and traits for quick access.
///
/// Import this prelude to get started easily:
/// ```rust
/// use agent_arena::prelude::*;
/// ```
///
/// Includes:
/// - [`AIConfig`](crate::configuration::AIConfig)
/// - [`AgentPool`](crate::agent_pool::AgentPool)
/// - [`MatchCoordinator`](crate::match_coordinator::MatchCoordinator) and
///   [`MatchRunner`](crate::match_runner::MatchRunner)
/// - the board types of [`types`](crate::types)
pub mod prelude {
    pub use crate::agent::{AgentConfig, AgentHandle, AgentId};
    pub use crate::agent_pool::AgentPool;
    pub use crate::configuration::AIConfig;
    pub use crate::error::EngineError;
    pub use crate::evaluation::PositionEvaluator;
    pub use crate::match_coordinator::{
        MatchCoordinator, MatchId, MatchResult, MatchStatus, MoveRequest, MoveResponse,
    };
    pub use crate::match_runner::MatchRunner;
    pub use crate::neural::NeuralEvaluator;
    pub use crate::scenario::{Scenario, ScenarioGenerator};
    pub use crate::strategy::DecisionStrategy;
    pub use crate::telemetry::{TelemetryRecorder, TelemetrySink};
    pub use crate::types::*;
}
