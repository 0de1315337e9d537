//! Rotating pools of reusable agents, one queue per difficulty/personality pair.
//!
//! Checkout pops the least recently used idle agent; checkin pushes it back at the tail. Both go
//! through one mutex, held only for the queue operation itself and never while an agent is
//! thinking. A handle is always either idle in exactly one queue or marked busy, never both.

use std::{
    collections::{BTreeSet, HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use tracing::{debug, info, instrument, trace};

use crate::agent::{AgentConfig, AgentHandle, AgentId};
use crate::configuration::AIConfig;
use crate::error::{EngineError, Result};
use crate::match_coordinator::MatchId;
use crate::neural::NeuralEvaluator;
use crate::types::{AgentSpec, Difficulty, Personality};

/// Live agents allowed per pair, as a multiple of the initial pool size.
pub const POOL_GROWTH_FACTOR: usize = 4;

#[derive(Default)]
struct PoolState {
    idle: HashMap<AgentSpec, VecDeque<AgentHandle>>,
    busy: HashMap<AgentId, Option<MatchId>>,
    created: HashMap<AgentSpec, usize>,
    next_id: u64,
}

/// Pool of [`AgentHandle`]s shared by every match.
pub struct AgentPool {
    state: Mutex<PoolState>,
    registered: BTreeSet<AgentSpec>,
    initial_size: usize,
    max_per_spec: usize,
    move_timeout_ms: f32,
    min_thinking_time_ms: f32,
    neural: Option<Arc<dyn NeuralEvaluator>>,
}

impl AgentPool {
    /// Pool registering every difficulty/personality pair.
    pub fn new(config: &AIConfig) -> Self {
        Self::with_specs(config, all_specs(), None)
    }

    /// Pool whose hard agents use `neural` through the hybrid search.
    pub fn with_neural_evaluator(config: &AIConfig, neural: Arc<dyn NeuralEvaluator>) -> Self {
        Self::with_specs(config, all_specs(), Some(neural))
    }

    /// Pool registering only `specs`; checkout of anything else fails.
    #[instrument(skip_all)]
    pub fn with_specs(
        config: &AIConfig,
        specs: impl IntoIterator<Item = AgentSpec>,
        neural: Option<Arc<dyn NeuralEvaluator>>,
    ) -> Self {
        let pool = AgentPool {
            state: Mutex::new(PoolState::default()),
            registered: specs.into_iter().collect(),
            initial_size: config.agent_pool_size,
            max_per_spec: config.agent_pool_size.max(1) * POOL_GROWTH_FACTOR,
            move_timeout_ms: config.move_timeout_ms,
            min_thinking_time_ms: config.min_thinking_time_ms,
            neural,
        };

        let mut state = pool.lock();
        for spec in &pool.registered {
            for _ in 0..pool.initial_size {
                let handle = pool.build_handle(&mut state, *spec);
                state.idle.entry(*spec).or_default().push_back(handle);
            }
        }
        drop(state);

        info!(
            specs = pool.registered.len(),
            per_spec = pool.initial_size,
            "agent pool ready"
        );
        pool
    }

    /// Takes the least recently used idle agent for `difficulty`/`personality`.
    ///
    /// Creates a new agent when the queue is empty, up to the growth limit.
    pub fn checkout(&self, difficulty: Difficulty, personality: Personality) -> Result<AgentHandle> {
        let spec = AgentSpec::new(difficulty, personality);
        if !self.registered.contains(&spec) {
            return Err(EngineError::UnknownAgentCombination(spec));
        }

        let mut state = self.lock();
        let handle = match state.idle.get_mut(&spec).and_then(VecDeque::pop_front) {
            Some(handle) => handle,
            None => {
                let created = state.created.get(&spec).copied().unwrap_or(0);
                if created >= self.max_per_spec {
                    return Err(EngineError::PoolExhausted {
                        spec,
                        limit: self.max_per_spec,
                    });
                }
                debug!(%spec, created, "idle queue empty, growing pool");
                self.build_handle(&mut state, spec)
            }
        };
        state.busy.insert(handle.id(), None);
        trace!(agent = %handle.id(), %spec, "checked out");
        Ok(handle)
    }

    /// Records which match a checked-out agent plays in.
    pub fn assign(&self, agent: AgentId, match_id: MatchId) -> Result<()> {
        let mut state = self.lock();
        match state.busy.get_mut(&agent) {
            Some(slot) => {
                *slot = Some(match_id);
                Ok(())
            }
            None => Err(EngineError::AgentNotCheckedOut(agent)),
        }
    }

    /// Returns an agent to the tail of its idle queue.
    pub fn checkin(&self, handle: AgentHandle) -> Result<()> {
        let mut state = self.lock();
        if state.busy.remove(&handle.id()).is_none() {
            return Err(EngineError::AgentNotCheckedOut(handle.id()));
        }
        trace!(agent = %handle.id(), "checked in");
        state.idle.entry(handle.spec()).or_default().push_back(handle);
        Ok(())
    }

    /// True when `agent` sits in an idle queue.
    pub fn is_idle(&self, agent: AgentId) -> bool {
        let state = self.lock();
        state
            .idle
            .values()
            .any(|queue| queue.iter().any(|h| h.id() == agent))
    }

    /// Match currently holding `agent`, if it is checked out and assigned.
    pub fn assignment(&self, agent: AgentId) -> Option<MatchId> {
        self.lock().busy.get(&agent).copied().flatten()
    }

    /// Idle agents for a pair.
    pub fn idle_count(&self, spec: AgentSpec) -> usize {
        self.lock().idle.get(&spec).map_or(0, VecDeque::len)
    }

    /// Checked-out agents, all pairs together.
    pub fn busy_count(&self) -> usize {
        self.lock().busy.len()
    }

    /// Registered pairs.
    pub fn registered(&self) -> impl Iterator<Item = AgentSpec> + '_ {
        self.registered.iter().copied()
    }

    fn build_handle(&self, state: &mut PoolState, spec: AgentSpec) -> AgentHandle {
        state.next_id += 1;
        *state.created.entry(spec).or_default() += 1;
        let config = AgentConfig::for_agent(
            spec.difficulty,
            spec.personality,
            self.min_thinking_time_ms,
        )
        .with_move_timeout(self.move_timeout_ms);
        AgentHandle::new(AgentId(state.next_id), spec, config, self.neural.clone())
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // every mutation is a single push, pop or insert: a poisoned state is still consistent
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn all_specs() -> impl Iterator<Item = AgentSpec> {
    Difficulty::ALL.into_iter().flat_map(|difficulty| {
        Personality::ALL
            .into_iter()
            .map(move |personality| AgentSpec::new(difficulty, personality))
    })
}
