//! Match lifecycle: create, move, end.
//!
//! Each match lives behind its own mutex, so two move requests for the same match never run at
//! the same time while different matches proceed in parallel. The coordinator never holds the
//! agent pool's lock while an agent is thinking: agents are checked out at creation, owned by the
//! match while it runs, and checked back in when it ends.
//!
//! A match goes `Pending → Active → Completed`. It becomes active on its first move request and
//! is completed by [`MatchCoordinator::end_match`]; completed matches are kept in a bounded
//! history so that late requests get [`EngineError::MatchNotActive`] instead of
//! [`EngineError::MatchNotFound`].

use std::{
    collections::{HashMap, VecDeque},
    fmt::Display,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, RwLock,
    },
    time::Instant,
};

use time::OffsetDateTime;
use tracing::{info, instrument, trace, warn};

use crate::agent::{AgentHandle, AgentId, GameOutcome};
use crate::agent_pool::AgentPool;
use crate::error::{EngineError, Result};
use crate::telemetry::{MatchEndEvent, MoveEvent, TelemetryRecorder, TelemetrySink};
use crate::types::{AgentSpec, Move, Position, Side};

/// Completed matches remembered for lookups and late-request detection.
pub const COMPLETED_HISTORY: usize = 1024;

/// Unique id of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchId(pub u64);

impl Display for MatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "match#{}", self.0)
    }
}

/// Lifecycle state of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    /// Created, no move requested yet.
    Pending,
    /// At least one move requested.
    Active,
    /// Ended; terminal.
    Completed,
}

/// Final result reported by the rules engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    /// The given side won.
    Winner(Side),
    /// Nobody won.
    Draw,
}

impl MatchResult {
    fn outcome_for(self, side: Side) -> GameOutcome {
        match self {
            MatchResult::Draw => GameOutcome::Draw,
            MatchResult::Winner(winner) if winner == side => GameOutcome::Win,
            MatchResult::Winner(_) => GameOutcome::Loss,
        }
    }
}

/// One decision in a match log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveRecord {
    /// Chosen move, `None` when the request carried no legal move.
    pub mv: Option<Move>,
    /// Side that moved.
    pub side: Side,
    /// Decision time.
    pub latency_ms: f32,
    /// Fraud score of the deciding agent right after the decision.
    pub fraud_score: f32,
    /// When the decision was recorded.
    pub timestamp: OffsetDateTime,
}

/// A move request from the rules engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveRequest {
    /// Target match.
    pub match_id: MatchId,
    /// Current position.
    pub position: Position,
    /// Legal moves for the side to move.
    pub legal_moves: Vec<Move>,
}

/// Answer to a [`MoveRequest`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveResponse {
    /// Chosen move, `None` only when no legal move was supplied.
    pub mv: Option<Move>,
    /// Decision time.
    pub latency_ms: f32,
    /// Fraud score of the deciding agent.
    pub fraud_score_snapshot: f32,
}

/// Read-only copy of a match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSnapshot {
    /// Match id.
    pub id: MatchId,
    /// Lifecycle state.
    pub status: MatchStatus,
    /// Side to move next.
    pub current_side: Side,
    /// Agents for side one and side two.
    pub agents: [AgentId; 2],
    /// Their pool keys.
    pub specs: [AgentSpec; 2],
    /// Every decision so far, in order.
    pub move_log: Vec<MoveRecord>,
    /// Creation time.
    pub created_at: OffsetDateTime,
    /// End time, once completed.
    pub ended_at: Option<OffsetDateTime>,
}

struct Match {
    id: MatchId,
    // Index 0 plays side one. Emptied when the match ends.
    agents: Vec<AgentHandle>,
    agent_ids: [AgentId; 2],
    specs: [AgentSpec; 2],
    status: MatchStatus,
    current_side: Side,
    move_log: Vec<MoveRecord>,
    created_at: OffsetDateTime,
    started: Instant,
    ended_at: Option<OffsetDateTime>,
}

impl Match {
    fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            id: self.id,
            status: self.status,
            current_side: self.current_side,
            agents: self.agent_ids,
            specs: self.specs,
            move_log: self.move_log.clone(),
            created_at: self.created_at,
            ended_at: self.ended_at,
        }
    }
}

#[derive(Default)]
struct CompletedMatches {
    order: VecDeque<MatchId>,
    by_id: HashMap<MatchId, MatchSnapshot>,
}

impl CompletedMatches {
    fn insert(&mut self, snapshot: MatchSnapshot) {
        if self.order.len() == COMPLETED_HISTORY {
            if let Some(oldest) = self.order.pop_front() {
                self.by_id.remove(&oldest);
            }
        }
        self.order.push_back(snapshot.id);
        self.by_id.insert(snapshot.id, snapshot);
    }
}

/// Owner of every running match.
pub struct MatchCoordinator {
    pool: Arc<AgentPool>,
    active: RwLock<HashMap<MatchId, Arc<Mutex<Match>>>>,
    completed: Mutex<CompletedMatches>,
    next_id: AtomicU64,
    telemetry: Arc<dyn TelemetrySink>,
}

impl MatchCoordinator {
    /// Coordinator drawing agents from `pool`, reporting to a fresh [`TelemetryRecorder`].
    pub fn new(pool: Arc<AgentPool>) -> Self {
        Self::with_telemetry(pool, Arc::new(TelemetryRecorder::new()))
    }

    /// Coordinator reporting to `telemetry`.
    pub fn with_telemetry(pool: Arc<AgentPool>, telemetry: Arc<dyn TelemetrySink>) -> Self {
        MatchCoordinator {
            pool,
            active: RwLock::new(HashMap::new()),
            completed: Mutex::new(CompletedMatches::default()),
            next_id: AtomicU64::new(1),
            telemetry,
        }
    }

    /// Checks out one agent per side and registers a pending match.
    ///
    /// # Errors
    /// Pool errors (`UnknownAgentCombination`, `PoolExhausted`). No agent stays checked out when
    /// creation fails.
    #[instrument(skip(self))]
    pub fn create_match(&self, agent_one: AgentSpec, agent_two: AgentSpec) -> Result<MatchId> {
        let first = self
            .pool
            .checkout(agent_one.difficulty, agent_one.personality)?;
        let second = match self
            .pool
            .checkout(agent_two.difficulty, agent_two.personality)
        {
            Ok(handle) => handle,
            Err(e) => {
                self.pool.checkin(first)?;
                return Err(e);
            }
        };

        let id = MatchId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.pool.assign(first.id(), id)?;
        self.pool.assign(second.id(), id)?;

        let game = Match {
            id,
            agent_ids: [first.id(), second.id()],
            specs: [agent_one, agent_two],
            agents: vec![first, second],
            status: MatchStatus::Pending,
            current_side: Side::One,
            move_log: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
            started: Instant::now(),
            ended_at: None,
        };
        info!(
            %id,
            one = %game.agent_ids[0],
            two = %game.agent_ids[1],
            "match created"
        );
        self.write_active()
            .insert(id, Arc::new(Mutex::new(game)));
        Ok(id)
    }

    /// Lets the agent of the side to move pick one of `legal_moves`.
    ///
    /// Blocks only on this match's lock. The decision is appended to the move log and the turn
    /// passes to the other side, even when `legal_moves` is empty.
    ///
    /// # Errors
    /// `MatchNotFound` for unknown ids, `MatchNotActive` for completed matches.
    pub fn request_move(
        &self,
        match_id: MatchId,
        position: &Position,
        legal_moves: &[Move],
    ) -> Result<MoveResponse> {
        let game = self.find(match_id)?;
        let mut game = lock(&game);

        match game.status {
            MatchStatus::Completed => return Err(EngineError::MatchNotActive(match_id)),
            MatchStatus::Pending => {
                game.status = MatchStatus::Active;
                trace!(%match_id, "match active");
            }
            MatchStatus::Active => {}
        }

        let side = game.current_side;
        let agent = &mut game.agents[side.index()];
        let (agent_id, difficulty) = (agent.id(), agent.spec().difficulty);
        let decision = agent.decide(position, side, legal_moves);

        game.move_log.push(MoveRecord {
            mv: decision.mv,
            side,
            latency_ms: decision.latency_ms,
            fraud_score: decision.fraud_score,
            timestamp: OffsetDateTime::now_utc(),
        });
        game.current_side = side.opponent();
        drop(game);

        self.telemetry.on_move(&MoveEvent {
            match_id,
            agent: agent_id,
            difficulty,
            side,
            latency_ms: decision.latency_ms,
            fraud_score: decision.fraud_score,
        });

        Ok(MoveResponse {
            mv: decision.mv,
            latency_ms: decision.latency_ms,
            fraud_score_snapshot: decision.fraud_score,
        })
    }

    /// Same as [`request_move`](Self::request_move), taking the external request type.
    pub fn handle(&self, request: &MoveRequest) -> Result<MoveResponse> {
        self.request_move(request.match_id, &request.position, &request.legal_moves)
    }

    /// Completes the match, updates both agents' counters and returns them to the pool.
    ///
    /// # Errors
    /// `MatchNotFound` for unknown ids, `MatchNotActive` when the match already ended. A second
    /// call leaves the completed match untouched.
    #[instrument(skip(self))]
    pub fn end_match(&self, match_id: MatchId, result: MatchResult) -> Result<()> {
        let game = self.find(match_id)?;
        let mut game = lock(&game);
        if game.status == MatchStatus::Completed {
            return Err(EngineError::MatchNotActive(match_id));
        }

        game.status = MatchStatus::Completed;
        game.ended_at = Some(OffsetDateTime::now_utc());
        let mut agents = std::mem::take(&mut game.agents);
        for (agent, side) in agents.iter_mut().zip([Side::One, Side::Two]) {
            agent.record_result(result.outcome_for(side));
        }
        let snapshot = game.snapshot();
        let duration_ms = game.started.elapsed().as_secs_f64() * 1000.0;
        drop(game);

        let moves = snapshot.move_log.len();
        lock(&self.completed).insert(snapshot);
        self.write_active().remove(&match_id);

        let mut checkin_error = None;
        for agent in agents {
            if let Err(e) = self.pool.checkin(agent) {
                warn!(%match_id, "{e}");
                checkin_error.get_or_insert(e);
            }
        }

        info!(%match_id, ?result, moves, "match ended");
        self.telemetry.on_match_end(&MatchEndEvent {
            match_id,
            moves,
            duration_ms,
        });

        match checkin_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Copy of a running or recently completed match.
    pub fn snapshot(&self, match_id: MatchId) -> Option<MatchSnapshot> {
        let running = self.read_active().get(&match_id).cloned();
        match running {
            Some(game) => Some(lock(&game).snapshot()),
            None => lock(&self.completed).by_id.get(&match_id).cloned(),
        }
    }

    /// Lifecycle state of a match, if known.
    pub fn status(&self, match_id: MatchId) -> Option<MatchStatus> {
        self.snapshot(match_id).map(|s| s.status)
    }

    /// Number of pending or active matches.
    pub fn active_matches(&self) -> usize {
        self.read_active().len()
    }

    /// The agent pool backing this coordinator.
    pub fn pool(&self) -> &Arc<AgentPool> {
        &self.pool
    }

    fn find(&self, match_id: MatchId) -> Result<Arc<Mutex<Match>>> {
        if let Some(game) = self.read_active().get(&match_id) {
            return Ok(game.clone());
        }
        if lock(&self.completed).by_id.contains_key(&match_id) {
            Err(EngineError::MatchNotActive(match_id))
        } else {
            Err(EngineError::MatchNotFound(match_id))
        }
    }

    fn read_active(&self) -> std::sync::RwLockReadGuard<'_, HashMap<MatchId, Arc<Mutex<Match>>>> {
        self.active.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_active(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<MatchId, Arc<Mutex<Match>>>> {
        self.active.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod match_coordinator_tests {
    use super::*;
    use crate::configuration::AIConfig;
    use crate::types::{Coordinate, Difficulty, Personality, PieceKind};

    fn coordinator() -> MatchCoordinator {
        let config = AIConfig::new().with_agent_pool_size(1).with_verbose(false);
        MatchCoordinator::new(Arc::new(AgentPool::new(&config)))
    }

    fn spec(difficulty: Difficulty) -> AgentSpec {
        AgentSpec::new(difficulty, Personality::Balanced)
    }

    fn one_move() -> [Move; 1] {
        [Move::quiet(PieceKind::Private, Coordinate::new(1, 1), Coordinate::new(2, 1))]
    }

    #[test]
    fn first_move_activates_the_match() {
        let coordinator = coordinator();
        let id = coordinator
            .create_match(spec(Difficulty::Easy), spec(Difficulty::Easy))
            .unwrap();
        assert_eq!(coordinator.status(id), Some(MatchStatus::Pending));
        let first_agent = coordinator.snapshot(id).unwrap().agents[0];
        assert_eq!(coordinator.pool().assignment(first_agent), Some(id));

        let response = coordinator.request_move(id, &Position::new(), &one_move()).unwrap();
        assert_eq!(response.mv, Some(one_move()[0]));
        let snapshot = coordinator.snapshot(id).unwrap();
        assert_eq!(snapshot.status, MatchStatus::Active);
        assert_eq!(snapshot.current_side, Side::Two);
        assert_eq!(snapshot.move_log.len(), 1);
    }

    #[test]
    fn empty_legal_moves_are_logged_as_no_move() {
        let coordinator = coordinator();
        let id = coordinator
            .create_match(spec(Difficulty::Medium), spec(Difficulty::Hard))
            .unwrap();
        let response = coordinator.request_move(id, &Position::new(), &[]).unwrap();
        assert_eq!(response.mv, None);
        assert_eq!(coordinator.snapshot(id).unwrap().move_log[0].mv, None);
    }

    #[test]
    fn unknown_match_is_not_found() {
        let coordinator = coordinator();
        assert_eq!(
            coordinator.request_move(MatchId(77), &Position::new(), &one_move()),
            Err(EngineError::MatchNotFound(MatchId(77)))
        );
        assert_eq!(
            coordinator.end_match(MatchId(77), MatchResult::Draw),
            Err(EngineError::MatchNotFound(MatchId(77)))
        );
    }

    #[test]
    fn failed_creation_returns_the_first_agent() {
        let config = AIConfig::new().with_agent_pool_size(1);
        let pool = Arc::new(AgentPool::with_specs(&config, [spec(Difficulty::Easy)], None));
        let coordinator = MatchCoordinator::new(pool.clone());
        let err = coordinator
            .create_match(spec(Difficulty::Easy), spec(Difficulty::Hard))
            .unwrap_err();
        assert_eq!(err, EngineError::UnknownAgentCombination(spec(Difficulty::Hard)));
        assert_eq!(pool.busy_count(), 0);
        assert_eq!(pool.idle_count(spec(Difficulty::Easy)), 1);
    }

    #[test]
    fn end_match_updates_counters() {
        let coordinator = coordinator();
        let id = coordinator
            .create_match(spec(Difficulty::Easy), spec(Difficulty::Medium))
            .unwrap();
        coordinator.request_move(id, &Position::new(), &one_move()).unwrap();
        coordinator.end_match(id, MatchResult::Winner(Side::Two)).unwrap();

        let pool = coordinator.pool();
        let winner = pool.checkout(Difficulty::Medium, Personality::Balanced).unwrap();
        let loser = pool.checkout(Difficulty::Easy, Personality::Balanced).unwrap();
        assert_eq!(winner.counters().wins, 1);
        assert_eq!(loser.counters().losses, 1);
        assert_eq!(loser.counters().moves_total, 1);
        assert_eq!(coordinator.active_matches(), 0);
    }
}
