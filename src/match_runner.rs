//! Bounded worker pool executing match operations.
//!
//! [`MatchRunner`] multiplexes any number of matches over `max_concurrent_workers` OS threads.
//! Move requests submitted for the same match run one after another in submission order; requests
//! for different matches run in parallel.

use std::{
    collections::{HashMap, VecDeque},
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        mpsc::{self, Receiver, Sender},
        Arc, Mutex, MutexGuard,
    },
    thread::JoinHandle,
};

use anyhow::Context;
use tracing::{error, info, trace, warn};

use crate::configuration::AIConfig;
use crate::error::Result;
use crate::logger::init_logger;
use crate::match_coordinator::{MatchCoordinator, MatchId, MoveRequest, MoveResponse};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed set of threads pulling jobs from a shared queue.
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    sender: Option<Sender<Job>>,
}

impl WorkerPool {
    /// Spawns `size` workers (at least one).
    pub fn new(size: usize) -> anyhow::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(size.max(1));
        for worker_id in 0..size.max(1) {
            let receiver = receiver.clone();
            let handle = std::thread::Builder::new()
                .name(format!("match-worker-{worker_id}"))
                .spawn(move || worker_loop(worker_id, &receiver))
                .with_context(|| format!("could not spawn worker {worker_id}"))?;
            workers.push(handle);
        }

        Ok(WorkerPool {
            workers,
            sender: Some(sender),
        })
    }

    /// Queues `job` for the next free worker.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(sender) = &self.sender {
            if sender.send(Box::new(job)).is_err() {
                error!("every worker is gone, job dropped");
            }
        }
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }
}

fn worker_loop(worker_id: usize, receiver: &Mutex<Receiver<Job>>) {
    loop {
        let job = {
            let guard = receiver.lock().unwrap_or_else(|e| e.into_inner());
            guard.recv()
        };
        match job {
            Ok(job) => {
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    error!(worker_id, "job panicked");
                }
            }
            // sender dropped: shutting down
            Err(_) => break,
        }
    }
    trace!(worker_id, "worker stopped");
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        drop(self.sender.take());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("worker thread panicked during shutdown");
            }
        }
    }
}

#[derive(Default)]
struct Strand {
    queue: VecDeque<Job>,
    running: bool,
}

type Strands = Arc<Mutex<HashMap<MatchId, Strand>>>;

/// Runs coordinator operations on a [`WorkerPool`].
pub struct MatchRunner {
    coordinator: Arc<MatchCoordinator>,
    strands: Strands,
    workers: WorkerPool,
}

impl MatchRunner {
    /// Runner with `config.max_concurrent_workers` threads. Installs the file logger when
    /// `config.log` is set.
    pub fn new(config: &AIConfig, coordinator: Arc<MatchCoordinator>) -> anyhow::Result<Self> {
        if config.log {
            if let Err(e) = init_logger() {
                warn!("file logging disabled: {e:#}");
            }
        }
        config.validate()?;

        let workers = WorkerPool::new(config.max_concurrent_workers)?;
        info!(workers = workers.size(), "match runner started");
        Ok(MatchRunner {
            coordinator,
            strands: Arc::new(Mutex::new(HashMap::new())),
            workers,
        })
    }

    /// Queues a move request. Requests for one match are answered in submission order.
    pub fn submit_move(&self, request: MoveRequest) -> Receiver<Result<MoveResponse>> {
        let (tx, rx) = mpsc::channel();
        let coordinator = self.coordinator.clone();
        let match_id = request.match_id;
        self.submit_for_match(match_id, move || {
            let _ = tx.send(coordinator.handle(&request));
        });
        rx
    }

    /// Runs an arbitrary coordinator operation on a worker, e.g. a whole scripted match.
    pub fn submit<F, T>(&self, job: F) -> Receiver<T>
    where
        F: FnOnce(&MatchCoordinator) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let coordinator = self.coordinator.clone();
        self.workers.execute(move || {
            let _ = tx.send(job(&coordinator));
        });
        rx
    }

    /// The coordinator driven by this runner.
    pub fn coordinator(&self) -> &Arc<MatchCoordinator> {
        &self.coordinator
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers.size()
    }

    fn submit_for_match<F>(&self, match_id: MatchId, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut strands = lock(&self.strands);
        let strand = strands.entry(match_id).or_default();
        strand.queue.push_back(Box::new(job));
        if strand.running {
            return;
        }
        strand.running = true;
        drop(strands);

        let strands = self.strands.clone();
        self.workers.execute(move || drain_strand(&strands, match_id));
    }
}

/// Runs queued jobs of one match until its queue is empty.
fn drain_strand(strands: &Strands, match_id: MatchId) {
    loop {
        let job = {
            let mut guard = lock(strands);
            let Some(strand) = guard.get_mut(&match_id) else {
                return;
            };
            match strand.queue.pop_front() {
                Some(job) => job,
                None => {
                    guard.remove(&match_id);
                    return;
                }
            }
        };
        if catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!(%match_id, "move job panicked");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
