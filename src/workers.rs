//! Job hub shared by all worker threads
//!
//! [`Workers`] publishes the current job, a generation counter and a pause
//! flag, and collects shares on a channel. Workers only ever read from it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info};

use crate::algorithm::Engine;
use crate::error::MinerError;
use crate::hashrate::Hashrate;
use crate::job::{Job, JobResult};
use crate::worker::MultiWorker;

/// Fallback poll interval for idle workers
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Where workers read work from
pub trait JobSource: Send + Sync {
    /// Current generation; 0 means shut down
    fn generation(&self) -> u64;

    fn is_paused(&self) -> bool;

    /// Snapshot of the current job
    fn current_job(&self) -> Job;

    fn is_stale(&self, last_seen: u64) -> bool {
        self.generation() != last_seen
    }

    /// Block while the source is paused and not shut down
    fn wait_while_paused(&self) {
        while self.is_paused() && self.generation() != 0 {
            thread::sleep(IDLE_POLL_INTERVAL);
        }
    }

    /// Block until the generation moves away from `last_seen`
    fn wait_for_change(&self, last_seen: u64) {
        while !self.is_stale(last_seen) {
            thread::sleep(IDLE_POLL_INTERVAL);
        }
    }
}

/// Where workers deliver shares
pub trait ShareSink: Send + Sync {
    fn submit(&self, result: JobResult);
}

impl ShareSink for Sender<JobResult> {
    fn submit(&self, result: JobResult) {
        let _ = self.send(result);
    }
}

pub struct Workers {
    generation: AtomicU64,
    paused: AtomicBool,
    job: RwLock<Job>,
    idle_lock: Mutex<()>,
    idle: Condvar,
    results: Sender<JobResult>,
}

impl Workers {
    /// Create a hub holding the idle job, and the receiving end of its share
    /// queue
    pub fn new() -> (Arc<Self>, Receiver<JobResult>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let hub = Arc::new(Self {
            generation: AtomicU64::new(1),
            paused: AtomicBool::new(false),
            job: RwLock::new(Job::idle()),
            idle_lock: Mutex::new(()),
            idle: Condvar::new(),
            results: tx,
        });
        (hub, rx)
    }

    /// Publish a job and wake every worker. Clears the pause flag.
    ///
    /// Has no effect on the generation after [`Workers::stop`].
    pub fn set_job(&self, job: Job) {
        debug!(job = ?job, "new job");
        {
            let mut slot = self.job.write().unwrap_or_else(PoisonError::into_inner);
            *slot = job;
        }
        self.paused.store(false, Ordering::SeqCst);
        self.bump();
        self.notify();
    }

    /// Pause all workers until the next [`Workers::set_job`]
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        self.bump();
        self.notify();
    }

    /// Signal shutdown
    pub fn stop(&self) {
        self.generation.store(0, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.notify();
    }

    /// Spawn one thread per worker, all hashing with `engine`
    pub fn start(
        self: &Arc<Self>,
        engine: Engine,
        threads: usize,
        hashrate: &Arc<Hashrate>,
    ) -> Result<WorkersHandle, MinerError> {
        let mut handles = Vec::with_capacity(threads);

        for thread_id in 0..threads {
            let hub = Arc::clone(self);
            let hashrate = Arc::clone(hashrate);
            let spawned = thread::Builder::new()
                .name(format!("cn-worker-{}", thread_id))
                .spawn(move || {
                    let sink = hub.results.clone();
                    MultiWorker::new(thread_id, threads, engine).run(&*hub, &sink, &hashrate);
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    self.stop();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(MinerError::Spawn(e));
                }
            }
        }

        info!(
            threads,
            lanes = engine.lanes(),
            algorithm = %engine.algorithm(),
            "workers started"
        );
        Ok(WorkersHandle { handles })
    }

    fn bump(&self) {
        let _ = self
            .generation
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |g| {
                (g != 0).then_some(g + 1)
            });
    }

    fn notify(&self) {
        let _guard = self.idle_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.idle.notify_all();
    }

    /// Wait on the condition variable until `done` holds. The timeout keeps a
    /// missed notification from stalling a worker for longer than one poll.
    fn wait_until(&self, done: impl Fn() -> bool) {
        let mut guard = self.idle_lock.lock().unwrap_or_else(PoisonError::into_inner);
        while !done() {
            guard = match self.idle.wait_timeout(guard, IDLE_POLL_INTERVAL) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}

impl JobSource for Workers {
    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn current_job(&self) -> Job {
        self.job
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn wait_while_paused(&self) {
        self.wait_until(|| !self.is_paused() || self.generation() == 0);
    }

    fn wait_for_change(&self, last_seen: u64) {
        self.wait_until(|| self.is_stale(last_seen));
    }
}

/// Running worker threads
pub struct WorkersHandle {
    handles: Vec<JoinHandle<()>>,
}

impl WorkersHandle {
    pub fn threads(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to exit. Call after [`Workers::stop`].
    pub fn join(self) {
        for handle in self.handles {
            if handle.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        }
    }
}
