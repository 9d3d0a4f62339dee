//! Per-thread worker state machine
//!
//! A [`MultiWorker`] owns its engine scratch context, an `active` state and
//! a frozen `paused` copy. [`MultiWorker::consume_job`] moves between them:
//!
//! - same job as before: nothing to do
//! - idle job while mining: `active` is saved into `paused`
//! - real job matching the saved one while idle: `paused` is restored as is,
//!   counters and lanes included
//! - anything else: the job is adopted and the nonce space repartitioned
//!
//! Exactly one engine call is made per loop iteration, covering every lane.

use std::thread;

use tracing::{debug, warn};

use crate::algorithm::{meets_target, Engine, HashContext, HASH_SIZE, MAX_LANES};
use crate::hashrate::Hashrate;
use crate::job::{Job, JobResult};
use crate::lanes::LaneBuffer;
use crate::nonce;
use crate::workers::{JobSource, ShareSink};

/// Hashrate is sampled once every this many iterations
const STATS_INTERVAL_MASK: u64 = 0xF;

/// Job, lane counters and lane buffer of one worker
#[derive(Clone)]
pub struct WorkerState {
    job: Job,
    nonces: [u32; MAX_LANES],
    lanes: LaneBuffer,
    wrapped: bool,
}

impl WorkerState {
    fn new() -> Self {
        Self {
            job: Job::idle(),
            nonces: [0u32; MAX_LANES],
            lanes: LaneBuffer::new(),
            wrapped: false,
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Last nonce hashed (or the partition start) per lane
    pub fn nonces(&self) -> &[u32; MAX_LANES] {
        &self.nonces
    }

    pub fn lanes(&self) -> &LaneBuffer {
        &self.lanes
    }
}

/// Observable worker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerMode {
    /// No job, nothing saved
    Idle,
    /// Hashing a real job
    Mining,
    /// No job, but a previous job's progress is saved
    PausedWithMemory,
    /// Shutdown observed
    ShuttingDown,
}

pub struct MultiWorker {
    id: usize,
    threads: usize,
    engine: Engine,
    ctx: HashContext,
    generation: u64,
    iterations: u64,
    hashes: u64,
    stopped: bool,
    active: WorkerState,
    paused: WorkerState,
    output: [[u8; HASH_SIZE]; MAX_LANES],
}

impl MultiWorker {
    /// Worker `id` of `threads`, hashing with an already verified engine
    pub fn new(id: usize, threads: usize, engine: Engine) -> Self {
        Self {
            id,
            threads: threads.max(1),
            engine,
            ctx: engine.context(),
            generation: 0,
            iterations: 0,
            hashes: 0,
            stopped: false,
            active: WorkerState::new(),
            paused: WorkerState::new(),
            output: [[0u8; HASH_SIZE]; MAX_LANES],
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Generation observed by the last [`MultiWorker::consume_job`]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Total hashes computed
    pub fn hashes(&self) -> u64 {
        self.hashes
    }

    pub fn active(&self) -> &WorkerState {
        &self.active
    }

    pub fn paused(&self) -> &WorkerState {
        &self.paused
    }

    pub fn mode(&self) -> WorkerMode {
        if self.stopped {
            WorkerMode::ShuttingDown
        } else if !self.active.job.is_idle() {
            WorkerMode::Mining
        } else if !self.paused.job.is_idle() {
            WorkerMode::PausedWithMemory
        } else {
            WorkerMode::Idle
        }
    }

    /// Pick up the source's current job
    pub fn consume_job<J: JobSource + ?Sized>(&mut self, source: &J) {
        // Generation first: a job published in between only makes us stale
        self.generation = source.generation();
        let job = source.current_job();

        if self.active.job == job {
            return;
        }

        self.save(&job);

        if self.resume(&job) {
            debug!(thread = self.id, job = job.id(), "resumed saved job");
            return;
        }

        self.adopt(job);
    }

    fn save(&mut self, job: &Job) {
        if job.is_idle() && !self.active.job.is_idle() {
            self.paused = self.active.clone();
        }
    }

    fn resume(&mut self, job: &Job) -> bool {
        if self.active.job.is_idle()
            && !job.is_idle()
            && !self.paused.job.is_idle()
            && job.id() == self.paused.job.id()
        {
            self.active = self.paused.clone();
            return true;
        }
        false
    }

    fn adopt(&mut self, job: Job) {
        let lanes = self.engine.lanes();
        self.active.lanes.replicate(&job, lanes);
        self.active.nonces = nonce::partition(&job, self.id, self.threads, lanes);
        self.active.wrapped = false;
        self.active.job = job;
    }

    /// One batch: advance every lane, hash them in a single engine call and
    /// submit the digests that beat the target. Returns the shares found.
    pub fn step<S: ShareSink + ?Sized>(&mut self, sink: &S) -> usize {
        if self.active.job.is_idle() {
            return 0;
        }
        let lanes = self.engine.lanes();
        let nicehash = self.active.job.is_nicehash();

        for lane in 0..lanes {
            let (next, wrapped) = nonce::advance(self.active.nonces[lane], nicehash);
            if wrapped && !self.active.wrapped {
                warn!(
                    thread = self.id,
                    lane,
                    job = self.active.job.id(),
                    "nonce counter wrapped around"
                );
                self.active.wrapped = true;
            }
            self.active.nonces[lane] = next;
            self.active.lanes.set_nonce(lane, next);
        }

        self.engine.hash(
            self.active.lanes.as_input(),
            self.active.job.size(),
            &mut self.output.as_flattened_mut()[..HASH_SIZE * lanes],
            &mut self.ctx,
        );
        self.hashes += lanes as u64;

        let target = self.active.job.target();
        let mut found = 0;
        for lane in 0..lanes {
            if meets_target(&self.output[lane], target) {
                sink.submit(JobResult::new(
                    &self.active.job,
                    self.active.nonces[lane],
                    &self.output[lane],
                ));
                found += 1;
            }
        }
        found
    }

    /// Mine until the source's generation drops to 0
    pub fn run<J, S>(&mut self, source: &J, sink: &S, hashrate: &Hashrate)
    where
        J: JobSource + ?Sized,
        S: ShareSink + ?Sized,
    {
        debug!(thread = self.id, engine = ?self.engine, "worker started");

        while source.generation() > 0 {
            if source.is_paused() {
                source.wait_while_paused();
                if source.generation() == 0 {
                    break;
                }
                self.consume_job(source);
            }

            if self.active.job.is_idle() {
                source.wait_for_change(self.generation);
                self.consume_job(source);
                continue;
            }

            while !source.is_stale(self.generation) {
                if self.iterations & STATS_INTERVAL_MASK == 0 {
                    hashrate.add(self.id, self.hashes);
                }
                self.iterations += 1;

                self.step(sink);
                thread::yield_now();
            }

            self.consume_job(source);
        }

        hashrate.add(self.id, self.hashes);
        self.stopped = true;
        debug!(thread = self.id, hashes = self.hashes, "worker stopped");
    }
}
