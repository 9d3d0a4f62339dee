//! Tests for the worker state machine, nonce partitioning and the job hub

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;

use crate::algorithm::{resolve, Algorithm, Engine, HASH_SIZE, MAX_LANES};
use crate::hashrate::{Hashrate, LARGE_INTERVAL, SHORT_INTERVAL};
use crate::job::{write_nonce, Job, JobResult, MAX_BLOB_SIZE, MIN_BLOB_SIZE};
use crate::lanes::LaneBuffer;
use crate::nonce::{advance, nicehash_starts, normal_starts, partition_width};
use crate::worker::{MultiWorker, WorkerMode};
use crate::workers::{JobSource, ShareSink, Workers};

const SHARE_TIMEOUT: Duration = Duration::from_secs(60);

fn lite_engine(variant: i32) -> Engine {
    resolve(Algorithm::CryptoNightLite, variant).unwrap()
}

fn blob(seed: u8, nonce: u32) -> Vec<u8> {
    let mut blob = vec![seed; MIN_BLOB_SIZE];
    write_nonce(&mut blob, nonce);
    blob
}

fn job(id: &str, seed: u8) -> Job {
    Job::new(0, id, &blob(seed, 0), u64::MAX, false).unwrap()
}

fn drain(rx: &Receiver<JobResult>) -> Vec<JobResult> {
    rx.try_iter().collect()
}

#[derive(Default)]
struct CollectSink(std::sync::Mutex<Vec<JobResult>>);

impl ShareSink for CollectSink {
    fn submit(&self, result: JobResult) {
        self.0.lock().unwrap().push(result);
    }
}

impl CollectSink {
    fn take(&self) -> Vec<JobResult> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

#[test]
fn test_partitions_tile_nonce_space() {
    for threads in [1usize, 2, 3, 4, 5, 7, 8, 12, 16, 64, 255, 1000] {
        let width = u64::from(partition_width(threads));
        let mut starts: Vec<u64> = (0..threads)
            .flat_map(|thread| normal_starts(thread, threads))
            .map(u64::from)
            .collect();
        starts.sort_unstable();

        assert_eq!(starts.len(), threads * 5);
        assert_eq!(starts[0], 0);
        for pair in starts.windows(2) {
            assert_eq!(pair[1] - pair[0], width, "threads = {}", threads);
        }

        // Only the rounding remainder past the last partition is unassigned
        let end = starts[starts.len() - 1] + width;
        assert!(end <= 1u64 << 32);
        assert!((1u64 << 32) - end <= (threads * 5) as u64);
    }
}

#[test]
fn test_lane_partitions_interleave_threads() {
    let width = partition_width(4);
    let starts = normal_starts(1, 4);
    assert_eq!(starts, [width, width * 5, width * 9, width * 13, width * 17]);
}

#[test]
fn test_nicehash_partitions_keep_reserved_byte() {
    let threads = 3;
    let mut seen = HashSet::new();
    for thread in 0..threads {
        let starts = nicehash_starts(0x2a12_3456, thread, threads, 2);
        for start in &starts[..2] {
            assert_eq!(start >> 24, 0x2a);
            assert!(seen.insert(*start));
        }
    }

    let width = 0x00FF_FFFF / 6;
    let starts = nicehash_starts(0x2a00_0000, 1, 3, 1);
    assert_eq!(starts[0], 0x2a00_0000 + width);
    assert_eq!(starts[1], 0x2a00_0000 + width * 4);
}

#[test]
fn test_nicehash_wide_engines_get_own_partitions() {
    let mut seen = HashSet::new();
    for thread in 0..2 {
        for start in nicehash_starts(0x7700_0000, thread, 2, 5) {
            assert_eq!(start & 0xFF00_0000, 0x7700_0000);
            assert!(seen.insert(start));
        }
    }
    assert_eq!(seen.len(), 10);
}

#[test]
fn test_counter_wraparound() {
    assert_eq!(advance(41, false), (42, false));
    assert_eq!(advance(u32::MAX, false), (0, true));

    assert_eq!(advance(0x2a00_0010, true), (0x2a00_0011, false));
    assert_eq!(advance(0x2aff_ffff, true), (0x2a00_0000, true));
}

#[test]
fn test_lane_buffer_nonce_fields_are_independent() {
    let job = Job::new(0, "j", &blob(0xAB, 0), u64::MAX, false).unwrap();
    let mut lanes = LaneBuffer::new();
    lanes.replicate(&job, 3);

    assert_eq!(lanes.as_input().len(), MIN_BLOB_SIZE * 3);
    lanes.set_nonce(1, 0xDEAD_BEEF);

    assert_eq!(lanes.nonce(0), 0);
    assert_eq!(lanes.nonce(1), 0xDEAD_BEEF);
    assert_eq!(lanes.nonce(2), 0);
    assert_eq!(lanes.lane(0), job.blob());
    assert_eq!(lanes.lane(2), job.blob());

    let mut expected = job.blob().to_vec();
    write_nonce(&mut expected, 0xDEAD_BEEF);
    assert_eq!(lanes.lane(1), expected.as_slice());
}

#[test]
fn test_new_job_is_partitioned() {
    let (hub, _rx) = Workers::new();
    let mut worker = MultiWorker::new(1, 3, lite_engine(1));
    assert_eq!(worker.mode(), WorkerMode::Idle);

    hub.set_job(job("a", 1));
    worker.consume_job(&*hub);

    assert_eq!(worker.mode(), WorkerMode::Mining);
    assert_eq!(worker.active().nonces(), &normal_starts(1, 3));
    assert_eq!(worker.active().lanes().lanes(), 1);
    assert_eq!(worker.generation(), hub.generation());
}

#[test]
fn test_redundant_job_keeps_progress() {
    let (hub, _rx) = Workers::new();
    let sink = CollectSink::default();
    let mut worker = MultiWorker::new(0, 1, lite_engine(1));

    hub.set_job(job("a", 1));
    worker.consume_job(&*hub);
    worker.step(&sink);
    worker.step(&sink);
    let progress = *worker.active().nonces();
    assert_eq!(progress[0], 2);

    // Same id, blob and target broadcast again
    hub.set_job(job("a", 1));
    assert!(hub.is_stale(worker.generation()));
    worker.consume_job(&*hub);

    assert!(!hub.is_stale(worker.generation()));
    assert_eq!(worker.active().nonces(), &progress);
}

#[test]
fn test_pause_resume_restores_counters() {
    let (hub, _rx) = Workers::new();
    let sink = CollectSink::default();
    let mut worker = MultiWorker::new(0, 2, lite_engine(2));

    hub.set_job(job("a", 1));
    worker.consume_job(&*hub);
    for _ in 0..3 {
        worker.step(&sink);
    }
    let progress = *worker.active().nonces();
    let start = normal_starts(0, 2);
    assert_eq!(progress[0], start[0] + 3);
    assert_eq!(progress[1], start[1] + 3);

    // Pool goes away
    hub.set_job(Job::idle());
    worker.consume_job(&*hub);
    assert_eq!(worker.mode(), WorkerMode::PausedWithMemory);
    assert!(worker.active().job().is_idle());
    assert_eq!(worker.paused().nonces(), &progress);

    // Same job comes back
    hub.set_job(job("a", 1));
    worker.consume_job(&*hub);
    assert_eq!(worker.mode(), WorkerMode::Mining);
    assert_eq!(worker.active().nonces(), &progress);
    assert_eq!(worker.active().lanes().nonce(0), progress[0]);
    assert_eq!(worker.active().lanes().nonce(1), progress[1]);

    // Continues exactly where it stopped
    sink.take();
    worker.step(&sink);
    let nonces: Vec<u32> = sink.take().iter().map(|r| r.nonce).collect();
    assert_eq!(nonces, vec![progress[0] + 1, progress[1] + 1]);
}

#[test]
fn test_empty_job_id_is_mined_without_saved_state() {
    let (hub, _rx) = Workers::new();
    let sink = CollectSink::default();
    let mut worker = MultiWorker::new(0, 1, lite_engine(1));

    // Nothing saved yet: an empty id must not match the idle snapshot
    hub.set_job(job("", 1));
    worker.consume_job(&*hub);
    assert_eq!(worker.mode(), WorkerMode::Mining);
    assert_eq!(worker.active().job().id(), "");
    assert_eq!(worker.active().nonces()[0], normal_starts(0, 1)[0]);
    assert_eq!(worker.step(&sink), 1);

    // An idle broadcast to a worker with nothing saved changes nothing either
    let mut fresh = MultiWorker::new(0, 1, lite_engine(1));
    hub.set_job(Job::idle());
    fresh.consume_job(&*hub);
    assert_eq!(fresh.mode(), WorkerMode::Idle);
    hub.set_job(job("", 2));
    fresh.consume_job(&*hub);
    assert_eq!(fresh.mode(), WorkerMode::Mining);
    assert_eq!(fresh.step(&sink), 1);
}

#[test]
fn test_other_job_after_idle_is_repartitioned() {
    let (hub, _rx) = Workers::new();
    let sink = CollectSink::default();
    let mut worker = MultiWorker::new(0, 1, lite_engine(1));

    hub.set_job(job("a", 1));
    worker.consume_job(&*hub);
    worker.step(&sink);

    hub.set_job(Job::idle());
    worker.consume_job(&*hub);

    hub.set_job(job("b", 2));
    worker.consume_job(&*hub);
    assert_eq!(worker.active().job().id(), "b");
    assert_eq!(worker.active().nonces(), &normal_starts(0, 1));
}

#[test]
fn test_step_submits_every_lane_with_its_digest() {
    let (hub, _rx) = Workers::new();
    let sink = CollectSink::default();
    let engine = lite_engine(2);
    let mut worker = MultiWorker::new(0, 1, engine);

    hub.set_job(job("a", 9));
    worker.consume_job(&*hub);
    assert_eq!(worker.step(&sink), 2);

    let shares = sink.take();
    assert_eq!(shares.len(), 2);

    let single = lite_engine(1);
    let mut ctx = single.context();
    for share in shares {
        assert_eq!(&*share.job_id, "a");
        let mut input = blob(9, share.nonce);
        let mut digest = [0u8; HASH_SIZE];
        single.hash(&input, input.len(), &mut digest, &mut ctx);
        assert_eq!(share.digest, digest);

        // Any other nonce gives another digest
        write_nonce(&mut input, share.nonce + 1);
        single.hash(&input, input.len(), &mut digest, &mut ctx);
        assert_ne!(share.digest, digest);
    }
}

#[test]
fn test_nothing_beats_minimal_target() {
    let (hub, _rx) = Workers::new();
    let sink = CollectSink::default();
    let mut worker = MultiWorker::new(0, 1, lite_engine(1));

    hub.set_job(Job::new(0, "hard", &blob(3, 0), 1, false).unwrap());
    worker.consume_job(&*hub);
    for _ in 0..4 {
        assert_eq!(worker.step(&sink), 0);
    }
    assert_eq!(worker.hashes(), 4);
    assert!(sink.take().is_empty());
}

#[test]
fn test_hub_generation_rules() {
    let (hub, _rx) = Workers::new();
    assert_eq!(hub.generation(), 1);
    assert!(hub.current_job().is_idle());

    hub.set_job(job("a", 1));
    assert_eq!(hub.generation(), 2);

    hub.pause();
    assert!(hub.is_paused());
    assert_eq!(hub.generation(), 3);

    hub.set_job(job("a", 1));
    assert!(!hub.is_paused());
    assert_eq!(hub.generation(), 4);

    hub.stop();
    assert_eq!(hub.generation(), 0);
    hub.set_job(job("b", 2));
    hub.pause();
    assert_eq!(hub.generation(), 0);
}

#[test]
fn test_workers_find_and_queue_shares() {
    let (hub, rx) = Workers::new();
    let hashrate = Arc::new(Hashrate::new(2));
    let handle = hub.start(lite_engine(1), 2, &hashrate).unwrap();
    assert_eq!(handle.threads(), 2);

    hub.set_job(job("a", 5));

    let mut nonces = HashSet::new();
    for _ in 0..6 {
        let share = rx.recv_timeout(SHARE_TIMEOUT).unwrap();
        assert_eq!(&*share.job_id, "a");
        assert!(nonces.insert(share.nonce), "duplicate nonce {}", share.nonce);
    }

    // Each thread hashes from its own partition
    let width = partition_width(2);
    assert!(nonces.iter().all(|n| *n <= 16 || (*n > width && *n <= width + 16)));

    hub.stop();
    handle.join();
}

#[test]
fn test_stale_job_is_abandoned() {
    let (hub, rx) = Workers::new();
    let hashrate = Arc::new(Hashrate::new(1));
    let handle = hub.start(lite_engine(1), 1, &hashrate).unwrap();

    hub.set_job(job("old", 1));
    assert_eq!(&*rx.recv_timeout(SHARE_TIMEOUT).unwrap().job_id, "old");

    hub.set_job(job("new", 2));
    loop {
        let share = rx.recv_timeout(SHARE_TIMEOUT).unwrap();
        if &*share.job_id == "new" {
            break;
        }
    }

    // Once the single worker produced for the new job it never goes back
    for _ in 0..3 {
        let share = rx.recv_timeout(SHARE_TIMEOUT).unwrap();
        assert_eq!(&*share.job_id, "new");
    }

    hub.stop();
    handle.join();
}

#[test]
fn test_pause_stops_share_flow() {
    let (hub, rx) = Workers::new();
    let hashrate = Arc::new(Hashrate::new(1));
    let handle = hub.start(lite_engine(1), 1, &hashrate).unwrap();

    hub.set_job(job("a", 1));
    let first = rx.recv_timeout(SHARE_TIMEOUT).unwrap();

    hub.pause();
    thread::sleep(Duration::from_millis(500));
    let last = drain(&rx).last().map_or(first.nonce, |r| r.nonce);
    assert!(rx.recv_timeout(Duration::from_millis(800)).is_err());

    // Resuming the same job continues the same counter
    hub.set_job(job("a", 1));
    let next = rx.recv_timeout(SHARE_TIMEOUT).unwrap();
    assert_eq!(next.nonce, last + 1);

    hub.stop();
    handle.join();
}

#[test]
fn test_stop_wakes_idle_workers() {
    let (hub, _rx) = Workers::new();
    let hashrate = Arc::new(Hashrate::new(3));
    let handle = hub.start(lite_engine(1), 3, &hashrate).unwrap();

    thread::sleep(Duration::from_millis(50));
    hub.stop();
    handle.join();
}

#[test]
fn test_hashrate_windows() {
    let hashrate = Hashrate::new(2);
    hashrate.add_at(0, 0, 0);
    hashrate.add_at(0, 1000, 1000);
    hashrate.add_at(0, 2000, 2000);
    hashrate.add_at(1, 0, 0);
    hashrate.add_at(1, 500, 2000);

    let short = Duration::from_millis(2500);
    assert_eq!(hashrate.calc_at(0, short, 3000), Some(1000.0));
    assert_eq!(hashrate.calc_at(1, short, 3000), Some(250.0));
    assert_eq!(hashrate.total_at(short, 3000), Some(1250.0));

    // Not enough history for a minute
    assert_eq!(hashrate.calc_at(0, Duration::from_secs(60), 3000), None);
    assert_eq!(hashrate.total_at(Duration::from_secs(60), 3000), None);
    assert_eq!(hashrate.calc_at(5, short, 3000), None);
}

#[test]
fn test_hashrate_fast_samples_cover_large_window() {
    // 10 hashes per ms, sampled every 10 ms for 16 minutes
    let hashrate = Hashrate::new(1);
    for i in 0..=96_000u64 {
        hashrate.add_at(0, i * 100, i * 10);
    }

    let now = 960_000;
    let large = hashrate.calc_at(0, LARGE_INTERVAL, now).unwrap();
    assert!((large - 10_000.0).abs() < 1.0, "large window rate {large}");
    let short = hashrate.calc_at(0, SHORT_INTERVAL, now).unwrap();
    assert!((short - 10_000.0).abs() < 1.0, "short window rate {short}");
}

#[test]
fn test_max_lanes_fit_lane_buffer() {
    let job = Job::new(0, "big", &[7u8; MAX_BLOB_SIZE], u64::MAX, false).unwrap();
    let mut lanes = LaneBuffer::new();
    lanes.replicate(&job, MAX_LANES);
    assert_eq!(lanes.as_input().len(), MAX_BLOB_SIZE * MAX_LANES);
    lanes.set_nonce(MAX_LANES - 1, 5);
    assert_eq!(lanes.nonce(MAX_LANES - 1), 5);
}
