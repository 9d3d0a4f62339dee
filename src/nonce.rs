//! Nonce partitioning
//!
//! Splits the 32-bit nonce space so that no two `(worker, lane)` pairs hash
//! the same nonce for the same job.
//!
//! - Normal mode: the full space is cut into `threads × 5` equal partitions;
//!   worker `i` lane `k` starts at partition `i + k × threads`.
//! - Nicehash mode: the top byte is reserved by the pool and only the low 24
//!   bits are cut, into `threads × max(2, lanes)` partitions.
//!
//! Counters are advanced before each hash, so the first nonce hashed by a
//! lane is its start plus one.

use crate::algorithm::MAX_LANES;
use crate::job::{Job, NICEHASH_MASK};

/// Lanes partitioned for a normal job
pub const NORMAL_LANES: usize = MAX_LANES;

/// Minimum lanes partitioned for a nicehash job
pub const NICEHASH_LANES: usize = 2;

const NORMAL_SPACE: u64 = 0xFFFF_FFFF;
const NICEHASH_SPACE: u64 = 0x00FF_FFFF;

/// Width of one normal-mode partition
pub fn partition_width(threads: usize) -> u32 {
    (NORMAL_SPACE / (threads.max(1) as u64 * NORMAL_LANES as u64)) as u32
}

/// Normal-mode starting counters of worker `thread` out of `threads`
pub fn normal_starts(thread: usize, threads: usize) -> [u32; MAX_LANES] {
    let threads = threads.max(1) as u64;
    let width = u64::from(partition_width(threads as usize));

    let mut starts = [0u32; MAX_LANES];
    for (lane, start) in starts.iter_mut().enumerate() {
        *start = (width * (thread as u64 + lane as u64 * threads)) as u32;
    }
    starts
}

/// Nicehash-mode starting counters. `base` is the job's nonce, whose top
/// byte is kept on every lane.
pub fn nicehash_starts(base: u32, thread: usize, threads: usize, lanes: usize) -> [u32; MAX_LANES] {
    let threads = threads.max(1) as u64;
    let parts = lanes.clamp(NICEHASH_LANES, MAX_LANES);
    let width = NICEHASH_SPACE / (threads * parts as u64);
    let reserved = base & NICEHASH_MASK;

    let mut starts = [reserved; MAX_LANES];
    for (lane, start) in starts.iter_mut().take(parts).enumerate() {
        *start = reserved + (width * (thread as u64 + lane as u64 * threads)) as u32;
    }
    starts
}

/// Starting counters for a freshly adopted job
pub fn partition(job: &Job, thread: usize, threads: usize, lanes: usize) -> [u32; MAX_LANES] {
    if job.is_nicehash() {
        nicehash_starts(job.nonce(), thread, threads, lanes)
    } else {
        normal_starts(thread, threads)
    }
}

/// Advance one lane counter. Returns the new value and whether it wrapped.
///
/// Normal counters wrap from `u32::MAX` to 0. Nicehash counters wrap within
/// the low 24 bits and never touch the reserved byte.
#[inline]
pub fn advance(nonce: u32, nicehash: bool) -> (u32, bool) {
    if nicehash {
        let low = nonce.wrapping_add(1) & !NICEHASH_MASK;
        ((nonce & NICEHASH_MASK) | low, low == 0)
    } else {
        let next = nonce.wrapping_add(1);
        (next, next == 0)
    }
}
