//! Hashrate collector
//!
//! Each worker records `(total hashes, timestamp)` samples into its own ring.
//! Rates are derived from the newest sample and the newest one that is older
//! than the requested window.
//!
//! The newest sample keeps being overwritten until it is [`SAMPLE_SPACING_MS`]
//! past the one before it, so the ring spans [`LARGE_INTERVAL`] however fast
//! the engine is.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::info;

pub const SHORT_INTERVAL: Duration = Duration::from_millis(2500);
pub const MEDIUM_INTERVAL: Duration = Duration::from_secs(60);
pub const LARGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Minimum gap between two kept samples
pub const SAMPLE_SPACING_MS: u64 = 250;

/// Samples kept per thread
pub const SAMPLES: usize = (LARGE_INTERVAL.as_secs() * 1000 / SAMPLE_SPACING_MS) as usize + 8;

#[derive(Debug)]
pub struct Hashrate {
    started: Instant,
    threads: Vec<Mutex<VecDeque<(u64, u64)>>>,
    highest: Mutex<f64>,
}

impl Hashrate {
    pub fn new(threads: usize) -> Self {
        Self {
            started: Instant::now(),
            threads: (0..threads)
                .map(|_| Mutex::new(VecDeque::with_capacity(SAMPLES)))
                .collect(),
            highest: Mutex::new(0.0),
        }
    }

    pub fn threads(&self) -> usize {
        self.threads.len()
    }

    /// Milliseconds since the collector was created
    pub fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Record the running hash count of `thread`
    pub fn add(&self, thread: usize, count: u64) {
        self.add_at(thread, count, self.now_ms());
    }

    pub fn add_at(&self, thread: usize, count: u64, timestamp_ms: u64) {
        let Some(ring) = self.threads.get(thread) else {
            return;
        };
        let mut ring = ring.lock().unwrap_or_else(PoisonError::into_inner);
        let len = ring.len();
        if len >= 2 && ring[len - 1].1.saturating_sub(ring[len - 2].1) < SAMPLE_SPACING_MS {
            ring[len - 1] = (count, timestamp_ms);
            return;
        }
        if len == SAMPLES {
            ring.pop_front();
        }
        ring.push_back((count, timestamp_ms));
    }

    /// Hashes per second of one thread over `window`
    pub fn calc(&self, thread: usize, window: Duration) -> Option<f64> {
        self.calc_at(thread, window, self.now_ms())
    }

    pub fn calc_at(&self, thread: usize, window: Duration, now_ms: u64) -> Option<f64> {
        let window = window.as_millis() as u64;
        let ring = self
            .threads
            .get(thread)?
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let &(latest_count, latest_ts) = ring.back()?;
        let &(earliest_count, earliest_ts) = ring
            .iter()
            .rev()
            .find(|(_, ts)| now_ms.saturating_sub(*ts) > window)?;

        let elapsed = latest_ts.checked_sub(earliest_ts).filter(|ms| *ms > 0)?;
        let hashes = latest_count.saturating_sub(earliest_count);
        Some(hashes as f64 / elapsed as f64 * 1000.0)
    }

    /// Sum of all threads that have enough samples for `window`
    pub fn total(&self, window: Duration) -> Option<f64> {
        self.total_at(window, self.now_ms())
    }

    pub fn total_at(&self, window: Duration, now_ms: u64) -> Option<f64> {
        (0..self.threads.len())
            .filter_map(|thread| self.calc_at(thread, window, now_ms))
            .reduce(|a, b| a + b)
    }

    /// Fold the current short-window total into the highest rate seen
    pub fn update_highest(&self) {
        if let Some(rate) = self.total(SHORT_INTERVAL) {
            let mut highest = self.highest.lock().unwrap_or_else(PoisonError::into_inner);
            if rate > *highest {
                *highest = rate;
            }
        }
    }

    pub fn highest(&self) -> f64 {
        *self.highest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Log the 2.5 s / 60 s / 15 min totals
    pub fn print(&self) {
        info!(
            "speed 2.5s/60s/15m {} {} {} H/s max {:.1} H/s",
            format_rate(self.total(SHORT_INTERVAL)),
            format_rate(self.total(MEDIUM_INTERVAL)),
            format_rate(self.total(LARGE_INTERVAL)),
            self.highest()
        );
    }
}

fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(rate) => format!("{:.1}", rate),
        None => "n/a".to_string(),
    }
}
