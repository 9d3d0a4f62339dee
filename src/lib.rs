//! CryptoNight Miner Library
//!
//! The compute core of a CryptoNight proof-of-work client.
//!
//! # Overview
//!
//! A verified hash engine is handed to one worker per thread. Workers pull
//! jobs from a shared [`Workers`] hub, split the 32-bit nonce space among
//! themselves without overlap, hash up to five lanes per engine call and
//! queue every digest that beats the job target.
//!
//! # Features
//!
//! - **Self-test gate**: no worker starts on an engine that fails its golden
//!   vector
//! - **Collision-free nonces**: per-thread, per-lane partitions, nicehash
//!   aware
//! - **Pause/resume**: a worker going idle keeps its counters and picks them
//!   up again when the same job returns
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cnminer::algorithm::{init, Algorithm};
//! use cnminer::{Hashrate, Job, Workers};
//!
//! let engine = init(Algorithm::CryptoNight, 1, 1).expect("self-test");
//! let (hub, shares) = Workers::new();
//! let hashrate = Arc::new(Hashrate::new(2));
//! let handle = hub.start(engine, 2, &hashrate).unwrap();
//!
//! let blob = "0707".repeat(38);
//! hub.set_job(Job::from_hex(0, "job-1", &blob, "b88d0600", false).unwrap());
//!
//! if let Ok(share) = shares.recv() {
//!     println!("nonce {} diff {}", share.nonce_hex(), share.actual_diff());
//! }
//!
//! hub.stop();
//! handle.join();
//! ```

// Re-export the hash engines
pub use cnhash_core as algorithm;

pub mod config;
pub mod error;
pub mod hashrate;
pub mod job;
pub mod lanes;
pub mod logging;
pub mod nonce;
pub mod worker;
pub mod workers;

// Convenience re-exports
pub use config::{Config, EngineSettings};
pub use error::{ConfigError, JobError, MinerError};
pub use hashrate::Hashrate;
pub use job::{Job, JobResult};
pub use worker::{MultiWorker, WorkerMode};
pub use workers::{JobSource, ShareSink, Workers, WorkersHandle};

#[cfg(test)]
mod tests;
