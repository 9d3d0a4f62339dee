//! # CryptoNight Hash Core
//!
//! Compiled CryptoNight kernels behind a variant registry, plus the self-test
//! gate that decides whether a kernel may be used for mining.
//!
//! ## Features
//!
//! - **Two families**: standard CryptoNight (2 MB) and CryptoNight-Lite (1 MB)
//! - **Batched kernels**: 1, 2, 3 or 5 lanes per call
//! - **Hardware or software AES**: runtime-detected AES-NI, or a portable
//!   table-driven round
//! - **Self-test gate**: an engine is handed out only after it reproduces the
//!   golden digest on every lane
//!
//! ## Variant table
//!
//! | index | lanes | AES      |
//! |-------|-------|----------|
//! | 1     | 1     | hardware |
//! | 2     | 2     | hardware |
//! | 3     | 1     | software |
//! | 4     | 2     | software |
//! | 5     | 3     | hardware |
//! | 6     | 3     | hardware (same entry as 5) |
//! | 7     | 5     | hardware |
//!
//! ## Example
//!
//! ```rust,no_run
//! use cnhash_core::{Algorithm, init, meets_target};
//!
//! // Resolve variant 1 and verify it against the golden vector
//! let engine = init(Algorithm::CryptoNight, 1, 1).expect("self-test");
//!
//! let mut ctx = engine.context();
//! let mut out = [0u8; 32];
//! engine.hash(b"This is a test", 14, &mut out, &mut ctx);
//!
//! if meets_target(&out, u64::MAX / 1000) {
//!     println!("share!");
//! }
//! ```

mod context;
mod cryptonight;
mod engine;
mod error;
mod params;
mod primitives;
mod selftest;

pub use context::HashContext;
pub use cryptonight::meets_target;
pub use engine::{Algorithm, Engine, HashFn, Kernel, Variant, resolve};
pub use error::EngineError;
pub use params::*;
pub use primitives::has_hardware_aes;
pub use selftest::{BatchProfile, EngineGate, SELF_TEST_INPUT, golden_digest, init, self_test};
