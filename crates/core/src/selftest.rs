//! Self-test gate
//!
//! An engine may only be used for mining after it reproduces the golden
//! digest of a fixed plaintext on every lane.

use tracing::debug;

use crate::context::HashContext;
use crate::engine::{Algorithm, Engine, resolve};
use crate::error::EngineError;
use crate::params::{HASH_SIZE, MAX_LANES};

/// Fixed self-test plaintext, replicated once per lane
pub const SELF_TEST_INPUT: &[u8; 14] = b"This is a test";

/// CryptoNight("This is a test")
const CRYPTONIGHT_GOLDEN: [u8; HASH_SIZE] = [
    0xa0, 0x84, 0xf0, 0x1d, 0x14, 0x37, 0xa0, 0x9c, 0x69, 0x85, 0x40, 0x1b, 0x60, 0xd4, 0x35, 0x54,
    0xae, 0x10, 0x58, 0x02, 0xc5, 0xf5, 0xd8, 0xa9, 0xb3, 0x25, 0x36, 0x49, 0xc0, 0xbe, 0x66, 0x05,
];

/// CryptoNight-Lite("This is a test")
const CRYPTONIGHT_LITE_GOLDEN: [u8; HASH_SIZE] = [
    0x5a, 0x24, 0xa0, 0x29, 0xde, 0x1c, 0x39, 0x3f, 0x3d, 0x52, 0x7a, 0x2f, 0x9b, 0x39, 0xdc, 0x3d,
    0xb3, 0xbc, 0x87, 0x11, 0x8b, 0x84, 0x52, 0x9b, 0x9f, 0x00, 0x88, 0x49, 0x25, 0x4b, 0x05, 0xce,
];

/// Golden single-lane digest for an algorithm family
pub fn golden_digest(algorithm: Algorithm) -> &'static [u8; HASH_SIZE] {
    match algorithm {
        Algorithm::CryptoNight => &CRYPTONIGHT_GOLDEN,
        Algorithm::CryptoNightLite => &CRYPTONIGHT_LITE_GOLDEN,
    }
}

/// Expected output size and scratch memory ratio for a batch multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProfile {
    /// Bytes compared against the golden vector
    pub size: usize,
    /// Scratch memory multiplier
    pub ratio: usize,
}

impl BatchProfile {
    /// 1 → 32 bytes / ratio 1, ..., 5 → 160 bytes / ratio 5
    pub fn for_multiplier(multiplier: usize) -> Result<Self, EngineError> {
        if !(1..=MAX_LANES).contains(&multiplier) {
            return Err(EngineError::InvalidMultiplier(multiplier));
        }
        Ok(Self {
            size: HASH_SIZE * multiplier,
            ratio: multiplier,
        })
    }
}

/// Run `engine` over the self-test plaintext and compare every lane's digest
/// with the golden vector of `algorithm`.
pub fn self_test(engine: &Engine, algorithm: Algorithm, multiplier: usize) -> bool {
    let Ok(batch) = BatchProfile::for_multiplier(multiplier) else {
        return false;
    };

    if engine.lanes() != batch.ratio {
        debug!(
            lanes = engine.lanes(),
            multiplier, "engine lane count does not match the batch multiplier"
        );
        return false;
    }

    let input = SELF_TEST_INPUT.repeat(batch.ratio);
    let mut output = [0u8; HASH_SIZE * MAX_LANES];
    {
        let mut ctx = HashContext::new(algorithm, batch.ratio);
        engine.hash(&input, SELF_TEST_INPUT.len(), &mut output[..batch.size], &mut ctx);
    }

    let golden = golden_digest(algorithm);
    output[..batch.size]
        .chunks_exact(HASH_SIZE)
        .enumerate()
        .all(|(lane, digest)| {
            let ok = digest == golden;
            if !ok {
                debug!(
                    %algorithm,
                    variant = engine.variant().index(),
                    lane,
                    "self-test digest mismatch"
                );
            }
            ok
        })
}

/// Owner of the authorized engine.
///
/// Holds at most one engine that has passed the self-test; nothing else in
/// the process can replace it.
#[derive(Debug)]
pub struct EngineGate {
    engine: Option<Engine>,
    multiplier: usize,
}

impl EngineGate {
    /// Create a gate for the configured batch multiplier
    pub fn new(multiplier: usize) -> Result<Self, EngineError> {
        BatchProfile::for_multiplier(multiplier)?;
        Ok(Self {
            engine: None,
            multiplier,
        })
    }

    /// Configured batch multiplier
    pub fn multiplier(&self) -> usize {
        self.multiplier
    }

    /// Currently authorized engine, if any
    pub fn engine(&self) -> Option<Engine> {
        self.engine
    }

    /// Resolve `(algorithm, variant)` and run the self-test on the result.
    ///
    /// The engine is authorized only when both steps succeed. On failure the
    /// previously authorized engine (if any) stays in place.
    pub fn init(&mut self, algorithm: Algorithm, variant: i32) -> Result<Engine, EngineError> {
        let candidate = resolve(algorithm, variant)?;

        if !self_test(&candidate, algorithm, self.multiplier) {
            return Err(EngineError::SelfTestFailed {
                algorithm,
                variant,
                multiplier: self.multiplier,
            });
        }

        self.engine = Some(candidate);
        Ok(candidate)
    }

    /// Re-run the self-test on the authorized engine.
    ///
    /// Returns false when no engine has been authorized yet.
    pub fn self_test(&self, algorithm: Algorithm) -> bool {
        match &self.engine {
            Some(engine) => self_test(engine, algorithm, self.multiplier),
            None => false,
        }
    }
}

/// Resolve and verify an engine in one step
pub fn init(algorithm: Algorithm, variant: i32, multiplier: usize) -> Result<Engine, EngineError> {
    EngineGate::new(multiplier)?.init(algorithm, variant)
}
