//! Scratch memory for one hashing session

use crate::engine::Algorithm;
use crate::params::{MAX_LANES, STATE_SIZE};

/// Per-worker scratch context: one Keccak state and one scratchpad per lane.
///
/// Sized as `profile.memory × lanes` at construction. A context is owned by a
/// single thread and released when dropped.
pub struct HashContext {
    states: [[u8; STATE_SIZE]; MAX_LANES],
    memory: Vec<u8>,
}

impl HashContext {
    /// Allocate a context for `lanes` lanes of `algorithm`
    pub fn new(algorithm: Algorithm, lanes: usize) -> Self {
        Self {
            states: [[0u8; STATE_SIZE]; MAX_LANES],
            memory: vec![0u8; algorithm.profile().memory * lanes.clamp(1, MAX_LANES)],
        }
    }

    /// Scratchpad capacity in bytes
    pub fn capacity(&self) -> usize {
        self.memory.len()
    }

    /// Split into lane states and `lanes × memory` bytes of scratchpad.
    ///
    /// Grows the scratchpad if the context was sized for fewer lanes; a
    /// correctly sized context never reallocates here.
    pub(crate) fn prepare(
        &mut self,
        lanes: usize,
        memory: usize,
    ) -> (&mut [[u8; STATE_SIZE]; MAX_LANES], &mut [u8]) {
        let needed = lanes * memory;
        if self.memory.len() < needed {
            self.memory.resize(needed, 0);
        }
        (&mut self.states, &mut self.memory[..needed])
    }
}
