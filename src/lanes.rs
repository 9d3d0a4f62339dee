//! Multi-lane input buffer
//!
//! One contiguous buffer holding `lanes` back-to-back copies of a job blob.
//! Lanes are only reachable through their index, and only the nonce field of
//! a lane can be changed after [`LaneBuffer::replicate`].

use crate::algorithm::MAX_LANES;
use crate::job::{read_nonce, write_nonce, Job, MAX_BLOB_SIZE};

#[derive(Clone)]
pub struct LaneBuffer {
    data: [u8; MAX_BLOB_SIZE * MAX_LANES],
    size: usize,
    lanes: usize,
}

impl LaneBuffer {
    pub fn new() -> Self {
        Self {
            data: [0u8; MAX_BLOB_SIZE * MAX_LANES],
            size: 0,
            lanes: 0,
        }
    }

    /// Fill the first `lanes` slots with copies of the job blob
    pub fn replicate(&mut self, job: &Job, lanes: usize) {
        let lanes = lanes.min(MAX_LANES);
        let blob = job.blob();

        self.size = blob.len();
        self.lanes = lanes;
        for slot in self.data[..lanes * self.size].chunks_exact_mut(self.size.max(1)) {
            slot.copy_from_slice(blob);
        }
    }

    /// Blob size of every lane
    pub fn blob_size(&self) -> usize {
        self.size
    }

    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Bytes of one lane
    pub fn lane(&self, lane: usize) -> &[u8] {
        assert!(lane < self.lanes, "lane {} out of {}", lane, self.lanes);
        &self.data[lane * self.size..(lane + 1) * self.size]
    }

    /// Nonce currently written into a lane
    pub fn nonce(&self, lane: usize) -> u32 {
        read_nonce(self.lane(lane))
    }

    /// Write a nonce into a lane's nonce field
    #[inline]
    pub fn set_nonce(&mut self, lane: usize, nonce: u32) {
        assert!(lane < self.lanes, "lane {} out of {}", lane, self.lanes);
        let size = self.size;
        write_nonce(&mut self.data[lane * size..(lane + 1) * size], nonce);
    }

    /// All lanes back to back, ready for a batched engine call
    pub fn as_input(&self) -> &[u8] {
        &self.data[..self.lanes * self.size]
    }
}

impl Default for LaneBuffer {
    fn default() -> Self {
        Self::new()
    }
}
