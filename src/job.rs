//! Job model
//!
//! A job is one unit of pool work: a blob carrying a 32-bit nonce field, a
//! 64-bit acceptance target and the identity needed to submit results. Jobs
//! are published by a [`JobSource`](crate::workers::JobSource) and every
//! worker holds its own copy.

use std::fmt;
use std::sync::Arc;

use crate::algorithm::HASH_SIZE;
use crate::error::JobError;

/// Largest blob a job can carry
pub const MAX_BLOB_SIZE: usize = 84;

/// Smallest accepted blob
pub const MIN_BLOB_SIZE: usize = 76;

/// Byte offset of the little-endian 32-bit nonce inside a blob
pub const NONCE_OFFSET: usize = 39;

/// Pool id of the idle sentinel job
pub const IDLE_POOL_ID: i32 = -1;

/// Nonce bits reserved by the pool in nicehash mode
pub const NICEHASH_MASK: u32 = 0xFF00_0000;

/// Read the nonce field of a blob
#[inline]
pub fn read_nonce(blob: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&blob[NONCE_OFFSET..NONCE_OFFSET + 4]);
    u32::from_le_bytes(raw)
}

/// Overwrite the nonce field of a blob
#[inline]
pub fn write_nonce(blob: &mut [u8], nonce: u32) {
    blob[NONCE_OFFSET..NONCE_OFFSET + 4].copy_from_slice(&nonce.to_le_bytes());
}

/// Parse a pool target.
///
/// Up to 8 hex characters are a compact 32-bit target, expanded to 64 bits;
/// up to 16 characters are the full little-endian 64-bit value.
pub fn parse_target(target_hex: &str) -> Result<u64, JobError> {
    let len = target_hex.len();
    if len == 0 || len > 16 || len % 2 != 0 {
        return Err(JobError::TargetHex(format!(
            "expected 2..=16 hex characters, got {}",
            len
        )));
    }

    let bytes = hex::decode(target_hex).map_err(|e| JobError::TargetHex(e.to_string()))?;
    let mut raw = [0u8; 8];
    raw[..bytes.len()].copy_from_slice(&bytes);

    let target = if len <= 8 {
        let compact = u64::from(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]));
        if compact == 0 {
            return Err(JobError::ZeroTarget);
        }
        u64::MAX / (u64::from(u32::MAX) / compact)
    } else {
        u64::from_le_bytes(raw)
    };

    if target == 0 {
        return Err(JobError::ZeroTarget);
    }
    Ok(target)
}

/// One unit of mining work
#[derive(Clone)]
pub struct Job {
    pool_id: i32,
    id: Arc<str>,
    blob: [u8; MAX_BLOB_SIZE],
    size: usize,
    target: u64,
    diff: u64,
    nicehash: bool,
}

impl Job {
    /// The "no live work" sentinel (pool id -1, empty blob)
    pub fn idle() -> Self {
        Self {
            pool_id: IDLE_POOL_ID,
            id: Arc::from(""),
            blob: [0u8; MAX_BLOB_SIZE],
            size: 0,
            target: 0,
            diff: 0,
            nicehash: false,
        }
    }

    /// Build a job from a raw blob and a 64-bit target.
    ///
    /// A blob whose nonce field is already non-zero belongs to a nicehash
    /// pool, whatever `nicehash` says.
    pub fn new(
        pool_id: i32,
        id: &str,
        blob: &[u8],
        target: u64,
        nicehash: bool,
    ) -> Result<Self, JobError> {
        if !(MIN_BLOB_SIZE..=MAX_BLOB_SIZE).contains(&blob.len()) {
            return Err(JobError::BlobSize(blob.len()));
        }
        if target == 0 {
            return Err(JobError::ZeroTarget);
        }

        let mut data = [0u8; MAX_BLOB_SIZE];
        data[..blob.len()].copy_from_slice(blob);

        Ok(Self {
            pool_id,
            id: Arc::from(id),
            blob: data,
            size: blob.len(),
            target,
            diff: u64::MAX / target,
            nicehash: nicehash || read_nonce(blob) != 0,
        })
    }

    /// Build a job from its hex wire representation
    pub fn from_hex(
        pool_id: i32,
        id: &str,
        blob_hex: &str,
        target_hex: &str,
        nicehash: bool,
    ) -> Result<Self, JobError> {
        let blob = hex::decode(blob_hex).map_err(JobError::BlobHex)?;
        let target = parse_target(target_hex)?;
        Self::new(pool_id, id, &blob, target, nicehash)
    }

    pub fn pool_id(&self) -> i32 {
        self.pool_id
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Blob bytes, `size()` long
    pub fn blob(&self) -> &[u8] {
        &self.blob[..self.size]
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    /// Pool difficulty, `u64::MAX / target`
    pub fn diff(&self) -> u64 {
        self.diff
    }

    pub fn is_nicehash(&self) -> bool {
        self.nicehash
    }

    /// True for the idle sentinel
    pub fn is_idle(&self) -> bool {
        self.pool_id == IDLE_POOL_ID
    }

    /// Nonce field as published by the pool
    pub fn nonce(&self) -> u32 {
        if self.size == 0 {
            return 0;
        }
        read_nonce(self.blob())
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.target == other.target && self.blob() == other.blob()
    }
}

impl Eq for Job {}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("pool_id", &self.pool_id)
            .field("id", &self.id)
            .field("size", &self.size)
            .field("diff", &self.diff)
            .field("nicehash", &self.nicehash)
            .finish()
    }
}

/// A share found by a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub pool_id: i32,
    pub job_id: Arc<str>,
    pub nonce: u32,
    pub digest: [u8; HASH_SIZE],
    /// Pool difficulty of the job the share was found for
    pub diff: u64,
}

impl JobResult {
    pub fn new(job: &Job, nonce: u32, digest: &[u8; HASH_SIZE]) -> Self {
        Self {
            pool_id: job.pool_id,
            job_id: Arc::clone(&job.id),
            nonce,
            digest: *digest,
            diff: job.diff,
        }
    }

    /// Nonce as submitted to pools: its 4 little-endian bytes in hex
    pub fn nonce_hex(&self) -> String {
        hex::encode(self.nonce.to_le_bytes())
    }

    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Difficulty actually reached by the digest
    pub fn actual_diff(&self) -> u64 {
        let mut tail = [0u8; 8];
        tail.copy_from_slice(&self.digest[24..32]);
        match u64::from_le_bytes(tail) {
            0 => u64::MAX,
            value => u64::MAX / value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob_hex(nonce: u32) -> String {
        let mut blob = [0x11u8; MIN_BLOB_SIZE];
        write_nonce(&mut blob, nonce);
        hex::encode(blob)
    }

    #[test]
    fn test_compact_target() {
        let target = parse_target("b88d0600").unwrap();
        assert_eq!(u64::MAX / target, 10000);
    }

    #[test]
    fn test_full_target() {
        let target = parse_target("0000000000001000").unwrap();
        assert_eq!(target, 0x0010_0000_0000_0000);
    }

    #[test]
    fn test_bad_targets() {
        assert!(matches!(parse_target("00000000"), Err(JobError::ZeroTarget)));
        assert!(matches!(parse_target(""), Err(JobError::TargetHex(_))));
        assert!(matches!(parse_target("abc"), Err(JobError::TargetHex(_))));
        assert!(matches!(parse_target("zz00"), Err(JobError::TargetHex(_))));
        assert!(parse_target("000000000000000000").is_err());
    }

    #[test]
    fn test_blob_size_bounds() {
        let too_short = hex::encode([0u8; MIN_BLOB_SIZE - 1]);
        let too_long = hex::encode([0u8; MAX_BLOB_SIZE + 1]);
        assert!(matches!(
            Job::from_hex(0, "a", &too_short, "b88d0600", false),
            Err(JobError::BlobSize(75))
        ));
        assert!(matches!(
            Job::from_hex(0, "a", &too_long, "b88d0600", false),
            Err(JobError::BlobSize(85))
        ));
        let longest = hex::encode([0u8; MAX_BLOB_SIZE]);
        let job = Job::from_hex(0, "a", &longest, "b88d0600", false).unwrap();
        assert_eq!(job.size(), MAX_BLOB_SIZE);
    }

    #[test]
    fn test_nonzero_nonce_implies_nicehash() {
        let plain = Job::from_hex(0, "a", &blob_hex(0), "b88d0600", false).unwrap();
        assert!(!plain.is_nicehash());

        let reserved = Job::from_hex(0, "a", &blob_hex(0x2a00_0000), "b88d0600", false).unwrap();
        assert!(reserved.is_nicehash());
        assert_eq!(reserved.nonce(), 0x2a00_0000);
    }

    #[test]
    fn test_structural_equality() {
        let a = Job::from_hex(0, "job-1", &blob_hex(0), "b88d0600", false).unwrap();
        let same_on_other_pool =
            Job::from_hex(1, "job-1", &blob_hex(0), "b88d0600", false).unwrap();
        let other_id = Job::from_hex(0, "job-2", &blob_hex(0), "b88d0600", false).unwrap();
        let other_target = Job::from_hex(0, "job-1", &blob_hex(0), "e4a63d00", false).unwrap();

        assert_eq!(a, same_on_other_pool);
        assert_ne!(a, other_id);
        assert_ne!(a, other_target);
        assert_eq!(Job::idle(), Job::idle());
        assert_ne!(a, Job::idle());
    }

    #[test]
    fn test_result_encoding() {
        let job = Job::from_hex(3, "j", &blob_hex(0), "b88d0600", false).unwrap();
        let mut digest = [0u8; HASH_SIZE];
        digest[24..32].copy_from_slice(&(u64::MAX / 20000).to_le_bytes());

        let result = JobResult::new(&job, 0x0102_0304, &digest);
        assert_eq!(result.nonce_hex(), "04030201");
        assert_eq!(result.pool_id, 3);
        assert_eq!(&*result.job_id, "j");
        assert_eq!(result.diff, 10000);
        assert_eq!(result.actual_diff(), 20000);
        assert_eq!(result.digest_hex().len(), 64);
    }
}
