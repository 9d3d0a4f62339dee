//! CryptoNight Algorithm Parameters
//!
//! Each algorithm family carries one memory-hardness profile: the scratchpad
//! size per lane, the number of main-loop iterations and the address mask.

/// Memory-hardness profile compiled into a hash engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryProfile {
    /// Scratchpad size per lane in bytes
    pub memory: usize,
    /// Main loop iterations
    pub iterations: usize,
    /// Scratchpad address mask (16-byte aligned)
    pub mask: usize,
}

/// Standard CryptoNight: 2 MB scratchpad
pub const CRYPTONIGHT: MemoryProfile = MemoryProfile {
    memory: 2 * 1024 * 1024,
    iterations: 0x80000,
    mask: 0x1F_FFF0,
};

/// CryptoNight-Lite: 1 MB scratchpad
pub const CRYPTONIGHT_LITE: MemoryProfile = MemoryProfile {
    memory: 1024 * 1024,
    iterations: 0x40000,
    mask: 0xF_FFF0,
};

/// Digest size per lane
pub const HASH_SIZE: usize = 32;

/// Maximum number of lanes a single engine call can batch
pub const MAX_LANES: usize = 5;

/// Keccak-1600 state size
pub const STATE_SIZE: usize = 200;

/// AES block size
pub const AES_BLOCK_SIZE: usize = 16;

/// Bytes processed per explode/implode step (8 AES blocks)
pub const INIT_SIZE_BYTES: usize = 128;

/// Keccak sponge rate used by CryptoNight
pub const KECCAK_RATE: usize = 136;
