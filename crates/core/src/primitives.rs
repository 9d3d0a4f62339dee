//! Low-level building blocks for CryptoNight
//!
//! AES rounds (hardware and software), the AES-256 key schedule, the Keccak
//! sponge and the four finalizer hashes selected by the final state.

use digest::Digest;
use digest::consts::U32;

use crate::params::{AES_BLOCK_SIZE, HASH_SIZE, KECCAK_RATE, STATE_SIZE};

/// Number of AES round keys used by explode/implode
pub const ROUND_KEYS: usize = 10;

/// One AESENC round: SubBytes + ShiftRows + MixColumns + AddRoundKey
pub trait AesRound {
    /// Encrypt `block` in place with a single round keyed by `key`
    fn round(block: &mut [u8; AES_BLOCK_SIZE], key: &[u8; AES_BLOCK_SIZE]);
}

/// Hardware path: AES-NI / ARMv8 crypto, detected at runtime by the `aes` crate
pub struct HardAes;

/// Software path: table-driven round, identical output on every target
pub struct SoftAes;

impl AesRound for HardAes {
    #[inline(always)]
    fn round(block: &mut [u8; AES_BLOCK_SIZE], key: &[u8; AES_BLOCK_SIZE]) {
        aes::hazmat::cipher_round(aes::Block::from_mut_slice(block), aes::Block::from_slice(key));
    }
}

impl AesRound for SoftAes {
    #[inline(always)]
    fn round(block: &mut [u8; AES_BLOCK_SIZE], key: &[u8; AES_BLOCK_SIZE]) {
        *block = aesenc_round(block, key);
    }
}

/// Whether the running CPU exposes hardware AES instructions
pub fn has_hardware_aes() -> bool {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        cpufeatures::new!(cpuid_aes, "aes");
        cpuid_aes::get()
    }

    #[cfg(target_arch = "aarch64")]
    {
        cpufeatures::new!(cpuid_aes, "aes");
        cpuid_aes::get()
    }

    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
    {
        false
    }
}

/// Single AESENC round: SubBytes + ShiftRows + MixColumns + AddRoundKey
#[inline(always)]
fn aesenc_round(state: &[u8; 16], round_key: &[u8; 16]) -> [u8; 16] {
    // SubBytes
    let mut s = [0u8; 16];
    for i in 0..16 {
        s[i] = SBOX[state[i] as usize];
    }

    // ShiftRows (state viewed as 4x4 column-major matrix)
    let t = s;
    s[1] = t[5];
    s[5] = t[9];
    s[9] = t[13];
    s[13] = t[1];

    s[2] = t[10];
    s[6] = t[14];
    s[10] = t[2];
    s[14] = t[6];

    s[3] = t[15];
    s[7] = t[3];
    s[11] = t[7];
    s[15] = t[11];

    // MixColumns
    let mut out = [0u8; 16];
    for col in 0..4 {
        let i = col * 4;
        let a0 = s[i];
        let a1 = s[i + 1];
        let a2 = s[i + 2];
        let a3 = s[i + 3];

        out[i] = gf_mul2(a0) ^ gf_mul3(a1) ^ a2 ^ a3;
        out[i + 1] = a0 ^ gf_mul2(a1) ^ gf_mul3(a2) ^ a3;
        out[i + 2] = a0 ^ a1 ^ gf_mul2(a2) ^ gf_mul3(a3);
        out[i + 3] = gf_mul3(a0) ^ a1 ^ a2 ^ gf_mul2(a3);
    }

    // AddRoundKey
    for i in 0..16 {
        out[i] ^= round_key[i];
    }

    out
}

/// Multiply by 2 in GF(2^8) with reduction polynomial x^8 + x^4 + x^3 + x + 1
#[inline(always)]
fn gf_mul2(x: u8) -> u8 {
    let hi = x >> 7;
    let shifted = x << 1;
    shifted ^ (hi * 0x1b)
}

/// Multiply by 3 in GF(2^8): 3*x = 2*x + x
#[inline(always)]
fn gf_mul3(x: u8) -> u8 {
    gf_mul2(x) ^ x
}

/// AES S-box
const SBOX: [u8; 256] = [
    0x63, 0x7c, 0x77, 0x7b, 0xf2, 0x6b, 0x6f, 0xc5, 0x30, 0x01, 0x67, 0x2b, 0xfe, 0xd7, 0xab, 0x76,
    0xca, 0x82, 0xc9, 0x7d, 0xfa, 0x59, 0x47, 0xf0, 0xad, 0xd4, 0xa2, 0xaf, 0x9c, 0xa4, 0x72, 0xc0,
    0xb7, 0xfd, 0x93, 0x26, 0x36, 0x3f, 0xf7, 0xcc, 0x34, 0xa5, 0xe5, 0xf1, 0x71, 0xd8, 0x31, 0x15,
    0x04, 0xc7, 0x23, 0xc3, 0x18, 0x96, 0x05, 0x9a, 0x07, 0x12, 0x80, 0xe2, 0xeb, 0x27, 0xb2, 0x75,
    0x09, 0x83, 0x2c, 0x1a, 0x1b, 0x6e, 0x5a, 0xa0, 0x52, 0x3b, 0xd6, 0xb3, 0x29, 0xe3, 0x2f, 0x84,
    0x53, 0xd1, 0x00, 0xed, 0x20, 0xfc, 0xb1, 0x5b, 0x6a, 0xcb, 0xbe, 0x39, 0x4a, 0x4c, 0x58, 0xcf,
    0xd0, 0xef, 0xaa, 0xfb, 0x43, 0x4d, 0x33, 0x85, 0x45, 0xf9, 0x02, 0x7f, 0x50, 0x3c, 0x9f, 0xa8,
    0x51, 0xa3, 0x40, 0x8f, 0x92, 0x9d, 0x38, 0xf5, 0xbc, 0xb6, 0xda, 0x21, 0x10, 0xff, 0xf3, 0xd2,
    0xcd, 0x0c, 0x13, 0xec, 0x5f, 0x97, 0x44, 0x17, 0xc4, 0xa7, 0x7e, 0x3d, 0x64, 0x5d, 0x19, 0x73,
    0x60, 0x81, 0x4f, 0xdc, 0x22, 0x2a, 0x90, 0x88, 0x46, 0xee, 0xb8, 0x14, 0xde, 0x5e, 0x0b, 0xdb,
    0xe0, 0x32, 0x3a, 0x0a, 0x49, 0x06, 0x24, 0x5c, 0xc2, 0xd3, 0xac, 0x62, 0x91, 0x95, 0xe4, 0x79,
    0xe7, 0xc8, 0x37, 0x6d, 0x8d, 0xd5, 0x4e, 0xa9, 0x6c, 0x56, 0xf4, 0xea, 0x65, 0x7a, 0xae, 0x08,
    0xba, 0x78, 0x25, 0x2e, 0x1c, 0xa6, 0xb4, 0xc6, 0xe8, 0xdd, 0x74, 0x1f, 0x4b, 0xbd, 0x8b, 0x8a,
    0x70, 0x3e, 0xb5, 0x66, 0x48, 0x03, 0xf6, 0x0e, 0x61, 0x35, 0x57, 0xb9, 0x86, 0xc1, 0x1d, 0x9e,
    0xe1, 0xf8, 0x98, 0x11, 0x69, 0xd9, 0x8e, 0x94, 0x9b, 0x1e, 0x87, 0xe9, 0xce, 0x55, 0x28, 0xdf,
    0x8c, 0xa1, 0x89, 0x0d, 0xbf, 0xe6, 0x42, 0x68, 0x41, 0x99, 0x2d, 0x0f, 0xb0, 0x54, 0xbb, 0x16,
];

/// AES-256 key schedule, truncated to the first 10 round keys
///
/// `key` must hold at least 32 bytes.
pub fn expand_key(key: &[u8]) -> [[u8; AES_BLOCK_SIZE]; ROUND_KEYS] {
    const RCON: [u8; 4] = [0x01, 0x02, 0x04, 0x08];

    let mut words = [[0u8; 4]; ROUND_KEYS * 4];
    for (i, word) in words.iter_mut().take(8).enumerate() {
        word.copy_from_slice(&key[i * 4..i * 4 + 4]);
    }

    for i in 8..ROUND_KEYS * 4 {
        let mut temp = words[i - 1];
        if i % 8 == 0 {
            // RotWord + SubWord + Rcon
            temp = [
                SBOX[temp[1] as usize] ^ RCON[i / 8 - 1],
                SBOX[temp[2] as usize],
                SBOX[temp[3] as usize],
                SBOX[temp[0] as usize],
            ];
        } else if i % 8 == 4 {
            temp = temp.map(|b| SBOX[b as usize]);
        }
        for j in 0..4 {
            words[i][j] = words[i - 8][j] ^ temp[j];
        }
    }

    let mut round_keys = [[0u8; AES_BLOCK_SIZE]; ROUND_KEYS];
    for (n, round_key) in round_keys.iter_mut().enumerate() {
        for (j, word) in words[n * 4..n * 4 + 4].iter().enumerate() {
            round_key[j * 4..j * 4 + 4].copy_from_slice(word);
        }
    }
    round_keys
}

/// Read a little-endian u64 from the first 8 bytes of `bytes`
#[inline(always)]
pub fn load64(bytes: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(word)
}

/// Write `value` as little-endian into the first 8 bytes of `bytes`
#[inline(always)]
pub fn store64(bytes: &mut [u8], value: u64) {
    bytes[..8].copy_from_slice(&value.to_le_bytes());
}

/// Keccak-1600 sponge with the original (pre-SHA3) padding, returning the
/// full 200-byte state
pub fn keccak1600(input: &[u8], out: &mut [u8; STATE_SIZE]) {
    let mut state = [0u64; 25];

    let mut blocks = input.chunks_exact(KECCAK_RATE);
    for block in &mut blocks {
        absorb(&mut state, block);
        keccak::f1600(&mut state);
    }

    let rest = blocks.remainder();
    let mut last = [0u8; KECCAK_RATE];
    last[..rest.len()].copy_from_slice(rest);
    last[rest.len()] = 0x01;
    last[KECCAK_RATE - 1] |= 0x80;
    absorb(&mut state, &last);
    keccak::f1600(&mut state);

    store_state(&state, out);
}

/// Apply Keccak-f[1600] to a byte-serialised state
pub fn keccakf(bytes: &mut [u8; STATE_SIZE]) {
    let mut state = [0u64; 25];
    for (word, chunk) in state.iter_mut().zip(bytes.chunks_exact(8)) {
        *word = load64(chunk);
    }
    keccak::f1600(&mut state);
    store_state(&state, bytes);
}

fn absorb(state: &mut [u64; 25], block: &[u8]) {
    for (word, chunk) in state.iter_mut().zip(block.chunks_exact(8)) {
        *word ^= load64(chunk);
    }
}

fn store_state(state: &[u64; 25], out: &mut [u8; STATE_SIZE]) {
    for (chunk, word) in out.chunks_exact_mut(8).zip(state.iter()) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
}

/// Final hash over the permuted state, chosen by its two low bits:
/// BLAKE-256, Groestl-256, JH-256 or Skein-512-256
pub fn finalize(state: &[u8; STATE_SIZE], output: &mut [u8]) {
    match state[0] & 3 {
        0 => output[..HASH_SIZE].copy_from_slice(&blake256(state)),
        1 => output[..HASH_SIZE].copy_from_slice(&groestl::Groestl256::digest(state)),
        2 => output[..HASH_SIZE].copy_from_slice(&jh::Jh256::digest(state)),
        _ => output[..HASH_SIZE].copy_from_slice(&skein::Skein512::<U32>::digest(state)),
    }
}

/// BLAKE-256 (the SHA-3 finalist, 14 rounds, zero salt)
pub fn blake256(data: &[u8]) -> [u8; HASH_SIZE] {
    // blake-hash sits on digest 0.9, separate from the 0.10 trait above
    use blake_hash::Digest as _;

    let mut out = [0u8; HASH_SIZE];
    out.copy_from_slice(&blake_hash::Blake256::digest(data));
    out
}
