//! CryptoNight kernels
//!
//! Every kernel hashes `LANES` back-to-back inputs of `size` bytes in one
//! call. The main loops of all lanes are interleaved so that the latency of
//! one lane's scratchpad access overlaps with the work of the others.
//!
//! Phases per lane:
//! - Keccak-1600 of the input into a 200-byte state
//! - Explode: fill the scratchpad by AES-encrypting `state[64..192]`
//! - Main loop: AES round + 64x64 multiply-add at data-dependent addresses
//! - Implode: fold the scratchpad back into `state[64..192]`
//! - Keccak-f, then one of four finalizers

use crate::context::HashContext;
use crate::params::{AES_BLOCK_SIZE, HASH_SIZE, INIT_SIZE_BYTES, MemoryProfile, STATE_SIZE};
use crate::primitives::{AesRound, expand_key, finalize, keccak1600, keccakf, load64, store64};

const INIT_BLOCKS: usize = INIT_SIZE_BYTES / AES_BLOCK_SIZE;

/// Hash `LANES` inputs with the given memory profile.
///
/// `input` holds `LANES × size` bytes, `output` receives `LANES × 32` bytes.
#[inline(always)]
pub(crate) fn cryptonight<A: AesRound, const LANES: usize>(
    profile: &MemoryProfile,
    input: &[u8],
    size: usize,
    output: &mut [u8],
    ctx: &mut HashContext,
) {
    let memory = profile.memory;
    let mask = profile.mask as u64;
    let (states, scratch) = ctx.prepare(LANES, memory);

    for lane in 0..LANES {
        keccak1600(&input[lane * size..(lane + 1) * size], &mut states[lane]);
        explode::<A>(&states[lane], &mut scratch[lane * memory..(lane + 1) * memory]);
    }

    let mut al = [0u64; LANES];
    let mut ah = [0u64; LANES];
    let mut bx = [[0u8; AES_BLOCK_SIZE]; LANES];
    let mut idx = [0u64; LANES];

    for lane in 0..LANES {
        let h = &states[lane];
        al[lane] = load64(&h[0..]) ^ load64(&h[32..]);
        ah[lane] = load64(&h[8..]) ^ load64(&h[40..]);
        store64(&mut bx[lane][..8], load64(&h[16..]) ^ load64(&h[48..]));
        store64(&mut bx[lane][8..], load64(&h[24..]) ^ load64(&h[56..]));
        idx[lane] = al[lane];
    }

    for _ in 0..profile.iterations {
        for lane in 0..LANES {
            let pad = &mut scratch[lane * memory..(lane + 1) * memory];

            // AES round keyed by a, then store b ^ c
            let offset = (idx[lane] & mask) as usize;
            let mut cx = [0u8; AES_BLOCK_SIZE];
            cx.copy_from_slice(&pad[offset..offset + AES_BLOCK_SIZE]);

            let mut key = [0u8; AES_BLOCK_SIZE];
            store64(&mut key[..8], al[lane]);
            store64(&mut key[8..], ah[lane]);
            A::round(&mut cx, &key);

            for (dst, (b, c)) in pad[offset..offset + AES_BLOCK_SIZE]
                .iter_mut()
                .zip(bx[lane].iter().zip(cx.iter()))
            {
                *dst = b ^ c;
            }

            idx[lane] = load64(&cx);
            bx[lane] = cx;

            // 64x64 -> 128 multiply, add into a, store, xor
            let offset = (idx[lane] & mask) as usize;
            let cl = load64(&pad[offset..]);
            let ch = load64(&pad[offset + 8..]);

            let product = (idx[lane] as u128) * (cl as u128);
            let hi = (product >> 64) as u64;
            let lo = product as u64;

            al[lane] = al[lane].wrapping_add(hi);
            ah[lane] = ah[lane].wrapping_add(lo);

            store64(&mut pad[offset..], al[lane]);
            store64(&mut pad[offset + 8..], ah[lane]);

            ah[lane] ^= ch;
            al[lane] ^= cl;
            idx[lane] = al[lane];
        }
    }

    for lane in 0..LANES {
        implode::<A>(&scratch[lane * memory..(lane + 1) * memory], &mut states[lane]);
        keccakf(&mut states[lane]);
        finalize(
            &states[lane],
            &mut output[lane * HASH_SIZE..(lane + 1) * HASH_SIZE],
        );
    }
}

/// Fill the scratchpad from `state[64..192]`, keyed by `state[0..32]`
fn explode<A: AesRound>(state: &[u8; STATE_SIZE], scratchpad: &mut [u8]) {
    let round_keys = expand_key(&state[0..32]);
    let mut text = load_blocks(&state[64..64 + INIT_SIZE_BYTES]);

    for chunk in scratchpad.chunks_exact_mut(INIT_SIZE_BYTES) {
        for block in text.iter_mut() {
            for key in &round_keys {
                A::round(block, key);
            }
        }
        for (dst, block) in chunk.chunks_exact_mut(AES_BLOCK_SIZE).zip(text.iter()) {
            dst.copy_from_slice(block);
        }
    }
}

/// Fold the scratchpad into `state[64..192]`, keyed by `state[32..64]`
fn implode<A: AesRound>(scratchpad: &[u8], state: &mut [u8; STATE_SIZE]) {
    let round_keys = expand_key(&state[32..64]);
    let mut text = load_blocks(&state[64..64 + INIT_SIZE_BYTES]);

    for chunk in scratchpad.chunks_exact(INIT_SIZE_BYTES) {
        for (block, src) in text.iter_mut().zip(chunk.chunks_exact(AES_BLOCK_SIZE)) {
            for (b, s) in block.iter_mut().zip(src.iter()) {
                *b ^= s;
            }
            for key in &round_keys {
                A::round(block, key);
            }
        }
    }

    for (dst, block) in state[64..64 + INIT_SIZE_BYTES]
        .chunks_exact_mut(AES_BLOCK_SIZE)
        .zip(text.iter())
    {
        dst.copy_from_slice(block);
    }
}

fn load_blocks(bytes: &[u8]) -> [[u8; AES_BLOCK_SIZE]; INIT_BLOCKS] {
    let mut blocks = [[0u8; AES_BLOCK_SIZE]; INIT_BLOCKS];
    for (block, src) in blocks.iter_mut().zip(bytes.chunks_exact(AES_BLOCK_SIZE)) {
        block.copy_from_slice(src);
    }
    blocks
}

/// Check whether a digest beats a 64-bit target
///
/// Only the trailing 8 bytes (bytes 24..32, little-endian) take part in the
/// comparison.
///
/// # Example
///
/// ```rust
/// use cnhash_core::meets_target;
///
/// let mut hash = [0xFFu8; 32];
/// hash[24..32].copy_from_slice(&100u64.to_le_bytes());
/// assert!(meets_target(&hash, 101));
/// assert!(!meets_target(&hash, 100));
/// ```
#[inline(always)]
pub fn meets_target(hash: &[u8; HASH_SIZE], target: u64) -> bool {
    load64(&hash[24..]) < target
}
