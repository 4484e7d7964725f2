//! AES-128 single-block encryption, the primitive every other layer is built on.
//!
//! The `aes` crate selects AES-NI / ARMv8 instructions when available and
//! falls back to a fixsliced, constant-time software implementation.

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes128, Block};

use crate::error::{SecurityError, SecurityResult};
use crate::types::Key128;
use crate::{BLOCK_SIZE, KEY_SIZE};

/// Encrypt one 16-byte block with AES-128 (`e(key, block)` in the mesh
/// security toolbox). No mode, no padding.
pub fn encrypt_block(key: &Key128, block: &[u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
    BlockCipher::new(key).encrypt(block)
}

/// Slice-taking variant of [`encrypt_block`] for callers holding untyped
/// buffers. Both inputs must be exactly 16 bytes.
pub fn encrypt_block_slice(key: &[u8], block: &[u8]) -> SecurityResult<[u8; BLOCK_SIZE]> {
    let key = Key128::try_from(key)?;
    let block: &[u8; BLOCK_SIZE] = block
        .try_into()
        .map_err(|_| SecurityError::length("block", "16", block.len()))?;
    Ok(encrypt_block(&key, block))
}

/// An expanded AES-128 key schedule, reused across the blocks of a single
/// CMAC or CCM computation. Round keys are zeroized on drop.
pub(crate) struct BlockCipher(Aes128);

impl BlockCipher {
    pub(crate) fn new(key: &Key128) -> Self {
        let key: &[u8; KEY_SIZE] = key.as_bytes();
        Self(Aes128::new(key.into()))
    }

    pub(crate) fn encrypt(&self, block: &[u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
        let mut buf = Block::clone_from_slice(block);
        self.0.encrypt_block(&mut buf);
        let mut out = [0u8; BLOCK_SIZE];
        out.copy_from_slice(&buf);
        out
    }
}

/// XOR `src` into `dst`, over the shorter of the two lengths.
pub(crate) fn xor_in_place(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}
