//! AES-CMAC (RFC 4493), HMAC-SHA-256 and the salt functions `s1` / `s2`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::block::{xor_in_place, BlockCipher};
use crate::error::{SecurityError, SecurityResult};
use crate::types::Key128;
use crate::BLOCK_SIZE;

type HmacSha256 = Hmac<Sha256>;

/// Reduction constant for doubling in GF(2^128): x^128 + x^7 + x^2 + x + 1.
const RB: u128 = 0x87;

/// Compute the 128-bit AES-CMAC of `message` under `key`.
///
/// Any message length is accepted, including zero: the empty message is
/// processed as a single padded block.
pub fn cmac(key: &Key128, message: &[u8]) -> [u8; BLOCK_SIZE] {
    let cipher = BlockCipher::new(key);
    let (mut k1, mut k2) = subkeys(&cipher);

    let blocks = message.len().div_ceil(BLOCK_SIZE).max(1);
    let (head, last) = message.split_at((blocks - 1) * BLOCK_SIZE);

    let mut x = [0u8; BLOCK_SIZE];
    for block in head.chunks_exact(BLOCK_SIZE) {
        xor_in_place(&mut x, block);
        x = cipher.encrypt(&x);
    }

    let mut last_block = [0u8; BLOCK_SIZE];
    last_block[..last.len()].copy_from_slice(last);
    if last.len() == BLOCK_SIZE {
        xor_in_place(&mut last_block, &k1);
    } else {
        last_block[last.len()] = 0x80;
        xor_in_place(&mut last_block, &k2);
    }
    xor_in_place(&mut x, &last_block);
    let tag = cipher.encrypt(&x);

    k1.zeroize();
    k2.zeroize();
    x.zeroize();
    last_block.zeroize();
    tag
}

/// Derive the CMAC subkeys K1 and K2 from `L = e(key, 0^128)`.
fn subkeys(cipher: &BlockCipher) -> ([u8; BLOCK_SIZE], [u8; BLOCK_SIZE]) {
    let mut l = cipher.encrypt(&[0u8; BLOCK_SIZE]);
    let k1 = double(&l);
    let k2 = double(&k1);
    l.zeroize();
    (k1, k2)
}

/// Multiply by x in GF(2^128), big-endian bit order. Branch-free on the
/// carried-out bit.
fn double(block: &[u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
    let value = u128::from_be_bytes(*block);
    let carry = value >> 127;
    ((value << 1) ^ (carry * RB)).to_be_bytes()
}

/// The salt generation function `s1(M) = AES-CMAC(ZERO, M)`.
///
/// Used only as a domain-separating hash for key derivation, never as an
/// authenticator. The input must be non-empty.
pub fn s1(message: &[u8]) -> SecurityResult<[u8; BLOCK_SIZE]> {
    if message.is_empty() {
        return Err(SecurityError::InvalidInput("s1 input must not be empty"));
    }
    Ok(cmac(&Key128::zero(), message))
}

/// HMAC-SHA-256 with a 256-bit key.
pub fn hmac_sha256(key: &[u8; 32], message: &[u8]) -> [u8; 32] {
    // HMAC zero-pads keys shorter than the 64-byte SHA-256 block.
    let mut block_key = [0u8; 64];
    block_key[..32].copy_from_slice(key);
    let mut mac = <HmacSha256 as Mac>::new(&block_key.into());
    block_key.zeroize();

    mac.update(message);
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// The salt generation function `s2(M) = HMAC-SHA-256(ZERO, M)`, used by the
/// HMAC-SHA-256 provisioning algorithm. The input must be non-empty.
pub fn s2(message: &[u8]) -> SecurityResult<[u8; 32]> {
    if message.is_empty() {
        return Err(SecurityError::InvalidInput("s2 input must not be empty"));
    }
    Ok(hmac_sha256(&[0u8; 32], message))
}
