//! AES-CCM authenticated encryption (RFC 3610) with a 13-byte nonce.
//!
//! Block layout (L = 2 length octets, M = MIC length):
//! ```text
//! B0  = flags || nonce (13) || l(m) (2, BE)
//!       flags = 64*Adata + 8*((M-2)/2) + (L-1)
//! A_i = (L-1) || nonce (13) || i (2, BE)
//!
//! T   = CBC-MAC(B0 || encoded AAD || plaintext, zero padded to 16)
//! C_i = P_i XOR e(K, A_i)                           for i >= 1
//! MIC = (T XOR e(K, A_0))[0..M]
//! ```
//!
//! Mesh uses CCM for network PDUs (NetMIC), upper transport PDUs
//! (TransMIC), provisioning data and private beacons.

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::block::{xor_in_place, BlockCipher};
use crate::error::{SecurityError, SecurityResult};
use crate::types::{Key128, Mic, MicSize, Nonce};
use crate::BLOCK_SIZE;

/// Number of octets in the CCM length field: 15 - nonce length.
const LENGTH_FIELD_SIZE: u8 = 2;

/// Largest payload a 2-octet length field can describe.
pub const MAX_CCM_PAYLOAD: usize = u16::MAX as usize;

/// Encrypt and authenticate `plaintext`.
///
/// Returns the ciphertext (same length as the plaintext) and a MIC of
/// `mic_size` bytes. An empty plaintext is valid and yields only a MIC.
///
/// The `nonce` must be unique for every message encrypted under `key`.
pub fn encrypt_ccm(
    plaintext: &[u8],
    key: &Key128,
    nonce: &Nonce,
    mic_size: MicSize,
) -> SecurityResult<(Vec<u8>, Mic)> {
    encrypt_ccm_with_aad(plaintext, key, nonce, mic_size, &[])
}

/// Like [`encrypt_ccm`], additionally authenticating `aad` (e.g. the Label
/// UUID of a virtual destination address). An empty `aad` is the same as
/// no additional data.
pub fn encrypt_ccm_with_aad(
    plaintext: &[u8],
    key: &Key128,
    nonce: &Nonce,
    mic_size: MicSize,
    aad: &[u8],
) -> SecurityResult<(Vec<u8>, Mic)> {
    check_payload_len("plaintext", plaintext.len())?;

    let cipher = BlockCipher::new(key);
    let mut tag = cbc_mac(&cipher, nonce, mic_size, aad, plaintext);

    let mut ciphertext = plaintext.to_vec();
    apply_keystream(&cipher, nonce, &mut ciphertext);

    let mut s0 = cipher.encrypt(&counter_block(nonce, 0));
    xor_in_place(&mut tag, &s0);
    let mic = Mic::truncate(&tag, mic_size);
    tag.zeroize();
    s0.zeroize();

    tracing::trace!(
        len = plaintext.len(),
        aad_len = aad.len(),
        mic = %mic_size,
        "CCM encrypt"
    );
    Ok((ciphertext, mic))
}

/// Decrypt `ciphertext` and verify its MIC.
///
/// On MIC mismatch the recovered plaintext is wiped and
/// [`SecurityError::AuthenticationFailure`] is returned.
pub fn decrypt_ccm(
    ciphertext: &[u8],
    key: &Key128,
    nonce: &Nonce,
    mic: &Mic,
) -> SecurityResult<Vec<u8>> {
    decrypt_ccm_with_aad(ciphertext, key, nonce, mic, &[])
}

/// Inverse of [`encrypt_ccm_with_aad`].
pub fn decrypt_ccm_with_aad(
    ciphertext: &[u8],
    key: &Key128,
    nonce: &Nonce,
    mic: &Mic,
    aad: &[u8],
) -> SecurityResult<Vec<u8>> {
    check_payload_len("ciphertext", ciphertext.len())?;

    let cipher = BlockCipher::new(key);
    let mut plaintext = ciphertext.to_vec();
    apply_keystream(&cipher, nonce, &mut plaintext);

    let mut tag = cbc_mac(&cipher, nonce, mic.size(), aad, &plaintext);
    let mut s0 = cipher.encrypt(&counter_block(nonce, 0));
    xor_in_place(&mut tag, &s0);
    let expected = Mic::truncate(&tag, mic.size());
    tag.zeroize();
    s0.zeroize();

    let authentic: bool = expected.as_bytes().ct_eq(mic.as_bytes()).into();
    if !authentic {
        plaintext.zeroize();
        tracing::debug!(
            len = ciphertext.len(),
            aad_len = aad.len(),
            mic = %mic.size(),
            "CCM authentication failed"
        );
        return Err(SecurityError::AuthenticationFailure);
    }

    tracing::trace!(len = ciphertext.len(), aad_len = aad.len(), "CCM decrypt");
    Ok(plaintext)
}

fn check_payload_len(field: &'static str, len: usize) -> SecurityResult<()> {
    if len > MAX_CCM_PAYLOAD {
        return Err(SecurityError::length(field, "at most 65535", len));
    }
    Ok(())
}

/// CBC-MAC over B0, the length-prefixed AAD and the payload.
fn cbc_mac(
    cipher: &BlockCipher,
    nonce: &Nonce,
    mic_size: MicSize,
    aad: &[u8],
    payload: &[u8],
) -> [u8; BLOCK_SIZE] {
    let adata: u8 = if aad.is_empty() { 0 } else { 0x40 };
    let m = mic_size.len() as u8;

    let mut b0 = [0u8; BLOCK_SIZE];
    b0[0] = adata | (((m - 2) / 2) << 3) | (LENGTH_FIELD_SIZE - 1);
    b0[1..14].copy_from_slice(nonce.as_bytes());
    b0[14..].copy_from_slice(&(payload.len() as u16).to_be_bytes());

    let mut x = cipher.encrypt(&b0);
    if !aad.is_empty() {
        let mut encoded = encode_aad_length(aad.len());
        encoded.extend_from_slice(aad);
        x = cbc_chain(cipher, x, &encoded);
    }
    cbc_chain(cipher, x, payload)
}

/// Feed `data` through CBC, zero padding the final partial block.
fn cbc_chain(cipher: &BlockCipher, mut x: [u8; BLOCK_SIZE], data: &[u8]) -> [u8; BLOCK_SIZE] {
    for block in data.chunks(BLOCK_SIZE) {
        xor_in_place(&mut x, block);
        x = cipher.encrypt(&x);
    }
    x
}

/// RFC 3610 section 2.2 encoding of l(a).
fn encode_aad_length(len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(10);
    if len < 0xFF00 {
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else if let Ok(len) = u32::try_from(len) {
        out.extend_from_slice(&[0xFF, 0xFE]);
        out.extend_from_slice(&len.to_be_bytes());
    } else {
        out.extend_from_slice(&[0xFF, 0xFF]);
        out.extend_from_slice(&(len as u64).to_be_bytes());
    }
    out
}

fn counter_block(nonce: &Nonce, counter: u16) -> [u8; BLOCK_SIZE] {
    let mut a = [0u8; BLOCK_SIZE];
    a[0] = LENGTH_FIELD_SIZE - 1;
    a[1..14].copy_from_slice(nonce.as_bytes());
    a[14..].copy_from_slice(&counter.to_be_bytes());
    a
}

/// CTR mode starting at counter 1. Callers have already bounded the data to
/// 65535 bytes, so the counter never exceeds 4096.
fn apply_keystream(cipher: &BlockCipher, nonce: &Nonce, data: &mut [u8]) {
    for (i, block) in data.chunks_mut(BLOCK_SIZE).enumerate() {
        let mut keystream = cipher.encrypt(&counter_block(nonce, (i + 1) as u16));
        xor_in_place(block, &keystream);
        keystream.zeroize();
    }
}
