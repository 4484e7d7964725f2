//! The four 13-byte nonce layouts used with CCM. All fields big-endian.
//!
//! ```text
//! network:     0x00 | CTL<<7|TTL | SEQ(3) | SRC(2) | 0x0000  | IV Index(4)
//! application: 0x01 | ASZMIC<<7  | SEQ(3) | SRC(2) | DST(2)  | IV Index(4)
//! device:      0x02 | ASZMIC<<7  | SEQ(3) | SRC(2) | DST(2)  | IV Index(4)
//! proxy:       0x03 | 0x00       | SEQ(3) | SRC(2) | 0x0000  | IV Index(4)
//! ```
//!
//! The sequence number in every nonce is what keeps it unique under one
//! key; a node must never reuse a SEQ within one IV Index.

use crate::error::{SecurityError, SecurityResult};
use crate::types::Nonce;
use crate::NONCE_SIZE;

/// Largest 24-bit sequence number.
pub const MAX_SEQUENCE: u32 = 0x00FF_FFFF;

const NETWORK: u8 = 0x00;
const APPLICATION: u8 = 0x01;
const DEVICE: u8 = 0x02;
const PROXY: u8 = 0x03;

/// Nonce for Network PDUs, keyed with the Encryption Key.
pub fn network_nonce(
    ctl: bool,
    ttl: u8,
    seq: u32,
    src: u16,
    iv_index: u32,
) -> SecurityResult<Nonce> {
    let ctl_ttl = (u8::from(ctl) << 7) | (ttl & 0x7F);
    build(NETWORK, ctl_ttl, seq, src, 0x0000, iv_index)
}

/// Nonce for upper transport PDUs encrypted with an Application Key.
pub fn application_nonce(
    aszmic: bool,
    seq: u32,
    src: u16,
    dst: u16,
    iv_index: u32,
) -> SecurityResult<Nonce> {
    build(APPLICATION, u8::from(aszmic) << 7, seq, src, dst, iv_index)
}

/// Nonce for upper transport PDUs encrypted with a Device Key.
pub fn device_nonce(
    aszmic: bool,
    seq: u32,
    src: u16,
    dst: u16,
    iv_index: u32,
) -> SecurityResult<Nonce> {
    build(DEVICE, u8::from(aszmic) << 7, seq, src, dst, iv_index)
}

/// Nonce for proxy configuration messages.
pub fn proxy_nonce(seq: u32, src: u16, iv_index: u32) -> SecurityResult<Nonce> {
    build(PROXY, 0x00, seq, src, 0x0000, iv_index)
}

fn build(
    nonce_type: u8,
    second: u8,
    seq: u32,
    src: u16,
    dst_or_pad: u16,
    iv_index: u32,
) -> SecurityResult<Nonce> {
    if seq > MAX_SEQUENCE {
        return Err(SecurityError::InvalidInput("sequence number exceeds 24 bits"));
    }

    let mut bytes = [0u8; NONCE_SIZE];
    bytes[0] = nonce_type;
    bytes[1] = second;
    bytes[2..5].copy_from_slice(&seq.to_be_bytes()[1..]);
    bytes[5..7].copy_from_slice(&src.to_be_bytes());
    bytes[7..9].copy_from_slice(&dst_or_pad.to_be_bytes());
    bytes[9..].copy_from_slice(&iv_index.to_be_bytes());
    Ok(Nonce::from_bytes(bytes))
}
