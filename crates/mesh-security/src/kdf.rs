//! Key derivation functions k1 to k5 of the mesh security toolbox.
//!
//! ```text
//! k1(N, SALT, P) = AES-CMAC(AES-CMAC(SALT, N), P)
//! k2(N, P)       = NID || EncryptionKey || PrivacyKey      (33 bytes)
//! k3(N)          = 64-bit Network ID
//! k4(N)          = 6-bit AID
//! k5(N, SALT, P) = HMAC-SHA-256(HMAC-SHA-256(SALT, N), P)
//! ```

use zeroize::{Zeroize, Zeroizing};

use crate::error::{require_non_empty, SecurityError, SecurityResult};
use crate::mac::{cmac, hmac_sha256, s1};
use crate::types::Key128;
use crate::KEY_SIZE;

/// Serialized size of a [`K2Output`].
pub const K2_OUTPUT_SIZE: usize = 1 + 2 * KEY_SIZE;

/// The network key material derivation function k1.
///
/// Used for Identity Key, Beacon Key, Private Beacon Key, virtual-address
/// hashes and the provisioning session keys.
pub fn k1(n: &[u8], salt: &[u8; KEY_SIZE], p: &[u8]) -> SecurityResult<Key128> {
    require_non_empty("k1 N", n)?;
    require_non_empty("k1 P", p)?;

    let t = Key128::from_bytes(cmac(&Key128::from_bytes(*salt), n));
    Ok(Key128::from_bytes(cmac(&t, p)))
}

/// Output of [`k2`]: NID, Encryption Key and Privacy Key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct K2Output {
    /// Least significant 7 bits of T1.
    pub nid: u8,
    pub encryption_key: Key128,
    pub privacy_key: Key128,
}

impl K2Output {
    /// `(T1 || T2 || T3) mod 2^263`: the NID byte followed by both keys.
    pub fn to_bytes(&self) -> [u8; K2_OUTPUT_SIZE] {
        let mut out = [0u8; K2_OUTPUT_SIZE];
        out[0] = self.nid;
        out[1..1 + KEY_SIZE].copy_from_slice(self.encryption_key.as_bytes());
        out[1 + KEY_SIZE..].copy_from_slice(self.privacy_key.as_bytes());
        out
    }
}

/// The network key material derivation function k2.
///
/// With `P = 0x00` it yields the master credentials of a Network Key; with
/// `P = 0x01 || LPN || Friend || LPNCounter || FriendCounter` the
/// friendship credentials.
pub fn k2(n: &[u8], p: &[u8]) -> SecurityResult<K2Output> {
    require_non_empty("k2 N", n)?;
    require_non_empty("k2 P", p)?;

    let t = derive_t(b"smk2", n)?;

    let mut input = Zeroizing::new(Vec::with_capacity(KEY_SIZE + p.len() + 1));
    input.extend_from_slice(p);
    input.push(0x01);
    let mut t1 = cmac(&t, &input);

    input.clear();
    input.extend_from_slice(&t1);
    input.extend_from_slice(p);
    input.push(0x02);
    let t2 = cmac(&t, &input);

    input.clear();
    input.extend_from_slice(&t2);
    input.extend_from_slice(p);
    input.push(0x03);
    let t3 = cmac(&t, &input);

    let nid = t1[15] & 0x7F;
    t1.zeroize();

    tracing::trace!(nid, "derived k2 credentials");
    Ok(K2Output {
        nid,
        encryption_key: Key128::from_bytes(t2),
        privacy_key: Key128::from_bytes(t3),
    })
}

/// The derivation function k3: a public 64-bit value derived from a
/// private key (the Network ID).
pub fn k3(n: &[u8]) -> SecurityResult<[u8; 8]> {
    require_non_empty("k3 N", n)?;

    let t = derive_t(b"smk3", n)?;
    let result = cmac(&t, b"id64\x01");

    let mut out = [0u8; 8];
    out.copy_from_slice(&result[8..]);
    Ok(out)
}

/// The derivation function k4: a public 6-bit value derived from a
/// private key (the AID of an Application Key).
pub fn k4(n: &[u8]) -> SecurityResult<u8> {
    require_non_empty("k4 N", n)?;

    let t = derive_t(b"smk4", n)?;
    let result = cmac(&t, b"id6\x01");
    Ok(result[15] & 0x3F)
}

/// The provisioning material derivation function k5, used by the
/// HMAC-SHA-256 provisioning algorithm. `n` must be at least 32 bytes.
pub fn k5(n: &[u8], salt: &[u8; 32], p: &[u8]) -> SecurityResult<[u8; 32]> {
    if n.len() < 32 {
        return Err(SecurityError::length("k5 N", "at least 32", n.len()));
    }
    require_non_empty("k5 P", p)?;

    let mut t = hmac_sha256(salt, n);
    let result = hmac_sha256(&t, p);
    t.zeroize();
    Ok(result)
}

/// `T = AES-CMAC(s1(label), N)`, the shared first step of k2, k3 and k4.
fn derive_t(label: &[u8], n: &[u8]) -> SecurityResult<Key128> {
    let salt = Key128::from_bytes(s1(label)?);
    Ok(Key128::from_bytes(cmac(&salt, n)))
}
