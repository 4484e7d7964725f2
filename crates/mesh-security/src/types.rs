//! Fixed-size inputs of the security toolbox: keys, nonces and MICs.
//!
//! Lengths are checked once, when a value is constructed from an untyped
//! buffer; every function taking these types can assume the size is right.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::{SecurityError, SecurityResult};
use crate::{KEY_SIZE, NONCE_SIZE};

/// A 128-bit key (Network Key, Application Key, Device Key or any derived
/// key). Zeroized on drop.
#[derive(Clone)]
pub struct Key128 {
    bytes: [u8; KEY_SIZE],
}

impl Key128 {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// The all-zero key used by the salt function `s1`.
    pub fn zero() -> Self {
        Self::from_bytes([0u8; KEY_SIZE])
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl TryFrom<&[u8]> for Key128 {
    type Error = SecurityError;

    fn try_from(bytes: &[u8]) -> SecurityResult<Self> {
        let bytes: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| SecurityError::length("key", "16", bytes.len()))?;
        Ok(Self::from_bytes(bytes))
    }
}

impl PartialEq for Key128 {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl Eq for Key128 {}

impl Drop for Key128 {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl fmt::Debug for Key128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key128")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A 104-bit CCM nonce.
///
/// A nonce must never be reused under the same key: doing so leaks the XOR
/// of the two plaintexts and lets an attacker forge MICs. Nothing here can
/// detect reuse; uniqueness comes from the sequence number and IV Index the
/// caller puts into the nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce {
    bytes: [u8; NONCE_SIZE],
}

impl Nonce {
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.bytes
    }
}

impl TryFrom<&[u8]> for Nonce {
    type Error = SecurityError;

    fn try_from(bytes: &[u8]) -> SecurityResult<Self> {
        let bytes: [u8; NONCE_SIZE] = bytes
            .try_into()
            .map_err(|_| SecurityError::length("nonce", "13", bytes.len()))?;
        Ok(Self::from_bytes(bytes))
    }
}

/// Size of the Message Integrity Check appended to a CCM ciphertext.
///
/// Network PDUs use 32 bits for access messages and 64 bits for control
/// messages; the upper transport layer uses 64 bits only for segmented
/// access messages sent with high security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MicSize {
    #[default]
    Mic32,
    Mic64,
}

impl MicSize {
    /// MIC length in bytes.
    pub const fn len(self) -> usize {
        match self {
            Self::Mic32 => 4,
            Self::Mic64 => 8,
        }
    }

    pub fn from_bytes(len: usize) -> SecurityResult<Self> {
        match len {
            4 => Ok(Self::Mic32),
            8 => Ok(Self::Mic64),
            other => Err(SecurityError::length("MIC", "4 or 8", other)),
        }
    }
}

impl FromStr for MicSize {
    type Err = SecurityError;

    fn from_str(s: &str) -> SecurityResult<Self> {
        match s {
            "mic32" | "32" => Ok(Self::Mic32),
            "mic64" | "64" => Ok(Self::Mic64),
            _ => Err(SecurityError::InvalidInput(
                "MIC size must be one of: mic32, mic64",
            )),
        }
    }
}

impl fmt::Display for MicSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mic32 => f.write_str("mic32"),
            Self::Mic64 => f.write_str("mic64"),
        }
    }
}

/// A Message Integrity Check: the CCM authentication value truncated to
/// 4 or 8 bytes. Equality is constant-time.
#[derive(Clone, Copy)]
pub struct Mic {
    bytes: [u8; 8],
    size: MicSize,
}

impl Mic {
    /// Truncate a full 128-bit authentication value.
    pub(crate) fn truncate(tag: &[u8; 16], size: MicSize) -> Self {
        let mut bytes = [0u8; 8];
        bytes[..size.len()].copy_from_slice(&tag[..size.len()]);
        Self { bytes, size }
    }

    pub fn size(&self) -> MicSize {
        self.size
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.size.len()]
    }
}

impl TryFrom<&[u8]> for Mic {
    type Error = SecurityError;

    fn try_from(bytes: &[u8]) -> SecurityResult<Self> {
        let size = MicSize::from_bytes(bytes.len())?;
        let mut buf = [0u8; 8];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Self { bytes: buf, size })
    }
}

impl PartialEq for Mic {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes().ct_eq(other.as_bytes()).into()
    }
}

impl Eq for Mic {}

impl fmt::Debug for Mic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mic(")?;
        for byte in self.as_bytes() {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}
