//! Key hierarchy: Network Key → derived keys and identifiers, Application
//! Key → AID, Label UUID → virtual address, random key generation.

use rand::{CryptoRng, RngCore};

use crate::error::SecurityResult;
use crate::kdf::{k1, k2, k3, k4, K2Output};
use crate::mac::{cmac, s1};
use crate::random::generate_random_with;
use crate::types::Key128;

/// `"id128" || 0x01`, the P parameter of the k1-derived network keys.
const ID128: &[u8] = b"id128\x01";

/// Every key and identifier derived from one Network Key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkKeyDerivatives {
    /// 7-bit Network Identifier carried in every Network PDU.
    pub nid: u8,
    pub encryption_key: Key128,
    pub privacy_key: Key128,
    pub identity_key: Key128,
    pub beacon_key: Key128,
    pub private_beacon_key: Key128,
}

impl NetworkKeyDerivatives {
    /// Derive the master security credentials, Identity Key, Beacon Key and
    /// Private Beacon Key from `network_key`.
    pub fn derive(network_key: &Key128) -> SecurityResult<Self> {
        let n = network_key.as_bytes();
        let K2Output {
            nid,
            encryption_key,
            privacy_key,
        } = k2(n, &[0x00])?;

        let identity_key = k1(n, &s1(b"nkik")?, ID128)?;
        let beacon_key = k1(n, &s1(b"nkbk")?, ID128)?;
        let private_beacon_key = k1(n, &s1(b"nkpk")?, ID128)?;

        tracing::debug!(nid, "derived network key material");
        Ok(Self {
            nid,
            encryption_key,
            privacy_key,
            identity_key,
            beacon_key,
            private_beacon_key,
        })
    }
}

/// Security credentials used between a Low Power Node and its Friend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendshipCredentials {
    pub nid: u8,
    pub encryption_key: Key128,
    pub privacy_key: Key128,
}

impl FriendshipCredentials {
    /// `k2(NetKey, 0x01 || LPNAddress || FriendAddress || LPNCounter ||
    /// FriendCounter)`, all fields big-endian.
    pub fn derive(
        network_key: &Key128,
        lpn_address: u16,
        friend_address: u16,
        lpn_counter: u16,
        friend_counter: u16,
    ) -> SecurityResult<Self> {
        let mut p = [0u8; 9];
        p[0] = 0x01;
        p[1..3].copy_from_slice(&lpn_address.to_be_bytes());
        p[3..5].copy_from_slice(&friend_address.to_be_bytes());
        p[5..7].copy_from_slice(&lpn_counter.to_be_bytes());
        p[7..9].copy_from_slice(&friend_counter.to_be_bytes());

        let K2Output {
            nid,
            encryption_key,
            privacy_key,
        } = k2(network_key.as_bytes(), &p)?;
        Ok(Self {
            nid,
            encryption_key,
            privacy_key,
        })
    }
}

/// The 64-bit Network ID of a Network Key: `k3(NetKey)`.
pub fn network_id(network_key: &Key128) -> SecurityResult<[u8; 8]> {
    k3(network_key.as_bytes())
}

/// The 6-bit Application Key Identifier: `k4(AppKey)`.
pub fn aid(application_key: &Key128) -> SecurityResult<u8> {
    k4(application_key.as_bytes())
}

/// The 16-bit virtual address of a Label UUID.
///
/// `hash = AES-CMAC(s1("vtad"), Label UUID)`; the address is the low 14 bits
/// of the hash with the top two bits set to `0b10`.
pub fn virtual_address(label_uuid: &[u8; 16]) -> SecurityResult<u16> {
    let salt = Key128::from_bytes(s1(b"vtad")?);
    let hash = cmac(&salt, label_uuid);
    let address = u16::from_be_bytes([hash[14], hash[15]]);
    Ok((address | 0x8000) & 0xBFFF)
}

/// Generate a random 128-bit key from the operating system CSPRNG.
pub fn generate_key() -> SecurityResult<Key128> {
    generate_key_with(&mut rand::rngs::OsRng)
}

/// Generate a random 128-bit key from `rng`.
pub fn generate_key_with<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> SecurityResult<Key128> {
    Ok(Key128::from_bytes(generate_random_with(rng)?))
}
