//! Secure Network beacon and Mesh Private beacon authentication, plus the
//! Node Identity hash advertised by proxy nodes.
//!
//! Secure Network beacon (22 bytes):
//! ```text
//! 0x01 | Flags(1) | Network ID(8) | IV Index(4) | Authentication Value(8)
//! Authentication Value = AES-CMAC(BeaconKey, Flags || Network ID || IV Index)[0..8]
//! ```
//!
//! Mesh Private beacon (27 bytes):
//! ```text
//! 0x02 | Random(13) | Obfuscated Private Beacon Data(5) | Authentication Tag(8)
//! ```
//! The obfuscation and tag are exactly AES-CCM with the Private Beacon Key,
//! the Random as nonce, an 8-byte MIC and `Flags || IV Index` as plaintext.

use subtle::ConstantTimeEq;

use crate::block::encrypt_block;
use crate::ccm::{decrypt_ccm, encrypt_ccm};
use crate::error::{SecurityError, SecurityResult};
use crate::mac::cmac;
use crate::types::{Key128, Mic, MicSize, Nonce};
use crate::BLOCK_SIZE;

pub const SECURE_NETWORK_BEACON_TYPE: u8 = 0x01;
pub const PRIVATE_BEACON_TYPE: u8 = 0x02;
pub const SECURE_NETWORK_BEACON_LEN: usize = 22;
pub const PRIVATE_BEACON_LEN: usize = 27;

const KEY_REFRESH_FLAG: u8 = 0x01;
const IV_UPDATE_FLAG: u8 = 0x02;

/// Network state carried by a beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeaconState {
    pub key_refresh: bool,
    pub iv_update_active: bool,
    pub iv_index: u32,
}

impl BeaconState {
    fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.key_refresh {
            flags |= KEY_REFRESH_FLAG;
        }
        if self.iv_update_active {
            flags |= IV_UPDATE_FLAG;
        }
        flags
    }

    fn from_parts(flags: u8, iv_index: [u8; 4]) -> Self {
        Self {
            key_refresh: flags & KEY_REFRESH_FLAG != 0,
            iv_update_active: flags & IV_UPDATE_FLAG != 0,
            iv_index: u32::from_be_bytes(iv_index),
        }
    }
}

/// A decoded and authenticated Secure Network beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecureNetworkBeacon {
    pub network_id: [u8; 8],
    pub state: BeaconState,
}

impl SecureNetworkBeacon {
    /// Authenticate and decode `pdu`. Fails with `AuthenticationFailure`
    /// when the Authentication Value does not match `beacon_key`.
    pub fn decode(pdu: &[u8], beacon_key: &Key128) -> SecurityResult<Self> {
        if !authenticate_secure_network_beacon(pdu, beacon_key)? {
            tracing::debug!("secure network beacon authentication failed");
            return Err(SecurityError::AuthenticationFailure);
        }

        let mut network_id = [0u8; 8];
        network_id.copy_from_slice(&pdu[2..10]);
        let iv_index = [pdu[10], pdu[11], pdu[12], pdu[13]];
        Ok(Self {
            network_id,
            state: BeaconState::from_parts(pdu[1], iv_index),
        })
    }

    /// Build the 22-byte beacon PDU authenticated with `beacon_key`.
    pub fn encode(&self, beacon_key: &Key128) -> [u8; SECURE_NETWORK_BEACON_LEN] {
        let mut pdu = [0u8; SECURE_NETWORK_BEACON_LEN];
        pdu[0] = SECURE_NETWORK_BEACON_TYPE;
        pdu[1] = self.state.flags();
        pdu[2..10].copy_from_slice(&self.network_id);
        pdu[10..14].copy_from_slice(&self.state.iv_index.to_be_bytes());
        let auth = cmac(beacon_key, &pdu[1..14]);
        pdu[14..].copy_from_slice(&auth[..8]);
        pdu
    }
}

/// Check the Authentication Value of a Secure Network beacon in constant
/// time. Malformed PDUs are an error; a wrong key is `Ok(false)`.
pub fn authenticate_secure_network_beacon(
    pdu: &[u8],
    beacon_key: &Key128,
) -> SecurityResult<bool> {
    if pdu.len() != SECURE_NETWORK_BEACON_LEN {
        return Err(SecurityError::length("secure network beacon", "22", pdu.len()));
    }
    if pdu[0] != SECURE_NETWORK_BEACON_TYPE {
        return Err(SecurityError::InvalidInput("not a secure network beacon"));
    }
    let auth = cmac(beacon_key, &pdu[1..14]);
    Ok(auth[..8].ct_eq(&pdu[14..]).into())
}

/// A decoded and authenticated Mesh Private beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrivateBeacon {
    pub state: BeaconState,
}

impl PrivateBeacon {
    /// Deobfuscate and authenticate `pdu` with the Private Beacon Key.
    pub fn decode(pdu: &[u8], private_beacon_key: &Key128) -> SecurityResult<Self> {
        if pdu.len() != PRIVATE_BEACON_LEN {
            return Err(SecurityError::length("private beacon", "27", pdu.len()));
        }
        if pdu[0] != PRIVATE_BEACON_TYPE {
            return Err(SecurityError::InvalidInput("not a private beacon"));
        }

        let random = Nonce::try_from(&pdu[1..14])?;
        let tag = Mic::try_from(&pdu[19..27])?;
        let data = decrypt_ccm(&pdu[14..19], private_beacon_key, &random, &tag)?;

        let iv_index = [data[1], data[2], data[3], data[4]];
        Ok(Self {
            state: BeaconState::from_parts(data[0], iv_index),
        })
    }

    /// Build the 27-byte beacon PDU. `random` must be fresh for every
    /// beacon sent.
    pub fn encode(
        &self,
        random: &[u8; 13],
        private_beacon_key: &Key128,
    ) -> SecurityResult<[u8; PRIVATE_BEACON_LEN]> {
        let mut data = [0u8; 5];
        data[0] = self.state.flags();
        data[1..].copy_from_slice(&self.state.iv_index.to_be_bytes());

        let nonce = Nonce::from_bytes(*random);
        let (obfuscated, tag) = encrypt_ccm(&data, private_beacon_key, &nonce, MicSize::Mic64)?;

        let mut pdu = [0u8; PRIVATE_BEACON_LEN];
        pdu[0] = PRIVATE_BEACON_TYPE;
        pdu[1..14].copy_from_slice(random);
        pdu[14..19].copy_from_slice(&obfuscated);
        pdu[19..].copy_from_slice(tag.as_bytes());
        Ok(pdu)
    }
}

/// Node Identity hash:
/// `e(IdentityKey, 0x000000000000 || Random || Address)[8..16]`.
pub fn node_identity_hash(identity_key: &Key128, random: &[u8; 8], address: u16) -> [u8; 8] {
    let mut input = [0u8; BLOCK_SIZE];
    input[6..14].copy_from_slice(random);
    input[14..].copy_from_slice(&address.to_be_bytes());

    let encrypted = encrypt_block(identity_key, &input);
    let mut hash = [0u8; 8];
    hash.copy_from_slice(&encrypted[8..]);
    hash
}
