//! Provisioning key material: confirmation values, session keys and
//! provisioning data encryption.
//!
//! Everything here starts from an ECDH shared secret that the caller has
//! already computed; key pair generation and the key exchange itself live
//! outside this crate.
//!
//! ```text
//! CMAC-AES128 algorithm:
//!   ConfirmationSalt = s1(ConfirmationInputs)
//!   ConfirmationKey  = k1(ECDHSecret, ConfirmationSalt, "prck")
//!   Confirmation     = AES-CMAC(ConfirmationKey, Random || AuthValue)
//! HMAC-SHA256 algorithm:
//!   ConfirmationSalt = s2(ConfirmationInputs)
//!   ConfirmationKey  = k5(ECDHSecret || AuthValue, ConfirmationSalt, "prck256")
//!   Confirmation     = HMAC-SHA-256(ConfirmationKey, Random)
//!
//! ProvisioningSalt = s1(ConfirmationSalt || RandomProvisioner || RandomDevice)
//! SessionKey   = k1(ECDHSecret, ProvisioningSalt, "prsk")
//! SessionNonce = k1(ECDHSecret, ProvisioningSalt, "prsn")[3..16]
//! DeviceKey    = k1(ECDHSecret, ProvisioningSalt, "prdk")
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::ccm::{decrypt_ccm, encrypt_ccm};
use crate::error::{SecurityError, SecurityResult};
use crate::kdf::{k1, k5};
use crate::mac::{cmac, hmac_sha256, s1, s2};
use crate::types::{Key128, Mic, MicSize, Nonce};
use crate::NONCE_SIZE;

/// Size of the ECDH shared secret (P-256 X coordinate).
pub const ECDH_SECRET_SIZE: usize = 32;

/// Size of the Provisioning Data plaintext: NetKey, Key Index, Flags,
/// IV Index, Unicast Address.
pub const PROVISIONING_DATA_SIZE: usize = 25;

const PROVISIONING_MIC: MicSize = MicSize::Mic64;

/// Provisioning algorithm negotiated in the Provisioning Start PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProvisioningAlgorithm {
    #[serde(rename = "BTM_ECDH_P256_CMAC_AES128_AES_CCM")]
    P256CmacAes128,
    #[serde(rename = "BTM_ECDH_P256_HMAC_SHA256_AES_CCM")]
    P256HmacSha256,
}

impl ProvisioningAlgorithm {
    /// Length of the Provisioning Random, AuthValue and Confirmation.
    pub const fn value_len(self) -> usize {
        match self {
            Self::P256CmacAes128 => 16,
            Self::P256HmacSha256 => 32,
        }
    }

    /// Compute the Confirmation Salt over the Confirmation Inputs.
    pub fn confirmation_salt(self, confirmation_inputs: &[u8]) -> SecurityResult<Vec<u8>> {
        match self {
            Self::P256CmacAes128 => Ok(s1(confirmation_inputs)?.to_vec()),
            Self::P256HmacSha256 => Ok(s2(confirmation_inputs)?.to_vec()),
        }
    }

    /// Derive the Confirmation Key from the Confirmation Salt.
    ///
    /// 16 bytes (`k1`) for the CMAC algorithm, 32 bytes (`k5`, with the
    /// AuthValue appended to the secret) for the HMAC algorithm.
    pub fn confirmation_key(
        self,
        confirmation_salt: &[u8],
        ecdh_secret: &[u8],
        auth_value: &[u8],
    ) -> SecurityResult<Zeroizing<Vec<u8>>> {
        check_secret(ecdh_secret)?;
        self.check_value("auth value", auth_value)?;

        match self {
            Self::P256CmacAes128 => {
                let salt: &[u8; 16] = confirmation_salt.try_into().map_err(|_| {
                    SecurityError::length("confirmation salt", "16", confirmation_salt.len())
                })?;
                let key = k1(ecdh_secret, salt, b"prck")?;
                Ok(Zeroizing::new(key.as_bytes().to_vec()))
            }
            Self::P256HmacSha256 => {
                let salt: &[u8; 32] = confirmation_salt.try_into().map_err(|_| {
                    SecurityError::length("confirmation salt", "32", confirmation_salt.len())
                })?;
                let mut n = Zeroizing::new(Vec::with_capacity(64));
                n.extend_from_slice(ecdh_secret);
                n.extend_from_slice(auth_value);
                let mut key = k5(&n, salt, b"prck256")?;
                let out = Zeroizing::new(key.to_vec());
                key.zeroize();
                Ok(out)
            }
        }
    }

    fn check_value(self, field: &'static str, value: &[u8]) -> SecurityResult<()> {
        if value.len() != self.value_len() {
            let expected = match self {
                Self::P256CmacAes128 => "16",
                Self::P256HmacSha256 => "32",
            };
            return Err(SecurityError::length(field, expected, value.len()));
        }
        Ok(())
    }
}

impl FromStr for ProvisioningAlgorithm {
    type Err = SecurityError;

    fn from_str(s: &str) -> SecurityResult<Self> {
        match s {
            "BTM_ECDH_P256_CMAC_AES128_AES_CCM" | "cmac-aes128" => Ok(Self::P256CmacAes128),
            "BTM_ECDH_P256_HMAC_SHA256_AES_CCM" | "hmac-sha256" => Ok(Self::P256HmacSha256),
            _ => Err(SecurityError::InvalidInput("unknown provisioning algorithm")),
        }
    }
}

impl fmt::Display for ProvisioningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::P256CmacAes128 => f.write_str("BTM_ECDH_P256_CMAC_AES128_AES_CCM"),
            Self::P256HmacSha256 => f.write_str("BTM_ECDH_P256_HMAC_SHA256_AES_CCM"),
        }
    }
}

/// Compute the Provisioning Confirmation value for one side.
///
/// `random` and `auth_value` are 16 bytes for the CMAC algorithm and 32
/// bytes for the HMAC algorithm; the result has the same length.
pub fn confirmation(
    algorithm: ProvisioningAlgorithm,
    confirmation_inputs: &[u8],
    ecdh_secret: &[u8],
    random: &[u8],
    auth_value: &[u8],
) -> SecurityResult<Vec<u8>> {
    algorithm.check_value("provisioning random", random)?;

    let salt = algorithm.confirmation_salt(confirmation_inputs)?;
    let key = algorithm.confirmation_key(&salt, ecdh_secret, auth_value)?;

    let value = match algorithm {
        ProvisioningAlgorithm::P256CmacAes128 => {
            let key = Key128::try_from(key.as_slice())?;
            let mut message = Zeroizing::new(Vec::with_capacity(32));
            message.extend_from_slice(random);
            message.extend_from_slice(auth_value);
            cmac(&key, &message).to_vec()
        }
        ProvisioningAlgorithm::P256HmacSha256 => {
            let key: &[u8; 32] = key
                .as_slice()
                .try_into()
                .map_err(|_| SecurityError::length("confirmation key", "32", key.len()))?;
            hmac_sha256(key, random).to_vec()
        }
    };

    tracing::debug!(%algorithm, "computed provisioning confirmation");
    Ok(value)
}

/// Keys established at the end of provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKeys {
    pub session_key: Key128,
    pub session_nonce: Nonce,
    pub device_key: Key128,
}

impl SessionKeys {
    pub fn derive(
        algorithm: ProvisioningAlgorithm,
        confirmation_inputs: &[u8],
        ecdh_secret: &[u8],
        provisioner_random: &[u8],
        device_random: &[u8],
    ) -> SecurityResult<Self> {
        check_secret(ecdh_secret)?;
        algorithm.check_value("provisioner random", provisioner_random)?;
        algorithm.check_value("device random", device_random)?;

        let confirmation_salt = algorithm.confirmation_salt(confirmation_inputs)?;
        let mut salt_input = Vec::with_capacity(confirmation_salt.len() + 64);
        salt_input.extend_from_slice(&confirmation_salt);
        salt_input.extend_from_slice(provisioner_random);
        salt_input.extend_from_slice(device_random);
        let provisioning_salt = s1(&salt_input)?;

        let session_key = k1(ecdh_secret, &provisioning_salt, b"prsk")?;
        let nonce_material = k1(ecdh_secret, &provisioning_salt, b"prsn")?;
        let session_nonce = Nonce::try_from(&nonce_material.as_bytes()[16 - NONCE_SIZE..])?;
        let device_key = k1(ecdh_secret, &provisioning_salt, b"prdk")?;

        tracing::debug!(%algorithm, "derived provisioning session keys");
        Ok(Self {
            session_key,
            session_nonce,
            device_key,
        })
    }
}

/// Encrypt the Provisioning Data. Returns `ciphertext || MIC` (33 bytes).
pub fn encrypt_provisioning_data(data: &[u8], keys: &SessionKeys) -> SecurityResult<Vec<u8>> {
    if data.len() != PROVISIONING_DATA_SIZE {
        return Err(SecurityError::length("provisioning data", "25", data.len()));
    }
    let (mut pdu, mic) = encrypt_ccm(data, &keys.session_key, &keys.session_nonce, PROVISIONING_MIC)?;
    pdu.extend_from_slice(mic.as_bytes());
    Ok(pdu)
}

/// Decrypt and authenticate `ciphertext || MIC` produced by
/// [`encrypt_provisioning_data`].
pub fn decrypt_provisioning_data(pdu: &[u8], keys: &SessionKeys) -> SecurityResult<Vec<u8>> {
    let expected = PROVISIONING_DATA_SIZE + PROVISIONING_MIC.len();
    if pdu.len() != expected {
        return Err(SecurityError::length("encrypted provisioning data", "33", pdu.len()));
    }
    let (ciphertext, mic) = pdu.split_at(PROVISIONING_DATA_SIZE);
    let mic = Mic::try_from(mic)?;
    decrypt_ccm(ciphertext, &keys.session_key, &keys.session_nonce, &mic)
}

fn check_secret(ecdh_secret: &[u8]) -> SecurityResult<()> {
    if ecdh_secret.len() != ECDH_SECRET_SIZE {
        return Err(SecurityError::length("ECDH secret", "32", ecdh_secret.len()));
    }
    Ok(())
}
