//! Network PDU header obfuscation.
//!
//! ```text
//! Privacy Random    = (EncDST || EncTransportPDU || NetMIC)[0..7]
//! Privacy Plaintext = 0x0000000000 || IV Index || Privacy Random
//! PECB              = e(PrivacyKey, Privacy Plaintext)
//! ObfuscatedData    = (CTL || TTL || SEQ || SRC) XOR PECB[0..6]
//! ```
//!
//! XOR is its own inverse, so obfuscation and deobfuscation are the same
//! transform.

use crate::block::{encrypt_block, xor_in_place};
use crate::error::{SecurityError, SecurityResult};
use crate::types::Key128;
use crate::BLOCK_SIZE;

/// Length of the obfuscated CTL/TTL, SEQ and SRC fields.
pub const OBFUSCATED_LEN: usize = 6;

/// Number of ciphertext bytes used as Privacy Random.
pub const PRIVACY_RANDOM_LEN: usize = 7;

/// Compute the Privacy Encrypted Cipher Block for one Network PDU.
pub fn pecb(
    privacy_random: &[u8; PRIVACY_RANDOM_LEN],
    iv_index: u32,
    privacy_key: &Key128,
) -> [u8; BLOCK_SIZE] {
    let mut privacy_plaintext = [0u8; BLOCK_SIZE];
    privacy_plaintext[5..9].copy_from_slice(&iv_index.to_be_bytes());
    privacy_plaintext[9..].copy_from_slice(privacy_random);
    encrypt_block(privacy_key, &privacy_plaintext)
}

/// Obfuscate up to 6 bytes of header `data`.
///
/// `privacy_random` is the encrypted part of the PDU; only its first 7 bytes
/// are used, so it must be at least that long. The result has the length
/// of `data`.
pub fn obfuscate(
    data: &[u8],
    privacy_random: &[u8],
    iv_index: u32,
    privacy_key: &Key128,
) -> SecurityResult<Vec<u8>> {
    if data.len() > OBFUSCATED_LEN {
        return Err(SecurityError::length("obfuscated data", "at most 6", data.len()));
    }
    let random: &[u8; PRIVACY_RANDOM_LEN] = privacy_random
        .get(..PRIVACY_RANDOM_LEN)
        .and_then(|r| r.try_into().ok())
        .ok_or_else(|| {
            SecurityError::length("privacy random", "at least 7", privacy_random.len())
        })?;

    let pecb = pecb(random, iv_index, privacy_key);
    let mut out = data.to_vec();
    xor_in_place(&mut out, &pecb[..OBFUSCATED_LEN]);

    tracing::trace!(iv_index, len = data.len(), "applied PECB");
    Ok(out)
}

/// Reverse [`obfuscate`]. Takes the same Privacy Random, which a receiver
/// reads from the still-encrypted part of the PDU.
pub fn deobfuscate(
    data: &[u8],
    privacy_random: &[u8],
    iv_index: u32,
    privacy_key: &Key128,
) -> SecurityResult<Vec<u8>> {
    obfuscate(data, privacy_random, iv_index, privacy_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key() -> Key128 {
        Key128::try_from(hex::decode("0123456789ABCDEF0123456789ABCDEF").unwrap().as_slice())
            .unwrap()
    }

    #[test]
    fn test_obfuscation_vector() {
        let source = hex::decode("050102030001").unwrap();
        let random = hex::decode("00112233445566").unwrap();

        let obfuscated = obfuscate(&source, &random, 0x12345678, &key()).unwrap();
        assert_eq!(hex::encode(&obfuscated), "9c0dae8bc512");

        let deobfuscated = deobfuscate(&obfuscated, &random, 0x12345678, &key()).unwrap();
        assert_eq!(deobfuscated, source);
    }

    #[test]
    fn test_only_first_seven_random_bytes_matter() {
        let source = hex::decode("050102030001").unwrap();
        let short = hex::decode("00112233445566").unwrap();
        let long = hex::decode("00112233445566778899").unwrap();

        assert_eq!(
            obfuscate(&source, &short, 7, &key()).unwrap(),
            obfuscate(&source, &long, 7, &key()).unwrap()
        );
    }

    #[test]
    fn test_short_privacy_random_rejected() {
        let result = obfuscate(&[0u8; 6], &[0u8; 6], 0, &key());
        assert!(matches!(
            result,
            Err(SecurityError::InvalidLength { field: "privacy random", actual: 6, .. })
        ));
    }

    #[test]
    fn test_long_data_rejected() {
        let result = obfuscate(&[0u8; 7], &[0u8; 7], 0, &key());
        assert!(matches!(result, Err(SecurityError::InvalidLength { .. })));
    }

    #[test]
    fn test_iv_index_changes_pecb() {
        let random = [0x42u8; PRIVACY_RANDOM_LEN];
        assert_ne!(pecb(&random, 1, &key()), pecb(&random, 2, &key()));
    }

    proptest! {
        #[test]
        fn deobfuscate_inverts_obfuscate(
            data in any::<[u8; 6]>(),
            random in any::<[u8; 7]>(),
            iv_index in any::<u32>(),
            key in any::<[u8; 16]>(),
        ) {
            let key = Key128::from_bytes(key);
            let obfuscated = obfuscate(&data, &random, iv_index, &key).unwrap();
            prop_assert_eq!(obfuscated.len(), data.len());
            let restored = deobfuscate(&obfuscated, &random, iv_index, &key).unwrap();
            prop_assert_eq!(restored, data.to_vec());
        }
    }
}
