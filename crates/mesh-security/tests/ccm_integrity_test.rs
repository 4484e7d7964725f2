//! Integrity properties of AES-CCM as seen by a caller: any single-bit
//! change to ciphertext, MIC, nonce, key or AAD is rejected, and no
//! plaintext is returned when it is.

use mesh_security::{
    decrypt_ccm, decrypt_ccm_with_aad, encrypt_ccm, encrypt_ccm_with_aad, Key128, Mic, MicSize,
    Nonce, SecurityError,
};
use proptest::prelude::*;

fn key() -> Key128 {
    Key128::from_bytes([
        0x63, 0x96, 0x47, 0x71, 0x73, 0x4f, 0xbd, 0x76, 0xe3, 0xb4, 0x05, 0x19, 0xd1, 0xd9, 0x4a,
        0x48,
    ])
}

fn nonce() -> Nonce {
    Nonce::from_bytes([
        0x01, 0x00, 0x00, 0x00, 0x07, 0x12, 0x01, 0xff, 0xff, 0x12, 0x34, 0x56, 0x78,
    ])
}

fn message() -> Vec<u8> {
    b"Bluetooth mesh upper transport access PDU".to_vec()
}

fn assert_rejected(result: Result<Vec<u8>, SecurityError>) {
    match result {
        Err(SecurityError::AuthenticationFailure) => {}
        Err(other) => panic!("expected AuthenticationFailure, got {other}"),
        Ok(plaintext) => panic!("tampered message decrypted to {} bytes", plaintext.len()),
    }
}

#[test]
fn ciphertext_bit_flips_are_detected() {
    let (ciphertext, mic) = encrypt_ccm(&message(), &key(), &nonce(), MicSize::Mic32).unwrap();

    for position in [0, 7, 15, 16, 31, ciphertext.len() - 1] {
        for bit in [0x01u8, 0x80] {
            let mut tampered = ciphertext.clone();
            tampered[position] ^= bit;
            assert_rejected(decrypt_ccm(&tampered, &key(), &nonce(), &mic));
        }
    }
}

#[test]
fn mic_bit_flips_are_detected() {
    let (ciphertext, mic) = encrypt_ccm(&message(), &key(), &nonce(), MicSize::Mic64).unwrap();

    for position in 0..mic.as_bytes().len() {
        let mut bytes = mic.as_bytes().to_vec();
        bytes[position] ^= 0x10;
        let tampered = Mic::try_from(bytes.as_slice()).unwrap();
        assert_rejected(decrypt_ccm(&ciphertext, &key(), &nonce(), &tampered));
    }
}

#[test]
fn nonce_and_key_changes_are_detected() {
    let (ciphertext, mic) = encrypt_ccm(&message(), &key(), &nonce(), MicSize::Mic32).unwrap();

    for position in [0, 4, 12] {
        let mut bytes = *nonce().as_bytes();
        bytes[position] ^= 0x01;
        assert_rejected(decrypt_ccm(&ciphertext, &key(), &Nonce::from_bytes(bytes), &mic));
    }

    let mut bytes = *key().as_bytes();
    bytes[15] ^= 0x01;
    assert_rejected(decrypt_ccm(&ciphertext, &Key128::from_bytes(bytes), &nonce(), &mic));
}

#[test]
fn truncated_ciphertext_is_detected() {
    let (ciphertext, mic) = encrypt_ccm(&message(), &key(), &nonce(), MicSize::Mic32).unwrap();
    assert_rejected(decrypt_ccm(&ciphertext[..ciphertext.len() - 1], &key(), &nonce(), &mic));
}

#[test]
fn virtual_address_label_is_bound() {
    let label = [0xA5u8; 16];
    let (ciphertext, mic) =
        encrypt_ccm_with_aad(&message(), &key(), &nonce(), MicSize::Mic32, &label).unwrap();

    let mut other_label = label;
    other_label[0] ^= 0x01;
    assert_rejected(decrypt_ccm_with_aad(&ciphertext, &key(), &nonce(), &mic, &other_label));

    let plaintext = decrypt_ccm_with_aad(&ciphertext, &key(), &nonce(), &mic, &label).unwrap();
    assert_eq!(plaintext, message());
}

#[test]
fn empty_plaintext_under_zero_key() {
    let (ciphertext, mic) =
        encrypt_ccm(&[], &Key128::zero(), &Nonce::from_bytes([0; 13]), MicSize::Mic32).unwrap();
    assert!(ciphertext.is_empty());
    assert_eq!(mic.size(), MicSize::Mic32);

    let plaintext = decrypt_ccm(&[], &Key128::zero(), &Nonce::from_bytes([0; 13]), &mic).unwrap();
    assert!(plaintext.is_empty());

    assert_rejected(decrypt_ccm(&[0x00], &Key128::zero(), &Nonce::from_bytes([0; 13]), &mic));
}

#[test]
fn malformed_inputs_fail_before_crypto() {
    assert!(matches!(
        Key128::try_from(&[0u8; 15][..]),
        Err(SecurityError::InvalidLength { field: "key", actual: 15, .. })
    ));
    assert!(matches!(
        Nonce::try_from(&[0u8; 12][..]),
        Err(SecurityError::InvalidLength { field: "nonce", actual: 12, .. })
    ));
    assert!(matches!(
        Mic::try_from(&[0u8; 6][..]),
        Err(SecurityError::InvalidLength { field: "MIC", actual: 6, .. })
    ));
}

fn mic_size() -> impl Strategy<Value = MicSize> {
    prop_oneof![Just(MicSize::Mic32), Just(MicSize::Mic64)]
}

proptest! {
    #[test]
    fn roundtrip_any_message(
        plaintext in proptest::collection::vec(any::<u8>(), 0..512),
        aad in proptest::collection::vec(any::<u8>(), 0..48),
        key in any::<[u8; 16]>(),
        nonce in any::<[u8; 13]>(),
        size in mic_size(),
    ) {
        let key = Key128::from_bytes(key);
        let nonce = Nonce::from_bytes(nonce);

        let (ciphertext, mic) = encrypt_ccm_with_aad(&plaintext, &key, &nonce, size, &aad).unwrap();
        prop_assert_eq!(ciphertext.len(), plaintext.len());
        prop_assert_eq!(mic.as_bytes().len(), size.len());

        let decrypted = decrypt_ccm_with_aad(&ciphertext, &key, &nonce, &mic, &aad).unwrap();
        prop_assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn any_single_bit_flip_is_rejected(
        plaintext in proptest::collection::vec(any::<u8>(), 1..128),
        index in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let (mut ciphertext, mic) = encrypt_ccm(&plaintext, &key(), &nonce(), MicSize::Mic32).unwrap();
        let position = index.index(ciphertext.len());
        ciphertext[position] ^= 1 << bit;

        let result = decrypt_ccm(&ciphertext, &key(), &nonce(), &mic);
        prop_assert!(matches!(result, Err(SecurityError::AuthenticationFailure)));
    }
}
