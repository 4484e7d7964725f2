//! End-to-end Network PDU protection using only the public API.
//!
//! Assembles and parses complete Network PDUs the way the network layer
//! does: derive NID/EncryptionKey/PrivacyKey with k2, encrypt
//! `DST || TransportPDU` with AES-CCM under the network nonce, then
//! obfuscate `CTL/TTL || SEQ || SRC` with the PECB.

use anyhow::{ensure, Context, Result};
use mesh_security::nonce::network_nonce;
use mesh_security::{
    decrypt_ccm, deobfuscate, encrypt_ccm, obfuscate, Key128, Mic, MicSize,
    NetworkKeyDerivatives, SecurityError,
};

const NETWORK_KEY: &str = "7dd7364cd842ad18c17c2b820c84c3d6";
const IV_INDEX: u32 = 0x12345678;

const CONTROL_PDU: &str = "68eca487516765b5e5bfdacbaf6cb7fb6bff871f035444ce83a670df";
const ACCESS_PDU: &str = "68cab5c5348a230afba8c63d4e686364979deaf4fd40961145939cda0e";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn network_keys() -> Result<NetworkKeyDerivatives> {
    let key = Key128::try_from(hex::decode(NETWORK_KEY)?.as_slice())?;
    Ok(NetworkKeyDerivatives::derive(&key)?)
}

#[derive(Debug, PartialEq, Eq)]
struct NetworkPdu {
    ctl: bool,
    ttl: u8,
    seq: u32,
    src: u16,
    dst: u16,
    transport_pdu: Vec<u8>,
}

fn decode(pdu: &[u8], keys: &NetworkKeyDerivatives, iv_index: u32) -> Result<NetworkPdu> {
    ensure!(pdu.len() >= 14, "network PDU too short");
    ensure!(pdu[0] & 0x7F == keys.nid, "NID mismatch");

    let header = deobfuscate(&pdu[1..7], &pdu[7..], iv_index, &keys.privacy_key)?;
    let ctl = header[0] & 0x80 != 0;
    let ttl = header[0] & 0x7F;
    let seq = u32::from_be_bytes([0, header[1], header[2], header[3]]);
    let src = u16::from_be_bytes([header[4], header[5]]);

    let mic_size = if ctl { MicSize::Mic64 } else { MicSize::Mic32 };
    ensure!(
        pdu.len() >= 7 + 2 + mic_size.len(),
        "network PDU too short for DST and NetMIC"
    );
    let (encrypted, mic) = pdu[7..].split_at(pdu.len() - 7 - mic_size.len());
    let mic = Mic::try_from(mic)?;

    let nonce = network_nonce(ctl, ttl, seq, src, iv_index)?;
    let plaintext = decrypt_ccm(encrypted, &keys.encryption_key, &nonce, &mic)
        .context("NetMIC verification")?;

    Ok(NetworkPdu {
        ctl,
        ttl,
        seq,
        src,
        dst: u16::from_be_bytes([plaintext[0], plaintext[1]]),
        transport_pdu: plaintext[2..].to_vec(),
    })
}

fn encode(message: &NetworkPdu, keys: &NetworkKeyDerivatives, iv_index: u32) -> Result<Vec<u8>> {
    let mic_size = if message.ctl {
        MicSize::Mic64
    } else {
        MicSize::Mic32
    };

    let mut plaintext = message.dst.to_be_bytes().to_vec();
    plaintext.extend_from_slice(&message.transport_pdu);

    let nonce = network_nonce(message.ctl, message.ttl, message.seq, message.src, iv_index)?;
    let (mut encrypted, mic) = encrypt_ccm(&plaintext, &keys.encryption_key, &nonce, mic_size)?;
    encrypted.extend_from_slice(mic.as_bytes());

    let mut header = vec![(u8::from(message.ctl) << 7) | message.ttl];
    header.extend_from_slice(&message.seq.to_be_bytes()[1..]);
    header.extend_from_slice(&message.src.to_be_bytes());
    let obfuscated = obfuscate(&header, &encrypted, iv_index, &keys.privacy_key)?;

    let ivi = (iv_index & 1) as u8;
    let mut pdu = vec![(ivi << 7) | keys.nid];
    pdu.extend_from_slice(&obfuscated);
    pdu.extend_from_slice(&encrypted);
    Ok(pdu)
}

fn control_message() -> Result<NetworkPdu> {
    Ok(NetworkPdu {
        ctl: true,
        ttl: 0,
        seq: 1,
        src: 0x1201,
        dst: 0xFFFD,
        transport_pdu: hex::decode("034b50057e400000010000")?,
    })
}

fn access_message() -> Result<NetworkPdu> {
    Ok(NetworkPdu {
        ctl: false,
        ttl: 4,
        seq: 0x3129AB,
        src: 0x0003,
        dst: 0x1201,
        transport_pdu: hex::decode("8026ac01ee9dddfd2169326d23f3afdf")?,
    })
}

#[test]
fn derives_network_credentials() -> Result<()> {
    let keys = network_keys()?;
    assert_eq!(keys.nid, 0x68);
    assert_eq!(
        hex::encode(keys.encryption_key.as_bytes()),
        "0953fa93e7caac9638f58820220a398e"
    );
    assert_eq!(
        hex::encode(keys.privacy_key.as_bytes()),
        "8b84eedec100067d670971dd2aa700cf"
    );
    Ok(())
}

#[test]
fn decodes_control_message() -> Result<()> {
    init_tracing();
    let keys = network_keys()?;
    let decoded = decode(&hex::decode(CONTROL_PDU)?, &keys, IV_INDEX)?;
    assert_eq!(decoded, control_message()?);
    Ok(())
}

#[test]
fn decodes_access_message() -> Result<()> {
    init_tracing();
    let keys = network_keys()?;
    let decoded = decode(&hex::decode(ACCESS_PDU)?, &keys, IV_INDEX)?;
    assert_eq!(decoded, access_message()?);
    Ok(())
}

#[test]
fn encodes_control_message() -> Result<()> {
    let keys = network_keys()?;
    let pdu = encode(&control_message()?, &keys, IV_INDEX)?;
    assert_eq!(hex::encode(pdu), CONTROL_PDU);
    Ok(())
}

#[test]
fn encodes_access_message() -> Result<()> {
    let keys = network_keys()?;
    let pdu = encode(&access_message()?, &keys, IV_INDEX)?;
    assert_eq!(hex::encode(pdu), ACCESS_PDU);
    Ok(())
}

fn is_authentication_failure(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<SecurityError>(),
        Some(SecurityError::AuthenticationFailure)
    )
}

#[test]
fn rejects_pdu_under_wrong_iv_index() -> Result<()> {
    init_tracing();
    let keys = network_keys()?;
    let pdu = hex::decode(CONTROL_PDU)?;

    for iv_index in [0x12345677, 0x12345680] {
        let err = decode(&pdu, &keys, iv_index).expect_err("wrong IV Index must not decode");
        assert!(is_authentication_failure(&err), "unexpected error: {err:#}");
    }
    Ok(())
}

#[test]
fn rejects_pdu_under_wrong_network_key() -> Result<()> {
    let other = Key128::try_from(hex::decode("8dd7364cd842ad18c17c2b820c84c3d6")?.as_slice())?;
    let mut keys = NetworkKeyDerivatives::derive(&other)?;
    // Force the NID check to pass so the failure comes from the NetMIC.
    keys.nid = 0x68;

    let err = decode(&hex::decode(CONTROL_PDU)?, &keys, IV_INDEX)
        .expect_err("wrong network key must not decode");
    assert!(is_authentication_failure(&err), "unexpected error: {err:#}");
    Ok(())
}

#[test]
fn rejects_modified_ciphertext() -> Result<()> {
    let keys = network_keys()?;
    let modified = "68eca487516765b5e5bfdacbaf6cb7fb7bff871f035444ce83a670df";
    let err = decode(&hex::decode(modified)?, &keys, IV_INDEX)
        .expect_err("modified ciphertext must not decode");
    assert!(is_authentication_failure(&err), "unexpected error: {err:#}");
    Ok(())
}

#[test]
fn rejects_truncated_control_pdu() -> Result<()> {
    let keys = network_keys()?;
    let pdu = hex::decode(CONTROL_PDU)?;

    let err = decode(&pdu[..14], &keys, IV_INDEX).expect_err("truncated PDU must not decode");
    assert!(err.to_string().contains("too short"), "unexpected error: {err:#}");
    Ok(())
}
