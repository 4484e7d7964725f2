//! Random generation contract.
//!
//! Entropy comes from an external, cryptographically secure source. A
//! failing source is reported as [`SecurityError::EntropySourceFailure`];
//! it is never retried here and never replaced with a weaker generator.

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::error::{SecurityError, SecurityResult};

/// 128 bits of randomness from the operating system CSPRNG.
pub fn generate_random() -> SecurityResult<[u8; 16]> {
    generate_random_with(&mut OsRng)
}

/// 128 bits of randomness from `rng`.
pub fn generate_random_with<R: RngCore + CryptoRng + ?Sized>(
    rng: &mut R,
) -> SecurityResult<[u8; 16]> {
    let mut buf = [0u8; 16];
    fill_random(rng, &mut buf)?;
    Ok(buf)
}

/// Fill `buf` from `rng`, e.g. a 32-byte provisioning random.
pub fn fill_random<R: RngCore + CryptoRng + ?Sized>(
    rng: &mut R,
    buf: &mut [u8],
) -> SecurityResult<()> {
    rng.try_fill_bytes(buf).map_err(|e| {
        tracing::warn!("entropy source failed: {e}");
        SecurityError::EntropySourceFailure(e.to_string())
    })
}
