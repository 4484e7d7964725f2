//! mesh-security: the cryptographic toolbox of a Bluetooth Mesh stack
//!
//! Everything is built on a single primitive, one AES-128 block encryption:
//!
//! ```text
//! e (AES-128 block)
//!   ├── AES-CMAC ── s1 (salt) ── k1 / k2 / k3 / k4 (key derivation)
//!   │                 └── beacon authentication, virtual addresses
//!   ├── AES-CCM  (CTR keystream + CBC-MAC, 13-byte nonce, MIC 32/64)
//!   │     └── network / transport PDUs, private beacons, provisioning data
//!   └── PECB     (network header obfuscation)
//! HMAC-SHA-256 ── s2 ── k5 (HMAC-SHA-256 provisioning algorithm)
//! ```
//!
//! All operations are pure functions over caller-supplied bytes; the only
//! I/O is the entropy source behind [`generate_random`].

pub mod beacon;
pub mod block;
pub mod ccm;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod mac;
pub mod nonce;
pub mod obfuscation;
pub mod provisioning;
pub mod random;
pub mod types;

pub use beacon::{node_identity_hash, BeaconState, PrivateBeacon, SecureNetworkBeacon};
pub use block::{encrypt_block, encrypt_block_slice};
pub use ccm::{decrypt_ccm, decrypt_ccm_with_aad, encrypt_ccm, encrypt_ccm_with_aad, MAX_CCM_PAYLOAD};
pub use error::{SecurityError, SecurityResult};
pub use kdf::{k1, k2, k3, k4, k5, K2Output};
pub use keys::{
    aid, generate_key, network_id, virtual_address, FriendshipCredentials, NetworkKeyDerivatives,
};
pub use mac::{cmac, hmac_sha256, s1, s2};
pub use obfuscation::{deobfuscate, obfuscate};
pub use provisioning::{
    confirmation, decrypt_provisioning_data, encrypt_provisioning_data, ProvisioningAlgorithm,
    SessionKeys,
};
pub use random::generate_random;
pub use types::{Key128, Mic, MicSize, Nonce};

/// Size of every mesh key in bytes (128-bit)
pub const KEY_SIZE: usize = 16;

/// Size of a mesh CCM nonce (104-bit)
pub const NONCE_SIZE: usize = 13;

/// AES block size
pub const BLOCK_SIZE: usize = 16;
