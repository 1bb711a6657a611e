//! Connector credential handling and session ticket generation.
//!
//! The Web Connector sends its password in clear over the SOAP channel, so
//! the stored digest only needs to match what the connector configuration
//! dialog sends: an unsalted SHA-256 hex digest compared in constant time.

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Hash a connector password for storage.
pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    hex::encode(digest)
}

/// Compare a presented password against the stored digest in constant time.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let presented = hash_password(password);
    ConstantTimeEq::ct_eq(presented.as_bytes(), stored_hash.as_bytes()).into()
}

/// Generate a 256-bit session ticket, hex-encoded to 64 characters.
pub fn generate_ticket() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
