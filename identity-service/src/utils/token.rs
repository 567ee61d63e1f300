//! Opaque token generation and at-rest hashing.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Generate a cryptographically random opaque token (64 hex chars).
pub fn generate_opaque_token() -> String {
    let mut rng = rand::thread_rng();
    let token_bytes: [u8; 32] = rng.gen();
    hex::encode(token_bytes)
}

/// Hash a token for storage. Raw token values are never persisted.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
