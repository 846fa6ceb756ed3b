//! Content hashing.

use sha2::{Digest, Sha256};

/// Prefix carried by every content hash.
pub const HASH_PREFIX: &str = "sha256:";

/// Hash text content as `sha256:<hex>`.
pub fn compute_hash(content: &str) -> String {
    sha256_bytes(content.as_bytes())
}

/// Hash raw bytes as `sha256:<hex>`.
pub fn sha256_bytes(bytes: &[u8]) -> String {
    format!("{}{:x}", HASH_PREFIX, Sha256::digest(bytes))
}
