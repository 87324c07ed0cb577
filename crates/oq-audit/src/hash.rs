use oq_schemas::SQL_HASH_LEN;
use sha2::{Digest, Sha256};

/// First [`SQL_HASH_LEN`] hex chars of the SHA-256 of a statement's text.
/// Audit payloads carry this, never the raw SQL (spec §4.7).
pub fn sql_hash(sql: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sql.as_bytes());
    let full = hex::encode(hasher.finalize());
    full[..SQL_HASH_LEN].to_string()
}
