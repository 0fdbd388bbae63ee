use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::transaction::Transaction;

/// Length of a hex-encoded SHA-256 digest
pub const HASH_HEX_LEN: usize = 64;

/// Every hashed field of a block, i.e. everything except the hash itself
#[derive(Serialize)]
struct BlockContent<'a> {
    difficulty: u32,
    index: u64,
    nonce: u64,
    previous_hash: &'a str,
    timestamp: &'a DateTime<Utc>,
    transactions: &'a [Transaction],
}

/// Calculates the content hash of a block
///
/// The fields go through `serde_json::Value` first. Its object map is ordered,
/// so keys come out sorted no matter how the struct above is laid out.
///
/// # Returns
///
/// The SHA-256 hash of the canonical JSON as a lowercase hexadecimal string
pub fn hash_block(
    index: u64,
    timestamp: &DateTime<Utc>,
    transactions: &[Transaction],
    previous_hash: &str,
    difficulty: u32,
    nonce: u64,
) -> String {
    let content = BlockContent {
        difficulty,
        index,
        nonce,
        previous_hash,
        timestamp,
        transactions,
    };

    // Serializing plain data into a Value cannot fail.
    let canonical = serde_json::to_value(&content)
        .map(|value| value.to_string())
        .unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Checks whether `hash` starts with `difficulty` zero characters
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let width = difficulty as usize;
    hash.len() >= width && hash.bytes().take(width).all(|b| b == b'0')
}
