use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::error::BlockchainError;
use super::hasher::{self, HASH_HEX_LEN};
use super::transaction::Transaction;

/// Previous-hash and hash of the genesis block: 64 zero characters
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Cooperative cancellation flag for a proof-of-work search.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks every search polling this token to stop
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clears the flag so the token can be reused for the next search
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Represents a block in the blockchain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Block {
    /// Index of the block in the chain
    pub index: u64,

    /// Timestamp taken when sealing started
    #[schema(value_type = String, example = "2023-01-01T12:00:00Z")]
    pub timestamp: DateTime<Utc>,

    /// List of transactions included in this block
    pub transactions: Vec<Transaction>,

    /// Hash of the previous block
    pub previous_hash: String,

    /// Number of leading zeros required when the block was sealed
    pub difficulty: u32,

    /// Proof of work (nonce)
    pub nonce: u64,

    /// Hash of the current block (calculated)
    pub hash: String,
}

impl Block {
    /// Creates the genesis block. It is never mined: both hashes are the
    /// all-zero sentinel.
    pub fn genesis(timestamp: DateTime<Utc>) -> Self {
        Block {
            index: 0,
            timestamp,
            transactions: vec![Transaction::genesis(timestamp)],
            previous_hash: GENESIS_HASH.to_string(),
            difficulty: 0,
            nonce: 0,
            hash: GENESIS_HASH.to_string(),
        }
    }

    /// Performs proof of work to find a valid hash
    ///
    /// # Arguments
    ///
    /// * `index` - The index of the new block
    /// * `timestamp` - Fixed for every attempt of the search
    /// * `transactions` - The transactions to include in the block
    /// * `previous_hash` - The hash of the previous block
    /// * `difficulty` - Number of leading zero hex characters required
    /// * `start_nonce` - First nonce to try
    /// * `cancel` - Polled before every attempt
    ///
    /// # Returns
    ///
    /// The sealed block, or `MiningCancelled` once `cancel` is raised
    pub fn seal(
        index: u64,
        timestamp: DateTime<Utc>,
        transactions: Vec<Transaction>,
        previous_hash: String,
        difficulty: u32,
        start_nonce: u64,
        cancel: &CancelToken,
    ) -> Result<Self, BlockchainError> {
        if difficulty as usize > HASH_HEX_LEN {
            return Err(BlockchainError::UnsatisfiableDifficulty(difficulty));
        }

        let mut nonce = start_nonce;
        let mut attempts: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(BlockchainError::MiningCancelled { attempts });
            }

            let hash = hasher::hash_block(
                index,
                &timestamp,
                &transactions,
                &previous_hash,
                difficulty,
                nonce,
            );
            attempts += 1;

            if hasher::meets_difficulty(&hash, difficulty) {
                return Ok(Block {
                    index,
                    timestamp,
                    transactions,
                    previous_hash,
                    difficulty,
                    nonce,
                    hash,
                });
            }

            nonce = match nonce.checked_add(1) {
                Some(next) => next,
                None => return Err(BlockchainError::MiningCancelled { attempts }),
            };
        }
    }

    /// Recalculates the hash from the stored fields
    pub fn calculate_hash(&self) -> String {
        hasher::hash_block(
            self.index,
            &self.timestamp,
            &self.transactions,
            &self.previous_hash,
            self.difficulty,
            self.nonce,
        )
    }

    /// Checks the proof-of-work predicate against the stored hash
    pub fn meets_difficulty(&self) -> bool {
        hasher::meets_difficulty(&self.hash, self.difficulty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfers() -> Vec<Transaction> {
        vec![Transaction::new("alice", "bob", 30, Utc::now())]
    }

    #[test]
    fn test_genesis_block() {
        let genesis = Block::genesis(Utc::now());

        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.hash, GENESIS_HASH);
        assert_eq!(genesis.previous_hash, GENESIS_HASH);
        assert_eq!(genesis.transactions.len(), 1);
        assert!(genesis.transactions[0].is_network());
        assert_eq!(genesis.transactions[0].amount, 0);
    }

    #[test]
    fn test_seal_satisfies_difficulty() {
        let block = Block::seal(
            1,
            Utc::now(),
            transfers(),
            GENESIS_HASH.to_string(),
            2,
            0,
            &CancelToken::new(),
        )
        .unwrap();

        assert!(block.hash.starts_with("00"));
        assert!(block.meets_difficulty());
        assert_eq!(block.hash, block.calculate_hash());
        assert_eq!(block.difficulty, 2);
    }

    #[test]
    fn test_seal_starts_at_given_nonce() {
        let block = Block::seal(
            1,
            Utc::now(),
            transfers(),
            "prev".to_string(),
            0,
            42,
            &CancelToken::new(),
        )
        .unwrap();

        // Difficulty 0 accepts the first attempt.
        assert_eq!(block.nonce, 42);
    }

    #[test]
    fn test_seal_honours_cancellation() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = Block::seal(1, Utc::now(), transfers(), "prev".to_string(), 64, 0, &cancel);

        assert!(matches!(result, Err(BlockchainError::MiningCancelled { attempts: 0 })));
    }

    #[test]
    fn test_seal_rejects_impossible_difficulty() {
        let result = Block::seal(
            1,
            Utc::now(),
            transfers(),
            "prev".to_string(),
            65,
            0,
            &CancelToken::new(),
        );

        assert!(matches!(result, Err(BlockchainError::UnsatisfiableDifficulty(65))));
    }

    #[test]
    fn test_cancel_token_reset() {
        let token = CancelToken::new();
        let shared = token.clone();

        shared.cancel();
        assert!(token.is_cancelled());

        token.reset();
        assert!(!shared.is_cancelled());
    }
}
