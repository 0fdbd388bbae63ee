use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use std::fmt;

use super::block::{Block, CancelToken};
use super::error::BlockchainError;
use super::transaction::Transaction;

/// Why a block failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityViolation {
    /// Stored hash differs from the hash of the stored fields
    HashMismatch,

    /// `previous_hash` differs from the preceding block's stored hash
    PreviousHashMismatch,
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityViolation::HashMismatch => write!(f, "hash mismatch"),
            IntegrityViolation::PreviousHashMismatch => write!(f, "previous-hash mismatch"),
        }
    }
}

/// Outcome of [`Chain::validate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStatus {
    Valid,
    Invalid {
        block_index: u64,
        reason: IntegrityViolation,
    },
}

impl ChainStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, ChainStatus::Valid)
    }
}

/// The ordered, append-only sequence of sealed blocks.
///
/// Always holds at least the genesis block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Chain {
    /// Starts a chain holding only the genesis block
    pub fn new(genesis_time: DateTime<Utc>) -> Self {
        Chain {
            blocks: vec![Block::genesis(genesis_time)],
        }
    }

    /// Rebuilds a chain from stored blocks. `None` when `blocks` is empty.
    pub fn from_blocks(blocks: Vec<Block>) -> Option<Self> {
        if blocks.is_empty() {
            None
        } else {
            Some(Chain { blocks })
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The most recent block
    pub fn tip(&self) -> &Block {
        // Never empty: constructors guarantee the genesis block.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn get(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.blocks.get(i))
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Seals `transactions` on top of the tip and appends the new block.
    ///
    /// The chain is left untouched if the search is cancelled.
    pub fn append(
        &mut self,
        transactions: Vec<Transaction>,
        difficulty: u32,
        timestamp: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> Result<&Block, BlockchainError> {
        let block = Block::seal(
            self.blocks.len() as u64,
            timestamp,
            transactions,
            self.tip().hash.clone(),
            difficulty,
            0,
            cancel,
        )?;

        self.blocks.push(block);
        Ok(self.tip())
    }

    /// Checks stored hashes and links from block 1 onward.
    ///
    /// The proof-of-work predicate is not re-checked, so a rewrite of the
    /// last block alone goes unnoticed.
    pub fn validate(&self) -> ChainStatus {
        for pair in self.blocks.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);

            if current.hash != current.calculate_hash() {
                return ChainStatus::Invalid {
                    block_index: current.index,
                    reason: IntegrityViolation::HashMismatch,
                };
            }

            if current.previous_hash != previous.hash {
                return ChainStatus::Invalid {
                    block_index: current.index,
                    reason: IntegrityViolation::PreviousHashMismatch,
                };
            }
        }

        ChainStatus::Valid
    }

    /// DEMO ONLY: overwrites a block's transactions and rehashes it without
    /// proof of work. Exists to show that `validate` catches the broken link.
    pub fn tamper_block(
        &mut self,
        index: u64,
        new_transactions: Vec<Transaction>,
    ) -> Result<&Block, BlockchainError> {
        let len = self.blocks.len();
        let block = usize::try_from(index)
            .ok()
            .and_then(|i| self.blocks.get_mut(i))
            .ok_or(BlockchainError::InvalidBlockIndex { index, len })?;

        block.transactions = new_transactions;
        block.hash = block.calculate_hash();
        Ok(&*block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::block::GENESIS_HASH;

    fn chain_with_blocks(count: usize) -> Chain {
        let mut chain = Chain::new(Utc::now());
        for i in 0..count {
            let tx = Transaction::new("alice", "bob", i as i64 + 1, Utc::now());
            chain.append(vec![tx], 1, Utc::now(), &CancelToken::new()).unwrap();
        }
        chain
    }

    fn forged() -> Vec<Transaction> {
        vec![Transaction::new("Mallory", "Mallory", 1_000, Utc::now())]
    }

    #[test]
    fn test_new_chain() {
        let chain = Chain::new(Utc::now());

        assert_eq!(chain.len(), 1);
        assert_eq!(chain.tip().hash, GENESIS_HASH);
        assert!(chain.validate().is_valid());
    }

    #[test]
    fn test_append_links_blocks() {
        let chain = chain_with_blocks(3);

        assert_eq!(chain.len(), 4);
        for (i, pair) in chain.blocks().windows(2).enumerate() {
            assert_eq!(pair[1].index, i as u64 + 1);
            assert_eq!(pair[1].previous_hash, pair[0].hash);
            assert_eq!(pair[1].hash, pair[1].calculate_hash());
            assert!(pair[1].meets_difficulty());
        }
        assert_eq!(chain.validate(), ChainStatus::Valid);
    }

    #[test]
    fn test_cancelled_append_leaves_chain_unchanged() {
        let mut chain = chain_with_blocks(1);
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = chain.append(forged(), 1, Utc::now(), &cancel);

        assert!(matches!(result, Err(BlockchainError::MiningCancelled { .. })));
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_tamper_breaks_next_link() {
        let mut chain = chain_with_blocks(2);
        chain.tamper_block(1, forged()).unwrap();

        assert_eq!(
            chain.validate(),
            ChainStatus::Invalid {
                block_index: 2,
                reason: IntegrityViolation::PreviousHashMismatch,
            }
        );
    }

    #[test]
    fn test_tamper_genesis_breaks_first_link() {
        let mut chain = chain_with_blocks(1);
        chain.tamper_block(0, forged()).unwrap();

        assert_eq!(
            chain.validate(),
            ChainStatus::Invalid {
                block_index: 1,
                reason: IntegrityViolation::PreviousHashMismatch,
            }
        );
    }

    #[test]
    fn test_tampering_last_block_is_not_detected() {
        let mut chain = chain_with_blocks(2);
        chain.tamper_block(2, forged()).unwrap();

        // Known gap: only hashes and links are checked.
        assert!(chain.validate().is_valid());
    }

    #[test]
    fn test_field_edit_without_rehash_is_hash_mismatch() {
        let mut chain = chain_with_blocks(2);
        chain.blocks[1].transactions = forged();

        assert_eq!(
            chain.validate(),
            ChainStatus::Invalid {
                block_index: 1,
                reason: IntegrityViolation::HashMismatch,
            }
        );
    }

    #[test]
    fn test_tamper_invalid_index() {
        let mut chain = chain_with_blocks(1);

        let result = chain.tamper_block(5, forged());

        assert!(matches!(
            result,
            Err(BlockchainError::InvalidBlockIndex { index: 5, len: 2 })
        ));
    }

    #[test]
    fn test_integrity_violation_messages() {
        assert_eq!(IntegrityViolation::HashMismatch.to_string(), "hash mismatch");
        assert_eq!(
            IntegrityViolation::PreviousHashMismatch.to_string(),
            "previous-hash mismatch"
        );
    }
}
