// Blockchain module
//
// This module contains the ledger engine including:
// - Block structure and proof of work
// - Chain linkage and validation
// - Wallets, credentials and the transaction pool
// - Difficulty adjustment
// - Durable storage

pub mod account;
pub mod block;
pub mod chain;
pub mod clock;
pub mod crypto;
pub mod difficulty;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod pool;
pub mod storage;
pub mod transaction;

// Re-export main components for easier access
pub use block::{Block, CancelToken, GENESIS_HASH};
pub use chain::{Chain, ChainStatus, IntegrityViolation};
pub use clock::{Clock, SystemClock};
pub use crypto::{Argon2Hasher, CredentialHasher};
pub use engine::{Blockchain, MineOutcome};
pub use error::BlockchainError;
pub use storage::{MemoryStore, SledStore, Store};
pub use transaction::{Transaction, NETWORK};
