use thiserror::Error;

use super::crypto::CredentialError;
use super::storage::StorageError;

/// Errors that can occur during blockchain operations
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("Username already exists: {0}")]
    DuplicateUser(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("No transactions available to mine")]
    EmptyPool,

    #[error("Invalid block index {index} (chain length {len})")]
    InvalidBlockIndex { index: u64, len: usize },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Mining cancelled after {attempts} attempts")]
    MiningCancelled { attempts: u64 },

    #[error("Difficulty {0} can never be satisfied by a 64-character hash")]
    UnsatisfiableDifficulty(u32),

    #[error("Worker unavailable: {0}")]
    WorkerUnavailable(String),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl BlockchainError {
    /// Stable machine-readable code, distinct for every variant
    pub fn code(&self) -> &'static str {
        match self {
            BlockchainError::DuplicateUser(_) => "duplicate_user",
            BlockchainError::InvalidCredentials => "invalid_credentials",
            BlockchainError::InsufficientBalance { .. } => "insufficient_balance",
            BlockchainError::EmptyPool => "empty_pool",
            BlockchainError::InvalidBlockIndex { .. } => "invalid_block_index",
            BlockchainError::MalformedInput(_) => "malformed_input",
            BlockchainError::MiningCancelled { .. } => "mining_cancelled",
            BlockchainError::UnsatisfiableDifficulty(_) => "unsatisfiable_difficulty",
            BlockchainError::WorkerUnavailable(_) => "worker_unavailable",
            BlockchainError::Credential(_) => "credential_error",
            BlockchainError::Storage(_) => "storage_error",
        }
    }
}
