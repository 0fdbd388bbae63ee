use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::{BlockchainError, ChainStatus, IntegrityViolation};

/// Body of every rejected request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human readable reason
    pub error: String,

    /// Stable machine readable code, e.g. `insufficient_balance`
    pub code: String,
}

/// Result of an integrity check
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidationResponse {
    /// Whether every hash and link checked out
    pub valid: bool,

    /// First block that failed, if any
    pub block_index: Option<u64>,

    /// Why that block failed
    pub reason: Option<IntegrityViolation>,

    /// Summary message
    pub message: String,
}

impl From<ChainStatus> for ValidationResponse {
    fn from(status: ChainStatus) -> Self {
        match status {
            ChainStatus::Valid => ValidationResponse {
                valid: true,
                block_index: None,
                reason: None,
                message: "Blockchain is valid".to_string(),
            },
            ChainStatus::Invalid { block_index, reason } => ValidationResponse {
                valid: false,
                block_index: Some(block_index),
                reason: Some(reason),
                message: format!("Tampering detected at block {}: {}", block_index, reason),
            },
        }
    }
}

/// HTTP status for each engine error
pub fn status_for(err: &BlockchainError) -> StatusCode {
    match err {
        BlockchainError::DuplicateUser(_) => StatusCode::CONFLICT,
        BlockchainError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        BlockchainError::InsufficientBalance { .. } => StatusCode::BAD_REQUEST,
        BlockchainError::EmptyPool => StatusCode::CONFLICT,
        BlockchainError::InvalidBlockIndex { .. } => StatusCode::NOT_FOUND,
        BlockchainError::MalformedInput(_) => StatusCode::BAD_REQUEST,
        BlockchainError::MiningCancelled { .. } | BlockchainError::WorkerUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        BlockchainError::UnsatisfiableDifficulty(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BlockchainError::Credential(_) | BlockchainError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Renders an engine error as an [`ErrorResponse`]
pub fn error_response(err: &BlockchainError) -> HttpResponse {
    HttpResponse::build(status_for(err)).json(ErrorResponse {
        error: err.to_string(),
        code: err.code().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_status_message() {
        let response = ValidationResponse::from(ChainStatus::Invalid {
            block_index: 3,
            reason: IntegrityViolation::PreviousHashMismatch,
        });

        assert!(!response.valid);
        assert_eq!(response.block_index, Some(3));
        assert_eq!(
            response.message,
            "Tampering detected at block 3: previous-hash mismatch"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(status_for(&BlockchainError::EmptyPool), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&BlockchainError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&BlockchainError::InvalidBlockIndex { index: 9, len: 2 }),
            StatusCode::NOT_FOUND
        );
    }
}
