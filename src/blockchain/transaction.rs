use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Reserved sender for genesis and mining-reward credits. Never debited.
pub const NETWORK: &str = "Network";

/// Receiver of the zero-amount genesis transaction
pub const GENESIS_RECEIVER: &str = "Genesis";

/// Represents a transfer of coins between two accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Sender's account identifier, or `"Network"`
    pub sender: String,

    /// Receiver's account identifier
    pub receiver: String,

    /// Amount being transferred
    pub amount: i64,

    /// Timestamp when the transaction was created
    #[schema(value_type = String, example = "2023-01-01T12:00:00Z")]
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Creates a new transaction stamped with `timestamp`
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: i64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Transaction {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            timestamp,
        }
    }

    /// Creates a mining reward paid by the network
    pub fn new_reward(miner: impl Into<String>, amount: i64, timestamp: DateTime<Utc>) -> Self {
        Transaction::new(NETWORK, miner, amount, timestamp)
    }

    /// The zero-amount allowance recorded in the genesis block
    pub fn genesis(timestamp: DateTime<Utc>) -> Self {
        Transaction::new(NETWORK, GENESIS_RECEIVER, 0, timestamp)
    }

    /// Checks if this transaction is issued by the network
    pub fn is_network(&self) -> bool {
        self.sender == NETWORK
    }

    /// Case-insensitive substring match against sender or receiver.
    /// `needle` must already be lowercase.
    pub fn involves(&self, needle: &str) -> bool {
        self.sender.to_lowercase().contains(needle) || self.receiver.to_lowercase().contains(needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_is_network() {
        let reward = Transaction::new_reward("alice", 10, Utc::now());

        assert!(reward.is_network());
        assert_eq!(reward.receiver, "alice");
        assert_eq!(reward.amount, 10);
    }

    #[test]
    fn test_involves_is_case_insensitive() {
        let tx = Transaction::new("Alice", "BOB", 5, Utc::now());

        assert!(tx.involves("ali"));
        assert!(tx.involves("bob"));
        assert!(!tx.involves("carol"));
    }

    #[test]
    fn test_json_without_timestamp() {
        let tx: Transaction =
            serde_json::from_str(r#"{"sender":"Mallory","receiver":"Eve","amount":1000}"#).unwrap();

        assert_eq!(tx.sender, "Mallory");
        assert_eq!(tx.amount, 1000);
    }
}
