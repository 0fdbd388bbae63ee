use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

use super::transaction::{Transaction, NETWORK};

/// Confirmed balances keyed by account identifier.
///
/// Only mined transactions move these numbers; pending transfers do not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallets {
    balances: BTreeMap<String, i64>,
}

impl Wallets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `account`, 0 if it has never been seen
    pub fn balance_of(&self, account: &str) -> i64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Sets the balance of `account` outright
    pub fn open(&mut self, account: &str, balance: i64) {
        self.balances.insert(account.to_string(), balance);
    }

    /// Debits the sender (unless it is the network) and credits the receiver.
    ///
    /// No overdraft check happens here: admission already looked at the
    /// confirmed balance.
    pub fn apply_transfer(&mut self, sender: &str, receiver: &str, amount: i64) {
        if sender != NETWORK {
            let balance = self.balances.entry(sender.to_string()).or_insert(0);
            *balance = balance.saturating_sub(amount);
        }

        let balance = self.balances.entry(receiver.to_string()).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Applies every transaction of a confirmed block, in order
    pub fn apply_block(&mut self, transactions: &[Transaction]) {
        for tx in transactions {
            self.apply_transfer(&tx.sender, &tx.receiver, tx.amount);
        }
    }

    /// All balances, ordered by account identifier
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.balances.iter().map(|(account, balance)| (account.as_str(), *balance))
    }
}

/// Password digests keyed by username
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    users: BTreeMap<String, String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    /// Stores `digest` for a new user. Returns `false` if the user exists.
    pub fn insert(&mut self, username: &str, digest: String) -> bool {
        if self.contains(username) {
            return false;
        }
        self.users.insert(username.to_string(), digest);
        true
    }

    pub fn digest(&self, username: &str) -> Option<&str> {
        self.users.get(username).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_unknown_account_has_zero_balance() {
        let wallets = Wallets::new();
        assert_eq!(wallets.balance_of("nobody"), 0);
    }

    #[test]
    fn test_apply_transfer() {
        let mut wallets = Wallets::new();
        wallets.open("alice", 100);

        wallets.apply_transfer("alice", "bob", 30);

        assert_eq!(wallets.balance_of("alice"), 70);
        assert_eq!(wallets.balance_of("bob"), 30);
    }

    #[test]
    fn test_network_is_never_debited() {
        let mut wallets = Wallets::new();

        wallets.apply_transfer(NETWORK, "miner", 10);

        assert_eq!(wallets.balance_of(NETWORK), 0);
        assert_eq!(wallets.balance_of("miner"), 10);
        assert!(wallets.iter().all(|(account, _)| account != NETWORK));
    }

    #[test]
    fn test_apply_block_can_overdraw() {
        let mut wallets = Wallets::new();
        wallets.open("alice", 50);
        let now = Utc::now();

        wallets.apply_block(&[
            Transaction::new("alice", "bob", 40, now),
            Transaction::new("alice", "bob", 40, now),
        ]);

        assert_eq!(wallets.balance_of("alice"), -30);
        assert_eq!(wallets.balance_of("bob"), 80);
    }

    #[test]
    fn test_credentials_reject_duplicates() {
        let mut credentials = Credentials::new();

        assert!(credentials.insert("alice", "digest-1".to_string()));
        assert!(!credentials.insert("alice", "digest-2".to_string()));
        assert_eq!(credentials.digest("alice"), Some("digest-1"));
        assert_eq!(credentials.len(), 1);
    }
}
