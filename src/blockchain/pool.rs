use serde::{Deserialize, Serialize};

use super::transaction::Transaction;

/// Transactions submitted but not yet included in a mined block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPool {
    pending: Vec<Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a transaction behind everything already pending
    pub fn push(&mut self, transaction: Transaction) {
        self.pending.push(transaction);
    }

    /// Copies the pending transactions in submission order
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.pending.clone()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_pool_keeps_submission_order() {
        let mut pool = TransactionPool::new();
        pool.push(Transaction::new("a", "b", 1, Utc::now()));
        pool.push(Transaction::new("c", "d", 2, Utc::now()));

        let snapshot = pool.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].sender, "a");
        assert_eq!(snapshot[1].sender, "c");
    }

    #[test]
    fn test_clear_empties_pool() {
        let mut pool = TransactionPool::new();
        pool.push(Transaction::new("a", "b", 1, Utc::now()));
        assert!(!pool.is_empty());

        pool.clear();
        assert!(pool.is_empty());
        assert_eq!(pool.len(), 0);
    }
}
