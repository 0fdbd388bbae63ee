use log::{debug, error, info, warn};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::ChainConfig;

use super::account::{Credentials, Wallets};
use super::block::{Block, CancelToken};
use super::chain::{Chain, ChainStatus};
use super::clock::{Clock, SystemClock};
use super::crypto::{Argon2Hasher, CredentialHasher};
use super::difficulty::{retarget, MIN_DIFFICULTY};
use super::error::BlockchainError;
use super::pool::TransactionPool;
use super::storage::{
    encode_record, load_record, MemoryStore, Store, CHAIN_RECORD, HISTORY_RECORD,
    PENDING_RECORD, USERS_RECORD, WALLETS_RECORD,
};
use super::transaction::{Transaction, NETWORK};

/// Everything guarded by the engine's single writer lock
#[derive(Debug)]
struct LedgerState {
    chain: Chain,
    pool: TransactionPool,
    wallets: Wallets,
    credentials: Credentials,
    history: Vec<Transaction>,
    difficulty: u32,
}

/// Result of a successful [`Blockchain::mine`]
#[derive(Debug, Clone)]
pub struct MineOutcome {
    /// The newly sealed block
    pub block: Block,

    /// Difficulty after recalibration, used for the next block
    pub difficulty: u32,
}

/// The ledger engine.
///
/// Owns the chain, pool, wallets, credentials and history. Every mutation
/// runs under one lock, so an admission check and the append that follows it
/// cannot interleave with mining.
pub struct Blockchain {
    state: Mutex<LedgerState>,
    store: Arc<dyn Store>,
    hasher: Arc<dyn CredentialHasher>,
    clock: Arc<dyn Clock>,
    cancel: CancelToken,
    config: ChainConfig,
}

impl std::fmt::Debug for Blockchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blockchain")
            .field("config", &self.config)
            .finish()
    }
}

impl Blockchain {
    /// Opens the ledger stored in `store`, creating the genesis block if the
    /// store holds no chain yet
    ///
    /// # Arguments
    ///
    /// * `config` - Reward, allowance and starting difficulty
    /// * `store` - Durable record store
    /// * `hasher` - Password hashing primitive
    /// * `clock` - Source of timestamps
    pub fn open(
        config: ChainConfig,
        store: Arc<dyn Store>,
        hasher: Arc<dyn CredentialHasher>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BlockchainError> {
        let difficulty = config.initial_difficulty.max(MIN_DIFFICULTY);
        let (state, fresh) = load_state(store.as_ref(), clock.as_ref(), difficulty)?;

        let blockchain = Blockchain {
            state: Mutex::new(state),
            store,
            hasher,
            clock,
            cancel: CancelToken::new(),
            config,
        };

        if fresh {
            info!("No existing chain found in storage, created genesis block");
            let state = blockchain.lock();
            blockchain.persist(
                &state,
                &[CHAIN_RECORD, USERS_RECORD, WALLETS_RECORD, HISTORY_RECORD, PENDING_RECORD],
            )?;
        } else {
            let state = blockchain.lock();
            info!(
                "Loaded chain of {} blocks, {} users, {} pending transactions",
                state.chain.len(),
                state.credentials.len(),
                state.pool.len()
            );
        }

        Ok(blockchain)
    }

    /// Ledger backed by memory, argon2 defaults and the system clock
    pub fn in_memory(config: ChainConfig) -> Result<Self, BlockchainError> {
        Self::open(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(Argon2Hasher::new()),
            Arc::new(SystemClock),
        )
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        // Poisoned: keep serving whatever state the panicking writer left.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes the named records in one batch
    fn persist(&self, state: &LedgerState, records: &[&'static str]) -> Result<(), BlockchainError> {
        let mut batch = Vec::with_capacity(records.len());
        for &name in records {
            let entry = match name {
                CHAIN_RECORD => encode_record(name, state.chain.blocks())?,
                USERS_RECORD => encode_record(name, &state.credentials)?,
                WALLETS_RECORD => encode_record(name, &state.wallets)?,
                HISTORY_RECORD => encode_record(name, &state.history)?,
                PENDING_RECORD => encode_record(name, &state.pool)?,
                _ => continue,
            };
            batch.push(entry);
        }

        self.store.save_batch(batch).map_err(|err| {
            error!("Failed to persist {:?}: {}", records, err);
            BlockchainError::from(err)
        })
    }

    /// Registers a new user with the initial allowance
    pub fn register(&self, username: &str, password: &str) -> Result<(), BlockchainError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(BlockchainError::MalformedInput(
                "username and password are required".to_string(),
            ));
        }

        // Hash outside the lock.
        let digest = self.hasher.hash(password)?;

        let mut state = self.lock();
        if !state.credentials.insert(username, digest) {
            return Err(BlockchainError::DuplicateUser(username.to_string()));
        }
        state.wallets.open(username, self.config.initial_balance);

        info!(
            "Registered {} with {} coins",
            username, self.config.initial_balance
        );
        self.persist(&state, &[USERS_RECORD, WALLETS_RECORD])
    }

    /// Checks a username/password pair against the credential store
    pub fn authenticate(&self, username: &str, password: &str) -> bool {
        let digest = {
            let state = self.lock();
            match state.credentials.digest(username) {
                Some(digest) => digest.to_string(),
                None => return false,
            }
        };

        self.hasher.verify(password, &digest)
    }

    /// Adds a transfer to the pool.
    ///
    /// Admission looks only at the sender's confirmed balance; other pending
    /// transfers from the same sender are not subtracted.
    pub fn submit(
        &self,
        sender: &str,
        receiver: &str,
        amount: i64,
    ) -> Result<Transaction, BlockchainError> {
        if sender.trim().is_empty() || receiver.trim().is_empty() {
            return Err(BlockchainError::MalformedInput(
                "sender and receiver are required".to_string(),
            ));
        }
        if amount <= 0 {
            return Err(BlockchainError::MalformedInput(format!(
                "amount must be positive, got {}",
                amount
            )));
        }

        let mut state = self.lock();

        if sender != NETWORK {
            let available = state.wallets.balance_of(sender);
            if available < amount {
                return Err(BlockchainError::InsufficientBalance {
                    required: amount,
                    available,
                });
            }
        }

        let transaction = Transaction::new(sender, receiver, amount, self.clock.now());
        state.pool.push(transaction.clone());
        state.history.push(transaction.clone());

        debug!("Queued {} -> {} ({} coins)", sender, receiver, amount);
        self.persist(&state, &[PENDING_RECORD, HISTORY_RECORD])?;
        Ok(transaction)
    }

    /// Seals the pool plus a reward for `miner` into a new block.
    ///
    /// Runs the proof-of-work search while holding the lock, so callers on an
    /// async runtime should move this onto a blocking thread. If the search is
    /// cancelled nothing changes. A pending cancel is cleared once the search
    /// returns.
    pub fn mine(&self, miner: &str) -> Result<MineOutcome, BlockchainError> {
        if miner.trim().is_empty() {
            return Err(BlockchainError::MalformedInput("miner is required".to_string()));
        }

        let mut state = self.lock();
        if state.pool.is_empty() {
            return Err(BlockchainError::EmptyPool);
        }

        let timestamp = self.clock.now();
        let mut transactions = state.pool.snapshot();
        transactions.push(Transaction::new_reward(miner, self.config.mining_reward, timestamp));

        let difficulty = state.difficulty;
        let sealed = state
            .chain
            .append(transactions, difficulty, timestamp, &self.cancel)
            .cloned();
        // A cancel requested before this search started is consumed by it.
        self.cancel.reset();

        let block = match sealed {
            Ok(block) => block,
            Err(err) => {
                warn!("Mining aborted: {}", err);
                return Err(err);
            }
        };

        state.wallets.apply_block(&block.transactions);
        state.pool.clear();
        let next_difficulty = retarget(difficulty, state.chain.blocks());
        state.difficulty = next_difficulty;

        info!(
            "Mined block {} (nonce {}, difficulty {}), reward sent to {}, next difficulty {}",
            block.index, block.nonce, block.difficulty, miner, state.difficulty
        );
        self.persist(&state, &[CHAIN_RECORD, WALLETS_RECORD, PENDING_RECORD])?;

        Ok(MineOutcome {
            block,
            difficulty: state.difficulty,
        })
    }

    /// Stops the proof-of-work search in progress, or the next one to start
    /// if none is running. Does not wait for the lock.
    pub fn cancel_mining(&self) {
        info!("Mining cancellation requested");
        self.cancel.cancel();
    }

    /// Checks every stored hash and link
    pub fn validate(&self) -> ChainStatus {
        let status = self.lock().chain.validate();
        if let ChainStatus::Invalid { block_index, reason } = status {
            warn!("Tampering detected at block {}: {}", block_index, reason);
        }
        status
    }

    /// DEMO ONLY: rewrites a sealed block's transactions, see [`Chain::tamper_block`]
    pub fn tamper_block(
        &self,
        index: u64,
        new_transactions: Vec<Transaction>,
    ) -> Result<Block, BlockchainError> {
        let mut state = self.lock();
        let block = state.chain.tamper_block(index, new_transactions)?.clone();

        warn!("Block {} tampered with", index);
        self.persist(&state, &[CHAIN_RECORD])?;
        Ok(block)
    }

    /// DEMO ONLY: like [`Blockchain::tamper_block`] with transactions given as JSON
    pub fn tamper_block_json(&self, index: u64, payload: &str) -> Result<Block, BlockchainError> {
        let transactions: Vec<Transaction> = serde_json::from_str(payload)
            .map_err(|e| BlockchainError::MalformedInput(format!("invalid transactions JSON: {}", e)))?;
        self.tamper_block(index, transactions)
    }

    /// Case-insensitive match on sender or receiver over the full history
    pub fn search_transactions(&self, query: &str) -> Vec<Transaction> {
        let needle = query.to_lowercase();
        self.lock()
            .history
            .iter()
            .filter(|tx| tx.involves(&needle))
            .cloned()
            .collect()
    }

    /// Every submitted transaction, oldest first
    pub fn history(&self) -> Vec<Transaction> {
        self.lock().history.clone()
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.lock().pool.snapshot()
    }

    pub fn balance_of(&self, account: &str) -> i64 {
        self.lock().wallets.balance_of(account)
    }

    /// All wallet balances, ordered by account
    pub fn accounts(&self) -> Vec<(String, i64)> {
        self.lock()
            .wallets
            .iter()
            .map(|(account, balance)| (account.to_string(), balance))
            .collect()
    }

    pub fn chain(&self) -> Vec<Block> {
        self.lock().chain.blocks().to_vec()
    }

    pub fn chain_len(&self) -> usize {
        self.lock().chain.len()
    }

    /// Difficulty the next block will be sealed with
    pub fn difficulty(&self) -> u32 {
        self.lock().difficulty
    }

    /// Replaces in-memory state with what the store holds. Recovery path
    /// after a failed write.
    pub fn reload(&self) -> Result<(), BlockchainError> {
        let mut state = self.lock();
        let (loaded, fresh) = load_state(self.store.as_ref(), self.clock.as_ref(), state.difficulty)?;
        *state = loaded;

        if fresh {
            warn!("Store held no chain on reload, started a new genesis block");
            self.persist(
                &state,
                &[CHAIN_RECORD, USERS_RECORD, WALLETS_RECORD, HISTORY_RECORD, PENDING_RECORD],
            )?;
        }
        info!("Reloaded ledger state ({} blocks)", state.chain.len());
        Ok(())
    }

    /// Writes every record and flushes the store. Called on shutdown.
    pub fn flush(&self) -> Result<(), BlockchainError> {
        let state = self.lock();
        self.persist(
            &state,
            &[CHAIN_RECORD, USERS_RECORD, WALLETS_RECORD, HISTORY_RECORD, PENDING_RECORD],
        )?;
        self.store.flush()?;
        Ok(())
    }
}

/// Reads all records. The flag is `true` when no chain was stored and a
/// genesis block had to be created.
fn load_state(
    store: &dyn Store,
    clock: &dyn Clock,
    difficulty: u32,
) -> Result<(LedgerState, bool), BlockchainError> {
    let blocks: Vec<Block> = load_record(store, CHAIN_RECORD, Vec::new())?;
    let (chain, fresh) = match Chain::from_blocks(blocks) {
        Some(chain) => (chain, false),
        None => (Chain::new(clock.now()), true),
    };

    Ok((
        LedgerState {
            chain,
            pool: load_record(store, PENDING_RECORD, TransactionPool::new())?,
            wallets: load_record(store, WALLETS_RECORD, Wallets::new())?,
            credentials: load_record(store, USERS_RECORD, Credentials::new())?,
            history: load_record(store, HISTORY_RECORD, Vec::new())?,
            difficulty,
        },
        fresh,
    ))
}
