use actix_web::{web, HttpResponse, Responder};
use log::error;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::{Block, Blockchain, BlockchainError, Transaction};

use super::schema::{error_response, ValidationResponse};

/// Data structure for the blockchain state
pub type BlockchainData = web::Data<Blockchain>;

/// Runs an engine call off the async workers. Anything that takes the engine
/// lock can wait out a whole proof-of-work search, so every handler goes
/// through here except `cancel_mining`.
async fn run_blocking<F, R>(f: F) -> Result<R, BlockchainError>
where
    F: FnOnce() -> Result<R, BlockchainError> + Send + 'static,
    R: Send + 'static,
{
    match web::block(f).await {
        Ok(result) => result,
        Err(err) => {
            error!("Blocking task failed: {}", err);
            Err(BlockchainError::WorkerUnavailable(err.to_string()))
        }
    }
}

/// Checks a password before acting on behalf of `username`
async fn authorize(
    blockchain: &BlockchainData,
    username: &str,
    password: &str,
) -> Result<(), BlockchainError> {
    let blockchain = blockchain.clone();
    let username = username.to_string();
    let password = password.to_string();

    run_blocking(move || {
        if blockchain.authenticate(&username, &password) {
            Ok(())
        } else {
            Err(BlockchainError::InvalidCredentials)
        }
    })
    .await
}

/// Request for the register and login endpoints
#[derive(Serialize, Deserialize, ToSchema)]
pub struct CredentialsRequest {
    /// The username, also used as the wallet account
    pub username: String,

    /// The plaintext password
    pub password: String,
}

/// Response for the register and login endpoints
#[derive(Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    /// The message
    pub message: String,

    /// The user's confirmed balance
    pub balance: i64,
}

/// Register a new user
///
/// Creates credentials and a wallet with the initial allowance
#[utoipa::path(
    post,
    path = "/api/v1/users/register",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "User registered", body = UserResponse),
        (status = 400, description = "Missing username or password", body = ErrorResponse),
        (status = 409, description = "Username already exists", body = ErrorResponse)
    )
)]
pub async fn register_user(
    blockchain: BlockchainData,
    req: web::Json<CredentialsRequest>,
) -> impl Responder {
    let req = req.into_inner();
    let engine = blockchain.clone();
    let username = req.username.clone();

    let registered = run_blocking(move || {
        engine.register(&req.username, &req.password)?;
        Ok(engine.balance_of(&req.username))
    })
    .await;

    match registered {
        Ok(balance) => HttpResponse::Created().json(UserResponse {
            message: format!("Registration successful! {} starts with {} coins.", username, balance),
            balance,
        }),
        Err(err) => error_response(&err),
    }
}

/// Log in
///
/// Checks a username and password
#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Credentials accepted", body = UserResponse),
        (status = 401, description = "Invalid username or password", body = ErrorResponse)
    )
)]
pub async fn login_user(
    blockchain: BlockchainData,
    req: web::Json<CredentialsRequest>,
) -> impl Responder {
    if let Err(err) = authorize(&blockchain, &req.username, &req.password).await {
        return error_response(&err);
    }

    let engine = blockchain.clone();
    let username = req.username.clone();
    match run_blocking(move || Ok(engine.balance_of(&username))).await {
        Ok(balance) => HttpResponse::Ok().json(UserResponse {
            message: format!("Logged in as {}", req.username),
            balance,
        }),
        Err(err) => error_response(&err),
    }
}

/// Request for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionRequest {
    /// The sender's username
    pub sender: String,

    /// The sender's password
    pub password: String,

    /// The receiver's account
    pub receiver: String,

    /// The amount to transfer
    pub amount: i64,
}

/// Response for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    /// The message
    pub message: String,

    /// The queued transaction
    pub transaction: Transaction,

    /// Number of transactions waiting to be mined
    pub pending: usize,
}

/// Create a new transaction
///
/// Adds a transfer to the pool. Balances change only once it is mined.
#[utoipa::path(
    post,
    path = "/api/v1/transactions/new",
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Transaction added to pool", body = TransactionResponse),
        (status = 400, description = "Insufficient balance or invalid input", body = ErrorResponse),
        (status = 401, description = "Invalid sender credentials", body = ErrorResponse)
    )
)]
pub async fn new_transaction(
    blockchain: BlockchainData,
    req: web::Json<TransactionRequest>,
) -> impl Responder {
    if let Err(err) = authorize(&blockchain, &req.sender, &req.password).await {
        return error_response(&err);
    }

    let engine = blockchain.clone();
    let req = req.into_inner();
    let submitted = run_blocking(move || {
        let transaction = engine.submit(&req.sender, &req.receiver, req.amount)?;
        Ok((transaction, engine.pending_transactions().len()))
    })
    .await;

    match submitted {
        Ok((transaction, pending)) => HttpResponse::Created().json(TransactionResponse {
            message: "Transaction added to pool!".to_string(),
            transaction,
            pending,
        }),
        Err(err) => error_response(&err),
    }
}

/// Get all pending transactions
///
/// Returns all transactions waiting to be included in a block
#[utoipa::path(
    get,
    path = "/api/v1/transactions/pending",
    responses(
        (status = 200, description = "Pending transactions retrieved successfully", body = Vec<Transaction>)
    )
)]
pub async fn get_pending_transactions(blockchain: BlockchainData) -> impl Responder {
    match run_blocking(move || Ok(blockchain.pending_transactions())).await {
        Ok(pending) => HttpResponse::Ok().json(pending),
        Err(err) => error_response(&err),
    }
}

/// Get the transaction history
///
/// Returns every submitted transaction, oldest first
#[utoipa::path(
    get,
    path = "/api/v1/transactions/history",
    responses(
        (status = 200, description = "History retrieved successfully", body = Vec<Transaction>)
    )
)]
pub async fn get_transaction_history(blockchain: BlockchainData) -> impl Responder {
    match run_blocking(move || Ok(blockchain.history())).await {
        Ok(history) => HttpResponse::Ok().json(history),
        Err(err) => error_response(&err),
    }
}

/// Query string for the search endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct SearchQuery {
    /// Substring of a sender or receiver, case-insensitive
    pub q: String,
}

/// Search transactions
///
/// Matches the query against sender and receiver
#[utoipa::path(
    get,
    path = "/api/v1/transactions/search",
    params(
        ("q" = String, Query, description = "Sender or receiver substring")
    ),
    responses(
        (status = 200, description = "Matching transactions", body = Vec<Transaction>)
    )
)]
pub async fn search_transactions(
    blockchain: BlockchainData,
    query: web::Query<SearchQuery>,
) -> impl Responder {
    let query = query.into_inner();
    match run_blocking(move || Ok(blockchain.search_transactions(&query.q))).await {
        Ok(matches) => HttpResponse::Ok().json(matches),
        Err(err) => error_response(&err),
    }
}

/// Request for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineRequest {
    /// The miner's username (receives the reward)
    pub miner: String,

    /// The miner's password
    pub password: String,
}

/// Response for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineResponse {
    /// The message
    pub message: String,

    /// The newly mined block
    pub block: Block,

    /// Difficulty for the next block
    pub difficulty: u32,
}

/// Mine a new block
///
/// Seals every pending transaction plus the miner's reward into a block
#[utoipa::path(
    post,
    path = "/api/v1/mine",
    request_body = MineRequest,
    responses(
        (status = 200, description = "Block mined successfully", body = MineResponse),
        (status = 401, description = "Invalid miner credentials", body = ErrorResponse),
        (status = 409, description = "No transactions to mine", body = ErrorResponse),
        (status = 503, description = "Mining was cancelled", body = ErrorResponse)
    )
)]
pub async fn mine_block(blockchain: BlockchainData, req: web::Json<MineRequest>) -> impl Responder {
    if let Err(err) = authorize(&blockchain, &req.miner, &req.password).await {
        return error_response(&err);
    }

    let engine = blockchain.clone();
    let miner = req.miner.clone();

    match run_blocking(move || engine.mine(&miner)).await {
        Ok(outcome) => HttpResponse::Ok().json(MineResponse {
            message: format!(
                "Block Mined! Reward sent to {} | New Difficulty: {}",
                req.miner, outcome.difficulty
            ),
            block: outcome.block,
            difficulty: outcome.difficulty,
        }),
        Err(err) => error_response(&err),
    }
}

/// Cancel mining
///
/// Stops a proof-of-work search in progress
#[utoipa::path(
    post,
    path = "/api/v1/mine/cancel",
    responses(
        (status = 202, description = "Cancellation requested")
    )
)]
pub async fn cancel_mining(blockchain: BlockchainData) -> impl Responder {
    blockchain.cancel_mining();
    HttpResponse::Accepted().json(serde_json::json!({
        "message": "Mining cancellation requested"
    }))
}

/// Response for the chain endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ChainResponse {
    /// The length of the chain
    pub length: usize,

    /// The blocks in the chain
    pub chain: Vec<Block>,

    /// Difficulty for the next block
    pub difficulty: u32,

    /// Integrity check of the chain
    pub validation: ValidationResponse,
}

/// Get the full blockchain
///
/// Returns the entire blockchain and its validity status
#[utoipa::path(
    get,
    path = "/api/v1/chain",
    responses(
        (status = 200, description = "Blockchain retrieved successfully", body = ChainResponse)
    )
)]
pub async fn get_chain(blockchain: BlockchainData) -> impl Responder {
    let snapshot = run_blocking(move || {
        let chain = blockchain.chain();
        Ok(ChainResponse {
            length: chain.len(),
            chain,
            difficulty: blockchain.difficulty(),
            validation: blockchain.validate().into(),
        })
    })
    .await;

    match snapshot {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(err) => error_response(&err),
    }
}

/// Check if the blockchain is valid
///
/// Recomputes every block hash and checks every link
#[utoipa::path(
    get,
    path = "/api/v1/validate",
    responses(
        (status = 200, description = "Blockchain validation status", body = ValidationResponse)
    )
)]
pub async fn validate_chain(blockchain: BlockchainData) -> impl Responder {
    match run_blocking(move || Ok(blockchain.validate())).await {
        Ok(status) => HttpResponse::Ok().json(ValidationResponse::from(status)),
        Err(err) => error_response(&err),
    }
}

/// Request for the tamper endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TamperRequest {
    /// Index of the block to overwrite
    pub block_index: u64,

    /// Replacement transactions as a JSON array
    pub transactions: String,
}

/// Response for the tamper endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TamperResponse {
    /// The message
    pub message: String,

    /// The block as it is now stored
    pub block: Block,
}

/// Tamper with a block (demo only)
///
/// Overwrites a block's transactions without re-mining it, so the integrity
/// check has something to find
#[utoipa::path(
    post,
    path = "/api/v1/tamper",
    request_body = TamperRequest,
    responses(
        (status = 200, description = "Block tampered with", body = TamperResponse),
        (status = 400, description = "Invalid transactions JSON", body = ErrorResponse),
        (status = 404, description = "Invalid block index", body = ErrorResponse)
    )
)]
pub async fn tamper_block(
    blockchain: BlockchainData,
    req: web::Json<TamperRequest>,
) -> impl Responder {
    let req = req.into_inner();
    let index = req.block_index;
    let tampered =
        run_blocking(move || blockchain.tamper_block_json(req.block_index, &req.transactions)).await;

    match tampered {
        Ok(block) => HttpResponse::Ok().json(TamperResponse {
            message: format!("Block {} tampered with!", index),
            block,
        }),
        Err(err) => error_response(&err),
    }
}

/// Response for the balance endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    /// The account identifier
    pub account: String,

    /// The confirmed balance
    pub balance: i64,
}

/// Get wallet balance
///
/// Returns the confirmed balance of an account, 0 if unknown
#[utoipa::path(
    get,
    path = "/api/v1/wallet/balance/{account}",
    params(
        ("account" = String, Path, description = "Account identifier")
    ),
    responses(
        (status = 200, description = "Wallet balance retrieved successfully", body = AccountResponse)
    )
)]
pub async fn get_wallet_balance(
    blockchain: BlockchainData,
    account: web::Path<String>,
) -> impl Responder {
    let account = account.into_inner();
    let lookup = run_blocking(move || {
        let balance = blockchain.balance_of(&account);
        Ok(AccountResponse { account, balance })
    })
    .await;

    match lookup {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(err) => error_response(&err),
    }
}

/// Get all accounts
///
/// Returns every wallet and its confirmed balance
#[utoipa::path(
    get,
    path = "/api/v1/accounts",
    responses(
        (status = 200, description = "Accounts retrieved successfully", body = Vec<AccountResponse>)
    )
)]
pub async fn get_all_accounts(blockchain: BlockchainData) -> impl Responder {
    match run_blocking(move || Ok(blockchain.accounts())).await {
        Ok(accounts) => {
            let accounts: Vec<AccountResponse> = accounts
                .into_iter()
                .map(|(account, balance)| AccountResponse { account, balance })
                .collect();
            HttpResponse::Ok().json(accounts)
        }
        Err(err) => error_response(&err),
    }
}

/// Reload state from storage
///
/// Discards in-memory state and reads every record back from the store
#[utoipa::path(
    post,
    path = "/api/v1/admin/reload",
    responses(
        (status = 200, description = "State reloaded"),
        (status = 500, description = "Storage unavailable", body = ErrorResponse)
    )
)]
pub async fn reload_state(blockchain: BlockchainData) -> impl Responder {
    let reloaded = run_blocking(move || {
        blockchain.reload()?;
        Ok(blockchain.chain_len())
    })
    .await;

    match reloaded {
        Ok(length) => HttpResponse::Ok().json(serde_json::json!({
            "message": "State reloaded from storage",
            "length": length
        })),
        Err(err) => error_response(&err),
    }
}
