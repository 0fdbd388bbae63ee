// API module
//
// This module contains the REST API in front of the ledger engine

pub mod handlers;
pub mod routes;
pub mod schema;

use utoipa::OpenApi;

use crate::blockchain;

// Re-export main components for easier access
pub use routes::configure_routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register_user,
        handlers::login_user,
        handlers::new_transaction,
        handlers::get_pending_transactions,
        handlers::get_transaction_history,
        handlers::search_transactions,
        handlers::mine_block,
        handlers::cancel_mining,
        handlers::get_chain,
        handlers::validate_chain,
        handlers::tamper_block,
        handlers::get_wallet_balance,
        handlers::get_all_accounts,
        handlers::reload_state
    ),
    components(
        schemas(
            blockchain::Block,
            blockchain::Transaction,
            blockchain::IntegrityViolation,
            schema::ErrorResponse,
            schema::ValidationResponse,
            handlers::CredentialsRequest,
            handlers::UserResponse,
            handlers::TransactionRequest,
            handlers::TransactionResponse,
            handlers::SearchQuery,
            handlers::MineRequest,
            handlers::MineResponse,
            handlers::ChainResponse,
            handlers::TamperRequest,
            handlers::TamperResponse,
            handlers::AccountResponse
        )
    ),
    tags(
        (name = "ledger", description = "Proof-of-work ledger API endpoints")
    ),
    info(
        title = "Ledger API",
        version = "1.0.0",
        description = "A single-node proof-of-work ledger",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
