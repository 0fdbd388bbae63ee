use actix_web::web;

use super::handlers;

/// Configures the API routes
///
/// # Arguments
///
/// * `cfg` - The service configuration
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/users/register", web::post().to(handlers::register_user))
            .route("/users/login", web::post().to(handlers::login_user))
            .route("/transactions/new", web::post().to(handlers::new_transaction))
            .route("/transactions/pending", web::get().to(handlers::get_pending_transactions))
            .route("/transactions/history", web::get().to(handlers::get_transaction_history))
            .route("/transactions/search", web::get().to(handlers::search_transactions))
            .route("/mine", web::post().to(handlers::mine_block))
            .route("/mine/cancel", web::post().to(handlers::cancel_mining))
            .route("/chain", web::get().to(handlers::get_chain))
            .route("/validate", web::get().to(handlers::validate_chain))
            .route("/tamper", web::post().to(handlers::tamper_block))
            .route("/wallet/balance/{account}", web::get().to(handlers::get_wallet_balance))
            .route("/accounts", web::get().to(handlers::get_all_accounts))
            .route("/admin/reload", web::post().to(handlers::reload_state))
    );
}
