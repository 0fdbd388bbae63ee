use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use log::{error, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use std::sync::Arc;

use pow_ledger::api::{configure_routes, ApiDoc};
use pow_ledger::blockchain::{Argon2Hasher, Blockchain, SledStore, SystemClock};
use pow_ledger::config::Config;

// Open the ledger on disk, or fall back to a volatile one
fn initialize_blockchain(config: &Config) -> anyhow::Result<Blockchain> {
    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        warn!("Failed to create data directory {}: {}", config.data_dir, e);
    }

    match SledStore::open(&config.data_dir) {
        Ok(store) => {
            info!("Opened ledger storage at {}", config.data_dir);
            Blockchain::open(
                config.chain.clone(),
                Arc::new(store),
                Arc::new(Argon2Hasher::new()),
                Arc::new(SystemClock),
            )
            .context("failed to load ledger from storage")
        }
        Err(err) => {
            warn!("Failed to open storage: {}", err);
            warn!("Creating in-memory ledger instead");
            Blockchain::in_memory(config.chain.clone()).context("failed to create in-memory ledger")
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().context("invalid configuration")?;
    let blockchain = web::Data::new(initialize_blockchain(&config)?);

    info!(
        "Starting HTTP server at http://{}:{} (difficulty {})",
        config.host,
        config.port,
        blockchain.difficulty()
    );

    let app_data = blockchain.clone();
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(app_data.clone())
            .configure(configure_routes)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    info!("Server stopped, flushing ledger");
    if let Err(err) = blockchain.flush() {
        error!("Failed to flush ledger on shutdown: {}", err);
    }

    Ok(())
}
