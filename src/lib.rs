pub mod accounts;
pub mod api;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod medical_records;
pub mod models;
pub mod notify;
pub mod registry;
pub mod screening;
pub mod sequence;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::ApiContext;
use crate::config::Config;
use crate::crypto::Pbkdf2Hasher;
use crate::db::Store;
use crate::error::StartupError;
use crate::notify::LogNotifier;
use crate::screening::ScreeningWorkflow;

/// `CLINIC_LOG`, then `RUST_LOG`, then the built-in default.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(config::LOG_FILTER_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Start the intake service and serve until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = Config::from_env();
    if let Some(parent) = config.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(StartupError::DataDir)?;
    }

    let store = Store::open(&config.db_path, config.store_timeout)?;

    if config.seed_questions {
        let seed_store = store.clone();
        tokio::task::spawn_blocking(move || {
            let conn = seed_store.connect(seed_store.deadline())?;
            screening::questions::seed_default_questions(&conn)
        })
        .await
        .map_err(|e| StartupError::Server(std::io::Error::other(e)))??;
    }

    let workflow = ScreeningWorkflow::new(
        store,
        Arc::new(Pbkdf2Hasher::default()),
        Arc::new(LogNotifier),
    );
    let server = api::start_api_server(ApiContext::new(workflow), config.bind_addr)
        .await
        .map_err(StartupError::Server)?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {e}");
    }
    server.stop().await;
    Ok(())
}
