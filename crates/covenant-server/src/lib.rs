//! Covenant Server
//!
//! HTTP front end for the obligation pipeline: upload a contract, extract
//! obligations, keep them in SQLite and file them as issues.
//!
//! The state is generic over the LLM backend; [`run`] picks the concrete
//! provider from configuration.

#![warn(missing_docs)]

pub mod config;
pub mod handlers;

use config::{ConfigError, ServerConfig};
use covenant_domain::traits::LlmProvider;
use covenant_extractor::Extractor;
use covenant_llm::{LlmError, MockProvider, OpenAiProvider};
use covenant_store::{SqliteStore, StoreError};
use covenant_tracker::TrackerRegistry;
use handlers::{create_router, AppState};
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Database could not be opened
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// LLM provider could not be built
    #[error("LLM provider error: {0}")]
    Llm(#[from] LlmError),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Build application state from configuration and an LLM backend
pub fn build_state<L>(config: &ServerConfig, llm: L) -> Result<AppState<L>, ServerError>
where
    L: LlmProvider + 'static,
{
    let store = SqliteStore::open(&config.database_path)?;
    let extractor = Extractor::new(llm, config.extractor.clone());
    let trackers = TrackerRegistry::new(config.tracker.clone());
    Ok(AppState::new(extractor, store, trackers))
}

/// Validate configuration, build the configured LLM backend and serve
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    config.validate()?;

    if config.llm.provider == "mock" {
        warn!("Using mock LLM provider; extractions return the configured mock response");
        let llm = MockProvider::new(config.llm.mock_response.clone());
        return start_server(config, llm).await;
    }

    let llm = OpenAiProvider::with_options(
        config.llm.api_key.clone().unwrap_or_default(),
        config.llm.model.clone(),
        config.llm.endpoint.clone(),
        Duration::from_secs(config.llm.timeout_secs),
    )?;
    start_server(config, llm).await
}

/// Start the HTTP server with an explicit LLM backend
///
/// Opens the store, registers the tracker backends and serves until Ctrl-C.
pub async fn start_server<L>(config: ServerConfig, llm: L) -> Result<(), ServerError>
where
    L: LlmProvider + 'static,
{
    info!("Starting Covenant server");
    info!(model = llm.model_name(), database = %config.database_path, "Backends");
    info!(
        batch_size = config.extractor.batch_size,
        max_tokens = config.extractor.max_tokens,
        max_attempts = config.extractor.max_attempts,
        "Extraction settings"
    );

    let state = build_state(&config, llm)?;
    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Server listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
