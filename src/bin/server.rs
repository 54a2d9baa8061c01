//! HTTP API server for the ARGO float dashboard.

use anyhow::{Context, Result};
use argo_insight::config::AppConfig;
use argo_insight::db::{init_pool, MeasurementStore, PgMeasurementStore};
use argo_insight::llm::{GeminiClient, TextGenerator};
use argo_insight::observability::init_tracing;
use argo_insight::server::{serve, AppState};
use argo_insight::ChatService;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env().context("Invalid configuration")?;
    info!(mode = ?config.chat.mode, model = %config.gemini.model, "Starting ARGO API server");

    let pool = init_pool(&config.database)
        .await
        .context("Failed to create database pool")?;
    let store: Arc<dyn MeasurementStore> =
        Arc::new(PgMeasurementStore::new(pool, config.database.query_timeout));

    let generator: Option<Arc<dyn TextGenerator>> = if config.gemini.is_configured() {
        Some(Arc::new(GeminiClient::new(&config.gemini)?))
    } else {
        warn!("GEMINI_API_KEY not set, model features disabled");
        None
    };

    let model = generator
        .as_ref()
        .map(|g| g.model_id().to_string())
        .unwrap_or_else(|| config.gemini.model.clone());

    let chat = ChatService::from_config(&config.chat, store.clone(), generator)?;
    let state = Arc::new(AppState::new(chat, store, config.gemini.is_configured(), model));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    serve(state, &addr).await?;
    Ok(())
}
