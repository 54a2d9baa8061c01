//! Database connection management using sqlx

use crate::config::DatabaseConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, warn};

/// Initialize the database connection pool.
///
/// Connections are opened lazily so the service can start (and report
/// itself unhealthy) while the database is unreachable.
pub async fn init_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_lazy(&config.connection_url())?;

    // Test the connection
    match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => info!(host = %config.host, database = %config.name, "Connected to PostgreSQL"),
        Err(e) => warn!(error = %e, "PostgreSQL is not reachable yet"),
    }

    Ok(pool)
}
