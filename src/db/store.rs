//! Measurement store abstraction
//!
//! Rows come back as JSON objects built by PostgreSQL itself
//! (`row_to_json`), so arbitrary SELECT shapes (aggregates, date_trunc,
//! numeric) decode without per-column type mapping.

use crate::error::{ArgoError, Result};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{debug, error};

/// One result row: column name to JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Positional parameter bound to `$n`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryParam {
    Text(String),
    Integer(i64),
}

impl From<&str> for QueryParam {
    fn from(value: &str) -> Self {
        QueryParam::Text(value.to_string())
    }
}

impl From<i64> for QueryParam {
    fn from(value: i64) -> Self {
        QueryParam::Integer(value)
    }
}

#[async_trait]
pub trait MeasurementStore: Send + Sync {
    /// Run a single SELECT with positional parameters.
    async fn fetch(&self, sql: &str, params: &[QueryParam]) -> Result<Vec<Row>>;

    /// Cheap liveness check.
    async fn ping(&self) -> Result<()>;
}

pub struct PgMeasurementStore {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgMeasurementStore {
    pub fn new(pool: PgPool, query_timeout: Duration) -> Self {
        Self { pool, query_timeout }
    }
}

/// Wrap a SELECT so each row is returned as a JSON document. The inner
/// statement sits on its own lines so a trailing `--` comment cannot swallow
/// the closing parenthesis.
pub(crate) fn wrap_as_json_rows(sql: &str) -> String {
    let inner = sql.trim().trim_end_matches(';').trim_end();
    format!("SELECT row_to_json(q)::text FROM (\n{}\n) AS q", inner)
}

#[async_trait]
impl MeasurementStore for PgMeasurementStore {
    async fn fetch(&self, sql: &str, params: &[QueryParam]) -> Result<Vec<Row>> {
        let wrapped = wrap_as_json_rows(sql);
        debug!(sql = %sql, params = params.len(), "Executing query");

        let mut query = sqlx::query_scalar::<_, String>(&wrapped);
        for param in params {
            query = match param {
                QueryParam::Text(value) => query.bind(value.clone()),
                QueryParam::Integer(value) => query.bind(*value),
            };
        }

        let raw = tokio::time::timeout(self.query_timeout, query.fetch_all(&self.pool))
            .await
            .map_err(|_| {
                ArgoError::Execution(format!(
                    "Query timed out after {}s",
                    self.query_timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                error!(error = %e, "Error executing query");
                ArgoError::Execution(e.to_string())
            })?;

        raw.iter()
            .map(|doc| serde_json::from_str::<Row>(doc).map_err(ArgoError::from))
            .collect()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
