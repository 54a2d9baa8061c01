//! Runs candidate SQL against the measurement store once the guard accepts it.

use crate::db::{MeasurementStore, QueryParam, Row};
use crate::error::{ArgoError, Result};
use crate::security::QueryGuard;
use std::sync::Arc;
use tracing::info;

pub struct QueryExecutor {
    store: Arc<dyn MeasurementStore>,
    guard: QueryGuard,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn MeasurementStore>) -> Self {
        Self::with_guard(store, QueryGuard::default())
    }

    pub fn with_guard(store: Arc<dyn MeasurementStore>, guard: QueryGuard) -> Self {
        Self { store, guard }
    }

    /// Execute a candidate query. Rejected statements never reach the store;
    /// accepted ones are sent in their re-rendered form.
    pub async fn execute(&self, sql: &str, params: &[QueryParam]) -> Result<Vec<Row>> {
        let statement = self.guard.validate(sql)?;

        let rows = self.store.fetch(&statement, params).await.map_err(|e| match e {
            ArgoError::Execution(_) => e,
            other => ArgoError::Execution(other.to_string()),
        })?;

        info!(rows = rows.len(), "Query executed");
        Ok(rows)
    }
}
