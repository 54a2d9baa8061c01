//! Fixed dashboard queries over the `floats` table.

use crate::db::store::{MeasurementStore, QueryParam, Row};
use crate::error::Result;
use std::sync::Arc;

pub const LIST_PLATFORMS_SQL: &str = "SELECT DISTINCT platform_id FROM floats ORDER BY platform_id";

pub const PLATFORM_MEASUREMENTS_SQL: &str = "SELECT measurement_date, pressure_dbar, temperature_celsius, salinity_psu, latitude, longitude \
     FROM floats WHERE platform_id = $1 ORDER BY measurement_date, pressure_dbar";

pub const LATEST_LOCATION_SQL: &str = "SELECT platform_id, latitude, longitude \
     FROM floats WHERE platform_id = $1 ORDER BY measurement_date DESC LIMIT 1";

pub const LATEST_LOCATIONS_SQL: &str = "SELECT DISTINCT ON (platform_id) platform_id, latitude, longitude, measurement_date \
     FROM floats WHERE latitude IS NOT NULL AND longitude IS NOT NULL \
     ORDER BY platform_id, measurement_date DESC";

pub const MONTHLY_AVERAGES_SQL: &str = "SELECT DATE_TRUNC('month', measurement_date) AS month, \
     AVG(salinity_psu) AS avg_salinity, AVG(pressure_dbar) AS avg_pressure \
     FROM floats WHERE platform_id = $1 GROUP BY month ORDER BY month";

pub const MONTHLY_HEATMAP_SQL: &str = "SELECT DATE_TRUNC('month', measurement_date) AS month, pressure_dbar, \
     AVG(temperature_celsius) AS avg_temperature \
     FROM floats WHERE platform_id = $1 GROUP BY month, pressure_dbar ORDER BY month, pressure_dbar";

pub const EXPORT_SQL: &str = "SELECT platform_id, measurement_date, pressure_dbar, temperature_celsius, salinity_psu, latitude, longitude \
     FROM floats ORDER BY platform_id, measurement_date, pressure_dbar";

pub const TABLE_COLUMNS_SQL: &str = "SELECT column_name, data_type, is_nullable, column_default \
     FROM information_schema.columns WHERE table_name = $1 ORDER BY ordinal_position";

pub const FLOATS_TABLE: &str = "floats";

/// Read-only access to float measurements for the dashboard endpoints.
#[derive(Clone)]
pub struct FloatRepository {
    store: Arc<dyn MeasurementStore>,
}

impl FloatRepository {
    pub fn new(store: Arc<dyn MeasurementStore>) -> Self {
        Self { store }
    }

    pub async fn list_platforms(&self) -> Result<Vec<Row>> {
        self.store.fetch(LIST_PLATFORMS_SQL, &[]).await
    }

    pub async fn measurements(&self, platform_id: &str) -> Result<Vec<Row>> {
        self.store
            .fetch(PLATFORM_MEASUREMENTS_SQL, &[QueryParam::from(platform_id)])
            .await
    }

    pub async fn latest_location(&self, platform_id: &str) -> Result<Option<Row>> {
        let rows = self
            .store
            .fetch(LATEST_LOCATION_SQL, &[QueryParam::from(platform_id)])
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Latest known position of every float, for the map overview.
    pub async fn latest_locations(&self) -> Result<Vec<Row>> {
        self.store.fetch(LATEST_LOCATIONS_SQL, &[]).await
    }

    pub async fn monthly_averages(&self, platform_id: &str) -> Result<Vec<Row>> {
        self.store
            .fetch(MONTHLY_AVERAGES_SQL, &[QueryParam::from(platform_id)])
            .await
    }

    pub async fn monthly_heatmap(&self, platform_id: &str) -> Result<Vec<Row>> {
        self.store
            .fetch(MONTHLY_HEATMAP_SQL, &[QueryParam::from(platform_id)])
            .await
    }

    pub async fn export_rows(&self) -> Result<Vec<Row>> {
        self.store.fetch(EXPORT_SQL, &[]).await
    }

    pub async fn table_columns(&self) -> Result<Vec<Row>> {
        self.store
            .fetch(TABLE_COLUMNS_SQL, &[QueryParam::from(FLOATS_TABLE)])
            .await
    }
}
