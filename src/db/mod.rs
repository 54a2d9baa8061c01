//! Database module for the PostgreSQL measurement store
//!
//! The `floats` table is read-only from this service's point of view.

pub mod connection;
pub mod floats;
pub mod store;

pub use connection::init_pool;
pub use floats::FloatRepository;
pub use store::{MeasurementStore, PgMeasurementStore, QueryParam, Row};
