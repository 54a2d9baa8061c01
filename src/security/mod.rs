pub mod query_guard;

pub use query_guard::*;
