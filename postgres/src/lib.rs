//! Warehouse schema catalogue and Postgres query helpers.

pub mod schema;
pub mod warehouse;

#[cfg(feature = "test-utils")]
pub mod test_utils;
