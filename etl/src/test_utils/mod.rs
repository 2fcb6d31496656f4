//! Utilities shared by unit and integration tests.
//!
//! - [`fixtures`] builds raw tables describing a small hiring process.
//! - [`test_warehouse_wrapper`] wraps a warehouse to record appends and inject failures.
//! - [`failpoints`] configures failpoints for the duration of a test (feature `failpoints`).

#[cfg(feature = "failpoints")]
pub mod failpoints;
pub mod fixtures;
pub mod test_warehouse_wrapper;
