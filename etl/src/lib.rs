//! Incremental loader of a hiring-process dimensional warehouse.
//!
//! Raw operational tables are read from a [`source::RawTableProvider`], reshaped into conformed
//! dimensions and facts by [`transform`], and appended to a [`destination::Warehouse`] by the
//! [`pipeline::Pipeline`], which only loads what changed since the previous run's watermark.

pub mod conversions;
pub mod destination;
pub mod error;
pub mod failpoints;
pub mod load;
pub mod macros;
pub mod pipeline;
pub mod source;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod transform;
pub mod types;
