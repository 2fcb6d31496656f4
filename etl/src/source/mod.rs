mod base;
pub mod json;
pub mod memory;

pub use base::RawTableProvider;
