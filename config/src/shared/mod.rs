mod base;
mod batch;
mod connection;
mod incremental;
mod loader;
mod source;
mod warehouse;

pub use base::*;
pub use batch::*;
pub use connection::*;
pub use incremental::*;
pub use loader::*;
pub use source::*;
pub use warehouse::*;
