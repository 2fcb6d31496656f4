//! Configuration loading and shared configuration types for the hiring warehouse loader.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{Config, LoadConfigError, load_config, load_config_from_directory};
