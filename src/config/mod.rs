//! Configuration module for hudsheet
//!
//! Provides types and parsing for the `hudsheet.toml` region catalog.

pub mod loader;
pub mod schema;

pub use loader::{builtin_catalog, load_catalog, ConfigError};
pub use schema::*;
