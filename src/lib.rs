//! Two-tier key-value cache library
//!
//! Exposes the cache engine, its configuration and the CLI module (for integration tests).

pub mod cache;
pub mod cli;
pub mod config;

pub use cache::{Cache, CacheError, CleanupReport, Converters, Entry};
pub use config::CacheConfig;
