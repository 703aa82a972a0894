//! Two-tier key-value cache with TTL expiration
//!
//! Entries live in an in-process map and as one JSON file per key under the platform's
//! temporary storage directory. Expiry is checked lazily on every read; expired files
//! are only swept when `Cache::cleanup` is called. I/O failures never reach callers,
//! who see either a value or a miss.

mod converter;
mod dirs;
mod entry;
mod error;
mod manager;

pub use converter::Converters;
pub use dirs::{DirectorySupplier, PlatformDirectories};
pub use entry::Entry;
pub use error::{BoxError, CacheError};
pub use manager::{file_name_for_key, Cache, CleanupReport};
