//! Cache instance configuration
//!
//! A `CacheConfig` is fixed once handed to a `Cache`; build it with the
//! `with_*` setters.

use chrono::Duration;

/// Default top-level directory housing every cache instance
pub const DEFAULT_ROOT_NAME: &str = "file_cache";

/// Default time-to-live for entries stored without an explicit TTL
pub const DEFAULT_TTL_MINUTES: i64 = 30;

/// Configuration for a single cache instance
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Name of the cache instance, used as its subdirectory
    pub name: String,
    /// TTL applied when `set` is called without an override
    pub default_ttl: Duration,
    /// Whether the in-memory tier is populated and consulted
    pub use_memory_cache: bool,
    /// Top-level directory shared by all cache instances
    pub root_name: String,
    /// Whether cache activity and swallowed failures are reported through `tracing`
    pub logging_enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            default_ttl: Duration::minutes(DEFAULT_TTL_MINUTES),
            use_memory_cache: true,
            root_name: DEFAULT_ROOT_NAME.to_string(),
            logging_enabled: false,
        }
    }
}

impl CacheConfig {
    /// Creates a configuration with default settings for the named cache
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_memory_cache(mut self, enabled: bool) -> Self {
        self.use_memory_cache = enabled;
        self
    }

    pub fn with_root_name(mut self, root_name: impl Into<String>) -> Self {
        self.root_name = root_name.into();
        self
    }

    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.logging_enabled = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::new("weather");

        assert_eq!(config.name, "weather");
        assert_eq!(config.default_ttl, Duration::minutes(30));
        assert!(config.use_memory_cache);
        assert_eq!(config.root_name, "file_cache");
        assert!(!config.logging_enabled);
    }

    #[test]
    fn test_builder_overrides() {
        let config = CacheConfig::new("tides")
            .with_default_ttl(Duration::hours(24))
            .with_memory_cache(false)
            .with_root_name("apps")
            .with_logging(true);

        assert_eq!(config.default_ttl, Duration::hours(24));
        assert!(!config.use_memory_cache);
        assert_eq!(config.root_name, "apps");
        assert!(config.logging_enabled);
    }
}
