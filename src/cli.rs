//! Command-line interface for inspecting and managing caches
//!
//! Argument parsing uses clap. Each subcommand maps onto one `Cache` operation over
//! JSON values, so any cache directory written with serde-backed converters can be
//! read and maintained from the shell.

use std::path::PathBuf;

use chrono::Duration;
use clap::{Parser, Subcommand};
use serde_json::Value;
use thiserror::Error;

use crate::cache::{Cache, CleanupReport, Converters, PlatformDirectories};
use crate::config::{CacheConfig, DEFAULT_ROOT_NAME};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// The value passed to `set` is not valid JSON
    #[error("Invalid value '{value}': {reason}")]
    InvalidValue { value: String, reason: String },

    /// The cache name is empty or would escape the root directory
    #[error("Invalid cache name: '{0}'. Names must be non-empty and contain no path separators")]
    InvalidName(String),

    /// The TTL is too large to represent
    #[error("Invalid TTL: {0} seconds is out of range")]
    InvalidTtl(u64),
}

/// Inspect and manage two-tier (memory + JSON file) caches
#[derive(Parser, Debug)]
#[command(name = "file_cache")]
#[command(about = "Inspect and manage two-tier (memory + JSON file) caches")]
#[command(version)]
pub struct Cli {
    /// Storage root to use instead of the platform cache directory
    #[arg(long, global = true, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Top-level directory housing all cache instances
    #[arg(long, global = true, default_value = DEFAULT_ROOT_NAME)]
    pub root: String,

    /// Name of the cache instance
    #[arg(long, global = true, default_value = "default")]
    pub name: String,

    /// TTL in seconds for stored entries (defaults to 30 minutes)
    #[arg(long, global = true, value_name = "SECS")]
    pub ttl: Option<u64>,

    /// Skip the in-memory tier
    #[arg(long, global = true)]
    pub no_memory: bool,

    /// Log cache activity to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Cache operations available from the command line
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the cached JSON value for a key
    Get { key: String },
    /// Store a JSON value under a key
    Set { key: String, value: String },
    /// Report whether a key holds a live value
    Has { key: String },
    /// Delete a key from the cache
    Remove { key: String },
    /// Delete every entry of the cache
    Clear,
    /// Delete expired and corrupt entries
    Cleanup,
}

/// Result of running a command, for the binary to print
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A cached value was found
    Value(Value),
    /// No live value exists for the key
    Miss(String),
    /// Answer to `has`
    Present(bool),
    /// Sweep counts from `cleanup`
    Cleaned(CleanupReport),
    /// The command completed with nothing to report
    Done,
}

/// Parses a `set` value argument as JSON
///
/// # Returns
/// * `Ok(Value)` if the string is valid JSON
/// * `Err(CliError::InvalidValue)` otherwise
pub fn parse_value_arg(s: &str) -> Result<Value, CliError> {
    serde_json::from_str(s).map_err(|e| CliError::InvalidValue {
        value: s.to_string(),
        reason: e.to_string(),
    })
}

impl CacheConfig {
    /// Builds a cache configuration from parsed CLI arguments
    ///
    /// # Returns
    /// * `Err(CliError::InvalidName)` if the cache or root name is empty, `.`/`..`,
    ///   or contains a path separator
    /// * `Err(CliError::InvalidTtl)` if `--ttl` does not fit a `Duration`
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        validate_name(&cli.name)?;
        validate_name(&cli.root)?;

        let mut config = CacheConfig::new(cli.name.clone())
            .with_root_name(cli.root.clone())
            .with_memory_cache(!cli.no_memory)
            .with_logging(cli.verbose);

        if let Some(secs) = cli.ttl {
            config = config.with_default_ttl(parse_ttl_secs(secs)?);
        }

        Ok(config)
    }
}

/// Converts a `--ttl` argument in seconds into a `Duration`
pub fn parse_ttl_secs(secs: u64) -> Result<Duration, CliError> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or(CliError::InvalidTtl(secs))
}

fn validate_name(name: &str) -> Result<(), CliError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(|c: char| c == '/' || c == '\\');

    if invalid {
        Err(CliError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}

/// Runs the parsed command against the configured cache
pub async fn execute(cli: &Cli) -> Result<Outcome, CliError> {
    let config = CacheConfig::from_cli(cli)?;
    let converters = Converters::<Value>::serde();
    let mut cache = match &cli.dir {
        Some(dir) => Cache::with_supplier(config, converters, dir.clone()),
        None => Cache::with_supplier(config, converters, PlatformDirectories),
    };

    let outcome = match &cli.command {
        Command::Get { key } => match cache.get(key).await {
            Some(value) => Outcome::Value(value),
            None => Outcome::Miss(key.clone()),
        },
        Command::Set { key, value } => {
            let value = parse_value_arg(value)?;
            cache.set(key, value).await;
            Outcome::Done
        }
        Command::Has { key } => Outcome::Present(cache.has(key).await),
        Command::Remove { key } => {
            cache.remove(key).await;
            Outcome::Done
        }
        Command::Clear => {
            cache.clear().await;
            Outcome::Done
        }
        Command::Cleanup => Outcome::Cleaned(cache.cleanup().await),
    };

    Ok(outcome)
}
