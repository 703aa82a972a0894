//! Storage root resolution for cache directories

use std::path::PathBuf;

use directories::BaseDirs;

/// Supplies the platform directory that cache instances are created under
pub trait DirectorySupplier: Send + Sync {
    /// Returns the temporary storage root, or `None` if the platform has none
    fn temporary_root(&self) -> Option<PathBuf>;
}

/// Platform cache directory (`~/.cache` on Linux), falling back to the system temp dir
///
/// The per-user cache directory is returned as the temporary root.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformDirectories;

impl DirectorySupplier for PlatformDirectories {
    fn temporary_root(&self) -> Option<PathBuf> {
        BaseDirs::new()
            .map(|dirs| dirs.cache_dir().to_path_buf())
            .or_else(|| Some(std::env::temp_dir()))
    }
}

/// A fixed root, useful for testing or when a specific location is needed
impl DirectorySupplier for PathBuf {
    fn temporary_root(&self) -> Option<PathBuf> {
        Some(self.clone())
    }
}
