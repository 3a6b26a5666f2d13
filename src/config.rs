//! Configuration for a synchronization run.

use std::path::PathBuf;

/// Base address of the wallpaper index.
pub const DEFAULT_BASE_URL: &str = "https://panowall.net/";

/// Number of failed downloads tolerated before a run is aborted.
pub const DEFAULT_MAX_ERRORS: usize = 3;

/// Configuration for a synchronization run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Base URL the per-setup index files live under.
    pub base_url: String,
    /// The run aborts once the error count exceeds this value.
    pub max_errors: usize,
    /// Directory whose immediate children are scanned for target folders.
    pub root_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_errors: DEFAULT_MAX_ERRORS,
            root_dir: PathBuf::from("."),
        }
    }
}

impl RunConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL of the index.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the error threshold.
    #[must_use]
    pub const fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = max_errors;
        self
    }

    /// Sets the directory to scan for target folders.
    #[must_use]
    pub fn with_root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.root_dir = root_dir.into();
        self
    }
}
