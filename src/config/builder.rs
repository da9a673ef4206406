//! Process configuration and builder.
//!
//! # Example
//!
//! ```ignore
//! use libexiftool::config::ExifToolConfig;
//!
//! let config = ExifToolConfig::builder()
//!     .executable("exiftool")
//!     .working_directory("/srv/photos")
//!     .block_size(16 * 1024)
//!     .build()?;
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::process::BLOCK_SIZE;
use crate::{Error, Result};

/// Executable name used when no path is configured, resolved through `PATH`.
pub const DEFAULT_EXECUTABLE: &str = "exiftool";

/// Configuration for an exiftool instance.
///
/// Use [`ExifToolConfig::builder()`] to create a new configuration.
#[derive(Debug, Clone)]
pub struct ExifToolConfig {
    pub(crate) executable: Option<PathBuf>,
    pub(crate) working_directory: Option<PathBuf>,
    pub(crate) env_vars: HashMap<String, String>,
    pub(crate) inherit_env: bool,
    pub(crate) block_size: usize,
    pub(crate) timeout: Option<Duration>,
}

impl ExifToolConfig {
    /// Create a new builder for ExifToolConfig.
    pub fn builder() -> ExifToolConfigBuilder {
        ExifToolConfigBuilder::default()
    }

    /// Get the executable that will be launched.
    ///
    /// The configured path is passed to the OS as is, so it need not be
    /// valid UTF-8.
    pub fn executable(&self) -> &Path {
        self.executable
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_EXECUTABLE))
    }

    /// Get the working directory if set.
    pub fn working_directory(&self) -> Option<&PathBuf> {
        self.working_directory.as_ref()
    }

    /// Get the read block size for the output stream.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Get the default per-batch timeout if set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl Default for ExifToolConfig {
    fn default() -> Self {
        Self {
            executable: None,
            working_directory: None,
            env_vars: HashMap::new(),
            inherit_env: true,
            block_size: BLOCK_SIZE,
            timeout: None,
        }
    }
}

/// Builder for [`ExifToolConfig`].
///
/// Validation happens in [`build()`](ExifToolConfigBuilder::build). The
/// executable itself is only looked up when the process is started.
#[derive(Debug, Clone, Default)]
pub struct ExifToolConfigBuilder {
    config: ExifToolConfig,
}

impl ExifToolConfigBuilder {
    // -------------------------------------------------------------------------
    // Process options
    // -------------------------------------------------------------------------

    /// Path to the exiftool binary (default: search PATH for "exiftool").
    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.executable = Some(path.into());
        self
    }

    /// Working directory for the exiftool process.
    ///
    /// Relative filenames in batches are resolved against it.
    pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.working_directory = Some(path.into());
        self
    }

    /// Add/override environment variable for the subprocess.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.env_vars.insert(key.into(), value.into());
        self
    }

    /// Don't inherit parent environment (default: inherit).
    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.config.inherit_env = inherit;
        self
    }

    // -------------------------------------------------------------------------
    // Protocol options
    // -------------------------------------------------------------------------

    /// Number of bytes requested per read from exiftool's stdout.
    pub fn block_size(mut self, size: usize) -> Self {
        self.config.block_size = size;
        self
    }

    /// Bound every batch by this duration (default: wait indefinitely).
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.config.timeout = Some(duration);
        self
    }

    // -------------------------------------------------------------------------
    // Build
    // -------------------------------------------------------------------------

    /// Build the configuration.
    ///
    /// This validates:
    /// - The executable path is not empty
    /// - The block size is non-zero
    /// - The working directory exists if specified
    pub fn build(self) -> Result<ExifToolConfig> {
        if let Some(ref exe) = self.config.executable {
            if exe.as_os_str().is_empty() {
                return Err(Error::InvalidConfig("executable path is empty".into()));
            }
        }

        if self.config.block_size == 0 {
            return Err(Error::InvalidConfig("block_size must be positive".into()));
        }

        if let Some(ref dir) = self.config.working_directory {
            if !dir.exists() {
                return Err(Error::InvalidConfig(format!(
                    "working directory does not exist: {}",
                    dir.display()
                )));
            }
        }

        Ok(self.config)
    }
}
