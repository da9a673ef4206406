//! Configuration for the exiftool process.
//!
//! [`ExifToolConfig`] describes how the stay-open process is launched and how
//! batches are read back. Build one with [`ExifToolConfig::builder()`].
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use libexiftool::config::ExifToolConfig;
//!
//! let config = ExifToolConfig::builder()
//!     .executable("/opt/exiftool/exiftool")
//!     .timeout(Duration::from_secs(30))
//!     .build()?;
//! ```

pub mod builder;

pub use builder::{ExifToolConfig, ExifToolConfigBuilder, DEFAULT_EXECUTABLE};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accessible() {
        let _ = ExifToolConfig::builder();
        assert_eq!(DEFAULT_EXECUTABLE, "exiftool");
    }
}
