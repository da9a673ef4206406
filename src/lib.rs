//! # libexiftool
//!
//! Async Rust wrapper that keeps one `exiftool` process running in
//! stay-open mode and talks to it over its stdin and stdout.
//!
//! This library provides:
//! - A process handle with idempotent start and terminate
//! - Batch execution framed by exiftool's `{ready}` sentinel
//! - Typed metadata records parsed from exiftool's JSON output
//! - Scoped cleanup so the process never outlives its use
//!
//! ## Quick Start
//!
//! ```ignore
//! use libexiftool::{ExifTool, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let et = ExifTool::new();
//!     et.start().await?;
//!     let records = et.get_metadata_batch(["a.jpg", "b.png"]).await?;
//!     for record in &records {
//!         println!("{:?} {:?}", record.source_file(), record.get("EXIF:DateTimeOriginal"));
//!     }
//!     et.terminate().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Raw Batches
//!
//! ```ignore
//! let output = et.execute(["-ver"]).await?;
//! println!("exiftool {}", output.trim());
//! ```
//!
//! ## Configuration
//!
//! ```ignore
//! use std::time::Duration;
//! use libexiftool::ExifTool;
//!
//! let et = ExifTool::builder()
//!     .executable("/opt/exiftool/exiftool")
//!     .timeout(Duration::from_secs(60))
//!     .build()?;
//! ```

pub mod batch;
pub mod config;
mod error;
pub mod metadata;
pub mod process;
mod tool;

pub use error::{Error, Result};

// Re-export the main handle types at crate root
pub use tool::{with_timeout, ExifTool, ExifToolBuilder};

// Re-export commonly used types at crate root
pub use batch::{ArgList, BatchRequest};
pub use config::{ExifToolConfig, ExifToolConfigBuilder};
pub use metadata::{Metadata, SOURCE_FILE};
