//! Process management for the exiftool subprocess.
//!
//! A single exiftool process is started in stay-open mode and kept alive
//! across many batches. Arguments arrive on stdin one per line; exiftool
//! runs them when it sees `-execute` and then prints a sentinel line.
//!
//! # Architecture
//!
//! ```text
//! libexiftool                           exiftool -stay_open True -@ -
//! ┌──────────────┐                     ┌─────────────┐
//! │ BatchWriter  │──stdin (args)──────▶│             │
//! │ SentinelReader│◀─stdout (output)───│             │
//! │              │   stderr inherited  │             │
//! └──────────────┘                     └─────────────┘
//! ```
//!
//! # Output Protocol
//!
//! stdout is an unframed byte stream. The only boundary marker is
//! [`SENTINEL`], written after each executed batch. The reader accumulates
//! bytes until the buffer ends with it.

mod io;
mod spawn;

pub use io::{BatchWriter, SentinelReader};
pub use spawn::ExifToolProcess;

/// Marker exiftool prints after the output of every executed batch.
pub const SENTINEL: &str = "{ready}\n";

/// Default number of bytes requested per read from stdout.
pub const BLOCK_SIZE: usize = 4096;

/// Arguments that put exiftool into persistent command-reading mode.
pub const STAY_OPEN_ARGS: [&str; 4] = ["-stay_open", "True", "-@", "-"];

/// Directive that ends a stay-open session.
pub const SHUTDOWN_DIRECTIVE: &str = "-stay_open\nFalse\n";

/// Oldest exiftool release that understands `-stay_open`.
pub const MIN_EXIFTOOL_VERSION: &str = "8.42";
