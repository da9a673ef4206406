//! Batch requests sent to a stay-open exiftool process.
//!
//! A batch is an ordered list of opaque arguments, one per line, followed by
//! the `-execute` directive. exiftool runs the accumulated arguments when it
//! reads that line and answers with one sentinel-terminated response.
//!
//! ```text
//! -G
//! -j
//! a.jpg
//! -execute
//! ```

mod args;

pub use args::ArgList;

use crate::{Error, Result};

/// Directive that makes exiftool run the arguments read so far.
pub const EXECUTE: &str = "-execute";

/// Prefix every tag with its group name (`group:tag`).
pub const GROUP_NAMES: &str = "-G";

/// Emit JSON.
pub const JSON: &str = "-j";

/// Print numeric values instead of converted display strings.
pub const NUMERIC: &str = "-n";

/// An ordered sequence of arguments to run as one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchRequest {
    args: Vec<String>,
}

impl BatchRequest {
    /// Create a batch from arguments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if any argument contains a line
    /// break. exiftool reads one argument per line, so such an argument
    /// would split into several and could smuggle in an extra `-execute`.
    pub fn new<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args = args
            .into_iter()
            .map(|a| check_arg(a.as_ref()).map(|()| a.as_ref().to_string()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { args })
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Result<Self> {
        let arg = arg.into();
        check_arg(&arg)?;
        self.args.push(arg);
        Ok(self)
    }

    /// The arguments, without the trailing `-execute`.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Encode the batch as it is written to stdin.
    pub fn encode(&self) -> Vec<u8> {
        let len = self.args.iter().map(|a| a.len() + 1).sum::<usize>() + EXECUTE.len() + 1;
        let mut payload = Vec::with_capacity(len);
        for arg in self.args.iter().map(String::as_str).chain([EXECUTE]) {
            payload.extend_from_slice(arg.as_bytes());
            payload.push(b'\n');
        }
        payload
    }
}

fn check_arg(arg: &str) -> Result<()> {
    if arg.contains(['\n', '\r']) {
        return Err(Error::InvalidArgument {
            arg: arg.to_string(),
        });
    }
    Ok(())
}
