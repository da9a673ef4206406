//! The [`ExifTool`] handle: one long-lived exiftool process.
//!
//! # Example
//!
//! ```ignore
//! use libexiftool::{ExifTool, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let et = ExifTool::new();
//!     let records = et
//!         .scoped(|et| Box::pin(async move { et.get_metadata_batch(["a.jpg", "b.png"]).await }))
//!         .await?;
//!
//!     for record in records {
//!         println!("{:?}", record.source_file());
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::timeout as tokio_timeout;

use crate::batch::BatchRequest;
use crate::config::{ExifToolConfig, ExifToolConfigBuilder};
use crate::process::ExifToolProcess;
use crate::{Error, Result};

/// A handle to one exiftool process running in stay-open mode.
///
/// The handle starts out not running. [`start`](Self::start) spawns the
/// process, [`execute`](Self::execute) runs batches against it and
/// [`terminate`](Self::terminate) shuts it down. Both `start` and
/// `terminate` are idempotent.
///
/// # Thread Safety
///
/// `ExifTool` is `Send + Sync`. Requests and responses share one pipe with
/// no framing beyond the sentinel, so batches from concurrent callers are
/// serialized behind an internal lock and never interleave.
///
/// # Cleanup
///
/// Call [`terminate`](Self::terminate) or use [`scoped`](Self::scoped).
/// Dropping a running handle kills the process as a last resort, without
/// the orderly `-stay_open False` shutdown.
pub struct ExifTool {
    config: ExifToolConfig,
    process: Mutex<Option<ExifToolProcess>>,
    running: AtomicBool,
}

impl ExifTool {
    /// Create a handle that launches `exiftool` from `PATH`.
    pub fn new() -> Self {
        Self::with_config(ExifToolConfig::default())
    }

    /// Create a handle with the given configuration.
    pub fn with_config(config: ExifToolConfig) -> Self {
        Self {
            config,
            process: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    /// Create a builder for configuring a new handle.
    pub fn builder() -> ExifToolBuilder {
        ExifToolBuilder::new()
    }

    /// Get a reference to the handle's configuration.
    pub fn config(&self) -> &ExifToolConfig {
        &self.config
    }

    /// Whether a process is currently attached to this handle.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Process ID of the running exiftool, if any.
    pub async fn pid(&self) -> Option<u32> {
        self.process.lock().await.as_ref().and_then(ExifToolProcess::pid)
    }

    /// Start the exiftool process.
    ///
    /// Starting a handle that is already running logs a warning and does
    /// nothing.
    pub async fn start(&self) -> Result<()> {
        let mut guard = self.process.lock().await;
        if guard.is_some() {
            tracing::warn!("exiftool already running; doing nothing");
            return Ok(());
        }

        let process = ExifToolProcess::spawn(&self.config).await?;
        tracing::debug!(
            pid = ?process.pid(),
            executable = %self.config.executable().display(),
            "started exiftool"
        );
        *guard = Some(process);
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Shut the exiftool process down.
    ///
    /// Sends `-stay_open False`, waits for the process to exit and releases
    /// it. Does nothing if the handle is not running.
    pub async fn terminate(&self) -> Result<()> {
        let mut guard = self.process.lock().await;
        let Some(process) = guard.take() else {
            return Ok(());
        };
        self.running.store(false, Ordering::SeqCst);

        let pid = process.pid();
        let status = process.shutdown().await?;
        tracing::debug!(?pid, %status, "exiftool exited");
        Ok(())
    }

    /// Run a batch and return its output as text.
    ///
    /// The `-execute` directive is appended automatically. The future
    /// resolves once exiftool prints its end-of-batch sentinel, which is
    /// stripped from the result. If the config sets a timeout it applies
    /// here; otherwise this waits as long as exiftool takes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRunning`] without writing anything if the handle
    /// has not been started, and [`Error::InvalidArgument`] if an argument
    /// contains a line break.
    ///
    /// # Cancellation
    ///
    /// Dropping the future before it resolves (for example from
    /// `tokio::time::timeout` or `select!`) kills the process, since its
    /// unread output would otherwise be handed to the next batch. The handle
    /// is then not running until [`start`](Self::start) is called again.
    pub async fn execute<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let bytes = self.execute_bytes(args).await?;
        String::from_utf8(bytes).map_err(Error::InvalidUtf8)
    }

    /// Run a batch and return its raw output bytes.
    pub async fn execute_bytes<I, S>(&self, args: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.run(BatchRequest::new(args)?, self.config.timeout())
            .await
    }

    /// Run a batch, giving up after `duration`.
    ///
    /// On timeout the position in exiftool's output is unknown, so the
    /// process is killed and the handle must be started again.
    pub async fn execute_with_timeout<I, S>(&self, duration: Duration, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let bytes = self.run(BatchRequest::new(args)?, Some(duration)).await?;
        String::from_utf8(bytes).map_err(Error::InvalidUtf8)
    }

    /// Start the process, run `f`, and terminate whatever `f` returned.
    ///
    /// The process is terminated on both the success and the error path.
    /// If `f` fails, its error wins over a termination error.
    ///
    /// ```ignore
    /// let version = et
    ///     .scoped(|et| Box::pin(async move { et.execute(["-ver"]).await }))
    ///     .await?;
    /// ```
    pub async fn scoped<T, F>(&self, f: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a ExifTool) -> BoxFuture<'a, Result<T>>,
    {
        self.start().await?;
        let result = f(self).await;
        let terminated = self.terminate().await;
        let value = result?;
        terminated?;
        Ok(value)
    }

    async fn run(&self, request: BatchRequest, limit: Option<Duration>) -> Result<Vec<u8>> {
        let mut in_flight = InFlight {
            slot: self.process.lock().await,
            running: &self.running,
            settled: false,
        };
        let Some(process) = in_flight.slot.as_mut() else {
            in_flight.settled = true;
            return Err(Error::NotRunning);
        };

        let payload = request.encode();
        tracing::trace!(
            args = request.args().len(),
            bytes = payload.len(),
            "sending exiftool batch"
        );

        let result = match limit {
            Some(duration) => with_timeout(duration, process.exchange(&payload)).await,
            None => process.exchange(&payload).await,
        };

        match result {
            Ok(output) => {
                in_flight.settled = true;
                tracing::trace!(bytes = output.len(), "exiftool batch complete");
                Ok(output)
            }
            // The stream is now out of step with our requests; dropping the
            // unsettled guard kills the process.
            Err(e) if e.is_retryable() => {
                tracing::warn!(error = %e, "exiftool batch failed");
                Err(e)
            }
            Err(e) => {
                in_flight.settled = true;
                Err(e)
            }
        }
    }
}

/// The process lock held for the length of one batch.
///
/// A batch that never reached its sentinel leaves unread output in the
/// pipe. Unless the batch is marked settled, dropping this kills the process
/// and detaches it from the handle, whether the batch failed or its future
/// was cancelled.
struct InFlight<'a> {
    slot: MutexGuard<'a, Option<ExifToolProcess>>,
    running: &'a AtomicBool,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(mut process) = self.slot.take() {
            tracing::warn!(pid = ?process.pid(), "exiftool batch did not complete; killing process");
            if let Err(e) = process.start_kill() {
                tracing::debug!(error = %e, "failed to kill exiftool");
            }
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

impl fmt::Debug for ExifTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExifTool")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Default for ExifTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ExifTool {
    fn drop(&mut self) {
        if let Some(mut process) = self.process.get_mut().take() {
            tracing::debug!(pid = ?process.pid(), "exiftool dropped while running; killing it");
            let _ = process.start_kill();
        }
    }
}

/// Run a future with a timeout.
///
/// Returns an error if the future doesn't complete within the specified duration.
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio_timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(duration)),
    }
}

/// Builder for [`ExifTool`].
///
/// This wraps [`ExifToolConfigBuilder`] and builds directly into an
/// [`ExifTool`].
///
/// # Example
///
/// ```ignore
/// let et = ExifTool::builder()
///     .executable("/usr/bin/exiftool")
///     .timeout(Duration::from_secs(60))
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExifToolBuilder {
    inner: ExifToolConfigBuilder,
}

impl ExifToolBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            inner: ExifToolConfigBuilder::default(),
        }
    }

    /// Build the handle. The process is not started.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration is invalid.
    pub fn build(self) -> Result<ExifTool> {
        let config = self.inner.build()?;
        Ok(ExifTool::with_config(config))
    }

    /// Path to the exiftool binary.
    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner = self.inner.executable(path);
        self
    }

    /// Working directory for the exiftool process.
    pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner = self.inner.working_directory(path);
        self
    }

    /// Add/override environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner = self.inner.env(key, value);
        self
    }

    /// Don't inherit parent environment.
    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inner = self.inner.inherit_env(inherit);
        self
    }

    /// Bytes requested per read from stdout.
    pub fn block_size(mut self, size: usize) -> Self {
        self.inner = self.inner.block_size(size);
        self
    }

    /// Default timeout for every batch.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.inner = self.inner.timeout(duration);
        self
    }
}
