//! I/O primitives for talking to the exiftool subprocess.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{BLOCK_SIZE, SENTINEL, SHUTDOWN_DIRECTIVE};
use crate::{Error, Result};

/// Reads one batch at a time from exiftool's stdout.
///
/// Output is accumulated as raw bytes, so binary tag values pass through
/// untouched. A batch ends when the accumulated buffer ends with
/// [`SENTINEL`]. A sentinel appearing in the middle of a read is treated as
/// content.
pub struct SentinelReader<R> {
    reader: R,
    block: Vec<u8>,
}

impl<R: AsyncRead + Unpin> SentinelReader<R> {
    /// Create a new reader using the default block size.
    pub fn new(reader: R) -> Self {
        Self::with_block_size(reader, BLOCK_SIZE)
    }

    /// Create a new reader that requests `block_size` bytes per read.
    pub fn with_block_size(reader: R, block_size: usize) -> Self {
        Self {
            reader,
            block: vec![0; block_size.max(1)],
        }
    }

    /// Read until the sentinel and return everything before it.
    ///
    /// Returns [`Error::StreamClosed`] if EOF arrives first.
    pub async fn read_batch(&mut self) -> Result<Vec<u8>> {
        let sentinel = SENTINEL.as_bytes();
        let mut output = Vec::with_capacity(self.block.len());

        while !output.ends_with(sentinel) {
            let n = self.reader.read(&mut self.block).await.map_err(Error::io)?;
            if n == 0 {
                tracing::debug!(
                    buffered = output.len(),
                    "exiftool stdout closed before sentinel"
                );
                return Err(Error::StreamClosed);
            }
            output.extend_from_slice(&self.block[..n]);
        }

        output.truncate(output.len() - sentinel.len());
        Ok(output)
    }

    /// Read whatever is left until EOF.
    pub async fn drain(&mut self) -> Result<Vec<u8>> {
        let mut rest = Vec::new();
        self.reader
            .read_to_end(&mut rest)
            .await
            .map_err(Error::io)?;
        Ok(rest)
    }
}

/// Writes batches and the shutdown directive to exiftool's stdin.
pub struct BatchWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> BatchWriter<W> {
    /// Create a new writer from a child process stdin.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write an encoded batch and flush it in one go.
    pub async fn write_payload(&mut self, payload: &[u8]) -> Result<()> {
        self.writer.write_all(payload).await.map_err(Error::io)?;
        self.writer.flush().await.map_err(Error::io)?;
        Ok(())
    }

    /// Ask exiftool to leave stay-open mode, then close stdin.
    pub async fn write_shutdown(&mut self) -> Result<()> {
        self.write_payload(SHUTDOWN_DIRECTIVE.as_bytes()).await?;
        self.writer.shutdown().await.map_err(Error::io)?;
        Ok(())
    }
}
