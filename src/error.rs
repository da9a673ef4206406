use std::time::Duration;

/// Errors that can occur when using libexiftool.
///
/// Errors are organized by category:
/// - Configuration errors: detected at `build()` time
/// - State and usage errors: the instance or the arguments were wrong
/// - Spawn errors: failed to start the exiftool process
/// - IO errors: communication failures with the subprocess
/// - Protocol errors: unexpected or malformed exiftool output
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    // -------------------------------------------------------------------------
    // Configuration errors (detected at build() time)
    // -------------------------------------------------------------------------
    /// Invalid configuration provided to builder.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -------------------------------------------------------------------------
    // State and usage errors
    // -------------------------------------------------------------------------
    /// An operation that needs a running exiftool process was called
    /// before `start()` or after `terminate()`.
    #[error("exiftool instance not running")]
    NotRunning,

    /// A single string was passed where a list of strings was expected.
    ///
    /// Splitting it into characters would silently produce a garbage batch,
    /// so this is rejected up front.
    #[error("the argument '{param}' must be a list of strings, not a single string")]
    SingleStringArgument { param: &'static str },

    /// An argument contains a line break.
    ///
    /// Arguments are sent one per line, so the batch is refused before
    /// anything reaches exiftool.
    #[error("argument contains a line break: {arg:?}")]
    InvalidArgument { arg: String },

    // -------------------------------------------------------------------------
    // Spawn errors
    // -------------------------------------------------------------------------
    /// exiftool binary not found.
    #[error("exiftool not found (searched: {searched})")]
    ExecutableNotFound { searched: String },

    /// Failed to spawn the exiftool subprocess.
    #[error("failed to spawn exiftool process: {0}")]
    ProcessSpawn(#[source] std::io::Error),

    // -------------------------------------------------------------------------
    // IO errors
    // -------------------------------------------------------------------------
    /// IO error communicating with the exiftool subprocess.
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),

    /// stdout reached EOF before the end-of-batch sentinel was seen.
    #[error("stream closed before end-of-batch sentinel")]
    StreamClosed,

    /// A bounded execute did not see the sentinel in time.
    #[error("batch timed out after {0:?}")]
    Timeout(Duration),

    // -------------------------------------------------------------------------
    // Protocol errors
    // -------------------------------------------------------------------------
    /// Batch output was not valid UTF-8.
    #[error("batch output is not valid UTF-8")]
    InvalidUtf8(#[source] std::string::FromUtf8Error),

    /// Failed to parse JSON from exiftool output.
    #[error("failed to parse JSON: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// A single-file query got no record back.
    #[error("exiftool returned no records")]
    EmptyResponse,
}

/// A specialized Result type for libexiftool operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a JSON parse error with context.
    pub fn json_parse(source: serde_json::Error, raw: &str) -> Self {
        Self::JsonParse {
            message: format!(
                "at line {} column {}: {}",
                source.line(),
                source.column(),
                raw.chars().take(100).collect::<String>()
            ),
            source,
        }
    }

    /// Create an IO error.
    pub fn io(source: std::io::Error) -> Self {
        Self::Io(source)
    }

    /// Check if restarting the instance may clear this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::Io(_) | Error::StreamClosed)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonParse {
            message: err.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }

    #[test]
    fn is_retryable_detection() {
        assert!(Error::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(Error::StreamClosed.is_retryable());
        assert!(!Error::NotRunning.is_retryable());
        assert!(!Error::SingleStringArgument { param: "tags" }.is_retryable());
        assert!(!Error::EmptyResponse.is_retryable());
    }

    #[test]
    fn single_string_message_names_param() {
        let err = Error::SingleStringArgument { param: "filenames" };
        assert!(err.to_string().contains("'filenames'"));
    }

    #[test]
    fn invalid_argument_shows_line_break() {
        let err = Error::InvalidArgument {
            arg: "a\n-execute".into(),
        };
        assert!(err.to_string().contains(r"a\n-execute"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::JsonParse { .. }));
    }

    #[test]
    fn json_parse_truncates_raw_input() {
        let raw = "x".repeat(500);
        let json_err = serde_json::from_str::<serde_json::Value>(&raw).unwrap_err();
        let err = Error::json_parse(json_err, &raw);
        match err {
            Error::JsonParse { message, .. } => assert!(message.len() < 200),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn question_mark_operator_io() {
        fn fallible_io() -> Result<()> {
            let _file = std::fs::File::open("/nonexistent/path/that/does/not/exist")?;
            Ok(())
        }
        assert!(matches!(fallible_io(), Err(Error::Io(_))));
    }
}
