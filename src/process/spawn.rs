//! Process spawning and lifecycle management.

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::{Mutex, OnceLock, PoisonError};

use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::io::{BatchWriter, SentinelReader};
use super::{MIN_EXIFTOOL_VERSION, STAY_OPEN_ARGS};
use crate::config::ExifToolConfig;
use crate::{Error, Result};

/// Executables whose version has been checked, keyed with the working
/// directory they were launched from. Only successful checks are recorded.
static VERSION_CHECKED: OnceLock<Mutex<HashSet<VersionKey>>> = OnceLock::new();

type VersionKey = (PathBuf, Option<PathBuf>);

/// A running exiftool process in stay-open mode.
///
/// The process is spawned with `kill_on_drop`, so dropping an
/// `ExifToolProcess` without calling [`shutdown`](Self::shutdown) kills it.
pub struct ExifToolProcess {
    child: Child,
    writer: BatchWriter<ChildStdin>,
    reader: SentinelReader<ChildStdout>,
}

impl ExifToolProcess {
    /// Spawn exiftool with `-stay_open True -@ -`.
    pub async fn spawn(config: &ExifToolConfig) -> Result<Self> {
        check_version_once(config).await;

        let mut cmd = build_command(config);
        let mut child = cmd.spawn().map_err(|e| spawn_error(config, e))?;

        let stdin = child.stdin.take().ok_or_else(|| missing_pipe("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;

        Ok(Self {
            child,
            writer: BatchWriter::new(stdin),
            reader: SentinelReader::with_block_size(stdout, config.block_size()),
        })
    }

    /// Send one encoded batch and read its output up to the sentinel.
    pub async fn exchange(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        self.writer.write_payload(payload).await?;
        self.reader.read_batch().await
    }

    /// Leave stay-open mode and wait for the process to exit.
    ///
    /// Any output still buffered on stdout is drained and discarded.
    pub async fn shutdown(self) -> Result<ExitStatus> {
        let Self {
            mut child,
            mut writer,
            mut reader,
        } = self;

        // A process that already died can't take the directive; still reap it.
        if let Err(e) = writer.write_shutdown().await {
            tracing::debug!(error = %e, "failed to send stay_open shutdown");
        }
        drop(writer);

        let rest = reader.drain().await?;
        if !rest.is_empty() {
            tracing::trace!(bytes = rest.len(), "discarded trailing exiftool output");
        }

        child.wait().await.map_err(Error::io)
    }

    /// Get the process ID of the running exiftool.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Try to kill the process without waiting.
    pub fn start_kill(&mut self) -> Result<()> {
        self.child.start_kill().map_err(Error::io)
    }
}

/// Command for the configured executable with its cwd and environment.
fn base_command(config: &ExifToolConfig) -> Command {
    let mut cmd = Command::new(config.executable());

    if let Some(dir) = config.working_directory() {
        cmd.current_dir(dir);
    }

    if !config.inherit_env {
        cmd.env_clear();
    }
    cmd.envs(&config.env_vars);

    cmd
}

/// Build a tokio Command from the config.
fn build_command(config: &ExifToolConfig) -> Command {
    let mut cmd = base_command(config);

    cmd.args(STAY_OPEN_ARGS);
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::inherit());
    cmd.kill_on_drop(true);

    cmd
}

/// Build the one-shot `-ver` command.
fn version_command(config: &ExifToolConfig) -> Command {
    let mut cmd = base_command(config);
    cmd.arg("-ver");
    cmd.stdin(Stdio::null());
    cmd.kill_on_drop(true);
    cmd
}

fn spawn_error(config: &ExifToolConfig, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::ExecutableNotFound {
            searched: config.executable().display().to_string(),
        }
    } else {
        Error::ProcessSpawn(e)
    }
}

fn missing_pipe(name: &str) -> Error {
    Error::ProcessSpawn(std::io::Error::other(format!("{name} was not captured")))
}

fn version_key(config: &ExifToolConfig) -> VersionKey {
    (
        config.executable().to_path_buf(),
        config.working_directory().cloned(),
    )
}

fn checked_versions() -> &'static Mutex<HashSet<VersionKey>> {
    VERSION_CHECKED.get_or_init(Default::default)
}

fn version_checked(config: &ExifToolConfig) -> bool {
    checked_versions()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(&version_key(config))
}

/// Check the exiftool version once per executable.
///
/// A check that could not run is retried on the next start.
async fn check_version_once(config: &ExifToolConfig) {
    if version_checked(config) {
        return;
    }

    match check_exiftool_version(config).await {
        Ok(true) => {
            checked_versions()
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(version_key(config));
        }
        Ok(false) => {}
        Err(e) => tracing::debug!("exiftool version check failed: {}", e),
    }
}

/// Check the exiftool version and warn if it predates stay-open support.
///
/// Returns whether a version could be read at all.
async fn check_exiftool_version(config: &ExifToolConfig) -> Result<bool> {
    let output = version_command(config)
        .output()
        .await
        .map_err(|e| spawn_error(config, e))?;

    if !output.status.success() {
        tracing::debug!("exiftool -ver returned non-zero exit code");
        return Ok(false);
    }

    let version_str = String::from_utf8_lossy(&output.stdout);
    match parse_version(&version_str) {
        Some(version) if version_below_min(version) => {
            tracing::warn!(
                "exiftool version {} is older than {}, which introduced -stay_open. \
                 Batches will likely hang.",
                version_str.trim(),
                MIN_EXIFTOOL_VERSION
            );
        }
        Some(_) => tracing::debug!("exiftool version: {}", version_str.trim()),
        None => {
            tracing::debug!("Could not parse exiftool version from: {}", version_str.trim());
            return Ok(false);
        }
    }

    Ok(true)
}

/// Parse a version string like "12.76" into (major, minor).
fn parse_version(s: &str) -> Option<(u32, u32)> {
    let word = s.split_whitespace().next()?;
    let (major, minor) = word.split_once('.')?;
    let minor: String = minor.chars().take_while(|c| c.is_ascii_digit()).collect();
    Some((major.parse().ok()?, minor.parse().ok()?))
}

/// Check if a version is below the minimum required.
///
/// exiftool minor versions are two-digit decimals, so 8.5 does not exist
/// and "8.42" compares as (8, 42).
fn version_below_min(version: (u32, u32)) -> bool {
    let min = parse_version(MIN_EXIFTOOL_VERSION).unwrap_or((8, 42));
    version < min
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_version_formats() {
        assert_eq!(parse_version("12.76\n"), Some((12, 76)));
        assert_eq!(parse_version("8.42"), Some((8, 42)));
        assert_eq!(parse_version("13.01-beta"), Some((13, 1)));
        assert_eq!(parse_version("no version"), None);
        assert_eq!(parse_version(""), None);
        assert_eq!(parse_version("12"), None);
    }

    #[test]
    fn version_comparison() {
        // MIN_EXIFTOOL_VERSION is "8.42"
        assert!(!version_below_min((8, 42)));
        assert!(!version_below_min((8, 50)));
        assert!(!version_below_min((12, 0)));
        assert!(version_below_min((8, 41)));
        assert!(version_below_min((7, 99)));
    }

    #[test]
    fn command_uses_stay_open_args() {
        let config = ExifToolConfig::builder()
            .executable("/opt/exiftool/exiftool")
            .build()
            .unwrap();

        let cmd = build_command(&config);
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "/opt/exiftool/exiftool");
        let args: Vec<_> = std_cmd.get_args().collect();
        assert_eq!(args, STAY_OPEN_ARGS);
    }

    #[test]
    fn command_applies_env_and_cwd() {
        let dir = std::env::temp_dir();
        let config = ExifToolConfig::builder()
            .working_directory(&dir)
            .env("LC_ALL", "C")
            .build()
            .unwrap();

        let cmd = build_command(&config);
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_current_dir(), Some(dir.as_path()));
        assert!(std_cmd
            .get_envs()
            .any(|(k, v)| k == "LC_ALL" && v == Some(std::ffi::OsStr::new("C"))));
    }

    #[test]
    fn version_command_shares_cwd_and_env() {
        let dir = std::env::temp_dir();
        let config = ExifToolConfig::builder()
            .executable("/opt/exiftool/exiftool")
            .working_directory(&dir)
            .env("LC_ALL", "C")
            .inherit_env(false)
            .build()
            .unwrap();

        let cmd = version_command(&config);
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "/opt/exiftool/exiftool");
        assert_eq!(std_cmd.get_args().collect::<Vec<_>>(), ["-ver"]);
        assert_eq!(std_cmd.get_current_dir(), Some(dir.as_path()));
        assert!(std_cmd
            .get_envs()
            .any(|(k, v)| k == "LC_ALL" && v == Some(std::ffi::OsStr::new("C"))));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_executable_reaches_command() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let raw = OsStr::from_bytes(b"/opt/exif\xfftool/exiftool");
        let config = ExifToolConfig::builder().executable(raw).build().unwrap();

        assert_eq!(build_command(&config).as_std().get_program(), raw);
        assert_eq!(version_command(&config).as_std().get_program(), raw);
    }

    #[tokio::test]
    async fn failed_version_check_is_not_remembered() {
        let config = ExifToolConfig::builder()
            .executable("/nonexistent/version-check/exiftool")
            .build()
            .unwrap();

        check_version_once(&config).await;
        assert!(!version_checked(&config));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn version_check_is_per_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let mut configs = Vec::new();
        for name in ["old", "new"] {
            let path = dir.path().join(name);
            std::fs::write(&path, "#!/bin/sh\necho 12.76\n").unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            configs.push(ExifToolConfig::builder().executable(path).build().unwrap());
        }

        check_version_once(&configs[0]).await;
        assert!(version_checked(&configs[0]));
        assert!(!version_checked(&configs[1]));

        check_version_once(&configs[1]).await;
        assert!(version_checked(&configs[1]));
    }

    #[test]
    fn not_found_maps_to_executable_not_found() {
        let config = ExifToolConfig::builder().executable("nope").build().unwrap();
        let err = spawn_error(
            &config,
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(matches!(err, Error::ExecutableNotFound { searched } if searched == "nope"));

        let err = spawn_error(
            &config,
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, Error::ProcessSpawn(_)));
    }

    #[test]
    fn process_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ExifToolProcess>();
    }
}
