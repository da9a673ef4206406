//! Test utilities for libexiftool integration tests.
//!
//! [`FakeExifTool`] writes a small shell script that speaks exiftool's
//! stay-open protocol. It records every stdin line and every spawn, and
//! answers `-G -j -n` queries with canned JSON:
//!
//! - no tags requested: `SourceFile`, `File:FileName` and `EXIF:Make`
//! - tags requested: only `File:FileName` / `EXIF:Make` when asked for
//! - `-ver` prints a version, `-crash` exits mid-batch, `-hang` stalls
//! - `-slow` answers, but only after a second

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use libexiftool::ExifTool;
use tempfile::TempDir;

const SCRIPT: &str = r#"#!/bin/sh
if [ "$1" = "-ver" ]; then
  echo "12.76"
  exit 0
fi
if [ "$1 $2 $3 $4" != "-stay_open True -@ -" ]; then
  echo "unexpected startup arguments: $*" >&2
  exit 2
fi
echo $$ >> "__DIR__/spawns.log"

files=""
tags=""
ver=""
stay=""

emit() {
  if [ -n "$ver" ]; then
    echo "12.76"
    return
  fi
  [ -z "$files" ] && return
  printf '%s\n' "$files" | {
    first=1
    printf '['
    while IFS= read -r f; do
      [ -z "$f" ] && continue
      [ -z "$first" ] && printf ',\n'
      first=""
      name=$(basename "$f")
      printf '{\n  "SourceFile": "%s"' "$f"
      if [ -z "$tags" ]; then
        printf ',\n  "File:FileName": "%s",\n  "EXIF:Make": "FakeCam"' "$name"
      else
        for t in $tags; do
          case "$t" in
            File:FileName|FileName) printf ',\n  "File:FileName": "%s"' "$name" ;;
            EXIF:Make|Make) printf ',\n  "EXIF:Make": "FakeCam"' ;;
          esac
        done
      fi
      printf '\n}'
    done
    printf ']\n'
  }
}

while IFS= read -r line; do
  printf '%s\n' "$line" >> "__DIR__/stdin.log"
  if [ -n "$stay" ]; then
    [ "$line" = "False" ] && exit 0
    stay=""
    continue
  fi
  case "$line" in
    -stay_open) stay=1 ;;
    -execute)
      emit
      printf '{ready}\n'
      files=""
      tags=""
      ver=""
      ;;
    -ver) ver=1 ;;
    -crash) exit 3 ;;
    -hang) sleep 30 ;;
    -slow) sleep 1; echo "slow" ;;
    -G|-j|-n) ;;
    -*) tags="$tags ${line#-}" ;;
    *)
      files="$files
$line"
      ;;
  esac
done
exit 0
"#;

/// A fake exiftool executable living in a temporary directory.
pub struct FakeExifTool {
    dir: TempDir,
    path: PathBuf,
}

impl FakeExifTool {
    /// Write the script and make it executable.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("exiftool");
        let script = SCRIPT.replace("__DIR__", &dir.path().display().to_string());

        fs::write(&path, script).expect("write fake exiftool");
        let mut perms = fs::metadata(&path).expect("stat fake exiftool").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod fake exiftool");

        Self { dir, path }
    }

    /// Path to the script.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A handle configured to launch this script.
    pub fn handle(&self) -> ExifTool {
        ExifTool::builder()
            .executable(&self.path)
            .build()
            .expect("valid config")
    }

    /// How many stay-open processes the script has seen start.
    pub fn spawn_count(&self) -> usize {
        read_lines(&self.dir.path().join("spawns.log")).len()
    }

    /// Every line any instance of the script read from stdin.
    pub fn stdin_lines(&self) -> Vec<String> {
        read_lines(&self.dir.path().join("stdin.log"))
    }
}

impl Default for FakeExifTool {
    fn default() -> Self {
        Self::new()
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Whether `pid` has exited, counting an unreaped zombie as exited.
pub fn process_exited(pid: u32) -> bool {
    match fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(')')
            .is_some_and(|(_, rest)| rest.trim_start().starts_with(['Z', 'X'])),
        Err(_) => true,
    }
}

/// Poll until `pid` has exited or five seconds pass.
pub async fn wait_for_exit(pid: u32) -> bool {
    for _ in 0..250 {
        if process_exited(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
