//! Test utilities for yabs-lib.
//!
//! Helpers for laying out project trees in temporary directories and for
//! pinning file timestamps so staleness checks are deterministic.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use filetime::{FileTime, set_file_mtime};

/// Write `content` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
  let path = root.join(relative);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(&path, content).unwrap();
  path
}

/// Write an executable `#!/bin/sh` script to `root/relative`.
#[cfg(unix)]
pub fn write_script(root: &Path, relative: &str, body: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  let path = write_file(root, relative, &format!("#!/bin/sh\n{body}"));
  std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
  path
}

/// Set a file's modification time to `now - age`.
pub fn set_age(path: &Path, age: Duration) {
  let mtime = SystemTime::now() - age;
  set_file_mtime(path, FileTime::from_system_time(mtime)).unwrap();
}

/// Canonical form of a temp directory, so lexical comparisons line up on
/// platforms where the temp dir sits behind a symlink.
pub fn canonical_root(path: &Path) -> PathBuf {
  dunce::canonicalize(path).unwrap()
}
