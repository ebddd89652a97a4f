//! Lexical path helpers.
//!
//! Manifest paths are compared for equality (source vs. destination, HTML
//! `src` lookups), so every path entering a manifest goes through
//! [`normalize`] first. None of these helpers touch the filesystem.

use std::path::{Component, Path, PathBuf};

/// Normalize a path by resolving `.` and `..` components lexically.
///
/// Leading `..` components of a relative path are kept, since there is
/// nothing to pop them against.
pub fn normalize(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        let can_pop = matches!(
          normalized.components().next_back(),
          Some(Component::Normal(_))
        );
        if can_pop {
          normalized.pop();
        } else if !normalized.has_root() {
          normalized.push("..");
        }
      }
      other => normalized.push(other),
    }
  }
  normalized
}

/// Resolve `path` against `base`.
///
/// Absolute paths are returned unchanged (normalized); relative paths are
/// joined onto `base`.
pub fn resolve(base: &Path, path: impl AsRef<Path>) -> PathBuf {
  let path = path.as_ref();
  if path.is_absolute() {
    normalize(path)
  } else {
    normalize(&base.join(path))
  }
}

/// Append a suffix to the full path, e.g. `app.min.js` + `.cmp` -> `app.min.js.cmp`.
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
  let mut raw = path.as_os_str().to_os_string();
  raw.push(suffix);
  PathBuf::from(raw)
}

/// Render a path with forward slashes, as used in HTML attributes.
pub fn to_url_path(path: &Path) -> String {
  path.to_string_lossy().replace('\\', "/")
}
