//! Timestamp-based staleness checks.

use std::path::Path;
use std::time::{Duration, SystemTime};

/// Decides whether a source has to be (re)produced at a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
  /// How much newer than the destination a source must be to count as newer.
  pub slack: Duration,
}

impl Default for StalenessPolicy {
  fn default() -> Self {
    Self {
      slack: Duration::from_millis(1000),
    }
  }
}

impl StalenessPolicy {
  pub fn new(slack: Duration) -> Self {
    Self { slack }
  }

  /// True if `destination` is missing, or `source` was modified at least
  /// `slack` after it.
  pub fn is_source_newer(&self, source: &Path, destination: &Path) -> std::io::Result<bool> {
    let destination_mtime = match std::fs::metadata(destination) {
      Ok(metadata) => metadata.modified()?,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
      Err(e) => return Err(e),
    };
    let source_mtime = std::fs::metadata(source)?.modified()?;
    Ok(self.is_newer(source_mtime, destination_mtime))
  }

  fn is_newer(&self, source: SystemTime, destination: SystemTime) -> bool {
    match source.duration_since(destination) {
      Ok(delta) => delta >= self.slack,
      // Source is older than the destination.
      Err(_) => self.slack.is_zero(),
    }
  }
}
