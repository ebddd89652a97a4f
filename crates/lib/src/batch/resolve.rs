//! Batch tree flattening.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, warn};

use super::{BatchError, BatchOptions};
use crate::descriptor::{BatchDescriptor, Descriptor, DescriptorError, ProjectDescriptor, load_descriptor, resolve_target};
use crate::util::path::resolve;

/// One project to build as part of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchUnit {
  /// The target as listed, resolved against its batch descriptor's directory.
  pub resolved_target: PathBuf,
  /// Active variables for this unit.
  pub options: Vec<String>,
  pub descriptor: ProjectDescriptor,
}

/// A target left out in continue-on-failure mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTarget {
  pub target: PathBuf,
  pub reason: String,
}

/// Result of flattening a batch descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResolution {
  pub units: Vec<BatchUnit>,
  pub skipped: Vec<SkippedTarget>,
}

/// Parse an `options` string: whitespace-separated tokens of at least two
/// characters starting with `-`, returned without the dash. Anything else is
/// ignored.
pub fn parse_options(options: &str) -> Vec<String> {
  options
    .split_whitespace()
    .filter(|token| token.len() >= 2 && token.starts_with('-'))
    .map(|token| token[1..].to_string())
    .collect()
}

/// Flattens a batch descriptor tree into build units.
///
/// Targets resolve against the directory of the batch descriptor listing
/// them. A target, or the descriptor file it resolves to, is visited at most
/// once, which also keeps batches that list each other from recursing
/// forever.
pub struct BatchResolver {
  options: BatchOptions,
  visited: HashSet<PathBuf>,
  resolution: BatchResolution,
}

impl BatchResolver {
  pub fn new(options: BatchOptions) -> Self {
    Self {
      options,
      visited: HashSet::new(),
      resolution: BatchResolution::default(),
    }
  }

  /// Flatten `batch`. Entries without explicit options use `variables`.
  pub fn resolve(mut self, batch: &BatchDescriptor, variables: &[String]) -> Result<BatchResolution, BatchError> {
    self.visited.insert(batch.path.clone());
    self.walk(batch, variables)?;
    debug!(
      units = self.resolution.units.len(),
      skipped = self.resolution.skipped.len(),
      "resolved batch"
    );
    Ok(self.resolution)
  }

  fn walk(&mut self, batch: &BatchDescriptor, inherited: &[String]) -> Result<(), BatchError> {
    for entry in &batch.entries {
      if entry.target.trim().is_empty() {
        continue;
      }

      let options = match &entry.options {
        Some(options) => parse_options(options),
        None => inherited.to_vec(),
      };

      let target = resolve(&batch.base_dir, &entry.target);
      if !self.visited.insert(target.clone()) {
        debug!(target = ?target, "skipping already visited target");
        continue;
      }

      let descriptor_path = match resolve_target(&target) {
        Ok(path) => path,
        Err(e @ (DescriptorError::NotFound(_) | DescriptorError::NoDescriptorInDirectory(_))) => {
          if self.options.continue_on_failure {
            warn!(target = ?target, error = %e, "skipping batch target");
            self.resolution.skipped.push(SkippedTarget {
              target,
              reason: e.to_string(),
            });
            continue;
          }
          return Err(e.into());
        }
        Err(e) => return Err(e.into()),
      };

      if descriptor_path != target && !self.visited.insert(descriptor_path.clone()) {
        debug!(descriptor = ?descriptor_path, "skipping already visited descriptor");
        continue;
      }

      match load_descriptor(&descriptor_path)? {
        Descriptor::Batch(nested) => {
          debug!(descriptor = ?nested.path, "descending into nested batch");
          self.walk(&nested, &options)?;
        }
        Descriptor::Project(descriptor) => {
          self.resolution.units.push(BatchUnit {
            resolved_target: target,
            options,
            descriptor,
          });
        }
      }
    }
    Ok(())
  }
}
