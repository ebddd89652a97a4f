//! Batch builds.
//!
//! A batch descriptor lists other targets: project descriptors, nested batch
//! descriptors, or directories holding either. [`BatchResolver`] flattens the
//! tree into an ordered list of [`BatchUnit`]s; [`BatchOrchestrator`] builds
//! them one after another.

mod execute;
mod resolve;

use std::path::PathBuf;

use thiserror::Error;

pub use execute::{BatchFailure, BatchOrchestrator, BatchReport};
pub use resolve::{BatchResolution, BatchResolver, BatchUnit, SkippedTarget, parse_options};

use crate::build::BuildError;
use crate::descriptor::DescriptorError;

/// Batch behavior switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
  /// Report failing or missing targets and keep going (`--nofail`).
  pub continue_on_failure: bool,
}

#[derive(Debug, Error)]
pub enum BatchError {
  #[error(transparent)]
  Descriptor(#[from] DescriptorError),

  #[error("batch target {target} failed: {source}")]
  Build {
    target: PathBuf,
    #[source]
    source: Box<BuildError>,
  },
}
