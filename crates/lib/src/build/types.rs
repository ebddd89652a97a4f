//! Build context, report and error types.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Datelike;
use thiserror::Error;

use crate::descriptor::DescriptorError;
use crate::events::{EventError, EventOutcome};
use crate::header::HeaderError;
use crate::html::HtmlError;
use crate::manifest::ManifestError;
use crate::pipeline::PipelineError;

/// Errors that abort a single project build.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error(transparent)]
  Descriptor(#[from] DescriptorError),

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Header(#[from] HeaderError),

  #[error(transparent)]
  Pipeline(#[from] PipelineError),

  #[error(transparent)]
  Html(#[from] HtmlError),

  #[error(transparent)]
  Event(#[from] EventError),

  #[error("failed to copy {source_path} to {destination}: {source}")]
  Copy {
    source_path: PathBuf,
    destination: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("{0} is a batch descriptor, not a project")]
  NotAProject(PathBuf),
}

/// Per-invocation inputs of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
  /// Active variables (`-name` on the command line, without the dash).
  pub variables: Vec<String>,
  /// Line separator used for headers and rewritten HTML.
  pub newline: String,
  /// Value substituted for `$YEAR$` in headers.
  pub year: i32,
}

impl BuildContext {
  pub fn new(variables: Vec<String>, year: i32) -> Self {
    Self {
      variables,
      newline: "\n".to_string(),
      year,
    }
  }

  /// Context for the current local year.
  pub fn current(variables: Vec<String>) -> Self {
    Self::new(variables, chrono::Local::now().year())
  }

  /// Same settings, different active variables.
  pub fn with_variables(&self, variables: Vec<String>) -> Self {
    Self {
      variables,
      ..self.clone()
    }
  }
}

impl Default for BuildContext {
  fn default() -> Self {
    Self::current(Vec::new())
  }
}

/// What a finished build did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
  pub descriptor: PathBuf,
  pub files_copied: usize,
  pub sources_compiled: usize,
  pub html_written: usize,
  pub events: Vec<EventOutcome>,
  pub duration: Duration,
}

impl BuildReport {
  pub fn files_updated(&self) -> usize {
    self.files_copied + self.sources_compiled + self.html_written
  }
}
