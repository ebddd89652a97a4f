//! Validated descriptor types.
//!
//! These are the in-memory form of a descriptor after loading. Named
//! `headers`/`variables` references have already been resolved into each
//! [`SourceListing`], so downstream code never looks anything up by name.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while locating, reading or validating a descriptor.
///
/// All of these are configuration errors: fatal, never retried.
#[derive(Debug, Error)]
pub enum DescriptorError {
  #[error("cannot find path or file: {0}")]
  NotFound(PathBuf),

  #[error("no build.json or build_all.json in directory: {0}")]
  NoDescriptorInDirectory(PathBuf),

  #[error("failed to read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("{path}: missing \"{field}\" entry")]
  MissingField { path: PathBuf, field: &'static str },

  #[error("{path}: source directory cannot be the same as destination directory")]
  SameSourceAndDestination { path: PathBuf },

  #[error("{path}: \"batch_build\" cannot be combined with \"{field}\"")]
  MixedBatch { path: PathBuf, field: &'static str },

  #[error("{path}: sources entry {index} is a bundle and requires an \"output_file\" entry")]
  BundleWithoutOutput { path: PathBuf, index: usize },

  #[error("{path}: sources entry {index} has neither \"file\" nor \"bundle\"")]
  EmptySourceListing { path: PathBuf, index: usize },

  #[error("{path}: sources entry {index} references unknown header \"{name}\"")]
  UnknownHeader { path: PathBuf, index: usize, name: String },

  #[error("{path}: sources entry {index} references unknown variables \"{name}\"")]
  UnknownVariables { path: PathBuf, index: usize, name: String },
}

/// A loaded descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
  /// A single project: files, sources and HTML to build.
  Project(ProjectDescriptor),
  /// A list of other targets to build in turn.
  Batch(BatchDescriptor),
}

impl Descriptor {
  /// Path of the descriptor file this was loaded from.
  pub fn path(&self) -> &Path {
    match self {
      Descriptor::Project(p) => &p.path,
      Descriptor::Batch(b) => &b.path,
    }
  }

  pub fn is_batch(&self) -> bool {
    matches!(self, Descriptor::Batch(_))
  }
}

/// A single-project descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDescriptor {
  /// The descriptor file.
  pub path: PathBuf,
  /// Directory containing the descriptor; relative paths resolve against it.
  pub base_dir: PathBuf,
  /// Source root, relative to `base_dir` unless absolute.
  pub source_dir: PathBuf,
  /// Destination root, relative to `base_dir` unless absolute.
  pub destination_dir: PathBuf,
  /// Plain files to copy. Entries may end in a mask (`*`, `*.*`, `*.ext`).
  pub files: Vec<String>,
  /// Script sources to compile.
  pub sources: Vec<SourceListing>,
  /// HTML files whose script references get rewritten.
  pub html: Vec<String>,
  /// Pre/post-build command lines.
  pub events: Events,
}

impl ProjectDescriptor {
  /// Absolute source root.
  pub fn source_root(&self) -> PathBuf {
    crate::util::path::resolve(&self.base_dir, &self.source_dir)
  }

  /// Absolute destination root.
  pub fn destination_root(&self) -> PathBuf {
    crate::util::path::resolve(&self.base_dir, &self.destination_dir)
  }
}

/// One entry of the `sources` listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceListing {
  /// The file, or the bundle members in concatenation order.
  pub files: Vec<String>,
  /// Whether this came from a `bundle` entry.
  pub is_bundle: bool,
  /// Output file name, relative to the destination root.
  pub output_file: Option<String>,
  /// Header lines to prepend to the compiled output.
  pub header: Option<Vec<String>>,
  /// Variable groups: group name -> list of `KEY=VALUE` strings.
  pub variables: Option<BTreeMap<String, Vec<String>>>,
  /// Compiler options; `None` uses the default.
  pub compile_options: Option<String>,
  /// Always run the preprocessor.
  pub preprocess: bool,
}

/// Event command lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Events {
  pub prebuild: Vec<String>,
  pub postbuild: Vec<String>,
}

impl Events {
  pub fn is_empty(&self) -> bool {
    self.prebuild.is_empty() && self.postbuild.is_empty()
  }
}

/// A batch descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchDescriptor {
  /// The descriptor file.
  pub path: PathBuf,
  /// Directory containing the descriptor; targets resolve against it.
  pub base_dir: PathBuf,
  /// Targets in listing order.
  pub entries: Vec<BatchEntry>,
}

/// One target of a batch descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
  /// A descriptor file, or a directory holding one.
  pub target: String,
  /// Whitespace-separated `-variable` options for this target.
  pub options: Option<String>,
}
