//! Manifest entry types.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Errors raised while deriving or verifying manifests.
#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("invalid mask in listing \"{listing}\": masks are only allowed as the last path segment (*, *.* or *.ext)")]
  InvalidMask { listing: String },

  #[error("{kind} listing \"{listing}\" may not contain a mask")]
  MaskNotAllowed { kind: &'static str, listing: String },

  #[error("source file {0} cannot be the same as the destination")]
  SameSourceAndDestination(PathBuf),

  #[error("could not locate path: {0}")]
  MissingMaskDirectory(PathBuf),

  #[error("could not find file: {0}")]
  MissingSource(PathBuf),

  #[error("failed to traverse directory {path}: {source}")]
  Walk {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("failed to read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// A plain file to copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileManifestEntry {
  pub source: PathBuf,
  pub destination: PathBuf,
}

impl FileManifestEntry {
  pub fn new(source: PathBuf, destination: PathBuf) -> Result<Self, ManifestError> {
    if source == destination {
      return Err(ManifestError::SameSourceAndDestination(source));
    }
    Ok(Self { source, destination })
  }
}

/// Header lines of a compiled source. Each entry owns its own copy, since
/// placeholder substitution rewrites them in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderData {
  pub lines: Option<Vec<String>>,
}

impl HeaderData {
  pub fn has_header(&self) -> bool {
    self.lines.is_some()
  }
}

/// Preprocessor variable groups of a compiled source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariablesData {
  pub groups: Option<BTreeMap<String, Vec<String>>>,
}

impl VariablesData {
  pub fn has_variables(&self) -> bool {
    self.groups.is_some()
  }
}

/// A compiled source: one file, or a bundle concatenated in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceManifestEntry {
  pub sources: Vec<PathBuf>,
  pub destination: PathBuf,
  pub header: HeaderData,
  pub variables: VariablesData,
  pub compile_options: String,
  pub force_preprocess: bool,
}

impl SourceManifestEntry {
  pub fn contains_source(&self, path: &Path) -> bool {
    self.sources.iter().any(|source| source == path)
  }
}

/// An HTML file whose script references get rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlManifestEntry {
  pub source: PathBuf,
  pub destination: PathBuf,
}

/// The three manifests of one build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifests {
  pub files: Vec<FileManifestEntry>,
  pub sources: Vec<SourceManifestEntry>,
  pub html: Vec<HtmlManifestEntry>,
}

impl Manifests {
  pub fn is_empty(&self) -> bool {
    self.files.is_empty() && self.sources.is_empty() && self.html.is_empty()
  }

  /// Check that every source referenced by any manifest exists.
  pub fn verify_sources(&self) -> Result<(), ManifestError> {
    let all = self
      .files
      .iter()
      .map(|e| e.source.as_path())
      .chain(self.sources.iter().flat_map(|e| e.sources.iter().map(PathBuf::as_path)))
      .chain(self.html.iter().map(|e| e.source.as_path()));

    for source in all {
      if !source.exists() {
        return Err(ManifestError::MissingSource(source.to_path_buf()));
      }
    }
    debug!("verified manifest sources");
    Ok(())
  }
}
