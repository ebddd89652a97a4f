//! Descriptor location, parsing and validation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use super::types::*;
use crate::consts::{DEFAULT_BATCH_FILE, DEFAULT_BUILD_FILE};
use crate::util::path::normalize;

/// A JSON value that may be given either as a single string or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
  One(String),
  Many(Vec<String>),
}

impl OneOrMany {
  fn into_vec(self) -> Vec<String> {
    match self {
      OneOrMany::One(s) => vec![s],
      OneOrMany::Many(v) => v,
    }
  }
}

fn list(value: Option<OneOrMany>) -> Vec<String> {
  value.map(OneOrMany::into_vec).unwrap_or_default()
}

type VariableGroups = BTreeMap<String, Vec<String>>;

#[derive(Debug, Deserialize)]
struct RawDescriptor {
  source_dir: Option<String>,
  destination_dir: Option<String>,
  html: Option<OneOrMany>,
  sources: Option<Vec<RawSource>>,
  files: Option<OneOrMany>,
  #[serde(default)]
  headers: BTreeMap<String, OneOrMany>,
  #[serde(default)]
  variables: BTreeMap<String, VariableGroups>,
  #[serde(default)]
  events: RawEvents,
  batch_build: Option<Vec<RawBatchEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSource {
  File(String),
  Detailed(Box<RawSourceEntry>),
}

#[derive(Debug, Default, Deserialize)]
struct RawSourceEntry {
  file: Option<String>,
  bundle: Option<Vec<String>>,
  output_file: Option<String>,
  header: Option<OneOrMany>,
  use_header: Option<String>,
  variables: Option<VariableGroups>,
  use_variables: Option<String>,
  compile_options: Option<String>,
  #[serde(default)]
  preprocess: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RawEvents {
  prebuild: Option<OneOrMany>,
  postbuild: Option<OneOrMany>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBatchEntry {
  Target(String),
  Detailed { target: String, options: Option<String> },
}

/// Read and validate the descriptor at `path`.
///
/// `path` should be absolute; the descriptor's `base_dir` is its parent.
pub fn load_descriptor(path: &Path) -> Result<Descriptor, DescriptorError> {
  let text = std::fs::read_to_string(path).map_err(|source| DescriptorError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  parse_descriptor(path, &text)
}

/// Parse and validate descriptor JSON that was read from `path`.
pub fn parse_descriptor(path: &Path, text: &str) -> Result<Descriptor, DescriptorError> {
  let raw: RawDescriptor = serde_json::from_str(text).map_err(|source| DescriptorError::Parse {
    path: path.to_path_buf(),
    source,
  })?;

  let path = normalize(path);
  let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

  if let Some(batch) = raw.batch_build {
    if let Some(field) = project_field_present(&raw.source_dir, &raw.destination_dir, &raw.sources, &raw.files, &raw.html) {
      return Err(DescriptorError::MixedBatch { path, field });
    }
    let entries = batch
      .into_iter()
      .map(|entry| match entry {
        RawBatchEntry::Target(target) => BatchEntry { target, options: None },
        RawBatchEntry::Detailed { target, options } => BatchEntry { target, options },
      })
      .collect::<Vec<_>>();
    debug!(path = ?path, entries = entries.len(), "loaded batch descriptor");
    return Ok(Descriptor::Batch(BatchDescriptor { path, base_dir, entries }));
  }

  let source_dir = raw.source_dir.ok_or_else(|| DescriptorError::MissingField {
    path: path.clone(),
    field: "source_dir",
  })?;
  let destination_dir = raw.destination_dir.ok_or_else(|| DescriptorError::MissingField {
    path: path.clone(),
    field: "destination_dir",
  })?;

  if normalize(&base_dir.join(&source_dir)) == normalize(&base_dir.join(&destination_dir)) {
    return Err(DescriptorError::SameSourceAndDestination { path });
  }

  let mut sources = Vec::new();
  for (index, raw_source) in raw.sources.unwrap_or_default().into_iter().enumerate() {
    sources.push(source_listing(&path, index, raw_source, &raw.headers, &raw.variables)?);
  }

  let descriptor = ProjectDescriptor {
    base_dir,
    source_dir: PathBuf::from(source_dir),
    destination_dir: PathBuf::from(destination_dir),
    files: list(raw.files),
    sources,
    html: list(raw.html),
    events: Events {
      prebuild: list(raw.events.prebuild),
      postbuild: list(raw.events.postbuild),
    },
    path,
  };
  debug!(
    path = ?descriptor.path,
    files = descriptor.files.len(),
    sources = descriptor.sources.len(),
    html = descriptor.html.len(),
    "loaded project descriptor"
  );
  Ok(Descriptor::Project(descriptor))
}

fn project_field_present(
  source_dir: &Option<String>,
  destination_dir: &Option<String>,
  sources: &Option<Vec<RawSource>>,
  files: &Option<OneOrMany>,
  html: &Option<OneOrMany>,
) -> Option<&'static str> {
  if source_dir.is_some() {
    Some("source_dir")
  } else if destination_dir.is_some() {
    Some("destination_dir")
  } else if sources.is_some() {
    Some("sources")
  } else if files.is_some() {
    Some("files")
  } else if html.is_some() {
    Some("html")
  } else {
    None
  }
}

fn source_listing(
  path: &Path,
  index: usize,
  raw: RawSource,
  headers: &BTreeMap<String, OneOrMany>,
  variables: &BTreeMap<String, VariableGroups>,
) -> Result<SourceListing, DescriptorError> {
  let detail = match raw {
    RawSource::File(file) => {
      return Ok(SourceListing {
        files: vec![file],
        ..Default::default()
      });
    }
    RawSource::Detailed(detail) => *detail,
  };

  // `bundle` takes precedence over `file` when both are given.
  let (files, is_bundle) = match (detail.bundle, detail.file) {
    (Some(bundle), _) if !bundle.is_empty() => (bundle, true),
    (None, Some(file)) => (vec![file], false),
    _ => {
      return Err(DescriptorError::EmptySourceListing {
        path: path.to_path_buf(),
        index,
      });
    }
  };

  if is_bundle && detail.output_file.is_none() {
    return Err(DescriptorError::BundleWithoutOutput {
      path: path.to_path_buf(),
      index,
    });
  }

  // Inline `header`/`variables` win over the named references.
  let header = match (detail.header, detail.use_header) {
    (Some(header), _) => Some(header.into_vec()),
    (None, Some(name)) => match headers.get(&name) {
      Some(found) => Some(found.clone().into_vec()),
      None => {
        return Err(DescriptorError::UnknownHeader {
          path: path.to_path_buf(),
          index,
          name,
        });
      }
    },
    (None, None) => None,
  };

  let variables = match (detail.variables, detail.use_variables) {
    (Some(groups), _) => Some(groups),
    (None, Some(name)) => match variables.get(&name) {
      Some(found) => Some(found.clone()),
      None => {
        return Err(DescriptorError::UnknownVariables {
          path: path.to_path_buf(),
          index,
          name,
        });
      }
    },
    (None, None) => None,
  };

  Ok(SourceListing {
    files,
    is_bundle,
    output_file: detail.output_file,
    header,
    variables,
    compile_options: detail.compile_options,
    preprocess: detail.preprocess,
  })
}

/// Return the first of `candidates` that exists as a file inside `dir`.
pub fn find_descriptor_in(dir: &Path, candidates: &[&str]) -> Option<PathBuf> {
  candidates.iter().map(|name| dir.join(name)).find(|path| path.is_file())
}

/// Resolve an explicit target to a descriptor file.
///
/// A file target is used as is. A directory target uses `build.json`,
/// falling back to `build_all.json`.
pub fn resolve_target(target: &Path) -> Result<PathBuf, DescriptorError> {
  if target.is_dir() {
    find_descriptor_in(target, &[DEFAULT_BUILD_FILE, DEFAULT_BATCH_FILE])
      .ok_or_else(|| DescriptorError::NoDescriptorInDirectory(target.to_path_buf()))
  } else if target.is_file() {
    Ok(target.to_path_buf())
  } else {
    Err(DescriptorError::NotFound(target.to_path_buf()))
  }
}

/// Find the descriptor to use when no target was given.
///
/// A batch descriptor in `dir` takes priority over a project descriptor.
pub fn resolve_default(dir: &Path) -> Result<PathBuf, DescriptorError> {
  find_descriptor_in(dir, &[DEFAULT_BATCH_FILE, DEFAULT_BUILD_FILE])
    .ok_or_else(|| DescriptorError::NoDescriptorInDirectory(dir.to_path_buf()))
}
