//! Source compilation pipeline.
//!
//! Each compiled-source entry goes through up to four steps:
//!
//! ```text
//! {js} \     glue      preprocess    compile     finalize
//! [js]  >--> {.glw} --> {.pre} -----> [.cmp] ----> [dest]
//! {js} /   (bundles)   (optional)
//! ```
//!
//! Intermediate artifacts sit next to the destination with the suffix
//! appended and are removed when the entry finishes, whether it succeeded
//! or not. The destination itself is written only by the finalize step.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::{COMPILE_FILE_EXTENSION, GLUE_FILE_EXTENSION, PREPROCESS_FILE_EXTENSION};
use crate::manifest::SourceManifestEntry;
use crate::toolchain::{Compiler, Preprocessor, ToolError};
use crate::util::path::with_suffix;

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("failed to build {destination}: {source}")]
  Tool {
    destination: PathBuf,
    #[source]
    source: ToolError,
  },

  #[error("failed to access {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PipelineError + '_ {
  move |source| PipelineError::Io {
    path: path.to_path_buf(),
    source,
  }
}

/// Whether `entry` has to go through the preprocessor given the active
/// variables: always when forced, otherwise when an active variable names
/// one of its variable groups.
pub fn should_preprocess(entry: &SourceManifestEntry, variables: &[String]) -> bool {
  if entry.force_preprocess {
    return true;
  }
  match &entry.variables.groups {
    Some(groups) => variables.iter().any(|v| groups.contains_key(v)),
    None => false,
  }
}

/// Preprocessor parameters for `entry`, in active-variable order.
///
/// Every `KEY=VALUE` string of a matching group becomes `-KEY=VALUE`, with
/// both sides trimmed. Strings without `=` or with an empty side are dropped.
pub fn preprocessor_params(entry: &SourceManifestEntry, variables: &[String]) -> Vec<String> {
  let Some(groups) = &entry.variables.groups else {
    return Vec::new();
  };
  variables
    .iter()
    .filter_map(|v| groups.get(v))
    .flatten()
    .filter_map(|assignment| {
      let (key, value) = assignment.split_once('=')?;
      let (key, value) = (key.trim(), value.trim());
      (!key.is_empty() && !value.is_empty()).then(|| format!("-{key}={value}"))
    })
    .collect()
}

/// Intermediate files of one entry, removed on drop.
#[derive(Debug, Default)]
struct TempArtifacts {
  paths: Vec<PathBuf>,
}

impl TempArtifacts {
  fn track(&mut self, path: PathBuf) -> PathBuf {
    self.paths.push(path.clone());
    path
  }
}

impl Drop for TempArtifacts {
  fn drop(&mut self) {
    for path in &self.paths {
      match std::fs::remove_file(path) {
        Ok(()) => debug!(path = ?path, "removed temporary artifact"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => debug!(path = ?path, error = %e, "failed to remove temporary artifact"),
      }
    }
  }
}

/// Runs compiled-source entries through the external tools, one at a time.
pub struct SourcePipeline<'a> {
  compiler: &'a dyn Compiler,
  preprocessor: &'a dyn Preprocessor,
  variables: &'a [String],
  newline: &'a str,
}

impl<'a> SourcePipeline<'a> {
  pub fn new(
    compiler: &'a dyn Compiler,
    preprocessor: &'a dyn Preprocessor,
    variables: &'a [String],
    newline: &'a str,
  ) -> Self {
    Self {
      compiler,
      preprocessor,
      variables,
      newline,
    }
  }

  /// Build every entry in order. Stops at the first failure.
  pub async fn run(&self, entries: &[SourceManifestEntry]) -> Result<usize, PipelineError> {
    for entry in entries {
      self.run_entry(entry).await?;
    }
    Ok(entries.len())
  }

  /// Build one entry into its destination.
  pub async fn run_entry(&self, entry: &SourceManifestEntry) -> Result<(), PipelineError> {
    info!(destination = ?entry.destination, sources = entry.sources.len(), "compiling source");

    if let Some(parent) = entry.destination.parent() {
      std::fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let mut temp = TempArtifacts::default();

    let mut current = match entry.sources.as_slice() {
      [single] => single.clone(),
      sources => {
        let glued = temp.track(with_suffix(&entry.destination, GLUE_FILE_EXTENSION));
        glue(sources, &glued)?;
        glued
      }
    };

    if should_preprocess(entry, self.variables) {
      let params = preprocessor_params(entry, self.variables);
      let output = temp.track(with_suffix(&entry.destination, PREPROCESS_FILE_EXTENSION));
      debug!(input = ?current, params = ?params, "preprocessing");
      self
        .preprocessor
        .preprocess(&current, &output, &params)
        .await
        .map_err(|source| self.tool_error(entry, source))?;
      self.ensure_output("preprocessor", entry, &output)?;
      current = output;
    }

    let compiled = temp.track(with_suffix(&entry.destination, COMPILE_FILE_EXTENSION));
    self
      .compiler
      .compile(&current, &compiled, &entry.compile_options)
      .await
      .map_err(|source| self.tool_error(entry, source))?;
    self.ensure_output("compiler", entry, &compiled)?;

    self.finalize(entry, &compiled)
  }

  fn tool_error(&self, entry: &SourceManifestEntry, source: ToolError) -> PipelineError {
    PipelineError::Tool {
      destination: entry.destination.clone(),
      source,
    }
  }

  fn ensure_output(&self, tool: &'static str, entry: &SourceManifestEntry, output: &Path) -> Result<(), PipelineError> {
    if output.is_file() {
      Ok(())
    } else {
      Err(self.tool_error(
        entry,
        ToolError::MissingOutput {
          tool,
          output: output.to_path_buf(),
        },
      ))
    }
  }

  fn finalize(&self, entry: &SourceManifestEntry, compiled: &Path) -> Result<(), PipelineError> {
    let body = std::fs::read_to_string(compiled).map_err(io_error(compiled))?;
    let content = match &entry.header.lines {
      Some(lines) => format!("{}{}{}", lines.join(self.newline), self.newline, body),
      None => body,
    };
    std::fs::write(&entry.destination, content).map_err(io_error(&entry.destination))
  }
}

/// Concatenate `sources` into `output`, joined by `\n` with `\r` removed.
fn glue(sources: &[PathBuf], output: &Path) -> Result<(), PipelineError> {
  let mut parts = Vec::with_capacity(sources.len());
  for source in sources {
    let content = std::fs::read_to_string(source).map_err(io_error(source))?;
    parts.push(content.replace('\r', ""));
  }
  std::fs::write(output, parts.join("\n")).map_err(io_error(output))
}
