//! External tool capabilities.
//!
//! The source pipeline never spawns processes itself; it talks to a
//! [`Compiler`] and a [`Preprocessor`]. [`ProcessToolchain`] runs the real
//! command-line tools, [`RecordingToolchain`] stands in for them in tests.

mod fake;
mod process;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

pub use fake::{RecordingToolchain, ToolInvocation};
pub use process::{ProcessToolchain, run_shell};

use crate::consts::{DEFAULT_COMPILER, DEFAULT_PREPROCESSOR};

/// Errors from running an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
  #[error("failed to spawn `{cmd}`: {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  #[error("command failed with exit code {code:?}: {cmd}")]
  Failed {
    cmd: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("{tool} did not produce {output}")]
  MissingOutput { tool: &'static str, output: PathBuf },
}

/// Minifies/compiles one script file.
#[async_trait]
pub trait Compiler: Send + Sync {
  /// Compile `input` into `output` using the whitespace-separated `options`.
  async fn compile(&self, input: &Path, output: &Path, options: &str) -> Result<(), ToolError>;
}

/// Runs the macro preprocessor over one script file.
#[async_trait]
pub trait Preprocessor: Send + Sync {
  /// Preprocess `input` into `output`. `params` are `-KEY=VALUE` strings.
  async fn preprocess(&self, input: &Path, output: &Path, params: &[String]) -> Result<(), ToolError>;
}

/// Command lines for the external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainConfig {
  /// Compiler command, e.g. `uglifyjs` or a path to it.
  pub compiler: String,
  /// Preprocessor command, e.g. `metascript`.
  pub preprocessor: String,
  /// Shell used to run tool command lines. `None` picks the platform default.
  pub shell: Option<String>,
}

impl Default for ToolchainConfig {
  fn default() -> Self {
    Self {
      compiler: DEFAULT_COMPILER.to_string(),
      preprocessor: DEFAULT_PREPROCESSOR.to_string(),
      shell: None,
    }
  }
}
