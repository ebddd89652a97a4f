//! In-memory toolchain for tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Compiler, Preprocessor, ToolError};

/// One recorded tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocation {
  Compile {
    input: PathBuf,
    output: PathBuf,
    options: String,
  },
  Preprocess {
    input: PathBuf,
    output: PathBuf,
    params: Vec<String>,
  },
}

/// A toolchain that copies input to output and records every call.
///
/// Compiling copies the input unchanged; preprocessing copies it and appends
/// one `// params: ...` line, so tests can see which params reached it.
#[derive(Debug, Default)]
pub struct RecordingToolchain {
  invocations: Mutex<Vec<ToolInvocation>>,
  fail_compile: bool,
  fail_preprocess: bool,
}

impl RecordingToolchain {
  pub fn new() -> Self {
    Self::default()
  }

  /// A toolchain whose compiler always fails.
  pub fn failing_compiler() -> Self {
    Self {
      fail_compile: true,
      ..Default::default()
    }
  }

  /// A toolchain whose preprocessor always fails.
  pub fn failing_preprocessor() -> Self {
    Self {
      fail_preprocess: true,
      ..Default::default()
    }
  }

  pub fn invocations(&self) -> Vec<ToolInvocation> {
    self.lock().clone()
  }

  pub fn compile_count(&self) -> usize {
    self
      .lock()
      .iter()
      .filter(|i| matches!(i, ToolInvocation::Compile { .. }))
      .count()
  }

  pub fn preprocess_count(&self) -> usize {
    self
      .lock()
      .iter()
      .filter(|i| matches!(i, ToolInvocation::Preprocess { .. }))
      .count()
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ToolInvocation>> {
    // A panicking test thread may poison the lock; the data is still usable.
    self.invocations.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn record(&self, invocation: ToolInvocation) {
    self.lock().push(invocation);
  }
}

fn read(path: &Path) -> Result<String, ToolError> {
  std::fs::read_to_string(path).map_err(|source| ToolError::Spawn {
    cmd: format!("read {}", path.display()),
    source,
  })
}

fn write(path: &Path, content: &str) -> Result<(), ToolError> {
  std::fs::write(path, content).map_err(|source| ToolError::Spawn {
    cmd: format!("write {}", path.display()),
    source,
  })
}

#[async_trait]
impl Compiler for RecordingToolchain {
  async fn compile(&self, input: &Path, output: &Path, options: &str) -> Result<(), ToolError> {
    self.record(ToolInvocation::Compile {
      input: input.to_path_buf(),
      output: output.to_path_buf(),
      options: options.to_string(),
    });
    if self.fail_compile {
      return Err(ToolError::Failed {
        cmd: format!("compile {}", input.display()),
        code: Some(1),
        stderr: "compile failed".to_string(),
      });
    }
    let content = read(input)?;
    write(output, &content)
  }
}

#[async_trait]
impl Preprocessor for RecordingToolchain {
  async fn preprocess(&self, input: &Path, output: &Path, params: &[String]) -> Result<(), ToolError> {
    self.record(ToolInvocation::Preprocess {
      input: input.to_path_buf(),
      output: output.to_path_buf(),
      params: params.to_vec(),
    });
    if self.fail_preprocess {
      return Err(ToolError::Failed {
        cmd: format!("preprocess {}", input.display()),
        code: Some(1),
        stderr: "preprocess failed".to_string(),
      });
    }
    let content = read(input)?;
    write(output, &format!("{content}\n// params: {}", params.join(" ")))
  }
}
