//! Process-backed toolchain.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::{Compiler, Preprocessor, ToolError, ToolchainConfig};

/// Runs the configured compiler and preprocessor as shell command lines.
///
/// Compiler: `<compiler> "<input>" <options> -o "<output>"`.
/// Preprocessor: `<preprocessor> "<input>" <params> > "<output>"`.
#[derive(Debug, Clone, Default)]
pub struct ProcessToolchain {
  config: ToolchainConfig,
}

impl ProcessToolchain {
  pub fn new(config: ToolchainConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &ToolchainConfig {
    &self.config
  }

  fn compile_command(&self, input: &Path, output: &Path, options: &str) -> String {
    let input = quote(input);
    let output = quote(output);
    join_command(&[self.config.compiler.as_str(), input.as_str(), options.trim(), "-o", output.as_str()])
  }

  fn preprocess_command(&self, input: &Path, output: &Path, params: &[String]) -> String {
    let input = quote(input);
    let output = quote(output);
    let params = params.join(" ");
    join_command(&[self.config.preprocessor.as_str(), input.as_str(), params.as_str(), ">", output.as_str()])
  }
}

#[async_trait]
impl Compiler for ProcessToolchain {
  async fn compile(&self, input: &Path, output: &Path, options: &str) -> Result<(), ToolError> {
    let cmd = self.compile_command(input, output, options);
    run_shell(&cmd, None, self.config.shell.as_deref()).await?;
    Ok(())
  }
}

#[async_trait]
impl Preprocessor for ProcessToolchain {
  async fn preprocess(&self, input: &Path, output: &Path, params: &[String]) -> Result<(), ToolError> {
    let cmd = self.preprocess_command(input, output, params);
    run_shell(&cmd, None, self.config.shell.as_deref()).await?;
    Ok(())
  }
}

fn quote(path: &Path) -> String {
  format!("\"{}\"", path.display())
}

fn join_command(parts: &[&str]) -> String {
  parts.iter().filter(|p| !p.is_empty()).copied().collect::<Vec<_>>().join(" ")
}

/// Run a command line through the shell.
///
/// # Returns
///
/// The stdout of the command on success (trimmed).
pub async fn run_shell(cmd: &str, cwd: Option<&Path>, shell: Option<&str>) -> Result<String, ToolError> {
  info!(cmd = %cmd, "executing command");

  let (shell_cmd, shell_args) = get_shell(shell);

  let mut command = Command::new(&shell_cmd);
  command.args(&shell_args).arg(cmd);
  if let Some(dir) = cwd {
    command.current_dir(dir);
  }

  debug!(shell = %shell_cmd, working_dir = ?cwd, "spawning process");

  let output = command.output().await.map_err(|source| ToolError::Spawn {
    cmd: cmd.to_string(),
    source,
  })?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout);

    if !stderr.is_empty() {
      debug!(stderr = %stderr, "command stderr");
    }
    if !stdout.is_empty() {
      debug!(stdout = %stdout, "command stdout");
    }

    return Err(ToolError::Failed {
      cmd: cmd.to_string(),
      code: output.status.code(),
      stderr,
    });
  }

  let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

  if !stdout.is_empty() {
    debug!(stdout = %stdout, "command output");
  }

  Ok(stdout)
}

/// Get the shell command and arguments for the current platform.
///
/// An explicit `--shell` gets the argument style of its program name;
/// otherwise `/bin/sh -c` on Unix and PowerShell on Windows.
fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  if let Some(shell) = override_shell {
    return (shell.to_string(), shell_args(shell));
  }

  #[cfg(unix)]
  {
    ("/bin/sh".to_string(), vec!["-c".to_string()])
  }

  #[cfg(windows)]
  {
    (
      "powershell.exe".to_string(),
      vec![
        "-NoProfile".to_string(),
        "-ExecutionPolicy".to_string(),
        "Bypass".to_string(),
        "-Command".to_string(),
      ],
    )
  }
}

/// Arguments that make `shell` run the command line that follows.
fn shell_args(shell: &str) -> Vec<String> {
  let program = Path::new(shell)
    .file_stem()
    .map(|s| s.to_string_lossy().to_lowercase())
    .unwrap_or_default();
  match program.as_str() {
    "powershell" | "pwsh" => vec!["-NoProfile".to_string(), "-Command".to_string()],
    "cmd" => vec!["/C".to_string()],
    _ => vec!["-c".to_string()],
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::write_file;
  use tempfile::TempDir;

  #[test]
  fn compile_command_line() {
    let toolchain = ProcessToolchain::default();
    let cmd = toolchain.compile_command(Path::new("/a/app.js"), Path::new("/d/app.min.js.cmp"), "--compress --mangle");
    assert_eq!(cmd, "uglifyjs \"/a/app.js\" --compress --mangle -o \"/d/app.min.js.cmp\"");
  }

  #[test]
  fn compile_command_without_options() {
    let toolchain = ProcessToolchain::default();
    let cmd = toolchain.compile_command(Path::new("/a/app.js"), Path::new("/d/out"), "  ");
    assert_eq!(cmd, "uglifyjs \"/a/app.js\" -o \"/d/out\"");
  }

  #[test]
  fn preprocess_command_line() {
    let toolchain = ProcessToolchain::new(ToolchainConfig {
      preprocessor: "mpp".to_string(),
      ..Default::default()
    });
    let params = vec!["-DEBUG=1".to_string(), "-LEVEL=2".to_string()];
    let cmd = toolchain.preprocess_command(Path::new("/a/app.js"), Path::new("/d/app.pre"), &params);
    assert_eq!(cmd, "mpp \"/a/app.js\" -DEBUG=1 -LEVEL=2 > \"/d/app.pre\"");
  }

  #[test]
  fn shell_override_picks_argument_style() {
    assert_eq!(get_shell(Some("bash")), ("bash".to_string(), vec!["-c".to_string()]));
    assert_eq!(get_shell(Some("/usr/local/bin/zsh")).1, vec!["-c"]);
    assert_eq!(get_shell(Some("pwsh")).1, vec!["-NoProfile", "-Command"]);
    assert_eq!(get_shell(Some("C:/Windows/System32/WindowsPowerShell/v1.0/powershell.exe")).1, vec!["-NoProfile", "-Command"]);
    assert_eq!(get_shell(Some("cmd.exe")).1, vec!["/C"]);
    // Only the program name counts, not the directory it lives in.
    assert_eq!(get_shell(Some("/opt/cmd/bin/dash")).1, vec!["-c"]);
  }

  #[test]
  #[cfg(unix)]
  fn default_shell_is_bin_sh() {
    assert_eq!(get_shell(None), ("/bin/sh".to_string(), vec!["-c".to_string()]));
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn run_shell_uses_override_shell() {
    let result = run_shell("echo $0", None, Some("sh")).await.unwrap();
    assert_eq!(result, "sh");
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn run_shell_returns_trimmed_stdout() {
    let result = run_shell("echo hello", None, None).await.unwrap();
    assert_eq!(result, "hello");
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn run_shell_failure_carries_exit_code() {
    let result = run_shell("echo oops >&2; exit 3", None, None).await;
    match result {
      Err(ToolError::Failed { code, stderr, .. }) => {
        assert_eq!(code, Some(3));
        assert_eq!(stderr, "oops");
      }
      other => panic!("expected Failed, got {other:?}"),
    }
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn run_shell_uses_working_directory() {
    let temp = TempDir::new().unwrap();
    run_shell("touch cwd_marker", Some(temp.path()), None).await.unwrap();
    assert!(temp.path().join("cwd_marker").exists());
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn process_compiler_runs_configured_command() {
    let temp = TempDir::new().unwrap();
    let input = write_file(temp.path(), "app.js", "var a = 1;\n");
    let output = temp.path().join("app.min.js.cmp");

    let script = write_file(temp.path(), "fake-compiler.sh", "cp \"$1\" \"$3\"\n");
    let toolchain = ProcessToolchain::new(ToolchainConfig {
      compiler: format!("sh \"{}\"", script.display()),
      ..Default::default()
    });

    toolchain.compile(&input, &output, "").await.unwrap();
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "var a = 1;\n");
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn process_preprocessor_redirects_stdout() {
    let temp = TempDir::new().unwrap();
    let input = write_file(temp.path(), "app.js", "body\n");
    let output = temp.path().join("app.js.pre");

    let toolchain = ProcessToolchain::new(ToolchainConfig {
      preprocessor: "echo".to_string(),
      ..Default::default()
    });

    toolchain
      .preprocess(&input, &output, &["-A=1".to_string()])
      .await
      .unwrap();
    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(written.trim(), format!("{} -A=1", input.display()));
  }
}
