//! Pre- and post-build event scripts.
//!
//! Each event is a command line. The first whitespace-separated token is the
//! program, the rest are extra arguments. The program receives the absolute
//! source and destination directories as its first two arguments and runs
//! in the descriptor's directory. Programs ending in `.js` run under `node`;
//! programs given as a relative path resolve against the descriptor's
//! directory, bare names are looked up on `PATH`.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::consts::SCRIPT_INTERPRETER;

#[derive(Debug, Error)]
pub enum EventError {
  #[error("empty {phase} event command")]
  Empty { phase: &'static str },

  #[error("failed to start {phase} event `{command}`: {source}")]
  Spawn {
    phase: &'static str,
    command: String,
    #[source]
    source: std::io::Error,
  },

  #[error("{phase} event `{command}` failed with exit code {code:?}")]
  Failed {
    phase: &'static str,
    command: String,
    code: Option<i32>,
    stderr: String,
  },
}

/// Result of one successful event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOutcome {
  pub command: String,
  /// Last non-empty line the event printed, if any.
  pub payload: Option<String>,
}

/// Runs event command lines for one project.
#[derive(Debug, Clone)]
pub struct EventRunner {
  base_dir: PathBuf,
  source_dir: PathBuf,
  destination_dir: PathBuf,
}

impl EventRunner {
  pub fn new(base_dir: impl Into<PathBuf>, source_dir: impl Into<PathBuf>, destination_dir: impl Into<PathBuf>) -> Self {
    Self {
      base_dir: base_dir.into(),
      source_dir: source_dir.into(),
      destination_dir: destination_dir.into(),
    }
  }

  /// Run `commands` in order, stopping at the first failure.
  pub async fn run_all(&self, phase: &'static str, commands: &[String]) -> Result<Vec<EventOutcome>, EventError> {
    let mut outcomes = Vec::with_capacity(commands.len());
    for command in commands {
      outcomes.push(self.run(phase, command).await?);
    }
    Ok(outcomes)
  }

  /// Run a single event command line.
  pub async fn run(&self, phase: &'static str, command_line: &str) -> Result<EventOutcome, EventError> {
    let mut tokens = command_line.split_whitespace();
    let program = tokens.next().ok_or(EventError::Empty { phase })?;
    let rest: Vec<&str> = tokens.collect();

    info!(phase, command = %command_line, "running event");

    let mut command = if program.ends_with(".js") {
      let mut command = Command::new(SCRIPT_INTERPRETER);
      command.arg(self.script_path(program));
      command
    } else if program.contains(['/', '\\']) {
      Command::new(self.script_path(program))
    } else {
      Command::new(program)
    };
    command
      .arg(&self.source_dir)
      .arg(&self.destination_dir)
      .args(&rest)
      .current_dir(&self.base_dir);

    debug!(program, working_dir = ?self.base_dir, "spawning event process");

    let output = command.output().await.map_err(|source| EventError::Spawn {
      phase,
      command: command_line.to_string(),
      source,
    })?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
      if !stderr.is_empty() {
        debug!(stderr = %stderr, "event stderr");
      }
      return Err(EventError::Failed {
        phase,
        command: command_line.to_string(),
        code: output.status.code(),
        stderr,
      });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let payload = stdout
      .lines()
      .map(str::trim)
      .rfind(|line| !line.is_empty())
      .map(str::to_string);

    Ok(EventOutcome {
      command: command_line.to_string(),
      payload,
    })
  }

  fn script_path(&self, program: &str) -> PathBuf {
    let path = Path::new(program);
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.base_dir.join(path)
    }
  }
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;
  use crate::util::testutil::{write_file, write_script};
  use tempfile::TempDir;

  fn runner(root: &Path) -> EventRunner {
    EventRunner::new(root, root.join("src"), root.join("dist"))
  }

  #[tokio::test]
  async fn passes_directories_and_reports_last_line() {
    let temp = TempDir::new().unwrap();
    let outcome = runner(temp.path()).run("prebuild", "echo extra").await.unwrap();

    let expected = format!(
      "{} {} extra",
      temp.path().join("src").display(),
      temp.path().join("dist").display()
    );
    assert_eq!(outcome.payload, Some(expected));
  }

  #[tokio::test]
  async fn runs_in_descriptor_directory() {
    let temp = TempDir::new().unwrap();
    write_script(temp.path(), "hook.sh", "echo first\npwd\n");

    let outcome = runner(temp.path()).run("postbuild", "./hook.sh").await.unwrap();
    let reported = PathBuf::from(outcome.payload.unwrap());
    assert_eq!(
      dunce::canonicalize(reported).unwrap(),
      dunce::canonicalize(temp.path()).unwrap()
    );
  }

  #[tokio::test]
  async fn script_receives_directories_before_extra_arguments() {
    let temp = TempDir::new().unwrap();
    write_script(temp.path(), "tools/args.sh", "echo \"$#|$1|$2|$3\"\n");

    let outcome = runner(temp.path()).run("prebuild", "tools/args.sh extra").await.unwrap();
    let expected = format!(
      "3|{}|{}|extra",
      temp.path().join("src").display(),
      temp.path().join("dist").display()
    );
    assert_eq!(outcome.payload, Some(expected));
  }

  #[tokio::test]
  async fn js_script_runs_under_node() {
    if std::process::Command::new(SCRIPT_INTERPRETER).arg("--version").output().is_err() {
      return;
    }
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "hooks/post.js", "console.log(process.argv[3]);\n");

    let outcome = runner(temp.path()).run("postbuild", "hooks/post.js").await.unwrap();
    assert_eq!(outcome.payload, Some(temp.path().join("dist").display().to_string()));
  }

  #[tokio::test]
  async fn failing_event_is_an_error() {
    let temp = TempDir::new().unwrap();
    let result = runner(temp.path()).run("prebuild", "false").await;
    assert!(matches!(result, Err(EventError::Failed { phase: "prebuild", .. })));
  }

  #[tokio::test]
  async fn missing_program_is_a_spawn_error() {
    let temp = TempDir::new().unwrap();
    let result = runner(temp.path()).run("prebuild", "definitely-not-a-yabs-program").await;
    assert!(matches!(result, Err(EventError::Spawn { .. })));
  }

  #[tokio::test]
  async fn blank_command_is_rejected() {
    let temp = TempDir::new().unwrap();
    let result = runner(temp.path()).run("prebuild", "   ").await;
    assert!(matches!(result, Err(EventError::Empty { .. })));
  }

  #[tokio::test]
  async fn run_all_stops_at_first_failure() {
    let temp = TempDir::new().unwrap();
    let commands = vec!["true".to_string(), "false".to_string(), "touch never".to_string()];
    let result = runner(temp.path()).run_all("postbuild", &commands).await;
    assert!(result.is_err());
    assert!(!temp.path().join("never").exists());
  }

  #[test]
  fn js_scripts_resolve_against_base_dir() {
    let r = EventRunner::new("/p", "/p/src", "/p/dist");
    assert_eq!(r.script_path("scripts/pre.js"), PathBuf::from("/p/scripts/pre.js"));
    assert_eq!(r.script_path("/abs/pre.js"), PathBuf::from("/abs/pre.js"));
  }
}
