mod cmd;
mod output;
mod params;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use yabs_lib::consts::{DEFAULT_COMPILER, DEFAULT_PREPROCESSOR};
use yabs_lib::toolchain::ToolchainConfig;

use crate::cmd::{BuildArgs, cmd_build};
use crate::output::print_error;

/// yabs - static build orchestrator for script-heavy web projects
#[derive(Parser)]
#[command(name = "yabs")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Variables: activate descriptor variable groups with a single dash, e.g. `yabs site -debug`.")]
struct Cli {
  /// Descriptor file or directory (default: build_all.json, then build.json)
  target: Option<PathBuf>,

  /// Keep going when a batch target is missing or fails
  #[arg(long)]
  nofail: bool,

  /// Compiler command
  #[arg(long, env = "YABS_COMPILER", default_value = DEFAULT_COMPILER)]
  compiler: String,

  /// Preprocessor command
  #[arg(long, env = "YABS_PREPROCESSOR", default_value = DEFAULT_PREPROCESSOR)]
  preprocessor: String,

  /// Shell used to run the compiler and preprocessor
  #[arg(long)]
  shell: Option<String>,

  /// Minimum age difference before a copied file counts as stale
  #[arg(long, value_parser = humantime::parse_duration, default_value = "1s")]
  slack: Duration,

  /// Enable debug logging
  #[arg(long)]
  verbose: bool,
}

fn main() -> ExitCode {
  let split = params::split_args(std::env::args());
  let cli = Cli::parse_from(split.clap_args);

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let args = BuildArgs {
    target: cli.target,
    variables: split.variables,
    nofail: cli.nofail,
    toolchain: ToolchainConfig {
      compiler: cli.compiler,
      preprocessor: cli.preprocessor,
      shell: cli.shell,
    },
    slack: cli.slack,
  };

  match cmd_build(args) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{e:#}"));
      ExitCode::FAILURE
    }
  }
}
