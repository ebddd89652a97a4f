//! Implementation of the `yabs` build command.
//!
//! Locates the build descriptor, then runs either a single project build or
//! a batch build with the process toolchain.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use yabs_lib::batch::{BatchOptions, BatchOrchestrator};
use yabs_lib::build::{BuildContext, BuildOrchestrator};
use yabs_lib::descriptor::{Descriptor, load_descriptor, resolve_default, resolve_target};
use yabs_lib::staleness::StalenessPolicy;
use yabs_lib::toolchain::{ProcessToolchain, ToolchainConfig};
use yabs_lib::util::path::resolve;

use crate::output::{display_path, print_batch_report, print_build_report, print_info};

/// Inputs of one `yabs` invocation.
#[derive(Debug, Clone)]
pub struct BuildArgs {
  pub target: Option<PathBuf>,
  pub variables: Vec<String>,
  pub nofail: bool,
  pub toolchain: ToolchainConfig,
  pub slack: Duration,
}

/// Locate the descriptor for `target` relative to `cwd`.
///
/// Without a target the working directory is searched for a batch descriptor
/// first, then a project descriptor.
pub fn locate_descriptor(target: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
  let path = match target {
    Some(target) => {
      let target = resolve(cwd, target);
      resolve_target(&target).with_context(|| format!("Failed to locate build target: {}", target.display()))?
    }
    None => resolve_default(cwd).context("Failed to locate a build descriptor")?,
  };
  dunce::canonicalize(&path).with_context(|| format!("Failed to resolve descriptor path: {}", path.display()))
}

/// Execute the build command.
///
/// A batch run under `--nofail` succeeds even when units fail; the failures
/// are listed in the summary.
pub fn cmd_build(args: BuildArgs) -> Result<()> {
  let cwd = std::env::current_dir().context("Failed to read the working directory")?;
  let path = locate_descriptor(args.target.as_deref(), &cwd)?;
  let descriptor = load_descriptor(&path).with_context(|| format!("Failed to load descriptor: {}", path.display()))?;

  let toolchain = ProcessToolchain::new(args.toolchain);
  let builder = BuildOrchestrator::new(&toolchain, &toolchain).with_policy(StalenessPolicy::new(args.slack));
  let context = BuildContext::current(args.variables);

  let rt = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .context("Failed to create async runtime")?;

  match descriptor {
    Descriptor::Project(project) => {
      print_info(&format!("Building {}", display_path(&path, &cwd)));
      let report = rt.block_on(builder.build(&project, &context)).context("Build failed")?;
      print_build_report(&report, &cwd);
    }
    Descriptor::Batch(batch) => {
      print_info(&format!("Running batch {}", display_path(&path, &cwd)));
      let options = BatchOptions {
        continue_on_failure: args.nofail,
      };
      let report = rt
        .block_on(BatchOrchestrator::new(builder, options).run(&batch, &context))
        .context("Batch build failed")?;
      print_batch_report(&report, &cwd);
      info!(failed = report.failed.len(), skipped = report.skipped.len(), "batch finished");
    }
  }

  Ok(())
}
