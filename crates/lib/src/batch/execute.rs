//! Batch execution.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{error, info};

use super::resolve::{BatchResolver, BatchUnit, SkippedTarget};
use super::{BatchError, BatchOptions};
use crate::build::{BuildContext, BuildOrchestrator, BuildReport};
use crate::descriptor::BatchDescriptor;

/// A unit that failed in continue-on-failure mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
  pub target: PathBuf,
  pub error: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
  /// Number of resolved units.
  pub total: usize,
  pub succeeded: Vec<BuildReport>,
  pub failed: Vec<BatchFailure>,
  pub skipped: Vec<SkippedTarget>,
  pub duration: Duration,
}

impl BatchReport {
  pub fn is_success(&self) -> bool {
    self.failed.is_empty() && self.skipped.is_empty()
  }
}

/// Runs every unit of a batch with a fresh build each.
pub struct BatchOrchestrator<'a> {
  builder: BuildOrchestrator<'a>,
  options: BatchOptions,
}

impl<'a> BatchOrchestrator<'a> {
  pub fn new(builder: BuildOrchestrator<'a>, options: BatchOptions) -> Self {
    Self { builder, options }
  }

  /// Resolve `batch` and build its units in order.
  ///
  /// `context.variables` apply to entries without their own options. In
  /// continue-on-failure mode failing units are recorded and the rest still
  /// run; otherwise the first failure is returned.
  pub async fn run(&self, batch: &BatchDescriptor, context: &BuildContext) -> Result<BatchReport, BatchError> {
    let start = Instant::now();
    info!(descriptor = ?batch.path, "starting batch build");

    let resolution = BatchResolver::new(self.options).resolve(batch, &context.variables)?;
    let total = resolution.units.len();

    let mut report = BatchReport {
      total,
      skipped: resolution.skipped,
      ..Default::default()
    };

    for (index, unit) in resolution.units.iter().enumerate() {
      info!(unit = index + 1, total, target = ?unit.resolved_target, "batch build");
      match self.build_unit(unit, context).await {
        Ok(build) => report.succeeded.push(build),
        Err(e) if self.options.continue_on_failure => {
          error!(target = ?unit.resolved_target, error = %e, "build aborted");
          report.failed.push(BatchFailure {
            target: unit.resolved_target.clone(),
            error: e.to_string(),
          });
        }
        Err(e) => return Err(e),
      }
    }

    report.duration = start.elapsed();
    info!(
      succeeded = report.succeeded.len(),
      failed = report.failed.len(),
      skipped = report.skipped.len(),
      "batch build finished"
    );
    Ok(report)
  }

  async fn build_unit(&self, unit: &BatchUnit, context: &BuildContext) -> Result<BuildReport, BatchError> {
    let context = context.with_variables(unit.options.clone());
    self
      .builder
      .build(&unit.descriptor, &context)
      .await
      .map_err(|source| BatchError::Build {
        target: unit.resolved_target.clone(),
        source: Box::new(source),
      })
  }
}
