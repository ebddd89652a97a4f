//! Single-project builds.
//!
//! A build derives the manifests of a project descriptor, verifies that all
//! sources exist, fills header placeholders, then runs its stages in order:
//!
//! 1. prebuild events
//! 2. copy plain files
//! 3. compile sources
//! 4. rewrite HTML
//! 5. postbuild events
//!
//! Any failure aborts the build. Empty stages are skipped.

mod types;

use std::time::Instant;

use tracing::{debug, info};

pub use types::*;

use crate::descriptor::{Descriptor, ProjectDescriptor, load_descriptor};
use crate::events::EventRunner;
use crate::header::HeaderSubstitutor;
use crate::html::HtmlRewriter;
use crate::manifest::{FileManifestEntry, ManifestBuilder};
use crate::pipeline::SourcePipeline;
use crate::staleness::StalenessPolicy;
use crate::toolchain::{Compiler, Preprocessor};

/// Runs single-project builds against a toolchain.
pub struct BuildOrchestrator<'a> {
  compiler: &'a dyn Compiler,
  preprocessor: &'a dyn Preprocessor,
  policy: StalenessPolicy,
}

impl<'a> BuildOrchestrator<'a> {
  pub fn new(compiler: &'a dyn Compiler, preprocessor: &'a dyn Preprocessor) -> Self {
    Self {
      compiler,
      preprocessor,
      policy: StalenessPolicy::default(),
    }
  }

  pub fn with_policy(mut self, policy: StalenessPolicy) -> Self {
    self.policy = policy;
    self
  }

  /// Load the descriptor at `path` and build it.
  pub async fn build_file(&self, path: &std::path::Path, context: &BuildContext) -> Result<BuildReport, BuildError> {
    match load_descriptor(path)? {
      Descriptor::Project(project) => self.build(&project, context).await,
      Descriptor::Batch(batch) => Err(BuildError::NotAProject(batch.path)),
    }
  }

  /// Build one project.
  pub async fn build(&self, descriptor: &ProjectDescriptor, context: &BuildContext) -> Result<BuildReport, BuildError> {
    let start = Instant::now();
    info!(descriptor = ?descriptor.path, variables = ?context.variables, "starting build");

    let mut manifests = ManifestBuilder::new(descriptor, self.policy).build()?;
    manifests.verify_sources()?;

    let substituted = HeaderSubstitutor::new(context.year)?.apply(&mut manifests.sources)?;
    debug!(entries = substituted, "processed source headers");

    let mut report = BuildReport {
      descriptor: descriptor.path.clone(),
      ..Default::default()
    };

    let events = EventRunner::new(
      &descriptor.base_dir,
      descriptor.source_root(),
      descriptor.destination_root(),
    );

    if !descriptor.events.prebuild.is_empty() {
      info!(count = descriptor.events.prebuild.len(), "running prebuild events");
      report.events.extend(events.run_all("prebuild", &descriptor.events.prebuild).await?);
    }

    if !manifests.files.is_empty() {
      info!(count = manifests.files.len(), "updating files");
      report.files_copied = copy_files(&manifests.files)?;
    }

    if !manifests.sources.is_empty() {
      info!(count = manifests.sources.len(), "compiling sources");
      let pipeline = SourcePipeline::new(self.compiler, self.preprocessor, &context.variables, &context.newline);
      report.sources_compiled = pipeline.run(&manifests.sources).await?;
    }

    if !manifests.html.is_empty() {
      info!(count = manifests.html.len(), "writing html files");
      let rewriter = HtmlRewriter::new(&manifests.sources, &context.newline)?;
      report.html_written = rewriter.run(&manifests.html)?;
    }

    if !descriptor.events.postbuild.is_empty() {
      info!(count = descriptor.events.postbuild.len(), "running postbuild events");
      report.events.extend(events.run_all("postbuild", &descriptor.events.postbuild).await?);
    }

    report.duration = start.elapsed();
    info!(
      descriptor = ?descriptor.path,
      updated = report.files_updated(),
      duration_ms = report.duration.as_millis() as u64,
      "build finished"
    );
    Ok(report)
  }
}

fn copy_files(entries: &[FileManifestEntry]) -> Result<usize, BuildError> {
  for entry in entries {
    debug!(source = ?entry.source, destination = ?entry.destination, "copying file");
    let copy_error = |source| BuildError::Copy {
      source_path: entry.source.clone(),
      destination: entry.destination.clone(),
      source,
    };
    if let Some(parent) = entry.destination.parent() {
      std::fs::create_dir_all(parent).map_err(copy_error)?;
    }
    std::fs::copy(&entry.source, &entry.destination).map_err(copy_error)?;
  }
  Ok(entries.len())
}

#[cfg(test)]
mod tests {
  use std::path::{Path, PathBuf};
  use std::time::Duration;

  use super::*;
  use crate::descriptor::{Events, SourceListing};
  use crate::manifest::ManifestError;
  use crate::pipeline::PipelineError;
  use crate::toolchain::RecordingToolchain;
  #[cfg(unix)]
  use crate::util::testutil::write_script;
  use crate::util::testutil::{canonical_root, set_age, write_file};
  use tempfile::TempDir;

  fn project(root: &Path) -> ProjectDescriptor {
    ProjectDescriptor {
      path: root.join("build.json"),
      base_dir: root.to_path_buf(),
      source_dir: PathBuf::from("src"),
      destination_dir: PathBuf::from("dist"),
      files: vec![],
      sources: vec![],
      html: vec![],
      events: Events::default(),
    }
  }

  fn context() -> BuildContext {
    BuildContext::new(vec![], 2024)
  }

  #[tokio::test]
  async fn builds_single_source_without_header() {
    let temp = TempDir::new().unwrap();
    let root = canonical_root(temp.path());
    write_file(&root, "src/app.js", "var app = 1;");

    let mut d = project(&root);
    d.sources = vec![SourceListing {
      files: vec!["app.js".to_string()],
      ..Default::default()
    }];

    let tools = RecordingToolchain::new();
    let report = BuildOrchestrator::new(&tools, &tools).build(&d, &context()).await.unwrap();

    assert_eq!(report.sources_compiled, 1);
    assert_eq!(std::fs::read_to_string(root.join("dist/app.min.js")).unwrap(), "var app = 1;");
    assert!(!root.join("dist/app.min.js.cmp").exists());
  }

  #[tokio::test]
  async fn full_build_copies_compiles_and_rewrites() {
    let temp = TempDir::new().unwrap();
    let root = canonical_root(temp.path());
    write_file(&root, "src/img/logo.png", "png");
    write_file(&root, "src/js/a.js", "/**\n * @version 1.2.3\n */\nvar a;");
    write_file(&root, "src/js/b.js", "var b;");
    write_file(
      &root,
      "src/index.html",
      "<html>\n<script src=\"js/a.js\"></script>\n<script src=\"js/b.js\"></script>\n</html>",
    );

    let mut d = project(&root);
    d.files = vec!["img/*".to_string()];
    d.sources = vec![SourceListing {
      files: vec!["js/a.js".to_string(), "js/b.js".to_string()],
      is_bundle: true,
      output_file: Some("js/app.min.js".to_string()),
      header: Some(vec!["// built %VERSION% in $YEAR$".to_string()]),
      ..Default::default()
    }];
    d.html = vec!["index.html".to_string()];

    let tools = RecordingToolchain::new();
    let report = BuildOrchestrator::new(&tools, &tools).build(&d, &context()).await.unwrap();

    assert_eq!(report.files_copied, 1);
    assert_eq!(report.sources_compiled, 1);
    assert_eq!(report.html_written, 1);
    assert_eq!(report.files_updated(), 3);

    assert_eq!(std::fs::read_to_string(root.join("dist/img/logo.png")).unwrap(), "png");
    assert_eq!(
      std::fs::read_to_string(root.join("dist/js/app.min.js")).unwrap(),
      "// built 1.2.3 in 2024\n/**\n * @version 1.2.3\n */\nvar a;\nvar b;"
    );
    assert_eq!(
      std::fs::read_to_string(root.join("dist/index.html")).unwrap(),
      "<html>\n<script src=\"js/app.min.js\"></script>\n</html>"
    );
  }

  #[tokio::test]
  async fn rerun_skips_files_but_recompiles_sources() {
    let temp = TempDir::new().unwrap();
    let root = canonical_root(temp.path());
    let asset = write_file(&root, "src/style.css", "body {}");
    let script = write_file(&root, "src/app.js", "var app;");

    let mut d = project(&root);
    d.files = vec!["style.css".to_string()];
    d.sources = vec![SourceListing {
      files: vec!["app.js".to_string()],
      ..Default::default()
    }];

    let tools = RecordingToolchain::new();
    let orchestrator = BuildOrchestrator::new(&tools, &tools);

    let first = orchestrator.build(&d, &context()).await.unwrap();
    assert_eq!(first.files_copied, 1);

    // Make the sources clearly older than what the first run produced.
    set_age(&asset, Duration::from_secs(60));
    set_age(&script, Duration::from_secs(60));

    let second = orchestrator.build(&d, &context()).await.unwrap();
    assert_eq!(second.files_copied, 0);
    assert_eq!(second.sources_compiled, 1);
    assert_eq!(tools.compile_count(), 2);
  }

  #[tokio::test]
  async fn missing_source_fails_before_any_stage() {
    let temp = TempDir::new().unwrap();
    let root = canonical_root(temp.path());
    write_file(&root, "src/present.txt", "x");

    let mut d = project(&root);
    d.files = vec!["present.txt".to_string()];
    d.sources = vec![SourceListing {
      files: vec!["missing.js".to_string()],
      ..Default::default()
    }];

    let tools = RecordingToolchain::new();
    let result = BuildOrchestrator::new(&tools, &tools).build(&d, &context()).await;

    assert!(matches!(result, Err(BuildError::Manifest(ManifestError::MissingSource(_)))));
    assert!(!root.join("dist/present.txt").exists());
    assert_eq!(tools.compile_count(), 0);
  }

  #[tokio::test]
  async fn compiler_failure_aborts_before_html() {
    let temp = TempDir::new().unwrap();
    let root = canonical_root(temp.path());
    write_file(&root, "src/app.js", "var app;");
    write_file(&root, "src/index.html", "<script src=\"app.js\"></script>");

    let mut d = project(&root);
    d.sources = vec![SourceListing {
      files: vec!["app.js".to_string()],
      ..Default::default()
    }];
    d.html = vec!["index.html".to_string()];

    let tools = RecordingToolchain::failing_compiler();
    let result = BuildOrchestrator::new(&tools, &tools).build(&d, &context()).await;

    assert!(matches!(result, Err(BuildError::Pipeline(PipelineError::Tool { .. }))));
    assert!(!root.join("dist/index.html").exists());
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn events_run_around_stages() {
    let temp = TempDir::new().unwrap();
    let root = canonical_root(temp.path());
    write_file(&root, "src/a.txt", "a");
    write_script(&root, "pre.sh", "test ! -e \"$2/a.txt\" && echo pre-ok\n");
    write_script(&root, "post.sh", "test -e \"$2/a.txt\" && echo post-ok\n");

    let mut d = project(&root);
    d.files = vec!["a.txt".to_string()];
    d.events = Events {
      prebuild: vec!["./pre.sh".to_string()],
      postbuild: vec!["./post.sh".to_string()],
    };

    let tools = RecordingToolchain::new();
    let report = BuildOrchestrator::new(&tools, &tools).build(&d, &context()).await.unwrap();

    let payloads: Vec<_> = report.events.iter().map(|e| e.payload.clone().unwrap_or_default()).collect();
    assert_eq!(payloads, vec!["pre-ok", "post-ok"]);
  }

  #[tokio::test]
  async fn build_file_rejects_batch_descriptor() {
    let temp = TempDir::new().unwrap();
    let root = canonical_root(temp.path());
    let path = write_file(&root, "build_all.json", r#"{"batch_build": []}"#);

    let tools = RecordingToolchain::new();
    let result = BuildOrchestrator::new(&tools, &tools).build_file(&path, &context()).await;
    assert!(matches!(result, Err(BuildError::NotAProject(_))));
  }
}
