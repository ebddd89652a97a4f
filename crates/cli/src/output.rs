//! CLI output formatting utilities.
//!
//! Provides consistent formatting for terminal output: colored status
//! messages, build summaries and human-readable durations.

use std::path::Path;
use std::time::Duration;

use owo_colors::{OwoColorize, Stream};

use yabs_lib::batch::BatchReport;
use yabs_lib::build::BuildReport;

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

/// Print a descriptor path relative to `cwd` when it lives below it.
pub fn display_path(path: &Path, cwd: &Path) -> String {
  path.strip_prefix(cwd).unwrap_or(path).display().to_string()
}

pub fn print_build_report(report: &BuildReport, cwd: &Path) {
  print_success(&format!(
    "Built {} in {}",
    display_path(&report.descriptor, cwd),
    format_duration(report.duration)
  ));
  print_stat("Files copied", &report.files_copied.to_string());
  print_stat("Sources compiled", &report.sources_compiled.to_string());
  print_stat("HTML written", &report.html_written.to_string());
  for event in &report.events {
    if let Some(payload) = &event.payload {
      println!(
        "  {} {}: {}",
        symbols::ARROW.if_supports_color(Stream::Stdout, |s| s.cyan()),
        event.command,
        payload
      );
    }
  }
}

pub fn print_batch_report(report: &BatchReport, cwd: &Path) {
  for build in &report.succeeded {
    print_build_report(build, cwd);
  }
  for skipped in &report.skipped {
    print_warning(&format!("Skipped {}: {}", display_path(&skipped.target, cwd), skipped.reason));
  }
  for failure in &report.failed {
    print_error(&format!("Failed {}: {}", display_path(&failure.target, cwd), failure.error));
  }

  println!();
  let summary = format!(
    "Batch finished in {}: {} of {} built",
    format_duration(report.duration),
    report.succeeded.len(),
    report.total
  );
  if report.is_success() {
    print_success(&summary);
  } else {
    print_warning(&summary);
    print_stat("Failed", &report.failed.len().to_string());
    print_stat("Skipped", &report.skipped.len().to_string());
  }
}
