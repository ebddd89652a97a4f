//! HTML script reference rewriting.
//!
//! Every `<script src=...>` whose source is one of the compiled sources gets
//! pointed at the compiled output instead. When several scripts of a file
//! compile into the same output (a bundle), only the first tag is kept and
//! rewritten; the lines of the others are dropped.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

use crate::manifest::{HtmlManifestEntry, SourceManifestEntry};
use crate::util::path::{normalize, to_url_path};

#[derive(Debug, Error)]
pub enum HtmlError {
  #[error("failed to access {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid script pattern: {0}")]
  Pattern(#[from] regex::Error),
}

/// Rewrites script references using the sources manifest as lookup table.
pub struct HtmlRewriter<'a> {
  sources: &'a [SourceManifestEntry],
  newline: &'a str,
  script_src: Regex,
}

impl<'a> HtmlRewriter<'a> {
  pub fn new(sources: &'a [SourceManifestEntry], newline: &'a str) -> Result<Self, HtmlError> {
    Ok(Self {
      sources,
      newline,
      script_src: Regex::new(r#"<script\b[^>]*\bsrc=(?:"([^"]*)"|'([^']*)')[^>]*>"#)?,
    })
  }

  /// Rewrite every HTML entry in order.
  pub fn run(&self, entries: &[HtmlManifestEntry]) -> Result<usize, HtmlError> {
    for entry in entries {
      self.rewrite_entry(entry)?;
    }
    Ok(entries.len())
  }

  /// Read one HTML source, rewrite it and write its destination.
  pub fn rewrite_entry(&self, entry: &HtmlManifestEntry) -> Result<(), HtmlError> {
    info!(destination = ?entry.destination, "writing html");

    let content = std::fs::read_to_string(&entry.source).map_err(|source| HtmlError::Io {
      path: entry.source.clone(),
      source,
    })?;
    let html_dir = entry.source.parent().unwrap_or_else(|| Path::new(""));
    let output = self.rewrite(&content, html_dir);

    if let Some(parent) = entry.destination.parent() {
      std::fs::create_dir_all(parent).map_err(|source| HtmlError::Io {
        path: parent.to_path_buf(),
        source,
      })?;
    }
    std::fs::write(&entry.destination, output).map_err(|source| HtmlError::Io {
      path: entry.destination.clone(),
      source,
    })
  }

  /// Rewrite HTML text located in `html_dir`.
  pub fn rewrite(&self, content: &str, html_dir: &Path) -> String {
    let mut used: HashSet<&Path> = HashSet::new();
    let mut lines = Vec::new();

    for line in content.split('\n') {
      let line = line.strip_suffix('\r').unwrap_or(line);
      match self.rewrite_line(line, html_dir, &mut used) {
        LineAction::Keep => lines.push(line.to_string()),
        LineAction::Replace(replaced) => lines.push(replaced),
        LineAction::Drop => {}
      }
    }

    lines.join(self.newline)
  }

  fn rewrite_line(&self, line: &str, html_dir: &Path, used: &mut HashSet<&'a Path>) -> LineAction {
    let Some(captures) = self.script_src.captures(line) else {
      return LineAction::Keep;
    };
    let Some(src) = captures.get(1).or_else(|| captures.get(2)) else {
      return LineAction::Keep;
    };

    let resolved = normalize(&html_dir.join(src.as_str().trim_start_matches('/')));
    let Some(entry) = self.sources.iter().find(|e| e.contains_source(&resolved)) else {
      return LineAction::Keep;
    };

    if !used.insert(entry.destination.as_path()) {
      debug!(src = %src.as_str(), "dropping bundled script reference");
      return LineAction::Drop;
    }

    let Some(file_name) = entry.destination.file_name() else {
      return LineAction::Keep;
    };
    let src_dir = Path::new(src.as_str()).parent().unwrap_or_else(|| Path::new(""));
    let replacement = to_url_path(&normalize(&src_dir.join(file_name)));

    let mut rewritten = line.to_string();
    rewritten.replace_range(src.range(), &replacement);
    LineAction::Replace(rewritten)
  }
}

enum LineAction {
  Keep,
  Replace(String),
  Drop,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::manifest::{HeaderData, VariablesData};
  use crate::util::testutil::write_file;
  use tempfile::TempDir;

  fn entry(sources: &[&str], destination: &str) -> SourceManifestEntry {
    SourceManifestEntry {
      sources: sources.iter().map(PathBuf::from).collect(),
      destination: PathBuf::from(destination),
      header: HeaderData::default(),
      variables: VariablesData::default(),
      compile_options: String::new(),
      force_preprocess: false,
    }
  }

  #[test]
  fn single_source_reference_is_rewritten() {
    let sources = vec![entry(&["/p/src/js/app.js"], "/p/dist/js/app.min.js")];
    let rewriter = HtmlRewriter::new(&sources, "\n").unwrap();

    let html = "<head>\n  <script type=\"text/javascript\" src=\"js/app.js\"></script>\n</head>";
    let output = rewriter.rewrite(html, Path::new("/p/src"));

    assert_eq!(
      output,
      "<head>\n  <script type=\"text/javascript\" src=\"js/app.min.js\"></script>\n</head>"
    );
  }

  #[test]
  fn bundle_keeps_first_tag_only() {
    let sources = vec![entry(&["/p/src/a.js", "/p/src/b.js"], "/p/dist/bundle.min.js")];
    let rewriter = HtmlRewriter::new(&sources, "\n").unwrap();

    let html = "<script src='b.js'></script>\n<p>x</p>\n<script src='a.js'></script>";
    let output = rewriter.rewrite(html, Path::new("/p/src"));

    assert_eq!(output, "<script src='bundle.min.js'></script>\n<p>x</p>");
  }

  #[test]
  fn unknown_scripts_and_other_lines_are_kept() {
    let sources = vec![entry(&["/p/src/app.js"], "/p/dist/app.min.js")];
    let rewriter = HtmlRewriter::new(&sources, "\r\n").unwrap();

    let html = "<script src=\"https://cdn.example.com/lib.js\"></script>\r\n<div src=\"app.js\"></div>";
    let output = rewriter.rewrite(html, Path::new("/p/src"));

    assert_eq!(
      output,
      "<script src=\"https://cdn.example.com/lib.js\"></script>\r\n<div src=\"app.js\"></div>"
    );
  }

  #[test]
  fn relative_src_resolves_against_html_directory() {
    let sources = vec![entry(&["/p/src/js/app.js"], "/p/dist/js/out/app.min.js")];
    let rewriter = HtmlRewriter::new(&sources, "\n").unwrap();

    let output = rewriter.rewrite("<script src=\"../js/app.js\"></script>", Path::new("/p/src/pages"));
    assert_eq!(output, "<script src=\"../js/app.min.js\"></script>");
  }

  #[test]
  fn bundles_sharing_a_destination_are_merged() {
    let sources = vec![
      entry(&["/p/src/a.js"], "/p/dist/shared.min.js"),
      entry(&["/p/src/b.js"], "/p/dist/shared.min.js"),
    ];
    let rewriter = HtmlRewriter::new(&sources, "\n").unwrap();

    let output = rewriter.rewrite("<script src=\"a.js\"></script>\n<script src=\"b.js\"></script>", Path::new("/p/src"));
    assert_eq!(output, "<script src=\"shared.min.js\"></script>");
  }

  #[test]
  fn rewrite_entry_writes_destination() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = write_file(root, "src/index.html", "<script src=\"app.js\"></script>\n");
    let mut compiled = entry(&[], "");
    compiled.sources = vec![root.join("src/app.js")];
    compiled.destination = root.join("dist/app.min.js");
    let sources = vec![compiled];

    let rewriter = HtmlRewriter::new(&sources, "\n").unwrap();
    let html = HtmlManifestEntry {
      source,
      destination: root.join("dist/index.html"),
    };
    assert_eq!(rewriter.run(&[html]).unwrap(), 1);

    assert_eq!(
      std::fs::read_to_string(root.join("dist/index.html")).unwrap(),
      "<script src=\"app.min.js\"></script>\n"
    );
  }
}
