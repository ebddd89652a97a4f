//! Header placeholder substitution.
//!
//! Header lines may carry `%TAG%` placeholders, filled from `@tag value`
//! annotations found in the entry's `/** ... */` doc comments, and the
//! special `$YEAR$` placeholder. Tag names match case-insensitively, so
//! `@version` fills `%VERSION%`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use regex::{Captures, Regex};
use thiserror::Error;
use tracing::debug;

use crate::manifest::SourceManifestEntry;

const YEAR_PLACEHOLDER: &str = "$YEAR$";

#[derive(Debug, Error)]
pub enum HeaderError {
  #[error("failed to read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid header pattern: {0}")]
  Pattern(#[from] regex::Error),
}

/// Fills header placeholders of compiled-source entries.
pub struct HeaderSubstitutor {
  doc_comment: Regex,
  doc_tag: Regex,
  placeholder: Regex,
  year: i32,
}

impl HeaderSubstitutor {
  pub fn new(year: i32) -> Result<Self, HeaderError> {
    Ok(Self {
      doc_comment: Regex::new(r"(?s)/\*\*(.*?)\*/")?,
      doc_tag: Regex::new(r"\*\s*@(\w+)\s+(.+)")?,
      placeholder: Regex::new(r"%([^%\s]+)%")?,
      year,
    })
  }

  /// Whether any line has a `%TOKEN%` or `$YEAR$` placeholder.
  pub fn has_placeholders(&self, lines: &[String]) -> bool {
    lines
      .iter()
      .any(|line| self.placeholder.is_match(line) || line.contains(YEAR_PLACEHOLDER))
  }

  /// Collect `@tag value` pairs from doc comments in `content` into `tags`.
  ///
  /// Keys are stored lowercased. Later occurrences overwrite earlier ones.
  pub fn collect_tags(&self, content: &str, tags: &mut BTreeMap<String, String>) {
    for comment in self.doc_comment.find_iter(content) {
      for captures in self.doc_tag.captures_iter(comment.as_str()) {
        let key = &captures[1];
        let value = captures[2].trim_end_matches('\r');
        tags.insert(key.to_lowercase(), value.to_string());
      }
    }
  }

  /// Substitute placeholders in one header line.
  ///
  /// `tags` holds lowercased keys as produced by [`Self::collect_tags`].
  /// Placeholders without a matching tag are kept as they are.
  pub fn substitute_line(&self, line: &str, tags: &BTreeMap<String, String>) -> String {
    let line = self.placeholder.replace_all(line, |caps: &Captures| {
      tags
        .get(&caps[1].to_lowercase())
        .cloned()
        .unwrap_or_else(|| caps[0].to_string())
    });
    line.replace(YEAR_PLACEHOLDER, &self.year.to_string())
  }

  /// Rewrite the header of `entry` in place. Returns whether anything was
  /// substituted; entries without a header or without placeholders are left
  /// untouched and their sources are never read.
  pub fn apply_to_entry(&self, entry: &mut SourceManifestEntry) -> Result<bool, HeaderError> {
    let Some(lines) = entry.header.lines.as_mut() else {
      return Ok(false);
    };
    if !self.has_placeholders(lines) {
      return Ok(false);
    }

    let mut tags = BTreeMap::new();
    for source in &entry.sources {
      let content = std::fs::read_to_string(source).map_err(|e| HeaderError::Io {
        path: source.clone(),
        source: e,
      })?;
      self.collect_tags(&content, &mut tags);
    }

    for line in lines.iter_mut() {
      *line = self.substitute_line(line, &tags);
    }
    debug!(destination = ?entry.destination, tags = tags.len(), "substituted header placeholders");
    Ok(true)
  }

  /// Rewrite headers of every entry. Returns how many were substituted.
  pub fn apply(&self, entries: &mut [SourceManifestEntry]) -> Result<usize, HeaderError> {
    let mut count = 0;
    for entry in entries.iter_mut() {
      if self.apply_to_entry(entry)? {
        count += 1;
      }
    }
    Ok(count)
  }
}
