//! File listing masks.

use std::path::Path;

use crate::consts::MASK_CHAR;

use super::types::ManifestError;

/// A mask in the last segment of a `files` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mask {
  /// `*`: every file, descending into subdirectories.
  Recursive,
  /// `*.*`: every file directly inside the directory.
  AllFiles,
  /// `*.ext`: files directly inside the directory with extension `ext`.
  Extension(String),
}

impl Mask {
  /// Parse a single path segment. Returns `None` if it is not a valid mask.
  pub fn parse(segment: &str) -> Option<Mask> {
    match segment {
      "*" => Some(Mask::Recursive),
      "*.*" => Some(Mask::AllFiles),
      _ => {
        let ext = segment.strip_prefix("*.")?;
        if ext.is_empty() || ext.contains(MASK_CHAR) || ext.contains('.') {
          None
        } else {
          Some(Mask::Extension(ext.to_string()))
        }
      }
    }
  }

  /// Split a listing into its directory part and its mask.
  ///
  /// Returns `Ok(None)` for listings without a mask character.
  pub fn split(listing: &str) -> Result<Option<(&str, Mask)>, ManifestError> {
    if !listing.contains(MASK_CHAR) {
      return Ok(None);
    }
    let invalid = || ManifestError::InvalidMask {
      listing: listing.to_string(),
    };

    let (dir, last) = match listing.rfind(['/', '\\']) {
      Some(idx) => (&listing[..idx], &listing[idx + 1..]),
      None => ("", listing),
    };
    if dir.contains(MASK_CHAR) {
      return Err(invalid());
    }
    let mask = Mask::parse(last).ok_or_else(invalid)?;
    Ok(Some((dir, mask)))
  }

  pub fn is_recursive(&self) -> bool {
    matches!(self, Mask::Recursive)
  }

  /// Whether a file found during descent passes this mask.
  pub fn matches(&self, path: &Path) -> bool {
    match self {
      Mask::Recursive | Mask::AllFiles => true,
      Mask::Extension(ext) => path.extension().is_some_and(|e| e == ext.as_str()),
    }
  }
}
