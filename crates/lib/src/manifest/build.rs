//! Manifest derivation from descriptor listings.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::mask::Mask;
use super::types::*;
use crate::consts::{COMPILED_SOURCE_EXTENSION, DEFAULT_COMPILE_OPTIONS, MASK_CHAR};
use crate::descriptor::{ProjectDescriptor, SourceListing};
use crate::staleness::StalenessPolicy;
use crate::util::path::{normalize, resolve};

/// Expands the listings of a project descriptor into manifests.
///
/// Sources resolve against `base_dir/source_dir`, destinations against
/// `base_dir/destination_dir`. Plain files whose destination is up to date
/// are left out; compiled sources and HTML are always included.
pub struct ManifestBuilder<'a> {
  descriptor: &'a ProjectDescriptor,
  policy: StalenessPolicy,
  source_root: PathBuf,
  destination_root: PathBuf,
}

impl<'a> ManifestBuilder<'a> {
  pub fn new(descriptor: &'a ProjectDescriptor, policy: StalenessPolicy) -> Self {
    Self {
      source_root: descriptor.source_root(),
      destination_root: descriptor.destination_root(),
      descriptor,
      policy,
    }
  }

  /// Derive all three manifests.
  pub fn build(&self) -> Result<Manifests, ManifestError> {
    let manifests = Manifests {
      files: self.files_manifest()?,
      sources: self.sources_manifest()?,
      html: self.html_manifest()?,
    };
    debug!(
      files = manifests.files.len(),
      sources = manifests.sources.len(),
      html = manifests.html.len(),
      "built manifests"
    );
    Ok(manifests)
  }

  /// Plain files that need copying.
  pub fn files_manifest(&self) -> Result<Vec<FileManifestEntry>, ManifestError> {
    let mut entries = Vec::new();
    for listing in &self.descriptor.files {
      match Mask::split(listing)? {
        Some((dir, mask)) => {
          let source_dir = resolve(&self.source_root, dir);
          let destination_dir = resolve(&self.destination_root, dir);
          self.descend(&source_dir, &destination_dir, &mask, &mut entries)?;
        }
        None => {
          let source = resolve(&self.source_root, listing);
          let destination = resolve(&self.destination_root, listing);
          if source.is_dir() {
            debug!(path = ?source, "skipping directory in files listing");
            continue;
          }
          if self.needs_update(&source, &destination)? {
            entries.push(FileManifestEntry::new(source, destination)?);
          }
        }
      }
    }
    Ok(entries)
  }

  fn descend(
    &self,
    source_dir: &Path,
    destination_dir: &Path,
    mask: &Mask,
    entries: &mut Vec<FileManifestEntry>,
  ) -> Result<(), ManifestError> {
    if !source_dir.is_dir() {
      return Err(ManifestError::MissingMaskDirectory(source_dir.to_path_buf()));
    }

    let mut walker = WalkDir::new(source_dir).min_depth(1).sort_by_file_name();
    if !mask.is_recursive() {
      walker = walker.max_depth(1);
    }

    for entry in walker {
      let entry = entry.map_err(|source| ManifestError::Walk {
        path: source_dir.to_path_buf(),
        source,
      })?;
      if entry.file_type().is_dir() || !mask.matches(entry.path()) {
        continue;
      }
      let relative = entry.path().strip_prefix(source_dir).unwrap_or(entry.path());
      let source = normalize(entry.path());
      let destination = normalize(&destination_dir.join(relative));
      if self.needs_update(&source, &destination)? {
        entries.push(FileManifestEntry::new(source, destination)?);
      } else {
        debug!(path = ?source, "destination up to date");
      }
    }
    Ok(())
  }

  fn needs_update(&self, source: &Path, destination: &Path) -> Result<bool, ManifestError> {
    // Missing sources stay in the manifest so verification can report them.
    if !source.exists() {
      return Ok(true);
    }
    self
      .policy
      .is_source_newer(source, destination)
      .map_err(|e| ManifestError::Io {
        path: source.to_path_buf(),
        source: e,
      })
  }

  /// Sources to compile, one entry per listing.
  pub fn sources_manifest(&self) -> Result<Vec<SourceManifestEntry>, ManifestError> {
    self.descriptor.sources.iter().map(|listing| self.source_entry(listing)).collect()
  }

  fn source_entry(&self, listing: &SourceListing) -> Result<SourceManifestEntry, ManifestError> {
    if let Some(masked) = listing.files.iter().find(|f| f.contains(MASK_CHAR)) {
      return Err(ManifestError::MaskNotAllowed {
        kind: "sources",
        listing: masked.clone(),
      });
    }

    let sources: Vec<PathBuf> = listing.files.iter().map(|f| resolve(&self.source_root, f)).collect();

    let output_file = match &listing.output_file {
      Some(output) => PathBuf::from(output),
      None => default_output_file(listing.files.first().map(String::as_str).unwrap_or_default()),
    };
    let destination = resolve(&self.destination_root, output_file);

    if let Some(same) = sources.iter().find(|s| **s == destination) {
      return Err(ManifestError::SameSourceAndDestination(same.clone()));
    }

    Ok(SourceManifestEntry {
      sources,
      destination,
      header: HeaderData {
        lines: listing.header.clone(),
      },
      variables: VariablesData {
        groups: listing.variables.clone(),
      },
      compile_options: listing
        .compile_options
        .clone()
        .unwrap_or_else(|| DEFAULT_COMPILE_OPTIONS.to_string()),
      force_preprocess: listing.preprocess,
    })
  }

  /// HTML files to rewrite.
  pub fn html_manifest(&self) -> Result<Vec<HtmlManifestEntry>, ManifestError> {
    let mut entries = Vec::new();
    for listing in &self.descriptor.html {
      if listing.contains(MASK_CHAR) {
        return Err(ManifestError::MaskNotAllowed {
          kind: "html",
          listing: listing.clone(),
        });
      }
      let source = resolve(&self.source_root, listing);
      let destination = resolve(&self.destination_root, listing);
      if source == destination {
        return Err(ManifestError::SameSourceAndDestination(source));
      }
      entries.push(HtmlManifestEntry { source, destination });
    }
    Ok(entries)
  }
}

/// `js/app.js` -> `js/app.min.js`.
fn default_output_file(first_source: &str) -> PathBuf {
  let path = Path::new(first_source);
  let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
  let name = format!("{stem}{COMPILED_SOURCE_EXTENSION}");
  match path.parent() {
    Some(parent) => parent.join(name),
    None => PathBuf::from(name),
  }
}
