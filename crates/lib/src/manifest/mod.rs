//! Build manifests.
//!
//! Manifests are the flat work lists a build executes: plain files to copy,
//! sources to compile and HTML files to rewrite. They are derived fresh from
//! a [`ProjectDescriptor`](crate::descriptor::ProjectDescriptor) on every
//! build and never persisted.

mod build;
mod mask;
mod types;

pub use build::ManifestBuilder;
pub use mask::Mask;
pub use types::*;
