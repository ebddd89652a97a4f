//! Shared utilities.
//!
//! Common utilities used across the crate including path handling and test helpers.

pub mod path;

#[cfg(test)]
pub mod testutil;
