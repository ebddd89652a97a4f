//! yabs-lib: Core types and logic for yabs
//!
//! This crate provides everything behind the `yabs` command:
//! - `descriptor`: project and batch build descriptors
//! - `manifest`: the concrete file lists derived from a project descriptor
//! - `pipeline`: glue, preprocess, compile and finalize for script sources
//! - `html`: `<script src>` rewriting for HTML pages
//! - `build` / `batch`: single-project and batch orchestration

pub mod batch;
pub mod build;
pub mod consts;
pub mod descriptor;
pub mod events;
pub mod header;
pub mod html;
pub mod manifest;
pub mod pipeline;
pub mod staleness;
pub mod toolchain;
pub mod util;
