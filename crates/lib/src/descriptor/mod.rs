//! Build descriptors.
//!
//! A descriptor is the JSON file (`build.json` or `build_all.json`) that
//! declares what a build does. Loading validates it into a typed
//! [`Descriptor`]: either a single project or a batch of other targets.

mod load;
mod types;

pub use load::*;
pub use types::*;
