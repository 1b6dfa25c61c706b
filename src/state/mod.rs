//! Application state management modules.

mod dataset;

pub use dataset::Dataset;
