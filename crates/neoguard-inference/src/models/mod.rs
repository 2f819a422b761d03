//! Classifier backends

pub mod gbtree;
#[cfg(feature = "linear-models")]
pub mod linear;

pub use gbtree::GradientBoostedTrees;
#[cfg(feature = "linear-models")]
pub use linear::LinearSoftmax;
