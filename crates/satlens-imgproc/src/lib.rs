#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// color transformations module.
pub mod color;

/// multi-stage edge detection module.
pub mod edges;

/// image filtering module.
pub mod filter;

/// compute image histogram and equalization module.
pub mod histogram;

/// operations to rescale images for storage.
pub mod normalize;

/// module containing parallelization utilities.
pub mod parallel;
