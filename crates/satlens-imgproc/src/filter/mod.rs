//! Filter operations
//!
//! Separable convolutions with clamp-to-edge borders: samples outside the
//! image take the value of the nearest edge pixel in every pass.

/// Filter kernels
pub mod kernels;

/// Filter operations
mod ops;
pub use ops::*;

/// Separable filter operations
mod separable_filter;
pub use separable_filter::*;
