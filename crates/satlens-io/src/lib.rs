#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for I/O operations.
///
/// Defines [`IoError`] variants for file access and encoding/decoding failures.
pub mod error;

/// High-level image reading and writing functions.
///
/// See [`functional::read_image_any_rgb8`] for automatic format detection.
pub mod functional;

/// Acquisition of imagery tiles from a remote processing service.
///
/// The exchange is an OAuth2 client-credentials token request followed by a
/// single authenticated process request. See [`remote::ProcessClient`].
pub mod remote;

pub use crate::error::IoError;
