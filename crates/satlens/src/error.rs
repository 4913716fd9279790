use std::path::PathBuf;

use satlens_image::ImageError;
use satlens_io::{remote::RemoteError, IoError};

/// An error type for the pipeline.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// A processing stage rejected its input or parameters.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// The input image could not be read or decoded.
    #[error(transparent)]
    Io(#[from] IoError),

    /// The remote acquisition failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// An output file could not be written. No output is left behind.
    #[error("Failed to write output {path}: {source}")]
    OutputWrite {
        /// The output that failed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: IoError,
    },

    /// The configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),
}
