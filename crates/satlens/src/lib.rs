#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use satlens_image as image;

#[doc(inline)]
pub use satlens_imgproc as imgproc;

#[doc(inline)]
pub use satlens_io as io;

/// Pipeline configuration.
pub mod config;

/// Error types of the pipeline.
pub mod error;

/// Grid of tiles for visual inspection of the outputs.
pub mod montage;

/// The analysis pipeline and its outputs.
pub mod pipeline;

pub use crate::config::PipelineConfig;
pub use crate::error::PipelineError;
pub use crate::pipeline::{run_pipeline, PipelineOutputs};
