/// An error type for the image crate.
///
/// Every variant describes an input that violates the contract of an image
/// operation. These are configuration or programming errors and are never
/// recovered silently.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// Error when the image has a zero width or height.
    #[error("Image size must be positive, got {0}x{1}")]
    InvalidImageDimensions(usize, usize),

    /// Error when channel and shape are not valid.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidChannelShape(usize, usize),

    /// Error when the source and destination images do not have the same size.
    #[error("Image size mismatch: source {0}x{1}, destination {2}x{3}")]
    InvalidImageSize(usize, usize, usize, usize),

    /// Error when a pixel value cannot be cast to the destination type.
    #[error("Failed to cast image data to {0}")]
    CastError(String),

    /// Error when the gaussian sigma is not a finite positive number.
    #[error("Sigma must be finite and greater than zero, got {0}")]
    InvalidSigma(f32),

    /// Error when the hysteresis thresholds are not ordered or not finite.
    #[error("Invalid thresholds: low ({0}) must be non-negative and lower than high ({1})")]
    InvalidThresholds(f32, f32),

    /// Error when a parallel execution strategy cannot be honoured.
    #[error("Parallel execution failed: {0}")]
    ExecutionError(String),

    /// Error when the number of histogram bins is not supported.
    #[error("Invalid number of histogram bins: {0}")]
    InvalidHistogramBins(usize),
}
