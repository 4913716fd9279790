use std::path::Path;

use serde::{Deserialize, Serialize};

use satlens_image::ImageError;
use satlens_imgproc::{edges::CANNY_SIGMA, parallel::ExecutionStrategy};

use crate::error::PipelineError;

/// Parameters of the analysis pipeline.
///
/// Missing fields take their default value when loaded from JSON.
///
/// # Example
///
/// ```
/// use satlens::PipelineConfig;
///
/// let config: PipelineConfig = serde_json::from_str(r#"{"canny_low": 50.0}"#).unwrap();
/// assert_eq!(config.canny_low, 50.0);
/// assert_eq!(config.canny_high, 200.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Sigma of the gaussian producing the smoothed output.
    pub smooth_sigma: f32,
    /// Low hysteresis threshold of the edge detector.
    pub canny_low: f32,
    /// High hysteresis threshold of the edge detector.
    pub canny_high: f32,
    /// Sigma of the smoothing applied inside the edge detector.
    pub canny_sigma: f32,
    /// How row-parallel stages are scheduled.
    pub strategy: ExecutionStrategy,
    /// Extension of the written files, `png`, `jpg` or `jpeg`.
    pub output_extension: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            smooth_sigma: 2.0,
            canny_low: 100.0,
            canny_high: 200.0,
            canny_sigma: CANNY_SIGMA,
            strategy: ExecutionStrategy::default(),
            output_extension: "png".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("failed to read {}: {e}", path.display()))
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|e| {
            PipelineError::Config(format!("failed to parse {}: {e}", path.display()))
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Check every parameter before any processing happens.
    pub fn validate(&self) -> Result<(), PipelineError> {
        for sigma in [self.smooth_sigma, self.canny_sigma] {
            if !sigma.is_finite() || sigma <= 0.0 {
                return Err(ImageError::InvalidSigma(sigma).into());
            }
        }

        let (low, high) = (self.canny_low, self.canny_high);
        if !low.is_finite() || !high.is_finite() || low < 0.0 || low >= high {
            return Err(ImageError::InvalidThresholds(low, high).into());
        }

        self.strategy
            .validate()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        match self.output_extension.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" => Ok(()),
            ext => Err(PipelineError::Config(format!(
                "unsupported output extension '{ext}'"
            ))),
        }
    }
}
