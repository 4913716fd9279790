use std::path::{Path, PathBuf};

use tempfile::TempPath;

use satlens_image::Image;
use satlens_imgproc::{
    color::{gray_from_rgb_u8, rgb_from_gray},
    edges::canny_with_sigma,
    filter::{gaussian_blur, sobel_magnitude},
    histogram::equalize_hist,
    normalize::{normalize_max_to_u8, quantize_unit_to_u8},
    parallel::ExecutionStrategy,
};
use satlens_io::functional::write_image_u8;

use crate::{config::PipelineConfig, error::PipelineError, montage::montage};

/// The rasters derived from one input image.
///
/// Every raster has the size of the input.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutputs {
    /// The input image, RGB.
    pub original: Image<u8, 3>,
    /// Luminance.
    pub gray: Image<u8, 1>,
    /// Histogram equalized luminance.
    pub equalized: Image<u8, 1>,
    /// Binary edge map of the multi-stage detector.
    pub edges_canny: Image<u8, 1>,
    /// Gaussian smoothed equalized luminance.
    pub smoothed: Image<u8, 1>,
    /// Sobel magnitude rescaled so that its maximum is 255.
    pub edges_sobel: Image<u8, 1>,
}

/// Run every stage on an RGB image.
///
/// The luminance is equalized once; the edge detectors and the smoother all
/// read the equalized map. Nothing is written to disk.
///
/// # Arguments
///
/// * `rgb` - The input image.
/// * `config` - The pipeline parameters, validated before any stage runs.
pub fn run_pipeline(
    rgb: &Image<u8, 3>,
    config: &PipelineConfig,
) -> Result<PipelineOutputs, PipelineError> {
    config.validate()?;

    let size = rgb.size();
    let strategy = config.strategy;
    log::debug!("running pipeline on {size} with {config:?}");

    let mut gray = Image::<u8, 1>::from_size_val(size, 0)?;
    gray_from_rgb_u8(rgb, &mut gray, strategy)?;

    let mut equalized_f32 = Image::<f32, 1>::from_size_val(size, 0.0)?;
    equalize_hist(&gray, &mut equalized_f32, strategy)?;
    let mut equalized = Image::<u8, 1>::from_size_val(size, 0)?;
    quantize_unit_to_u8(&equalized_f32, &mut equalized, strategy)?;
    log::debug!("equalized luminance");

    let mut edges_canny = Image::<u8, 1>::from_size_val(size, 0)?;
    canny_with_sigma(
        &equalized,
        &mut edges_canny,
        config.canny_low,
        config.canny_high,
        config.canny_sigma,
        strategy,
    )?;

    let mut smoothed_f32 = Image::<f32, 1>::from_size_val(size, 0.0)?;
    gaussian_blur(&equalized_f32, &mut smoothed_f32, config.smooth_sigma, strategy)?;
    let mut smoothed = Image::<u8, 1>::from_size_val(size, 0)?;
    quantize_unit_to_u8(&smoothed_f32, &mut smoothed, strategy)?;
    log::debug!("smoothed with sigma {}", config.smooth_sigma);

    let mut magnitude = Image::<f32, 1>::from_size_val(size, 0.0)?;
    sobel_magnitude(&equalized_f32, &mut magnitude, strategy)?;
    let mut edges_sobel = Image::<u8, 1>::from_size_val(size, 0)?;
    let max_magnitude = normalize_max_to_u8(&magnitude, &mut edges_sobel, strategy)?;
    log::debug!("sobel magnitude max {max_magnitude}");

    Ok(PipelineOutputs {
        original: rgb.clone(),
        gray,
        equalized,
        edges_canny,
        smoothed,
        edges_sobel,
    })
}

impl PipelineOutputs {
    /// The derived rasters with their file stems, in pipeline order.
    pub fn named_rasters(&self) -> [(&'static str, &Image<u8, 1>); 5] {
        [
            ("gray", &self.gray),
            ("equalized", &self.equalized),
            ("edges_canny", &self.edges_canny),
            ("smoothed", &self.smoothed),
            ("edges_sobel", &self.edges_sobel),
        ]
    }

    /// The original and the five derived rasters in a 2x3 RGB grid.
    pub fn montage(&self, strategy: ExecutionStrategy) -> Result<Image<u8, 3>, PipelineError> {
        let mut tiles = vec![self.original.clone()];
        for (_, raster) in self.named_rasters() {
            let mut tile = Image::<u8, 3>::from_size_val(raster.size(), 0)?;
            rgb_from_gray(raster, &mut tile, strategy)?;
            tiles.push(tile);
        }

        Ok(montage(&tiles, 3)?)
    }

    /// Write the five derived rasters to `output_dir` as `<name>.<extension>`.
    ///
    /// Either every file is replaced or none is. The rasters are first encoded
    /// to temporary files in `output_dir`, then moved into place; files that
    /// were already there are restored if a move fails.
    ///
    /// # Returns
    ///
    /// The written paths, in pipeline order.
    pub fn write_all(
        &self,
        output_dir: impl AsRef<Path>,
        extension: &str,
    ) -> Result<Vec<PathBuf>, PipelineError> {
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir).map_err(|e| output_error(output_dir, e))?;

        // dropping a staged file removes it
        let mut staged = Vec::with_capacity(5);
        for (name, raster) in self.named_rasters() {
            let path = output_dir.join(format!("{name}.{extension}"));
            let tmp = tempfile::Builder::new()
                .prefix(&format!(".{name}-"))
                .suffix(&format!(".{extension}"))
                .tempfile_in(output_dir)
                .map_err(|e| output_error(&path, e))?
                .into_temp_path();

            write_image_u8(&tmp, raster).map_err(|source| PipelineError::OutputWrite {
                path: path.clone(),
                source,
            })?;

            staged.push((tmp, path));
        }

        let mut promoted: Vec<(PathBuf, Option<TempPath>)> = Vec::with_capacity(staged.len());
        for (tmp, path) in staged {
            match promote(tmp, &path, output_dir) {
                Ok(backup) => promoted.push((path, backup)),
                Err(e) => {
                    for (done, backup) in promoted.iter().rev() {
                        restore(done, backup.as_deref());
                    }
                    return Err(output_error(&path, e));
                }
            }
        }

        log::info!("wrote {} outputs to {}", promoted.len(), output_dir.display());

        Ok(promoted.into_iter().map(|(path, _)| path).collect())
    }

    /// Write the montage to `path`.
    pub fn write_montage(
        &self,
        path: impl AsRef<Path>,
        strategy: ExecutionStrategy,
    ) -> Result<(), PipelineError> {
        let path = path.as_ref();
        write_image_u8(path, &self.montage(strategy)?).map_err(|source| {
            PipelineError::OutputWrite {
                path: path.to_path_buf(),
                source,
            }
        })
    }
}

fn output_error(path: &Path, e: std::io::Error) -> PipelineError {
    PipelineError::OutputWrite {
        path: path.to_path_buf(),
        source: e.into(),
    }
}

/// Move `staged` to `path`. A file already at `path` is moved to a backup in
/// `dir`, which is returned.
fn promote(staged: TempPath, path: &Path, dir: &Path) -> std::io::Result<Option<TempPath>> {
    let backup = if path.exists() {
        let backup = tempfile::Builder::new()
            .prefix(".backup-")
            .tempfile_in(dir)?
            .into_temp_path();
        std::fs::rename(path, &backup)?;
        Some(backup)
    } else {
        None
    };

    if let Err(e) = staged.persist(path) {
        if backup.is_some() {
            restore(path, backup.as_deref());
        }
        return Err(e.error);
    }

    Ok(backup)
}

/// Undo a promotion: put the backup back, or remove the new file.
fn restore(path: &Path, backup: Option<&Path>) {
    let res = match backup {
        Some(backup) => std::fs::rename(backup, path),
        None => std::fs::remove_file(path),
    };
    if let Err(e) = res {
        log::warn!("failed to restore {}: {e}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satlens_image::ImageSize;

    fn checkerboard(size: ImageSize) -> Image<u8, 3> {
        let data = (0..size.num_pixels())
            .flat_map(|i| {
                let (r, c) = (i / size.width, i % size.width);
                let v = if (r / 6 + c / 6) % 2 == 0 { 30 } else { 220 };
                [v, v / 2, 255 - v]
            })
            .collect();
        Image::new(size, data).unwrap()
    }

    #[test]
    fn test_run_pipeline_shapes() -> Result<(), PipelineError> {
        let size = ImageSize {
            width: 24,
            height: 18,
        };
        let outputs = run_pipeline(&checkerboard(size), &PipelineConfig::default())?;

        for (_, raster) in outputs.named_rasters() {
            assert_eq!(raster.size(), size);
        }
        assert!(outputs
            .edges_canny
            .as_slice()
            .iter()
            .all(|&v| v == 0 || v == 255));
        assert!(outputs.edges_canny.as_slice().contains(&255));
        assert_eq!(outputs.edges_sobel.as_slice().iter().max(), Some(&255));

        Ok(())
    }

    #[test]
    fn test_run_pipeline_constant_image() -> Result<(), PipelineError> {
        let image = Image::<u8, 3>::from_size_val([10, 10].into(), 77)?;
        let outputs = run_pipeline(&image, &PipelineConfig::default())?;

        assert!(outputs.gray.as_slice().iter().all(|&v| v == 77));
        // identity equalization
        assert!(outputs.equalized.as_slice().iter().all(|&v| v == 77));
        assert!(outputs.edges_canny.as_slice().iter().all(|&v| v == 0));
        assert!(outputs.edges_sobel.as_slice().iter().all(|&v| v == 0));

        Ok(())
    }

    #[test]
    fn test_run_pipeline_rejects_config() -> Result<(), PipelineError> {
        let image = Image::<u8, 3>::from_size_val([4, 4].into(), 0)?;
        let config = PipelineConfig {
            canny_low: 300.0,
            ..Default::default()
        };

        assert!(matches!(
            run_pipeline(&image, &config),
            Err(PipelineError::Image(_))
        ));

        Ok(())
    }

    #[test]
    fn test_run_pipeline_huge_sigma() -> Result<(), PipelineError> {
        let config = PipelineConfig {
            smooth_sigma: 1e30,
            canny_sigma: 1e30,
            ..Default::default()
        };
        let outputs = run_pipeline(&checkerboard([9, 7].into()), &config)?;

        assert_eq!(outputs.smoothed.size(), [9, 7].into());
        assert!(outputs
            .edges_canny
            .as_slice()
            .iter()
            .all(|&v| v == 0 || v == 255));

        Ok(())
    }

    #[test]
    fn test_run_pipeline_strategies_agree() -> Result<(), PipelineError> {
        let image = checkerboard([23, 19].into());
        let run = |strategy| {
            let config = PipelineConfig {
                strategy,
                ..Default::default()
            };
            run_pipeline(&image, &config)
        };

        let serial = run(ExecutionStrategy::Serial)?;
        assert_eq!(serial, run(ExecutionStrategy::Fixed(2))?);
        assert_eq!(serial, run(ExecutionStrategy::ParallelRows)?);

        Ok(())
    }

    #[test]
    fn test_montage_grid() -> Result<(), PipelineError> {
        let size = ImageSize {
            width: 12,
            height: 8,
        };
        let outputs = run_pipeline(&checkerboard(size), &PipelineConfig::default())?;
        let grid = outputs.montage(ExecutionStrategy::Serial)?;

        assert_eq!(grid.width(), 36);
        assert_eq!(grid.height(), 16);
        assert_eq!(grid.get([0, 0, 0]), outputs.original.get([0, 0, 0]));
        // second tile is the luminance
        let gray = *outputs.gray.get([0, 0, 0]).unwrap_or(&0);
        assert_eq!(grid.get([0, 12, 1]), Some(&gray));

        Ok(())
    }
}
