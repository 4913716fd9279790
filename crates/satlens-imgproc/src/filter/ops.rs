use satlens_image::{Image, ImageError};

use super::{kernels, separable_filter};
use crate::parallel::{self, ExecutionStrategy};

/// Blur an image using a gaussian blur filter.
///
/// The kernel radius is `ceil(3 * sigma)` with a minimum of 1, capped at the
/// larger image dimension. The kernel is normalized so that constant regions
/// keep their value.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `sigma` - The standard deviation of the gaussian, finite and strictly positive.
/// * `strategy` - How rows are scheduled.
///
/// # Errors
///
/// Returns [`ImageError::InvalidSigma`] for a non-positive or non-finite sigma.
pub fn gaussian_blur<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    sigma: f32,
    strategy: ExecutionStrategy,
) -> Result<(), ImageError> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(ImageError::InvalidSigma(sigma));
    }

    let max_radius = src.cols().max(src.rows());
    let kernel_size = 2 * kernels::gaussian_kernel_radius(sigma, max_radius) + 1;
    let kernel = kernels::gaussian_kernel_1d(kernel_size, sigma);

    log::debug!("gaussian blur sigma={sigma} kernel_size={kernel_size}");

    separable_filter(src, dst, &kernel, &kernel, strategy)
}

/// Horizontal and vertical derivatives of a single channel image.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientField {
    /// Derivative along x, positive when intensity increases to the right.
    pub gx: Image<f32, 1>,
    /// Derivative along y, positive when intensity increases downwards.
    pub gy: Image<f32, 1>,
}

impl GradientField {
    /// Euclidean norm of the gradient into `dst`.
    pub fn magnitude(
        &self,
        dst: &mut Image<f32, 1>,
        strategy: ExecutionStrategy,
    ) -> Result<(), ImageError> {
        if self.gx.size() != dst.size() {
            return Err(ImageError::InvalidImageSize(
                self.gx.cols(),
                self.gx.rows(),
                dst.cols(),
                dst.rows(),
            ));
        }

        let row_len = dst.cols();
        let gx = self.gx.as_slice();
        let gy = self.gy.as_slice();
        parallel::for_each_row(strategy, dst.as_slice_mut(), row_len, |r, row| {
            let range = r * row_len..(r + 1) * row_len;
            row.iter_mut()
                .zip(gx[range.clone()].iter().zip(gy[range].iter()))
                .for_each(|(m, (&dx, &dy))| *m = dx.hypot(dy));
        })?;

        Ok(())
    }
}

/// Compute the first order image derivatives with the 3x3 sobel operator.
///
/// Borders are clamped to the edge, so a flat image has a zero gradient everywhere.
///
/// # Arguments
///
/// * `src` - The source grayscale image.
/// * `strategy` - How rows are scheduled.
pub fn spatial_gradient(
    src: &Image<f32, 1>,
    strategy: ExecutionStrategy,
) -> Result<GradientField, ImageError> {
    let (derivative, smoothing) = kernels::sobel_kernel_1d();

    let mut gx = Image::from_size_val(src.size(), 0.0)?;
    separable_filter(src, &mut gx, &derivative, &smoothing, strategy)?;

    let mut gy = Image::from_size_val(src.size(), 0.0)?;
    separable_filter(src, &mut gy, &smoothing, &derivative, strategy)?;

    Ok(GradientField { gx, gy })
}

/// Compute the sobel gradient magnitude `sqrt(gx^2 + gy^2)` of an image.
///
/// The result is not normalized; see [`crate::normalize::normalize_max_to_u8`]
/// to store it.
pub fn sobel_magnitude(
    src: &Image<f32, 1>,
    dst: &mut Image<f32, 1>,
    strategy: ExecutionStrategy,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    spatial_gradient(src, strategy)?.magnitude(dst, strategy)
}
