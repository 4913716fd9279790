//! Multi-stage (Canny) edge detection.
//!
//! The detector smooths the input, computes sobel gradients, thins them with
//! non-maximum suppression along the quantized gradient direction, classifies
//! the survivors with a double threshold and keeps the weak responses that are
//! 8-connected to a strong one.

use satlens_image::{Image, ImageError};

use crate::filter::{gaussian_blur, spatial_gradient, GradientField};
use crate::parallel::{self, ExecutionStrategy};

/// Standard deviation of the smoothing applied before the gradient.
pub const CANNY_SIGMA: f32 = 1.0;

/// Value written for edge pixels.
pub const EDGE_VALUE: u8 = 255;

const TAN_22_5_DEG: f32 = 0.414_213_57;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EdgeClass {
    Suppressed,
    Weak,
    Strong,
}

/// Detect edges with the Canny algorithm.
///
/// Uses a gaussian pre-smoothing of [`CANNY_SIGMA`]. The thresholds are
/// expressed in units of the unnormalized sobel magnitude of an image with
/// intensities in `[0, 255]`.
///
/// # Arguments
///
/// * `src` - The input grayscale image.
/// * `dst` - The output edge map, every pixel is either 0 or 255.
/// * `low` - Responses above it are weak edge candidates.
/// * `high` - Responses above it are strong edges.
/// * `strategy` - How rows are scheduled.
///
/// # Errors
///
/// Returns [`ImageError::InvalidThresholds`] unless `0 <= low < high`.
///
/// # Example
///
/// ```
/// use satlens_image::Image;
/// use satlens_imgproc::edges::canny;
/// use satlens_imgproc::parallel::ExecutionStrategy;
///
/// let image = Image::<u8, 1>::from_size_val([16, 16].into(), 90).unwrap();
/// let mut edges = Image::<u8, 1>::from_size_val(image.size(), 0).unwrap();
///
/// canny(&image, &mut edges, 100.0, 200.0, ExecutionStrategy::Serial).unwrap();
/// assert!(edges.as_slice().iter().all(|&v| v == 0));
/// ```
pub fn canny(
    src: &Image<u8, 1>,
    dst: &mut Image<u8, 1>,
    low: f32,
    high: f32,
    strategy: ExecutionStrategy,
) -> Result<(), ImageError> {
    canny_with_sigma(src, dst, low, high, CANNY_SIGMA, strategy)
}

/// Detect edges with the Canny algorithm and a custom pre-smoothing sigma.
///
/// See [`canny`].
pub fn canny_with_sigma(
    src: &Image<u8, 1>,
    dst: &mut Image<u8, 1>,
    low: f32,
    high: f32,
    sigma: f32,
    strategy: ExecutionStrategy,
) -> Result<(), ImageError> {
    if !low.is_finite() || !high.is_finite() || low < 0.0 || low >= high {
        return Err(ImageError::InvalidThresholds(low, high));
    }

    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let src_f32 = src.cast::<f32>()?;

    let mut smoothed = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;
    gaussian_blur(&src_f32, &mut smoothed, sigma, strategy)?;

    let grad = spatial_gradient(&smoothed, strategy)?;
    let mut magnitude = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;
    grad.magnitude(&mut magnitude, strategy)?;

    let classes = classify(&grad, &magnitude, low, high, strategy)?;
    let num_edges = hysteresis(&classes, src.cols(), dst.as_slice_mut());

    log::debug!(
        "canny low={low} high={high} sigma={sigma}: {num_edges} edge pixels on {}",
        src.size()
    );

    Ok(())
}

/// Magnitude at `(row + dr, col + dc)`, zero outside the image.
fn neighbor(mag: &Image<f32, 1>, row: usize, col: usize, dr: isize, dc: isize) -> f32 {
    let r = row as isize + dr;
    let c = col as isize + dc;
    if r < 0 || c < 0 {
        return 0.0;
    }
    mag.get([r as usize, c as usize, 0]).copied().unwrap_or(0.0)
}

/// Unit step `(dr, dc)` along the gradient quantized to 0, 45, 90 or 135 degrees.
fn quantized_direction(gx: f32, gy: f32) -> (isize, isize) {
    let abs_gx = gx.abs();
    let abs_gy = gy.abs();

    if abs_gy <= abs_gx * TAN_22_5_DEG {
        (0, 1)
    } else if abs_gx <= abs_gy * TAN_22_5_DEG {
        (1, 0)
    } else if (gx >= 0.0) == (gy >= 0.0) {
        // y grows downwards
        (1, 1)
    } else {
        (1, -1)
    }
}

/// Non-maximum suppression followed by the double threshold.
fn classify(
    grad: &GradientField,
    magnitude: &Image<f32, 1>,
    low: f32,
    high: f32,
    strategy: ExecutionStrategy,
) -> Result<Vec<EdgeClass>, ImageError> {
    let cols = magnitude.cols();
    let mut classes = vec![EdgeClass::Suppressed; magnitude.as_slice().len()];

    let mag = magnitude.as_slice();
    let gx = grad.gx.as_slice();
    let gy = grad.gy.as_slice();

    parallel::for_each_row(strategy, &mut classes, cols, |r, row| {
        for (c, class) in row.iter_mut().enumerate() {
            let idx = r * cols + c;
            let m = mag[idx];
            if m <= low {
                continue;
            }

            let (dr, dc) = quantized_direction(gx[idx], gy[idx]);
            let prev = neighbor(magnitude, r, c, -dr, -dc);
            let next = neighbor(magnitude, r, c, dr, dc);

            // ties on a plateau go to the first pixel along the direction
            if !(m > prev && m >= next) {
                continue;
            }

            *class = if m > high {
                EdgeClass::Strong
            } else {
                EdgeClass::Weak
            };
        }
    })?;

    Ok(classes)
}

/// Keep strong pixels and the weak pixels 8-connected to them.
///
/// Writes 255 for edges and 0 elsewhere into `out`, returns the number of edge pixels.
fn hysteresis(classes: &[EdgeClass], cols: usize, out: &mut [u8]) -> usize {
    let rows = classes.len() / cols;
    out.iter_mut().for_each(|v| *v = 0);

    let mut stack = classes
        .iter()
        .enumerate()
        .filter(|(_, &class)| class == EdgeClass::Strong)
        .map(|(idx, _)| idx)
        .collect::<Vec<_>>();

    stack.iter().for_each(|&idx| out[idx] = EDGE_VALUE);
    let mut num_edges = stack.len();

    while let Some(idx) = stack.pop() {
        let r = idx / cols;
        let c = idx % cols;

        for nr in r.saturating_sub(1)..=(r + 1).min(rows - 1) {
            for nc in c.saturating_sub(1)..=(c + 1).min(cols - 1) {
                let n = nr * cols + nc;
                if out[n] == 0 && classes[n] == EdgeClass::Weak {
                    out[n] = EDGE_VALUE;
                    num_edges += 1;
                    stack.push(n);
                }
            }
        }
    }

    num_edges
}
