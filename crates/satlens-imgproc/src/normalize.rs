use satlens_image::{Image, ImageError};

use crate::parallel::{self, ExecutionStrategy};

/// Find the minimum and maximum values in an image.
///
/// # Arguments
///
/// * `image` - The input image.
///
/// # Returns
///
/// A tuple containing the minimum and maximum values in the image.
///
/// # Example
///
/// ```
/// use satlens_image::{Image, ImageSize};
/// use satlens_imgproc::normalize::find_min_max;
///
/// let image = Image::<u8, 3>::new(
///   ImageSize {
///     width: 2,
///     height: 2,
///   },
///   vec![0u8, 1, 0, 1, 2, 3, 0, 1, 0, 1, 2, 3],
/// )
/// .unwrap();
///
/// let (min, max) = find_min_max(&image);
/// assert_eq!(min, 0);
/// assert_eq!(max, 3);
/// ```
pub fn find_min_max<T, const C: usize>(image: &Image<T, C>) -> (T, T)
where
    T: Copy + PartialOrd,
{
    // images are never empty
    let first = image.as_slice()[0];

    image
        .as_slice()
        .iter()
        .fold((first, first), |(min, max), &x| {
            let min = if x < min { x } else { min };
            let max = if x > max { x } else { max };
            (min, max)
        })
}

fn check_size<const C: usize>(
    src: &Image<f32, C>,
    dst: &Image<u8, C>,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }
    Ok(())
}

/// Quantize an image with values in `[0, 1]` to 8 bits.
///
/// Each sample becomes `round(x * 255)` clamped to `[0, 255]`; rounding avoids
/// the downward bias of truncation.
///
/// # Arguments
///
/// * `src` - The input image with values in `[0, 1]`.
/// * `dst` - The output 8-bit image.
/// * `strategy` - How rows are scheduled.
pub fn quantize_unit_to_u8<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<u8, C>,
    strategy: ExecutionStrategy,
) -> Result<(), ImageError> {
    check_size(src, dst)?;

    let row_len = src.cols() * C;
    let src_data = src.as_slice();
    parallel::for_each_row(strategy, dst.as_slice_mut(), row_len, |r, row| {
        let src_row = &src_data[r * row_len..(r + 1) * row_len];
        row.iter_mut()
            .zip(src_row.iter())
            .for_each(|(out, &x)| *out = (x * 255.0).round().clamp(0.0, 255.0) as u8);
    })?;

    Ok(())
}

/// Rescale a non-negative image so that its maximum maps to 255.
///
/// Each sample becomes `round(x * 255 / max)`. When the maximum is zero, as for
/// the gradient of a flat image, the output is all zeros instead of a division
/// by zero, and a warning is logged.
///
/// # Arguments
///
/// * `src` - The input image, e.g. a gradient magnitude.
/// * `dst` - The output 8-bit image.
/// * `strategy` - How rows are scheduled.
///
/// # Returns
///
/// The maximum value found in the source image.
pub fn normalize_max_to_u8<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<u8, C>,
    strategy: ExecutionStrategy,
) -> Result<f32, ImageError> {
    check_size(src, dst)?;

    let (_, max_val) = find_min_max(src);

    if !(max_val > 0.0) {
        log::warn!(
            "degenerate input: maximum value is {max_val}, normalized output is all zeros"
        );
        dst.as_slice_mut().iter_mut().for_each(|v| *v = 0);
        return Ok(max_val);
    }

    let scale = 255.0 / max_val;
    let row_len = src.cols() * C;
    let src_data = src.as_slice();
    parallel::for_each_row(strategy, dst.as_slice_mut(), row_len, |r, row| {
        let src_row = &src_data[r * row_len..(r + 1) * row_len];
        row.iter_mut()
            .zip(src_row.iter())
            .for_each(|(out, &x)| *out = (x * scale).round().clamp(0.0, 255.0) as u8);
    })?;

    Ok(max_val)
}
