use satlens_image::{Image, ImageError};

use crate::parallel::{self, ExecutionStrategy};

/// A separable 2D filter that applies horizontal and vertical 1D convolutions sequentially.
///
/// This struct caches the kernel data and precomputed offsets.
struct SeparableFilter<'a> {
    kernel_x: &'a [f32],
    kernel_y: &'a [f32],
    offsets_x: Vec<isize>,
    offsets_y: Vec<isize>,
}

impl<'a> SeparableFilter<'a> {
    fn new(kernel_x: &'a [f32], kernel_y: &'a [f32]) -> Self {
        let half_x = (kernel_x.len() / 2) as isize;
        let half_y = (kernel_y.len() / 2) as isize;

        Self {
            kernel_x,
            kernel_y,
            offsets_x: (0..kernel_x.len() as isize).map(|i| i - half_x).collect(),
            offsets_y: (0..kernel_y.len() as isize).map(|i| i - half_y).collect(),
        }
    }

    /// Horizontal pass then vertical pass through a temporary buffer.
    ///
    /// Every output sample sums its taps in kernel order, so the result does
    /// not depend on how rows are scheduled.
    fn apply<const C: usize>(
        &self,
        src: &Image<f32, C>,
        dst: &mut Image<f32, C>,
        strategy: ExecutionStrategy,
    ) -> Result<(), ImageError> {
        let rows = src.rows() as isize;
        let cols = src.cols() as isize;
        let row_len = src.cols() * C;

        let src_data = src.as_slice();
        let mut temp = vec![0.0f32; src_data.len()];

        // horizontal
        parallel::for_each_row(strategy, &mut temp, row_len, |r, row_temp| {
            let src_row = &src_data[r * row_len..(r + 1) * row_len];
            for c in 0..cols {
                let mut acc = [0.0f32; C];
                for (&k, &off) in self.kernel_x.iter().zip(self.offsets_x.iter()) {
                    let x = (c + off).clamp(0, cols - 1) as usize;
                    let px = &src_row[x * C..(x + 1) * C];
                    acc.iter_mut().zip(px).for_each(|(a, &v)| *a += v * k);
                }
                row_temp[c as usize * C..(c as usize + 1) * C].copy_from_slice(&acc);
            }
        })?;

        // vertical
        let temp = &temp;
        parallel::for_each_row(strategy, dst.as_slice_mut(), row_len, |r, row_dst| {
            for c in 0..row_len {
                let mut acc = 0.0f32;
                for (&k, &off) in self.kernel_y.iter().zip(self.offsets_y.iter()) {
                    let y = (r as isize + off).clamp(0, rows - 1) as usize;
                    acc += temp[y * row_len + c] * k;
                }
                row_dst[c] = acc;
            }
        })?;

        Ok(())
    }
}

/// Apply a separable filter with clamp-to-edge borders.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_x` - The horizontal kernel, applied first.
/// * `kernel_y` - The vertical kernel.
/// * `strategy` - How rows are scheduled.
///
/// PRECONDITION: `src` and `dst` must have the same shape and the kernels must
/// not be empty.
pub fn separable_filter<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_x: &[f32],
    kernel_y: &[f32],
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

    if kernel_x.is_empty() || kernel_y.is_empty() {
        return Err(ImageError::InvalidChannelShape(0, kernel_x.len().max(kernel_y.len())));
    }

    SeparableFilter::new(kernel_x, kernel_y).apply(src, dst, strategy)
}
