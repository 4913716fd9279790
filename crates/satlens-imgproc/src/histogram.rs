use rayon::prelude::*;
use satlens_image::{Image, ImageError};

use crate::parallel::{self, ExecutionStrategy};

/// Number of intensity levels of an 8-bit image.
pub const NUM_LEVELS: usize = 256;

const CHUNK_LEN: usize = 4096;

/// Compute the pixel intensity histogram of an image.
///
/// NOTE: this is limited to 8-bit 1-channel images.
///
/// # Arguments
///
/// * `src` - The input image to compute the histogram.
/// * `hist` - The output histogram, counts are accumulated into it.
/// * `num_bins` - The number of bins to use for the histogram.
/// * `strategy` - How the pixels are scheduled.
///
/// # Errors
///
/// Returns an error if the number of bins is invalid.
///
/// # Example
///
/// ```
/// use satlens_image::{Image, ImageSize};
/// use satlens_imgproc::histogram::compute_histogram;
/// use satlens_imgproc::parallel::ExecutionStrategy;
///
/// let image = Image::<u8, 1>::new(
///   ImageSize {
///     width: 3,
///     height: 3,
///   },
///   vec![0, 2, 4, 128, 130, 132, 254, 255, 255],
/// ).unwrap();
///
/// let mut histogram = vec![0; 3];
///
/// compute_histogram(&image, &mut histogram, 3, ExecutionStrategy::Serial).unwrap();
/// assert_eq!(histogram, vec![3, 3, 3]);
/// ```
pub fn compute_histogram(
    src: &Image<u8, 1>,
    hist: &mut [usize],
    num_bins: usize,
    strategy: ExecutionStrategy,
) -> Result<(), ImageError> {
    if num_bins == 0 || num_bins > NUM_LEVELS {
        return Err(ImageError::InvalidHistogramBins(num_bins));
    }

    if hist.len() != num_bins {
        return Err(ImageError::InvalidHistogramBins(num_bins));
    }

    let mut bin_lut = [0usize; NUM_LEVELS];
    for (i, bin) in bin_lut.iter_mut().enumerate() {
        *bin = (i * num_bins) >> 8;
    }

    let count_chunk = |mut local: Vec<usize>, chunk: &[u8]| {
        for &px in chunk {
            local[bin_lut[px as usize]] += 1;
        }
        local
    };

    // integer counts, so the reduction order does not change the result
    let counts = match strategy {
        ExecutionStrategy::Serial => src
            .as_slice()
            .chunks(CHUNK_LEN)
            .fold(vec![0usize; num_bins], count_chunk),
        _ => parallel::install(strategy, || {
            src.as_slice()
                .par_chunks(CHUNK_LEN)
                .fold(|| vec![0usize; num_bins], count_chunk)
                .reduce(
                    || vec![0usize; num_bins],
                    |mut a, b| {
                        a.iter_mut().zip(b.iter()).for_each(|(x, y)| *x += y);
                        a
                    },
                )
        })?,
    };

    hist.iter_mut()
        .zip(counts.iter())
        .for_each(|(h, c)| *h += c);

    Ok(())
}

/// Lookup table mapping each 8-bit intensity to its equalized value in `[0, 1]`.
///
/// The table is non-decreasing; it is built for one image and dropped after use.
#[derive(Debug, Clone, PartialEq)]
pub struct EqualizationMapping {
    lut: [f32; NUM_LEVELS],
    degenerate: bool,
}

impl EqualizationMapping {
    /// Build the mapping from a 256-bin histogram.
    ///
    /// Each level maps to the fraction of pixels at or below it, `cdf[v] / N`.
    /// When at most one level is populated the cumulative distribution carries
    /// no contrast information and the identity mapping `v / 255` is used.
    pub fn from_histogram(hist: &[usize]) -> Result<Self, ImageError> {
        if hist.len() != NUM_LEVELS {
            return Err(ImageError::InvalidHistogramBins(hist.len()));
        }

        let total: usize = hist.iter().sum();
        let occupied = hist.iter().filter(|&&c| c > 0).count();

        let mut lut = [0f32; NUM_LEVELS];

        if total == 0 || occupied <= 1 {
            lut.iter_mut()
                .enumerate()
                .for_each(|(v, out)| *out = v as f32 / (NUM_LEVELS - 1) as f32);
            return Ok(Self {
                lut,
                degenerate: true,
            });
        }

        let mut cdf = 0usize;
        for (out, &count) in lut.iter_mut().zip(hist.iter()) {
            cdf += count;
            *out = (cdf as f64 / total as f64) as f32;
        }

        Ok(Self {
            lut,
            degenerate: false,
        })
    }

    /// Whether the identity fallback was used for a flat histogram.
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    /// The equalized value of an intensity level.
    pub fn map(&self, value: u8) -> f32 {
        self.lut[value as usize]
    }

    /// The full lookup table.
    pub fn as_slice(&self) -> &[f32] {
        &self.lut
    }
}

/// Equalize the histogram of a grayscale image.
///
/// The output values are normalized to `[0, 1]`. A constant image is mapped
/// through the identity `v / 255` and a warning is logged.
///
/// # Arguments
///
/// * `src` - The input 8-bit grayscale image.
/// * `dst` - The output image with the equalized values.
/// * `strategy` - How rows are scheduled.
///
/// Precondition: the input and output images must have the same size.
///
/// # Example
///
/// ```
/// use satlens_image::Image;
/// use satlens_imgproc::histogram::equalize_hist;
/// use satlens_imgproc::parallel::ExecutionStrategy;
///
/// let image = Image::<u8, 1>::new([2, 2].into(), vec![10, 10, 200, 250]).unwrap();
/// let mut equalized = Image::<f32, 1>::from_size_val(image.size(), 0.0).unwrap();
///
/// equalize_hist(&image, &mut equalized, ExecutionStrategy::Serial).unwrap();
/// assert_eq!(equalized.as_slice(), &[0.5, 0.5, 0.75, 1.0]);
/// ```
pub fn equalize_hist(
    src: &Image<u8, 1>,
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

    let mut hist = vec![0usize; NUM_LEVELS];
    compute_histogram(src, &mut hist, NUM_LEVELS, strategy)?;

    let mapping = EqualizationMapping::from_histogram(&hist)?;
    if mapping.is_degenerate() {
        log::warn!(
            "degenerate input: constant {} image, equalization falls back to identity",
            src.size()
        );
    }

    parallel::par_iter_rows_val(src, dst, strategy, |&v, out| {
        *out = mapping.map(v);
    })?;

    Ok(())
}
