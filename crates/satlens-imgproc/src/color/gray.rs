use crate::parallel::{self, ExecutionStrategy};
use satlens_image::{Image, ImageError};

/// Luma weights of R, G and B in 14-bit fixed point. They sum to 16384.
const RW_Q14: u32 = 4899;
const GW_Q14: u32 = 9617;
const BW_Q14: u32 = 1868;
const Q14_SHIFT: u32 = 14;
const Q14_HALF: u32 = 1 << (Q14_SHIFT - 1);

/// Convert an RGB8 image to grayscale using 14-bit fixed-point weights:
///
/// Y = (4899 * R + 9617 * G + 1868 * B + 2^13) >> 14
///
/// The result is rounded to the nearest integer, so it always lies between
/// the smallest and the largest channel value of the pixel.
///
/// # Arguments
///
/// * `src` - The input RGB8 image.
/// * `dst` - The output grayscale image.
/// * `strategy` - How rows are scheduled.
///
/// Precondition: the input and output images must have the same size.
///
/// # Example
///
/// ```
/// use satlens_image::Image;
/// use satlens_imgproc::color::gray_from_rgb_u8;
/// use satlens_imgproc::parallel::ExecutionStrategy;
///
/// let image = Image::<u8, 3>::new([2, 1].into(), vec![255, 0, 0, 0, 0, 255]).unwrap();
/// let mut gray = Image::<u8, 1>::from_size_val(image.size(), 0).unwrap();
///
/// gray_from_rgb_u8(&image, &mut gray, ExecutionStrategy::Serial).unwrap();
/// assert_eq!(gray.as_slice(), &[76, 29]);
/// ```
pub fn gray_from_rgb_u8(
    src: &Image<u8, 3>,
    dst: &mut Image<u8, 1>,
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

    parallel::par_iter_rows(src, dst, strategy, |src_pixel, dst_pixel| {
        let r = src_pixel[0] as u32;
        let g = src_pixel[1] as u32;
        let b = src_pixel[2] as u32;
        dst_pixel[0] = ((r * RW_Q14 + g * GW_Q14 + b * BW_Q14 + Q14_HALF) >> Q14_SHIFT) as u8;
    })?;

    Ok(())
}

/// Convert a grayscale image to an RGB image by replicating the grayscale value across all three channels.
///
/// # Arguments
///
/// * `src` - The input grayscale image.
/// * `dst` - The output RGB image.
/// * `strategy` - How rows are scheduled.
///
/// Precondition: the input and output images must have the same size.
pub fn rgb_from_gray<T>(
    src: &Image<T, 1>,
    dst: &mut Image<T, 3>,
    strategy: ExecutionStrategy,
) -> Result<(), ImageError>
where
    T: Copy + Send + Sync,
{
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    parallel::par_iter_rows(src, dst, strategy, |src_pixel, dst_pixel| {
        dst_pixel[0] = src_pixel[0];
        dst_pixel[1] = src_pixel[0];
        dst_pixel[2] = src_pixel[0];
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::parallel::ExecutionStrategy;
    use rand::Rng;
    use satlens_image::{Image, ImageError, ImageSize};

    #[test]
    fn rgb_from_grayscale() -> Result<(), Box<dyn std::error::Error>> {
        let image = Image::new(
            ImageSize {
                width: 2,
                height: 3,
            },
            vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
        )?;

        let mut rgb = Image::<f32, 3>::from_size_val(image.size(), 0.0)?;

        super::rgb_from_gray(&image, &mut rgb, ExecutionStrategy::Serial)?;

        #[rustfmt::skip]
        let expected = [
            0.0, 0.0, 0.0,
            1.0, 1.0, 1.0,
            2.0, 2.0, 2.0,
            3.0, 3.0, 3.0,
            4.0, 4.0, 4.0,
            5.0, 5.0, 5.0,
        ];

        assert_eq!(rgb.as_slice(), &expected);

        Ok(())
    }

    #[test]
    fn gray_from_rgb_u8() -> Result<(), Box<dyn std::error::Error>> {
        let image = Image::new(
            ImageSize {
                width: 1,
                height: 2,
            },
            vec![0, 128, 255, 128, 0, 128],
        )?;

        let mut gray = Image::<u8, 1>::from_size_val(image.size(), 0)?;

        super::gray_from_rgb_u8(&image, &mut gray, ExecutionStrategy::Serial)?;

        assert_eq!(gray.as_slice(), &[104, 53]);

        Ok(())
    }

    #[test]
    fn gray_from_rgb_u8_within_channel_range() -> Result<(), Box<dyn std::error::Error>> {
        let mut rng = rand::rng();
        let size = ImageSize {
            width: 17,
            height: 9,
        };
        let data = (0..size.num_pixels() * 3)
            .map(|_| rng.random::<u8>())
            .collect::<Vec<_>>();
        let image = Image::<u8, 3>::new(size, data)?;

        let mut gray = Image::<u8, 1>::from_size_val(size, 0)?;
        super::gray_from_rgb_u8(&image, &mut gray, ExecutionStrategy::Serial)?;

        assert_eq!(gray.num_channels(), 1);
        for (px, y) in image.as_slice().chunks_exact(3).zip(gray.as_slice()) {
            let lo = *px.iter().min().unwrap();
            let hi = *px.iter().max().unwrap();
            assert!(lo <= *y && *y <= hi, "{y} not within [{lo}, {hi}]");
        }

        let white = Image::<u8, 3>::from_size_val(size, 255)?;
        super::gray_from_rgb_u8(&white, &mut gray, ExecutionStrategy::ParallelRows)?;
        assert!(gray.as_slice().iter().all(|&v| v == 255));

        Ok(())
    }

    #[test]
    fn gray_from_rgb_u8_size_mismatch() -> Result<(), ImageError> {
        let image = Image::<u8, 3>::from_size_val([2, 2].into(), 0)?;
        let mut gray = Image::<u8, 1>::from_size_val([2, 3].into(), 0)?;
        assert_eq!(
            super::gray_from_rgb_u8(&image, &mut gray, ExecutionStrategy::Serial),
            Err(ImageError::InvalidImageSize(2, 2, 2, 3))
        );
        Ok(())
    }

    #[test]
    fn gray_from_rgb_u8_strategies_agree() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 37,
            height: 23,
        };
        let data = (0..size.num_pixels() * 3)
            .map(|i| (i * 31 % 251) as u8)
            .collect::<Vec<_>>();
        let image = Image::<u8, 3>::new(size, data)?;

        let run = |strategy| -> Result<Image<u8, 1>, ImageError> {
            let mut gray = Image::<u8, 1>::from_size_val(size, 0)?;
            super::gray_from_rgb_u8(&image, &mut gray, strategy)?;
            Ok(gray)
        };

        let serial = run(ExecutionStrategy::Serial)?;
        assert_eq!(serial, run(ExecutionStrategy::ParallelRows)?);
        assert_eq!(serial, run(ExecutionStrategy::Fixed(3))?);

        assert!(matches!(
            run(ExecutionStrategy::Fixed(0)),
            Err(ImageError::ExecutionError(_))
        ));

        Ok(())
    }
}
