use std::path::Path;

use satlens_image::{Image, ImageSize};

use crate::error::IoError;

/// Reads an RGB8 image from the given file path.
///
/// The method tries to read from any image format supported by the image crate
/// and converts the decoded pixels to 8-bit RGB.
///
/// # Arguments
///
/// * `file_path` - The path to a valid image file.
///
/// # Returns
///
/// An image containing the image data in RGB order.
///
/// # Errors
///
/// * [`IoError::FileDoesNotExist`] when the path does not exist.
/// * [`IoError::FileError`] when the file cannot be opened or mapped.
/// * [`IoError::ImageDecodeError`] when the content is not a decodable raster.
pub fn read_image_any_rgb8(file_path: impl AsRef<Path>) -> Result<Image<u8, 3>, IoError> {
    let file_path = file_path.as_ref().to_owned();

    // verify the file exists
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    let file = std::fs::File::open(&file_path)?;

    // empty files cannot be mapped on every platform
    if file.metadata()?.len() == 0 {
        return decode_image_rgb8(&[]);
    }

    // open the file and map it to memory
    let mmap = unsafe { memmap2::Mmap::map(&file)? };

    let image = decode_image_rgb8(&mmap)?;

    log::info!("read {} from {}", image.size(), file_path.display());

    Ok(image)
}

/// Decodes an encoded raster held in memory into an RGB8 image.
///
/// The format is guessed from the content. Grayscale and alpha inputs are
/// expanded or flattened to three channels.
///
/// # Arguments
///
/// * `bytes` - The encoded image, e.g. a PNG or JPEG payload.
pub fn decode_image_rgb8(bytes: &[u8]) -> Result<Image<u8, 3>, IoError> {
    let img = image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;

    let size = ImageSize {
        width: img.width() as usize,
        height: img.height() as usize,
    };

    Ok(Image::new(size, img.into_rgb8().into_raw())?)
}

fn output_format(file_path: &Path) -> Result<image::ImageFormat, IoError> {
    let ext = file_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => Ok(image::ImageFormat::Png),
        "jpg" | "jpeg" => Ok(image::ImageFormat::Jpeg),
        _ => Err(IoError::UnsupportedImageFormat(format!(
            "extension '{ext}' of {}",
            file_path.display()
        ))),
    }
}

/// Writes an 8-bit image to the given file path.
///
/// The encoder is picked from the extension: `png`, or `jpg`/`jpeg`.
///
/// # Arguments
///
/// * `file_path` - The destination path.
/// * `image` - A grayscale (`C = 1`) or RGB (`C = 3`) image.
pub fn write_image_u8<const C: usize>(
    file_path: impl AsRef<Path>,
    image: &Image<u8, C>,
) -> Result<(), IoError> {
    let file_path = file_path.as_ref();
    let format = output_format(file_path)?;

    let color = match C {
        1 => image::ColorType::L8,
        3 => image::ColorType::Rgb8,
        _ => {
            return Err(IoError::UnsupportedImageFormat(format!(
                "{C} channel images"
            )))
        }
    };

    image::save_buffer_with_format(
        file_path,
        image.as_slice(),
        image.width() as u32,
        image.height() as u32,
        color,
        format,
    )
    .map_err(|e| IoError::ImageEncodeError(e.to_string()))?;

    log::debug!("wrote {} to {}", image.size(), file_path.display());

    Ok(())
}
