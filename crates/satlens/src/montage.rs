use satlens_image::{Image, ImageError, ImageSize};

/// Arrange equally sized tiles in a grid, row by row.
///
/// Cells past the last tile are left black.
///
/// # Arguments
///
/// * `tiles` - The tiles, all with the same size.
/// * `cols` - Number of tiles per grid row.
///
/// # Example
///
/// ```
/// use satlens::image::Image;
/// use satlens::montage::montage;
///
/// let a = Image::<u8, 3>::from_size_val([2, 2].into(), 10).unwrap();
/// let b = Image::<u8, 3>::from_size_val([2, 2].into(), 20).unwrap();
///
/// let grid = montage(&[a, b], 2).unwrap();
/// assert_eq!(grid.width(), 4);
/// assert_eq!(grid.height(), 2);
/// ```
pub fn montage<const C: usize>(
    tiles: &[Image<u8, C>],
    cols: usize,
) -> Result<Image<u8, C>, ImageError> {
    let first = tiles
        .first()
        .ok_or(ImageError::InvalidImageDimensions(0, 0))?;
    let tile_size = first.size();

    if cols == 0 {
        return Err(ImageError::InvalidImageDimensions(0, tile_size.height));
    }

    if let Some(tile) = tiles.iter().find(|t| t.size() != tile_size) {
        return Err(ImageError::InvalidImageSize(
            tile_size.width,
            tile_size.height,
            tile.width(),
            tile.height(),
        ));
    }

    let cols = cols.min(tiles.len());
    let rows = tiles.len().div_ceil(cols);

    let size = ImageSize {
        width: tile_size.width * cols,
        height: tile_size.height * rows,
    };
    let mut grid = Image::<u8, C>::from_size_val(size, 0)?;

    let tile_row_len = tile_size.width * C;
    let grid_row_len = size.width * C;

    for (i, tile) in tiles.iter().enumerate() {
        let (gr, gc) = (i / cols, i % cols);
        for (r, src_row) in tile.as_slice().chunks_exact(tile_row_len).enumerate() {
            let start = (gr * tile_size.height + r) * grid_row_len + gc * tile_row_len;
            grid.as_slice_mut()[start..start + tile_row_len].copy_from_slice(src_row);
        }
    }

    Ok(grid)
}
