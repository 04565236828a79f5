//! JPEG tile compositing: gluing N thumbnails into one grid image.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{GenericImage, RgbImage};

use fw_core::{Error, Result};

/// Inputs for one composed tile.
#[derive(Debug, Clone)]
pub struct TileOptions {
    /// Where the composed JPEG is written.
    pub output_path: PathBuf,
    /// Thumbnails, in display order, row-major.
    pub input_paths: Vec<PathBuf>,
    /// Thumbnails per row.
    pub tile_width: u32,
    /// Maximum rows.
    pub tile_height: u32,
}

/// Compose up to `tile_width * tile_height` thumbnails into a single JPEG
/// of `width * thumb_w` columns and as many rows as needed.
///
/// The first composed tile of a set establishes the per-thumbnail height;
/// later calls pass it as `fixed_thumb_height` so all tiles of a set line
/// up even if an input image is off by a pixel. Returns the composite's
/// pixel height.
pub fn compose_tile(
    options: &TileOptions,
    jpeg_quality: u8,
    width: u32,
    fixed_thumb_height: Option<u32>,
) -> Result<u32> {
    if options.input_paths.is_empty() {
        return Err(Error::Validation("tile has no input thumbnails".into()));
    }

    let first = image::open(&options.input_paths[0])
        .map_err(|e| decode_error(&options.input_paths[0], e))?
        .to_rgb8();

    let thumb_h = fixed_thumb_height.unwrap_or_else(|| first.height());
    let count = options.input_paths.len() as u32;
    let rows = count.div_ceil(options.tile_width);
    let composite_w = width * options.tile_width;
    let composite_h = thumb_h * rows;

    let mut canvas = RgbImage::new(composite_w, composite_h);

    for (index, path) in options.input_paths.iter().enumerate() {
        let thumb = if index == 0 {
            first.clone()
        } else {
            image::open(path)
                .map_err(|e| decode_error(path, e))?
                .to_rgb8()
        };

        // Conform stragglers to the established cell size.
        let thumb = if thumb.width() != width || thumb.height() != thumb_h {
            image::imageops::resize(&thumb, width, thumb_h, FilterType::Triangle)
        } else {
            thumb
        };

        let col = index as u32 % options.tile_width;
        let row = index as u32 / options.tile_width;
        canvas
            .copy_from(&thumb, col * width, row * thumb_h)
            .map_err(|e| Error::Internal(format!("tile copy failed: {e}")))?;
    }

    let file = File::create(&options.output_path)?;
    let mut writer = BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(&mut writer, jpeg_quality);
    canvas
        .write_with_encoder(encoder)
        .map_err(|e| Error::Internal(format!("jpeg encode failed: {e}")))?;

    Ok(composite_h)
}

/// Pixel dimensions of an image on disk, without a full decode.
pub fn image_size(path: &Path) -> Result<(u32, u32)> {
    image::image_dimensions(path).map_err(|e| decode_error(path, e))
}

fn decode_error(path: &Path, e: image::ImageError) -> Error {
    Error::Internal(format!("failed to read image {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_thumb(dir: &Path, name: &str, w: u32, h: u32, shade: u8) -> PathBuf {
        let path = dir.join(name);
        let img = RgbImage::from_pixel(w, h, image::Rgb([shade, shade, shade]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn composes_full_grid() {
        let dir = tempfile::tempdir().unwrap();
        let inputs: Vec<PathBuf> = (0..4)
            .map(|i| write_thumb(dir.path(), &format!("{i:08}.jpg"), 32, 18, i * 40))
            .collect();

        let options = TileOptions {
            output_path: dir.path().join("0.jpg"),
            input_paths: inputs,
            tile_width: 2,
            tile_height: 2,
        };

        let height = compose_tile(&options, 80, 32, None).unwrap();
        assert_eq!(height, 36); // two rows of 18px

        let (w, h) = image_size(&options.output_path).unwrap();
        assert_eq!((w, h), (64, 36));
    }

    #[test]
    fn partial_tile_only_needs_rows_used() {
        let dir = tempfile::tempdir().unwrap();
        // 3 thumbnails on a 2-wide grid: two rows, second half-filled.
        let inputs: Vec<PathBuf> = (0..3)
            .map(|i| write_thumb(dir.path(), &format!("{i:08}.jpg"), 32, 18, 200))
            .collect();

        let options = TileOptions {
            output_path: dir.path().join("0.jpg"),
            input_paths: inputs,
            tile_width: 2,
            tile_height: 5,
        };

        let height = compose_tile(&options, 80, 32, None).unwrap();
        assert_eq!(height, 36);
    }

    #[test]
    fn fixed_height_conforms_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = vec![write_thumb(dir.path(), "a.jpg", 32, 20, 100)];

        let options = TileOptions {
            output_path: dir.path().join("0.jpg"),
            input_paths: inputs,
            tile_width: 1,
            tile_height: 1,
        };

        // A fixed 18px cell overrides the 20px source.
        let height = compose_tile(&options, 80, 32, Some(18)).unwrap();
        assert_eq!(height, 18);
    }

    #[test]
    fn empty_inputs_is_validation_error() {
        let options = TileOptions {
            output_path: PathBuf::from("/tmp/never.jpg"),
            input_paths: Vec::new(),
            tile_width: 2,
            tile_height: 2,
        };
        assert!(matches!(
            compose_tile(&options, 80, 32, None),
            Err(Error::Validation(_))
        ));
    }
}
