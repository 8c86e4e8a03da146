//! Image files for captured views and baked lookup tables.

use std::path::{Path, PathBuf};
use std::time::Instant;

use image::{ImageBuffer, Rgba};

use crate::renderer::PixelImage;
use crate::transfer_function::TransferLut;

/// Highest numeric suffix tried when disambiguating file names.
pub const MAX_DISAMBIGUATION_SUFFIX: u32 = 1_000_000;

/// Saves an image file. The format follows the extension (.png, .jpg, .jpeg).
///
/// Bottom-up images are flipped so the file is always top-down.
///
/// # Errors
/// Returns an error if the file cannot be written or format is unsupported.
pub fn save_image(path: &Path, image: &PixelImage) -> Result<(), ScreenshotError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let img = to_image_buffer(image)?;

    match extension.as_str() {
        "png" => {
            img.save_with_format(path, image::ImageFormat::Png)?;
        }
        "jpg" | "jpeg" => {
            // Convert to RGB for JPEG (no alpha)
            let rgb_img = image::DynamicImage::ImageRgba8(img).to_rgb8();
            rgb_img.save_with_format(path, image::ImageFormat::Jpeg)?;
        }
        _ => {
            return Err(ScreenshotError::UnsupportedFormat(extension));
        }
    }

    Ok(())
}

/// Encodes an image as PNG in memory.
pub fn save_to_buffer(image: &PixelImage) -> Result<Vec<u8>, ScreenshotError> {
    let img = to_image_buffer(image)?;

    let mut buffer = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)?;

    Ok(buffer.into_inner())
}

fn to_image_buffer(image: &PixelImage) -> Result<ImageBuffer<Rgba<u8>, Vec<u8>>, ScreenshotError> {
    let top_down = image.clone().into_top_down();
    ImageBuffer::from_raw(top_down.width(), top_down.height(), top_down.into_data())
        .ok_or(ScreenshotError::InvalidImageData)
}

/// Returns a PNG path near `target` that does not exist yet.
///
/// The extension is forced to `.png`. If that file exists, `_0`, `_1`, ... are
/// appended to the stem until a free name is found.
pub fn unique_png_path(target: &Path) -> Result<PathBuf, ScreenshotError> {
    let candidate = target.with_extension("png");
    if !candidate.exists() {
        return Ok(candidate);
    }

    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    (0..MAX_DISAMBIGUATION_SUFFIX)
        .map(|i| target.with_file_name(format!("{stem}_{i}.png")))
        .find(|path| !path.exists())
        .ok_or_else(|| ScreenshotError::DisambiguationExhausted(candidate))
}

/// Writes a PNG at a free path near `target` and returns that path.
pub fn capture_png(image: &PixelImage, target: &Path) -> Result<PathBuf, ScreenshotError> {
    let path = unique_png_path(target)?;

    let start = Instant::now();
    save_image(&path, image)?;

    log::info!(
        "Screenshot {} generated in {}ms",
        path.display(),
        start.elapsed().as_millis()
    );
    Ok(path)
}

/// Writes a lookup table as a one pixel tall RGBA PNG strip.
#[allow(clippy::cast_possible_truncation)]
pub fn save_lut_strip(path: &Path, lut: &TransferLut) -> Result<(), ScreenshotError> {
    let width = lut.len() as u32;
    let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
        ImageBuffer::from_raw(width, 1, lut.to_rgba8_bytes())
            .ok_or(ScreenshotError::InvalidImageData)?;
    img.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

/// Error type for screenshot operations.
#[derive(Debug, thiserror::Error)]
pub enum ScreenshotError {
    #[error("Failed to save image: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid image data")]
    InvalidImageData,

    #[error("No free file name near {}", .0.display())]
    DisambiguationExhausted(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RowOrder;
    use crate::transfer_function::{TransferFunction, TransferFunctionPreset};

    #[test]
    fn test_unique_png_path_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("generation.png");

        let first = unique_png_path(&target).unwrap();
        assert_eq!(first, target);
        std::fs::write(&first, b"").unwrap();

        let second = unique_png_path(&target).unwrap();
        assert_eq!(second, dir.path().join("generation_0.png"));
        std::fs::write(&second, b"").unwrap();

        assert_eq!(
            unique_png_path(&target).unwrap(),
            dir.path().join("generation_1.png")
        );
    }

    #[test]
    fn test_unique_png_path_forces_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = unique_png_path(&dir.path().join("shot.tiff")).unwrap();
        assert_eq!(path, dir.path().join("shot.png"));
    }

    #[test]
    fn test_capture_png_writes_decodable_file() {
        let dir = tempfile::tempdir().unwrap();
        let image = PixelImage::new(
            1,
            2,
            vec![255, 0, 0, 255, 0, 0, 255, 255],
            RowOrder::BottomUp,
        )
        .unwrap();

        let path = capture_png(&image, &dir.path().join("view.png")).unwrap();
        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (1, 2));
        // Bottom-up input: the blue row ends up on top.
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_save_image_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let image = PixelImage::filled(1, 1, [0; 4]);
        let result = save_image(&dir.path().join("view.bmpx"), &image);
        assert!(matches!(result, Err(ScreenshotError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_save_to_buffer_is_png() {
        let image = PixelImage::filled(4, 4, [10, 20, 30, 255]);
        let bytes = save_to_buffer(&image).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_save_lut_strip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tf.png");
        let lut = TransferFunction::from_preset(TransferFunctionPreset::White).bake_lookup_table(16);
        save_lut_strip(&path, &lut).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (16, 1));
        assert_eq!(decoded.get_pixel(15, 0).0, [255, 255, 255, 255]);
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 255, 255, 0]);
    }
}
