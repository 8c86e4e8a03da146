//! Interface to the volume renderer and capture service.
//!
//! Rendering itself is provided by the host application. A renderer receives
//! borrowed views of the field and lookup table for exactly one draw and
//! returns an owned pixel buffer.

use std::path::{Path, PathBuf};

use volsynth_core::{BoundingBox, DensityField};

use crate::camera::CameraFrame;
use crate::error::{RenderError, RenderResult};
use crate::screenshot;
use crate::transfer_function::TransferLut;

/// Row order of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowOrder {
    /// First row is the top of the image.
    #[default]
    TopDown,
    /// First row is the bottom of the image (OpenGL readback order).
    BottomUp,
}

/// An owned RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
    row_order: RowOrder,
}

impl PixelImage {
    /// Wraps an RGBA buffer of `width * height * 4` bytes.
    pub fn new(width: u32, height: u32, data: Vec<u8>, row_order: RowOrder) -> RenderResult<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(RenderError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
            row_order,
        })
    }

    /// Creates an image filled with one color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba.repeat(width as usize * height as usize);
        Self {
            width,
            height,
            data,
            row_order: RowOrder::TopDown,
        }
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes in [`Self::row_order`].
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Row order of the buffer.
    pub fn row_order(&self) -> RowOrder {
        self.row_order
    }

    /// Reverses the row order in place.
    pub fn flip_vertical(&mut self) {
        let stride = self.width as usize * 4;
        let height = self.height as usize;
        for row in 0..height / 2 {
            let (top, bottom) = self.data.split_at_mut((height - row - 1) * stride);
            top[row * stride..(row + 1) * stride].swap_with_slice(&mut bottom[..stride]);
        }
        self.row_order = match self.row_order {
            RowOrder::TopDown => RowOrder::BottomUp,
            RowOrder::BottomUp => RowOrder::TopDown,
        };
    }

    /// Returns the image with rows ordered top-down.
    #[must_use]
    pub fn into_top_down(mut self) -> Self {
        if self.row_order == RowOrder::BottomUp {
            self.flip_vertical();
        }
        self
    }

    /// Consumes the image and returns its bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Everything a renderer needs to draw one view.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    /// Scalar volume.
    pub field: &'a DensityField,
    /// Baked transfer function.
    pub lut: &'a TransferLut,
    /// World placement of the volume.
    pub bounds: BoundingBox,
    /// Camera of this view.
    pub camera: &'a CameraFrame,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
}

/// A volume renderer with capture support.
///
/// Calls are serial: a capture always follows the render it saves, and the
/// next view is only requested after the capture returned.
pub trait VolumeRenderer {
    /// Renders one view and reads back its pixels.
    fn render(&mut self, request: &RenderRequest<'_>) -> RenderResult<PixelImage>;

    /// Saves an image near `target` and returns the path actually written.
    ///
    /// The default writes a PNG, appending a numeric suffix when `target`
    /// already exists.
    fn capture(&mut self, image: &PixelImage, target: &Path) -> RenderResult<PathBuf> {
        Ok(screenshot::capture_png(image, target)?)
    }

    /// Returns the output gamma.
    fn gamma(&self) -> f32;

    /// Sets the output gamma.
    fn set_gamma(&mut self, gamma: f32);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_row_image() -> PixelImage {
        let data = vec![1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4];
        PixelImage::new(2, 2, data, RowOrder::BottomUp).unwrap()
    }

    #[test]
    fn test_pixel_image_size_check() {
        let result = PixelImage::new(2, 2, vec![0; 15], RowOrder::TopDown);
        assert!(matches!(
            result,
            Err(RenderError::SizeMismatch {
                expected: 16,
                actual: 15
            })
        ));
    }

    #[test]
    fn test_flip_vertical() {
        let image = two_row_image().into_top_down();
        assert_eq!(image.row_order(), RowOrder::TopDown);
        assert_eq!(
            image.data(),
            &[3, 3, 3, 3, 4, 4, 4, 4, 1, 1, 1, 1, 2, 2, 2, 2]
        );
    }

    #[test]
    fn test_flip_odd_height_keeps_middle_row() {
        let data = (0u8..3).flat_map(|row| [row; 4]).collect();
        let mut image = PixelImage::new(1, 3, data, RowOrder::TopDown).unwrap();
        image.flip_vertical();
        assert_eq!(image.data(), &[2, 2, 2, 2, 1, 1, 1, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_filled() {
        let image = PixelImage::filled(3, 2, [9, 8, 7, 6]);
        assert_eq!(image.data().len(), 24);
        assert_eq!(&image.data()[20..], &[9, 8, 7, 6]);
    }
}
