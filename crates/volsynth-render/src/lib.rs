//! Rendering side of volsynth.
//!
//! This crate provides everything between a density field and a saved image:
//! - Transfer functions and their baked lookup tables
//! - View framing and camera poses in the NeRF convention
//! - The [`VolumeRenderer`] interface implemented by the host renderer
//! - PNG capture with collision-free file naming

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

pub mod camera;
pub mod error;
pub mod renderer;
pub mod screenshot;
pub mod transfer_function;

pub use camera::{
    depth_of_focus, frame_bounding_sphere, horizontal_fov_degrees, CameraBasis, CameraFrame,
    ViewFramer,
};
pub use error::{RenderError, RenderResult};
pub use renderer::{PixelImage, RenderRequest, RowOrder, VolumeRenderer};
pub use screenshot::{
    capture_png, save_image, save_lut_strip, save_to_buffer, unique_png_path, ScreenshotError,
    MAX_DISAMBIGUATION_SUFFIX,
};
pub use transfer_function::{
    ColorPoint, OpacityPoint, Rgba8, TransferFunction, TransferFunctionPreset, TransferLut,
    DEFAULT_LUT_RESOLUTION,
};
