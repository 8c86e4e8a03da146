//! Configuration options for volume synthesis and dataset export.

use std::fs;
use std::path::{Path, PathBuf};

use glam::UVec3;
use serde::{Deserialize, Serialize};

use crate::bounds::BoundingBox;
use crate::density_field::{voxel_count, DEFAULT_SYNTHESIS_SEED};
use crate::error::{Result, VolsynthError};

/// Tunable parameters of a generator session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    /// Voxel resolution of synthesized fields.
    pub resolution: UVec3,

    /// World bounds of the volume.
    pub bounding_box: BoundingBox,

    /// Seed of the field synthesis generator.
    pub synthesis_seed: u64,

    /// Number of views captured per export run.
    pub sample_count: usize,

    /// Whether each view draws a random zoom factor.
    pub randomize_zoom: bool,

    /// Whether each view draws a random pan offset.
    pub randomize_offset: bool,

    /// Capture width in pixels.
    pub sample_width: u32,

    /// Capture height in pixels.
    pub sample_height: u32,

    /// Vertical field of view in degrees.
    pub y_fov_degrees: f32,

    /// Index of the transfer function preset (0..=3).
    pub transfer_function_preset: u32,

    /// Number of samples in the baked transfer function lookup table.
    pub lut_resolution: u32,

    /// Seed of the view sampling generator. `None` seeds from OS entropy.
    pub sampling_seed: Option<u64>,

    /// Root directory of all exported artifacts.
    pub output_dir: PathBuf,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            resolution: UVec3::splat(128),
            bounding_box: BoundingBox::unit(),
            synthesis_seed: DEFAULT_SYNTHESIS_SEED,
            sample_count: 150,
            randomize_zoom: false,
            randomize_offset: false,
            sample_width: 1024,
            sample_height: 1024,
            y_fov_degrees: 45.0,
            transfer_function_preset: 1,
            lut_resolution: 256,
            sampling_seed: None,
            output_dir: PathBuf::from("./out"),
        }
    }
}

impl GeneratorOptions {
    /// Creates options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the capture resolution.
    pub fn with_capture_size(mut self, width: u32, height: u32) -> Self {
        self.sample_width = width;
        self.sample_height = height;
        self
    }

    /// Sets the number of captured views.
    pub fn with_sample_count(mut self, sample_count: usize) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Sets the output root directory.
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Sets the view sampling seed.
    pub fn with_sampling_seed(mut self, seed: u64) -> Self {
        self.sampling_seed = Some(seed);
        self
    }

    /// Returns the capture aspect ratio (width / height).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn aspect_ratio(&self) -> f32 {
        self.sample_width as f32 / self.sample_height as f32
    }

    /// Checks that every option is in its valid range.
    pub fn validate(&self) -> Result<()> {
        if self.resolution.min_element() == 0 {
            return Err(invalid(format!(
                "resolution must be positive, got {:?}",
                self.resolution
            )));
        }
        if voxel_count(self.resolution).is_none() {
            return Err(invalid(format!(
                "resolution {:?} has more voxels than can be addressed",
                self.resolution
            )));
        }
        if !self.bounding_box.is_valid() {
            return Err(invalid(format!(
                "bounding box min {:?} exceeds max {:?}",
                self.bounding_box.min, self.bounding_box.max
            )));
        }
        if self.sample_width == 0 || self.sample_height == 0 {
            return Err(invalid(format!(
                "capture size must be positive, got {}x{}",
                self.sample_width, self.sample_height
            )));
        }
        if !(self.y_fov_degrees > 0.0 && self.y_fov_degrees < 180.0) {
            return Err(invalid(format!(
                "vertical field of view must be in (0, 180) degrees, got {}",
                self.y_fov_degrees
            )));
        }
        if self.lut_resolution == 0 {
            return Err(invalid("lookup table resolution must be positive".into()));
        }
        Ok(())
    }

    /// Parses options from JSON. Missing fields take their default values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Loads options from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let options = Self::from_json_str(&json)?;
        log::info!("loaded options from {}", path.display());
        Ok(options)
    }

    /// Saves options as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

fn invalid(message: String) -> VolsynthError {
    VolsynthError::InvalidOption(message)
}
