//! The `transforms.json` manifest of a generated dataset.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use volsynth_core::Result;

/// File name of the manifest inside the output root.
pub const MANIFEST_FILE_NAME: &str = "transforms.json";

/// Scene bound scale written to every manifest.
pub const AABB_SCALE: f32 = 2.0;

/// One captured view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Image path relative to the output root, `/`-separated.
    pub file_path: String,
    /// Camera-to-world pose, row by row.
    pub transform_matrix: [[f32; 4]; 4],
}

/// Global capture parameters plus one record per frame in capture order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub y_fov: f32,
    pub x_fov: f32,
    pub w: u32,
    pub h: u32,
    pub aabb_scale: f32,
    pub frames: Vec<FrameRecord>,
}

impl DatasetManifest {
    /// Creates a manifest with no frames.
    pub fn new(y_fov: f32, x_fov: f32, width: u32, height: u32) -> Self {
        Self {
            y_fov,
            x_fov,
            w: width,
            h: height,
            aabb_scale: AABB_SCALE,
            frames: Vec::new(),
        }
    }

    /// Appends a frame.
    pub fn push_frame(&mut self, file_path: impl Into<String>, transform_matrix: [[f32; 4]; 4]) {
        self.frames.push(FrameRecord {
            file_path: file_path.into(),
            transform_matrix,
        });
    }

    /// Serializes the manifest as JSON indented by two spaces.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the manifest to `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json_pretty()?)?;
        log::info!(
            "Wrote manifest with {} frames to {}",
            self.frames.len(),
            path.display()
        );
        Ok(())
    }

    /// Reads a manifest from `path`.
    pub fn read(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_layout() {
        let mut manifest = DatasetManifest::new(45.0, 45.0, 4, 4);
        manifest.push_frame("images/generation.png", [[0.0; 4]; 4]);

        let value: serde_json::Value =
            serde_json::from_str(&manifest.to_json_pretty().unwrap()).unwrap();
        assert_eq!(value["aabb_scale"], 2.0);
        assert_eq!(value["w"], 4);
        assert_eq!(value["frames"][0]["file_path"], "images/generation.png");
        assert_eq!(value["frames"][0]["transform_matrix"][3][3], 0.0);
    }

    #[test]
    fn test_pretty_output_uses_two_spaces() {
        let manifest = DatasetManifest::new(45.0, 45.0, 1, 1);
        let json = manifest.to_json_pretty().unwrap();
        assert!(json.contains("\n  \"y_fov\": 45.0"));
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE_NAME);
        let mut manifest = DatasetManifest::new(30.0, 40.0, 8, 6);
        manifest.push_frame("images/generation_0.png", [[1.0; 4]; 4]);

        manifest.write(&path).unwrap();
        assert_eq!(DatasetManifest::read(&path).unwrap(), manifest);
    }
}
