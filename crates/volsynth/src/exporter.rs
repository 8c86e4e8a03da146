//! Dataset export: random views, captures and the pose manifest.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use glam::Vec3;
use volsynth_core::{DensityField, GeneratorOptions, Result, VolsynthError};
use volsynth_render::{
    RenderError, RenderRequest, ScreenshotError, TransferLut, ViewFramer, VolumeRenderer,
};

use crate::manifest::{DatasetManifest, MANIFEST_FILE_NAME};
use crate::sampling::ViewSampler;

/// Directory below the output root that receives the captured images.
pub const IMAGES_DIR_NAME: &str = "images";

/// Base name of every captured image.
pub const CAPTURE_FILE_NAME: &str = "generation.png";

/// Phase of an export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportState {
    /// No run is active.
    #[default]
    Idle,
    /// The image directory is being recreated.
    Preparing,
    /// Frame `i` (zero based) is being rendered and captured.
    Capturing(usize),
    /// The manifest is being written.
    Finalizing,
}

/// Renders and captures a set of random views of a volume.
///
/// Each run owns its own [`ViewSampler`]. A run that unwinds from a panic
/// leaves the exporter marked active and later runs are rejected.
#[derive(Debug, Default)]
pub struct DatasetExporter {
    state: ExportState,
    cancel: Option<Arc<AtomicBool>>,
}

impl DatasetExporter {
    /// Creates an idle exporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a flag that cancels the run when set. It is checked before
    /// each frame.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Replaces the cancellation flag.
    pub fn set_cancel_flag(&mut self, flag: Option<Arc<AtomicBool>>) {
        self.cancel = flag;
    }

    /// Current phase.
    pub fn state(&self) -> ExportState {
        self.state
    }

    /// Returns true while a run is in progress.
    pub fn is_active(&self) -> bool {
        self.state != ExportState::Idle
    }

    /// Runs a full export into `options.output_dir`.
    ///
    /// Recreates `<out>/images`, captures `options.sample_count` views and
    /// writes `<out>/transforms.json`. The renderer gamma is forced to 1.0
    /// for the run and restored afterwards, whatever the outcome.
    pub fn run(
        &mut self,
        renderer: Option<&mut (dyn VolumeRenderer + '_)>,
        field: &DensityField,
        lut: &TransferLut,
        options: &GeneratorOptions,
    ) -> Result<DatasetManifest> {
        if self.is_active() {
            return Err(VolsynthError::ExportInProgress);
        }
        let renderer = renderer.ok_or(VolsynthError::RendererUnavailable)?;
        options.validate()?;

        let mut renderer = GammaOverride::new(renderer, 1.0);
        let result = self.run_frames(&mut renderer, field, lut, options);
        drop(renderer);

        self.state = ExportState::Idle;
        if let Err(err) = &result {
            log::error!("Dataset export aborted: {err}");
        }
        result
    }

    fn run_frames(
        &mut self,
        renderer: &mut GammaOverride<'_, '_>,
        field: &DensityField,
        lut: &TransferLut,
        options: &GeneratorOptions,
    ) -> Result<DatasetManifest> {
        let start = Instant::now();
        let out_dir = options.output_dir.as_path();

        self.state = ExportState::Preparing;
        let images_dir = prepare_images_dir(out_dir)?;

        let framer = ViewFramer::new(options.y_fov_degrees, options.aspect_ratio());
        let mut manifest = DatasetManifest::new(
            options.y_fov_degrees,
            framer.x_fov_degrees(),
            options.sample_width,
            options.sample_height,
        );
        let mut sampler = ViewSampler::new(options.sampling_seed);
        let bounds = field.bounds();
        let target = images_dir.join(CAPTURE_FILE_NAME);

        log::info!(
            "Generating {} samples into {}",
            options.sample_count,
            out_dir.display()
        );

        for i in 0..options.sample_count {
            if self.is_cancelled() {
                log::warn!("Dataset export cancelled after {i} frames");
                return Err(VolsynthError::Cancelled {
                    completed: i,
                    requested: options.sample_count,
                });
            }
            self.state = ExportState::Capturing(i);

            let view = sampler.next_view(options.randomize_zoom, options.randomize_offset);
            let mut camera = framer.camera_frame(
                bounds.center(),
                view.direction,
                Vec3::Y,
                bounds.extent(),
                view.zoom,
            );
            if let Some(offset) = view.offset {
                camera.pan(offset.x, offset.y);
            }

            let request = RenderRequest {
                field,
                lut,
                bounds,
                camera: &camera,
                width: options.sample_width,
                height: options.sample_height,
            };
            let image = renderer
                .inner
                .render(&request)
                .map_err(|e| frame_error(i, e))?;
            let written = renderer
                .inner
                .capture(&image, &target)
                .map_err(|e| frame_error(i, e))?;

            let file_path = relative_file_path(out_dir, &written);
            log::debug!(
                "Frame {i}: {file_path} (zoom {:.3}, eye {:?})",
                view.zoom,
                camera.eye
            );
            manifest.push_frame(file_path, camera.pose_matrix());
        }

        self.state = ExportState::Finalizing;
        manifest.write(&out_dir.join(MANIFEST_FILE_NAME))?;

        log::info!(
            "Generated {} samples in {}ms",
            manifest.frames.len(),
            start.elapsed().as_millis()
        );
        Ok(manifest)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Holds the renderer with a temporary gamma and restores the saved value on
/// drop.
struct GammaOverride<'r, 'd> {
    inner: &'r mut (dyn VolumeRenderer + 'd),
    saved: f32,
}

impl<'r, 'd> GammaOverride<'r, 'd> {
    fn new(inner: &'r mut (dyn VolumeRenderer + 'd), gamma: f32) -> Self {
        let saved = inner.gamma();
        inner.set_gamma(gamma);
        Self { inner, saved }
    }
}

impl Drop for GammaOverride<'_, '_> {
    fn drop(&mut self) {
        self.inner.set_gamma(self.saved);
    }
}

/// Removes and recreates `<out>/images`.
fn prepare_images_dir(out_dir: &Path) -> Result<PathBuf> {
    let images_dir = out_dir.join(IMAGES_DIR_NAME);
    if images_dir.exists() {
        fs::remove_dir_all(&images_dir)?;
    }
    fs::create_dir_all(&images_dir)?;
    Ok(images_dir)
}

/// Returns `path` relative to `root` with `/` separators.
///
/// Paths outside `root` keep all their components.
pub fn relative_file_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn frame_error(frame: usize, err: RenderError) -> VolsynthError {
    match err {
        RenderError::Screenshot(err) => screenshot_error(err),
        err => VolsynthError::Render(format!("frame {frame}: {err}")),
    }
}

/// Maps a screenshot failure into the crate error.
pub(crate) fn screenshot_error(err: ScreenshotError) -> VolsynthError {
    match err {
        ScreenshotError::IoError(err) => VolsynthError::Io(err),
        ScreenshotError::DisambiguationExhausted(path) => {
            VolsynthError::DisambiguationExhausted(path)
        }
        err => VolsynthError::Render(format!("failed to save image: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volsynth_core::{BoundingBox, UVec3};
    use volsynth_render::{PixelImage, RenderResult, TransferFunction, TransferFunctionPreset};

    #[test]
    fn test_relative_file_path() {
        let root = Path::new("out");
        assert_eq!(
            relative_file_path(root, &root.join("images").join("generation_0.png")),
            "images/generation_0.png"
        );
        assert_eq!(
            relative_file_path(root, Path::new("elsewhere/shot.png")),
            "elsewhere/shot.png"
        );
    }

    #[test]
    fn test_prepare_images_dir_clears_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join(IMAGES_DIR_NAME).join("old.png");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, b"stale").unwrap();

        let images = prepare_images_dir(dir.path()).unwrap();
        assert!(images.is_dir());
        assert!(!stale.exists());
    }

    #[test]
    fn test_screenshot_error_mapping() {
        let err = screenshot_error(ScreenshotError::DisambiguationExhausted(PathBuf::from("x.png")));
        assert!(matches!(err, VolsynthError::DisambiguationExhausted(_)));

        let err = frame_error(2, RenderError::Backend("device lost".into()));
        assert!(matches!(err, VolsynthError::Render(msg) if msg.contains("frame 2")));
    }

    #[test]
    fn test_new_exporter_is_idle() {
        let exporter = DatasetExporter::new();
        assert_eq!(exporter.state(), ExportState::Idle);
        assert!(!exporter.is_active());
    }

    struct FlatRenderer {
        gamma: f32,
        frames: usize,
    }

    impl VolumeRenderer for FlatRenderer {
        fn render(&mut self, request: &RenderRequest<'_>) -> RenderResult<PixelImage> {
            self.frames += 1;
            Ok(PixelImage::filled(request.width, request.height, [0, 0, 0, 255]))
        }

        fn gamma(&self) -> f32 {
            self.gamma
        }

        fn set_gamma(&mut self, gamma: f32) {
            self.gamma = gamma;
        }
    }

    #[test]
    fn test_cancel_flag_set_before_run_captures_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let options = GeneratorOptions::default()
            .with_capture_size(4, 4)
            .with_sample_count(3)
            .with_output_dir(dir.path());
        let field = DensityField::new(UVec3::splat(2), BoundingBox::unit()).unwrap();
        let lut = TransferFunction::from_preset(TransferFunctionPreset::BlueRedYellow)
            .bake_lookup_table(16);
        let mut renderer = FlatRenderer {
            gamma: 2.2,
            frames: 0,
        };

        let mut exporter = DatasetExporter::new().with_cancel_flag(Arc::new(AtomicBool::new(true)));
        let result = exporter.run(Some(&mut renderer), &field, &lut, &options);

        assert!(matches!(
            result,
            Err(VolsynthError::Cancelled {
                completed: 0,
                requested: 3
            })
        ));
        assert_eq!(renderer.frames, 0);
        assert!((renderer.gamma - 2.2).abs() < f32::EPSILON);
        assert!(!dir.path().join(MANIFEST_FILE_NAME).exists());
        assert_eq!(exporter.state(), ExportState::Idle);
    }
}
