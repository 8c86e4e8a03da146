//! volsynth: synthetic volume datasets for view-synthesis training.
//!
//! volsynth builds a procedural 3D density field, colors it with an editable
//! transfer function, and exports a dataset of rendered views together with
//! NeRF-convention camera poses in a `transforms.json` manifest.
//!
//! # Quick Start
//!
//! ```no_run
//! use volsynth::*;
//!
//! # fn renderer() -> Box<dyn VolumeRenderer> { unimplemented!() }
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let options = GeneratorOptions::default().with_sample_count(10);
//!     let mut generator = Generator::new(options)?.with_renderer(renderer());
//!
//!     generator.synthesize()?;
//!     generator.apply_preset(TransferFunctionPreset::BlueRedYellow);
//!     let manifest = generator.generate_samples()?;
//!     println!("captured {} frames", manifest.frames.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Output layout
//!
//! Everything is written below [`GeneratorOptions::output_dir`]:
//!
//! - `images/generation.png`, `images/generation_0.png`, ... captured views
//! - `transforms.json` the [`DatasetManifest`]
//! - `volume_data.vox` and `volume_data.hd` from [`Generator::export_volume_data`]
//! - `transfer_function.png` from [`Generator::export_transfer_function`]
//!
//! Rendering is not part of this crate: hosts implement [`VolumeRenderer`].

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

pub mod artifacts;
pub mod exporter;
pub mod generator;
pub mod manifest;
pub mod sampling;

// Re-export core types
pub use volsynth_core::{
    BoundingBox, DensityField, GeneratorOptions, Histogram, Result, UVec3, Vec3, Vec4,
    VolsynthError, VolumeHeader,
};

// Re-export render types
pub use volsynth_render::{
    CameraFrame, PixelImage, RenderError, RenderRequest, RenderResult, RowOrder,
    TransferFunction, TransferFunctionPreset, TransferLut, ViewFramer, VolumeRenderer,
};

pub use artifacts::{export_transfer_function, export_volume_data, load_volume_from_file, VolumeFiles};
pub use exporter::{DatasetExporter, ExportState};
pub use generator::Generator;
pub use manifest::{DatasetManifest, FrameRecord};
pub use sampling::{ViewSample, ViewSampler};

/// Initializes `env_logger` from `RUST_LOG`.
///
/// Safe to call more than once; later calls do nothing.
pub fn init_logging() {
    let _ = env_logger::try_init();
}
