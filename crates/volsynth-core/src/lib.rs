//! Core abstractions for volsynth.
//!
//! This crate provides the data types shared by the rest of the workspace:
//! - [`DensityField`] procedural scalar volumes and their histogram
//! - [`VolumeHeader`] and the raw-plus-header volume file codec
//! - [`BoundingBox`] world bounds and bounds fitting
//! - [`GeneratorOptions`] configuration and the [`VolsynthError`] type

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Options structs legitimately have several boolean flags
#![allow(clippy::struct_excessive_bools)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]

pub mod bounds;
pub mod density_field;
pub mod error;
pub mod options;
pub mod volume_io;

pub use bounds::BoundingBox;
pub use density_field::{DensityField, Histogram, DEFAULT_SYNTHESIS_SEED, HISTOGRAM_BUCKETS};
pub use error::{Result, VolsynthError};
pub use options::GeneratorOptions;
pub use volume_io::{VolumeHeader, HEADER_EXTENSION, RAW_EXTENSION};

// Re-export glam types for convenience
pub use glam::{UVec3, Vec3, Vec4};
