//! Procedural scalar density fields.
//!
//! A [`DensityField`] is a dense x-fastest grid of values in `[0, 1]`. Fields
//! are synthesized by splatting soft spheres into the grid: one large sphere at
//! the center followed by batches of smaller, randomly placed spheres that
//! alternately add and carve away density.

use std::fmt;

use glam::{IVec3, UVec3, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bounds::BoundingBox;
use crate::error::{Result, VolsynthError};

/// Number of histogram buckets over the `[0, 1]` density domain.
pub const HISTOGRAM_BUCKETS: usize = 128;

/// Seed used for field synthesis unless configured otherwise.
pub const DEFAULT_SYNTHESIS_SEED: u64 = 42;

/// Radius and contribution of the central sphere.
const CENTER_SPHERE: (f32, f32) = (0.5, 0.75);

/// `(count, radius, contribution)` of each random sphere batch. Each batch is
/// splatted once additively and once subtractively.
const SPHERE_BATCHES: [(usize, f32, f32); 4] = [
    (5, 0.2, 0.5),
    (50, 0.1, 0.25),
    (100, 0.05, 0.1),
    (200, 0.025, 0.1),
];

/// Histogram of density values, used by editors for visualization only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    counts: Vec<u32>,
}

impl Histogram {
    /// Builds a histogram over the given values.
    pub fn from_values(values: &[f32]) -> Self {
        let mut counts = vec![0u32; HISTOGRAM_BUCKETS];
        for &value in values {
            counts[Self::bucket_of(value)] += 1;
        }
        Self { counts }
    }

    /// Returns the bucket a value falls into.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn bucket_of(value: f32) -> usize {
        let bucket = (value * HISTOGRAM_BUCKETS as f32).floor();
        (bucket.max(0.0) as usize).min(HISTOGRAM_BUCKETS - 1)
    }

    /// Returns the per-bucket counts.
    #[must_use]
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Returns the number of values counted.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            counts: vec![0; HISTOGRAM_BUCKETS],
        }
    }
}

/// A regular 3D grid of scalar densities.
#[derive(Debug, Clone)]
pub struct DensityField {
    resolution: UVec3,
    spacing: Vec3,
    bounds: BoundingBox,
    values: Vec<f32>,
    histogram: Histogram,
}

impl DensityField {
    /// Creates a zero-filled field.
    ///
    /// Fails if the voxel count of `resolution` overflows `usize`.
    pub fn new(resolution: UVec3, bounds: BoundingBox) -> Result<Self> {
        let values = vec![0.0; checked_voxel_count(resolution)?];
        let histogram = Histogram::from_values(&values);
        Ok(Self {
            resolution,
            spacing: Vec3::ONE,
            bounds,
            values,
            histogram,
        })
    }

    /// Creates a field from existing x-fastest values.
    pub fn from_values(
        resolution: UVec3,
        spacing: Vec3,
        bounds: BoundingBox,
        values: Vec<f32>,
    ) -> Result<Self> {
        let expected = checked_voxel_count(resolution)?;
        if values.len() != expected {
            return Err(VolsynthError::SizeMismatch {
                expected,
                actual: values.len(),
            });
        }
        let histogram = Histogram::from_values(&values);
        Ok(Self {
            resolution,
            spacing,
            bounds,
            values,
            histogram,
        })
    }

    /// Returns the number of voxels along each axis.
    #[must_use]
    pub fn resolution(&self) -> UVec3 {
        self.resolution
    }

    /// Returns the physical voxel spacing.
    #[must_use]
    pub fn spacing(&self) -> Vec3 {
        self.spacing
    }

    /// Returns the world bounds.
    #[must_use]
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Sets the world bounds. Voxel values are left untouched.
    pub fn set_bounds(&mut self, bounds: BoundingBox) {
        self.bounds = bounds;
    }

    /// Returns the voxel values in x-fastest order.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Returns the histogram computed by the last synthesis or load.
    #[must_use]
    pub fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    /// Returns the total number of voxels.
    #[must_use]
    pub fn num_voxels(&self) -> usize {
        self.values.len()
    }

    /// Flattens a 3D voxel index to a linear index.
    #[must_use]
    pub fn flatten_index(&self, x: u32, y: u32, z: u32) -> usize {
        let (nx, ny) = (self.resolution.x as usize, self.resolution.y as usize);
        x as usize + nx * y as usize + nx * ny * z as usize
    }

    /// Returns the value of a voxel, or `None` outside the grid.
    #[must_use]
    pub fn value_at(&self, x: u32, y: u32, z: u32) -> Option<f32> {
        let inside = UVec3::new(x, y, z).cmplt(self.resolution).all();
        inside.then(|| self.values[self.flatten_index(x, y, z)])
    }

    /// Replaces the grid with a zeroed one if the resolution changes.
    ///
    /// Returns true if the grid was reallocated. An overflowing voxel count
    /// is rejected and leaves the field unchanged.
    pub fn resize(&mut self, resolution: UVec3) -> Result<bool> {
        if resolution == self.resolution {
            return Ok(false);
        }
        let count = checked_voxel_count(resolution)?;
        self.resolution = resolution;
        self.values = vec![0.0; count];
        self.histogram = Histogram::from_values(&self.values);
        Ok(true)
    }

    /// Fits the bounds to the resolution, longest axis of unit length.
    pub fn fit_to_resolution(&mut self) {
        self.bounds.fit_to_resolution(self.resolution);
    }

    /// Fits the bounds to the voxel spacing.
    pub fn fit_to_spacing(&mut self) {
        self.bounds.fit_to_spacing(self.spacing);
    }

    /// Fits the bounds to both resolution and spacing.
    pub fn fit_to_resolution_and_spacing(&mut self) {
        self.bounds
            .fit_to_resolution_and_spacing(self.resolution, self.spacing);
    }

    /// Synthesizes a procedural field.
    ///
    /// The result depends only on `resolution`, `bounds` and `seed`.
    #[allow(clippy::cast_precision_loss)]
    pub fn synthesize(&mut self, resolution: UVec3, bounds: BoundingBox, seed: u64) -> Result<()> {
        if resolution.min_element() == 0 {
            return Err(VolsynthError::InvalidOption(format!(
                "resolution must be positive, got {}x{}x{}",
                resolution.x, resolution.y, resolution.z
            )));
        }
        if !bounds.is_valid() || bounds.extent().x <= 0.0 {
            return Err(VolsynthError::InvalidOption(format!(
                "bounding box {:?}..{:?} has no extent along x",
                bounds.min, bounds.max
            )));
        }

        self.resize(resolution)?;
        self.values.fill(0.0);
        self.bounds = bounds;

        let voxel_size = bounds.extent().x / resolution.x as f32;
        let mut rng = StdRng::seed_from_u64(seed);

        let (radius, contribution) = CENTER_SPHERE;
        self.splat_sphere(voxel_size, bounds.center(), radius, contribution);

        for &(count, radius, contribution) in &SPHERE_BATCHES {
            self.splat_random_spheres(voxel_size, &mut rng, count, radius, contribution);
            self.splat_random_spheres(voxel_size, &mut rng, count, radius, -contribution);
        }

        self.clamp_values();
        self.update_histogram();

        log::debug!("synthesized density field ({self}) with seed {seed}");
        Ok(())
    }

    /// Splats `count` spheres at uniformly random positions inside the bounds.
    pub fn splat_random_spheres<R: Rng + ?Sized>(
        &mut self,
        voxel_size: f32,
        rng: &mut R,
        count: usize,
        radius: f32,
        contribution: f32,
    ) {
        let (a, b) = (self.bounds.min, self.bounds.max);
        for _ in 0..count {
            let x = lerp(a.x, b.x, rng.gen::<f32>());
            let y = lerp(a.y, b.y, rng.gen::<f32>());
            let z = lerp(a.z, b.z, rng.gen::<f32>());
            self.splat_sphere(voxel_size, Vec3::new(x, y, z), radius, contribution);
        }
    }

    /// Adds a soft sphere to every voxel whose center lies inside it.
    ///
    /// A voxel at distance `d < radius` from `center` receives
    /// `contribution * sqrt(1 - d / radius)`. Values are not clamped here.
    #[allow(clippy::cast_sign_loss)]
    pub fn splat_sphere(&mut self, voxel_size: f32, center: Vec3, radius: f32, contribution: f32) {
        if self.values.is_empty() || voxel_size <= 0.0 || radius <= 0.0 {
            return;
        }

        // Shrinking the max corner keeps exact-boundary voxels out of the range.
        let box_min = center - Vec3::splat(radius);
        let box_max = center + Vec3::splat(radius) - Vec3::splat(0.005 * voxel_size);

        let max_index = self.resolution.as_ivec3() - IVec3::ONE;
        let start = ((box_min - self.bounds.min) / voxel_size)
            .as_ivec3()
            .clamp(IVec3::ZERO, max_index);
        let end = ((box_max - self.bounds.min) / voxel_size)
            .as_ivec3()
            .clamp(IVec3::ZERO, max_index);

        let origin = self.bounds.min + Vec3::splat(0.5 * voxel_size);
        for z in start.z..=end.z {
            for y in start.y..=end.y {
                for x in start.x..=end.x {
                    let voxel_pos = origin + IVec3::new(x, y, z).as_vec3() * voxel_size;
                    let dist = voxel_pos.distance(center);
                    if dist < radius {
                        let idx = self.flatten_index(x as u32, y as u32, z as u32);
                        self.values[idx] += contribution * (1.0 - dist / radius).sqrt();
                    }
                }
            }
        }
    }

    /// Clamps every voxel to `[0, 1]`.
    pub fn clamp_values(&mut self) {
        for value in &mut self.values {
            *value = value.clamp(0.0, 1.0);
        }
    }

    /// Recomputes the histogram from the current values.
    pub fn update_histogram(&mut self) {
        self.histogram = Histogram::from_values(&self.values);
    }
}

impl fmt::Display for DensityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "resolution={}x{}x{}",
            self.resolution.x, self.resolution.y, self.resolution.z
        )
    }
}

/// Returns the number of voxels of a grid with the given resolution, or
/// `None` if it does not fit in `usize`.
#[must_use]
pub fn voxel_count(resolution: UVec3) -> Option<usize> {
    let [x, y, z] = resolution.to_array();
    usize::try_from(x)
        .ok()?
        .checked_mul(usize::try_from(y).ok()?)?
        .checked_mul(usize::try_from(z).ok()?)
}

fn checked_voxel_count(resolution: UVec3) -> Result<usize> {
    voxel_count(resolution).ok_or_else(|| {
        VolsynthError::InvalidOption(format!(
            "resolution {}x{}x{} has more voxels than can be addressed",
            resolution.x, resolution.y, resolution.z
        ))
    })
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
