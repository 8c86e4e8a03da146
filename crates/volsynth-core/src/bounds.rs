//! Axis-aligned world bounds of a volume.

use glam::{UVec3, Vec3};
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl BoundingBox {
    /// Creates a bounding box from its two corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates a box of the given size centered at the origin.
    pub fn centered(size: Vec3) -> Self {
        Self {
            min: -0.5 * size,
            max: 0.5 * size,
        }
    }

    /// Returns the unit cube centered at the origin.
    pub fn unit() -> Self {
        Self::centered(Vec3::ONE)
    }

    /// Returns the center point.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        0.5 * (self.min + self.max)
    }

    /// Returns the edge lengths along each axis.
    #[must_use]
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns true if `max >= min` on every axis.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.max.cmpge(self.min).all()
    }

    /// Scales the box so that its longest axis matches the longest resolution
    /// axis with unit length.
    pub fn fit_to_resolution(&mut self, resolution: UVec3) {
        *self = Self::centered(resolution_scaling(resolution));
    }

    /// Sizes the box by the physical voxel spacing.
    pub fn fit_to_spacing(&mut self, spacing: Vec3) {
        *self = Self::centered(spacing);
    }

    /// Combines [`Self::fit_to_resolution`] and [`Self::fit_to_spacing`].
    pub fn fit_to_resolution_and_spacing(&mut self, resolution: UVec3, spacing: Vec3) {
        *self = Self::centered(resolution_scaling(resolution) * spacing);
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::unit()
    }
}

#[allow(clippy::cast_precision_loss)]
fn resolution_scaling(resolution: UVec3) -> Vec3 {
    let max_resolution = resolution.max_element().max(1);
    resolution.as_vec3() / max_resolution as f32
}
