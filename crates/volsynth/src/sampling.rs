//! Random view sampling for dataset export.

use std::f32::consts::TAU;

use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Mean of the random zoom distribution.
pub const ZOOM_MEAN: f32 = 1.0;
/// Standard deviation of the random zoom distribution.
pub const ZOOM_STD_DEV: f32 = 0.3;
/// Range random zoom factors are clamped to.
pub const ZOOM_RANGE: (f32, f32) = (0.1, 2.0);

/// One randomly drawn view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSample {
    /// Unit view direction, from eye towards focus.
    pub direction: Vec3,
    /// Zoom factor applied to the framing.
    pub zoom: f32,
    /// Pan offset, if offsets are randomized.
    pub offset: Option<Vec2>,
}

/// Draws view directions, zoom factors and pan offsets.
///
/// The generator is owned by one export run and never shared with field
/// synthesis.
#[derive(Debug, Clone)]
pub struct ViewSampler {
    rng: StdRng,
}

impl ViewSampler {
    /// Creates a sampler seeded with `seed`, or from OS entropy when `None`.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::from_rng(rng)
    }

    /// Creates a sampler from an existing generator.
    pub fn from_rng(rng: StdRng) -> Self {
        Self { rng }
    }

    /// Draws a direction uniformly distributed on the unit sphere.
    pub fn sample_sphere(&mut self) -> Vec3 {
        let theta = TAU * self.rng.gen::<f32>();
        let phi = (1.0 - 2.0 * self.rng.gen::<f32>()).acos();
        Vec3::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos())
    }

    /// Draws a zoom factor from the clamped normal distribution.
    pub fn sample_zoom(&mut self) -> f32 {
        let z: f32 = self.rng.sample(StandardNormal);
        (ZOOM_MEAN + ZOOM_STD_DEV * z).clamp(ZOOM_RANGE.0, ZOOM_RANGE.1)
    }

    /// Draws a pan offset with both components in `[-0.5, 0.5)`.
    pub fn sample_offset(&mut self) -> Vec2 {
        let dx = self.rng.gen::<f32>() - 0.5;
        let dy = self.rng.gen::<f32>() - 0.5;
        Vec2::new(dx, dy)
    }

    /// Draws the next view.
    ///
    /// A second direction is drawn and discarded after the view direction so
    /// the random sequence stays aligned with earlier datasets; the up vector
    /// is fixed to world +Y.
    pub fn next_view(&mut self, randomize_zoom: bool, randomize_offset: bool) -> ViewSample {
        let direction = self.sample_sphere();
        let _unused_up = self.sample_sphere();

        let zoom = if randomize_zoom {
            self.sample_zoom()
        } else {
            1.0
        };
        let offset = randomize_offset.then(|| self.sample_offset());

        ViewSample {
            direction,
            zoom,
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_seeded_sampler_is_deterministic() {
        let mut a = ViewSampler::new(Some(7));
        let mut b = ViewSampler::new(Some(7));
        for _ in 0..10 {
            assert_eq!(a.next_view(true, true), b.next_view(true, true));
        }
    }

    #[test]
    fn test_defaults_without_randomization() {
        let mut sampler = ViewSampler::new(Some(3));
        let view = sampler.next_view(false, false);
        assert!((view.zoom - 1.0).abs() < f32::EPSILON);
        assert!(view.offset.is_none());
    }

    #[test]
    fn test_discarded_direction_is_still_drawn() {
        let mut reference = ViewSampler::new(Some(11));
        let first = reference.sample_sphere();
        let _ = reference.sample_sphere();
        let third = reference.sample_sphere();

        let mut sampler = ViewSampler::new(Some(11));
        assert_eq!(sampler.next_view(false, false).direction, first);
        assert_eq!(sampler.next_view(false, false).direction, third);
    }

    #[test]
    fn test_sphere_samples_cover_both_hemispheres() {
        let mut sampler = ViewSampler::new(Some(5));
        let samples: Vec<Vec3> = (0..500).map(|_| sampler.sample_sphere()).collect();
        assert!(samples.iter().any(|d| d.z > 0.5));
        assert!(samples.iter().any(|d| d.z < -0.5));
        let mean = samples.iter().copied().sum::<Vec3>() / samples.len() as f32;
        assert!(mean.length() < 0.15, "mean direction {mean:?}");
    }

    proptest! {
        #[test]
        fn prop_directions_are_unit_length(seed in any::<u64>()) {
            let mut sampler = ViewSampler::new(Some(seed));
            for _ in 0..16 {
                let d = sampler.sample_sphere();
                prop_assert!((d.length() - 1.0).abs() < 1e-4);
            }
        }

        #[test]
        fn prop_zoom_and_offset_ranges(seed in any::<u64>()) {
            let mut sampler = ViewSampler::new(Some(seed));
            for _ in 0..16 {
                let view = sampler.next_view(true, true);
                prop_assert!((ZOOM_RANGE.0..=ZOOM_RANGE.1).contains(&view.zoom));
                let offset = view.offset.unwrap();
                prop_assert!(offset.x >= -0.5 && offset.x < 0.5);
                prop_assert!(offset.y >= -0.5 && offset.y < 0.5);
            }
        }
    }
}
