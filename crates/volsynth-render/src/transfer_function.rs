//! Transfer functions mapping scalar density to color and opacity.
//!
//! A [`TransferFunction`] holds two independent sets of control points, one for
//! color and one for opacity. Both are interpolated piecewise-linearly. Two
//! points may share a position: the earlier-inserted one ends the segment on
//! the left and the later-inserted one starts the segment on the right, which
//! produces a sharp step.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// Lookup table resolution used when none is configured.
pub const DEFAULT_LUT_RESOLUTION: u32 = 256;

/// A color control point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorPoint {
    /// Density position in `[0, 1]`.
    pub position: f32,
    /// RGB color.
    pub color: Vec3,
}

/// An opacity control point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpacityPoint {
    /// Density position in `[0, 1]`.
    pub position: f32,
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
}

/// Built-in transfer functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferFunctionPreset {
    /// Plain white with a linear opacity ramp.
    White,
    /// Blue to red to yellow, tuned for synthesized volumes.
    #[default]
    BlueRedYellow,
    /// White to pale green to coral, tuned for vascular scans.
    Aneurysm,
    /// Six-point anatomical preset for head scans.
    Head,
}

impl TransferFunctionPreset {
    /// All presets in index order.
    pub const ALL: [Self; 4] = [Self::White, Self::BlueRedYellow, Self::Aneurysm, Self::Head];

    /// Converts from a u32 index. Indices past the last preset select it.
    #[must_use]
    pub fn from_index(index: u32) -> Self {
        match index {
            0 => Self::White,
            1 => Self::BlueRedYellow,
            2 => Self::Aneurysm,
            _ => Self::Head,
        }
    }

    /// Converts to a u32 index.
    #[must_use]
    pub fn to_index(self) -> u32 {
        match self {
            Self::White => 0,
            Self::BlueRedYellow => 1,
            Self::Aneurysm => 2,
            Self::Head => 3,
        }
    }

    /// Returns display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::White => "White",
            Self::BlueRedYellow => "Blue-Red-Yellow",
            Self::Aneurysm => "Aneurysm",
            Self::Head => "Head",
        }
    }

    fn color_points(self) -> &'static [(f32, [f32; 3])] {
        match self {
            Self::White => &[(0.0, [1.0, 1.0, 1.0])],
            Self::BlueRedYellow => &[
                (0.0, [0.0, 0.0, 1.0]),
                (0.5, [1.0, 0.0, 0.0]),
                (1.0, [1.0, 1.0, 0.0]),
            ],
            Self::Aneurysm => &[
                (0.0, [1.0, 1.0, 1.0]),
                (0.25, [0.95, 1.0, 0.8]),
                (1.0, [1.0, 0.4, 0.333]),
            ],
            Self::Head => &[
                (0.332, [0.5, 0.8, 0.85]),
                (0.349, [0.85, 0.5, 0.85]),
                (0.370, [0.9, 0.85, 0.8]),
                (0.452, [0.9, 0.85, 0.8]),
                (0.715, [0.9, 0.85, 0.8]),
                (1.0, [1.0, 0.0, 0.0]),
            ],
        }
    }

    fn opacity_points(self) -> &'static [(f32, f32)] {
        match self {
            Self::White => &[(0.0, 0.0), (1.0, 1.0)],
            Self::BlueRedYellow => &[
                (0.05, 0.0),
                (0.1, 0.1),
                (0.3, 0.1),
                (0.35, 0.0),
                (0.35, 0.0),
                (0.45, 0.0),
                (0.5, 0.15),
                (0.55, 0.15),
                (0.6, 0.0),
                (0.8, 0.0),
                (0.95, 0.5),
            ],
            Self::Aneurysm => &[(0.1, 0.0), (1.0, 1.0)],
            Self::Head => &[
                (0.208, 0.0),
                (0.22, 0.17),
                (0.315, 0.17),
                (0.326, 0.0),
                (0.345, 0.0),
                (0.348, 0.23),
                (0.35, 0.0),
                (0.374, 0.0),
                (0.539, 0.31),
                (0.633, 0.31),
                (0.716, 0.0),
                (0.8, 1.0),
            ],
        }
    }
}

/// A piecewise-linear mapping from density to color and opacity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferFunction {
    color_points: Vec<ColorPoint>,
    opacity_points: Vec<OpacityPoint>,
}

impl TransferFunction {
    /// Creates an empty transfer function.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transfer function from a preset.
    pub fn from_preset(preset: TransferFunctionPreset) -> Self {
        let mut tf = Self::new();
        tf.apply_preset(preset);
        tf
    }

    /// Replaces all control points with those of a preset.
    pub fn apply_preset(&mut self, preset: TransferFunctionPreset) {
        let mut tf = Self::new();
        for &(position, rgb) in preset.color_points() {
            tf.add_color_point(position, Vec3::from_array(rgb));
        }
        for &(position, opacity) in preset.opacity_points() {
            tf.add_opacity_point(position, opacity);
        }
        *self = tf;
    }

    /// Removes all control points.
    pub fn clear(&mut self) {
        self.color_points.clear();
        self.opacity_points.clear();
    }

    /// Adds a color point. Points at an existing position go after it.
    pub fn add_color_point(&mut self, position: f32, color: Vec3) -> &mut Self {
        let position = position.clamp(0.0, 1.0);
        let idx = self.color_points.partition_point(|p| p.position <= position);
        self.color_points.insert(idx, ColorPoint { position, color });
        self
    }

    /// Adds an opacity point. Points at an existing position go after it.
    pub fn add_opacity_point(&mut self, position: f32, opacity: f32) -> &mut Self {
        let position = position.clamp(0.0, 1.0);
        let opacity = opacity.clamp(0.0, 1.0);
        let idx = self
            .opacity_points
            .partition_point(|p| p.position <= position);
        self.opacity_points
            .insert(idx, OpacityPoint { position, opacity });
        self
    }

    /// Removes the color point at `index` (in position order).
    pub fn remove_color_point(&mut self, index: usize) -> Option<ColorPoint> {
        (index < self.color_points.len()).then(|| self.color_points.remove(index))
    }

    /// Removes the opacity point at `index` (in position order).
    pub fn remove_opacity_point(&mut self, index: usize) -> Option<OpacityPoint> {
        (index < self.opacity_points.len()).then(|| self.opacity_points.remove(index))
    }

    /// Returns the color points in ascending position order.
    #[must_use]
    pub fn color_points(&self) -> &[ColorPoint] {
        &self.color_points
    }

    /// Returns the opacity points in ascending position order.
    #[must_use]
    pub fn opacity_points(&self) -> &[OpacityPoint] {
        &self.opacity_points
    }

    /// Returns the interpolated color at a density. Black without points.
    #[must_use]
    pub fn color_at(&self, density: f32) -> Vec3 {
        piecewise_linear(
            &self.color_points,
            density,
            |p| p.position,
            |p| p.color,
            Vec3::lerp,
        )
        .unwrap_or(Vec3::ZERO)
    }

    /// Returns the interpolated opacity at a density. Opaque without points.
    #[must_use]
    pub fn opacity_at(&self, density: f32) -> f32 {
        piecewise_linear(
            &self.opacity_points,
            density,
            |p| p.position,
            |p| p.opacity,
            |a, b, t| a + (b - a) * t,
        )
        .unwrap_or(1.0)
    }

    /// Evaluates color and opacity at a density clamped to `[0, 1]`.
    #[must_use]
    pub fn evaluate(&self, density: f32) -> (Vec3, f32) {
        (self.color_at(density), self.opacity_at(density))
    }

    /// Samples the function at `resolution` evenly spaced densities in `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bake_lookup_table(&self, resolution: u32) -> TransferLut {
        let n = resolution.max(1);
        let step = if n > 1 { 1.0 / (n - 1) as f32 } else { 0.0 };
        let texels = (0..n)
            .map(|i| {
                let (color, opacity) = self.evaluate(i as f32 * step);
                color.extend(opacity)
            })
            .collect();
        TransferLut { texels }
    }
}

/// Interpolates between the last point at or before `t` and the point after it.
fn piecewise_linear<P, V: Copy>(
    points: &[P],
    t: f32,
    position: impl Fn(&P) -> f32,
    value: impl Fn(&P) -> V,
    lerp: impl Fn(V, V, f32) -> V,
) -> Option<V> {
    let t = t.clamp(0.0, 1.0);
    let (first, last) = (points.first()?, points.last()?);

    let upper = points.partition_point(|p| position(p) <= t);
    if upper == 0 {
        return Some(value(first));
    }
    if upper == points.len() {
        return Some(value(last));
    }

    let (left, right) = (&points[upper - 1], &points[upper]);
    let frac = (t - position(left)) / (position(right) - position(left));
    Some(lerp(value(left), value(right), frac))
}

/// An 8-bit RGBA texel.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn from_unit(v: Vec4) -> Self {
        let q = (v.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
        Self {
            r: q.x as u8,
            g: q.y as u8,
            b: q.z as u8,
            a: q.w as u8,
        }
    }
}

/// A baked transfer function: RGBA samples evenly spaced from 0 to 1.
///
/// This is the table handed to renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferLut {
    texels: Vec<Vec4>,
}

impl TransferLut {
    /// Returns the number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.texels.len()
    }

    /// Returns true if the table has no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.texels.is_empty()
    }

    /// Returns the RGBA samples.
    #[must_use]
    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    /// Samples the table at a density with linear filtering.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn sample(&self, t: f32) -> Vec4 {
        let t = t.clamp(0.0, 1.0);

        if self.texels.is_empty() {
            return Vec4::ZERO;
        }

        if self.texels.len() == 1 {
            return self.texels[0];
        }

        let n = self.texels.len() - 1;
        let idx = (t * n as f32).floor() as usize;
        let idx = idx.min(n - 1);
        let frac = t * n as f32 - idx as f32;

        self.texels[idx].lerp(self.texels[idx + 1], frac)
    }

    /// Quantizes the table to 8-bit texels.
    #[must_use]
    pub fn to_rgba8(&self) -> Vec<Rgba8> {
        self.texels.iter().copied().map(Rgba8::from_unit).collect()
    }

    /// Quantizes the table to a tightly packed RGBA byte buffer.
    #[must_use]
    pub fn to_rgba8_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.to_rgba8()).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_points_sorted_regardless_of_insertion_order() {
        let mut tf = TransferFunction::new();
        tf.add_opacity_point(0.8, 0.3)
            .add_opacity_point(0.2, 0.1)
            .add_opacity_point(0.5, 0.2);
        let positions: Vec<f32> = tf.opacity_points().iter().map(|p| p.position).collect();
        assert_eq!(positions, vec![0.2, 0.5, 0.8]);
    }

    #[test]
    fn test_linear_interpolation() {
        let mut tf = TransferFunction::new();
        tf.add_color_point(0.0, Vec3::ZERO)
            .add_color_point(1.0, Vec3::new(1.0, 0.5, 0.0));
        tf.add_opacity_point(0.0, 0.0).add_opacity_point(1.0, 1.0);

        let (color, opacity) = tf.evaluate(0.5);
        assert!((color - Vec3::new(0.5, 0.25, 0.0)).length() < 1e-6);
        assert!((opacity - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_clamps_outside_control_points() {
        let mut tf = TransferFunction::new();
        tf.add_opacity_point(0.25, 0.4).add_opacity_point(0.75, 0.8);
        assert_eq!(tf.opacity_at(0.1), 0.4);
        assert_eq!(tf.opacity_at(0.9), 0.8);
        assert_eq!(tf.opacity_at(-3.0), 0.4);
        assert_eq!(tf.opacity_at(7.0), 0.8);
    }

    #[test]
    fn test_duplicate_position_takes_later_point() {
        let mut tf = TransferFunction::new();
        tf.add_opacity_point(0.0, 0.0)
            .add_opacity_point(0.5, 0.2)
            .add_opacity_point(0.5, 0.9)
            .add_opacity_point(1.0, 0.9);

        assert_eq!(tf.opacity_at(0.5), 0.9);
        // Just left of the step the value approaches the earlier point.
        assert!((tf.opacity_at(0.4999) - 0.2).abs() < 1e-3);
    }

    #[test]
    fn test_empty_function_defaults() {
        let tf = TransferFunction::new();
        assert_eq!(tf.evaluate(0.3), (Vec3::ZERO, 1.0));
    }

    #[test]
    fn test_apply_preset_replaces_points() {
        let mut tf = TransferFunction::new();
        tf.add_color_point(0.3, Vec3::X).add_opacity_point(0.3, 0.3);
        tf.apply_preset(TransferFunctionPreset::White);
        assert_eq!(tf.color_points().len(), 1);
        assert_eq!(tf.opacity_points().len(), 2);
        assert_eq!(tf.evaluate(1.0), (Vec3::ONE, 1.0));
    }

    #[test]
    fn test_preset_index_conversion() {
        for preset in TransferFunctionPreset::ALL {
            assert_eq!(TransferFunctionPreset::from_index(preset.to_index()), preset);
        }
        assert_eq!(
            TransferFunctionPreset::from_index(42),
            TransferFunctionPreset::Head
        );
        assert_eq!(
            TransferFunctionPreset::default(),
            TransferFunctionPreset::BlueRedYellow
        );
    }

    #[test]
    fn test_preset_boundaries_match_end_points() {
        for preset in TransferFunctionPreset::ALL {
            let tf = TransferFunction::from_preset(preset);
            let colors = tf.color_points();
            let opacities = tf.opacity_points();

            assert_eq!(tf.color_at(0.0), colors[0].color, "{}", preset.name());
            assert_eq!(tf.color_at(1.0), colors[colors.len() - 1].color);
            assert_eq!(tf.opacity_at(0.0), opacities[0].opacity);
            assert_eq!(tf.opacity_at(1.0), opacities[opacities.len() - 1].opacity);
        }
    }

    #[test]
    fn test_remove_points() {
        let mut tf = TransferFunction::from_preset(TransferFunctionPreset::Aneurysm);
        let removed = tf.remove_color_point(0).unwrap();
        assert_eq!(removed.color, Vec3::ONE);
        assert_eq!(tf.color_points().len(), 2);
        assert!(tf.remove_opacity_point(5).is_none());
    }

    #[test]
    fn test_bake_lookup_table() {
        let tf = TransferFunction::from_preset(TransferFunctionPreset::White);
        let lut = tf.bake_lookup_table(5);
        assert_eq!(lut.len(), 5);
        assert_eq!(lut.texels()[0], Vec4::new(1.0, 1.0, 1.0, 0.0));
        assert_eq!(lut.texels()[2], Vec4::new(1.0, 1.0, 1.0, 0.5));
        assert_eq!(lut.texels()[4], Vec4::ONE);
        assert!((lut.sample(0.125).w - 0.125).abs() < 1e-6);
    }

    #[test]
    fn test_lut_rgba8_bytes() {
        let tf = TransferFunction::from_preset(TransferFunctionPreset::White);
        let bytes = tf.bake_lookup_table(3).to_rgba8_bytes();
        assert_eq!(bytes, vec![255, 255, 255, 0, 255, 255, 255, 128, 255, 255, 255, 255]);
    }

    #[test]
    fn test_single_sample_lut() {
        let tf = TransferFunction::from_preset(TransferFunctionPreset::BlueRedYellow);
        let lut = tf.bake_lookup_table(1);
        assert_eq!(lut.len(), 1);
        assert_eq!(lut.sample(0.7), lut.texels()[0]);
    }

    proptest! {
        #[test]
        fn later_duplicate_wins(
            p in 0.0f32..=1.0,
            o1 in 0.0f32..=1.0,
            o2 in 0.0f32..=1.0,
        ) {
            let mut tf = TransferFunction::new();
            tf.add_opacity_point(p, o1).add_opacity_point(p, o2);
            prop_assert_eq!(tf.opacity_at(p), o2);
        }

        #[test]
        fn evaluation_stays_in_range(t in -1.0f32..2.0, idx in 0u32..4) {
            let tf = TransferFunction::from_preset(TransferFunctionPreset::from_index(idx));
            let (color, opacity) = tf.evaluate(t);
            prop_assert!((0.0..=1.0).contains(&opacity));
            prop_assert!(color.cmpge(Vec3::ZERO).all() && color.cmple(Vec3::ONE).all());
        }
    }
}
