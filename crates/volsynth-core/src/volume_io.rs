//! Raw-plus-header volume files.
//!
//! A volume is stored as two files: a `.vox` file holding one unsigned byte per
//! voxel in x-fastest order, and a `.hd` text header with lines of the form
//! `Identifier: v0 v1 v2`. Values may be separated by whitespace, `,` or `x`,
//! so `Size 256x256x128` and `Dimension: 256, 256, 128` are both accepted.

use std::str::FromStr;

use glam::{UVec3, Vec3};

use crate::bounds::BoundingBox;
use crate::density_field::{voxel_count, DensityField};
use crate::error::{Result, VolsynthError};

/// File extension of raw voxel data.
pub const RAW_EXTENSION: &str = "vox";

/// File extension of volume headers.
pub const HEADER_EXTENSION: &str = "hd";

/// Resolution and spacing read from a volume header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeHeader {
    /// Number of voxels along each axis.
    pub resolution: UVec3,
    /// Physical voxel spacing.
    pub spacing: Vec3,
}

impl VolumeHeader {
    /// Creates a header with unit spacing.
    pub fn new(resolution: UVec3) -> Self {
        Self {
            resolution,
            spacing: Vec3::ONE,
        }
    }

    /// Parses header text.
    ///
    /// Only `Size`/`Dimension` and `Spacing` are recognized; other identifiers
    /// are logged and skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut resolution = [-1i64; 3];
        let mut spacing = [1.0f32; 3];

        for line in text.lines() {
            let mut tokens = tokenize(line);
            let Some(identifier) = tokens.next() else {
                continue;
            };
            let identifier = identifier.strip_suffix(':').unwrap_or(identifier);
            if identifier.is_empty() {
                continue;
            }

            match identifier {
                "Size" | "Dimension" => read_values(tokens, &mut resolution),
                "Spacing" => read_values(tokens, &mut spacing),
                _ => log::warn!("unknown volume header identifier <{identifier}>"),
            }
        }

        log::debug!("[resolution] = {resolution:?}");
        log::debug!("[spacing]    = {spacing:?}");

        let mut parsed = [0u32; 3];
        for (dst, &src) in parsed.iter_mut().zip(&resolution) {
            *dst = u32::try_from(src)
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| {
                    VolsynthError::Format(format!(
                        "could not read valid resolution from header, got {resolution:?}"
                    ))
                })?;
        }

        let resolution = UVec3::from_array(parsed);
        if voxel_count(resolution).is_none() {
            return Err(VolsynthError::Format(format!(
                "resolution overflows the addressable voxel count, got {}x{}x{}",
                resolution.x, resolution.y, resolution.z
            )));
        }

        if spacing.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return Err(VolsynthError::Format(format!(
                "could not read valid spacing from header, got {spacing:?}"
            )));
        }

        Ok(Self {
            resolution,
            spacing: Vec3::from_array(spacing),
        })
    }

    /// Formats the header as written next to exported volumes.
    #[must_use]
    pub fn to_text(&self) -> String {
        let r = self.resolution;
        format!("Size {}x{}x{}", r.x, r.y, r.z)
    }
}

fn tokenize(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c.is_whitespace() || c == ',' || c == 'x')
        .filter(|token| !token.is_empty())
}

/// Reads up to three numbers, skipping tokens without a numeric prefix.
fn read_values<'a, T: FromStr>(tokens: impl Iterator<Item = &'a str>, dst: &mut [T; 3]) {
    for (slot, value) in dst.iter_mut().zip(tokens.filter_map(leading_number::<T>)) {
        *slot = value;
    }
}

/// Parses the longest numeric prefix of a token, so `256.0` reads as 256
/// for an integer and `2;` reads as 2.
fn leading_number<T: FromStr>(token: &str) -> Option<T> {
    let end = token
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')))
        .unwrap_or(token.len());
    let prefix = &token[..end];
    (1..=prefix.len())
        .rev()
        .find_map(|n| prefix[..n].parse().ok())
}

impl DensityField {
    /// Builds a field from header text and raw voxel bytes.
    ///
    /// Each byte is rescaled to `byte / 255`. The bounds are fitted to the
    /// resolution. Fails if the header is invalid or fewer bytes than voxels
    /// are given; extra trailing bytes are ignored.
    pub fn from_header_and_raw(header_text: &str, raw: &[u8]) -> Result<Self> {
        let header = VolumeHeader::parse(header_text)?;
        let num_voxels = voxel_count(header.resolution).ok_or_else(|| {
            VolsynthError::Format("resolution overflows the addressable voxel count".into())
        })?;

        if raw.len() < num_voxels {
            return Err(VolsynthError::Format(format!(
                "could not read the expected number {num_voxels} of voxels but only {}",
                raw.len()
            )));
        }
        if raw.len() > num_voxels {
            log::warn!(
                "ignoring {} trailing bytes after {num_voxels} voxels",
                raw.len() - num_voxels
            );
        }

        let values = raw[..num_voxels]
            .iter()
            .map(|&byte| f32::from(byte) / 255.0)
            .collect();

        let mut field = DensityField::from_values(
            header.resolution,
            header.spacing,
            BoundingBox::default(),
            values,
        )?;
        field.fit_to_resolution();
        Ok(field)
    }

    /// Quantizes the field to one byte per voxel.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_raw_bytes(&self) -> Vec<u8> {
        self.values()
            .iter()
            .map(|&v| (255.0 * v.clamp(0.0, 1.0)) as u8)
            .collect()
    }

    /// Returns the header describing this field.
    #[must_use]
    pub fn header(&self) -> VolumeHeader {
        VolumeHeader {
            resolution: self.resolution(),
            spacing: self.spacing(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_size_with_x_separator() {
        let header = VolumeHeader::parse("Size 256x128x64").unwrap();
        assert_eq!(header.resolution, UVec3::new(256, 128, 64));
        assert_eq!(header.spacing, Vec3::ONE);
    }

    #[test]
    fn test_parse_dimension_and_spacing() {
        let text = "Dimension: 4, 4, 2\nSpacing: 0.5 0.5 1.25\n";
        let header = VolumeHeader::parse(text).unwrap();
        assert_eq!(header.resolution, UVec3::new(4, 4, 2));
        assert_eq!(header.spacing, Vec3::new(0.5, 0.5, 1.25));
    }

    #[test]
    fn test_parse_ignores_unknown_identifiers_and_blank_lines() {
        let text = "ObjectFileName: head.raw\n\nSize: 2 2 2\nElementType: MET_UCHAR";
        let header = VolumeHeader::parse(text).unwrap();
        assert_eq!(header.resolution, UVec3::splat(2));
    }

    #[test]
    fn test_parse_missing_resolution() {
        let result = VolumeHeader::parse("Spacing: 1 1 1");
        assert!(matches!(result, Err(VolsynthError::Format(_))));

        let result = VolumeHeader::parse("Size: 4 4");
        assert!(matches!(result, Err(VolsynthError::Format(_))));
    }

    #[test]
    fn test_parse_rejects_negative_spacing() {
        let result = VolumeHeader::parse("Size: 2 2 2\nSpacing: 1 -1 1");
        assert!(matches!(result, Err(VolsynthError::Format(_))));
    }

    #[test]
    fn test_header_text_round_trips() {
        let header = VolumeHeader::new(UVec3::new(3, 5, 7));
        assert_eq!(header.to_text(), "Size 3x5x7");
        assert_eq!(VolumeHeader::parse(&header.to_text()).unwrap(), header);
    }

    #[test]
    fn test_from_raw_scales_bytes() {
        let field = DensityField::from_header_and_raw("Size 2x1x1", &[0, 255]).unwrap();
        assert_eq!(field.values(), &[0.0, 1.0]);
        assert_eq!(field.bounds().extent(), Vec3::new(1.0, 0.5, 0.5));
    }

    #[test]
    fn test_from_raw_short_buffer_is_format_error() {
        let result = DensityField::from_header_and_raw("Size 2x2x2", &[0; 7]);
        assert!(matches!(result, Err(VolsynthError::Format(_))));
    }

    #[test]
    fn test_parse_reads_numeric_prefixes() {
        let header = VolumeHeader::parse("Size: 256.0 128.0 64.0").unwrap();
        assert_eq!(header.resolution, UVec3::new(256, 128, 64));

        let header = VolumeHeader::parse("Size 2; 2; 2\nSpacing 0.5mm 0.5mm 1mm").unwrap();
        assert_eq!(header.resolution, UVec3::splat(2));
        assert_eq!(header.spacing, Vec3::new(0.5, 0.5, 1.0));
    }

    #[test]
    fn test_parse_skips_tokens_without_digits() {
        let header = VolumeHeader::parse("Size: about 3 3 3").unwrap();
        assert_eq!(header.resolution, UVec3::splat(3));
    }

    #[test]
    fn test_overflowing_resolution_is_format_error() {
        let result = DensityField::from_header_and_raw(
            "Size 4294967295 4294967295 4294967295",
            &[0; 8],
        );
        assert!(matches!(result, Err(VolsynthError::Format(msg)) if msg.contains("overflows")));

        let result = DensityField::from_header_and_raw("Size 4194304 4194304 4194304", &[]);
        assert!(matches!(result, Err(VolsynthError::Format(_))));
    }

    #[test]
    fn test_from_raw_ignores_trailing_bytes() {
        let field = DensityField::from_header_and_raw("Size 1x1x1", &[51, 1, 2]).unwrap();
        assert_eq!(field.values(), &[0.2]);
    }

    #[test]
    fn test_from_raw_keeps_spacing() {
        let field =
            DensityField::from_header_and_raw("Size 1 1 1\nSpacing 2 2 3", &[0]).unwrap();
        assert_eq!(field.spacing(), Vec3::new(2.0, 2.0, 3.0));
    }

    proptest! {
        #[test]
        fn raw_round_trip_is_quantization_bounded(
            values in proptest::collection::vec(0.0f32..=1.0, 24),
        ) {
            let field = DensityField::from_values(
                UVec3::new(2, 3, 4),
                Vec3::ONE,
                BoundingBox::unit(),
                values,
            ).unwrap();

            let restored = DensityField::from_header_and_raw(
                &field.header().to_text(),
                &field.to_raw_bytes(),
            ).unwrap();

            prop_assert_eq!(restored.resolution(), field.resolution());
            for (a, b) in field.values().iter().zip(restored.values()) {
                prop_assert!((a - b).abs() <= 1.0 / 255.0 + 1e-6);
            }
        }
    }
}
