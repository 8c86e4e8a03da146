//! Volume and transfer-function files written next to a dataset.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use volsynth_core::{DensityField, Result, VolsynthError, HEADER_EXTENSION, RAW_EXTENSION};
use volsynth_render::{save_lut_strip, TransferLut};

use crate::exporter::screenshot_error;

/// Stem of the exported volume files.
pub const VOLUME_FILE_STEM: &str = "volume_data";

/// File name of the exported transfer-function strip.
pub const TRANSFER_FUNCTION_FILE_NAME: &str = "transfer_function.png";

/// Paths written by [`export_volume_data`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeFiles {
    /// One byte per voxel.
    pub raw: PathBuf,
    /// Text header with the resolution.
    pub header: PathBuf,
}

/// Writes `<out>/volume_data.vox` and `<out>/volume_data.hd`.
pub fn export_volume_data(field: &DensityField, out_dir: &Path) -> Result<VolumeFiles> {
    fs::create_dir_all(out_dir)?;
    let stem = out_dir.join(VOLUME_FILE_STEM);
    let files = VolumeFiles {
        raw: stem.with_extension(RAW_EXTENSION),
        header: stem.with_extension(HEADER_EXTENSION),
    };

    fs::write(&files.raw, field.to_raw_bytes())?;
    fs::write(&files.header, field.header().to_text())?;

    log::info!("Wrote volume data to file: {}", files.raw.display());
    Ok(files)
}

/// Writes the lookup table as `<out>/transfer_function.png`, one pixel tall.
pub fn export_transfer_function(lut: &TransferLut, out_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(TRANSFER_FUNCTION_FILE_NAME);
    save_lut_strip(&path, lut).map_err(screenshot_error)?;
    log::info!("Wrote transfer function to file: {}", path.display());
    Ok(path)
}

/// Returns the header and raw paths for either file of a pair.
///
/// The extension is matched case-insensitively.
pub fn paired_volume_paths(path: &Path) -> Result<VolumeFiles> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if extension == HEADER_EXTENSION {
        Ok(VolumeFiles {
            raw: path.with_extension(RAW_EXTENSION),
            header: path.to_path_buf(),
        })
    } else if extension == RAW_EXTENSION {
        Ok(VolumeFiles {
            raw: path.to_path_buf(),
            header: path.with_extension(HEADER_EXTENSION),
        })
    } else {
        Err(VolsynthError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "expected a .{HEADER_EXTENSION} or .{RAW_EXTENSION} file, got {}",
                path.display()
            ),
        )))
    }
}

/// Loads a field from a `.hd`/`.vox` pair given the path of either file.
pub fn load_volume_from_file(path: &Path) -> Result<DensityField> {
    let files = paired_volume_paths(path)?;
    for file in [&files.header, &files.raw] {
        if !file.exists() {
            return Err(VolsynthError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("missing volume file {}", file.display()),
            )));
        }
    }

    log::info!("Loading volume from: {}", files.raw.display());
    let header_text = fs::read_to_string(&files.header)?;
    let raw = fs::read(&files.raw)?;
    DensityField::from_header_and_raw(&header_text, &raw)
}
