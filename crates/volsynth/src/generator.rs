//! The generator session: one field, one transfer function, one renderer.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use volsynth_core::{DensityField, GeneratorOptions, Result, UVec3, VolsynthError};
use volsynth_render::{TransferFunction, TransferFunctionPreset, TransferLut, VolumeRenderer};

use crate::artifacts::{self, VolumeFiles};
use crate::exporter::{DatasetExporter, ExportState};
use crate::manifest::DatasetManifest;

/// Owns the state edited by a host application and exposes its operations.
///
/// The field and transfer function are lent immutably to the renderer for
/// the duration of one draw.
pub struct Generator {
    options: GeneratorOptions,
    field: DensityField,
    transfer_function: TransferFunction,
    renderer: Option<Box<dyn VolumeRenderer>>,
    exporter: DatasetExporter,
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("options", &self.options)
            .field("field", &format_args!("{}", self.field))
            .field("transfer_function", &self.transfer_function)
            .field("has_renderer", &self.renderer.is_some())
            .field("exporter", &self.exporter)
            .finish()
    }
}

impl Generator {
    /// Creates a session with an empty field of the configured resolution.
    ///
    /// Call [`Generator::synthesize`] or [`Generator::load_volume`] to fill it.
    pub fn new(options: GeneratorOptions) -> Result<Self> {
        options.validate()?;
        let field = DensityField::new(options.resolution, options.bounding_box)?;
        let transfer_function = TransferFunction::from_preset(TransferFunctionPreset::from_index(
            options.transfer_function_preset,
        ));
        Ok(Self {
            options,
            field,
            transfer_function,
            renderer: None,
            exporter: DatasetExporter::new(),
        })
    }

    /// Attaches a renderer, returning this session.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Box<dyn VolumeRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Attaches or replaces the renderer.
    pub fn attach_renderer(&mut self, renderer: Box<dyn VolumeRenderer>) {
        self.renderer = Some(renderer);
    }

    /// Detaches the renderer.
    pub fn detach_renderer(&mut self) -> Option<Box<dyn VolumeRenderer>> {
        self.renderer.take()
    }

    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    pub fn renderer(&self) -> Option<&dyn VolumeRenderer> {
        self.renderer.as_deref()
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Replaces the options after validating them.
    ///
    /// A changed resolution reallocates the field and a changed preset index
    /// reloads the transfer function.
    pub fn set_options(&mut self, options: GeneratorOptions) -> Result<()> {
        options.validate()?;
        let preset_changed =
            options.transfer_function_preset != self.options.transfer_function_preset;
        self.field.resize(options.resolution)?;
        self.field.set_bounds(options.bounding_box);
        self.options = options;
        if preset_changed {
            self.apply_preset(TransferFunctionPreset::from_index(
                self.options.transfer_function_preset,
            ));
        }
        Ok(())
    }

    pub fn field(&self) -> &DensityField {
        &self.field
    }

    pub fn transfer_function(&self) -> &TransferFunction {
        &self.transfer_function
    }

    /// Mutable access for editing individual control points.
    pub fn transfer_function_mut(&mut self) -> &mut TransferFunction {
        &mut self.transfer_function
    }

    /// Bakes the transfer function at the configured resolution.
    pub fn lookup_table(&self) -> TransferLut {
        self.transfer_function
            .bake_lookup_table(self.options.lut_resolution)
    }

    /// Replaces the transfer function with a preset.
    pub fn apply_preset(&mut self, preset: TransferFunctionPreset) {
        self.transfer_function.apply_preset(preset);
        self.options.transfer_function_preset = preset.to_index();
        log::info!("Applied transfer function preset {}", preset.name());
    }

    /// Changes the grid resolution, discarding the field if it changes.
    ///
    /// Returns true if the grid was reallocated.
    pub fn resize(&mut self, resolution: UVec3) -> Result<bool> {
        if resolution.min_element() == 0 {
            return Err(VolsynthError::InvalidOption(format!(
                "resolution must be positive, got {}x{}x{}",
                resolution.x, resolution.y, resolution.z
            )));
        }
        let reallocated = self.field.resize(resolution)?;
        self.options.resolution = resolution;
        Ok(reallocated)
    }

    /// Synthesizes the procedural field from the current options.
    pub fn synthesize(&mut self) -> Result<()> {
        self.field.synthesize(
            self.options.resolution,
            self.options.bounding_box,
            self.options.synthesis_seed,
        )?;
        log::info!("Synthesized volume ({})", self.field);
        Ok(())
    }

    /// Loads a `.hd`/`.vox` pair. On failure the current field is kept.
    pub fn load_volume(&mut self, path: &Path) -> Result<()> {
        let field = artifacts::load_volume_from_file(path)?;
        self.options.resolution = field.resolution();
        self.options.bounding_box = field.bounds();
        self.field = field;
        log::info!("Loaded volume ({})", self.field);
        Ok(())
    }

    pub fn fit_to_resolution(&mut self) {
        self.field.fit_to_resolution();
        self.options.bounding_box = self.field.bounds();
    }

    pub fn fit_to_spacing(&mut self) {
        self.field.fit_to_spacing();
        self.options.bounding_box = self.field.bounds();
    }

    pub fn fit_to_resolution_and_spacing(&mut self) {
        self.field.fit_to_resolution_and_spacing();
        self.options.bounding_box = self.field.bounds();
    }

    /// Writes the quantized field and its header into the output root.
    pub fn export_volume_data(&self) -> Result<VolumeFiles> {
        artifacts::export_volume_data(&self.field, &self.options.output_dir)
    }

    /// Writes the baked transfer function into the output root.
    pub fn export_transfer_function(&self) -> Result<PathBuf> {
        artifacts::export_transfer_function(&self.lookup_table(), &self.options.output_dir)
    }

    /// Installs a flag that cancels a running export between frames.
    pub fn set_cancel_flag(&mut self, flag: Option<Arc<AtomicBool>>) {
        self.exporter.set_cancel_flag(flag);
    }

    /// Phase of the dataset exporter.
    pub fn export_state(&self) -> ExportState {
        self.exporter.state()
    }

    /// Renders and captures `sample_count` random views and writes the
    /// manifest.
    pub fn generate_samples(&mut self) -> Result<DatasetManifest> {
        let lut = self.lookup_table();
        self.exporter.run(
            self.renderer.as_deref_mut(),
            &self.field,
            &lut,
            &self.options,
        )
    }
}
