//! Generates a small dataset with a CPU ray marcher.
//!
//! Synthesizes the procedural volume, writes the volume and transfer function
//! files and captures a handful of random views into `./out`.
//!
//! Run with `RUST_LOG=info cargo run --example export_dataset`.

use volsynth::*;

/// Emission-absorption ray marcher with nearest-voxel sampling.
struct CpuRayMarcher {
    gamma: f32,
    steps: u32,
}

impl CpuRayMarcher {
    fn sample_density(field: &DensityField, bounds: &BoundingBox, p: Vec3) -> f32 {
        let res = field.resolution();
        let uvw = (p - bounds.min) / bounds.extent();
        let idx = (uvw * res.as_vec3()).floor().as_ivec3();
        let max = res.as_ivec3() - 1;
        if idx.cmplt(glam::IVec3::ZERO).any() || idx.cmpgt(max).any() {
            return 0.0;
        }
        let idx = idx.as_uvec3();
        field.value_at(idx.x, idx.y, idx.z).unwrap_or(0.0)
    }

    /// Entry and exit distances of a ray through the box, if it hits.
    fn intersect(bounds: &BoundingBox, origin: Vec3, dir: Vec3) -> Option<(f32, f32)> {
        let inv = dir.recip();
        let t0 = (bounds.min - origin) * inv;
        let t1 = (bounds.max - origin) * inv;
        let near = t0.min(t1).max_element().max(0.0);
        let far = t0.max(t1).min_element();
        (near < far).then_some((near, far))
    }
}

impl VolumeRenderer for CpuRayMarcher {
    fn render(&mut self, request: &RenderRequest<'_>) -> RenderResult<PixelImage> {
        let camera = request.camera;
        let aspect = request.width as f32 / request.height as f32;
        let depth = camera.focus_distance();
        let clip_to_world = (camera.projection_matrix(aspect, depth * 0.01, depth * 10.0)
            * camera.view_matrix())
        .inverse();
        let step = request.bounds.extent().length() / self.steps as f32;
        let exponent = 1.0 / self.gamma;

        let mut data = Vec::with_capacity(request.width as usize * request.height as usize * 4);
        for y in 0..request.height {
            for x in 0..request.width {
                let ndc_x = ((x as f32 + 0.5) / request.width as f32) * 2.0 - 1.0;
                let ndc_y = 1.0 - ((y as f32 + 0.5) / request.height as f32) * 2.0;
                let far_point = clip_to_world.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));
                let dir = (far_point - camera.eye).normalize();

                let mut color = Vec3::ZERO;
                let mut alpha = 0.0;
                if let Some((near, far)) = Self::intersect(&request.bounds, camera.eye, dir) {
                    let mut t = near;
                    while t < far && alpha < 0.99 {
                        let p = camera.eye + dir * t;
                        let density = Self::sample_density(request.field, &request.bounds, p);
                        let texel = request.lut.sample(density);
                        let a = texel.w * step * 8.0;
                        color += (1.0 - alpha) * a * texel.truncate();
                        alpha += (1.0 - alpha) * a;
                        t += step;
                    }
                }

                let rgb = color.clamp(Vec3::ZERO, Vec3::ONE).powf(exponent) * 255.0;
                data.extend_from_slice(&[rgb.x as u8, rgb.y as u8, rgb.z as u8, 255]);
            }
        }

        PixelImage::new(request.width, request.height, data, RowOrder::TopDown)
    }

    fn gamma(&self) -> f32 {
        self.gamma
    }

    fn set_gamma(&mut self, gamma: f32) {
        self.gamma = gamma;
    }
}

fn main() -> Result<()> {
    init_logging();

    let options = GeneratorOptions {
        resolution: UVec3::splat(64),
        ..GeneratorOptions::default()
    }
    .with_capture_size(128, 128)
    .with_sample_count(12)
    .with_sampling_seed(7);

    let renderer = CpuRayMarcher {
        gamma: 2.2,
        steps: 128,
    };
    let mut generator = Generator::new(options)?.with_renderer(Box::new(renderer));

    generator.synthesize()?;
    generator.apply_preset(TransferFunctionPreset::BlueRedYellow);
    generator.export_volume_data()?;
    generator.export_transfer_function()?;

    let manifest = generator.generate_samples()?;
    println!(
        "Captured {} frames into {}",
        manifest.frames.len(),
        generator.options().output_dir.display()
    );

    Ok(())
}
