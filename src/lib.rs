//! # prism-rt
//!
//! A portable offline CPU ray tracer. The engine renders a 2D image from a
//! 3D scene description through four pluggable layers:
//!
//! - **Geometry**: triangles, spheres, and infinite planes with a Phong-like
//!   material model (Kd/Ks/Kt/Le, refraction, nearest-sample textures).
//! - **Accelerators**: exhaustive search, a uniform grid walked with a 3D
//!   DDA, and per-shape-type bounding-volume hierarchies built with a
//!   surface-area-heuristic split.
//! - **Shaders**: unshadowed direct lighting, Whitted-style recursive ray
//!   tracing, Monte Carlo path tracing with russian-roulette termination,
//!   plus depth and material visualizers.
//! - **Renderer**: a tiled multi-threaded frame loop; workers pull tiles
//!   from an atomic dispenser and accumulate samples into a packed 32-bit
//!   framebuffer with incremental averaging.
//!
//! Scene geometry normally comes from an external loader populating a
//! [`Scene`]; a few built-in demo scenes ship for the CLI and tests.

pub mod aabb;
pub mod bvh;
pub mod camera;
pub mod config;
pub mod error;
pub mod grid;
pub mod intersection;
pub mod lights;
pub mod loader;
pub mod material;
pub mod math;
pub mod naive;
pub mod presets;
pub mod ray;
pub mod renderer;
pub mod sampler;
pub mod scene;
pub mod shader;
pub mod shapes;
pub mod utils;

pub use camera::Camera;
pub use config::{Accelerator, Config, ShaderChoice};
pub use error::{Error, Result};
pub use material::{Material, Texture};
pub use renderer::Renderer;
pub use sampler::Sampler;
pub use scene::Scene;
pub use shader::Shader;

/// Renders one of the built-in scenes into a pre-allocated
/// `width * height` bitmap of packed `0xAARRGGBB` pixels (alpha forced to
/// 0xFF on every written pixel). The camera comes from the config's `.cam`
/// file when one is given, otherwise from the scene preset.
pub fn render_into(config: &Config, bitmap: &mut [u32]) -> Result<()> {
    config.validate()?;
    let aspect_ratio = config.width as f32 / config.height as f32;
    let (scene, preset_camera) = presets::build(config.scene_index, aspect_ratio)?;
    let camera = if config.cam_file_path.is_empty() {
        preset_camera
    } else {
        loader::load_camera_file(&config.cam_file_path, aspect_ratio)?
    };
    render_with_scene(config, scene, camera, bitmap)
}

/// Renders a caller-supplied scene (e.g. from an external OBJ loader) into
/// the bitmap. Repeats keep accumulating samples into the same pixels.
pub fn render_with_scene(
    config: &Config,
    scene: Scene,
    camera: Camera,
    bitmap: &mut [u32],
) -> Result<()> {
    config.validate()?;
    if scene.primitive_count() == 0 {
        return Err(Error::EmptyScene);
    }
    let pixel_count = (config.width * config.height) as usize;
    if bitmap.len() < pixel_count {
        return Err(Error::InvalidConfig(format!(
            "bitmap holds {} pixels, the frame needs {pixel_count}",
            bitmap.len()
        )));
    }

    let shader = Shader::new(
        scene,
        config.shader,
        config.samples_light,
        config.accelerator,
        &camera,
    );
    let sampler_pixel = Sampler::static_halton();
    let renderer = Renderer::new(
        shader,
        camera,
        sampler_pixel,
        config.width,
        config.height,
        config.samples_pixel,
    );

    let stride = config.width * std::mem::size_of::<u32>() as u32;
    for _ in 0..config.repeats.max(1) {
        renderer.render_frame(bitmap, config.threads as usize, stride);
    }
    Ok(())
}
