//! End-to-end scenarios: whole frames through the public entry points, and
//! cross-checks between the acceleration structures on real scenes.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use prism_rt::intersection::Intersection;
use prism_rt::math::Vec3;
use prism_rt::ray::Ray;
use prism_rt::utils::RAY_LENGTH_MAX;
use prism_rt::{
    presets, render_into, Accelerator, Config, Renderer, Sampler, Shader, ShaderChoice,
};

fn cornell_config() -> Config {
    Config {
        width: 30,
        height: 30,
        threads: 3,
        shader: ShaderChoice::Whitted,
        scene_index: 0,
        samples_pixel: 1,
        samples_light: 1,
        repeats: 1,
        accelerator: Accelerator::Bvh,
        obj_file_path: String::new(),
        mtl_file_path: String::new(),
        cam_file_path: String::new(),
    }
}

#[test]
fn whitted_cornell_box_produces_a_varied_frame() {
    let config = cornell_config();
    let mut bitmap = vec![0u32; (config.width * config.height) as usize];
    assert!(bitmap.iter().all(|&p| p == 0));

    render_into(&config, &mut bitmap).unwrap();

    let first = bitmap[0];
    assert!(
        bitmap.iter().any(|&p| p != first),
        "frame came out flat: every pixel equals {first:#010x}"
    );
}

#[test]
fn written_pixels_are_opaque_or_untouched() {
    let config = cornell_config();
    let mut bitmap = vec![0u32; (config.width * config.height) as usize];
    render_into(&config, &mut bitmap).unwrap();
    for &pixel in &bitmap {
        let alpha = pixel >> 24;
        assert!(alpha == 0 || alpha == 0xFF, "pixel {pixel:#010x}");
    }
}

#[test]
fn repeats_keep_accumulating_without_error() {
    let config = Config {
        repeats: 3,
        samples_pixel: 2,
        width: 16,
        height: 16,
        threads: 2,
        ..cornell_config()
    };
    let mut bitmap = vec![0u32; (config.width * config.height) as usize];
    render_into(&config, &mut bitmap).unwrap();
    assert!(bitmap.iter().any(|&p| p >> 24 == 0xFF));
}

/// Repeated frames continue the running per-pixel mean rather than starting
/// a new one: a pass rendered into a zeroed bitmap after two earlier passes
/// must be weighted down to a third of its single-sample value.
#[test]
fn repeated_frames_extend_the_running_mean() {
    let (scene, camera) = presets::build(0, 1.0).unwrap();
    let shader = Shader::new(scene, ShaderChoice::NoShadows, 1, Accelerator::Bvh, &camera);
    let renderer = Renderer::new(shader, camera, Sampler::constant(0.5), 32, 32, 1);
    let center = 16 * 32 + 16;

    let mut bitmap = vec![0u32; 32 * 32];
    renderer.render_frame(&mut bitmap, 2, 32 * 4);
    let first = bitmap[center];
    renderer.render_frame(&mut bitmap, 2, 32 * 4);
    assert_eq!(bitmap[center], first);
    assert_eq!(renderer.accumulated_samples(), 2);

    let mut fresh = vec![0u32; 32 * 32];
    renderer.render_frame(&mut fresh, 2, 32 * 4);
    assert_eq!(fresh[center] & 0xFF, (first & 0xFF) / 3);
}

/// Shades the same probe rays through all three accelerators; the material
/// visualizer reports which surface each ray landed on, so agreement here
/// means the structures find the same closest primitives.
#[test]
fn accelerators_agree_on_probe_rays() {
    let shaders: Vec<Shader> = [Accelerator::Naive, Accelerator::RegularGrid, Accelerator::Bvh]
        .into_iter()
        .map(|accelerator| {
            let (scene, camera) = presets::build(0, 1.0).unwrap();
            Shader::new(scene, ShaderChoice::DiffuseMaterial, 1, accelerator, &camera)
        })
        .collect();
    let (_, camera) = presets::build(0, 1.0).unwrap();

    for yi in 0..5 {
        for xi in 0..5 {
            let u = 0.1 + xi as f32 * 0.2;
            let v = 0.1 + yi as f32 * 0.2;
            let ray = camera.generate_ray(u, v, 0.0, 0.0);
            let reference = shaders[0].ray_trace(&ray);
            for shader in &shaders[1..] {
                assert_eq!(
                    shader.ray_trace(&ray),
                    reference,
                    "accelerators disagree at ({u}, {v})"
                );
            }
        }
    }
}

#[test]
fn accelerators_agree_on_the_center_primary_ray() {
    let (scene, camera) = presets::build(0, 1.0).unwrap();
    let center = camera.generate_ray(0.5, 0.5, 0.0, 0.0);
    let reference = scene.trace(Intersection::miss(RAY_LENGTH_MAX), &center);
    assert!(reference.is_hit());

    for accelerator in [Accelerator::Naive, Accelerator::RegularGrid, Accelerator::Bvh] {
        let (scene, camera) = presets::build(0, 1.0).unwrap();
        let shader = Shader::new(scene, ShaderChoice::DiffuseMaterial, 1, accelerator, &camera);
        let (color, _) = shader.ray_trace(&center);
        // The center ray lands on the yellow triangle in front of the back
        // wall; its Kd identifies it.
        assert_eq!(color, Vec3::new(0.9, 0.9, 0.0), "{accelerator:?}");
    }
    assert_eq!(reference.material_index, {
        let (scene, _) = presets::build(0, 1.0).unwrap();
        scene
            .materials
            .iter()
            .position(|m| m.kd == Vec3::new(0.9, 0.9, 0.0))
            .unwrap() as i32
    });
}

#[test]
fn every_camera_ray_is_unit_length() {
    let (_, camera) = presets::build(1, 1.0).unwrap();
    for yi in 0..10 {
        for xi in 0..10 {
            let ray = camera.generate_ray(
                xi as f32 / 9.0,
                yi as f32 / 9.0,
                0.01,
                -0.01,
            );
            assert!((ray.direction.length() - 1.0).abs() < 1e-5);
        }
    }
}

#[test]
fn hits_carry_positive_length_and_unit_normals() {
    let (scene, camera) = presets::build(0, 1.0).unwrap();
    for yi in 0..8 {
        for xi in 0..8 {
            let ray = camera.generate_ray(xi as f32 / 7.0, yi as f32 / 7.0, 0.0, 0.0);
            let hit = scene.trace(Intersection::miss(RAY_LENGTH_MAX), &ray);
            if hit.material_index >= 0 {
                assert!(hit.length > 0.0);
                assert!(hit.length < RAY_LENGTH_MAX);
                assert!((hit.normal.length() - 1.0).abs() < 1e-5);
            }
        }
    }
}

#[test]
fn path_tracer_renders_the_area_light_scene() {
    let config = Config {
        scene_index: 1,
        shader: ShaderChoice::PathTracer,
        samples_pixel: 2,
        width: 24,
        height: 24,
        threads: 2,
        ..cornell_config()
    };
    let mut bitmap = vec![0u32; (config.width * config.height) as usize];
    render_into(&config, &mut bitmap).unwrap();
    let first = bitmap[0];
    assert!(bitmap.iter().any(|&p| p != first));
}

#[test]
fn depth_map_and_no_shadows_render_every_preset() {
    for scene_index in 0..4 {
        for shader in [ShaderChoice::DepthMap, ShaderChoice::NoShadows] {
            let config = Config {
                scene_index,
                shader,
                width: 16,
                height: 16,
                threads: 1,
                accelerator: Accelerator::RegularGrid,
                ..cornell_config()
            };
            let mut bitmap = vec![0u32; (config.width * config.height) as usize];
            render_into(&config, &mut bitmap)
                .unwrap_or_else(|e| panic!("scene {scene_index} {shader:?}: {e}"));
        }
    }
}

#[test]
fn unknown_scene_index_is_reported() {
    let config = Config {
        scene_index: 17,
        ..cornell_config()
    };
    let mut bitmap = vec![0u32; (config.width * config.height) as usize];
    assert!(render_into(&config, &mut bitmap).is_err());
}

#[test]
fn undersized_bitmap_is_rejected() {
    let config = cornell_config();
    let mut bitmap = vec![0u32; 8];
    assert!(render_into(&config, &mut bitmap).is_err());
}

/// Stopping an active render drains the workers within a bounded time and
/// never leaves a torn pixel: the alpha byte is either untouched or fully
/// opaque.
#[test]
fn stop_render_interrupts_a_long_frame() {
    let (scene, camera) = presets::build(1, 1.0).unwrap();
    let shader = Shader::new(scene, ShaderChoice::PathTracer, 4, Accelerator::Bvh, &camera);
    let renderer = Arc::new(Renderer::new(
        shader,
        camera,
        Sampler::static_halton(),
        128,
        128,
        512,
    ));

    let worker_view = Arc::clone(&renderer);
    let (sender, receiver) = mpsc::channel();
    let handle = thread::spawn(move || {
        let mut bitmap = vec![0u32; 128 * 128];
        worker_view.render_frame(&mut bitmap, 2, 128 * 4);
        let _ = sender.send(bitmap);
    });

    thread::sleep(Duration::from_millis(50));
    renderer.stop_render();
    // Generous bound; an un-stopped 512-spp path trace would run far longer.
    let bitmap = receiver
        .recv_timeout(Duration::from_secs(60))
        .expect("render did not stop in time");
    handle.join().unwrap();

    for &pixel in &bitmap {
        let alpha = pixel >> 24;
        assert!(alpha == 0 || alpha == 0xFF);
    }
}

#[test]
fn single_threaded_and_multi_threaded_frames_match() {
    // One light and a deterministic pixel sampler make the Whitted render
    // reproducible; tile ownership means the thread count cannot change any
    // pixel's value.
    let frame = |threads: u32| {
        let (scene, camera) = presets::build(0, 1.0).unwrap();
        let shader = Shader::new(scene, ShaderChoice::NoShadows, 1, Accelerator::Bvh, &camera);
        let renderer = Renderer::new(shader, camera, Sampler::constant(0.5), 32, 32, 1);
        let mut bitmap = vec![0u32; 32 * 32];
        renderer.render_frame(&mut bitmap, threads as usize, 32 * 4);
        bitmap
    };
    assert_eq!(frame(1), frame(4));
}

#[test]
fn ray_ids_grow_while_rendering() {
    let before = Ray::cast_count();
    let config = Config {
        width: 16,
        height: 16,
        threads: 1,
        ..cornell_config()
    };
    let mut bitmap = vec![0u32; 256];
    render_into(&config, &mut bitmap).unwrap();
    assert!(Ray::cast_count() > before);
}
