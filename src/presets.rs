//! Built-in demo scenes, indexed the way hosts select them (0-3). Each
//! preset pairs a populated [`Scene`] with a matching camera for the given
//! image aspect ratio.

use crate::camera::Camera;
use crate::error::{Error, Result};
use crate::material::Material;
use crate::math::{Color, Vec3};
use crate::sampler::Sampler;
use crate::scene::Scene;
use crate::shapes::{Plane, Sphere, Triangle};

/// Builds a demo scene by index.
pub fn build(scene_index: i32, aspect_ratio: f32) -> Result<(Scene, Camera)> {
    match scene_index {
        0 => Ok(cornell_box(aspect_ratio)),
        1 => Ok(cornell_box_area_lights(aspect_ratio)),
        2 => Ok(spheres(aspect_ratio)),
        3 => Ok(wedge(aspect_ratio)),
        other => Err(Error::UnknownScene(other)),
    }
}

fn cornell_camera(aspect_ratio: f32) -> Camera {
    Camera::perspective(
        Vec3::new(0.0, 0.0, -3.4),
        Vec3::zero(),
        Vec3::unit_y(),
        45.0 * aspect_ratio,
        45.0,
    )
}

/// The classic five-walled box with a point light, a mirror sphere, a green
/// glossy sphere, and a yellow triangle against the back wall.
fn cornell_box(aspect_ratio: f32) -> (Scene, Camera) {
    let mut scene = Scene::new();

    scene.add_point_light(
        Material::emitter(Color::splat(0.9)),
        Vec3::new(0.0, 0.99, 0.0),
    );

    let yellow = scene.add_material(Material::lambertian(Color::new(0.9, 0.9, 0.0)));
    scene.add_triangle(Triangle::new(
        Vec3::new(0.5, -0.5, 0.99),
        Vec3::new(0.5, 0.5, 1.001),
        Vec3::new(-0.5, -0.5, 0.99),
        yellow,
    ));

    let mirror = scene.add_material(Material::new(
        Color::zero(),
        Color::splat(0.9),
        Color::zero(),
        1.0,
        Color::zero(),
    ));
    scene.add_sphere(Sphere::new(Vec3::new(0.45, -0.65, 0.4), 0.35, mirror));

    let green = scene.add_material(Material::new(
        Color::new(0.0, 0.9, 0.0),
        Color::new(0.0, 0.2, 0.0),
        Color::zero(),
        1.0,
        Color::zero(),
    ));
    scene.add_sphere(Sphere::new(Vec3::new(-0.45, -0.1, 0.0), 0.35, green));

    let light_gray = scene.add_material(Material::lambertian(Color::splat(0.7)));
    let red = scene.add_material(Material::lambertian(Color::new(0.9, 0.0, 0.0)));
    let blue = scene.add_material(Material::lambertian(Color::new(0.0, 0.0, 0.9)));

    // Back wall, floor, ceiling, left wall, right wall.
    scene.add_plane(Plane::new(
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(0.0, 0.0, -1.0),
        light_gray,
    ));
    scene.add_plane(Plane::new(
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::unit_y(),
        light_gray,
    ));
    scene.add_plane(Plane::new(
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, -1.0, 0.0),
        light_gray,
    ));
    scene.add_plane(Plane::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::unit_x(), red));
    scene.add_plane(Plane::new(
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(-1.0, 0.0, 0.0),
        blue,
    ));

    (scene, cornell_camera(aspect_ratio))
}

/// The box again, lit by a two-triangle ceiling area light, with a mirror
/// sphere and a glass sphere.
fn cornell_box_area_lights(aspect_ratio: f32) -> (Scene, Camera) {
    let mut scene = Scene::new();

    let light = Material::emitter(Color::splat(0.9));
    scene.add_area_light(
        light.clone(),
        Sampler::static_halton(),
        Vec3::new(-0.25, 0.99, -0.25),
        Vec3::new(0.25, 0.99, -0.25),
        Vec3::new(0.25, 0.99, 0.25),
    );
    scene.add_area_light(
        light,
        Sampler::static_halton(),
        Vec3::new(0.25, 0.99, 0.25),
        Vec3::new(-0.25, 0.99, 0.25),
        Vec3::new(-0.25, 0.99, -0.25),
    );

    let yellow = scene.add_material(Material::lambertian(Color::new(0.9, 0.9, 0.0)));
    scene.add_triangle(Triangle::new(
        Vec3::new(0.5, -0.5, 0.99),
        Vec3::new(0.5, 0.5, 1.001),
        Vec3::new(-0.5, -0.5, 0.99),
        yellow,
    ));

    let mirror = scene.add_material(Material::new(
        Color::zero(),
        Color::splat(0.9),
        Color::zero(),
        1.0,
        Color::zero(),
    ));
    scene.add_sphere(Sphere::new(Vec3::new(0.45, -0.65, 0.4), 0.35, mirror));

    let glass = scene.add_material(Material::new(
        Color::zero(),
        Color::zero(),
        Color::splat(0.9),
        1.1,
        Color::zero(),
    ));
    scene.add_sphere(Sphere::new(Vec3::new(-0.4, -0.3, 0.0), 0.35, glass));

    let light_gray = scene.add_material(Material::lambertian(Color::splat(0.7)));
    let red = scene.add_material(Material::lambertian(Color::new(0.9, 0.0, 0.0)));
    let blue = scene.add_material(Material::lambertian(Color::new(0.0, 0.0, 0.9)));

    scene.add_plane(Plane::new(
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(0.0, 0.0, -1.0),
        light_gray,
    ));
    scene.add_plane(Plane::new(
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::unit_y(),
        light_gray,
    ));
    scene.add_plane(Plane::new(
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, -1.0, 0.0),
        light_gray,
    ));
    scene.add_plane(Plane::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::unit_x(), red));
    scene.add_plane(Plane::new(
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(-1.0, 0.0, 0.0),
        blue,
    ));

    (scene, cornell_camera(aspect_ratio))
}

/// An open scene: a ground plane and a handful of spheres with mixed
/// materials under a high point light.
fn spheres(aspect_ratio: f32) -> (Scene, Camera) {
    let mut scene = Scene::new();

    scene.add_point_light(
        Material::emitter(Color::splat(0.9)),
        Vec3::new(0.0, 4.0, -1.0),
    );

    let ground = scene.add_material(Material::lambertian(Color::new(0.6, 0.6, 0.5)));
    scene.add_plane(Plane::new(Vec3::new(0.0, -0.5, 0.0), Vec3::unit_y(), ground));

    let salmon = scene.add_material(Material::lambertian(Color::new(0.9, 0.5, 0.4)));
    scene.add_sphere(Sphere::new(Vec3::new(-1.1, 0.0, 1.5), 0.5, salmon));

    let mirror = scene.add_material(Material::new(
        Color::zero(),
        Color::splat(0.8),
        Color::zero(),
        1.0,
        Color::zero(),
    ));
    scene.add_sphere(Sphere::new(Vec3::new(0.0, 0.1, 2.2), 0.6, mirror));

    let glass = scene.add_material(Material::new(
        Color::zero(),
        Color::zero(),
        Color::splat(0.9),
        1.1,
        Color::zero(),
    ));
    scene.add_sphere(Sphere::new(Vec3::new(1.2, 0.0, 1.4), 0.5, glass));

    let camera = Camera::perspective(
        Vec3::new(0.0, 0.5, -2.5),
        Vec3::new(0.0, 0.0, 1.5),
        Vec3::unit_y(),
        60.0 * aspect_ratio,
        60.0,
    );
    (scene, camera)
}

/// A fan of triangles, useful for exercising the triangle-heavy accelerator
/// paths without an external model.
fn wedge(aspect_ratio: f32) -> (Scene, Camera) {
    let mut scene = Scene::new();

    scene.add_point_light(
        Material::emitter(Color::splat(0.9)),
        Vec3::new(0.0, 2.5, -1.0),
    );

    let shades = [
        Color::new(0.9, 0.2, 0.2),
        Color::new(0.9, 0.6, 0.2),
        Color::new(0.8, 0.8, 0.2),
        Color::new(0.3, 0.8, 0.3),
        Color::new(0.3, 0.4, 0.9),
        Color::new(0.6, 0.3, 0.8),
    ];
    let blades = 12;
    for i in 0..blades {
        let angle = i as f32 / blades as f32 * std::f32::consts::TAU;
        let next = (i + 1) as f32 / blades as f32 * std::f32::consts::TAU;
        let material = scene.add_material(Material::lambertian(shades[i % shades.len()]));
        scene.add_triangle(Triangle::new(
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(angle.cos(), angle.sin(), 2.2),
            Vec3::new(next.cos(), next.sin(), 2.2),
            material,
        ));
    }

    let backdrop = scene.add_material(Material::lambertian(Color::splat(0.7)));
    scene.add_plane(Plane::new(
        Vec3::new(0.0, 0.0, 3.0),
        Vec3::new(0.0, 0.0, -1.0),
        backdrop,
    ));

    let camera = Camera::perspective(
        Vec3::new(0.0, 0.0, -1.5),
        Vec3::new(0.0, 0.0, 2.0),
        Vec3::unit_y(),
        50.0 * aspect_ratio,
        50.0,
    );
    (scene, camera)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_has_geometry_and_lights() {
        for index in 0..4 {
            let (scene, _) = build(index, 1.0).unwrap();
            assert!(scene.primitive_count() > 0, "scene {index}");
            assert!(!scene.lights.is_empty(), "scene {index}");
            assert!(!scene.materials.is_empty(), "scene {index}");
        }
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        assert!(matches!(build(4, 1.0), Err(Error::UnknownScene(4))));
        assert!(matches!(build(-1, 1.0), Err(Error::UnknownScene(-1))));
    }

    #[test]
    fn cornell_walls_share_the_deduplicated_gray() {
        let (scene, _) = build(0, 1.0).unwrap();
        // Back wall, floor, and ceiling reuse one material slot.
        assert_eq!(
            scene.planes[0].material_index,
            scene.planes[1].material_index
        );
        assert_eq!(
            scene.planes[1].material_index,
            scene.planes[2].material_index
        );
    }
}
