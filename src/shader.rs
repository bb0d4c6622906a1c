//! The light-transport shaders.
//!
//! A [`Shader`] owns the scene's materials and lights, plus one acceleration
//! structure per shape type built from the scene's geometry. `ray_trace`
//! finds the nearest hit through the chosen accelerator, runs the light
//! intersection pass, and hands the hit to the variant's shading routine.

use std::f32::consts::PI;
use std::sync::atomic::{AtomicU32, Ordering};

use log::info;

use crate::aabb::Aabb;
use crate::bvh::Bvh;
use crate::camera::Camera;
use crate::config::{Accelerator, ShaderChoice};
use crate::grid::RegularGrid;
use crate::intersection::Intersection;
use crate::material::Material;
use crate::math::{Color, Point3, Vec3};
use crate::naive::Naive;
use crate::ray::Ray;
use crate::sampler::{static_halton_at, Sampler};
use crate::scene::Scene;
use crate::shapes::{Plane, Sphere, Triangle};
use crate::utils::{RAY_DEPTH_MAX, RAY_DEPTH_MIN, RAY_LENGTH_MAX};

/// Grid resolution used for the regular-grid accelerator.
const GRID_SIZE: u32 = 32;

/// Counters into the shared shuffled random table for hemisphere sampling
/// and light picking. Process-wide so concurrent shade calls never repeat
/// each other's draws.
static HEMISPHERE_COUNTER: AtomicU32 = AtomicU32::new(0);
static LIGHT_COUNTER: AtomicU32 = AtomicU32::new(0);

enum ShaderKind {
    /// Direct lighting without occlusion tests, plus an ambient floor.
    NoShadows,
    /// Classic recursive ray tracing: shadowed direct lighting plus
    /// deterministic specular reflection and transmission.
    Whitted,
    /// Monte Carlo path tracing with russian-roulette termination.
    PathTracer { roulette: Sampler },
    /// Distance-to-camera visualization.
    DepthMap { max_point: Point3 },
    /// First non-zero material term, for material inspection.
    DiffuseMaterial,
}

/// One spatial structure per shape type; the shader merges their answers.
/// Keeping the per-type vectors homogeneous spares the traversal inner loops
/// any dynamic dispatch.
enum AcceleratorSet {
    Naive {
        triangles: Naive<Triangle>,
        spheres: Naive<Sphere>,
        planes: Naive<Plane>,
    },
    Grid {
        triangles: RegularGrid<Triangle>,
        spheres: RegularGrid<Sphere>,
        planes: RegularGrid<Plane>,
    },
    Bvh {
        triangles: Bvh<Triangle>,
        spheres: Bvh<Sphere>,
        planes: Bvh<Plane>,
    },
}

pub struct Shader {
    kind: ShaderKind,
    scene: Scene,
    accelerators: AcceleratorSet,
    samples_light: u32,
}

impl Shader {
    /// Builds the shader, moving the scene's geometry into the chosen
    /// acceleration structures. The camera participates in the world bounds
    /// so grid traversal can start from rays spawned at the eye.
    pub fn new(
        mut scene: Scene,
        choice: ShaderChoice,
        samples_light: u32,
        accelerator: Accelerator,
        camera: &Camera,
    ) -> Self {
        let mut min = Vec3::splat(RAY_LENGTH_MAX);
        let mut max = Vec3::splat(-RAY_LENGTH_MAX);
        scene.grow_bounds(&mut min, &mut max);
        let camera_box = camera.aabb();
        min = min.min(camera_box.min);
        max = max.max(camera_box.max);
        let world_bounds = Aabb {
            min: min - Vec3::splat(0.01),
            max: max + Vec3::splat(0.01),
        };

        let kind = match choice {
            ShaderChoice::NoShadows => ShaderKind::NoShadows,
            ShaderChoice::Whitted => ShaderKind::Whitted,
            ShaderChoice::PathTracer => ShaderKind::PathTracer {
                roulette: Sampler::static_halton(),
            },
            ShaderChoice::DepthMap => ShaderKind::DepthMap {
                max_point: world_bounds.max,
            },
            ShaderChoice::DiffuseMaterial => ShaderKind::DiffuseMaterial,
        };

        let triangles = std::mem::take(&mut scene.triangles);
        let spheres = std::mem::take(&mut scene.spheres);
        let planes = std::mem::take(&mut scene.planes);
        info!(
            "shader setup: {} triangles, {} spheres, {} planes, {} lights, {:?}",
            triangles.len(),
            spheres.len(),
            planes.len(),
            scene.lights.len(),
            accelerator
        );

        let accelerators = match accelerator {
            Accelerator::Naive => AcceleratorSet::Naive {
                triangles: Naive::new(triangles),
                spheres: Naive::new(spheres),
                planes: Naive::new(planes),
            },
            Accelerator::RegularGrid => AcceleratorSet::Grid {
                triangles: RegularGrid::new(triangles, world_bounds, GRID_SIZE),
                spheres: RegularGrid::new(spheres, world_bounds, GRID_SIZE),
                planes: RegularGrid::new(planes, world_bounds, GRID_SIZE),
            },
            Accelerator::Bvh => AcceleratorSet::Bvh {
                triangles: Bvh::new(triangles),
                spheres: Bvh::new(spheres),
                planes: Bvh::new(planes),
            },
        };

        Self {
            kind,
            scene,
            accelerators,
            samples_light,
        }
    }

    /// Radiance along a ray: the nearest hit (geometry, then lights) is
    /// shaded by the active variant. Returns the color and whether the ray
    /// ended on a light source; misses are black.
    pub fn ray_trace(&self, ray: &Ray) -> (Color, bool) {
        let intersection = Intersection::miss(RAY_LENGTH_MAX);
        let last_length = intersection.length;
        let intersection = self.trace(intersection, ray);
        let intersection = self.scene.trace_lights(intersection, ray);
        if intersection.length < last_length {
            self.shade(&intersection, ray)
        } else {
            (Color::zero(), false)
        }
    }

    /// Whether anything sits closer than the query's length along the ray.
    pub fn shadow_trace(&self, intersection: Intersection, ray: &Ray) -> bool {
        let last_length = intersection.length;
        let intersection = match &self.accelerators {
            AcceleratorSet::Naive {
                triangles,
                spheres,
                planes,
            } => {
                let intersection = triangles.shadow_trace(intersection, ray);
                if intersection.length < last_length {
                    return true;
                }
                let intersection = spheres.shadow_trace(intersection, ray);
                if intersection.length < last_length {
                    return true;
                }
                planes.shadow_trace(intersection, ray)
            }
            AcceleratorSet::Grid {
                triangles,
                spheres,
                planes,
            } => {
                let intersection = triangles.shadow_trace(intersection, ray);
                if intersection.length < last_length {
                    return true;
                }
                let intersection = spheres.shadow_trace(intersection, ray);
                if intersection.length < last_length {
                    return true;
                }
                planes.shadow_trace(intersection, ray)
            }
            AcceleratorSet::Bvh {
                triangles,
                spheres,
                planes,
            } => {
                let intersection = triangles.shadow_trace(intersection, ray);
                if intersection.length < last_length {
                    return true;
                }
                let intersection = spheres.shadow_trace(intersection, ray);
                if intersection.length < last_length {
                    return true;
                }
                planes.shadow_trace(intersection, ray)
            }
        };
        intersection.length < last_length
    }

    fn trace(&self, intersection: Intersection, ray: &Ray) -> Intersection {
        match &self.accelerators {
            AcceleratorSet::Naive {
                triangles,
                spheres,
                planes,
            } => {
                let intersection = triangles.trace(intersection, ray);
                let intersection = spheres.trace(intersection, ray);
                planes.trace(intersection, ray)
            }
            AcceleratorSet::Grid {
                triangles,
                spheres,
                planes,
            } => {
                let intersection = triangles.trace(intersection, ray);
                let intersection = spheres.trace(intersection, ray);
                planes.trace(intersection, ray)
            }
            AcceleratorSet::Bvh {
                triangles,
                spheres,
                planes,
            } => {
                let intersection = triangles.trace(intersection, ray);
                let intersection = spheres.trace(intersection, ray);
                planes.trace(intersection, ray)
            }
        }
    }

    fn shade(&self, intersection: &Intersection, ray: &Ray) -> (Color, bool) {
        match &self.kind {
            ShaderKind::NoShadows => self.shade_no_shadows(intersection),
            ShaderKind::Whitted => self.shade_whitted(intersection, ray),
            ShaderKind::PathTracer { roulette } => {
                self.shade_path_tracer(intersection, ray, roulette)
            }
            ShaderKind::DepthMap { max_point } => shade_depth_map(intersection, ray, *max_point),
            ShaderKind::DiffuseMaterial => self.shade_diffuse_material(intersection),
        }
    }

    fn material(&self, intersection: &Intersection) -> &Material {
        debug_assert!(intersection.material_index >= 0, "shading an empty hit");
        &self.scene.materials[intersection.material_index as usize]
    }

    /// Sums `samples_light` single-light estimates of the direct
    /// contribution at the hit point, optionally gating each by a shadow
    /// ray. The caller scales by Kd and the sample count.
    fn direct_lighting(&self, intersection: &Intersection, depth: i32, shadows: bool) -> Color {
        let mut accumulated = Color::zero();
        let light_count = self.scene.lights.len();
        for _ in 0..self.samples_light {
            let light = &self.scene.lights[pick_light(light_count)];
            let light_position = light.sample_position();
            let to_light = light_position - intersection.point;
            let distance_to_light = to_light.length();
            let to_light = to_light / distance_to_light;
            let cos_normal_light = intersection.normal.dot(to_light);
            if cos_normal_light > 0.0 {
                let visible = !shadows || {
                    let shadow_ray = Ray::new(
                        to_light,
                        intersection.point,
                        depth + 1,
                        true,
                        intersection.primitive,
                    );
                    let occlusion = Intersection::miss(distance_to_light);
                    !self.shadow_trace(occlusion, &shadow_ray)
                };
                if visible {
                    accumulated += light.emission() * cos_normal_light;
                }
            }
        }
        accumulated
    }

    fn shade_no_shadows(&self, intersection: &Intersection) -> (Color, bool) {
        let material = self.material(intersection);
        if material.le.has_positive() {
            return (material.le, true);
        }

        let kd = material.diffuse_at(intersection.tex_coords);
        let mut rgb = Color::zero();
        if kd.has_positive() && !self.scene.lights.is_empty() {
            rgb = self
                .direct_lighting(intersection, 1, false)
                .hadamard(kd)
                / self.samples_light as f32;
        }
        rgb += kd * 0.1; // ambient light
        (rgb, false)
    }

    fn shade_whitted(&self, intersection: &Intersection, ray: &Ray) -> (Color, bool) {
        if ray.depth > RAY_DEPTH_MAX {
            return (Color::zero(), false);
        }

        let material = self.material(intersection);
        if material.le.has_positive() {
            return (material.le, true);
        }

        let kd = material.diffuse_at(intersection.tex_coords);
        let ks = material.ks;
        let kt = material.kt;
        let mut rgb = Color::zero();

        if kd.has_positive() && !self.scene.lights.is_empty() {
            rgb = self
                .direct_lighting(intersection, ray.depth, true)
                .hadamard(kd)
                / self.samples_light as f32;
        }

        if ks.has_positive() {
            let reflection = ray.direction.reflect(intersection.normal);
            let specular_ray = Ray::new(
                reflection,
                intersection.point,
                ray.depth + 1,
                false,
                intersection.primitive,
            );
            let (color, _) = self.ray_trace(&specular_ray);
            rgb += ks.hadamard(color);
        }

        if kt.has_positive() {
            let transmission_ray = Ray::new(
                self.refraction_direction(ray, intersection, material),
                intersection.point,
                ray.depth + 1,
                false,
                intersection.primitive,
            );
            let (color, _) = self.ray_trace(&transmission_ray);
            rgb += kt.hadamard(color);
        }

        rgb += kd * 0.1; // ambient light
        (rgb, false)
    }

    fn shade_path_tracer(
        &self,
        intersection: &Intersection,
        ray: &Ray,
        roulette: &Sampler,
    ) -> (Color, bool) {
        if ray.depth > RAY_DEPTH_MAX {
            return (Color::zero(), false);
        }

        let material = self.material(intersection);
        if material.le.has_positive() {
            return (material.le, true);
        }

        let kd = material.diffuse_at(intersection.tex_coords);
        let ks = material.ks;
        let kt = material.kt;
        let finish_probability = 0.5f32;
        let continue_probability = 1.0 - finish_probability;

        let mut direct = Color::zero();
        let mut indirect_diffuse = Color::zero();
        let mut specular = Color::zero();
        let mut transmission = Color::zero();
        let mut intersected_light = false;

        if kd.has_positive() {
            if !self.scene.lights.is_empty() {
                direct = self
                    .direct_lighting(intersection, ray.depth, true)
                    .hadamard(kd)
                    / self.samples_light as f32;
            }

            // One cosine-weighted bounce; roulette decides survival past the
            // minimum depth, and the survivor is rescaled to stay unbiased.
            if ray.depth <= RAY_DEPTH_MIN || roulette.next() > finish_probability {
                let bounce_direction = cosine_sample_hemisphere(intersection.normal);
                let bounce_ray = Ray::new(
                    bounce_direction,
                    intersection.point,
                    ray.depth + 1,
                    false,
                    intersection.primitive,
                );
                let (color, hit_light) = self.ray_trace(&bounce_ray);
                intersected_light = hit_light;
                indirect_diffuse = kd.hadamard(color);
                if ray.depth > RAY_DEPTH_MIN {
                    indirect_diffuse /= continue_probability * 0.5;
                }
                // The direct pass already counted light hits; keeping both
                // would double count.
                if direct.has_positive() && intersected_light {
                    indirect_diffuse = Color::zero();
                }
            }
        }

        if ks.has_positive() {
            let reflection = ray.direction.reflect(intersection.normal);
            let specular_ray = Ray::new(
                reflection,
                intersection.point,
                ray.depth + 1,
                false,
                intersection.primitive,
            );
            let (color, _) = self.ray_trace(&specular_ray);
            specular = ks.hadamard(color);
        }

        if kt.has_positive() {
            let transmission_ray = Ray::new(
                self.refraction_direction(ray, intersection, material),
                intersection.point,
                ray.depth + 1,
                false,
                intersection.primitive,
            );
            let (color, _) = self.ray_trace(&transmission_ray);
            transmission = kt.hadamard(color);
        }

        (
            direct + indirect_diffuse + specular + transmission,
            intersected_light,
        )
    }

    fn shade_diffuse_material(&self, intersection: &Intersection) -> (Color, bool) {
        let material = self.material(intersection);
        let rgb = if material.kd.has_positive() {
            material.kd
        } else if material.ks.has_positive() {
            material.ks
        } else if material.kt.has_positive() {
            material.kt
        } else if material.le.has_positive() {
            material.le
        } else {
            Color::zero()
        };
        (rgb, false)
    }

    /// Refraction through the hit surface; total internal reflection falls
    /// back to the mirror direction.
    fn refraction_direction(
        &self,
        ray: &Ray,
        intersection: &Intersection,
        material: &Material,
    ) -> Vec3 {
        let eta_ratio = 1.0 / material.refractive_index;
        ray.direction
            .refract(intersection.normal, eta_ratio)
            .unwrap_or_else(|| ray.direction.reflect(intersection.normal))
    }

    /// Rewinds the frame-scoped sampling state (lights, roulette).
    pub fn reset_sampling(&self) {
        self.scene.reset_sampling();
        if let ShaderKind::PathTracer { roulette } = &self.kind {
            roulette.reset();
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }
}

fn shade_depth_map(intersection: &Intersection, ray: &Ray, max_point: Point3) -> (Color, bool) {
    let max_distance = (max_point - ray.origin).length() * 1.1;
    let depth = ((max_distance - intersection.length) / max_distance).max(0.0);
    (Color::splat(depth), false)
}

/// Uniformly picks a light index. The 0.99999 factor keeps the scaled draw
/// strictly below the light count even when the draw is exactly 1.0 - ulp.
fn pick_light(light_count: usize) -> usize {
    let draw = static_halton_at(LIGHT_COUNTER.fetch_add(1, Ordering::Relaxed));
    (draw * light_count as f32 * 0.99999) as usize
}

/// A cosine-weighted direction about the surface normal: an orthonormal
/// basis {u, v, N} is built from whichever world axis is least aligned with
/// N, and the polar draw (φ = 2π·r1, cos θ = √r2) is rotated into it.
fn cosine_sample_hemisphere(normal: Vec3) -> Vec3 {
    let r1 = static_halton_at(HEMISPHERE_COUNTER.fetch_add(1, Ordering::Relaxed));
    let r2 = static_halton_at(HEMISPHERE_COUNTER.fetch_add(1, Ordering::Relaxed));

    let phi = 2.0 * PI * r1;
    let cos_theta = r2.sqrt();

    let pole = if normal.x.abs() > 0.1 {
        Vec3::unit_y()
    } else {
        Vec3::unit_x()
    };
    let u = pole.cross(normal).normalized();
    let v = normal.cross(u);

    (u * (phi.cos() * cos_theta) + v * (phi.sin() * cos_theta) + normal * (1.0 - r2).sqrt())
        .normalized()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use approx::assert_abs_diff_eq;

    fn single_sphere_scene() -> Scene {
        let mut scene = Scene::new();
        let mat = scene.add_material(Material::lambertian(Color::new(0.9, 0.2, 0.2)));
        scene.add_sphere(Sphere::new(Vec3::new(0.0, 0.0, 3.0), 1.0, mat));
        scene.add_point_light(
            Material::emitter(Color::splat(0.9)),
            Vec3::new(0.0, 3.0, 0.0),
        );
        scene
    }

    fn eye_camera() -> Camera {
        Camera::perspective(
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::zero(),
            Vec3::unit_y(),
            60.0,
            60.0,
        )
    }

    #[test]
    fn hemisphere_samples_lie_above_the_surface() {
        for normal in [Vec3::unit_y(), Vec3::unit_x(), -Vec3::unit_z()] {
            for _ in 0..200 {
                let direction = cosine_sample_hemisphere(normal);
                assert_abs_diff_eq!(direction.length(), 1.0, epsilon = 1e-4);
                assert!(direction.dot(normal) > -1e-4);
            }
        }
    }

    #[test]
    fn light_picking_never_goes_out_of_range() {
        for _ in 0..10_000 {
            assert!(pick_light(3) < 3);
        }
    }

    #[test]
    fn miss_is_black_and_not_a_light() {
        let camera = eye_camera();
        let shader = Shader::new(
            single_sphere_scene(),
            ShaderChoice::Whitted,
            1,
            Accelerator::Naive,
            &camera,
        );
        let ray = Ray::new(-Vec3::unit_z(), Vec3::new(0.0, 0.0, -1.0), 1, false, None);
        let (color, hit_light) = shader.ray_trace(&ray);
        assert_eq!(color, Color::zero());
        assert!(!hit_light);
    }

    #[test]
    fn lit_sphere_is_brighter_than_ambient() {
        let camera = eye_camera();
        let shader = Shader::new(
            single_sphere_scene(),
            ShaderChoice::Whitted,
            4,
            Accelerator::Naive,
            &camera,
        );
        let ray = Ray::new(Vec3::unit_z(), Vec3::new(0.0, 0.0, -1.0), 1, false, None);
        let (color, hit_light) = shader.ray_trace(&ray);
        assert!(!hit_light);
        // Ambient alone would be 0.09 in the red channel.
        assert!(color.x > 0.09, "color = {color}");
    }

    #[test]
    fn depth_map_is_brighter_up_close() {
        let camera = eye_camera();
        let mut scene = single_sphere_scene();
        let mat = scene.add_material(Material::lambertian(Color::splat(0.5)));
        scene.add_sphere(Sphere::new(Vec3::new(3.0, 0.0, 8.0), 1.0, mat));
        let shader = Shader::new(
            scene,
            ShaderChoice::DepthMap,
            1,
            Accelerator::Naive,
            &camera,
        );
        let origin = Vec3::new(0.0, 0.0, -1.0);
        let near = Ray::new(Vec3::unit_z(), origin, 1, false, None);
        let far_target = Vec3::new(3.0, 0.0, 8.0);
        let far = Ray::new((far_target - origin).normalized(), origin, 1, false, None);
        let (near_color, _) = shader.ray_trace(&near);
        let (far_color, _) = shader.ray_trace(&far);
        assert!(near_color.x > far_color.x);
    }

    #[test]
    fn diffuse_material_shader_reports_kd() {
        let camera = eye_camera();
        let shader = Shader::new(
            single_sphere_scene(),
            ShaderChoice::DiffuseMaterial,
            1,
            Accelerator::Naive,
            &camera,
        );
        let ray = Ray::new(Vec3::unit_z(), Vec3::new(0.0, 0.0, -1.0), 1, false, None);
        let (color, _) = shader.ray_trace(&ray);
        assert_eq!(color, Color::new(0.9, 0.2, 0.2));
    }

    #[test]
    fn emissive_surfaces_terminate_with_their_radiance() {
        let camera = eye_camera();
        let mut scene = Scene::new();
        let glow = scene.add_material(Material::emitter(Color::new(0.0, 0.9, 0.0)));
        scene.add_sphere(Sphere::new(Vec3::new(0.0, 0.0, 3.0), 1.0, glow));
        let shader = Shader::new(
            scene,
            ShaderChoice::PathTracer,
            1,
            Accelerator::Naive,
            &camera,
        );
        let ray = Ray::new(Vec3::unit_z(), Vec3::new(0.0, 0.0, -1.0), 1, false, None);
        let (color, hit_light) = shader.ray_trace(&ray);
        assert!(hit_light);
        assert_eq!(color, Color::new(0.0, 0.9, 0.0));
    }

    #[test]
    fn whitted_depth_limit_stops_recursion() {
        let camera = eye_camera();
        // Two facing mirrors bounce forever without the depth bound.
        let mut scene = Scene::new();
        let mirror = scene.add_material(Material::new(
            Color::zero(),
            Color::splat(0.9),
            Color::zero(),
            1.0,
            Color::zero(),
        ));
        scene.add_plane(Plane::new(Vec3::new(0.0, 0.0, 2.0), -Vec3::unit_z(), mirror));
        scene.add_plane(Plane::new(Vec3::new(0.0, 0.0, -2.0), Vec3::unit_z(), mirror));
        let shader = Shader::new(scene, ShaderChoice::Whitted, 1, Accelerator::Naive, &camera);
        let ray = Ray::new(Vec3::unit_z(), Vec3::zero(), 1, false, None);
        // Completing at all proves the bound; the result must be finite.
        let (color, _) = shader.ray_trace(&ray);
        assert!(color.is_finite());
    }
}
