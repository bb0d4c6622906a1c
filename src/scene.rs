//! The scene container: homogeneous shape vectors, the deduplicated material
//! table, and the owned lights. Populated by a loader or a preset factory,
//! then read-only for the lifetime of a render.

use crate::aabb::{surrounding_box, Aabb};
use crate::intersection::Intersection;
use crate::material::Material;
use crate::math::{Point3, Vec3};
use crate::lights::{AreaLight, Light, PointLight};
use crate::ray::{PrimitiveId, Ray};
use crate::sampler::Sampler;
use crate::shapes::{Plane, Shape, Sphere, Triangle};
use crate::utils::RAY_LENGTH_MAX;

#[derive(Default)]
pub struct Scene {
    pub triangles: Vec<Triangle>,
    pub spheres: Vec<Sphere>,
    pub planes: Vec<Plane>,
    pub materials: Vec<Material>,
    pub lights: Vec<Light>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a material, reusing an existing ε-equal entry, and returns its
    /// index. Shapes refer to materials only through these indices.
    pub fn add_material(&mut self, material: Material) -> i32 {
        if let Some(index) = self.materials.iter().position(|m| *m == material) {
            return index as i32;
        }
        self.materials.push(material);
        (self.materials.len() - 1) as i32
    }

    /// Adds a triangle, assigning it a stable identity.
    pub fn add_triangle(&mut self, triangle: Triangle) {
        let id = PrimitiveId::Triangle(self.triangles.len() as u32);
        self.triangles.push(triangle.with_id(id));
    }

    pub fn add_sphere(&mut self, sphere: Sphere) {
        let id = PrimitiveId::Sphere(self.spheres.len() as u32);
        self.spheres.push(sphere.with_id(id));
    }

    pub fn add_plane(&mut self, plane: Plane) {
        let id = PrimitiveId::Plane(self.planes.len() as u32);
        self.planes.push(plane.with_id(id));
    }

    pub fn add_point_light(&mut self, radiance: Material, position: Point3) {
        let emission = radiance.le;
        let material_index = self.add_material(radiance);
        self.lights.push(Light::Point(PointLight {
            emission,
            material_index,
            position,
        }));
    }

    /// Adds an emissive triangle sampled over its area by the given sampler.
    pub fn add_area_light(
        &mut self,
        radiance: Material,
        sampler: Sampler,
        point_a: Point3,
        point_b: Point3,
        point_c: Point3,
    ) {
        let emission = radiance.le;
        let material_index = self.add_material(radiance);
        let id = PrimitiveId::Light(self.lights.len() as u32);
        let triangle = Triangle::new(point_a, point_b, point_c, material_index).with_id(id);
        self.lights.push(Light::Area(AreaLight::new(
            emission,
            material_index,
            triangle,
            sampler,
        )));
    }

    pub fn primitive_count(&self) -> usize {
        self.triangles.len() + self.spheres.len() + self.planes.len()
    }

    /// Nearest hit over every shape and light in the scene. The reference
    /// answer the accelerators must agree with.
    pub fn trace(&self, mut intersection: Intersection, ray: &Ray) -> Intersection {
        intersection = trace_all(&self.triangles, intersection, ray);
        intersection = trace_all(&self.spheres, intersection, ray);
        intersection = trace_all(&self.planes, intersection, ray);
        self.trace_lights(intersection, ray)
    }

    /// Any-hit variant: exits on the first hit closer than the incoming
    /// length.
    pub fn shadow_trace(&self, mut intersection: Intersection, ray: &Ray) -> Intersection {
        let last_length = intersection.length;
        intersection = shadow_trace_all(&self.triangles, intersection, ray);
        if intersection.length < last_length {
            return intersection;
        }
        intersection = shadow_trace_all(&self.spheres, intersection, ray);
        if intersection.length < last_length {
            return intersection;
        }
        shadow_trace_all(&self.planes, intersection, ray)
    }

    /// Runs only the light intersection passes (area lights have a surface).
    pub fn trace_lights(&self, mut intersection: Intersection, ray: &Ray) -> Intersection {
        for light in &self.lights {
            intersection = light.intersect(intersection, ray);
        }
        intersection
    }

    /// Rewinds per-light sampling state; called between frames.
    pub fn reset_sampling(&self) {
        for light in &self.lights {
            light.reset_sampling();
        }
    }

    /// The union of the bounding boxes of every shape, folded into the given
    /// corners. Callers seed with an inverted box and fold cameras in
    /// afterwards.
    pub fn grow_bounds(&self, min: &mut Vec3, max: &mut Vec3) {
        grow_bounds_of(&self.triangles, min, max);
        grow_bounds_of(&self.spheres, min, max);
        grow_bounds_of(&self.planes, min, max);
    }

    /// The bounding box of the whole scene geometry, or a unit box at the
    /// origin when the scene is empty.
    pub fn bounds(&self) -> Aabb {
        let mut min = Vec3::splat(RAY_LENGTH_MAX);
        let mut max = Vec3::splat(-RAY_LENGTH_MAX);
        self.grow_bounds(&mut min, &mut max);
        if min.x > max.x {
            return Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5));
        }
        Aabb { min, max }
    }
}

fn trace_all<S: Shape>(shapes: &[S], mut intersection: Intersection, ray: &Ray) -> Intersection {
    for shape in shapes {
        intersection = shape.intersect(intersection, ray);
    }
    intersection
}

fn shadow_trace_all<S: Shape>(
    shapes: &[S],
    mut intersection: Intersection,
    ray: &Ray,
) -> Intersection {
    let last_length = intersection.length;
    for shape in shapes {
        intersection = shape.intersect(intersection, ray);
        if intersection.length < last_length {
            return intersection;
        }
    }
    intersection
}

fn grow_bounds_of<S: Shape>(shapes: &[S], min: &mut Vec3, max: &mut Vec3) {
    for shape in shapes {
        let aabb = shape.aabb();
        *min = min.min(aabb.min);
        *max = max.max(aabb.max);
    }
}

/// Folds a set of boxes into one; `None` when the set is empty.
pub fn bounds_of<S: Shape>(shapes: &[S]) -> Option<Aabb> {
    let mut iter = shapes.iter();
    let first = iter.next()?.aabb();
    Some(iter.fold(first, |acc, shape| surrounding_box(&acc, &shape.aabb())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Color;

    #[test]
    fn materials_deduplicate_on_insert() {
        let mut scene = Scene::new();
        let a = scene.add_material(Material::lambertian(Color::new(0.9, 0.0, 0.0)));
        let b = scene.add_material(Material::lambertian(Color::new(0.0, 0.9, 0.0)));
        let c = scene.add_material(Material::lambertian(Color::new(0.9, 0.0, 0.0)));
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(scene.materials.len(), 2);
    }

    #[test]
    fn shapes_receive_sequential_identities() {
        let mut scene = Scene::new();
        scene.add_sphere(Sphere::new(Vec3::zero(), 1.0, 0));
        scene.add_sphere(Sphere::new(Vec3::unit_x(), 1.0, 0));
        assert_eq!(scene.spheres[0].id, PrimitiveId::Sphere(0));
        assert_eq!(scene.spheres[1].id, PrimitiveId::Sphere(1));
    }

    #[test]
    fn trace_returns_the_nearest_of_several_hits() {
        let mut scene = Scene::new();
        let mat = scene.add_material(Material::lambertian(Color::splat(0.5)));
        scene.add_sphere(Sphere::new(Vec3::new(0.0, 0.0, 5.0), 1.0, mat));
        scene.add_sphere(Sphere::new(Vec3::new(0.0, 0.0, 10.0), 1.0, mat));
        let ray = Ray::new(Vec3::unit_z(), Vec3::zero(), 1, false, None);
        let hit = scene.trace(Intersection::miss(RAY_LENGTH_MAX), &ray);
        assert_eq!(hit.primitive, Some(PrimitiveId::Sphere(0)));
        assert!((hit.length - 4.0).abs() < 1e-4);
    }

    #[test]
    fn shadow_trace_reports_any_closer_hit() {
        let mut scene = Scene::new();
        let mat = scene.add_material(Material::lambertian(Color::splat(0.5)));
        scene.add_sphere(Sphere::new(Vec3::new(0.0, 0.0, 5.0), 1.0, mat));
        let ray = Ray::new(Vec3::unit_z(), Vec3::zero(), 1, true, None);
        let occluded = scene.shadow_trace(Intersection::miss(8.0), &ray);
        assert!(occluded.length < 8.0);
        let clear = scene.shadow_trace(Intersection::miss(3.0), &ray);
        assert_eq!(clear.length, 3.0);
    }

    #[test]
    fn collection_bounds_fold_left_to_right() {
        let spheres = vec![
            Sphere::new(Vec3::new(-2.0, 0.0, 0.0), 1.0, 0),
            Sphere::new(Vec3::new(3.0, 1.0, 0.0), 1.0, 0),
        ];
        let folded = bounds_of(&spheres).unwrap();
        assert_eq!(folded.min, Vec3::new(-3.0, -1.0, -1.0));
        assert_eq!(folded.max, Vec3::new(4.0, 2.0, 1.0));
        assert!(bounds_of::<Sphere>(&[]).is_none());
    }

    #[test]
    fn bounds_cover_all_shapes() {
        let mut scene = Scene::new();
        let mat = scene.add_material(Material::lambertian(Color::splat(0.5)));
        scene.add_sphere(Sphere::new(Vec3::new(-2.0, 0.0, 0.0), 1.0, mat));
        scene.add_sphere(Sphere::new(Vec3::new(3.0, 1.0, 0.0), 1.0, mat));
        let bounds = scene.bounds();
        assert!(bounds.min.x <= -3.0);
        assert!(bounds.max.x >= 4.0);
    }
}
