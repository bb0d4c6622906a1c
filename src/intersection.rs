use crate::math::{Point3, Vec2, Vec3};
use crate::ray::PrimitiveId;

/// The record of a ray/surface hit: the hit point, the unit surface normal,
/// the parametric distance along the ray, the index of the surface material
/// (-1 while nothing was hit), the interpolated texture coordinates, and the
/// identity of the hit primitive.
///
/// Intersection queries thread a value of this type through every candidate
/// primitive; a primitive only replaces it when it finds a strictly closer
/// hit, so the final value is the nearest intersection.
#[derive(Debug, Clone, Copy)]
pub struct Intersection {
    pub point: Point3,
    pub normal: Vec3,
    pub length: f32,
    pub material_index: i32,
    pub tex_coords: Vec2,
    pub primitive: Option<PrimitiveId>,
}

impl Intersection {
    /// A query that has not hit anything closer than `length`. Shadow queries
    /// seed this with the distance to the light.
    pub fn miss(length: f32) -> Self {
        Self {
            point: Point3::zero(),
            normal: Vec3::zero(),
            length,
            material_index: -1,
            tex_coords: Vec2::zero(),
            primitive: None,
        }
    }

    pub fn hit(
        point: Point3,
        length: f32,
        normal: Vec3,
        primitive: PrimitiveId,
        material_index: i32,
        tex_coords: Vec2,
    ) -> Self {
        debug_assert!(length > 0.0, "hit distance must be positive");
        debug_assert!(
            (normal.length() - 1.0).abs() < 1e-4,
            "hit normal must be unit length"
        );
        Self {
            point,
            normal,
            length,
            material_index,
            tex_coords,
            primitive: Some(primitive),
        }
    }

    /// Whether this record describes an actual surface hit.
    pub fn is_hit(&self) -> bool {
        self.material_index >= 0 || self.primitive.is_some()
    }
}
