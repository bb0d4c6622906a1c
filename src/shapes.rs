//! The geometric primitives: triangles, spheres, and infinite planes.
//!
//! Every shape answers three queries: nearest intersection against a ray
//! (threading an [`Intersection`] through and only replacing it on a strictly
//! closer hit), its bounding box, and whether it overlaps an axis-aligned box
//! (used by the grid and BVH builders).

use crate::aabb::Aabb;
use crate::intersection::Intersection;
use crate::math::{Point3, Vec2, Vec3};
use crate::ray::{PrimitiveId, Ray};
use crate::utils::EPSILON;

/// The capability set shared by all primitives, the seam the accelerators
/// are generic over. Keeping one homogeneous vector per concrete shape type
/// avoids dynamic dispatch in the traversal inner loops.
pub trait Shape: Send + Sync {
    fn intersect(&self, intersection: Intersection, ray: &Ray) -> Intersection;
    fn aabb(&self) -> Aabb;
    fn intersects_box(&self, aabb: &Aabb) -> bool;
}

// ─── Triangle ───────────────────────────────────────────────────────────────

/// A triangle stored as an anchor vertex plus two edge vectors (A, AB, AC),
/// with per-vertex normals and texture coordinates interpolated
/// barycentrically at the hit point.
#[derive(Debug, Clone)]
pub struct Triangle {
    point_a: Point3,
    ab: Vec3,
    ac: Vec3,
    normal_a: Vec3,
    normal_b: Vec3,
    normal_c: Vec3,
    uv_a: Vec2,
    uv_b: Vec2,
    uv_c: Vec2,
    pub material_index: i32,
    pub id: PrimitiveId,
}

impl Triangle {
    /// Builds a triangle from its three vertices. Vertex normals default to
    /// the face normal `normalize(AC × AB)`; texture coordinates to zero.
    pub fn new(point_a: Point3, point_b: Point3, point_c: Point3, material_index: i32) -> Self {
        let ab = point_b - point_a;
        let ac = point_c - point_a;
        let face_normal = ac.cross(ab).normalized();
        debug_assert!(face_normal.is_finite(), "degenerate triangle");
        Self {
            point_a,
            ab,
            ac,
            normal_a: face_normal,
            normal_b: face_normal,
            normal_c: face_normal,
            uv_a: Vec2::zero(),
            uv_b: Vec2::zero(),
            uv_c: Vec2::zero(),
            material_index,
            id: PrimitiveId::Triangle(u32::MAX),
        }
    }

    pub fn with_normals(mut self, normal_a: Vec3, normal_b: Vec3, normal_c: Vec3) -> Self {
        self.normal_a = normal_a.normalized();
        self.normal_b = normal_b.normalized();
        self.normal_c = normal_c.normalized();
        self
    }

    pub fn with_uvs(mut self, uv_a: Vec2, uv_b: Vec2, uv_c: Vec2) -> Self {
        self.uv_a = uv_a;
        self.uv_b = uv_b;
        self.uv_c = uv_c;
        self
    }

    pub(crate) fn with_id(mut self, id: PrimitiveId) -> Self {
        self.id = id;
        self
    }

    pub fn point_a(&self) -> Point3 {
        self.point_a
    }

    pub fn ab(&self) -> Vec3 {
        self.ab
    }

    pub fn ac(&self) -> Vec3 {
        self.ac
    }

    /// Ray test against the segment lattice of the triangle's own edges,
    /// part of the conservative triangle/box overlap answer.
    fn segment_hits_box(origin: Point3, vec: Vec3, aabb: &Aabb) -> bool {
        let mut t_near = f32::MIN;
        let mut t_far = f32::MAX;
        for axis in 0..3 {
            if vec[axis].abs() < f32::EPSILON {
                // Segment parallel to the slab: outside means no overlap.
                if origin[axis] < aabb.min[axis] || origin[axis] + vec[axis] > aabb.max[axis] {
                    return false;
                }
            } else {
                let mut t1 = (aabb.min[axis] - origin[axis]) / vec[axis];
                let mut t2 = (aabb.max[axis] - origin[axis]) / vec[axis];
                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }
                t_near = t_near.max(t1);
                t_far = t_far.min(t2);
                if t_near > t_far || t_far < 0.0 {
                    return false;
                }
            }
        }
        true
    }
}

impl Shape for Triangle {
    /// Möller–Trumbore intersection. Rays whose determinant is below the
    /// parallel-ray tolerance miss, as do barycentric coordinates outside the
    /// unit triangle and distances outside (ε, current best).
    fn intersect(&self, intersection: Intersection, ray: &Ray) -> Intersection {
        if ray.source == Some(self.id) {
            return intersection;
        }

        let perpendicular = ray.direction.cross(self.ac);
        let projection = self.ab.dot(perpendicular);
        if projection.abs() < EPSILON {
            return intersection;
        }

        let inv_projection = 1.0 / projection;
        let to_origin = ray.origin - self.point_a;
        let u = inv_projection * to_origin.dot(perpendicular);
        if !(0.0..=1.0).contains(&u) {
            return intersection;
        }

        let up_perpendicular = to_origin.cross(self.ab);
        let v = inv_projection * ray.direction.dot(up_perpendicular);
        if v < 0.0 || u + v > 1.0 {
            return intersection;
        }

        let distance = inv_projection * self.ac.dot(up_perpendicular);
        if distance < EPSILON || distance >= intersection.length {
            return intersection;
        }

        let w = 1.0 - u - v;
        let normal =
            (self.normal_a * w + self.normal_b * u + self.normal_c * v).normalized();
        let tex_coords = self.uv_a * w + self.uv_b * u + self.uv_c * v;
        Intersection::hit(
            ray.at(distance),
            distance,
            normal,
            self.id,
            self.material_index,
            tex_coords,
        )
    }

    fn aabb(&self) -> Aabb {
        let point_b = self.point_a + self.ab;
        let point_c = self.point_a + self.ac;
        Aabb {
            min: self.point_a.min(point_b).min(point_c),
            max: self.point_a.max(point_b).max(point_c),
        }
    }

    /// Conservative triangle/box overlap: any edge of the triangle crossing
    /// the box, or the box diagonal crossing the triangle.
    fn intersects_box(&self, aabb: &Aabb) -> bool {
        if Self::segment_hits_box(self.point_a, self.ab, aabb)
            || Self::segment_hits_box(self.point_a, self.ac, aabb)
        {
            return true;
        }
        let point_b = self.point_a + self.ab;
        let point_c = self.point_a + self.ac;
        if Self::segment_hits_box(point_b, point_c - point_b, aabb) {
            return true;
        }

        // Box diagonal against the triangle face itself.
        let diagonal = aabb.max - aabb.min;
        let ray = Ray::new(diagonal, aabb.min, 1, false, None);
        let probe = Intersection::miss(diagonal.length().max(EPSILON));
        let result = self.intersect(probe, &ray);
        result.length < diagonal.length().max(EPSILON)
    }
}

// ─── Sphere ─────────────────────────────────────────────────────────────────

/// A sphere stored as its center and squared radius, intersected with the
/// closed-form quadratic.
#[derive(Debug, Clone)]
pub struct Sphere {
    center: Point3,
    sq_radius: f32,
    pub material_index: i32,
    pub id: PrimitiveId,
}

impl Sphere {
    pub fn new(center: Point3, radius: f32, material_index: i32) -> Self {
        debug_assert!(radius > 0.0, "sphere radius must be positive");
        Self {
            center,
            sq_radius: radius * radius,
            material_index,
            id: PrimitiveId::Sphere(u32::MAX),
        }
    }

    pub(crate) fn with_id(mut self, id: PrimitiveId) -> Self {
        self.id = id;
        self
    }

    pub fn center(&self) -> Point3 {
        self.center
    }
}

impl Shape for Sphere {
    fn intersect(&self, intersection: Intersection, ray: &Ray) -> Intersection {
        let origin_to_center = self.center - ray.origin;
        let projection = origin_to_center.dot(ray.direction);

        let a = ray.direction.dot(ray.direction);
        let b = 2.0 * -projection;
        let c = origin_to_center.length_squared() - self.sq_radius;
        let discriminant = b * b - 4.0 * a * c;
        // Tangent grazes are treated as misses along with true misses.
        if discriminant < 0.0 {
            return intersection;
        }

        let root = discriminant.sqrt();
        let distance = (-b - root).min(-b + root) / (2.0 * a);
        if distance < 1.0e-5 || distance >= intersection.length {
            return intersection;
        }

        let point = ray.at(distance);
        let normal = (point - self.center).normalized();
        Intersection::hit(
            point,
            distance,
            normal,
            self.id,
            self.material_index,
            Vec2::zero(),
        )
    }

    fn aabb(&self) -> Aabb {
        let radius = self.sq_radius.sqrt();
        Aabb {
            min: self.center - Vec3::splat(radius),
            max: self.center + Vec3::splat(radius),
        }
    }

    /// Arvo's test: squared distance from the center to the box compared
    /// against the squared radius.
    fn intersects_box(&self, aabb: &Aabb) -> bool {
        let mut d_min = 0.0f32;
        for axis in 0..3 {
            let c = self.center[axis];
            if c < aabb.min[axis] {
                d_min += (c - aabb.min[axis]) * (c - aabb.min[axis]);
            } else if c > aabb.max[axis] {
                d_min += (c - aabb.max[axis]) * (c - aabb.max[axis]);
            }
        }
        d_min <= self.sq_radius
    }
}

// ─── Plane ──────────────────────────────────────────────────────────────────

/// An infinite plane through a point with a unit normal. Its bounding box is
/// a bounded approximation spanning ±100 along an axis orthogonal to the
/// normal.
#[derive(Debug, Clone)]
pub struct Plane {
    point: Point3,
    normal: Vec3,
    pub material_index: i32,
    pub id: PrimitiveId,
}

impl Plane {
    pub fn new(point: Point3, normal: Vec3, material_index: i32) -> Self {
        Self {
            point,
            normal: normal.normalized(),
            material_index,
            id: PrimitiveId::Plane(u32::MAX),
        }
    }

    pub(crate) fn with_id(mut self, id: PrimitiveId) -> Self {
        self.id = id;
        self
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Signed distance from a point to the plane (the normal is unit length).
    fn distance(&self, point: Point3) -> f32 {
        self.normal.dot(point - self.point)
    }

    /// Some unit vector orthogonal-ish to the dominant normal axis, used to
    /// span the bounded AABB approximation.
    fn right_vector(&self) -> Vec3 {
        let abs = Vec3::new(self.normal.x.abs(), self.normal.y.abs(), self.normal.z.abs());
        let right = if abs.x >= abs.y && abs.x >= abs.z {
            Vec3::new(0.0, 1.0, 1.0)
        } else if abs.y >= abs.z {
            Vec3::new(1.0, 0.0, 1.0)
        } else {
            Vec3::new(1.0, 1.0, 0.0)
        };
        right.normalized()
    }
}

impl Shape for Plane {
    fn intersect(&self, intersection: Intersection, ray: &Ray) -> Intersection {
        if ray.source == Some(self.id) {
            return intersection;
        }

        // Parallel or contained rays miss; planes are two-sided.
        let projection = self.normal.dot(ray.direction);
        if projection.abs() < EPSILON {
            return intersection;
        }

        let to_plane = self.point - ray.origin;
        let distance = self.normal.dot(to_plane) / projection;
        if distance < EPSILON || distance >= intersection.length {
            return intersection;
        }

        Intersection::hit(
            ray.at(distance),
            distance,
            self.normal,
            self.id,
            self.material_index,
            Vec2::zero(),
        )
    }

    fn aabb(&self) -> Aabb {
        let right = self.right_vector();
        let a = self.point + right * -100.0;
        let b = self.point + right * 100.0;
        Aabb {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// The plane overlaps a box iff the box's corners do not all lie on the
    /// same side, checked via the signed distances of two opposite corners.
    fn intersects_box(&self, aabb: &Aabb) -> bool {
        let distance_max = self.distance(aabb.max);
        let distance_min = self.distance(aabb.min);
        (distance_max <= 0.0 && distance_min >= 0.0) || (distance_max >= 0.0 && distance_min <= 0.0)
    }
}
