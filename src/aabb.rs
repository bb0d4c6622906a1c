use crate::math::Point3;
use crate::ray::Ray;

/// An axis-aligned bounding box with inclusive corners. Used as the bounding
/// volume in the BVH, for the regular grid's world bounds and cells, and for
/// shape/box overlap queries during accelerator construction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Aabb {
    pub min: Point3,
    pub max: Point3,
}

impl Aabb {
    /// Invariant: `max >= min` element-wise with non-zero extent. Violations
    /// are a caller bug and only checked in debug builds.
    pub fn new(min: Point3, max: Point3) -> Self {
        debug_assert!(min.is_finite() && max.is_finite(), "corners must be finite");
        debug_assert!(
            max.x >= min.x && max.y >= min.y && max.z >= min.z,
            "max must not be below min"
        );
        Self { min, max }
    }

    /// A degenerate box covering a single point. Cameras contribute their
    /// position to the scene bounds through this.
    pub fn point(p: Point3) -> Self {
        Self { min: p, max: p }
    }

    /// Slab-method ray/box test. The per-axis min/max formulation tolerates
    /// infinite reciprocals from axis-parallel rays.
    pub fn intersect(&self, ray: &Ray) -> bool {
        let inv_dir_x = 1.0 / ray.direction.x;
        let t1x = (self.min.x - ray.origin.x) * inv_dir_x;
        let t2x = (self.max.x - ray.origin.x) * inv_dir_x;
        let mut t_min = t1x.min(t2x);
        let mut t_max = t1x.max(t2x);

        for axis in 1..3 {
            let inv_dir = 1.0 / ray.direction[axis];
            let t1 = (self.min[axis] - ray.origin[axis]) * inv_dir;
            let t2 = (self.max[axis] - ray.origin[axis]) * inv_dir;
            t_min = t_min.max(t1.min(t2));
            t_max = t_max.min(t1.max(t2));
        }

        t_max >= t_min.max(0.0)
    }

    /// Total area of the six faces, the cost metric of the surface-area
    /// heuristic.
    pub fn surface_area(&self) -> f32 {
        let length = self.max - self.min;
        let bottom_top = 2.0 * length.x * length.z;
        let side_xy = 2.0 * length.x * length.y;
        let side_zy = 2.0 * length.z * length.y;
        bottom_top + side_xy + side_zy
    }

    pub fn centroid(&self) -> Point3 {
        self.min + (self.max - self.min) / 2.0
    }

    /// True when `other` lies entirely inside this box.
    pub fn contains(&self, other: &Aabb) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.min.z <= other.min.z
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
            && self.max.z >= other.max.z
    }

    /// Index of the longest extent (0 = x, 1 = y, 2 = z), the split dimension
    /// for BVH construction.
    pub fn longest_axis(&self) -> usize {
        let d = self.max - self.min;
        if d.x > d.y && d.x > d.z {
            0
        } else if d.y > d.z {
            1
        } else {
            2
        }
    }
}

/// The union of two boxes: the smallest box containing both.
pub fn surrounding_box(a: &Aabb, b: &Aabb) -> Aabb {
    Aabb {
        min: a.min.min(b.min),
        max: a.max.max(b.max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::zero(), Vec3::ones())
    }

    #[test]
    fn union_contains_both_operands() {
        let a = unit_box();
        let b = Aabb::new(Vec3::new(2.0, -1.0, 0.5), Vec3::new(3.0, 0.0, 2.0));
        let u = surrounding_box(&a, &b);
        assert!(u.contains(&a));
        assert!(u.contains(&b));
    }

    #[test]
    fn union_with_self_is_identity() {
        let a = unit_box();
        assert_eq!(surrounding_box(&a, &a), a);
    }

    #[test]
    fn slab_test_hits_and_misses() {
        let b = unit_box();
        let hit = Ray::new(Vec3::unit_z(), Vec3::new(0.5, 0.5, -2.0), 1, false, None);
        assert!(b.intersect(&hit));
        let miss = Ray::new(Vec3::unit_z(), Vec3::new(2.5, 0.5, -2.0), 1, false, None);
        assert!(!b.intersect(&miss));
        // Ray starting inside the box still intersects.
        let inside = Ray::new(Vec3::unit_y(), Vec3::new(0.5, 0.5, 0.5), 1, false, None);
        assert!(b.intersect(&inside));
        // Box entirely behind the origin does not.
        let behind = Ray::new(Vec3::unit_z(), Vec3::new(0.5, 0.5, 3.0), 1, false, None);
        assert!(!b.intersect(&behind));
    }

    #[test]
    fn axis_parallel_ray_uses_infinite_reciprocals() {
        let b = unit_box();
        let parallel = Ray::new(Vec3::unit_x(), Vec3::new(-1.0, 0.5, 0.5), 1, false, None);
        assert!(b.intersect(&parallel));
        let offset = Ray::new(Vec3::unit_x(), Vec3::new(-1.0, 2.0, 0.5), 1, false, None);
        assert!(!b.intersect(&offset));
    }

    #[test]
    fn surface_area_of_unit_cube() {
        assert_eq!(unit_box().surface_area(), 6.0);
    }

    #[test]
    fn longest_axis_picks_the_widest_extent() {
        let b = Aabb::new(Vec3::zero(), Vec3::new(1.0, 3.0, 2.0));
        assert_eq!(b.longest_axis(), 1);
    }
}
