use std::sync::atomic::{AtomicU64, Ordering};

use crate::math::{Point3, Vec3};

/// Process-wide ray identifier source. Every constructed ray takes the next
/// value, which doubles as a total-rays-cast statistic.
static NEXT_RAY_ID: AtomicU64 = AtomicU64::new(0);

/// A stable identity for a primitive, usable across the per-type shape
/// vectors and the emissive triangles owned by area lights.
///
/// Rays carry the identity of the primitive they were spawned from so that
/// secondary and shadow rays never report their own origin surface as the
/// closest hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveId {
    Triangle(u32),
    Sphere(u32),
    Plane(u32),
    Light(u32),
}

/// A ray cast into the scene: an origin, a direction, the bounce depth, a
/// process-wide id, a shadow flag, and the identity of the primitive it left
/// from (if any).
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3,
    pub direction: Vec3,
    /// Number of bounces since the camera, starting at 1 for primary rays.
    pub depth: i32,
    pub id: u64,
    /// Shadow rays only need an any-hit answer, not the nearest hit.
    pub shadow: bool,
    /// The primitive this ray was spawned from, used to suppress
    /// self-intersection.
    pub source: Option<PrimitiveId>,
}

impl Ray {
    pub fn new(
        direction: Vec3,
        origin: Point3,
        depth: i32,
        shadow: bool,
        source: Option<PrimitiveId>,
    ) -> Self {
        debug_assert!(direction.is_finite(), "ray direction must be finite");
        debug_assert!(origin.is_finite(), "ray origin must be finite");
        debug_assert!(depth >= 0, "ray depth must be non-negative");
        Self {
            origin,
            direction,
            depth,
            id: NEXT_RAY_ID.fetch_add(1, Ordering::Relaxed),
            shadow,
            source,
        }
    }

    /// Evaluates the ray at parameter t. Positive t gives points ahead of the
    /// origin.
    #[inline(always)]
    pub fn at(&self, t: f32) -> Point3 {
        self.origin + self.direction * t
    }

    /// Total number of rays constructed by the process so far.
    pub fn cast_count() -> u64 {
        NEXT_RAY_ID.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_increasing() {
        let a = Ray::new(Vec3::unit_z(), Vec3::zero(), 1, false, None);
        let b = Ray::new(Vec3::unit_z(), Vec3::zero(), 1, false, None);
        assert!(b.id > a.id);
        assert!(Ray::cast_count() > b.id);
    }

    #[test]
    fn at_walks_along_the_direction() {
        let ray = Ray::new(Vec3::unit_x(), Vec3::new(1.0, 0.0, 0.0), 1, false, None);
        assert_eq!(ray.at(2.0), Vec3::new(3.0, 0.0, 0.0));
    }
}
