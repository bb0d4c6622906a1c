//! Primary ray generation.
//!
//! Both camera models share a left-handed orthonormal frame built from
//! position / look-at / up, and the atomic tile dispenser that hands frame
//! tiles to render workers in a pre-shuffled space-filling order.

use std::f32::consts::FRAC_PI_4;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use rand::seq::SliceRandom;

use crate::aabb::Aabb;
use crate::math::{Point3, Vec3};
use crate::ray::Ray;
use crate::utils::{halton_sequence, NUMBER_OF_TILES};

/// The shared tile ordering: a shuffled base-2 Halton sequence over the tile
/// count, so concurrently dispensed tiles are spread across the frame.
static TILE_ORDER: OnceLock<Vec<f32>> = OnceLock::new();

fn tile_order() -> &'static [f32] {
    TILE_ORDER.get_or_init(|| {
        let mut values: Vec<f32> = (0..NUMBER_OF_TILES)
            .map(|i| halton_sequence(i, 2))
            .collect();
        values.shuffle(&mut rand::thread_rng());
        values
    })
}

#[derive(Debug, Clone, Copy)]
enum CameraKind {
    /// Field-of-view camera; angles stored in radians.
    Perspective { h_fov: f32, v_fov: f32 },
    /// Parallel-projection camera; extents stored as half-sizes.
    Orthographic { size_h: f32, size_v: f32 },
}

/// A camera with a left-handed orthonormal frame and an atomic tile
/// dispenser shared by all render workers.
pub struct Camera {
    pub position: Point3,
    pub direction: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    kind: CameraKind,
    block: AtomicU32,
}

impl Camera {
    /// Left-hand rule frame: `direction = normalize(look_at - position)`,
    /// `right = up_guess × direction`, `up = direction × right`.
    fn frame(position: Point3, look_at: Point3, up_guess: Vec3) -> (Vec3, Vec3, Vec3) {
        let direction = (look_at - position).normalized();
        let right = up_guess.cross(direction);
        let up = direction.cross(right);
        (direction, right, up)
    }

    /// A perspective camera from field-of-view angles in degrees.
    pub fn perspective(
        position: Point3,
        look_at: Point3,
        up_guess: Vec3,
        h_fov_degrees: f32,
        v_fov_degrees: f32,
    ) -> Self {
        let (direction, right, up) = Self::frame(position, look_at, up_guess);
        Self {
            position,
            direction,
            right,
            up,
            kind: CameraKind::Perspective {
                h_fov: h_fov_degrees.to_radians(),
                v_fov: v_fov_degrees.to_radians(),
            },
            block: AtomicU32::new(0),
        }
    }

    /// An orthographic camera from full view-plane extents.
    pub fn orthographic(
        position: Point3,
        look_at: Point3,
        up_guess: Vec3,
        size_h: f32,
        size_v: f32,
    ) -> Self {
        let (direction, right, up) = Self::frame(position, look_at, up_guess);
        Self {
            position,
            direction,
            right,
            up,
            kind: CameraKind::Orthographic {
                size_h: size_h / 2.0,
                size_v: size_v / 2.0,
            },
            block: AtomicU32::new(0),
        }
    }

    /// Generates the primary ray for pixel coordinates u, v in [0, 1] with
    /// sub-pixel jitters du, dv. Primary rays start at depth 1 with a unit
    /// direction.
    pub fn generate_ray(&self, u: f32, v: f32, du: f32, dv: f32) -> Ray {
        match self.kind {
            CameraKind::Perspective { h_fov, v_fov } => {
                let right_factor = fast_arctan(h_fov * (u - 0.5)) + du;
                let up_factor = fast_arctan(v_fov * (0.5 - v)) + dv;
                let destination = self.position
                    + self.direction
                    + self.right * right_factor
                    + self.up * up_factor;
                Ray::new(
                    (destination - self.position).normalized(),
                    self.position,
                    1,
                    false,
                    None,
                )
            }
            CameraKind::Orthographic { size_h, size_v } => {
                let origin = self.position
                    + self.right * ((u - 0.5) * size_h)
                    + self.right * du
                    + self.up * ((0.5 - v) * size_v)
                    + self.up * dv;
                Ray::new(self.direction, origin, 1, false, None)
            }
        }
    }

    /// The camera's own contribution to the scene bounds. A perspective
    /// camera is its position; an orthographic camera spans its view plane.
    pub fn aabb(&self) -> Aabb {
        match self.kind {
            CameraKind::Perspective { .. } => Aabb::point(self.position),
            CameraKind::Orthographic { size_h, size_v } => {
                let a = self.position
                    + self.right * (-0.5 * size_h - 0.5)
                    + self.up * (0.5 * size_v - 0.5);
                let b = self.position
                    + self.right * (0.5 * size_h + 0.5)
                    + self.up * (-0.5 * size_v + 0.5);
                Aabb {
                    min: a.min(b),
                    max: a.max(b),
                }
            }
        }
    }

    /// Dispenses the next tile of the given sampling pass as a value in
    /// [0, 1), or 1.0 once the pass is out of tiles. Safe to call from any
    /// number of worker threads; each tile is handed out exactly once per
    /// pass.
    pub fn get_block(&self, sample_pass: u32) -> f32 {
        let current = self
            .block
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_sub(NUMBER_OF_TILES.wrapping_mul(sample_pass));
        if current >= NUMBER_OF_TILES {
            self.block.fetch_sub(1, Ordering::Relaxed);
            return 1.0;
        }
        tile_order()[current as usize]
    }

    /// Rewinds the tile dispenser for a new frame.
    pub fn reset_sampling(&self) {
        self.block.store(0, Ordering::Relaxed);
    }
}

/// Rational approximation of arctangent on [-π/4, π/4], a handful of
/// multiplies instead of a libm call in the primary-ray hot path.
fn fast_arctan(value: f32) -> f32 {
    let abs = value.abs();
    FRAC_PI_4 * value - (value * (abs - 1.0)) * (0.2447 + 0.0663 * abs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn test_camera() -> Camera {
        Camera::perspective(
            Vec3::new(0.0, 0.0, -3.4),
            Vec3::zero(),
            Vec3::unit_y(),
            45.0,
            45.0,
        )
    }

    #[test]
    fn frame_is_orthonormal_and_left_handed() {
        let camera = test_camera();
        assert_abs_diff_eq!(camera.direction.length(), 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(camera.direction.dot(camera.right), 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(camera.direction.dot(camera.up), 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(camera.right.dot(camera.up), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn every_generated_ray_is_normalized() {
        let camera = test_camera();
        for yi in 0..16 {
            for xi in 0..16 {
                let u = xi as f32 / 15.0;
                let v = yi as f32 / 15.0;
                let ray = camera.generate_ray(u, v, 0.001, -0.001);
                assert_abs_diff_eq!(ray.direction.length(), 1.0, epsilon = 1e-5);
                assert_eq!(ray.depth, 1);
            }
        }
    }

    #[test]
    fn center_ray_looks_straight_ahead() {
        let camera = test_camera();
        let ray = camera.generate_ray(0.5, 0.5, 0.0, 0.0);
        assert_abs_diff_eq!(ray.direction.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn orthographic_rays_share_the_view_direction() {
        let camera = Camera::orthographic(
            Vec3::new(0.0, 0.0, -2.0),
            Vec3::zero(),
            Vec3::unit_y(),
            4.0,
            4.0,
        );
        let a = camera.generate_ray(0.1, 0.5, 0.0, 0.0);
        let b = camera.generate_ray(0.9, 0.5, 0.0, 0.0);
        assert_eq!(a.direction, b.direction);
        assert!((a.origin - b.origin).length() > 0.5);
    }

    #[test]
    fn orthographic_bounds_span_the_padded_view_plane() {
        let camera = Camera::orthographic(
            Vec3::new(0.0, 0.0, -2.0),
            Vec3::zero(),
            Vec3::unit_y(),
            4.0,
            4.0,
        );
        let aabb = camera.aabb();
        assert_abs_diff_eq!(aabb.min.x, -1.5, epsilon = 1e-5);
        assert_abs_diff_eq!(aabb.max.x, 1.5, epsilon = 1e-5);
        assert_abs_diff_eq!(aabb.min.y, -0.5, epsilon = 1e-5);
        assert_abs_diff_eq!(aabb.max.y, 0.5, epsilon = 1e-5);
        assert_abs_diff_eq!(aabb.min.z, -2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(aabb.max.z, -2.0, epsilon = 1e-5);
    }

    #[test]
    fn fast_arctan_tracks_the_libm_answer() {
        for i in -8..=8 {
            let x = i as f32 * 0.1;
            assert!((fast_arctan(x) - x.atan()).abs() < 0.011, "x = {x}");
        }
    }

    #[test]
    fn tile_dispenser_hands_out_each_tile_once() {
        let camera = test_camera();
        let mut seen = 0;
        loop {
            let block = camera.get_block(0);
            if block >= 1.0 {
                break;
            }
            seen += 1;
        }
        assert_eq!(seen, NUMBER_OF_TILES);
        // Exhausted pass keeps answering 1.0.
        assert_eq!(camera.get_block(0), 1.0);
        camera.reset_sampling();
        assert!(camera.get_block(0) < 1.0);
    }
}
