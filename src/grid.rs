//! The regular (uniform) grid accelerator.
//!
//! The world bounds are diced into `G³` cells; every cell holds the indices
//! of the shapes overlapping it. Rays walk cells with the Amanatides–Woo
//! three-dimensional DDA, testing only the shapes in the cells they cross.

use log::debug;
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::aabb::Aabb;
use crate::intersection::Intersection;
use crate::math::Vec3;
use crate::ray::Ray;
use crate::shapes::Shape;
use crate::utils::RAY_LENGTH_MAX;

pub struct RegularGrid<S> {
    /// Per-cell buckets of indices into `shapes`, laid out x-major:
    /// `cell(x, y, z) = x + y·G + z·G²`.
    cells: Vec<Vec<u32>>,
    shapes: Vec<S>,
    grid_size: i32,
    world_bounds: Aabb,
    cell_size: Vec3,
    inv_cell_size: Vec3,
}

impl<S: Shape> RegularGrid<S> {
    /// Builds the grid over the given world bounds. Insertion first clamps
    /// each shape's bounding box to a candidate cell range, then gates every
    /// candidate with the exact shape/box overlap test. Distinct cells are
    /// filled in parallel under per-cell mutual exclusion.
    pub fn new(shapes: Vec<S>, world_bounds: Aabb, grid_size: u32) -> Self {
        let g = grid_size as i32;
        let cell_count = (grid_size * grid_size * grid_size) as usize;
        let size = world_bounds.max - world_bounds.min;
        let cell_size = size * (1.0 / grid_size as f32);
        let inv_cell_size = Vec3::new(
            if size.x > 0.0 { grid_size as f32 / size.x } else { 0.0 },
            if size.y > 0.0 { grid_size as f32 / size.y } else { 0.0 },
            if size.z > 0.0 { grid_size as f32 / size.z } else { 0.0 },
        );

        debug!(
            "grid {}^3 over min={} max={}, {} shapes",
            grid_size,
            world_bounds.min,
            world_bounds.max,
            shapes.len()
        );

        let buckets: Vec<Mutex<Vec<u32>>> = (0..cell_count).map(|_| Mutex::new(Vec::new())).collect();

        let reciprocal = |extent: f32| if extent > 0.0 { grid_size as f32 / extent } else { 1.0 };
        let dx_reci = reciprocal(size.x);
        let dy_reci = reciprocal(size.y);
        let dz_reci = reciprocal(size.z);

        shapes.par_iter().enumerate().for_each(|(index, shape)| {
            let bound = shape.aabb();

            // Candidate cell range from the clamped bounding box; a
            // zero-extent axis collapses to the single cell 0.
            let axis_range = |lo: f32, hi: f32, world_lo: f32, extent: f32, reci: f32| {
                let mut a = ((lo - world_lo) * reci) as i32;
                let mut b = ((hi - world_lo) * reci) as i32 + 1;
                a = a.max(0);
                b = b.min(g - 1);
                if extent.abs() < f32::EPSILON {
                    b = 0;
                }
                b = b.max(0);
                a = a.min(b);
                (a, b)
            };
            let (x1, x2) = axis_range(bound.min.x, bound.max.x, world_bounds.min.x, size.x, dx_reci);
            let (y1, y2) = axis_range(bound.min.y, bound.max.y, world_bounds.min.y, size.y, dy_reci);
            let (z1, z2) = axis_range(bound.min.z, bound.max.z, world_bounds.min.z, size.z, dz_reci);

            for x in x1..=x2 {
                for y in y1..=y2 {
                    for z in z1..=z2 {
                        let cell_min = world_bounds.min
                            + Vec3::new(
                                x as f32 * cell_size.x,
                                y as f32 * cell_size.y,
                                z as f32 * cell_size.z,
                            );
                        let cell = Aabb {
                            min: cell_min,
                            max: cell_min + cell_size,
                        };
                        if shape.intersects_box(&cell) {
                            let idx = (x + y * g + z * g * g) as usize;
                            buckets[idx].lock().push(index as u32);
                        }
                    }
                }
            }
        });

        let cells = buckets.into_iter().map(|bucket| bucket.into_inner()).collect();

        Self {
            cells,
            shapes,
            grid_size: g,
            world_bounds,
            cell_size,
            inv_cell_size,
        }
    }

    pub fn trace(&self, intersection: Intersection, ray: &Ray) -> Intersection {
        self.intersect(intersection, ray, false)
    }

    pub fn shadow_trace(&self, intersection: Intersection, ray: &Ray) -> Intersection {
        self.intersect(intersection, ray, true)
    }

    pub fn shapes(&self) -> &[S] {
        &self.shapes
    }

    #[inline]
    fn cell_index(&self, cell: [i32; 3]) -> usize {
        (cell[0] + cell[1] * self.grid_size + cell[2] * self.grid_size * self.grid_size) as usize
    }

    /// 3DDDA traversal. A first loop steps until the first closer hit; a
    /// second loop keeps stepping while the hit distance is at or beyond the
    /// next cell boundary, which catches closer surfaces that straddle cell
    /// walls. Shadow queries exit on any closer hit.
    fn intersect(&self, mut intersection: Intersection, ray: &Ray, shadow: bool) -> Intersection {
        if self.shapes.is_empty() {
            return intersection;
        }
        let g = self.grid_size;

        // The containing (clamped) start cell.
        let relative = ray.origin - self.world_bounds.min;
        let mut cell = [
            ((relative.x * self.inv_cell_size.x) as i32).clamp(0, g - 1),
            ((relative.y * self.inv_cell_size.y) as i32).clamp(0, g - 1),
            ((relative.z * self.inv_cell_size.z) as i32).clamp(0, g - 1),
        ];

        let mut step = [0i32; 3];
        let mut out = [0i32; 3];
        let mut boundary = [0.0f32; 3];
        for axis in 0..3 {
            if ray.direction[axis] > 0.0 {
                step[axis] = 1;
                out[axis] = g;
                boundary[axis] = self.world_bounds.min[axis]
                    + (cell[axis] + 1) as f32 * self.cell_size[axis];
            } else {
                step[axis] = -1;
                out[axis] = -1;
                boundary[axis] =
                    self.world_bounds.min[axis] + cell[axis] as f32 * self.cell_size[axis];
            }
        }

        // Distance to the next crossing and the crossing interval per axis.
        // Degenerate direction components never step on their axis.
        let mut t_max = [0.0f32; 3];
        let mut t_delta = [0.0f32; 3];
        for axis in 0..3 {
            if ray.direction[axis].abs() > f32::EPSILON {
                let reciprocal = 1.0 / ray.direction[axis];
                t_max[axis] = (boundary[axis] - ray.origin[axis]) * reciprocal;
                t_delta[axis] = self.cell_size[axis] * step[axis] as f32 * reciprocal;
            } else {
                t_max[axis] = RAY_LENGTH_MAX;
            }
        }

        let next_axis = |t_max: &[f32; 3]| -> usize {
            if t_max[0] < t_max[1] {
                if t_max[0] < t_max[2] {
                    0
                } else {
                    2
                }
            } else if t_max[1] < t_max[2] {
                1
            } else {
                2
            }
        };

        // First pass: step until the first closer hit.
        loop {
            let bucket = &self.cells[self.cell_index(cell)];
            let mut found = false;
            for &shape_index in bucket {
                let last_length = intersection.length;
                intersection = self.shapes[shape_index as usize].intersect(intersection, ray);
                if intersection.length < last_length {
                    if shadow {
                        return intersection;
                    }
                    found = true;
                    break;
                }
            }
            if found {
                break;
            }
            let axis = next_axis(&t_max);
            cell[axis] += step[axis];
            if cell[axis] == out[axis] {
                return intersection;
            }
            t_max[axis] += t_delta[axis];
        }

        // Boundary re-test: the hit may not be the nearest if a closer shape
        // crosses into a cell the ray has yet to enter.
        loop {
            let bucket = &self.cells[self.cell_index(cell)];
            for &shape_index in bucket {
                intersection = self.shapes[shape_index as usize].intersect(intersection, ray);
            }
            let axis = next_axis(&t_max);
            if intersection.length < t_max[axis] {
                break;
            }
            cell[axis] += step[axis];
            if cell[axis] == out[axis] {
                break;
            }
            t_max[axis] += t_delta[axis];
        }
        intersection
    }
}
