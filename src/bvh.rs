//! The bounding-volume hierarchy.
//!
//! One BVH is built per shape type so traversal inner loops stay
//! monomorphic. The build is a single iterative pass over index ranges with
//! a small array-backed stack; each range is sorted by centroid along its
//! longest axis, then cut at the index minimizing the surface-area
//! heuristic. Nodes live in one contiguous vector; an internal node's two
//! children are adjacent at `index_offset` and `index_offset + 1`, a leaf's
//! `index_offset` is its first shape index.

use log::debug;

use crate::aabb::{surrounding_box, Aabb};
use crate::intersection::Intersection;
use crate::ray::Ray;
use crate::shapes::Shape;

/// Ranges with at most this many shapes become leaves.
const MAX_LEAF_SIZE: usize = 2;

/// Build and traversal stacks are fixed arrays of this depth. Overflow is a
/// programmer error, never a silent truncation.
const STACK_DEPTH: usize = 512;

#[derive(Debug, Clone, Copy, Default)]
pub struct BvhNode {
    pub aabb: Aabb,
    /// Leaf: index of the first shape in the range. Internal: index of the
    /// left child node.
    pub index_offset: u32,
    /// Non-zero marks a leaf holding this many shapes.
    pub shape_count: u32,
}

pub struct Bvh<S> {
    nodes: Vec<BvhNode>,
    shapes: Vec<S>,
}

impl<S: Shape> Bvh<S> {
    /// Consumes the shape vector and builds the tree in place. An empty
    /// input yields a single sentinel node and queries fall through
    /// unchanged.
    pub fn new(mut shapes: Vec<S>) -> Self {
        if shapes.is_empty() {
            return Self {
                nodes: vec![BvhNode::default()],
                shapes,
            };
        }
        let shape_count = shapes.len();
        let mut nodes = vec![BvhNode::default(); 2 * shape_count - 1];
        let max_node = build(&mut nodes, &mut shapes);
        nodes.truncate(max_node + 1);
        debug!("bvh: {} shapes, {} nodes", shape_count, nodes.len());
        Self { nodes, shapes }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn shapes(&self) -> &[S] {
        &self.shapes
    }

    pub fn trace(&self, intersection: Intersection, ray: &Ray) -> Intersection {
        self.traverse::<false>(intersection, ray)
    }

    pub fn shadow_trace(&self, intersection: Intersection, ray: &Ray) -> Intersection {
        self.traverse::<true>(intersection, ray)
    }

    fn traverse<const SHADOW: bool>(
        &self,
        mut intersection: Intersection,
        ray: &Ray,
    ) -> Intersection {
        if self.shapes.is_empty() {
            return intersection;
        }

        let mut stack = [0u32; STACK_DEPTH];
        let mut stack_top = 0usize;
        let mut node_index = 0u32;

        loop {
            let node = &self.nodes[node_index as usize];
            if node.aabb.intersect(ray) {
                if node.shape_count > 0 {
                    let begin = node.index_offset as usize;
                    let end = begin + node.shape_count as usize;
                    for shape in &self.shapes[begin..end] {
                        let last_length = intersection.length;
                        intersection = shape.intersect(intersection, ray);
                        if SHADOW && intersection.length < last_length {
                            return intersection;
                        }
                    }
                    if stack_top == 0 {
                        break;
                    }
                    stack_top -= 1;
                    node_index = stack[stack_top];
                } else {
                    let left = node.index_offset;
                    let hit_left = self.nodes[left as usize].aabb.intersect(ray);
                    let hit_right = self.nodes[left as usize + 1].aabb.intersect(ray);

                    if !hit_left && !hit_right {
                        if stack_top == 0 {
                            break;
                        }
                        stack_top -= 1;
                        node_index = stack[stack_top];
                    } else {
                        node_index = if hit_left { left } else { left + 1 };
                        if hit_left && hit_right {
                            assert!(stack_top < STACK_DEPTH, "bvh traversal stack overflow");
                            stack[stack_top] = left + 1;
                            stack_top += 1;
                        }
                    }
                }
            } else {
                if stack_top == 0 {
                    break;
                }
                stack_top -= 1;
                node_index = stack[stack_top];
            }
        }
        intersection
    }
}

/// The iterative build. Returns the highest node index used; the caller
/// shrinks the node vector to it.
fn build<S: Shape>(nodes: &mut [BvhNode], shapes: &mut [S]) -> usize {
    let mut stack = [(0u32, 0u32, 0u32); STACK_DEPTH];
    let mut stack_top = 0usize;

    let mut node_index = 0usize;
    let mut begin = 0usize;
    let mut end = shapes.len();
    let mut max_node = 0usize;

    loop {
        let count = end - begin;
        if count <= MAX_LEAF_SIZE {
            let mut bounds = shapes[begin].aabb();
            for shape in &shapes[begin + 1..end] {
                bounds = surrounding_box(&bounds, &shape.aabb());
            }
            nodes[node_index] = BvhNode {
                aabb: bounds,
                index_offset: begin as u32,
                shape_count: count as u32,
            };
            if stack_top == 0 {
                break;
            }
            stack_top -= 1;
            let (id, b, e) = stack[stack_top];
            node_index = id as usize;
            begin = b as usize;
            end = e as usize;
        } else {
            // Order the range by centroid along its longest axis so the SAH
            // cut falls along a spatially meaningful direction.
            let mut bounds = shapes[begin].aabb();
            for shape in &shapes[begin + 1..end] {
                bounds = surrounding_box(&bounds, &shape.aabb());
            }
            let axis = bounds.longest_axis();
            shapes[begin..end].sort_unstable_by(|a, b| {
                let ca = a.aabb().centroid()[axis];
                let cb = b.aabb().centroid()[axis];
                ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
            });
            let boxes: Vec<Aabb> = shapes[begin..end].iter().map(|s| s.aabb()).collect();

            let left_child = max_node + 1;
            nodes[node_index] = BvhNode {
                aabb: bounds,
                index_offset: left_child as u32,
                shape_count: 0,
            };
            max_node = max_node.max(left_child + 1);

            let split = if count <= 2 * MAX_LEAF_SIZE {
                MAX_LEAF_SIZE
            } else {
                sah_split_index(&boxes)
            };

            assert!(stack_top < STACK_DEPTH, "bvh build stack overflow");
            stack[stack_top] = (
                (left_child + 1) as u32,
                (begin + split) as u32,
                end as u32,
            );
            stack_top += 1;

            node_index = left_child;
            end = begin + split;
        }
    }
    max_node
}

/// The surface-area heuristic split: over every admissible cut, the cost is
/// `count_left · area(left prefix) + count_right · area(right suffix)`; the
/// minimum wins, ties preferring the earlier index. Both sides keep at least
/// `MAX_LEAF_SIZE` shapes.
fn sah_split_index(boxes: &[Aabb]) -> usize {
    let count = boxes.len();

    let mut left_area = vec![0.0f32; count];
    let mut running = boxes[0];
    for (i, aabb) in boxes.iter().enumerate() {
        running = surrounding_box(&running, aabb);
        left_area[i] = running.surface_area();
    }

    let mut right_area = vec![0.0f32; count];
    let mut running = boxes[count - 1];
    for i in (0..count).rev() {
        running = surrounding_box(&running, &boxes[i]);
        right_area[i] = running.surface_area();
    }

    let mut best_split = MAX_LEAF_SIZE;
    let mut best_cost = f32::MAX;
    for i in (MAX_LEAF_SIZE - 1)..(count - MAX_LEAF_SIZE) {
        let cost_left = (i + 1) as f32 * left_area[i];
        let cost_right = (count - i - 1) as f32 * right_area[i + 1];
        let cost = cost_left + cost_right;
        if cost < best_cost {
            best_cost = cost;
            best_split = i + 1;
        }
    }
    best_split
}
