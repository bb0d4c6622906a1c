use crate::intersection::Intersection;
use crate::ray::Ray;
use crate::shapes::Shape;

/// The no-acceleration accelerator: every query walks every shape. Slowest
/// and simplest, it doubles as the reference answer the spatial structures
/// are validated against.
pub struct Naive<S> {
    shapes: Vec<S>,
}

impl<S: Shape> Naive<S> {
    pub fn new(shapes: Vec<S>) -> Self {
        Self { shapes }
    }

    pub fn trace(&self, intersection: Intersection, ray: &Ray) -> Intersection {
        self.intersect(intersection, ray, false)
    }

    pub fn shadow_trace(&self, intersection: Intersection, ray: &Ray) -> Intersection {
        self.intersect(intersection, ray, true)
    }

    fn intersect(&self, mut intersection: Intersection, ray: &Ray, shadow: bool) -> Intersection {
        let last_length = intersection.length;
        for shape in &self.shapes {
            intersection = shape.intersect(intersection, ray);
            if shadow && intersection.length < last_length {
                return intersection;
            }
        }
        intersection
    }

    pub fn shapes(&self) -> &[S] {
        &self.shapes
    }
}
