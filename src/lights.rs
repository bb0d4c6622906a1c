use crate::intersection::Intersection;
use crate::math::{Color, Point3};
use crate::ray::Ray;
use crate::sampler::Sampler;
use crate::shapes::{Shape, Triangle};

/// A light source: either a point emitter or an emissive triangle sampled
/// over its area. Shaders draw positions from lights for direct lighting and
/// intersect area lights so that primary rays can see them glow.
pub enum Light {
    Point(PointLight),
    Area(AreaLight),
}

pub struct PointLight {
    pub emission: Color,
    pub material_index: i32,
    pub position: Point3,
}

pub struct AreaLight {
    pub emission: Color,
    pub material_index: i32,
    triangle: Triangle,
    sampler: Sampler,
}

impl AreaLight {
    pub(crate) fn new(
        emission: Color,
        material_index: i32,
        triangle: Triangle,
        sampler: Sampler,
    ) -> Self {
        Self {
            emission,
            material_index,
            triangle,
            sampler,
        }
    }
}

impl Light {
    /// The light's radiance (the Le of its emissive material).
    pub fn emission(&self) -> Color {
        match self {
            Light::Point(light) => light.emission,
            Light::Area(light) => light.emission,
        }
    }

    /// A position on the light to aim a shadow ray at. Point lights are a
    /// single position; area lights draw two uniform values and fold them
    /// into the triangle so the samples cover its area uniformly.
    pub fn sample_position(&self) -> Point3 {
        match self {
            Light::Point(light) => light.position,
            Light::Area(light) => {
                let mut r = light.sampler.next();
                let mut s = light.sampler.next();
                if r + s >= 1.0 {
                    r = 1.0 - r;
                    s = 1.0 - s;
                }
                light.triangle.point_a() + light.triangle.ab() * r + light.triangle.ac() * s
            }
        }
    }

    /// Rewinds any owned sampling state; called between frames.
    pub fn reset_sampling(&self) {
        if let Light::Area(light) = self {
            light.sampler.reset();
        }
    }

    /// Area lights occlude and glow like the triangle they are; when the
    /// triangle becomes the closest hit, the intersection takes the light's
    /// emissive material. Point lights have no surface.
    pub fn intersect(&self, intersection: Intersection, ray: &Ray) -> Intersection {
        match self {
            Light::Point(_) => intersection,
            Light::Area(light) => {
                let last_length = intersection.length;
                let mut intersection = light.triangle.intersect(intersection, ray);
                if intersection.length < last_length {
                    intersection.material_index = light.material_index;
                }
                intersection
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;
    use crate::ray::PrimitiveId;
    use crate::utils::RAY_LENGTH_MAX;

    fn area_light() -> Light {
        let triangle = Triangle::new(
            Vec3::new(-0.5, 1.0, -0.5),
            Vec3::new(0.5, 1.0, -0.5),
            Vec3::new(0.5, 1.0, 0.5),
            3,
        )
        .with_id(PrimitiveId::Light(0));
        Light::Area(AreaLight::new(
            Color::splat(0.9),
            3,
            triangle,
            Sampler::static_halton(),
        ))
    }

    #[test]
    fn area_samples_stay_on_the_triangle_plane() {
        let light = area_light();
        for _ in 0..100 {
            let p = light.sample_position();
            assert!((p.y - 1.0).abs() < 1e-6);
            assert!(p.x >= -0.5 && p.x <= 0.5);
            assert!(p.z >= -0.5 && p.z <= 0.5);
        }
    }

    #[test]
    fn area_light_assigns_its_material_on_hit() {
        let light = area_light();
        let ray = Ray::new(Vec3::unit_y(), Vec3::new(0.1, 0.0, 0.1), 1, false, None);
        let hit = light.intersect(Intersection::miss(RAY_LENGTH_MAX), &ray);
        assert!(hit.is_hit());
        assert_eq!(hit.material_index, 3);
        assert_eq!(hit.primitive, Some(PrimitiveId::Light(0)));
    }

    #[test]
    fn point_light_has_a_fixed_position_and_no_surface() {
        let light = Light::Point(PointLight {
            emission: Color::splat(0.9),
            material_index: 0,
            position: Vec3::new(0.0, 0.99, 0.0),
        });
        assert_eq!(light.sample_position(), Vec3::new(0.0, 0.99, 0.0));
        let ray = Ray::new(Vec3::unit_y(), Vec3::zero(), 1, false, None);
        let result = light.intersect(Intersection::miss(RAY_LENGTH_MAX), &ray);
        assert!(!result.is_hit());
    }
}
