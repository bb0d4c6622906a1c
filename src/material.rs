use crate::math::{Color, Vec2};
use crate::utils::{equal_eps, equal_vec};

/// An 8-bit RGB image sampled with nearest-neighbour lookups. Loaders hand
/// the decoded byte buffer to the engine; the engine never touches image
/// files itself.
#[derive(Debug, Clone)]
pub struct Texture {
    width: u32,
    height: u32,
    channels: u32,
    pixels: Vec<u8>,
}

impl Texture {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, channels: u32) -> Self {
        debug_assert!(
            pixels.len() >= (width * height * channels) as usize,
            "texture buffer smaller than its dimensions"
        );
        Self {
            width,
            height,
            channels,
            pixels,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.channels >= 3 && !self.pixels.is_empty()
    }

    /// Nearest-neighbour sample at the given texture coordinates, wrapped
    /// into [0, 1). Channels are normalized from bytes to [0, 1].
    pub fn sample(&self, tex_coords: Vec2) -> Color {
        let uv = tex_coords.fract();
        let texel_x = ((uv.x * self.width as f32) as u32).min(self.width - 1);
        let texel_y = ((uv.y * self.height as f32) as u32).min(self.height - 1);
        let index = ((texel_y * self.width + texel_x) * self.channels) as usize;
        Color::new(
            self.pixels[index] as f32 / 255.0,
            self.pixels[index + 1] as f32 / 255.0,
            self.pixels[index + 2] as f32 / 255.0,
        )
    }
}

/// Textures compare by their dimensions; a byte-wise image comparison at
/// material deduplication time would be wasted work.
impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.channels == other.channels
            && self.pixels.len() == other.pixels.len()
    }
}

// ─── Material ───────────────────────────────────────────────────────────────

/// A Phong-like surface description: diffuse reflection (Kd), specular
/// reflection (Ks), specular transmission (Kt), emission (Le), the refractive
/// index for transmission, and an optional diffuse texture.
#[derive(Debug, Clone)]
pub struct Material {
    pub kd: Color,
    pub ks: Color,
    pub kt: Color,
    pub le: Color,
    pub refractive_index: f32,
    pub texture: Option<Texture>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            kd: Color::zero(),
            ks: Color::zero(),
            kt: Color::zero(),
            le: Color::zero(),
            refractive_index: 1.0,
            texture: None,
        }
    }
}

impl Material {
    pub fn new(kd: Color, ks: Color, kt: Color, refractive_index: f32, le: Color) -> Self {
        Self {
            kd,
            ks,
            kt,
            le,
            refractive_index,
            texture: None,
        }
    }

    /// A purely diffuse surface.
    pub fn lambertian(kd: Color) -> Self {
        Self {
            kd,
            ..Self::default()
        }
    }

    /// An emitter with the given radiance.
    pub fn emitter(le: Color) -> Self {
        Self {
            le,
            ..Self::default()
        }
    }

    pub fn with_texture(mut self, texture: Texture) -> Self {
        self.texture = Some(texture);
        self
    }

    /// A material is a light source iff any emission component is positive.
    pub fn is_light(&self) -> bool {
        self.le.has_positive()
    }

    /// The diffuse term at a surface point: the texture sample when one is
    /// attached, the constant Kd otherwise.
    pub fn diffuse_at(&self, tex_coords: Vec2) -> Color {
        match &self.texture {
            Some(texture) => texture.sample(tex_coords),
            None => self.kd,
        }
    }
}

/// Materials compare component-wise within ε so the scene can deduplicate the
/// table on insert.
impl PartialEq for Material {
    fn eq(&self, other: &Self) -> bool {
        equal_vec(self.kd, other.kd)
            && equal_vec(self.ks, other.ks)
            && equal_vec(self.kt, other.kt)
            && equal_vec(self.le, other.le)
            && equal_eps(self.refractive_index, other.refractive_index)
            && self.texture == other.texture
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn checker_2x2() -> Texture {
        // Row 0: black, white. Row 1: white, black.
        let pixels = vec![0, 0, 0, 255, 255, 255, 255, 255, 255, 0, 0, 0];
        Texture::new(pixels, 2, 2, 3)
    }

    #[test]
    fn nearest_sampling_picks_the_right_texel() {
        let t = checker_2x2();
        assert_abs_diff_eq!(t.sample(Vec2::new(0.1, 0.1)).x, 0.0);
        assert_abs_diff_eq!(t.sample(Vec2::new(0.9, 0.1)).x, 1.0);
        assert_abs_diff_eq!(t.sample(Vec2::new(0.1, 0.9)).x, 1.0);
        assert_abs_diff_eq!(t.sample(Vec2::new(0.9, 0.9)).x, 0.0);
        // Coordinates outside [0,1) wrap around.
        assert_abs_diff_eq!(t.sample(Vec2::new(1.1, -0.9)).x, 0.0);
    }

    #[test]
    fn materials_compare_within_epsilon() {
        let a = Material::lambertian(Color::new(0.5, 0.5, 0.5));
        let mut b = Material::lambertian(Color::new(0.5, 0.5, 0.5 + 1e-8));
        assert_eq!(a, b);
        b.kd.x = 0.6;
        assert_ne!(a, b);
    }

    #[test]
    fn emission_marks_a_light() {
        assert!(Material::emitter(Color::new(0.0, 0.0, 0.1)).is_light());
        assert!(!Material::lambertian(Color::ones()).is_light());
    }

    #[test]
    fn textured_material_overrides_kd() {
        let m = Material::lambertian(Color::ones()).with_texture(checker_2x2());
        assert_abs_diff_eq!(m.diffuse_at(Vec2::new(0.1, 0.1)).x, 0.0);
        let plain = Material::lambertian(Color::new(0.3, 0.3, 0.3));
        assert_abs_diff_eq!(plain.diffuse_at(Vec2::zero()).x, 0.3);
    }
}