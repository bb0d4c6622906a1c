use crate::error::Error;

/// Which light-transport shader renders the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderChoice {
    NoShadows = 0,
    Whitted = 1,
    PathTracer = 2,
    DepthMap = 3,
    DiffuseMaterial = 4,
}

impl TryFrom<i32> for ShaderChoice {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Error> {
        match value {
            0 => Ok(Self::NoShadows),
            1 => Ok(Self::Whitted),
            2 => Ok(Self::PathTracer),
            3 => Ok(Self::DepthMap),
            4 => Ok(Self::DiffuseMaterial),
            other => Err(Error::InvalidConfig(format!("unknown shader {other}"))),
        }
    }
}

/// Which spatial structure answers ray queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accelerator {
    Naive = 0,
    RegularGrid = 1,
    Bvh = 2,
}

impl TryFrom<i32> for Accelerator {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Error> {
        match value {
            0 => Ok(Self::Naive),
            1 => Ok(Self::RegularGrid),
            2 => Ok(Self::Bvh),
            other => Err(Error::InvalidConfig(format!("unknown accelerator {other}"))),
        }
    }
}

/// The full render request a host hands to the engine. The output bitmap is
/// passed separately as a pre-allocated `width * height` slice of packed
/// 32-bit pixels.
#[derive(Debug, Clone)]
pub struct Config {
    pub width: u32,
    pub height: u32,
    pub threads: u32,
    pub shader: ShaderChoice,
    /// Built-in demo scene index (0–3); scenes from external loaders use
    /// [`crate::render_with_scene`] instead.
    pub scene_index: i32,
    pub samples_pixel: u32,
    pub samples_light: u32,
    /// How many times to render the frame; samples keep accumulating in the
    /// bitmap across repeats.
    pub repeats: u32,
    pub accelerator: Accelerator,
    pub obj_file_path: String,
    pub mtl_file_path: String,
    pub cam_file_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            threads: 1,
            shader: ShaderChoice::Whitted,
            scene_index: 0,
            samples_pixel: 1,
            samples_light: 1,
            repeats: 1,
            accelerator: Accelerator::Bvh,
            obj_file_path: String::new(),
            mtl_file_path: String::new(),
            cam_file_path: String::new(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), Error> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidConfig("image dimensions must be non-zero".into()));
        }
        if self.threads == 0 {
            return Err(Error::InvalidConfig("at least one thread is required".into()));
        }
        if self.samples_pixel == 0 {
            return Err(Error::InvalidConfig("samples per pixel must be non-zero".into()));
        }
        if self.samples_light == 0 {
            return Err(Error::InvalidConfig("samples per light must be non-zero".into()));
        }
        Ok(())
    }
}
