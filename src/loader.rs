//! The camera-definition (`.cam`) loader.
//!
//! A line-based text format; each line opens with a single-character key,
//! a space, then a space-separated value list:
//!
//! ```text
//! t perspective
//! p <x> <y> <z>      position (x is inverted on load)
//! l <x> <y> <z>      look-at
//! u <x> <y> <z>      up vector
//! f <hFov> <vFov>    field of view in degrees; hFov is scaled by the
//!                    image aspect ratio
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::info;

use crate::camera::Camera;
use crate::error::{Error, Result};
use crate::math::{Vec2, Vec3};

fn parse_floats(line: &str, expected: usize) -> Result<Vec<f32>> {
    let values: std::result::Result<Vec<f32>, _> =
        line.split_whitespace().map(str::parse::<f32>).collect();
    let values =
        values.map_err(|e| Error::CameraDefinition(format!("bad number in {line:?}: {e}")))?;
    if values.len() != expected {
        return Err(Error::CameraDefinition(format!(
            "expected {expected} values in {line:?}, found {}",
            values.len()
        )));
    }
    Ok(values)
}

fn parse_vec3(line: &str) -> Result<Vec3> {
    let v = parse_floats(line, 3)?;
    Ok(Vec3::new(v[0], v[1], v[2]))
}

fn parse_vec2(line: &str) -> Result<Vec2> {
    let v = parse_floats(line, 2)?;
    Ok(Vec2::new(v[0], v[1]))
}

/// Parses a camera definition from any line source. The world is
/// left-handed, so the loaded x position is inverted; the horizontal field
/// of view is stretched by the image aspect ratio.
pub fn load_camera<R: BufRead>(reader: R, aspect_ratio: f32) -> Result<Camera> {
    let mut camera_type = String::from("perspective");
    let mut position = Vec3::zero();
    let mut look_at = Vec3::zero();
    let mut up = Vec3::unit_y();
    let mut fov = Vec2::new(45.0, 45.0);

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            continue;
        }
        let (key, rest) = trimmed.split_at(1);
        let rest = rest.trim_start();
        match key {
            "t" => camera_type = rest.to_string(),
            "p" => position = parse_vec3(rest)?,
            "l" => look_at = parse_vec3(rest)?,
            "u" => up = parse_vec3(rest)?,
            "f" => fov = parse_vec2(rest)?,
            _ => {}
        }
    }

    if camera_type != "perspective" {
        return Err(Error::CameraDefinition(format!(
            "unsupported camera type {camera_type:?}"
        )));
    }

    position.x = -position.x;
    info!("loaded camera at {position}, looking at {look_at}");
    Ok(Camera::perspective(
        position,
        look_at,
        up,
        fov.x * aspect_ratio,
        fov.y,
    ))
}

pub fn load_camera_file<P: AsRef<Path>>(path: P, aspect_ratio: f32) -> Result<Camera> {
    let file = File::open(path)?;
    load_camera(BufReader::new(file), aspect_ratio)
}
