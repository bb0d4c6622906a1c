//! # prism-rt
//!
//! Command-line front end for the prism-rt rendering engine: picks a demo
//! scene, renders it with the chosen shader and accelerator across worker
//! threads, then dumps the framebuffer to the terminal and/or a PPM file.

use std::io::{self, Write};
use std::time::Instant;

use clap::Parser;
use crossterm::style::{self, Stylize};

use prism_rt::ray::Ray;
use prism_rt::{render_into, Accelerator, Config, ShaderChoice};

/// prism-rt: render built-in 3D scenes from the command line
#[derive(Parser, Debug)]
#[command(
    name = "prism-rt",
    version,
    about = "A portable offline CPU ray tracer",
    after_help = "EXAMPLES:\n  \
                  prism-rt --scene 0 --shader whitted --spp 4\n  \
                  prism-rt --scene 1 --shader path-tracer --spp 64 --threads 8\n  \
                  prism-rt --scene 2 --accelerator grid --ppm out.ppm"
)]
struct Cli {
    /// Built-in scene index (0: box with point light, 1: box with area
    /// lights, 2: spheres, 3: triangle wedge)
    #[arg(short, long, default_value_t = 0)]
    scene: i32,

    /// Image width in pixels
    #[arg(short = 'W', long, default_value_t = 256)]
    width: u32,

    /// Image height in pixels
    #[arg(short = 'H', long, default_value_t = 256)]
    height: u32,

    /// Worker threads (including the caller)
    #[arg(short, long, default_value_t = default_threads())]
    threads: u32,

    /// Samples per pixel; higher values reduce noise at the cost of render
    /// time
    #[arg(long, default_value_t = 4)]
    spp: u32,

    /// Shadow-ray samples per light
    #[arg(long, default_value_t = 1)]
    samples_light: u32,

    /// Times to re-render the frame, accumulating samples
    #[arg(long, default_value_t = 1)]
    repeats: u32,

    /// Light-transport shader
    #[arg(long, value_enum, default_value_t = CliShader::Whitted)]
    shader: CliShader,

    /// Spatial acceleration structure
    #[arg(long, value_enum, default_value_t = CliAccelerator::Bvh)]
    accelerator: CliAccelerator,

    /// Camera definition file (.cam); overrides the preset camera
    #[arg(long, default_value = "")]
    cam: String,

    /// Write the frame to this PPM (P6) file
    #[arg(long)]
    ppm: Option<String>,

    /// Terminal output encoding
    #[arg(short, long, value_enum, default_value_t = CliOutputMode::Halfblock)]
    mode: CliOutputMode,
}

fn default_threads() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1)
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliShader {
    /// Direct lighting without shadow rays
    NoShadows,
    /// Recursive ray tracing with shadows, reflection, and refraction
    Whitted,
    /// Monte Carlo path tracing
    PathTracer,
    /// Distance visualization
    DepthMap,
    /// Material visualization
    DiffuseMaterial,
}

impl From<CliShader> for ShaderChoice {
    fn from(value: CliShader) -> Self {
        match value {
            CliShader::NoShadows => ShaderChoice::NoShadows,
            CliShader::Whitted => ShaderChoice::Whitted,
            CliShader::PathTracer => ShaderChoice::PathTracer,
            CliShader::DepthMap => ShaderChoice::DepthMap,
            CliShader::DiffuseMaterial => ShaderChoice::DiffuseMaterial,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliAccelerator {
    /// Exhaustive search over every primitive
    Naive,
    /// Uniform grid walked with a 3D DDA
    Grid,
    /// Bounding-volume hierarchy
    Bvh,
}

impl From<CliAccelerator> for Accelerator {
    fn from(value: CliAccelerator) -> Self {
        match value {
            CliAccelerator::Naive => Accelerator::Naive,
            CliAccelerator::Grid => Accelerator::RegularGrid,
            CliAccelerator::Bvh => Accelerator::Bvh,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, clap::ValueEnum)]
enum CliOutputMode {
    /// Full-block characters with 24-bit true color
    Truecolor,
    /// Half-block characters (▀), two vertical pixels per cell
    Halfblock,
    /// ASCII grayscale density ramp
    Ascii,
    /// No terminal output
    None,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config = Config {
        width: cli.width,
        height: cli.height,
        threads: cli.threads.max(1),
        shader: cli.shader.into(),
        scene_index: cli.scene,
        samples_pixel: cli.spp,
        samples_light: cli.samples_light,
        repeats: cli.repeats,
        accelerator: cli.accelerator.into(),
        obj_file_path: String::new(),
        mtl_file_path: String::new(),
        cam_file_path: cli.cam.clone(),
    };

    let mut bitmap = vec![0u32; (config.width * config.height) as usize];

    let rays_before = Ray::cast_count();
    let t0 = Instant::now();
    if let Err(error) = render_into(&config, &mut bitmap) {
        eprintln!("render failed: {error}");
        std::process::exit(1);
    }
    let elapsed = t0.elapsed().as_secs_f64();
    let rays = Ray::cast_count() - rays_before;

    eprintln!(
        "  {}x{} @ {} spp | {:.2}s | {:.2}M rays | {:.2} Mrays/s",
        config.width,
        config.height,
        config.samples_pixel * config.repeats,
        elapsed,
        rays as f64 / 1e6,
        rays as f64 / elapsed / 1e6
    );

    match cli.mode {
        CliOutputMode::Truecolor => display_truecolor(&bitmap, config.width, config.height),
        CliOutputMode::Halfblock => display_halfblock(&bitmap, config.width, config.height),
        CliOutputMode::Ascii => display_ascii(&bitmap, config.width, config.height),
        CliOutputMode::None => {}
    }

    if let Some(path) = &cli.ppm {
        if let Err(error) = write_ppm(path, &bitmap, config.width, config.height) {
            eprintln!("could not write {path}: {error}");
            std::process::exit(1);
        }
        eprintln!("  wrote {path}");
    }
}

/// Unpacks a `0xAARRGGBB` framebuffer word into an RGB byte triple.
fn unpack(pixel: u32) -> (u8, u8, u8) {
    (
        (pixel & 0xFF) as u8,
        ((pixel >> 8) & 0xFF) as u8,
        ((pixel >> 16) & 0xFF) as u8,
    )
}

fn display_truecolor(bitmap: &[u32], width: u32, height: u32) {
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    for y in 0..height {
        for x in 0..width {
            let (r, g, b) = unpack(bitmap[(y * width + x) as usize]);
            let _ = write!(out, "{}", "█".with(style::Color::Rgb { r, g, b }));
        }
        let _ = writeln!(out);
    }
    let _ = out.flush();
}

/// Half-block rendering: each character cell shows two vertically stacked
/// pixels via the foreground and background colors.
fn display_halfblock(bitmap: &[u32], width: u32, height: u32) {
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let rows = height / 2;
    for row in 0..rows {
        for x in 0..width {
            let (tr, tg, tb) = unpack(bitmap[(row * 2 * width + x) as usize]);
            let (br, bg, bb) = unpack(bitmap[((row * 2 + 1) * width + x) as usize]);
            let _ = write!(
                out,
                "{}",
                "▀".with(style::Color::Rgb {
                    r: tr,
                    g: tg,
                    b: tb
                })
                .on(style::Color::Rgb {
                    r: br,
                    g: bg,
                    b: bb
                })
            );
        }
        let _ = writeln!(out);
    }
    let _ = out.flush();
}

fn display_ascii(bitmap: &[u32], width: u32, height: u32) {
    const RAMP: &[u8] = b" .:-=+*#%@";
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    for y in 0..height {
        for x in 0..width {
            let (r, g, b) = unpack(bitmap[(y * width + x) as usize]);
            let lum =
                (0.2126 * r as f64 + 0.7152 * g as f64 + 0.0722 * b as f64) / 255.0;
            let index = (lum.clamp(0.0, 0.999) * RAMP.len() as f64) as usize;
            let _ = write!(out, "{}", RAMP[index] as char);
        }
        let _ = writeln!(out);
    }
    let _ = out.flush();
}

/// PPM P6 export: RGB triplets, one byte per channel, no compression.
fn write_ppm(path: &str, bitmap: &[u32], width: u32, height: u32) -> io::Result<()> {
    let mut file = io::BufWriter::new(std::fs::File::create(path)?);
    write!(file, "P6\n{width} {height}\n255\n")?;
    for &pixel in bitmap.iter().take((width * height) as usize) {
        let (r, g, b) = unpack(pixel);
        file.write_all(&[r, g, b])?;
    }
    file.flush()
}
