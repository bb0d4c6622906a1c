//! Frame orchestration: tile scheduling, the worker pool, and the packed
//! framebuffer accumulation.
//!
//! `render_frame` spawns `threads - 1` workers and participates as the last
//! one. Workers pull tiles from the camera's atomic dispenser, so every tile
//! of a sampling pass is owned by exactly one thread; that ownership is what
//! lets pixels be updated without locks. The bitmap is viewed as a slice of
//! atomics (same layout as the `u32` it aliases), with relaxed loads and
//! stores on pixels the owning thread alone touches during the pass.

use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;

use log::{debug, info};

use crate::camera::Camera;
use crate::sampler::Sampler;
use crate::shader::Shader;
use crate::utils::{incremental_avg, NUMBER_OF_TILES};

pub struct Renderer {
    camera: Camera,
    shader: Shader,
    sampler_pixel: Sampler,
    width: u32,
    height: u32,
    block_size_x: AtomicU32,
    block_size_y: AtomicU32,
    sample: AtomicU32,
    /// Passes already folded into the bitmap by earlier `render_frame`
    /// calls; keeps the incremental average weighted correctly across
    /// repeated frames.
    accumulated: AtomicU32,
    domain_size: u32,
    resolution: u32,
    samples_pixel: u32,
}

impl Renderer {
    pub fn new(
        shader: Shader,
        camera: Camera,
        sampler_pixel: Sampler,
        width: u32,
        height: u32,
        samples_pixel: u32,
    ) -> Self {
        let tiles_per_side = (NUMBER_OF_TILES as f32).sqrt() as u32;
        let block_size_x = (width / tiles_per_side).max(1);
        let block_size_y = (height / tiles_per_side).max(1);
        Self {
            camera,
            shader,
            sampler_pixel,
            width,
            height,
            domain_size: (width / block_size_x) * (height / block_size_y),
            resolution: width * height,
            samples_pixel,
            block_size_x: AtomicU32::new(block_size_x),
            block_size_y: AtomicU32::new(block_size_y),
            sample: AtomicU32::new(0),
            accumulated: AtomicU32::new(0),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn shader(&self) -> &Shader {
        &self.shader
    }

    /// Completed sampling passes of the current frame, for progress
    /// reporting.
    pub fn sample_count(&self) -> u32 {
        self.sample.load(Ordering::Relaxed)
    }

    /// Total passes folded into the bitmap across all `render_frame` calls.
    pub fn accumulated_samples(&self) -> u32 {
        self.accumulated.load(Ordering::Relaxed)
    }

    /// Forgets the accumulated pass count. Call before rendering into a
    /// bitmap that no longer holds the previously accumulated frame.
    pub fn reset_accumulation(&self) {
        self.accumulated.store(0, Ordering::Relaxed);
    }

    /// Renders a frame into the bitmap with `num_threads` workers (including
    /// the calling thread). `stride` is the bitmap's row pitch in bytes;
    /// pixels are packed `0xFF000000 | B << 16 | G << 8 | R`.
    ///
    /// Each call continues the running per-pixel mean where the previous
    /// call left off, so re-rendering into the same bitmap keeps lowering
    /// the noise instead of starting over ([`Renderer::reset_accumulation`]
    /// rewinds that weighting for a fresh bitmap).
    ///
    /// Returns normally on completion and on [`Renderer::stop_render`], in
    /// which case the bitmap is partially accumulated.
    pub fn render_frame(&self, bitmap: &mut [u32], num_threads: usize, stride: u32) {
        let num_threads = num_threads.max(1);
        let row_pitch = stride / std::mem::size_of::<u32>() as u32;
        debug_assert!(bitmap.len() as u32 >= row_pitch * self.height);
        info!(
            "rendering {}x{} with {} threads, {} spp",
            self.width, self.height, num_threads, self.samples_pixel
        );

        self.sample.store(0, Ordering::Relaxed);
        self.sampler_pixel.reset();
        self.shader.reset_sampling();
        self.camera.reset_sampling();

        // &mut [u32] and &[AtomicU32] have identical layout; the exclusive
        // borrow guarantees no other view of the buffer exists while workers
        // write through the atomic one.
        let pixels: &[AtomicU32] = unsafe {
            std::slice::from_raw_parts(bitmap.as_ptr() as *const AtomicU32, bitmap.len())
        };

        let base_sample = self.accumulated.load(Ordering::Relaxed);
        thread::scope(|scope| {
            for thread_id in 0..num_threads - 1 {
                scope.spawn(move || self.render_scene(pixels, thread_id + 1, row_pitch, base_sample));
            }
            self.render_scene(pixels, 0, row_pitch, base_sample);
        });
        self.accumulated
            .store(base_sample + self.samples_pixel, Ordering::Relaxed);

        debug!(
            "frame finished at {} passes ({} accumulated)",
            self.sample_count(),
            self.accumulated_samples()
        );
    }

    /// Cooperatively stops an in-flight render: collapses the tile geometry
    /// and stops the pixel sampler, which drains every worker's pass loop on
    /// its next tile dispense. Idempotent; callable from any thread.
    pub fn stop_render(&self) {
        self.block_size_x.store(0, Ordering::Relaxed);
        self.block_size_y.store(0, Ordering::Relaxed);
        self.sampler_pixel.stop();
    }

    /// One worker's render loop: for each sampling pass, keep claiming tiles
    /// until the dispenser runs dry, shading every pixel in each tile.
    /// `base_sample` is how many passes earlier frames already folded into
    /// the bitmap.
    fn render_scene(&self, pixels: &[AtomicU32], thread_id: usize, row_pitch: u32, base_sample: u32) {
        let inv_width = 1.0 / self.width as f32;
        let inv_height = 1.0 / self.height as f32;
        let pixel_width = 0.5 / self.width as f32;
        let pixel_height = 0.5 / self.height as f32;

        for pass in 0..self.samples_pixel {
            loop {
                let block_x = self.block_size_x.load(Ordering::Relaxed);
                let block_y = self.block_size_y.load(Ordering::Relaxed);
                // Zero tile geometry means the render was stopped.
                let block = if block_x == 0 || block_y == 0 {
                    1.0
                } else {
                    self.camera.get_block(pass)
                };
                if block >= 1.0 {
                    break;
                }

                let tile_index = (block * self.domain_size as f32).round() as u32;
                let pixel = tile_index * block_x % self.resolution;
                let start_y = ((pixel / self.width) * block_y) % self.height;
                let end_y = (start_y + block_y).min(self.height);
                for y in start_y..end_y {
                    let v = y as f32 * inv_height;
                    let row_base = y * row_pitch;
                    let start_x = pixel % self.width;
                    let end_x = (start_x + block_x).min(self.width);
                    for x in start_x..end_x {
                        let u = x as f32 * inv_width;
                        let r1 = self.sampler_pixel.next();
                        let r2 = self.sampler_pixel.next();
                        let deviation_u = (r1 - 0.5) * 2.0 * pixel_width;
                        let deviation_v = (r2 - 0.5) * 2.0 * pixel_height;
                        let ray = self.camera.generate_ray(u, v, deviation_u, deviation_v);
                        let (rgb, _) = self.shader.ray_trace(&ray);

                        let index = (row_base + x) as usize;
                        let previous = pixels[index].load(Ordering::Relaxed);
                        pixels[index].store(
                            incremental_avg(rgb, previous, base_sample + pass + 1),
                            Ordering::Relaxed,
                        );
                    }
                }
            }
            if thread_id == 0 {
                self.sample.store(pass + 1, Ordering::Relaxed);
                debug!("pass {} done", pass + 1);
            }
        }
    }
}
