//! Pluggable scalar sample sources.
//!
//! A [`Sampler`] produces a lazy, potentially infinite sequence of floats in
//! [0, 1). All variants are safe to drive from many threads at once: state is
//! either a single atomic counter or a thread-local generator.
//!
//! The "static" variants read from process-wide tables of 2^20 values filled
//! once on first use. The table length is a power of two so an index can be
//! derived from one atomic fetch-add and a mask, with no locking on the read
//! path.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::utils::{halton_sequence, NUMBER_OF_TILES};

/// Mask for indexing the pre-filled tables; table length is `MASK + 1`.
const STATIC_MASK: u32 = 0xF_FFFF;
const STATIC_SIZE: usize = (STATIC_MASK as usize) + 1;

static HALTON_TABLE: OnceLock<Vec<f32>> = OnceLock::new();
static UNIFORM_TABLE: OnceLock<Vec<f32>> = OnceLock::new();
static PCG_TABLE: OnceLock<Vec<f32>> = OnceLock::new();

/// The shuffled base-2 Halton table. Shuffling breaks the correlation between
/// consecutive indices while keeping the set well distributed.
fn halton_table() -> &'static [f32] {
    HALTON_TABLE.get_or_init(|| {
        let mut values: Vec<f32> = (0..STATIC_SIZE)
            .map(|i| halton_sequence(i as u32, 2))
            .collect();
        values.shuffle(&mut rand::thread_rng());
        values
    })
}

fn uniform_table() -> &'static [f32] {
    UNIFORM_TABLE.get_or_init(|| {
        let mut rng = SmallRng::from_entropy();
        (0..STATIC_SIZE).map(|_| rng.gen::<f32>()).collect()
    })
}

fn pcg_table() -> &'static [f32] {
    PCG_TABLE.get_or_init(|| {
        let mut rng = Pcg32::from_entropy();
        (0..STATIC_SIZE).map(|_| rng.gen::<f32>()).collect()
    })
}

/// Lock-free lookup into the shuffled Halton table, shared with the shader's
/// hemisphere and light-index draws.
pub(crate) fn static_halton_at(index: u32) -> f32 {
    halton_table()[(index & STATIC_MASK) as usize]
}

thread_local! {
    static UNIFORM_RNG: RefCell<SmallRng> = RefCell::new(SmallRng::from_entropy());
    static PCG_RNG: RefCell<Pcg32> = RefCell::new(Pcg32::from_entropy());
}

// ─── Sampler ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum SamplerKind {
    /// The same value forever. Useful to pin jitter in tests.
    Constant(f32),
    /// Pass-windowed base-2 Halton draws; returns the 1.0 sentinel once the
    /// current pass window is exhausted.
    Halton,
    /// Pass-windowed uniform strata over the domain.
    Stratified,
    /// Thread-local small fast RNG.
    Uniform,
    /// Thread-local PCG-32 generator.
    Pcg,
    /// Pre-filled shuffled Halton table.
    StaticHalton,
    /// Pre-filled uniform table.
    StaticUniform,
    /// Pre-filled PCG-32 table.
    StaticPcg,
}

/// A thread-safe scalar sample source. `next` may be called concurrently
/// from any number of threads.
pub struct Sampler {
    kind: SamplerKind,
    counter: AtomicU32,
    domain_size: u32,
    samples: AtomicU32,
}

impl Sampler {
    fn with_kind(kind: SamplerKind, domain_size: u32, samples: u32) -> Self {
        Self {
            kind,
            counter: AtomicU32::new(0),
            domain_size,
            samples: AtomicU32::new(samples),
        }
    }

    /// The tile-count domain of the pass-windowed samplers, derived from the
    /// same 16×16 tile lattice the renderer partitions the image into.
    fn tile_domain(width: u32, height: u32) -> u32 {
        let tiles_per_side = (NUMBER_OF_TILES as f32).sqrt() as u32;
        let block_x = (width / tiles_per_side).max(1);
        let block_y = (height / tiles_per_side).max(1);
        (width / block_x) * (height / block_y)
    }

    pub fn constant(value: f32) -> Self {
        Self::with_kind(SamplerKind::Constant(value), u32::MAX, u32::MAX)
    }

    pub fn halton(width: u32, height: u32, samples: u32) -> Self {
        Self::with_kind(SamplerKind::Halton, Self::tile_domain(width, height), samples)
    }

    pub fn stratified(width: u32, height: u32, samples: u32) -> Self {
        Self::with_kind(
            SamplerKind::Stratified,
            Self::tile_domain(width, height),
            samples,
        )
    }

    pub fn uniform() -> Self {
        Self::with_kind(SamplerKind::Uniform, u32::MAX, u32::MAX)
    }

    pub fn pcg() -> Self {
        Self::with_kind(SamplerKind::Pcg, u32::MAX, u32::MAX)
    }

    pub fn static_halton() -> Self {
        Self::with_kind(SamplerKind::StaticHalton, u32::MAX, u32::MAX)
    }

    pub fn static_uniform() -> Self {
        Self::with_kind(SamplerKind::StaticUniform, u32::MAX, u32::MAX)
    }

    pub fn static_pcg() -> Self {
        Self::with_kind(SamplerKind::StaticPcg, u32::MAX, u32::MAX)
    }

    /// Next sample, ignoring pass windows.
    pub fn next(&self) -> f32 {
        self.next_in_pass(0)
    }

    /// Next sample within the given sampling pass. The pass-windowed variants
    /// return 1.0 once the counter would cross into the next pass's window;
    /// callers treat that sentinel as "pass exhausted".
    pub fn next_in_pass(&self, pass: u32) -> f32 {
        match self.kind {
            SamplerKind::Constant(value) => value,
            SamplerKind::Halton => match self.take_pass_index(pass) {
                Some(index) => halton_sequence(index, 2),
                None => 1.0,
            },
            SamplerKind::Stratified => match self.take_pass_index(pass) {
                Some(index) => index as f32 / self.domain_size as f32,
                None => 1.0,
            },
            SamplerKind::Uniform => UNIFORM_RNG.with(|rng| rng.borrow_mut().gen::<f32>()),
            SamplerKind::Pcg => PCG_RNG.with(|rng| rng.borrow_mut().gen::<f32>()),
            SamplerKind::StaticHalton => static_halton_at(self.take_index()),
            SamplerKind::StaticUniform => {
                uniform_table()[(self.take_index() & STATIC_MASK) as usize]
            }
            SamplerKind::StaticPcg => pcg_table()[(self.take_index() & STATIC_MASK) as usize],
        }
    }

    /// Claims the next index inside the window of the given pass, rolling the
    /// counter back when the window is exhausted (or sampling was stopped).
    fn take_pass_index(&self, pass: u32) -> Option<u32> {
        if self.samples.load(Ordering::Relaxed) == 0 {
            return None;
        }
        let current = self.counter.fetch_add(1, Ordering::Relaxed);
        let window_end = self.domain_size.saturating_mul(pass + 1);
        if current >= window_end {
            self.counter.fetch_sub(1, Ordering::Relaxed);
            return None;
        }
        Some(current.wrapping_sub(pass.wrapping_mul(self.domain_size)))
    }

    fn take_index(&self) -> u32 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Rewinds the sequence to its start.
    pub fn reset(&self) {
        self.counter.store(0, Ordering::Relaxed);
    }

    /// Makes the pass-windowed variants report exhaustion immediately.
    /// Idempotent; callable from any thread.
    pub fn stop(&self) {
        self.samples.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_never_changes() {
        let s = Sampler::constant(0.5);
        for _ in 0..10 {
            assert_eq!(s.next(), 0.5);
        }
    }

    #[test]
    fn halton_pass_window_exhausts_with_sentinel() {
        // 16x16 image: one 1x1 block per tile position, domain 256.
        let s = Sampler::halton(16, 16, 1);
        let mut values = 0;
        loop {
            let v = s.next_in_pass(0);
            if v >= 1.0 {
                break;
            }
            assert!((0.0..1.0).contains(&v));
            values += 1;
        }
        assert_eq!(values, 256);
        // Exhausted window keeps returning the sentinel without advancing.
        assert_eq!(s.next_in_pass(0), 1.0);
        // The next pass window opens where the previous ended.
        assert!(s.next_in_pass(1) < 1.0);
    }

    #[test]
    fn stratified_covers_the_domain_in_order() {
        let s = Sampler::stratified(16, 16, 2);
        assert_eq!(s.next_in_pass(0), 0.0);
        assert_eq!(s.next_in_pass(0), 1.0 / 256.0);
    }

    #[test]
    fn reset_rewinds_the_window() {
        let s = Sampler::halton(16, 16, 1);
        let first = s.next_in_pass(0);
        s.next_in_pass(0);
        s.reset();
        assert_eq!(s.next_in_pass(0), first);
    }

    #[test]
    fn stop_forces_the_sentinel() {
        let s = Sampler::halton(16, 16, 4);
        assert!(s.next_in_pass(0) < 1.0);
        s.stop();
        assert_eq!(s.next_in_pass(0), 1.0);
        s.stop();
        assert_eq!(s.next_in_pass(0), 1.0);
    }

    #[test]
    fn static_tables_stay_in_unit_interval() {
        for sampler in [
            Sampler::static_halton(),
            Sampler::static_uniform(),
            Sampler::static_pcg(),
        ] {
            for _ in 0..1000 {
                let v = sampler.next();
                assert!((0.0..1.0).contains(&v));
            }
        }
    }

    #[test]
    fn live_generators_stay_in_unit_interval() {
        for sampler in [Sampler::uniform(), Sampler::pcg()] {
            for _ in 0..1000 {
                let v = sampler.next();
                assert!((0.0..1.0).contains(&v));
            }
        }
    }

    #[test]
    fn static_indexing_wraps_at_the_mask() {
        let s = Sampler::static_halton();
        let first = s.next();
        // Advance exactly one full table length; the sequence must repeat.
        for _ in 0..STATIC_MASK {
            s.next();
        }
        assert_eq!(s.next(), first);
    }
}
