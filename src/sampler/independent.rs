use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use crate::{Float, Point2f, Point2i};
use crate::sampler::{pixel_sample_seed, SamplerKind};

/// Uniform random values with no correlation between samples.
#[derive(Clone, Debug)]
pub struct IndependentSampler {
    samples_per_pixel: usize,
    seed: u64,
    rng: Xoshiro256Plus,
}

impl IndependentSampler {
    pub fn new(samples_per_pixel: usize, seed: u64) -> Self {
        assert!(samples_per_pixel > 0, "sampler needs at least one sample per pixel");
        Self { samples_per_pixel, seed, rng: Xoshiro256Plus::seed_from_u64(seed) }
    }
}

impl SamplerKind for IndependentSampler {
    fn samples_per_pixel(&self) -> usize {
        self.samples_per_pixel
    }

    fn start_pixel_sample(&mut self, pixel: Point2i, index: usize, dim: usize) {
        self.rng = Xoshiro256Plus::seed_from_u64(pixel_sample_seed(pixel, index, self.seed));
        for _ in 0..dim {
            self.rng.gen::<Float>();
        }
    }

    fn get_1d(&mut self) -> Float {
        self.rng.gen()
    }

    fn get_2d(&mut self) -> Point2f {
        Point2f::new(self.rng.gen(), self.rng.gen())
    }
}
