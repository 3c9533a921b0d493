use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use crate::{Float, Point2f, Point2i};
use crate::math::{hash_values, permutation_element, ONE_MINUS_EPSILON};
use crate::sampler::{pixel_sample_seed, SamplerKind};

/// Jittered stratification of each dimension into `x_samples * y_samples` strata.
///
/// Every dimension draws its own permutation of the strata (hashed from the pixel, the
/// dimension and the seed), so the sample indices of one pixel cover each stratum exactly
/// once in every dimension without correlating dimensions with each other.
#[derive(Clone, Debug)]
pub struct StratifiedSampler {
    x_samples: usize,
    y_samples: usize,
    jitter: bool,
    seed: u64,
    pixel: Point2i,
    sample_index: usize,
    dimension: usize,
    rng: Xoshiro256Plus,
}

impl StratifiedSampler {
    pub fn new(x_samples: usize, y_samples: usize, jitter: bool, seed: u64) -> Self {
        assert!(x_samples * y_samples > 0, "sampler needs at least one sample per pixel");
        Self {
            x_samples,
            y_samples,
            jitter,
            seed,
            pixel: Point2i::new(0, 0),
            sample_index: 0,
            dimension: 0,
            rng: Xoshiro256Plus::seed_from_u64(seed),
        }
    }

    fn stratum(&self) -> usize {
        let hash = hash_values(&[self.pixel.x as u64, self.pixel.y as u64, self.dimension as u64, self.seed]);
        let spp = self.samples_per_pixel() as u32;
        permutation_element(self.sample_index as u32, spp, hash as u32) as usize
    }

    fn offset(&mut self) -> Float {
        if self.jitter { self.rng.gen() } else { 0.5 }
    }
}

impl SamplerKind for StratifiedSampler {
    fn samples_per_pixel(&self) -> usize {
        self.x_samples * self.y_samples
    }

    fn start_pixel_sample(&mut self, pixel: Point2i, index: usize, dim: usize) {
        self.pixel = pixel;
        self.sample_index = index;
        self.dimension = dim;
        self.rng = Xoshiro256Plus::seed_from_u64(pixel_sample_seed(pixel, index, self.seed));
        for _ in 0..dim {
            self.rng.gen::<Float>();
        }
    }

    fn get_1d(&mut self) -> Float {
        let stratum = self.stratum();
        self.dimension += 1;
        let delta = self.offset();
        Float::min((stratum as Float + delta) / self.samples_per_pixel() as Float, ONE_MINUS_EPSILON)
    }

    fn get_2d(&mut self) -> Point2f {
        let stratum = self.stratum();
        self.dimension += 2;
        let (x, y) = (stratum % self.x_samples, stratum / self.x_samples);
        let dx = self.offset();
        let dy = self.offset();
        Point2f::new(
            Float::min((x as Float + dx) / self.x_samples as Float, ONE_MINUS_EPSILON),
            Float::min((y as Float + dy) / self.y_samples as Float, ONE_MINUS_EPSILON),
        )
    }
}
