use crate::{Float, Point2f, Point2i};
use crate::math::hash_values;

mod independent;
mod stratified;

pub use independent::IndependentSampler;
pub use stratified::StratifiedSampler;

/// A deterministic stream of sample values for one pixel sample at a time.
///
/// Values depend only on the pixel, the sample index, the dimension and the seed, never on
/// which worker asks for them, so a render is reproducible under any scheduling. Instances
/// are not shared between workers, each one clones its own.
pub trait SamplerKind {
    fn samples_per_pixel(&self) -> usize;

    /// Positions the stream at dimension `dim` of sample `index` of `pixel`.
    fn start_pixel_sample(&mut self, pixel: Point2i, index: usize, dim: usize);

    fn get_1d(&mut self) -> Float;

    fn get_2d(&mut self) -> Point2f;

    /// 2D sample used for the position on the film.
    fn get_pixel_2d(&mut self) -> Point2f {
        self.get_2d()
    }
}

tagged_handle! {
    #[derive(Clone, Debug)]
    pub enum Sampler {
        Independent(IndependentSampler),
        Stratified(StratifiedSampler),
    }
}

impl SamplerKind for Sampler {
    fn samples_per_pixel(&self) -> usize {
        each_kind!(self, Independent, Stratified => |s| s.samples_per_pixel())
    }

    fn start_pixel_sample(&mut self, pixel: Point2i, index: usize, dim: usize) {
        each_kind!(self, Independent, Stratified => |s| s.start_pixel_sample(pixel, index, dim))
    }

    fn get_1d(&mut self) -> Float {
        each_kind!(self, Independent, Stratified => |s| s.get_1d())
    }

    fn get_2d(&mut self) -> Point2f {
        each_kind!(self, Independent, Stratified => |s| s.get_2d())
    }

    fn get_pixel_2d(&mut self) -> Point2f {
        each_kind!(self, Independent, Stratified => |s| s.get_pixel_2d())
    }
}

fn pixel_sample_seed(pixel: Point2i, index: usize, seed: u64) -> u64 {
    hash_values(&[pixel.x as u64, pixel.y as u64, index as u64, seed])
}
