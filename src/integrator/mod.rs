//! The scene-level integrator and the tile-parallel driver that feeds camera rays to a
//! radiance estimator.

use std::sync::atomic::{AtomicBool, Ordering};

use bumpalo::Bump;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, error, info, info_span, trace, warn};

use crate::{Bounds2i, Float, Point2f, Point2i, Ray, RayDifferential, SHADOW_EPSILON, SurfaceHit, Vec2f};
use crate::camera::{Camera, CameraKind, CameraSample};
use crate::config::RenderOptions;
use crate::film::{FilmKind, VisibleSurface};
use crate::filter::FilterKind;
use crate::geometry::Bounds3f;
use crate::light::{Light, LightKind, LightType};
use crate::primitive::{Primitive, PrimitiveKind};
use crate::profile::Profile;
use crate::sampler::{Sampler, SamplerKind};
use crate::shapes::ShapeIntersection;
use crate::spectrum::{SampledSpectrum, SampledWavelengths};

mod path;
mod random_walk;
mod simple_path;

pub use path::PathIntegrator;
pub use random_walk::RandomWalkIntegrator;
pub use simple_path::SimplePathIntegrator;

/// The scene as the estimators see it: an aggregate to trace rays against and the lights.
pub struct Integrator<'a> {
    aggregate: Option<Primitive<'a>>,
    lights: Vec<Light<'a>>,
    infinite_lights: Vec<Light<'a>>,
    bounds: Bounds3f,
}

impl<'a> Integrator<'a> {
    /// Lights are preprocessed with the aggregate's bounds here, once.
    pub fn new(aggregate: Option<Primitive<'a>>, lights: Vec<Light<'a>>) -> Self {
        let bounds = aggregate.map_or_else(Bounds3f::empty, |a| a.bounds());
        for light in &lights {
            light.preprocess(&bounds);
        }
        let infinite_lights: Vec<_> = lights
            .iter()
            .copied()
            .filter(|l| l.light_type() == LightType::Infinite)
            .collect();
        debug!(lights = lights.len(), infinite_lights = infinite_lights.len(), "preprocessed lights");
        Self { aggregate, lights, infinite_lights, bounds }
    }

    pub fn lights(&self) -> &[Light<'a>] {
        &self.lights
    }

    pub fn infinite_lights(&self) -> &[Light<'a>] {
        &self.infinite_lights
    }

    pub fn bounds(&self) -> Bounds3f {
        self.bounds
    }

    pub fn intersect(&self, ray: &Ray, t_max: Float) -> Option<ShapeIntersection<'a>> {
        self.aggregate?.intersect(ray, t_max)
    }

    pub fn intersect_p(&self, ray: &Ray, t_max: Float) -> bool {
        self.aggregate.map_or(false, |a| a.intersect_p(ray, t_max))
    }

    /// Whether the segment between two points is free of geometry. The shadow ray stops just
    /// short of `p1` so it doesn't hit the surface `p1` lies on.
    pub fn unoccluded(&self, p0: &SurfaceHit, p1: &SurfaceHit) -> bool {
        !self.intersect_p(&p0.spawn_ray_to_hit(p1), 1.0 - SHADOW_EPSILON)
    }

    /// Fraction of light that makes it from `p0` to `p1`. Interface surfaces are passed
    /// through, any scattering surface blocks everything.
    pub fn transmittance(&self, p0: &SurfaceHit, p1: &SurfaceHit, _lambda: &SampledWavelengths) -> SampledSpectrum {
        let mut ray = p0.spawn_ray_to_hit(p1);
        loop {
            match self.intersect(&ray, 1.0 - SHADOW_EPSILON) {
                None => return SampledSpectrum::one(),
                Some(si) if si.intr.material.is_some() => return SampledSpectrum::zero(),
                Some(si) => ray = si.intr.hit.spawn_ray_to_hit(p1),
            }
        }
    }
}

/// Estimates the radiance arriving along a camera ray.
pub trait RayIntegrator: Sync {
    /// `visible_surface` is filled in from the first scattering surface when given.
    fn li(
        &self,
        ray: RayDifferential,
        lambda: &mut SampledWavelengths,
        sampler: &mut Sampler,
        arena: &Bump,
        visible_surface: Option<&mut VisibleSurface>,
        profile: &mut Profile,
    ) -> SampledSpectrum;
}

/// Summary of a finished or cancelled render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderReport {
    pub profile: Profile,
    pub tiles_completed: usize,
    pub tiles_total: usize,
    pub cancelled: bool,
}

/// Renders the camera's film tile by tile on the rayon pool.
pub struct TileRenderer<'a, R: RayIntegrator> {
    camera: Camera<'a>,
    sampler: Sampler,
    estimator: R,
    options: RenderOptions,
}

impl<'a, R: RayIntegrator> TileRenderer<'a, R> {
    /// `sampler` is a prototype, every tile works on its own clone.
    pub fn new(camera: Camera<'a>, sampler: Sampler, estimator: R, options: RenderOptions) -> Self {
        Self { camera, sampler, estimator, options }
    }

    pub fn estimator(&self) -> &R {
        &self.estimator
    }

    pub fn render(&self) -> RenderReport {
        self.render_cancellable(&AtomicBool::new(false))
    }

    /// Runs on `pool` instead of the global rayon pool.
    pub fn render_with_pool(&self, pool: &rayon::ThreadPool) -> RenderReport {
        pool.install(|| self.render())
    }

    /// Renders until done or until `cancel` is set. Cancellation is checked before each
    /// tile starts, a tile that has started always finishes.
    pub fn render_cancellable(&self, cancel: &AtomicBool) -> RenderReport {
        let film = self.camera.film();
        let pixel_bounds = film.pixel_bounds();
        let tiles: Vec<Bounds2i> = pixel_bounds.tiles(self.options.tile_size).collect();
        let spp = self.sampler.samples_per_pixel();

        let span = info_span!("render", width = pixel_bounds.diagonal().x, height = pixel_bounds.diagonal().y, spp);
        let _guard = span.enter();
        info!(tiles = tiles.len(), "starting render");

        let progress = if self.options.show_progress {
            let bar = ProgressBar::new(tiles.len() as u64);
            bar.set_style(
                ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} tiles ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        let (profile, tiles_completed) = tiles
            .par_iter()
            .map(|&tile| {
                if cancel.load(Ordering::Relaxed) {
                    return (Profile::default(), 0);
                }
                let profile = self.render_tile(tile);
                progress.inc(1);
                (profile, 1)
            })
            .reduce(|| (Profile::default(), 0), |(a, n), (b, m)| (a.merge(b), n + m));
        progress.finish_and_clear();

        let report = RenderReport {
            profile,
            tiles_completed,
            tiles_total: tiles.len(),
            cancelled: tiles_completed < tiles.len(),
        };
        if report.cancelled {
            warn!(completed = report.tiles_completed, total = report.tiles_total, "render cancelled");
        }
        report.profile.log_summary();
        report
    }

    fn render_tile(&self, tile: Bounds2i) -> Profile {
        let mut sampler = self.sampler.clone();
        let mut arena = Bump::new();
        let mut profile = Profile::default();
        let spp = sampler.samples_per_pixel();

        for pixel in tile.iter_points() {
            for index in 0..spp {
                evaluate_pixel_sample(
                    &self.estimator,
                    self.camera,
                    &mut sampler,
                    pixel,
                    index,
                    &self.options,
                    &arena,
                    &mut profile,
                );
                arena.reset();
            }
        }
        trace!(?tile, "finished tile");
        profile
    }
}

/// Filter-distributed film position, time and lens position for one pixel sample.
fn get_camera_sample(sampler: &mut Sampler, pixel: Point2i, filter: &impl FilterKind, options: &RenderOptions) -> CameraSample {
    let mut fs = filter.sample(sampler.get_pixel_2d());
    if options.disable_pixel_jitter {
        fs.p = Point2f::new(0.0, 0.0);
        fs.weight = 1.0;
    }
    let p_film = Point2f::new(pixel.x as Float, pixel.y as Float) + Vec2f::new(fs.p.x + 0.5, fs.p.y + 0.5);
    let time = sampler.get_1d();
    let p_lens = sampler.get_2d();
    CameraSample { p_film, p_lens, time, filter_weight: fs.weight }
}

/// Traces sample `index` of `pixel` and adds it to the camera's film.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_pixel_sample<R: RayIntegrator + ?Sized>(
    estimator: &R,
    camera: Camera<'_>,
    sampler: &mut Sampler,
    pixel: Point2i,
    index: usize,
    options: &RenderOptions,
    arena: &Bump,
    profile: &mut Profile,
) {
    let film = camera.film();
    sampler.start_pixel_sample(pixel, index, 0);

    let lu = sampler.get_1d();
    let lu = if options.disable_wavelength_jitter { 0.5 } else { lu };
    let mut lambda = film.sample_wavelengths(lu);

    let camera_sample = get_camera_sample(sampler, pixel, film.filter(), options);
    let mut visible_surface = VisibleSurface::default();
    let mut l = SampledSpectrum::zero();

    if let Some(mut cr) = camera.generate_ray_differential(camera_sample, &lambda) {
        profile.camera_rays += 1;
        if !options.disable_pixel_jitter {
            let scale = Float::max(0.125, 1.0 / (sampler.samples_per_pixel() as Float).sqrt());
            cr.ray.scale_differentials(scale);
        }

        let vs = film.uses_visible_surface().then_some(&mut visible_surface);
        l = cr.weight * estimator.li(cr.ray, &mut lambda, sampler, arena, vs, profile);

        if !l.is_finite() {
            error!(?pixel, sample = index, "non-finite radiance estimate, discarding");
            profile.nan_samples += 1;
            l = SampledSpectrum::zero();
        }
    }

    film.add_sample(pixel, l, &lambda, Some(&visible_surface), camera_sample.filter_weight);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Shape, Sphere};
    use crate::primitive::{GeometricPrimitive, PrimitiveList};
    use crate::material::{DiffuseMaterial, Material};
    use crate::spectrum::Spectrum;

    #[test]
    fn empty_scene_never_intersects() {
        let scene = Integrator::new(None, vec![]);
        let ray = Ray::new(point3f!(0, 0, 0), vec3f!(0, 0, 1));
        assert!(scene.intersect(&ray, Float::INFINITY).is_none());
        assert!(!scene.intersect_p(&ray, Float::INFINITY));
        assert!(scene.bounds().is_empty());
    }

    #[test]
    fn visibility_and_transmittance() {
        let blocker = Sphere::new(point3f!(0, 0, 5), 1.0, false);
        let portal = Sphere::new(point3f!(0, 0, -5), 1.0, false);
        let material = DiffuseMaterial::new(Spectrum::constant(0.5));
        let (b, p) = (
            GeometricPrimitive::new(Shape::from(&blocker), Some(Material::from(&material)), None),
            GeometricPrimitive::new(Shape::from(&portal), None, None),
        );
        let list = PrimitiveList::new(vec![Primitive::from(&b), Primitive::from(&p)]);
        let scene = Integrator::new(Some(Primitive::from(&list)), vec![]);
        let lambda = SampledWavelengths::sample_visible(0.5);

        let origin = SurfaceHit::from_point(point3f!(0, 0, 0), 0.0);
        let behind_blocker = SurfaceHit::from_point(point3f!(0, 0, 10), 0.0);
        let behind_portal = SurfaceHit::from_point(point3f!(0, 0, -10), 0.0);
        assert!(!scene.unoccluded(&origin, &behind_blocker));
        assert!(scene.transmittance(&origin, &behind_blocker, &lambda).is_black());
        // the material-less sphere is an interface: it occludes but lets light through
        assert!(!scene.unoccluded(&origin, &behind_portal));
        assert_eq!(scene.transmittance(&origin, &behind_portal, &lambda)[0], 1.0);
        assert!(scene.unoccluded(&origin, &SurfaceHit::from_point(point3f!(3, 0, 0), 0.0)));
    }
}
