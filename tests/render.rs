mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bumpalo::Bump;
use pretty_assertions::assert_eq;

use lumen::{point3f, vec3f, Float, RayDifferential};
use lumen::camera::{Camera, CameraBase, OrthographicCamera};
use lumen::config::RenderOptions;
use lumen::film::{Film, FilmBase, FilmKind, GBufferFilm, VisibleSurface};
use lumen::filter::Filter;
use lumen::integrator::{Integrator, PathIntegrator, RandomWalkIntegrator, RayIntegrator, RenderReport, TileRenderer};
use lumen::lightsampler::LightSamplerStrategy;
use lumen::profile::Profile;
use lumen::sampler::{IndependentSampler, Sampler, StratifiedSampler};
use lumen::spectrum::{SampledSpectrum, SampledWavelengths};

use common::lit_floor_scene;

const WIDTH: i32 = 24;
const HEIGHT: i32 = 18;

fn options() -> RenderOptions {
    RenderOptions { tile_size: 8, seed: 17, ..Default::default() }
}

fn render_on<R: RayIntegrator>(
    threads: usize,
    estimator: R,
    sampler: Sampler,
    options: RenderOptions,
) -> anyhow::Result<(Vec<[Float; 3]>, RenderReport)> {
    let arena = Bump::new();
    let film = common::film(&arena, WIDTH, HEIGHT);
    let camera = common::camera(&arena, film, point3f!(0, 2, 5), point3f!(0, 0.5, 0))?;
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
    let report = TileRenderer::new(camera, sampler, estimator, options).render_with_pool(&pool);
    Ok((film.rgb_buffer(1.0), report))
}

#[test]
fn thread_count_does_not_change_the_image() -> anyhow::Result<()> {
    let arena = Bump::new();
    let (aggregate, lights) = lit_floor_scene(&arena)?;
    let scene = Integrator::new(Some(aggregate), lights);
    let sampler = || Sampler::from(StratifiedSampler::new(2, 2, true, 17));

    let path = || PathIntegrator::new(&scene, 5, LightSamplerStrategy::Exhaustive, false);
    let (single, single_report) = render_on(1, path(), sampler(), options())?;
    let (many, many_report) = render_on(4, path(), sampler(), options())?;
    assert_eq!(single.len(), (WIDTH * HEIGHT) as usize);
    assert!(single.iter().any(|p| p.iter().any(|&c| c > 0.0)));
    assert_eq!(single, many);
    assert_eq!(single_report, many_report);

    let walk = || RandomWalkIntegrator::new(&scene, 3);
    let (single, _) = render_on(1, walk(), sampler(), options())?;
    let (many, _) = render_on(3, walk(), sampler(), options())?;
    assert_eq!(single, many);
    Ok(())
}

#[test]
fn report_counts_every_tile_and_camera_ray() -> anyhow::Result<()> {
    let arena = Bump::new();
    let (aggregate, lights) = lit_floor_scene(&arena)?;
    let scene = Integrator::new(Some(aggregate), lights);
    let spp = 3;
    let (_, report) = render_on(
        2,
        PathIntegrator::new(&scene, 2, LightSamplerStrategy::Power, false),
        Sampler::from(IndependentSampler::new(spp, 1)),
        options(),
    )?;

    // 24x18 in 8x8 tiles
    assert_eq!(report.tiles_total, 3 * 3);
    assert_eq!(report.tiles_completed, report.tiles_total);
    assert!(!report.cancelled);
    assert_eq!(report.profile.camera_rays, (WIDTH * HEIGHT) as u64 * spp as u64);
    assert_eq!(report.profile.paths, report.profile.camera_rays);
    assert_eq!(report.profile.nan_samples, 0);
    assert!(report.profile.within_depth(2));
    Ok(())
}

#[test]
fn cancelled_render_stops_before_any_tile() -> anyhow::Result<()> {
    let arena = Bump::new();
    let (aggregate, lights) = lit_floor_scene(&arena)?;
    let scene = Integrator::new(Some(aggregate), lights);
    let film = common::film(&arena, WIDTH, HEIGHT);
    let camera = common::camera(&arena, film, point3f!(0, 2, 5), point3f!(0, 0.5, 0))?;
    let renderer = TileRenderer::new(
        camera,
        Sampler::from(IndependentSampler::new(4, 0)),
        RandomWalkIntegrator::new(&scene, 2),
        options(),
    );

    let report = renderer.render_cancellable(&AtomicBool::new(true));
    assert!(report.cancelled);
    assert_eq!(report.tiles_completed, 0);
    assert_eq!(report.profile.camera_rays, 0);
    assert!(film.rgb_buffer(1.0).iter().all(|p| *p == [0.0; 3]));
    Ok(())
}

/// Sees a constant white world and raises `stop` on its first sample.
struct StopAfterFirstSample<'c> {
    stop: &'c AtomicBool,
    samples: AtomicUsize,
}

impl RayIntegrator for StopAfterFirstSample<'_> {
    fn li(
        &self,
        _ray: RayDifferential,
        _lambda: &mut SampledWavelengths,
        _sampler: &mut Sampler,
        _arena: &Bump,
        _visible_surface: Option<&mut VisibleSurface>,
        _profile: &mut Profile,
    ) -> SampledSpectrum {
        self.stop.store(true, Ordering::Relaxed);
        self.samples.fetch_add(1, Ordering::Relaxed);
        SampledSpectrum::one()
    }
}

#[test]
fn cancelling_mid_render_finishes_started_tiles() -> anyhow::Result<()> {
    // 24x16 splits into six full 8x8 tiles
    let (width, height, spp) = (24, 16, 3);
    let arena = Bump::new();
    let film = common::film(&arena, width, height);
    let camera = common::camera(&arena, film, point3f!(0, 2, 5), point3f!(0, 0.5, 0))?;
    let stop = AtomicBool::new(false);
    let renderer = TileRenderer::new(
        camera,
        Sampler::from(IndependentSampler::new(spp, 0)),
        StopAfterFirstSample { stop: &stop, samples: AtomicUsize::new(0) },
        options(),
    );

    let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build()?;
    let report = pool.install(|| renderer.render_cancellable(&stop));
    assert!(report.cancelled);
    assert_eq!(report.tiles_total, 6);
    assert!(report.tiles_completed >= 1 && report.tiles_completed < report.tiles_total, "{:?}", report);

    // every started tile ran every sample of every pixel
    let tile_samples = 8 * 8 * spp;
    assert_eq!(report.profile.camera_rays, (report.tiles_completed * tile_samples) as u64);
    assert_eq!(renderer.estimator().samples.load(Ordering::Relaxed), report.tiles_completed * tile_samples);
    let lit = film.rgb_buffer(1.0).iter().filter(|p| p.iter().any(|&c| c > 0.0)).count();
    assert_eq!(lit, report.tiles_completed * 8 * 8);
    Ok(())
}

#[test]
fn gbuffer_records_the_first_visible_surface() -> anyhow::Result<()> {
    let arena = Bump::new();
    let (aggregate, lights) = lit_floor_scene(&arena)?;
    let scene = Integrator::new(Some(aggregate), lights);

    let base = FilmBase::with_resolution(4, 4, Filter::default());
    let gbuffer: &GBufferFilm = arena.alloc(GBufferFilm::new(base, Float::INFINITY));
    let film = Film::from(gbuffer);
    assert!(film.uses_visible_surface());

    // looking straight down at the floor, away from the ball
    let base = CameraBase::look_at(point3f!(-2, 1, 0), point3f!(-2, 0, 0), vec3f!(0, 0, 1), film)?;
    let camera: &OrthographicCamera = arena.alloc(OrthographicCamera::new(base, 0.0, 1e6));
    let centred = RenderOptions { disable_pixel_jitter: true, ..options() };
    TileRenderer::new(
        Camera::from(camera),
        Sampler::from(IndependentSampler::new(2, 0)),
        PathIntegrator::new(&scene, 1, LightSamplerStrategy::Power, false),
        centred,
    )
    .render();

    for p in film.pixel_bounds().iter_points() {
        let g = gbuffer.get_pixel_gbuffer(p);
        approx::assert_abs_diff_eq!(g.p.y, 0.0, epsilon = 1e-4);
        approx::assert_abs_diff_eq!(g.n.0.y.abs(), 1.0, epsilon = 1e-4);
        let [r, g_, b] = g.albedo;
        assert!(0.2126 * r + 0.7152 * g_ + 0.0722 * b > 0.0, "{:?}", g);
    }
    assert_eq!(film.pixel_bounds().pixel_count(), 16);
    Ok(())
}
