use std::path::PathBuf;

use anyhow::Context;
use bumpalo::Bump;
use clap::Parser;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use tracing_tree::HierarchicalLayer;

use lumen::{point3f, vec3f, Float, Point3f, Transform, Vec3f};
use lumen::camera::{Camera, CameraBase, PerspectiveCamera};
use lumen::config::{IntegratorType, RenderConfig};
use lumen::film::{Film, FilmBase, RgbFilm};
use lumen::integrator::{
    Integrator, PathIntegrator, RandomWalkIntegrator, RayIntegrator, RenderReport, SimplePathIntegrator, TileRenderer,
};
use lumen::light::{DiffuseAreaLight, Light};
use lumen::material::{ConductorMaterial, DielectricMaterial, DiffuseMaterial, Material, Roughness};
use lumen::primitive::{GeometricPrimitive, Primitive, PrimitiveList};
use lumen::sampler::Sampler;
use lumen::shapes::{Shape, Sphere, Triangle, TriangleMesh};
use lumen::spectrum::Spectrum;

#[derive(Parser, Debug)]
#[command(author, version, about = "Renders the built-in box scene")]
struct Args {
    /// TOML render configuration. Every field is optional.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the output path from the config.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of render threads, defaults to one per core.
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Overrides the samples per pixel from the config.
    #[arg(long)]
    spp: Option<usize>,

    /// Only log warnings and hide the progress bar.
    #[arg(short, long)]
    quiet: bool,
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(HierarchicalLayer::new(2).with_targets(true))
        .init();
}

/// A closed box with an opening towards the camera, lit by a small panel under the ceiling.
fn build_demo_scene(arena: &Bump) -> anyhow::Result<(Primitive<'_>, Vec<Light<'_>>)> {
    let white = Material::from(&*arena.alloc(DiffuseMaterial::new(Spectrum::constant(0.73))));
    let red = Material::from(&*arena.alloc(DiffuseMaterial::new(Spectrum::constant(0.2))));
    let gold = Material::from(&*arena.alloc(ConductorMaterial::new(
        Spectrum::constant(0.27),
        Spectrum::constant(2.8),
        Roughness::isotropic(0.3),
    )));
    let glass = Material::from(&*arena.alloc(DielectricMaterial::new(Spectrum::constant(1.5), Roughness::smooth())));

    let mut prims: Vec<Primitive> = Vec::new();

    // floor, ceiling, back wall, left and right walls of a 2x2x2 box
    #[rustfmt::skip]
    let walls: &TriangleMesh = arena.alloc(TriangleMesh::new(
        &Transform::IDENTITY,
        false,
        vec![
            0, 1, 2, 0, 2, 3,
            4, 6, 5, 4, 7, 6,
            1, 5, 6, 1, 6, 2,
            0, 4, 5, 0, 5, 1,
            3, 2, 6, 3, 6, 7,
        ],
        vec![
            point3f!(-1, 0, 1), point3f!(-1, 0, -1), point3f!(1, 0, -1), point3f!(1, 0, 1),
            point3f!(-1, 2, 1), point3f!(-1, 2, -1), point3f!(1, 2, -1), point3f!(1, 2, 1),
        ],
        None,
        None,
    )?);
    for (i, tri) in walls.triangles().enumerate() {
        let shape = Shape::from(&*arena.alloc(tri));
        // the left wall is tinted so the two sides can be told apart
        let material = if (6..8).contains(&i) { red } else { white };
        prims.push(Primitive::from(&*arena.alloc(GeometricPrimitive::new(shape, Some(material), None))));
    }

    let panel: &TriangleMesh = arena.alloc(TriangleMesh::new(
        &Transform::translate(vec3f!(0, 1.98, 0)),
        false,
        vec![0, 1, 2, 0, 2, 3],
        vec![point3f!(-0.25, 0, -0.25), point3f!(0.25, 0, -0.25), point3f!(0.25, 0, 0.25), point3f!(-0.25, 0, 0.25)],
        None,
        None,
    )?);
    let mut lights = Vec::new();
    for tri_id in 0..panel.n_triangles() {
        let shape = Shape::from(&*arena.alloc(Triangle::new(panel, tri_id)));
        let light = Light::from(&*arena.alloc(DiffuseAreaLight::new(shape, Spectrum::constant(1.0), 17.0, true)));
        lights.push(light);
        prims.push(Primitive::from(&*arena.alloc(GeometricPrimitive::new(shape, Some(white), Some(light)))));
    }

    let spheres = [
        (point3f!(-0.5, 0.35, -0.3), 0.35, white),
        (point3f!(0.5, 0.3, 0.3), 0.3, glass),
        (point3f!(0.15, 0.25, -0.6), 0.25, gold),
    ];
    for (center, radius, material) in spheres {
        let shape = Shape::from(&*arena.alloc(Sphere::new(center, radius, false)));
        prims.push(Primitive::from(&*arena.alloc(GeometricPrimitive::new(shape, Some(material), None))));
    }

    let aggregate = Primitive::from(&*arena.alloc(PrimitiveList::new(prims)));
    Ok((aggregate, lights))
}

fn run<R: RayIntegrator>(
    camera: Camera<'_>,
    sampler: Sampler,
    estimator: R,
    config: &RenderConfig,
    threads: Option<usize>,
) -> anyhow::Result<RenderReport> {
    let renderer = TileRenderer::new(camera, sampler, estimator, config.options.clone());
    let report = match threads {
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .with_context(|| format!("failed to start a pool of {} threads", n))?;
            renderer.render_with_pool(&pool)
        }
        None => renderer.render(),
    };
    Ok(report)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.quiet);

    let mut config = match &args.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };
    if let Some(spp) = args.spp {
        config.image.spp = spp;
    }
    if let Some(output) = args.output {
        config.image.output = output;
    }
    config.options.show_progress = !args.quiet;
    anyhow::ensure!(config.image.spp > 0, "at least one sample per pixel is required");
    anyhow::ensure!(
        config.image.width > 0 && config.image.height > 0,
        "image must be at least 1x1, got {}x{}",
        config.image.width,
        config.image.height
    );
    info!(?config, "loaded configuration");

    let arena = Bump::new();
    let (aggregate, lights) = build_demo_scene(&arena)?;
    let scene = Integrator::new(Some(aggregate), lights);

    let base = FilmBase::with_resolution(config.image.width, config.image.height, config.filter.create());
    let film: &RgbFilm = arena.alloc(RgbFilm::new(base, Float::INFINITY));
    let film = Film::from(film);

    let cc = &config.camera;
    let camera_base = CameraBase::look_at(
        Point3f::from(cc.look_from),
        Point3f::from(cc.look_at),
        Vec3f::from(cc.up),
        film,
    )?;
    let camera: &PerspectiveCamera =
        arena.alloc(PerspectiveCamera::new(camera_base, cc.fov, cc.lens_radius, cc.focal_distance)?);
    let camera = Camera::from(camera);

    let sampler = config.sampler.create(config.image.spp, config.options.seed);
    let ic = &config.integrator;
    let report = match ic.kind {
        IntegratorType::RandomWalk => {
            run(camera, sampler, RandomWalkIntegrator::new(&scene, ic.max_depth), &config, args.threads)?
        }
        IntegratorType::SimplePath => run(
            camera,
            sampler,
            SimplePathIntegrator::new(&scene, ic.max_depth, ic.sample_lights, ic.sample_bsdf),
            &config,
            args.threads,
        )?,
        IntegratorType::Path => run(
            camera,
            sampler,
            PathIntegrator::new(&scene, ic.max_depth, ic.light_sampler, ic.regularize),
            &config,
            args.threads,
        )?,
    };
    info!(tiles = report.tiles_completed, "render finished");

    film.write_png(&config.image.output, 1.0)?;
    Ok(())
}
