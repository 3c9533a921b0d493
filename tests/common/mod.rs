#![allow(dead_code)]

use bumpalo::Bump;

use lumen::{point3f, Float, Point2i, Point3f, Ray, Transform, Vec3f};
use lumen::camera::{Camera, CameraBase, PerspectiveCamera};
use lumen::film::{Film, FilmBase, RgbFilm};
use lumen::filter::{BoxFilter, Filter};
use lumen::integrator::RayIntegrator;
use lumen::light::{DiffuseAreaLight, Light};
use lumen::material::{DiffuseMaterial, Material};
use lumen::primitive::{GeometricPrimitive, Primitive, PrimitiveList};
use lumen::profile::Profile;
use lumen::sampler::{IndependentSampler, Sampler, SamplerKind};
use lumen::shapes::{Shape, Sphere, Triangle, TriangleMesh};
use lumen::spectrum::{SampledWavelengths, Spectrum};

/// Allocates `kind` in `arena` and wraps it in the handle `H`.
pub fn alloc<'a, K: 'a, H: From<&'a K>>(arena: &'a Bump, kind: K) -> H {
    H::from(&*arena.alloc(kind))
}

pub fn diffuse(arena: &Bump, reflectance: Float) -> Material<'_> {
    alloc(arena, DiffuseMaterial::new(Spectrum::constant(reflectance)))
}

pub fn sphere<'a>(arena: &'a Bump, center: Point3f, radius: Float, material: Option<Material<'a>>) -> Primitive<'a> {
    let shape: Shape = alloc(arena, Sphere::new(center, radius, false));
    alloc(arena, GeometricPrimitive::new(shape, material, None))
}

/// An emitting sphere with a black diffuse surface, so paths that reach it end there.
pub fn sphere_light<'a>(arena: &'a Bump, center: Point3f, radius: Float, radiance: Float) -> (Primitive<'a>, Light<'a>) {
    let shape: Shape = alloc(arena, Sphere::new(center, radius, false));
    let light: Light = alloc(arena, DiffuseAreaLight::new(shape, Spectrum::constant(radiance), 1.0, false));
    let prim = alloc(arena, GeometricPrimitive::new(shape, Some(diffuse(arena, 0.0)), Some(light)));
    (prim, light)
}

/// A square in the y=0 plane centered on the origin.
pub fn floor<'a>(arena: &'a Bump, half_size: Float, material: Material<'a>) -> anyhow::Result<Vec<Primitive<'a>>> {
    let s = half_size;
    let mesh: &TriangleMesh = arena.alloc(TriangleMesh::new(
        &Transform::IDENTITY,
        false,
        vec![0, 2, 1, 0, 3, 2],
        vec![point3f!(-s, 0, -s), point3f!(s, 0, -s), point3f!(s, 0, s), point3f!(-s, 0, s)],
        None,
        None,
    )?);
    Ok((0..mesh.n_triangles())
        .map(|id| {
            let shape: Shape = alloc(arena, Triangle::new(mesh, id));
            let prim: Primitive = alloc(arena, GeometricPrimitive::new(shape, Some(material), None));
            prim
        })
        .collect())
}

pub fn aggregate<'a>(arena: &'a Bump, prims: Vec<Primitive<'a>>) -> Primitive<'a> {
    alloc(arena, PrimitiveList::new(prims))
}

/// A diffuse floor under a spherical light, with a diffuse ball off to the side so some
/// paths bounce more than once.
pub fn lit_floor_scene(arena: &Bump) -> anyhow::Result<(Primitive<'_>, Vec<Light<'_>>)> {
    let mut prims = floor(arena, 4.0, diffuse(arena, 0.5))?;
    prims.push(sphere(arena, point3f!(1, 0.5, 0), 0.5, Some(diffuse(arena, 0.8))));
    let (light_prim, light) = sphere_light(arena, point3f!(0, 3, 0), 0.5, 4.0);
    prims.push(light_prim);
    Ok((aggregate(arena, prims), vec![light]))
}

pub fn film(arena: &Bump, width: i32, height: i32) -> Film<'_> {
    let base = FilmBase::with_resolution(width, height, Filter::from(BoxFilter::new(lumen::Vec2f::new(0.5, 0.5))));
    let film: &RgbFilm = arena.alloc(RgbFilm::new(base, Float::INFINITY));
    Film::from(film)
}

pub fn camera<'a>(arena: &'a Bump, film: Film<'a>, from: Point3f, at: Point3f) -> anyhow::Result<Camera<'a>> {
    let base = CameraBase::look_at(from, at, Vec3f::unit_y(), film)?;
    let camera: &PerspectiveCamera = arena.alloc(PerspectiveCamera::new(base, 45.0, 0.0, 1e6)?);
    Ok(Camera::from(camera))
}

/// Mean and variance of repeated radiance estimates along one ray.
#[derive(Clone, Copy, Debug)]
pub struct Estimate {
    pub mean: f64,
    pub variance: f64,
    pub profile: Profile,
}

pub fn estimate<R: RayIntegrator>(estimator: &R, ray: Ray, samples: usize, seed: u64) -> Estimate {
    let mut sampler = Sampler::from(IndependentSampler::new(samples, seed));
    let mut arena = Bump::new();
    let mut profile = Profile::default();
    let (mut sum, mut sum_sq) = (0.0f64, 0.0f64);
    for index in 0..samples {
        sampler.start_pixel_sample(Point2i::new(0, 0), index, 0);
        let mut lambda = SampledWavelengths::sample_visible(sampler.get_1d());
        let l = estimator.li(ray.into(), &mut lambda, &mut sampler, &arena, None, &mut profile);
        let v = l.average() as f64;
        sum += v;
        sum_sq += v * v;
        arena.reset();
    }
    let n = samples as f64;
    let mean = sum / n;
    Estimate { mean, variance: (sum_sq / n - mean * mean).max(0.0), profile }
}
