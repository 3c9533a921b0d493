mod common;

use std::collections::HashSet;

use approx::assert_abs_diff_eq;
use bumpalo::Bump;
use pretty_assertions::assert_eq;

use lumen::{point3f, vec3f, Member, Point2i, Ray, Tagged, Transform, Visit};
use lumen::filter::{BoxFilter, Filter, FilterKind, GaussianFilter};
use lumen::light::{DistantLight, Light, LightKind, LightType, PointLight, UniformInfiniteLight};
use lumen::lightsampler::{LightSampler, LightSamplerStrategy, PowerLightSampler, UniformLightSampler};
use lumen::material::{ConductorMaterial, DielectricMaterial, DiffuseMaterial, Material, Roughness};
use lumen::sampler::{IndependentSampler, Sampler, SamplerKind, StratifiedSampler};
use lumen::shapes::{Shape, ShapeKind, Sphere, Triangle, TriangleMesh};
use lumen::spectrum::{SampledWavelengths, Spectrum};

struct KindName;

impl Visit<Sphere> for KindName {
    type Output = &'static str;
    fn visit(self, _: &Sphere) -> &'static str {
        "sphere"
    }
}

impl<'m> Visit<Triangle<'m>> for KindName {
    type Output = &'static str;
    fn visit(self, _: &Triangle<'m>) -> &'static str {
        "triangle"
    }
}

struct Area;

impl Visit<Sphere> for Area {
    type Output = lumen::Float;
    fn visit(self, s: &Sphere) -> lumen::Float {
        s.area()
    }
}

impl<'m> Visit<Triangle<'m>> for Area {
    type Output = lumen::Float;
    fn visit(self, t: &Triangle<'m>) -> lumen::Float {
        t.area()
    }
}

#[test]
fn shape_handles_keep_their_kind() -> anyhow::Result<()> {
    let sphere = Sphere::new(point3f!(0, 0, 0), 2.0, false);
    let mesh = TriangleMesh::new(
        &Transform::IDENTITY,
        false,
        vec![0, 1, 2],
        vec![point3f!(0, 0, 0), point3f!(1, 0, 0), point3f!(0, 1, 0)],
        None,
        None,
    )?;
    let triangle = Triangle::new(&mesh, 0);

    let s = Shape::from(&sphere);
    let t = Shape::from(&triangle);
    assert_eq!(s.tag(), <Sphere as Member<Shape>>::TAG);
    assert_eq!(t.tag(), <Triangle as Member<Shape>>::TAG);
    assert!(s.is::<Sphere>() && !s.is::<Triangle>());
    assert!(std::ptr::eq(s.cast::<Sphere>(), &sphere));
    assert!(std::ptr::eq(t.cast::<Triangle>(), &triangle));
    assert!(t.try_cast::<Sphere>().is_none());

    assert_eq!(s.dispatch(KindName), "sphere");
    assert_eq!(t.dispatch(KindName), "triangle");
    // forwarding through the handle is the same call as on the kind itself
    assert_eq!(s.area(), sphere.area());
    assert_eq!(t.dispatch(Area), 0.5);
    assert_eq!(s.bounds(), sphere.bounds());
    Ok(())
}

#[test]
#[should_panic(expected = "cannot cast Shape")]
fn casting_to_the_wrong_kind_panics() {
    let sphere = Sphere::new(point3f!(0, 0, 0), 1.0, false);
    let _ = Shape::from(&sphere).cast::<Triangle>();
}

#[test]
fn light_handles_are_identities() {
    let point = PointLight::new(point3f!(0, 1, 0), Spectrum::constant(1.0), 2.0);
    let distant = DistantLight::new(vec3f!(0, 1, 0), Spectrum::constant(1.0), 1.0);
    let sky = UniformInfiniteLight::new(Spectrum::constant(0.5), 1.0);
    let twin = PointLight::new(point3f!(0, 1, 0), Spectrum::constant(1.0), 2.0);

    let lights = [Light::from(&point), Light::from(&distant), Light::from(&sky), Light::from(&twin)];
    assert_eq!(lights.map(|l| l.light_type()), [
        LightType::DeltaPosition,
        LightType::DeltaDirection,
        LightType::Infinite,
        LightType::DeltaPosition,
    ]);

    // equal contents, distinct objects
    assert_ne!(lights[0], lights[3]);
    assert_eq!(lights[0], Light::from(&point));
    let unique: HashSet<Light> = lights.iter().copied().chain([Light::from(&point)]).collect();
    assert_eq!(unique.len(), 4);

    let lambda = SampledWavelengths::sample_visible(0.5);
    assert_eq!(lights[0].phi(&lambda), point.phi(&lambda));
    assert!(std::ptr::eq(lights[0].cast::<PointLight>(), &point));

    // ordered handles still reach the light's own methods
    let escaped = Ray::new(point3f!(0, 0, 0), vec3f!(0, 0, 1));
    assert_eq!(lights[2].le_escaped(&escaped, &lambda)[0], 0.5);
    assert!(lights[0].le_escaped(&escaped, &lambda).is_black());
    let mut sorted = lights.to_vec();
    sorted.sort();
    assert!(sorted.windows(2).all(|w| w[0] <= w[1]));

    let none: Option<Light> = None;
    assert_eq!(none.tag(), 0);
    assert!(Some(lights[1]).tag() > 0);
}

#[test]
fn material_handles_dispatch_to_their_kind() {
    let diffuse = DiffuseMaterial::new(Spectrum::constant(0.5));
    let conductor = ConductorMaterial::new(Spectrum::constant(0.2), Spectrum::constant(3.0), Roughness::smooth());
    let dielectric = DielectricMaterial::new(Spectrum::constant(1.5), Roughness::isotropic(0.1));
    let handles = [Material::from(&diffuse), Material::from(&conductor), Material::from(&dielectric)];

    let tags: Vec<u8> = handles.iter().map(|m| m.tag()).collect();
    assert_eq!(tags, vec![1, 2, 3]);
    assert!(handles[1].is::<ConductorMaterial>());
    assert!(std::ptr::eq(handles[2].cast::<DielectricMaterial>(), &dielectric));
    assert!(handles[0].try_cast::<ConductorMaterial>().is_none());
}

#[test]
fn owned_handles_hold_their_value() {
    let sampler = Sampler::from(StratifiedSampler::new(2, 3, false, 9));
    assert!(sampler.is::<StratifiedSampler>());
    assert_eq!(sampler.samples_per_pixel(), 6);
    assert_eq!(Sampler::from(IndependentSampler::new(4, 0)).samples_per_pixel(), 4);

    // clones of an owned handle produce the same stream
    let (mut a, mut b) = (sampler.clone(), sampler);
    a.start_pixel_sample(Point2i::new(3, 4), 5, 0);
    b.start_pixel_sample(Point2i::new(3, 4), 5, 0);
    assert_eq!(a.get_2d(), b.get_2d());

    let filter = Filter::from(BoxFilter::new(lumen::Vec2f::new(0.5, 0.5)));
    assert!(filter.is::<BoxFilter>() && !filter.is::<GaussianFilter>());
    assert_eq!(filter.radius(), lumen::Vec2f::new(0.5, 0.5));

    let point = PointLight::new(point3f!(0, 0, 0), Spectrum::constant(1.0), 1.0);
    let lights = [Light::from(&point)];
    assert!(LightSampler::create(LightSamplerStrategy::Uniform, &lights).is::<UniformLightSampler>());
    assert!(LightSampler::create(LightSamplerStrategy::Power, &lights).is::<PowerLightSampler>());
}

#[test]
fn arena_allocated_shapes_are_distinct_handles() {
    let arena = Bump::new();
    let shapes: Vec<Shape> = (0..8)
        .map(|i| common::alloc(&arena, Sphere::new(point3f!(i, 0, 0), 0.5, false)))
        .collect();
    let unique: HashSet<Shape> = shapes.iter().copied().collect();
    assert_eq!(unique.len(), shapes.len());
    for (i, s) in shapes.iter().enumerate() {
        assert_abs_diff_eq!(s.bounds().centroid(), point3f!(i, 0, 0), epsilon = 1e-5);
    }
}
