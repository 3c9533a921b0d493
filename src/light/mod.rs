use cgmath::{EuclideanSpace, InnerSpace, MetricSpace};
use tracing::warn;

use crate::{Float, Normal3, Point2f, Point3f, Vec3f};
use crate::geometry::{Bounds3f, DirectionCone, Ray};
use crate::interaction::{LightSampleContext, SurfaceHit};
use crate::math::safe_sqrt;
use crate::spectrum::{SampledSpectrum, SampledWavelengths};

pub mod diffuse;
pub mod distant;
pub mod infinite;
pub mod point;

pub use diffuse::DiffuseAreaLight;
pub use distant::DistantLight;
pub use infinite::UniformInfiniteLight;
pub use point::PointLight;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightType {
    DeltaPosition,
    DeltaDirection,
    Area,
    Infinite,
}

impl LightType {
    /// Delta lights can only be reached by sampling them explicitly.
    pub fn is_delta(self) -> bool {
        matches!(self, LightType::DeltaPosition | LightType::DeltaDirection)
    }
}

/// Incident illumination sampled from a light.
#[derive(Clone, Copy, Debug)]
pub struct LightLiSample {
    pub l: SampledSpectrum,
    /// Direction *towards* the light.
    pub wi: Vec3f,
    pub pdf: Float,
    pub p_light: SurfaceHit,
}

/// Conservative bounds on where a light is and which way it emits, for spatial light sampling.
#[derive(Clone, Copy, Debug)]
pub struct LightBounds {
    pub bounds: Bounds3f,
    pub w: Vec3f,
    pub phi: Float,
    pub cos_theta_o: Float,
    pub cos_theta_e: Float,
    pub two_sided: bool,
}

impl LightBounds {
    pub fn new(bounds: Bounds3f, w: Vec3f, phi: Float, cos_theta_o: Float, cos_theta_e: Float, two_sided: bool) -> Self {
        Self { bounds, w: w.normalize(), phi, cos_theta_o, cos_theta_e, two_sided }
    }

    pub fn centroid(&self) -> Point3f {
        self.bounds.centroid()
    }

    /// An upper bound on the contribution of the light to a point `p` with normal `n`.
    /// A zero normal means the point isn't on a surface.
    pub fn importance(&self, p: Point3f, n: Normal3) -> Float {
        let pc = self.centroid();
        let d2 = pc.distance2(p).max(self.bounds.diagonal().magnitude() / 2.0);

        // cos(max(0, a - b)) and sin(max(0, a - b)) from the sines and cosines of a and b
        let cos_sub_clamped = |sin_a: Float, cos_a: Float, sin_b: Float, cos_b: Float| {
            if cos_a > cos_b { 1.0 } else { cos_a * cos_b + sin_a * sin_b }
        };
        let sin_sub_clamped = |sin_a: Float, cos_a: Float, sin_b: Float, cos_b: Float| {
            if cos_a > cos_b { 0.0 } else { sin_a * cos_b - cos_a * sin_b }
        };

        let wi = (p - pc).normalize();
        let mut cos_theta_w = self.w.dot(wi);
        if self.two_sided {
            cos_theta_w = cos_theta_w.abs();
        }
        let sin_theta_w = safe_sqrt(1.0 - cos_theta_w * cos_theta_w);

        let cos_theta_b = DirectionCone::bound_subtended_directions(&self.bounds, p).cos_theta;
        let sin_theta_b = safe_sqrt(1.0 - cos_theta_b * cos_theta_b);

        let sin_theta_o = safe_sqrt(1.0 - self.cos_theta_o * self.cos_theta_o);
        let cos_theta_x = cos_sub_clamped(sin_theta_w, cos_theta_w, sin_theta_o, self.cos_theta_o);
        let sin_theta_x = sin_sub_clamped(sin_theta_w, cos_theta_w, sin_theta_o, self.cos_theta_o);
        let cos_theta_p = cos_sub_clamped(sin_theta_x, cos_theta_x, sin_theta_b, cos_theta_b);
        if cos_theta_p <= self.cos_theta_e {
            return 0.0;
        }

        let mut importance = self.phi * cos_theta_p / d2;
        if n != Normal3::zero() {
            let cos_theta_i = wi.dot(n.0).abs();
            let sin_theta_i = safe_sqrt(1.0 - cos_theta_i * cos_theta_i);
            importance *= cos_sub_clamped(sin_theta_i, cos_theta_i, sin_theta_b, cos_theta_b);
        }
        importance.max(0.0)
    }
}

pub trait LightKind {
    fn light_type(&self) -> LightType;

    /// Total emitted power.
    fn phi(&self, lambda: &SampledWavelengths) -> SampledSpectrum;

    /// Samples a direction towards the light from `ctx`. With `allow_incomplete_pdf` the light
    /// may decline directions that BSDF sampling already covers well.
    fn sample_li(
        &self,
        ctx: &LightSampleContext,
        u: Point2f,
        lambda: &SampledWavelengths,
        allow_incomplete_pdf: bool,
    ) -> Option<LightLiSample>;

    /// Solid angle density of `sample_li` choosing `wi` from `ctx`.
    fn pdf_li(&self, ctx: &LightSampleContext, wi: Vec3f, allow_incomplete_pdf: bool) -> Float;

    /// Radiance leaving a point on an area light's surface.
    fn l(&self, _p: Point3f, _n: Normal3, _uv: Point2f, _w: Vec3f, _lambda: &SampledWavelengths) -> SampledSpectrum {
        SampledSpectrum::zero()
    }

    /// Radiance arriving along a ray that left the scene.
    fn le_escaped(&self, _ray: &Ray, _lambda: &SampledWavelengths) -> SampledSpectrum {
        SampledSpectrum::zero()
    }

    /// Called once with the bounds of the scene before rendering.
    fn preprocess(&self, _scene_bounds: &Bounds3f) {}

    /// `None` for lights without finite extent.
    fn bounds(&self) -> Option<LightBounds>;
}

tagged_handle! {
    pub enum Light<'a>: &'a {
        Point(PointLight),
        Distant(DistantLight),
        DiffuseArea(DiffuseAreaLight<'a>),
        UniformInfinite(UniformInfiniteLight),
    }
}

impl<'a> LightKind for Light<'a> {
    fn light_type(&self) -> LightType {
        each_kind!(self, Point, Distant, DiffuseArea, UniformInfinite => |l| l.light_type())
    }

    fn phi(&self, lambda: &SampledWavelengths) -> SampledSpectrum {
        each_kind!(self, Point, Distant, DiffuseArea, UniformInfinite => |l| l.phi(lambda))
    }

    fn sample_li(
        &self,
        ctx: &LightSampleContext,
        u: Point2f,
        lambda: &SampledWavelengths,
        allow_incomplete_pdf: bool,
    ) -> Option<LightLiSample> {
        each_kind!(self, Point, Distant, DiffuseArea, UniformInfinite => |l| l.sample_li(ctx, u, lambda, allow_incomplete_pdf))
    }

    fn pdf_li(&self, ctx: &LightSampleContext, wi: Vec3f, allow_incomplete_pdf: bool) -> Float {
        each_kind!(self, Point, Distant, DiffuseArea, UniformInfinite => |l| l.pdf_li(ctx, wi, allow_incomplete_pdf))
    }

    fn l(&self, p: Point3f, n: Normal3, uv: Point2f, w: Vec3f, lambda: &SampledWavelengths) -> SampledSpectrum {
        each_kind!(self, Point, Distant, DiffuseArea, UniformInfinite => |l| l.l(p, n, uv, w, lambda))
    }

    fn le_escaped(&self, ray: &Ray, lambda: &SampledWavelengths) -> SampledSpectrum {
        each_kind!(self, Point, Distant, DiffuseArea, UniformInfinite => |l| l.le_escaped(ray, lambda))
    }

    fn preprocess(&self, scene_bounds: &Bounds3f) {
        each_kind!(self, Point, Distant, DiffuseArea, UniformInfinite => |l| l.preprocess(scene_bounds))
    }

    fn bounds(&self) -> Option<LightBounds> {
        each_kind!(self, Point, Distant, DiffuseArea, UniformInfinite => |l| l.bounds())
    }
}

/// Bounding sphere of the scene, filled in by `preprocess` for lights at infinity.
#[derive(Debug, Default)]
pub(crate) struct SceneSphere(once_cell::sync::OnceCell<(Point3f, Float)>);

impl SceneSphere {
    /// Returns false when an earlier, different scene is kept instead.
    pub(crate) fn set(&self, bounds: &Bounds3f) -> bool {
        // a light shared by several integrators keeps the first scene it saw
        let sphere = bounds.bounding_sphere();
        match self.0.try_insert(sphere) {
            Ok(_) => true,
            Err((kept, _)) if *kept == sphere => true,
            Err((kept, _)) => {
                warn!(?kept, ignored = ?sphere, "light already preprocessed for another scene");
                false
            }
        }
    }

    pub(crate) fn get(&self) -> (Point3f, Float) {
        self.0.get().copied().unwrap_or((Point3f::origin(), 0.0))
    }
}
