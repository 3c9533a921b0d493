use crate::{Float, Point2f, Vec3f};
use crate::geometry::{Bounds3f, Ray};
use crate::interaction::{LightSampleContext, SurfaceHit};
use crate::light::{LightBounds, LightKind, LightLiSample, LightType, SceneSphere};
use crate::math::PI;
use crate::sampling::{sample_uniform_sphere, uniform_sphere_pdf};
use crate::spectrum::{SampledSpectrum, SampledWavelengths, Spectrum, SpectrumKind};

/// Constant radiance arriving from every direction.
#[derive(Debug)]
pub struct UniformInfiniteLight {
    lemit: Spectrum,
    scale: Float,
    scene: SceneSphere,
}

impl UniformInfiniteLight {
    pub fn new(lemit: Spectrum, scale: Float) -> Self {
        Self { lemit, scale, scene: SceneSphere::default() }
    }
}

impl LightKind for UniformInfiniteLight {
    fn light_type(&self) -> LightType {
        LightType::Infinite
    }

    fn phi(&self, lambda: &SampledWavelengths) -> SampledSpectrum {
        let (_, radius) = self.scene.get();
        4.0 * PI * PI * radius * radius * self.scale * self.lemit.sample(lambda)
    }

    fn sample_li(
        &self,
        ctx: &LightSampleContext,
        u: Point2f,
        lambda: &SampledWavelengths,
        allow_incomplete_pdf: bool,
    ) -> Option<LightLiSample> {
        // BSDF sampling alone handles a constant environment well
        if allow_incomplete_pdf {
            return None;
        }
        let (_, radius) = self.scene.get();
        let wi = sample_uniform_sphere(u);
        let p_light = SurfaceHit::from_point(ctx.p + wi * (2.0 * radius), ctx.time);
        Some(LightLiSample {
            l: self.scale * self.lemit.sample(lambda),
            wi,
            pdf: uniform_sphere_pdf(),
            p_light,
        })
    }

    fn pdf_li(&self, _ctx: &LightSampleContext, _wi: Vec3f, allow_incomplete_pdf: bool) -> Float {
        if allow_incomplete_pdf {
            0.0
        } else {
            uniform_sphere_pdf()
        }
    }

    fn le_escaped(&self, _ray: &Ray, lambda: &SampledWavelengths) -> SampledSpectrum {
        self.scale * self.lemit.sample(lambda)
    }

    fn preprocess(&self, scene_bounds: &Bounds3f) {
        self.scene.set(scene_bounds);
    }

    fn bounds(&self) -> Option<LightBounds> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn incomplete_pdf_declines_sampling() {
        let light = UniformInfiniteLight::new(Spectrum::constant(1.0), 2.0);
        light.preprocess(&Bounds3f::new(point3f!(-1, -1, -1), point3f!(1, 1, 1)));
        let lambda = SampledWavelengths::sample_visible(0.5);
        let ctx = LightSampleContext::from_point(point3f!(0, 0, 0), 0.0);
        assert!(light.sample_li(&ctx, point2f!(0.2, 0.2), &lambda, true).is_none());
        assert_eq!(light.pdf_li(&ctx, vec3f!(0, 0, 1), true), 0.0);

        let ls = light.sample_li(&ctx, point2f!(0.2, 0.2), &lambda, false).unwrap();
        assert_relative_eq!(ls.pdf, light.pdf_li(&ctx, ls.wi, false));
        assert_relative_eq!(ls.l[3], 2.0);
        let ray = Ray::new(point3f!(0, 0, 0), vec3f!(1, 0, 0));
        assert_relative_eq!(light.le_escaped(&ray, &lambda)[0], 2.0);
    }
}
