use cgmath::{InnerSpace, MetricSpace};

use crate::{Float, Point2f, Point3f, Vec3f};
use crate::geometry::Bounds3f;
use crate::interaction::{LightSampleContext, SurfaceHit};
use crate::light::{LightBounds, LightKind, LightLiSample, LightType};
use crate::math::PI;
use crate::spectrum::{SampledSpectrum, SampledWavelengths, Spectrum, SpectrumKind};

/// Isotropic point emitter with radiant intensity `scale * i`.
#[derive(Clone, Debug)]
pub struct PointLight {
    p: Point3f,
    i: Spectrum,
    scale: Float,
}

impl PointLight {
    pub fn new(p: Point3f, i: Spectrum, scale: Float) -> Self {
        Self { p, i, scale }
    }

    pub fn position(&self) -> Point3f {
        self.p
    }
}

impl LightKind for PointLight {
    fn light_type(&self) -> LightType {
        LightType::DeltaPosition
    }

    fn phi(&self, lambda: &SampledWavelengths) -> SampledSpectrum {
        4.0 * PI * self.scale * self.i.sample(lambda)
    }

    fn sample_li(
        &self,
        ctx: &LightSampleContext,
        _u: Point2f,
        lambda: &SampledWavelengths,
        _allow_incomplete_pdf: bool,
    ) -> Option<LightLiSample> {
        let d2 = self.p.distance2(ctx.p);
        if d2 == 0.0 {
            return None;
        }
        let wi = (self.p - ctx.p).normalize();
        let li = self.scale * self.i.sample(lambda) / d2;
        Some(LightLiSample { l: li, wi, pdf: 1.0, p_light: SurfaceHit::from_point(self.p, ctx.time) })
    }

    fn pdf_li(&self, _ctx: &LightSampleContext, _wi: Vec3f, _allow_incomplete_pdf: bool) -> Float {
        0.0
    }

    fn bounds(&self) -> Option<LightBounds> {
        let phi = 4.0 * PI * self.scale * self.i.max_value();
        // emits in every direction, so the cone is the whole sphere
        Some(LightBounds::new(Bounds3f::from_point(self.p), vec3f!(0, 0, 1), phi, -1.0, 0.0, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn inverse_square_falloff() {
        let light = PointLight::new(point3f!(0, 0, 2), Spectrum::constant(8.0), 1.0);
        let lambda = SampledWavelengths::sample_visible(0.5);
        let ctx = LightSampleContext::from_point(point3f!(0, 0, 0), 0.0);
        let ls = light.sample_li(&ctx, point2f!(0.5, 0.5), &lambda, false).unwrap();
        assert_relative_eq!(ls.l[0], 2.0);
        assert_eq!(ls.wi, vec3f!(0, 0, 1));
        assert_eq!(ls.pdf, 1.0);
        assert_eq!(light.pdf_li(&ctx, ls.wi, false), 0.0);
        assert!(light.light_type().is_delta());
    }
}
