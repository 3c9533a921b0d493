use cgmath::InnerSpace;

use crate::{Float, Point2f, Vec3f};
use crate::geometry::Bounds3f;
use crate::interaction::{LightSampleContext, SurfaceHit};
use crate::light::{LightBounds, LightKind, LightLiSample, LightType, SceneSphere};
use crate::math::PI;
use crate::spectrum::{SampledSpectrum, SampledWavelengths, Spectrum, SpectrumKind};

/// Parallel illumination from infinitely far away, like the sun.
#[derive(Debug)]
pub struct DistantLight {
    /// Direction towards the light.
    w: Vec3f,
    lemit: Spectrum,
    scale: Float,
    scene: SceneSphere,
}

impl DistantLight {
    pub fn new(w: Vec3f, lemit: Spectrum, scale: Float) -> Self {
        Self { w: w.normalize(), lemit, scale, scene: SceneSphere::default() }
    }
}

impl LightKind for DistantLight {
    fn light_type(&self) -> LightType {
        LightType::DeltaDirection
    }

    fn phi(&self, lambda: &SampledWavelengths) -> SampledSpectrum {
        let (_, radius) = self.scene.get();
        self.scale * self.lemit.sample(lambda) * PI * radius * radius
    }

    fn sample_li(
        &self,
        ctx: &LightSampleContext,
        _u: Point2f,
        lambda: &SampledWavelengths,
        _allow_incomplete_pdf: bool,
    ) -> Option<LightLiSample> {
        let (_, radius) = self.scene.get();
        let p_outside = ctx.p + self.w * (2.0 * radius);
        Some(LightLiSample {
            l: self.scale * self.lemit.sample(lambda),
            wi: self.w,
            pdf: 1.0,
            p_light: SurfaceHit::from_point(p_outside, ctx.time),
        })
    }

    fn pdf_li(&self, _ctx: &LightSampleContext, _wi: Vec3f, _allow_incomplete_pdf: bool) -> Float {
        0.0
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
    fn shadow_endpoint_leaves_the_scene() {
        let light = DistantLight::new(vec3f!(0, 0, 2), Spectrum::constant(3.0), 1.0);
        light.preprocess(&Bounds3f::new(point3f!(-1, -1, -1), point3f!(1, 1, 1)));
        let lambda = SampledWavelengths::sample_visible(0.5);
        let ctx = LightSampleContext::from_point(point3f!(0, 0, 0), 0.0);
        let ls = light.sample_li(&ctx, point2f!(0.5, 0.5), &lambda, true).unwrap();
        assert_eq!(ls.wi, vec3f!(0, 0, 1));
        assert_relative_eq!(ls.l[2], 3.0);
        // twice the bounding radius sqrt(3)
        assert_relative_eq!(ls.p_light.p.z, 2.0 * (3.0 as Float).sqrt(), max_relative = 1e-5);
        assert_relative_eq!(light.phi(&lambda)[0], 3.0 * PI * 3.0, max_relative = 1e-5);
    }
}
