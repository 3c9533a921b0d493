use cgmath::{InnerSpace, MetricSpace};

use crate::{Float, Normal3, Point2f, Point3f, Vec3f};
use crate::interaction::{LightSampleContext, ShapeSampleContext};
use crate::light::{LightBounds, LightKind, LightLiSample, LightType};
use crate::math::PI;
use crate::shapes::{Shape, ShapeKind};
use crate::spectrum::{SampledSpectrum, SampledWavelengths, Spectrum, SpectrumKind};

/// Uniform emission from the surface of a shape, on the side its normal faces or both.
#[derive(Debug)]
pub struct DiffuseAreaLight<'a> {
    shape: Shape<'a>,
    area: Float,
    lemit: Spectrum,
    scale: Float,
    two_sided: bool,
}

impl<'a> DiffuseAreaLight<'a> {
    pub fn new(shape: Shape<'a>, lemit: Spectrum, scale: Float, two_sided: bool) -> Self {
        Self { shape, area: shape.area(), lemit, scale, two_sided }
    }

    pub fn shape(&self) -> Shape<'a> {
        self.shape
    }
}

impl<'a> LightKind for DiffuseAreaLight<'a> {
    fn light_type(&self) -> LightType {
        LightType::Area
    }

    fn phi(&self, lambda: &SampledWavelengths) -> SampledSpectrum {
        let sides = if self.two_sided { 2.0 } else { 1.0 };
        PI * sides * self.area * self.scale * self.lemit.sample(lambda)
    }

    fn sample_li(
        &self,
        ctx: &LightSampleContext,
        u: Point2f,
        lambda: &SampledWavelengths,
        _allow_incomplete_pdf: bool,
    ) -> Option<LightLiSample> {
        let shape_ctx = ShapeSampleContext::from(ctx);
        let ss = self.shape.sample_from(&shape_ctx, u)?;
        if ss.pdf == 0.0 || ss.hit.p.distance2(ctx.p) == 0.0 {
            return None;
        }

        let wi = (ss.hit.p - ctx.p).normalize();
        let le = self.l(ss.hit.p, ss.hit.n, ss.hit.uv, -wi, lambda);
        if le.is_black() {
            return None;
        }
        Some(LightLiSample { l: le, wi, pdf: ss.pdf, p_light: ss.hit })
    }

    fn pdf_li(&self, ctx: &LightSampleContext, wi: Vec3f, _allow_incomplete_pdf: bool) -> Float {
        self.shape.pdf_from(&ShapeSampleContext::from(ctx), wi)
    }

    fn l(&self, _p: Point3f, n: Normal3, _uv: Point2f, w: Vec3f, lambda: &SampledWavelengths) -> SampledSpectrum {
        if !self.two_sided && n.dot(w) < 0.0 {
            return SampledSpectrum::zero();
        }
        self.scale * self.lemit.sample(lambda)
    }

    fn bounds(&self) -> Option<LightBounds> {
        let sides = if self.two_sided { 2.0 } else { 1.0 };
        let phi = self.lemit.max_value() * sides * self.scale * self.area * PI;
        let nb = self.shape.normal_bounds();
        Some(LightBounds::new(self.shape.bounds(), nb.w, phi, nb.cos_theta, 0.0, self.two_sided))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Sphere;
    use approx::assert_relative_eq;

    #[test]
    fn sampled_radiance_is_emitted_radiance() {
        let sphere = Sphere::new(point3f!(0, 0, 5), 0.5, false);
        let light = DiffuseAreaLight::new(Shape::from(&sphere), Spectrum::constant(4.0), 0.5, false);
        let lambda = SampledWavelengths::sample_visible(0.5);
        let ctx = LightSampleContext::from_point(point3f!(0, 0, 0), 0.0);
        let ls = light.sample_li(&ctx, point2f!(0.3, 0.6), &lambda, true).unwrap();
        assert_relative_eq!(ls.l[0], 2.0);
        assert!(ls.wi.z > 0.9);
        assert_relative_eq!(light.pdf_li(&ctx, ls.wi, true), ls.pdf, max_relative = 1e-3);
    }

    #[test]
    fn one_sided_emission() {
        let sphere = Sphere::new(point3f!(0, 0, 0), 1.0, false);
        let light = DiffuseAreaLight::new(Shape::from(&sphere), Spectrum::constant(1.0), 1.0, false);
        let lambda = SampledWavelengths::sample_visible(0.5);
        let n = Normal3::new(0.0, 0.0, 1.0);
        let p = point3f!(0, 0, 1);
        assert!(!light.l(p, n, point2f!(0, 0), vec3f!(0, 0, 1), &lambda).is_black());
        assert!(light.l(p, n, point2f!(0, 0), vec3f!(0, 0, -1), &lambda).is_black());
        assert_relative_eq!(light.phi(&lambda)[1], PI * 4.0 * PI, max_relative = 1e-5);
    }
}
