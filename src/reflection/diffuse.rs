use crate::{Float, Point2f, Vec3f};
use crate::math::INV_PI;
use crate::reflection::*;
use crate::sampling::{cosine_hemisphere_pdf, sample_cosine_hemisphere};
use crate::spectrum::SampledSpectrum;

/// Lambertian reflection.
#[derive(Clone, Copy, Debug)]
pub struct DiffuseBxDF {
    r: SampledSpectrum,
}

impl DiffuseBxDF {
    pub fn new(r: SampledSpectrum) -> Self {
        Self { r }
    }
}

impl BxDFKind for DiffuseBxDF {
    fn flags(&self) -> BxDFFlags {
        if self.r.is_black() {
            BxDFFlags::empty()
        } else {
            BxDFFlags::DIFFUSE_REFLECTION
        }
    }

    fn f(&self, wo: Vec3f, wi: Vec3f, _mode: TransportMode) -> SampledSpectrum {
        if !same_hemisphere(wo, wi) {
            return SampledSpectrum::zero();
        }
        self.r * INV_PI
    }

    fn sample_f(
        &self,
        wo: Vec3f,
        _uc: Float,
        u: Point2f,
        _mode: TransportMode,
        sample_flags: BxDFReflTransFlags,
    ) -> Option<BSDFSample> {
        if !sample_flags.contains(BxDFReflTransFlags::REFLECTION) {
            return None;
        }
        let mut wi = sample_cosine_hemisphere(u);
        if wo.z < 0.0 {
            wi.z *= -1.0;
        }
        let pdf = cosine_hemisphere_pdf(abs_cos_theta(wi));
        Some(BSDFSample::new(self.r * INV_PI, wi, pdf, BxDFFlags::DIFFUSE_REFLECTION))
    }

    fn pdf(&self, wo: Vec3f, wi: Vec3f, _mode: TransportMode, sample_flags: BxDFReflTransFlags) -> Float {
        if !sample_flags.contains(BxDFReflTransFlags::REFLECTION) || !same_hemisphere(wo, wi) {
            return 0.0;
        }
        cosine_hemisphere_pdf(abs_cos_theta(wi))
    }

    fn rho(&self, _wo: Vec3f, _uc: &[Float], _u2: &[Point2f]) -> SampledSpectrum {
        self.r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn sample_matches_eval() {
        let bxdf = DiffuseBxDF::new(SampledSpectrum::uniform(0.5));
        let wo = vec3f!(0.0, 0.6, -0.8);
        let bs = bxdf
            .sample_f(wo, 0.5, point2f!(0.3, 0.7), TransportMode::Radiance, BxDFReflTransFlags::all())
            .unwrap();
        assert!(same_hemisphere(wo, bs.wi));
        assert_abs_diff_eq!(bs.pdf, bxdf.pdf(wo, bs.wi, TransportMode::Radiance, BxDFReflTransFlags::all()));
        assert_abs_diff_eq!(bs.f[0], 0.5 * INV_PI);
        assert!(bxdf.f(wo, -bs.wi, TransportMode::Radiance).is_black());
    }

    #[test]
    fn no_transmission_lobe() {
        let bxdf = DiffuseBxDF::new(SampledSpectrum::uniform(0.5));
        let flags = BxDFReflTransFlags::TRANSMISSION;
        assert!(bxdf.sample_f(vec3f!(0, 0, 1), 0.5, point2f!(0.5, 0.5), TransportMode::Radiance, flags).is_none());
        assert!(DiffuseBxDF::new(SampledSpectrum::zero()).flags().is_empty());
    }
}
