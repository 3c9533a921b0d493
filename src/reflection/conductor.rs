use cgmath::InnerSpace;

use crate::{Float, Point2f, Vec3f};
use crate::fresnel::fr_conductor;
use crate::reflection::*;
use crate::spectrum::SampledSpectrum;

/// Metal reflection, perfectly specular or rough through a microfacet distribution.
#[derive(Clone, Copy, Debug)]
pub struct ConductorBxDF {
    distrib: TrowbridgeReitz,
    eta: SampledSpectrum,
    k: SampledSpectrum,
}

impl ConductorBxDF {
    pub fn new(distrib: TrowbridgeReitz, eta: SampledSpectrum, k: SampledSpectrum) -> Self {
        Self { distrib, eta, k }
    }

    pub fn regularize(&mut self) {
        self.distrib.regularize();
    }
}

impl BxDFKind for ConductorBxDF {
    fn flags(&self) -> BxDFFlags {
        if self.distrib.effectively_smooth() {
            BxDFFlags::SPECULAR_REFLECTION
        } else {
            BxDFFlags::GLOSSY_REFLECTION
        }
    }

    fn f(&self, wo: Vec3f, wi: Vec3f, _mode: TransportMode) -> SampledSpectrum {
        if !same_hemisphere(wo, wi) || self.distrib.effectively_smooth() {
            return SampledSpectrum::zero();
        }

        let cos_theta_o = abs_cos_theta(wo);
        let cos_theta_i = abs_cos_theta(wi);
        if cos_theta_i == 0.0 || cos_theta_o == 0.0 {
            return SampledSpectrum::zero();
        }
        let wm = wi + wo;
        if wm.magnitude2() == 0.0 {
            return SampledSpectrum::zero();
        }
        let wm = wm.normalize();

        let fr = fr_conductor(wo.dot(wm).abs(), self.eta, self.k);
        self.distrib.d(wm) * fr * self.distrib.g(wo, wi) / (4.0 * cos_theta_i * cos_theta_o)
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

        if self.distrib.effectively_smooth() {
            let wi = vec3f!(-wo.x, -wo.y, wo.z);
            let f = fr_conductor(abs_cos_theta(wi), self.eta, self.k) / abs_cos_theta(wi);
            return Some(BSDFSample::new(f, wi, 1.0, BxDFFlags::SPECULAR_REFLECTION));
        }

        if wo.z == 0.0 {
            return None;
        }
        let wm = self.distrib.sample_wm(wo, u);
        let wi = reflect(wo, wm);
        if !same_hemisphere(wo, wi) {
            return None;
        }

        let pdf = self.distrib.pdf(wo, wm) / (4.0 * wo.dot(wm).abs());
        let cos_theta_o = abs_cos_theta(wo);
        let cos_theta_i = abs_cos_theta(wi);
        if cos_theta_i == 0.0 || cos_theta_o == 0.0 {
            return None;
        }

        let fr = fr_conductor(wo.dot(wm).abs(), self.eta, self.k);
        let f = self.distrib.d(wm) * fr * self.distrib.g(wo, wi) / (4.0 * cos_theta_i * cos_theta_o);
        Some(BSDFSample::new(f, wi, pdf, BxDFFlags::GLOSSY_REFLECTION))
    }

    fn pdf(&self, wo: Vec3f, wi: Vec3f, _mode: TransportMode, sample_flags: BxDFReflTransFlags) -> Float {
        if !sample_flags.contains(BxDFReflTransFlags::REFLECTION)
            || !same_hemisphere(wo, wi)
            || self.distrib.effectively_smooth()
        {
            return 0.0;
        }
        let wm = wo + wi;
        if wm.magnitude2() == 0.0 {
            return 0.0;
        }
        let mut wm = wm.normalize();
        if wm.z < 0.0 {
            wm = -wm;
        }
        self.distrib.pdf(wo, wm) / (4.0 * wo.dot(wm).abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn gold_ish(alpha: Float) -> ConductorBxDF {
        ConductorBxDF::new(
            TrowbridgeReitz::new(alpha, alpha),
            SampledSpectrum::uniform(0.2),
            SampledSpectrum::uniform(3.0),
        )
    }

    #[test]
    fn smooth_conductor_mirrors() {
        let bxdf = gold_ish(0.0);
        assert_eq!(bxdf.flags(), BxDFFlags::SPECULAR_REFLECTION);
        let wo = vec3f!(0.6, 0.0, 0.8);
        let bs = bxdf
            .sample_f(wo, 0.5, point2f!(0.5, 0.5), TransportMode::Radiance, BxDFReflTransFlags::all())
            .unwrap();
        assert_eq!(bs.wi, vec3f!(-0.6, 0.0, 0.8));
        assert!(bs.is_specular());
        assert_eq!(bxdf.pdf(wo, bs.wi, TransportMode::Radiance, BxDFReflTransFlags::all()), 0.0);
    }

    #[test]
    fn rough_sample_pdf_matches_pdf() {
        let bxdf = gold_ish(0.3);
        let wo = vec3f!(0.3, 0.2, 0.9).normalize();
        let bs = bxdf
            .sample_f(wo, 0.5, point2f!(0.4, 0.6), TransportMode::Radiance, BxDFReflTransFlags::all())
            .unwrap();
        let pdf = bxdf.pdf(wo, bs.wi, TransportMode::Radiance, BxDFReflTransFlags::all());
        assert_relative_eq!(bs.pdf, pdf, max_relative = 1e-3);
        let f = bxdf.f(wo, bs.wi, TransportMode::Radiance);
        assert_relative_eq!(bs.f[1], f[1], max_relative = 1e-3);
    }
}
