use cgmath::InnerSpace;

use crate::{Float, Point2f, Vec3f};
use crate::fresnel::fr_dielectric;
use crate::math::sqr;
use crate::reflection::*;
use crate::spectrum::SampledSpectrum;

/// Glass-like interface that both reflects and refracts.
#[derive(Clone, Copy, Debug)]
pub struct DielectricBxDF {
    eta: Float,
    distrib: TrowbridgeReitz,
}

impl DielectricBxDF {
    pub fn new(eta: Float, distrib: TrowbridgeReitz) -> Self {
        Self { eta, distrib }
    }

    pub fn eta(&self) -> Float {
        self.eta
    }

    pub fn regularize(&mut self) {
        self.distrib.regularize();
    }

    fn is_smooth(&self) -> bool {
        self.eta == 1.0 || self.distrib.effectively_smooth()
    }

    /// Reflection and transmission probabilities restricted to the requested lobes.
    fn lobe_probs(r: Float, sample_flags: BxDFReflTransFlags) -> (Float, Float) {
        let pr = if sample_flags.contains(BxDFReflTransFlags::REFLECTION) { r } else { 0.0 };
        let pt = if sample_flags.contains(BxDFReflTransFlags::TRANSMISSION) { 1.0 - r } else { 0.0 };
        (pr, pt)
    }

    /// Generalized half vector for the pair, `None` when it is degenerate or back facing.
    fn half_vector(&self, wo: Vec3f, wi: Vec3f) -> Option<(Vec3f, Float, bool)> {
        let cos_theta_o = cos_theta(wo);
        let cos_theta_i = cos_theta(wi);
        let reflect = cos_theta_i * cos_theta_o > 0.0;
        let etap = match (reflect, cos_theta_o > 0.0) {
            (true, _) => 1.0,
            (false, true) => self.eta,
            (false, false) => 1.0 / self.eta,
        };
        let wm = wi * etap + wo;
        if cos_theta_i == 0.0 || cos_theta_o == 0.0 || wm.magnitude2() == 0.0 {
            return None;
        }
        let mut wm = wm.normalize();
        if wm.z < 0.0 {
            wm = -wm;
        }
        if wm.dot(wi) * cos_theta_i < 0.0 || wm.dot(wo) * cos_theta_o < 0.0 {
            return None;
        }
        Some((wm, etap, reflect))
    }
}

impl BxDFKind for DielectricBxDF {
    fn flags(&self) -> BxDFFlags {
        let flags = if self.eta == 1.0 {
            BxDFFlags::TRANSMISSION
        } else {
            BxDFFlags::REFLECTION | BxDFFlags::TRANSMISSION
        };
        flags | if self.distrib.effectively_smooth() { BxDFFlags::SPECULAR } else { BxDFFlags::GLOSSY }
    }

    fn f(&self, wo: Vec3f, wi: Vec3f, mode: TransportMode) -> SampledSpectrum {
        if self.is_smooth() {
            return SampledSpectrum::zero();
        }
        let Some((wm, etap, reflect)) = self.half_vector(wo, wi) else {
            return SampledSpectrum::zero();
        };

        let f = fr_dielectric(wo.dot(wm), self.eta);
        let (d, g) = (self.distrib.d(wm), self.distrib.g(wo, wi));
        if reflect {
            let v = d * g * f / (4.0 * cos_theta(wi) * cos_theta(wo)).abs();
            return SampledSpectrum::uniform(v);
        }

        let denom = sqr(wi.dot(wm) + wo.dot(wm) / etap) * cos_theta(wi) * cos_theta(wo);
        let mut ft = d * (1.0 - f) * g * (wi.dot(wm) * wo.dot(wm) / denom).abs();
        if mode == TransportMode::Radiance {
            ft /= sqr(etap);
        }
        SampledSpectrum::uniform(ft)
    }

    fn sample_f(
        &self,
        wo: Vec3f,
        uc: Float,
        u: Point2f,
        mode: TransportMode,
        sample_flags: BxDFReflTransFlags,
    ) -> Option<BSDFSample> {
        if self.is_smooth() {
            let r = fr_dielectric(cos_theta(wo), self.eta);
            let (pr, pt) = Self::lobe_probs(r, sample_flags);
            if pr == 0.0 && pt == 0.0 {
                return None;
            }

            if uc < pr / (pr + pt) {
                let wi = vec3f!(-wo.x, -wo.y, wo.z);
                let fr = SampledSpectrum::uniform(r / abs_cos_theta(wi));
                return Some(BSDFSample::new(fr, wi, pr / (pr + pt), BxDFFlags::SPECULAR_REFLECTION));
            }

            let (wi, etap) = refract(wo, vec3f!(0, 0, 1), self.eta)?;
            let mut ft = (1.0 - r) / abs_cos_theta(wi);
            if mode == TransportMode::Radiance {
                ft /= sqr(etap);
            }
            let bs = BSDFSample::new(
                SampledSpectrum::uniform(ft),
                wi,
                pt / (pr + pt),
                BxDFFlags::SPECULAR_TRANSMISSION,
            );
            return Some(bs.with_eta(etap));
        }

        let wm = self.distrib.sample_wm(wo, u);
        let r = fr_dielectric(wo.dot(wm), self.eta);
        let (pr, pt) = Self::lobe_probs(r, sample_flags);
        if pr == 0.0 && pt == 0.0 {
            return None;
        }

        if uc < pr / (pr + pt) {
            let wi = reflect(wo, wm);
            if !same_hemisphere(wo, wi) {
                return None;
            }
            let pdf = self.distrib.pdf(wo, wm) / (4.0 * wo.dot(wm).abs()) * pr / (pr + pt);
            let f = self.distrib.d(wm) * self.distrib.g(wo, wi) * r / (4.0 * cos_theta(wi) * cos_theta(wo));
            return Some(BSDFSample::new(SampledSpectrum::uniform(f), wi, pdf, BxDFFlags::GLOSSY_REFLECTION));
        }

        let (wi, etap) = refract(wo, wm, self.eta)?;
        if same_hemisphere(wo, wi) || wi.z == 0.0 {
            return None;
        }
        let denom = sqr(wi.dot(wm) + wo.dot(wm) / etap);
        let dwm_dwi = wi.dot(wm).abs() / denom;
        let pdf = self.distrib.pdf(wo, wm) * dwm_dwi * pt / (pr + pt);

        let mut ft = (1.0 - r)
            * self.distrib.d(wm)
            * self.distrib.g(wo, wi)
            * (wi.dot(wm) * wo.dot(wm) / (cos_theta(wi) * cos_theta(wo) * denom)).abs();
        if mode == TransportMode::Radiance {
            ft /= sqr(etap);
        }
        let bs = BSDFSample::new(SampledSpectrum::uniform(ft), wi, pdf, BxDFFlags::GLOSSY_TRANSMISSION);
        Some(bs.with_eta(etap))
    }

    fn pdf(&self, wo: Vec3f, wi: Vec3f, _mode: TransportMode, sample_flags: BxDFReflTransFlags) -> Float {
        if self.is_smooth() {
            return 0.0;
        }
        let Some((wm, etap, reflect)) = self.half_vector(wo, wi) else {
            return 0.0;
        };

        let r = fr_dielectric(wo.dot(wm), self.eta);
        let (pr, pt) = Self::lobe_probs(r, sample_flags);
        if pr == 0.0 && pt == 0.0 {
            return 0.0;
        }

        if reflect {
            self.distrib.pdf(wo, wm) / (4.0 * wo.dot(wm).abs()) * pr / (pr + pt)
        } else {
            let denom = sqr(wi.dot(wm) + wo.dot(wm) / etap);
            let dwm_dwi = wi.dot(wm).abs() / denom;
            self.distrib.pdf(wo, wm) * dwm_dwi * pt / (pr + pt)
        }
    }
}
