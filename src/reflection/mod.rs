use bitflags::bitflags;
use cgmath::InnerSpace;

use crate::{Float, Point2f, Vec3f};
use crate::math::{safe_sqrt, sqr};
use crate::spectrum::SampledSpectrum;

pub mod bsdf;
pub mod conductor;
pub mod dielectric;
pub mod diffuse;
pub mod microfacet;

pub use bsdf::Bsdf;
pub use conductor::ConductorBxDF;
pub use dielectric::DielectricBxDF;
pub use diffuse::DiffuseBxDF;
pub use microfacet::TrowbridgeReitz;

bitflags! {
    pub struct BxDFFlags: u8 {
        const REFLECTION = 1;
        const TRANSMISSION = 1 << 1;
        const DIFFUSE = 1 << 2;
        const GLOSSY = 1 << 3;
        const SPECULAR = 1 << 4;
        const DIFFUSE_REFLECTION = Self::DIFFUSE.bits | Self::REFLECTION.bits;
        const DIFFUSE_TRANSMISSION = Self::DIFFUSE.bits | Self::TRANSMISSION.bits;
        const GLOSSY_REFLECTION = Self::GLOSSY.bits | Self::REFLECTION.bits;
        const GLOSSY_TRANSMISSION = Self::GLOSSY.bits | Self::TRANSMISSION.bits;
        const SPECULAR_REFLECTION = Self::SPECULAR.bits | Self::REFLECTION.bits;
        const SPECULAR_TRANSMISSION = Self::SPECULAR.bits | Self::TRANSMISSION.bits;
    }
}

impl BxDFFlags {
    pub fn is_reflective(self) -> bool {
        self.contains(Self::REFLECTION)
    }

    pub fn is_transmissive(self) -> bool {
        self.contains(Self::TRANSMISSION)
    }

    pub fn is_diffuse(self) -> bool {
        self.contains(Self::DIFFUSE)
    }

    pub fn is_glossy(self) -> bool {
        self.contains(Self::GLOSSY)
    }

    pub fn is_specular(self) -> bool {
        self.contains(Self::SPECULAR)
    }

    pub fn is_non_specular(self) -> bool {
        self.intersects(Self::DIFFUSE | Self::GLOSSY)
    }
}

bitflags! {
    /// Restricts sampling to reflection, transmission or both.
    pub struct BxDFReflTransFlags: u8 {
        const REFLECTION = 1;
        const TRANSMISSION = 1 << 1;
    }
}

impl Default for BxDFReflTransFlags {
    fn default() -> Self {
        Self::all()
    }
}

/// Whether the quantity carried along the path is radiance (from the camera) or importance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportMode {
    Radiance,
    Importance,
}

#[derive(Clone, Copy, Debug)]
pub struct BSDFSample {
    pub f: SampledSpectrum,
    pub wi: Vec3f,
    pub pdf: Float,
    pub flags: BxDFFlags,
    /// Relative index of refraction along `wi`, 1 for reflection.
    pub eta: Float,
    /// Set when `pdf` is only proportional to the true density, which then has to be
    /// evaluated separately for MIS.
    pub pdf_is_proportional: bool,
}

impl BSDFSample {
    pub fn new(f: SampledSpectrum, wi: Vec3f, pdf: Float, flags: BxDFFlags) -> Self {
        Self { f, wi, pdf, flags, eta: 1.0, pdf_is_proportional: false }
    }

    pub fn with_eta(self, eta: Float) -> Self {
        Self { eta, ..self }
    }

    pub fn is_reflection(&self) -> bool {
        self.flags.is_reflective()
    }

    pub fn is_transmission(&self) -> bool {
        self.flags.is_transmissive()
    }

    pub fn is_specular(&self) -> bool {
        self.flags.is_specular()
    }
}

// Trigonometry of directions in the local shading frame, where the normal is +z.

#[inline]
pub(crate) fn cos_theta(w: Vec3f) -> Float { w.z }
#[inline]
pub(crate) fn cos2_theta(w: Vec3f) -> Float { w.z * w.z }
#[inline]
pub(crate) fn abs_cos_theta(w: Vec3f) -> Float { w.z.abs() }

pub(crate) fn sin2_theta(w: Vec3f) -> Float {
    Float::max(0.0, 1.0 - cos2_theta(w))
}

pub(crate) fn sin_theta(w: Vec3f) -> Float {
    sin2_theta(w).sqrt()
}

pub(crate) fn tan2_theta(w: Vec3f) -> Float {
    sin2_theta(w) / cos2_theta(w)
}

pub(crate) fn cos_phi(w: Vec3f) -> Float {
    let sin_theta = sin_theta(w);
    if sin_theta == 0.0 {
        1.0
    } else {
        (w.x / sin_theta).clamp(-1.0, 1.0)
    }
}

pub(crate) fn sin_phi(w: Vec3f) -> Float {
    let sin_theta = sin_theta(w);
    if sin_theta == 0.0 {
        0.0
    } else {
        (w.y / sin_theta).clamp(-1.0, 1.0)
    }
}

pub fn same_hemisphere(v1: Vec3f, v2: Vec3f) -> bool {
    v1.z * v2.z > 0.0
}

pub fn reflect(wo: Vec3f, n: Vec3f) -> Vec3f {
    -wo + 2.0 * wo.dot(n) * n
}

/// Refracts `wi` through a surface with normal `n` and relative index `eta`. Returns the
/// transmitted direction and the index relative to the side `wi` is on, or `None` on total
/// internal reflection.
pub fn refract(wi: Vec3f, mut n: Vec3f, mut eta: Float) -> Option<(Vec3f, Float)> {
    let mut cos_theta_i = n.dot(wi);
    if cos_theta_i < 0.0 {
        eta = 1.0 / eta;
        cos_theta_i = -cos_theta_i;
        n = -n;
    }

    let sin2_theta_i = Float::max(0.0, 1.0 - sqr(cos_theta_i));
    let sin2_theta_t = sin2_theta_i / sqr(eta);
    if sin2_theta_t >= 1.0 {
        return None;
    }
    let cos_theta_t = safe_sqrt(1.0 - sin2_theta_t);
    let wt = -wi / eta + (cos_theta_i / eta - cos_theta_t) * n;
    Some((wt, eta))
}

/// A scattering function in the local shading frame.
pub trait BxDFKind {
    fn flags(&self) -> BxDFFlags;

    fn f(&self, wo: Vec3f, wi: Vec3f, mode: TransportMode) -> SampledSpectrum;

    fn sample_f(
        &self,
        wo: Vec3f,
        uc: Float,
        u: Point2f,
        mode: TransportMode,
        sample_flags: BxDFReflTransFlags,
    ) -> Option<BSDFSample>;

    fn pdf(&self, wo: Vec3f, wi: Vec3f, mode: TransportMode, sample_flags: BxDFReflTransFlags) -> Float;

    /// Hemispherical-directional reflectance, estimated with the given samples.
    fn rho(&self, wo: Vec3f, uc: &[Float], u2: &[Point2f]) -> SampledSpectrum {
        let mut r = SampledSpectrum::zero();
        for (&uc, &u) in uc.iter().zip(u2) {
            if let Some(bs) = self.sample_f(wo, uc, u, TransportMode::Radiance, BxDFReflTransFlags::all()) {
                if bs.pdf > 0.0 {
                    r += bs.f * abs_cos_theta(bs.wi) / bs.pdf;
                }
            }
        }
        r / uc.len().max(1) as Float
    }
}

tagged_handle! {
    pub enum BxDF<'a>: &'a {
        Diffuse(DiffuseBxDF),
        Conductor(ConductorBxDF),
        Dielectric(DielectricBxDF),
    }
}

impl<'a> BxDFKind for BxDF<'a> {
    fn flags(&self) -> BxDFFlags {
        each_kind!(self, Diffuse, Conductor, Dielectric => |b| b.flags())
    }

    fn f(&self, wo: Vec3f, wi: Vec3f, mode: TransportMode) -> SampledSpectrum {
        each_kind!(self, Diffuse, Conductor, Dielectric => |b| b.f(wo, wi, mode))
    }

    fn sample_f(
        &self,
        wo: Vec3f,
        uc: Float,
        u: Point2f,
        mode: TransportMode,
        sample_flags: BxDFReflTransFlags,
    ) -> Option<BSDFSample> {
        each_kind!(self, Diffuse, Conductor, Dielectric => |b| b.sample_f(wo, uc, u, mode, sample_flags))
    }

    fn pdf(&self, wo: Vec3f, wi: Vec3f, mode: TransportMode, sample_flags: BxDFReflTransFlags) -> Float {
        each_kind!(self, Diffuse, Conductor, Dielectric => |b| b.pdf(wo, wi, mode, sample_flags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn refract_follows_snell() {
        let wi = vec3f!(0.6, 0.0, 0.8);
        let (wt, etap) = refract(wi, vec3f!(0, 0, 1), 1.5).unwrap();
        assert_eq!(etap, 1.5);
        assert_abs_diff_eq!(wt.magnitude(), 1.0, epsilon = 1e-5);
        assert!(wt.z < 0.0);
        // sin_t = sin_i / eta
        assert_abs_diff_eq!(-wt.x, 0.6 / 1.5, epsilon = 1e-5);

        // leaving the denser medium past the critical angle
        assert!(refract(vec3f!(0.8, 0.0, -0.6), vec3f!(0, 0, 1), 1.5).is_none());
    }

    #[test]
    fn reflect_mirrors_about_normal() {
        let wo = vec3f!(0.3, -0.4, 0.866);
        let wi = reflect(wo, vec3f!(0, 0, 1));
        assert_abs_diff_eq!(wi, vec3f!(-0.3, 0.4, 0.866), epsilon = 1e-6);
    }

    #[test]
    fn composite_flags() {
        let f = BxDFFlags::GLOSSY_TRANSMISSION;
        assert!(f.is_transmissive() && f.is_glossy() && f.is_non_specular());
        assert!(!BxDFFlags::SPECULAR_REFLECTION.is_non_specular());
        assert_eq!(BxDFReflTransFlags::default(), BxDFReflTransFlags::all());
    }
}
