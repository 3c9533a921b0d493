use bumpalo::Bump;
use cgmath::InnerSpace;

use crate::{Float, Frame, Normal3, Point2f, Vec3f, Visit};
use crate::geometry::coordinate_system;
use crate::reflection::*;
use crate::spectrum::SampledSpectrum;

/// A BxDF placed in the shading frame of a surface point. Directions passed in and returned
/// are in render space.
#[derive(Clone, Copy, Debug)]
pub struct Bsdf<'b> {
    bxdf: BxDF<'b>,
    frame: Frame,
}

impl<'b> Bsdf<'b> {
    /// Builds the shading frame from the shading normal `ns` and the tangent `dpdus`, which
    /// need not be perpendicular to it.
    pub fn new(ns: Normal3, dpdus: Vec3f, bxdf: BxDF<'b>) -> Self {
        let ns = ns.0.normalize();
        let tangent = dpdus - ns * ns.dot(dpdus);
        let frame = if tangent.magnitude2() > 0.0 {
            Frame::from_xz(tangent.normalize(), ns)
        } else {
            let (x, y) = coordinate_system(ns);
            Frame { x, y, z: ns }
        };
        Self { bxdf, frame }
    }

    pub fn bxdf(&self) -> BxDF<'b> {
        self.bxdf
    }

    pub fn flags(&self) -> BxDFFlags {
        self.bxdf.flags()
    }

    pub fn render_to_local(&self, v: Vec3f) -> Vec3f {
        self.frame.to_local(v)
    }

    pub fn local_to_render(&self, v: Vec3f) -> Vec3f {
        self.frame.from_local(v)
    }

    pub fn f(&self, wo_render: Vec3f, wi_render: Vec3f, mode: TransportMode) -> SampledSpectrum {
        let wi = self.render_to_local(wi_render);
        let wo = self.render_to_local(wo_render);
        if wo.z == 0.0 {
            return SampledSpectrum::zero();
        }
        self.bxdf.f(wo, wi, mode)
    }

    pub fn sample_f(
        &self,
        wo_render: Vec3f,
        u: Float,
        u2: Point2f,
        mode: TransportMode,
        sample_flags: BxDFReflTransFlags,
    ) -> Option<BSDFSample> {
        let wo = self.render_to_local(wo_render);
        if wo.z == 0.0 || !self.admits(sample_flags) {
            return None;
        }

        let mut bs = self.bxdf.sample_f(wo, u, u2, mode, sample_flags)?;
        if bs.f.is_black() || bs.pdf == 0.0 || bs.wi.z == 0.0 {
            return None;
        }
        bs.wi = self.local_to_render(bs.wi);
        Some(bs)
    }

    pub fn pdf(&self, wo_render: Vec3f, wi_render: Vec3f, mode: TransportMode, sample_flags: BxDFReflTransFlags) -> Float {
        let wo = self.render_to_local(wo_render);
        let wi = self.render_to_local(wi_render);
        if wo.z == 0.0 {
            return 0.0;
        }
        self.bxdf.pdf(wo, wi, mode, sample_flags)
    }

    pub fn rho(&self, wo_render: Vec3f, uc: &[Float], u2: &[Point2f]) -> SampledSpectrum {
        let wo = self.render_to_local(wo_render);
        self.bxdf.rho(wo, uc, u2)
    }

    /// Replaces the BxDF with a roughened copy allocated in `arena`.
    pub fn regularize(&mut self, arena: &'b Bump) {
        self.bxdf = self.bxdf.dispatch(Regularize { arena });
    }

    fn admits(&self, sample_flags: BxDFReflTransFlags) -> bool {
        let flags = self.flags();
        (sample_flags.contains(BxDFReflTransFlags::REFLECTION) && flags.is_reflective())
            || (sample_flags.contains(BxDFReflTransFlags::TRANSMISSION) && flags.is_transmissive())
    }
}

struct Regularize<'b> {
    arena: &'b Bump,
}

impl<'b> Visit<DiffuseBxDF> for Regularize<'b> {
    type Output = BxDF<'b>;

    fn visit(self, kind: &DiffuseBxDF) -> BxDF<'b> {
        BxDF::from(&*self.arena.alloc(*kind))
    }
}

impl<'b> Visit<ConductorBxDF> for Regularize<'b> {
    type Output = BxDF<'b>;

    fn visit(self, kind: &ConductorBxDF) -> BxDF<'b> {
        let mut b = *kind;
        b.regularize();
        BxDF::from(&*self.arena.alloc(b))
    }
}

impl<'b> Visit<DielectricBxDF> for Regularize<'b> {
    type Output = BxDF<'b>;

    fn visit(self, kind: &DielectricBxDF) -> BxDF<'b> {
        let mut b = *kind;
        b.regularize();
        BxDF::from(&*self.arena.alloc(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn frame_is_orthonormal_for_skewed_tangent() {
        let diffuse = DiffuseBxDF::new(SampledSpectrum::uniform(0.5));
        let n = Normal3::new(0.0, 0.0, 1.0);
        let bsdf = Bsdf::new(n, vec3f!(1.0, 0.0, 0.5), BxDF::from(&diffuse));
        let w = vec3f!(0.3, -0.2, 0.7).normalize();
        assert_abs_diff_eq!(bsdf.local_to_render(bsdf.render_to_local(w)), w, epsilon = 1e-5);
        assert_abs_diff_eq!(bsdf.render_to_local(n.0), vec3f!(0, 0, 1), epsilon = 1e-6);
    }

    #[test]
    fn sampled_direction_is_in_render_space() {
        let diffuse = DiffuseBxDF::new(SampledSpectrum::uniform(0.5));
        let n = Normal3::new(1.0, 0.0, 0.0);
        let bsdf = Bsdf::new(n, vec3f!(0, 1, 0), BxDF::from(&diffuse));
        let bs = bsdf
            .sample_f(vec3f!(1, 0, 0), 0.5, point2f!(0.2, 0.8), TransportMode::Radiance, BxDFReflTransFlags::all())
            .unwrap();
        assert!(bs.wi.x > 0.0);
        let pdf = bsdf.pdf(vec3f!(1, 0, 0), bs.wi, TransportMode::Radiance, BxDFReflTransFlags::all());
        assert_abs_diff_eq!(pdf, bs.pdf, epsilon = 1e-5);
    }

    #[test]
    fn regularize_turns_mirror_glossy() {
        let arena = Bump::new();
        let mirror = ConductorBxDF::new(
            TrowbridgeReitz::new(0.0, 0.0),
            SampledSpectrum::uniform(0.2),
            SampledSpectrum::uniform(3.0),
        );
        let mut bsdf = Bsdf::new(Normal3::new(0.0, 0.0, 1.0), vec3f!(1, 0, 0), BxDF::from(&mirror));
        assert!(bsdf.flags().is_specular());
        bsdf.regularize(&arena);
        assert_eq!(bsdf.flags(), BxDFFlags::GLOSSY_REFLECTION);
        assert!(bsdf.bxdf().is::<ConductorBxDF>());
    }
}
