use bumpalo::Bump;

use crate::{Float, Normal3, Point2f, Point3f, Vec3f};
use crate::reflection::{BxDF, ConductorBxDF, DielectricBxDF, DiffuseBxDF, TrowbridgeReitz};
use crate::spectrum::{ConstantSpectrum, SampledWavelengths, Spectrum, SpectrumKind};

/// What a material sees of the surface point it is evaluated at.
#[derive(Clone, Copy, Debug)]
pub struct MaterialEvalContext {
    pub p: Point3f,
    pub wo: Vec3f,
    pub n: Normal3,
    pub ns: Normal3,
    pub dpdus: Vec3f,
    pub uv: Point2f,
}

pub trait MaterialKind {
    /// Evaluates the material into a BxDF allocated in `arena`. May terminate the secondary
    /// wavelengths of `lambda` when the scattering depends on wavelength.
    fn get_bxdf<'b>(
        &self,
        ctx: &MaterialEvalContext,
        lambda: &mut SampledWavelengths,
        arena: &'b Bump,
    ) -> Option<BxDF<'b>>;
}

tagged_handle! {
    pub enum Material<'a>: &'a {
        Diffuse(DiffuseMaterial),
        Conductor(ConductorMaterial),
        Dielectric(DielectricMaterial),
    }
}

impl<'a> MaterialKind for Material<'a> {
    fn get_bxdf<'b>(
        &self,
        ctx: &MaterialEvalContext,
        lambda: &mut SampledWavelengths,
        arena: &'b Bump,
    ) -> Option<BxDF<'b>> {
        each_kind!(self, Diffuse, Conductor, Dielectric => |m| m.get_bxdf(ctx, lambda, arena))
    }
}

/// Microfacet roughness, optionally given in the perceptual [0, 1] parameterization.
#[derive(Clone, Copy, Debug)]
pub struct Roughness {
    pub u: Float,
    pub v: Float,
    pub remap: bool,
}

impl Roughness {
    pub fn smooth() -> Self {
        Self { u: 0.0, v: 0.0, remap: false }
    }

    pub fn isotropic(r: Float) -> Self {
        Self { u: r, v: r, remap: true }
    }

    fn distribution(&self) -> TrowbridgeReitz {
        if self.remap {
            TrowbridgeReitz::new(
                TrowbridgeReitz::roughness_to_alpha(self.u),
                TrowbridgeReitz::roughness_to_alpha(self.v),
            )
        } else {
            TrowbridgeReitz::new(self.u, self.v)
        }
    }
}

#[derive(Clone, Debug)]
pub struct DiffuseMaterial {
    reflectance: Spectrum,
}

impl DiffuseMaterial {
    pub fn new(reflectance: Spectrum) -> Self {
        Self { reflectance }
    }
}

impl MaterialKind for DiffuseMaterial {
    fn get_bxdf<'b>(
        &self,
        _ctx: &MaterialEvalContext,
        lambda: &mut SampledWavelengths,
        arena: &'b Bump,
    ) -> Option<BxDF<'b>> {
        let r = self.reflectance.sample(lambda).clamp(0.0, 1.0);
        Some(BxDF::from(&*arena.alloc(DiffuseBxDF::new(r))))
    }
}

#[derive(Clone, Debug)]
pub struct ConductorMaterial {
    eta: Spectrum,
    k: Spectrum,
    roughness: Roughness,
}

impl ConductorMaterial {
    pub fn new(eta: Spectrum, k: Spectrum, roughness: Roughness) -> Self {
        Self { eta, k, roughness }
    }
}

impl MaterialKind for ConductorMaterial {
    fn get_bxdf<'b>(
        &self,
        _ctx: &MaterialEvalContext,
        lambda: &mut SampledWavelengths,
        arena: &'b Bump,
    ) -> Option<BxDF<'b>> {
        let eta = self.eta.sample(lambda);
        let k = self.k.sample(lambda);
        let bxdf = ConductorBxDF::new(self.roughness.distribution(), eta, k);
        Some(BxDF::from(&*arena.alloc(bxdf)))
    }
}

#[derive(Clone, Debug)]
pub struct DielectricMaterial {
    eta: Spectrum,
    roughness: Roughness,
}

impl DielectricMaterial {
    pub fn new(eta: Spectrum, roughness: Roughness) -> Self {
        Self { eta, roughness }
    }
}

impl MaterialKind for DielectricMaterial {
    fn get_bxdf<'b>(
        &self,
        _ctx: &MaterialEvalContext,
        lambda: &mut SampledWavelengths,
        arena: &'b Bump,
    ) -> Option<BxDF<'b>> {
        let mut eta = self.eta.value(lambda.lambda(0));
        // a dispersive interface sends each wavelength a different way
        if !self.eta.is::<ConstantSpectrum>() {
            lambda.terminate_secondary();
        }
        if eta == 0.0 {
            eta = 1.0;
        }
        let bxdf = DielectricBxDF::new(eta, self.roughness.distribution());
        Some(BxDF::from(&*arena.alloc(bxdf)))
    }
}
