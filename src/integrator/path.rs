use bumpalo::Bump;

use crate::{abs_dot, Float, Point2f, RayDifferential, SurfaceInteraction, Vec3f};
use crate::film::VisibleSurface;
use crate::integrator::{Integrator, RayIntegrator};
use crate::interaction::LightSampleContext;
use crate::light::{Light, LightKind};
use crate::lightsampler::{LightSampler, LightSamplerKind, LightSamplerStrategy};
use crate::math::sqr;
use crate::profile::Profile;
use crate::reflection::{Bsdf, BxDFReflTransFlags, TransportMode};
use crate::sampler::{Sampler, SamplerKind};
use crate::sampling::{power_heuristic, radical_inverse};
use crate::spectrum::{SampledSpectrum, SampledWavelengths};

const RHO_SAMPLES: usize = 16;

/// Path tracing with next-event estimation, BSDF sampling and multiple importance sampling
/// between the two.
///
/// Light reached by a BSDF-sampled ray is weighted against the probability that the light
/// sampler would have produced the same direction from the previous vertex, and each light
/// sample is weighted against the BSDF's density for its direction (power heuristic).
/// Paths that carry little energy are terminated with Russian roulette after the second
/// bounce.
pub struct PathIntegrator<'a> {
    scene: &'a Integrator<'a>,
    light_sampler: LightSampler<'a>,
    max_depth: usize,
    regularize: bool,
}

impl<'a> PathIntegrator<'a> {
    pub fn new(scene: &'a Integrator<'a>, max_depth: usize, strategy: LightSamplerStrategy, regularize: bool) -> Self {
        Self {
            scene,
            light_sampler: LightSampler::create(strategy, scene.lights()),
            max_depth,
            regularize,
        }
    }

    /// Samples one light for direct lighting at `intr`, MIS-weighted against BSDF sampling.
    fn sample_ld(
        &self,
        intr: &SurfaceInteraction,
        bsdf: &Bsdf,
        lambda: &SampledWavelengths,
        sampler: &mut Sampler,
        profile: &mut Profile,
    ) -> SampledSpectrum {
        let mut ctx = LightSampleContext::from(intr);
        // sample from the side the BSDF can actually scatter to
        let flags = bsdf.flags();
        if flags.is_reflective() && !flags.is_transmissive() {
            ctx.p = intr.hit.offset_ray_origin(intr.wo);
        } else if flags.is_transmissive() && !flags.is_reflective() {
            ctx.p = intr.hit.offset_ray_origin(-intr.wo);
        }

        let u = sampler.get_1d();
        let sampled = self.light_sampler.sample(&ctx, u);
        let u_light = sampler.get_2d();
        let sampled = match sampled {
            Some(sampled) => sampled,
            None => return SampledSpectrum::zero(),
        };

        let light = sampled.light;
        let ls = match light.sample_li(&ctx, u_light, lambda, true) {
            Some(ls) if !ls.l.is_black() && ls.pdf > 0.0 => ls,
            _ => return SampledSpectrum::zero(),
        };

        let (wo, wi) = (intr.wo, ls.wi);
        let f = bsdf.f(wo, wi, TransportMode::Radiance) * abs_dot(wi, intr.shading_n.0);
        if f.is_black() {
            return SampledSpectrum::zero();
        }
        profile.shadow_rays += 1;
        if !self.scene.unoccluded(&intr.hit, &ls.p_light) {
            return SampledSpectrum::zero();
        }

        let p_l = sampled.p * ls.pdf;
        if light.light_type().is_delta() {
            ls.l * f / p_l
        } else {
            let p_b = bsdf.pdf(wo, wi, TransportMode::Radiance, BxDFReflTransFlags::all());
            let w_l = power_heuristic(1, p_l, 1, p_b);
            w_l * ls.l * f / p_l
        }
    }

    /// Density with which next-event estimation from `prev_ctx` would have sampled `wi`
    /// towards `light`.
    fn light_pdf(&self, prev_ctx: &LightSampleContext, light: Light<'a>, wi: Vec3f) -> Float {
        self.light_sampler.pmf(prev_ctx, light) * light.pdf_li(prev_ctx, wi, true)
    }
}

fn albedo(bsdf: &Bsdf, wo: Vec3f) -> SampledSpectrum {
    let uc: [Float; RHO_SAMPLES] = std::array::from_fn(|i| radical_inverse(0, i as u64 + 1));
    let u2: [Point2f; RHO_SAMPLES] =
        std::array::from_fn(|i| Point2f::new(radical_inverse(1, i as u64 + 1), radical_inverse(2, i as u64 + 1)));
    bsdf.rho(wo, &uc, &u2)
}

impl<'a> RayIntegrator for PathIntegrator<'a> {
    fn li(
        &self,
        mut ray: RayDifferential,
        lambda: &mut SampledWavelengths,
        sampler: &mut Sampler,
        arena: &Bump,
        mut visible_surface: Option<&mut VisibleSurface>,
        profile: &mut Profile,
    ) -> SampledSpectrum {
        let mut l = SampledSpectrum::zero();
        let mut beta = SampledSpectrum::one();
        let mut depth = 0;
        let mut specular_bounce = false;
        let mut any_non_specular_bounces = false;
        // density of the BSDF sample that produced `ray`
        let mut p_b: Float = 1.0;
        let mut eta_scale: Float = 1.0;
        let mut prev_ctx = LightSampleContext::from_point(ray.ray.origin, ray.ray.time);

        loop {
            let si = match self.scene.intersect(&ray.ray, Float::INFINITY) {
                Some(si) => si,
                None => {
                    profile.escaped_rays += 1;
                    for &light in self.scene.infinite_lights() {
                        let le = light.le_escaped(&ray.ray, lambda);
                        if depth == 0 || specular_bounce {
                            l += beta * le;
                        } else {
                            let p_l = self.light_pdf(&prev_ctx, light, ray.ray.dir);
                            l += beta * power_heuristic(1, p_b, 1, p_l) * le;
                        }
                    }
                    break;
                }
            };

            let mut isect = si.intr;
            let le = isect.le(isect.wo, lambda);
            if !le.is_black() {
                if depth == 0 || specular_bounce {
                    l += beta * le;
                } else if let Some(area_light) = isect.area_light {
                    let p_l = self.light_pdf(&prev_ctx, area_light, ray.ray.dir);
                    l += beta * power_heuristic(1, p_b, 1, p_l) * le;
                }
            }

            let mut bsdf = match isect.get_bsdf(&ray, lambda, arena) {
                Some(bsdf) => bsdf,
                None => {
                    specular_bounce = true;
                    isect.skip_intersection(&mut ray, si.t_hit);
                    continue;
                }
            };

            if depth == 0 {
                if let Some(vs) = visible_surface.take() {
                    *vs = VisibleSurface::new(&isect, albedo(&bsdf, isect.wo));
                }
            }

            if self.regularize && any_non_specular_bounces {
                bsdf.regularize(arena);
            }

            if depth == self.max_depth {
                break;
            }
            depth += 1;

            if bsdf.flags().is_non_specular() {
                l += beta * self.sample_ld(&isect, &bsdf, lambda, sampler, profile);
            }
            prev_ctx = LightSampleContext::from(&isect);

            let wo = isect.wo;
            let u = sampler.get_1d();
            let bs = match bsdf.sample_f(wo, u, sampler.get_2d(), TransportMode::Radiance, BxDFReflTransFlags::all()) {
                Some(bs) => bs,
                None => break,
            };

            beta *= bs.f * abs_dot(bs.wi, isect.shading_n.0) / bs.pdf;
            p_b = if bs.pdf_is_proportional {
                bsdf.pdf(wo, bs.wi, TransportMode::Radiance, BxDFReflTransFlags::all())
            } else {
                bs.pdf
            };
            specular_bounce = bs.is_specular();
            any_non_specular_bounces |= !bs.is_specular();
            if bs.is_transmission() {
                eta_scale *= sqr(bs.eta);
            }
            ray = isect.spawn_ray_with_differentials(&ray, bs.wi, bs.flags, bs.eta);
            profile.bounce_rays += 1;

            // the radiance scaling from refraction shouldn't count towards termination
            let rr_beta = beta * eta_scale;
            let rr_max = rr_beta.max_component_value();
            if rr_max < 1.0 && depth > 1 {
                let q = Float::max(0.0, 1.0 - rr_max);
                if sampler.get_1d() < q {
                    break;
                }
                beta /= 1.0 - q;
            }
        }

        profile.record_path(depth);
        l
    }
}
