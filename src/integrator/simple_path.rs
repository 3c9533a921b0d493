use bumpalo::Bump;
use cgmath::InnerSpace;

use crate::{abs_dot, Float, RayDifferential};
use crate::film::VisibleSurface;
use crate::integrator::{Integrator, RayIntegrator};
use crate::interaction::LightSampleContext;
use crate::light::LightKind;
use crate::lightsampler::{LightSamplerKind, UniformLightSampler};
use crate::profile::Profile;
use crate::reflection::{BxDFReflTransFlags, TransportMode};
use crate::sampler::{Sampler, SamplerKind};
use crate::sampling::{sample_uniform_hemisphere, sample_uniform_sphere, uniform_hemisphere_pdf, uniform_sphere_pdf};
use crate::spectrum::{SampledSpectrum, SampledWavelengths};

/// Path tracing without MIS. Either strategy can be switched off, which makes it useful for
/// comparing against [`PathIntegrator`](super::PathIntegrator).
///
/// With `sample_lights` one light is picked uniformly at each bounce and emission found by
/// hitting lights is only counted after specular bounces. With `sample_bsdf` off the next
/// direction is uniform over the sphere, or over the hemisphere the BSDF scatters into.
pub struct SimplePathIntegrator<'a> {
    scene: &'a Integrator<'a>,
    light_sampler: UniformLightSampler<'a>,
    max_depth: usize,
    sample_lights: bool,
    sample_bsdf: bool,
}

impl<'a> SimplePathIntegrator<'a> {
    pub fn new(scene: &'a Integrator<'a>, max_depth: usize, sample_lights: bool, sample_bsdf: bool) -> Self {
        Self {
            scene,
            light_sampler: UniformLightSampler::new(scene.lights()),
            max_depth,
            sample_lights,
            sample_bsdf,
        }
    }
}

impl<'a> RayIntegrator for SimplePathIntegrator<'a> {
    fn li(
        &self,
        mut ray: RayDifferential,
        lambda: &mut SampledWavelengths,
        sampler: &mut Sampler,
        arena: &Bump,
        _visible_surface: Option<&mut VisibleSurface>,
        profile: &mut Profile,
    ) -> SampledSpectrum {
        let mut l = SampledSpectrum::zero();
        let mut beta = SampledSpectrum::one();
        let mut specular_bounce = true;
        let mut depth = 0;

        while !beta.is_black() {
            let si = match self.scene.intersect(&ray.ray, Float::INFINITY) {
                Some(si) => si,
                None => {
                    profile.escaped_rays += 1;
                    if !self.sample_lights || specular_bounce {
                        for light in self.scene.infinite_lights() {
                            l += beta * light.le_escaped(&ray.ray, lambda);
                        }
                    }
                    break;
                }
            };

            let mut isect = si.intr;
            if !self.sample_lights || specular_bounce {
                l += beta * isect.le(isect.wo, lambda);
            }

            if depth == self.max_depth {
                break;
            }

            let bsdf = match isect.get_bsdf(&ray, lambda, arena) {
                Some(bsdf) => bsdf,
                None => {
                    specular_bounce = true;
                    isect.skip_intersection(&mut ray, si.t_hit);
                    continue;
                }
            };
            depth += 1;

            let wo = isect.wo;
            let ns = isect.shading_n.0;

            if self.sample_lights {
                let u = sampler.get_1d();
                let u_light = sampler.get_2d();
                if let Some(sampled) = self.light_sampler.sample_unconditional(u) {
                    let ctx = LightSampleContext::from(&isect);
                    let ls = sampled.light.sample_li(&ctx, u_light, lambda, false);
                    if let Some(ls) = ls.filter(|ls| !ls.l.is_black() && ls.pdf > 0.0) {
                        let f = bsdf.f(wo, ls.wi, TransportMode::Radiance) * abs_dot(ls.wi, ns);
                        if !f.is_black() {
                            profile.shadow_rays += 1;
                            if self.scene.unoccluded(&isect.hit, &ls.p_light) {
                                l += beta * f * ls.l / (sampled.p * ls.pdf);
                            }
                        }
                    }
                }
            }

            let wi = if self.sample_bsdf {
                let u = sampler.get_1d();
                let bs = match bsdf.sample_f(wo, u, sampler.get_2d(), TransportMode::Radiance, BxDFReflTransFlags::all()) {
                    Some(bs) => bs,
                    None => break,
                };
                beta *= bs.f * abs_dot(bs.wi, ns) / bs.pdf;
                specular_bounce = bs.is_specular();
                bs.wi
            } else {
                let flags = bsdf.flags();
                let n = isect.n().0;
                let (wi, pdf) = if flags.is_reflective() && flags.is_transmissive() {
                    (sample_uniform_sphere(sampler.get_2d()), uniform_sphere_pdf())
                } else {
                    let mut wi = sample_uniform_hemisphere(sampler.get_2d());
                    let same_side = wo.dot(n) * wi.dot(n) > 0.0;
                    if (flags.is_reflective() && !same_side) || (flags.is_transmissive() && same_side) {
                        wi = -wi;
                    }
                    (wi, uniform_hemisphere_pdf())
                };
                beta *= bsdf.f(wo, wi, TransportMode::Radiance) * abs_dot(wi, ns) / pdf;
                specular_bounce = false;
                wi
            };

            ray = isect.spawn_ray(wi).into();
            profile.bounce_rays += 1;
        }

        profile.record_path(depth);
        l
    }
}
