use bumpalo::Bump;

use crate::{abs_dot, Float, RayDifferential};
use crate::film::VisibleSurface;
use crate::integrator::{Integrator, RayIntegrator};
use crate::light::LightKind;
use crate::profile::Profile;
use crate::reflection::TransportMode;
use crate::sampler::{Sampler, SamplerKind};
use crate::sampling::{sample_uniform_sphere, uniform_sphere_pdf};
use crate::spectrum::{SampledSpectrum, SampledWavelengths};

/// Unbiased reference estimator: scatters in uniformly random directions and only ever
/// finds light by hitting it.
///
/// A path ends when it escapes or has scattered `max_depth` times. It ends early on a
/// surface without a BSDF or when the sampled direction gets no scattering. There is no
/// Russian roulette.
pub struct RandomWalkIntegrator<'a> {
    scene: &'a Integrator<'a>,
    max_depth: usize,
}

impl<'a> RandomWalkIntegrator<'a> {
    pub fn new(scene: &'a Integrator<'a>, max_depth: usize) -> Self {
        Self { scene, max_depth }
    }
}

impl<'a> RayIntegrator for RandomWalkIntegrator<'a> {
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
        let mut depth = 0;

        loop {
            let si = match self.scene.intersect(&ray.ray, Float::INFINITY) {
                Some(si) => si,
                None => {
                    profile.escaped_rays += 1;
                    for light in self.scene.infinite_lights() {
                        l += beta * light.le_escaped(&ray.ray, lambda);
                    }
                    break;
                }
            };

            let mut isect = si.intr;
            let wo = isect.wo;
            l += beta * isect.le(wo, lambda);
            if depth == self.max_depth {
                break;
            }

            let bsdf = match isect.get_bsdf(&ray, lambda, arena) {
                Some(bsdf) => bsdf,
                None => break,
            };

            let wp = sample_uniform_sphere(sampler.get_2d());
            let fcos = bsdf.f(wo, wp, TransportMode::Radiance) * abs_dot(wp, isect.shading_n.0);
            if fcos.is_black() {
                break;
            }

            beta *= fcos / uniform_sphere_pdf();
            ray = isect.spawn_ray(wp).into();
            depth += 1;
            profile.bounce_rays += 1;
        }

        profile.record_path(depth);
        l
    }
}
