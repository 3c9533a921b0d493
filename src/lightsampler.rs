//! Strategies for picking the one light that next-event estimation samples at a shading point.

use std::collections::HashMap;
use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::Float;
use crate::interaction::LightSampleContext;
use crate::light::{Light, LightBounds, LightKind};
use crate::math::ONE_MINUS_EPSILON;
use crate::sampling::Distribution1D;
use crate::spectrum::SampledWavelengths;

/// A light together with the probability it was chosen with.
#[derive(Clone, Copy, Debug)]
pub struct SampledLight<'a> {
    pub light: Light<'a>,
    pub p: Float,
}

pub trait LightSamplerKind<'a> {
    fn sample(&self, ctx: &LightSampleContext, u: Float) -> Option<SampledLight<'a>>;

    fn pmf(&self, ctx: &LightSampleContext, light: Light<'a>) -> Float;

    fn sample_unconditional(&self, u: Float) -> Option<SampledLight<'a>>;

    fn pmf_unconditional(&self, light: Light<'a>) -> Float;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightSamplerStrategy {
    Uniform,
    Power,
    Exhaustive,
}

impl Default for LightSamplerStrategy {
    fn default() -> Self {
        LightSamplerStrategy::Exhaustive
    }
}

impl FromStr for LightSamplerStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "uniform" => Ok(LightSamplerStrategy::Uniform),
            "power" => Ok(LightSamplerStrategy::Power),
            "exhaustive" => Ok(LightSamplerStrategy::Exhaustive),
            _ => bail!("unknown light sampler \"{}\"", s),
        }
    }
}

tagged_handle! {
    pub enum LightSampler<'a> {
        Uniform(UniformLightSampler<'a>),
        Power(PowerLightSampler<'a>),
        Exhaustive(ExhaustiveLightSampler<'a>),
    }
}

impl<'a> LightSampler<'a> {
    pub fn create(strategy: LightSamplerStrategy, lights: &[Light<'a>]) -> Self {
        match strategy {
            LightSamplerStrategy::Uniform => UniformLightSampler::new(lights).into(),
            LightSamplerStrategy::Power => PowerLightSampler::new(lights).into(),
            LightSamplerStrategy::Exhaustive => ExhaustiveLightSampler::new(lights).into(),
        }
    }
}

impl<'a> LightSamplerKind<'a> for LightSampler<'a> {
    fn sample(&self, ctx: &LightSampleContext, u: Float) -> Option<SampledLight<'a>> {
        each_kind!(self, Uniform, Power, Exhaustive => |s| s.sample(ctx, u))
    }

    fn pmf(&self, ctx: &LightSampleContext, light: Light<'a>) -> Float {
        each_kind!(self, Uniform, Power, Exhaustive => |s| s.pmf(ctx, light))
    }

    fn sample_unconditional(&self, u: Float) -> Option<SampledLight<'a>> {
        each_kind!(self, Uniform, Power, Exhaustive => |s| s.sample_unconditional(u))
    }

    fn pmf_unconditional(&self, light: Light<'a>) -> Float {
        each_kind!(self, Uniform, Power, Exhaustive => |s| s.pmf_unconditional(light))
    }
}

fn pick(u: Float, n: usize) -> usize {
    ((u * n as Float) as usize).min(n - 1)
}

/// Every light with equal probability.
pub struct UniformLightSampler<'a> {
    lights: Vec<Light<'a>>,
}

impl<'a> UniformLightSampler<'a> {
    pub fn new(lights: &[Light<'a>]) -> Self {
        Self { lights: lights.to_vec() }
    }
}

impl<'a> LightSamplerKind<'a> for UniformLightSampler<'a> {
    fn sample(&self, _ctx: &LightSampleContext, u: Float) -> Option<SampledLight<'a>> {
        self.sample_unconditional(u)
    }

    fn pmf(&self, _ctx: &LightSampleContext, light: Light<'a>) -> Float {
        self.pmf_unconditional(light)
    }

    fn sample_unconditional(&self, u: Float) -> Option<SampledLight<'a>> {
        if self.lights.is_empty() {
            return None;
        }
        let light = self.lights[pick(u, self.lights.len())];
        Some(SampledLight { light, p: 1.0 / self.lights.len() as Float })
    }

    fn pmf_unconditional(&self, _light: Light<'a>) -> Float {
        if self.lights.is_empty() {
            0.0
        } else {
            1.0 / self.lights.len() as Float
        }
    }
}

/// Lights in proportion to their emitted power, regardless of where the shading point is.
pub struct PowerLightSampler<'a> {
    lights: Vec<Light<'a>>,
    distrib: Distribution1D,
    index: HashMap<Light<'a>, usize>,
}

impl<'a> PowerLightSampler<'a> {
    pub fn new(lights: &[Light<'a>]) -> Self {
        // power summed over the visible range, weighted the way the sensor samples it
        let lambda = SampledWavelengths::sample_visible(0.5);
        let power: Vec<Float> = lights
            .iter()
            .map(|l| l.phi(&lambda).safe_div(lambda.pdf()).average())
            .collect();
        let index = lights.iter().enumerate().map(|(i, &l)| (l, i)).collect();
        Self { lights: lights.to_vec(), distrib: Distribution1D::new(&power), index }
    }
}

impl<'a> LightSamplerKind<'a> for PowerLightSampler<'a> {
    fn sample(&self, _ctx: &LightSampleContext, u: Float) -> Option<SampledLight<'a>> {
        self.sample_unconditional(u)
    }

    fn pmf(&self, _ctx: &LightSampleContext, light: Light<'a>) -> Float {
        self.pmf_unconditional(light)
    }

    fn sample_unconditional(&self, u: Float) -> Option<SampledLight<'a>> {
        let ds = self.distrib.sample_discrete(u)?;
        Some(SampledLight { light: self.lights[ds.index], p: ds.pmf })
    }

    fn pmf_unconditional(&self, light: Light<'a>) -> Float {
        match self.index.get(&light) {
            Some(&i) => self.distrib.discrete_pmf(i),
            None => 0.0,
        }
    }
}

/// Evaluates the bounds of every light at the shading point. Infinite lights share a fixed
/// probability and the rest is split by importance.
pub struct ExhaustiveLightSampler<'a> {
    bounded: Vec<(Light<'a>, LightBounds)>,
    infinite: Vec<Light<'a>>,
    bounded_index: HashMap<Light<'a>, usize>,
}

impl<'a> ExhaustiveLightSampler<'a> {
    pub fn new(lights: &[Light<'a>]) -> Self {
        let mut bounded = Vec::new();
        let mut infinite = Vec::new();
        for &light in lights {
            match light.bounds() {
                Some(lb) if lb.phi > 0.0 => bounded.push((light, lb)),
                Some(_) => {}
                None => infinite.push(light),
            }
        }
        let bounded_index = bounded.iter().enumerate().map(|(i, (l, _))| (*l, i)).collect();
        Self { bounded, infinite, bounded_index }
    }

    fn p_infinite(&self) -> Float {
        let n_inf = self.infinite.len() as Float;
        let n_bounded = if self.bounded.is_empty() { 0.0 } else { 1.0 };
        if n_inf == 0.0 { 0.0 } else { n_inf / (n_inf + n_bounded) }
    }

    fn sample_weighted<F: Fn(&LightBounds) -> Float>(&self, u: Float, weight: F) -> Option<SampledLight<'a>> {
        let p_infinite = self.p_infinite();
        if u < p_infinite {
            let light = self.infinite[pick(u / p_infinite, self.infinite.len())];
            return Some(SampledLight { light, p: p_infinite / self.infinite.len() as Float });
        }
        if self.bounded.is_empty() {
            return None;
        }

        let u = ((u - p_infinite) / (1.0 - p_infinite)).min(ONE_MINUS_EPSILON);
        let total: Float = self.bounded.iter().map(|(_, lb)| weight(lb)).sum();
        if total == 0.0 {
            return None;
        }

        // walk the running sum, two passes to stay allocation free
        let target = u * total;
        let mut acc = 0.0;
        let mut chosen = None;
        for (light, lb) in &self.bounded {
            let w = weight(lb);
            if w > 0.0 {
                chosen = Some((*light, w));
                acc += w;
                if acc > target {
                    break;
                }
            }
        }
        let (light, w) = chosen?;
        Some(SampledLight { light, p: (1.0 - p_infinite) * w / total })
    }

    fn pmf_weighted<F: Fn(&LightBounds) -> Float>(&self, light: Light<'a>, weight: F) -> Float {
        let Some(&i) = self.bounded_index.get(&light) else {
            return if self.infinite.contains(&light) {
                self.p_infinite() / self.infinite.len() as Float
            } else {
                0.0
            };
        };

        let total: Float = self.bounded.iter().map(|(_, lb)| weight(lb)).sum();
        if total == 0.0 {
            return 0.0;
        }
        (1.0 - self.p_infinite()) * weight(&self.bounded[i].1) / total
    }
}

impl<'a> LightSamplerKind<'a> for ExhaustiveLightSampler<'a> {
    fn sample(&self, ctx: &LightSampleContext, u: Float) -> Option<SampledLight<'a>> {
        self.sample_weighted(u, |lb| lb.importance(ctx.p, ctx.n))
    }

    fn pmf(&self, ctx: &LightSampleContext, light: Light<'a>) -> Float {
        self.pmf_weighted(light, |lb| lb.importance(ctx.p, ctx.n))
    }

    fn sample_unconditional(&self, u: Float) -> Option<SampledLight<'a>> {
        self.sample_weighted(u, |lb| lb.phi)
    }

    fn pmf_unconditional(&self, light: Light<'a>) -> Float {
        self.pmf_weighted(light, |lb| lb.phi)
    }
}
