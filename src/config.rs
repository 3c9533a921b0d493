//! Render options and the TOML configuration the binary is driven by.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{Float, Vec2f};
use crate::filter::{Filter, FilterType};
use crate::lightsampler::LightSamplerStrategy;
use crate::sampler::{IndependentSampler, Sampler, StratifiedSampler};

/// Settings that change how the renderer draws samples. Passed explicitly to the renderer,
/// never read from global state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderOptions {
    pub seed: u64,
    /// Samples every pixel at its centre with unit filter weight.
    pub disable_pixel_jitter: bool,
    /// Uses the same wavelengths for every sample.
    pub disable_wavelength_jitter: bool,
    pub tile_size: i32,
    pub show_progress: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            disable_pixel_jitter: false,
            disable_wavelength_jitter: false,
            tile_size: 16,
            show_progress: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageConfig {
    pub width: i32,
    pub height: i32,
    pub spp: usize,
    pub output: PathBuf,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self { width: 400, height: 400, spp: 64, output: PathBuf::from("render.png") }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplerType {
    Independent,
    Stratified,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplerConfig {
    pub kind: SamplerType,
    pub jitter: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self { kind: SamplerType::Independent, jitter: true }
    }
}

impl SamplerConfig {
    pub fn create(&self, spp: usize, seed: u64) -> Sampler {
        match self.kind {
            SamplerType::Independent => IndependentSampler::new(spp, seed).into(),
            SamplerType::Stratified => {
                // the most square grid with exactly `spp` cells
                let mut x = (spp as f64).sqrt() as usize;
                while x > 1 && spp % x != 0 {
                    x -= 1;
                }
                let x = x.max(1);
                StratifiedSampler::new(x, spp / x, self.jitter, seed).into()
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    pub kind: FilterType,
    pub radius: [Float; 2],
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { kind: FilterType::Gaussian, radius: [1.5, 1.5] }
    }
}

impl FilterConfig {
    pub fn create(&self) -> Filter {
        Filter::create(self.kind, Vec2f::new(self.radius[0], self.radius[1]))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegratorType {
    RandomWalk,
    SimplePath,
    Path,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegratorConfig {
    pub kind: IntegratorType,
    pub max_depth: usize,
    pub light_sampler: LightSamplerStrategy,
    pub regularize: bool,
    pub sample_lights: bool,
    pub sample_bsdf: bool,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            kind: IntegratorType::Path,
            max_depth: 5,
            light_sampler: LightSamplerStrategy::default(),
            regularize: false,
            sample_lights: true,
            sample_bsdf: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub look_from: [Float; 3],
    pub look_at: [Float; 3],
    pub up: [Float; 3],
    /// Degrees, across the shorter image axis.
    pub fov: Float,
    pub lens_radius: Float,
    pub focal_distance: Float,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            look_from: [0.0, 1.0, 3.8],
            look_at: [0.0, 1.0, 0.0],
            up: [0.0, 1.0, 0.0],
            fov: 38.0,
            lens_radius: 0.0,
            focal_distance: 1e6,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub image: ImageConfig,
    pub sampler: SamplerConfig,
    pub filter: FilterConfig,
    pub integrator: IntegratorConfig,
    pub camera: CameraConfig,
    pub options: RenderOptions,
}

impl RenderConfig {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("invalid render configuration")
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::SamplerKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_is_all_defaults() -> anyhow::Result<()> {
        assert_eq!(RenderConfig::from_toml_str("")?, RenderConfig::default());
        Ok(())
    }

    #[test]
    fn partial_document_overrides_fields() -> anyhow::Result<()> {
        let cfg = RenderConfig::from_toml_str(
            r#"
            [image]
            spp = 16

            [integrator]
            kind = "simplepath"
            light_sampler = "power"
            sample_bsdf = false

            [options]
            tile_size = 8
            "#,
        )?;
        assert_eq!(cfg.image.spp, 16);
        assert_eq!(cfg.image.width, 400);
        assert_eq!(cfg.integrator.kind, IntegratorType::SimplePath);
        assert_eq!(cfg.integrator.light_sampler, LightSamplerStrategy::Power);
        assert!(!cfg.integrator.sample_bsdf);
        assert_eq!(cfg.options.tile_size, 8);
        Ok(())
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let err = RenderConfig::from_toml_str("[integrator]\nlight_sampler = \"bvh\"\n").unwrap_err();
        assert!(format!("{:#}", err).contains("invalid render configuration"));
    }

    #[test]
    fn stratified_grid_keeps_the_sample_count() {
        let cfg = SamplerConfig { kind: SamplerType::Stratified, jitter: true };
        for spp in [1, 6, 7, 16, 24] {
            assert_eq!(cfg.create(spp, 0).samples_per_pixel(), spp);
        }
    }
}
