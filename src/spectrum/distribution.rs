use anyhow::{ensure, Context};

use crate::Float;
use crate::math::lerp;
use super::{SampledSpectrum, SampledWavelengths};

/// A spectral distribution that can be point-evaluated in nanometres.
pub trait SpectrumKind {
    fn value(&self, lambda: Float) -> Float;

    fn max_value(&self) -> Float;

    fn sample(&self, lambda: &SampledWavelengths) -> SampledSpectrum {
        SampledSpectrum::new_with(|i| self.value(lambda.lambda(i)))
    }
}

tagged_handle! {
    #[derive(Clone, Debug)]
    pub enum Spectrum {
        Constant(ConstantSpectrum),
        PiecewiseLinear(PiecewiseLinearSpectrum),
        Blackbody(BlackbodySpectrum),
    }
}

impl Spectrum {
    pub fn constant(c: Float) -> Self {
        Spectrum::Constant(ConstantSpectrum::new(c))
    }
}

impl SpectrumKind for Spectrum {
    fn value(&self, lambda: Float) -> Float {
        match self {
            Spectrum::Constant(s) => s.value(lambda),
            Spectrum::PiecewiseLinear(s) => s.value(lambda),
            Spectrum::Blackbody(s) => s.value(lambda),
        }
    }

    fn max_value(&self) -> Float {
        match self {
            Spectrum::Constant(s) => s.max_value(),
            Spectrum::PiecewiseLinear(s) => s.max_value(),
            Spectrum::Blackbody(s) => s.max_value(),
        }
    }

    fn sample(&self, lambda: &SampledWavelengths) -> SampledSpectrum {
        match self {
            Spectrum::Constant(s) => s.sample(lambda),
            Spectrum::PiecewiseLinear(s) => s.sample(lambda),
            Spectrum::Blackbody(s) => s.sample(lambda),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantSpectrum {
    c: Float,
}

impl ConstantSpectrum {
    pub fn new(c: Float) -> Self {
        Self { c }
    }
}

impl SpectrumKind for ConstantSpectrum {
    fn value(&self, _lambda: Float) -> Float {
        self.c
    }

    fn max_value(&self) -> Float {
        self.c
    }

    fn sample(&self, _lambda: &SampledWavelengths) -> SampledSpectrum {
        SampledSpectrum::uniform(self.c)
    }
}

/// Linear interpolation between `(lambda, value)` knots, zero outside of them.
#[derive(Clone, Debug, PartialEq)]
pub struct PiecewiseLinearSpectrum {
    lambdas: Vec<Float>,
    values: Vec<Float>,
}

impl PiecewiseLinearSpectrum {
    pub fn try_new(lambdas: Vec<Float>, values: Vec<Float>) -> anyhow::Result<Self> {
        ensure!(!lambdas.is_empty(), "piecewise spectrum needs at least one knot");
        ensure!(
            lambdas.len() == values.len(),
            "piecewise spectrum has {} wavelengths but {} values",
            lambdas.len(),
            values.len()
        );
        ensure!(
            lambdas.windows(2).all(|w| w[0] < w[1]),
            "piecewise spectrum wavelengths must be strictly increasing"
        );
        ensure!(values.iter().all(|v| v.is_finite()), "piecewise spectrum has non-finite values");
        Ok(Self { lambdas, values })
    }

    /// Builds from alternating `lambda, value` pairs.
    pub fn from_interleaved(data: &[Float]) -> anyhow::Result<Self> {
        ensure!(data.len() % 2 == 0, "interleaved spectrum has an odd number of entries ({})", data.len());
        let (lambdas, values) = data.chunks_exact(2).map(|c| (c[0], c[1])).unzip();
        Self::try_new(lambdas, values).context("invalid interleaved spectrum")
    }

    pub fn scale(&mut self, s: Float) {
        self.values.iter_mut().for_each(|v| *v *= s);
    }
}

impl SpectrumKind for PiecewiseLinearSpectrum {
    fn value(&self, lambda: Float) -> Float {
        let (first, last) = (self.lambdas[0], self.lambdas[self.lambdas.len() - 1]);
        if lambda < first || lambda > last {
            return 0.0;
        }
        if self.lambdas.len() == 1 {
            return self.values[0];
        }
        let o = self.lambdas.partition_point(|&l| l <= lambda).clamp(1, self.lambdas.len() - 1) - 1;
        let t = (lambda - self.lambdas[o]) / (self.lambdas[o + 1] - self.lambdas[o]);
        lerp(t, self.values[o], self.values[o + 1])
    }

    fn max_value(&self) -> Float {
        self.values.iter().cloned().fold(0.0, Float::max)
    }
}

/// Planck's law for temperature `t` (Kelvin), normalized to a peak of one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlackbodySpectrum {
    t: Float,
    normalization: Float,
}

/// Emitted radiance of a blackbody at `lambda` nm.
pub fn blackbody(lambda: Float, t: Float) -> Float {
    if t <= 0.0 {
        return 0.0;
    }
    const C: f64 = 299792458.0;
    const H: f64 = 6.62606957e-34;
    const KB: f64 = 1.3806488e-23;
    let l = lambda as f64 * 1e-9;
    let le = (2.0 * H * C * C) / (l.powi(5) * (((H * C) / (l * KB * t as f64)).exp() - 1.0));
    le as Float
}

impl BlackbodySpectrum {
    pub fn new(t: Float) -> Self {
        // Wien's displacement law gives the peak wavelength.
        let lambda_max = 2.8977721e-3 / t * 1e9;
        let peak = blackbody(lambda_max, t);
        let normalization = if peak > 0.0 { 1.0 / peak } else { 0.0 };
        Self { t, normalization }
    }

    pub fn temperature(&self) -> Float {
        self.t
    }
}

impl SpectrumKind for BlackbodySpectrum {
    fn value(&self, lambda: Float) -> Float {
        blackbody(lambda, self.t) * self.normalization
    }

    fn max_value(&self) -> Float {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::Tagged;
    use approx::assert_relative_eq;

    #[test]
    fn piecewise_interpolates_and_clamps() -> anyhow::Result<()> {
        let s = PiecewiseLinearSpectrum::from_interleaved(&[400.0, 1.0, 500.0, 3.0, 600.0, 0.0])?;
        assert_relative_eq!(s.value(450.0), 2.0);
        assert_relative_eq!(s.value(500.0), 3.0);
        assert_relative_eq!(s.value(550.0), 1.5);
        assert_eq!(s.value(399.0), 0.0);
        assert_eq!(s.value(601.0), 0.0);
        assert_eq!(s.max_value(), 3.0);
        Ok(())
    }

    #[test]
    fn piecewise_rejects_malformed_input() {
        assert!(PiecewiseLinearSpectrum::try_new(vec![500.0, 400.0], vec![1.0, 1.0]).is_err());
        assert!(PiecewiseLinearSpectrum::try_new(vec![400.0], vec![1.0, 2.0]).is_err());
        assert!(PiecewiseLinearSpectrum::from_interleaved(&[400.0, 1.0, 500.0]).is_err());
    }

    #[test]
    fn blackbody_peaks_at_one() {
        let s = BlackbodySpectrum::new(6500.0);
        let peak = 2.8977721e-3 / 6500.0 * 1e9;
        assert_relative_eq!(s.value(peak), 1.0, max_relative = 1e-4);
        assert!(s.value(400.0) < 1.0 && s.value(700.0) < 1.0);
    }

    #[test]
    fn handle_forwards_to_kind() {
        let c = Spectrum::constant(2.5);
        assert!(c.is::<ConstantSpectrum>());
        assert_eq!(c.tag(), 1);
        let lambda = SampledWavelengths::sample_visible(0.25);
        assert_eq!(c.sample(&lambda), SampledSpectrum::uniform(2.5));

        let bb = BlackbodySpectrum::new(3000.0);
        let handle = Spectrum::from(bb);
        assert_eq!(Tagged::tag(&handle), 3);
        assert_eq!(handle.value(555.0), bb.value(555.0));
    }
}
