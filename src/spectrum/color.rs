use crate::Float;
use crate::math::sqr;
use super::{SampledSpectrum, SampledWavelengths};

/// Integral of the luminance matching function over the visible range.
pub const CIE_Y_INTEGRAL: Float = 106.856895;

// Piecewise gaussian with a different spread on each side of the mean.
fn lobe(lambda: Float, mu: Float, sigma_lo: Float, sigma_hi: Float) -> Float {
    let sigma = if lambda < mu { sigma_lo } else { sigma_hi };
    (-0.5 * sqr((lambda - mu) / sigma)).exp()
}

/// Multi-lobe fit of the CIE 1931 `x̄` matching function, `lambda` in nm.
pub fn cie_x(lambda: Float) -> Float {
    1.056 * lobe(lambda, 599.8, 37.9, 31.0)
        + 0.362 * lobe(lambda, 442.0, 16.0, 26.7)
        - 0.065 * lobe(lambda, 501.1, 20.4, 26.2)
}

pub fn cie_y(lambda: Float) -> Float {
    0.821 * lobe(lambda, 568.8, 46.9, 40.5) + 0.286 * lobe(lambda, 530.9, 16.3, 31.1)
}

pub fn cie_z(lambda: Float) -> Float {
    1.217 * lobe(lambda, 437.0, 11.8, 36.0) + 0.681 * lobe(lambda, 459.0, 26.0, 13.8)
}

fn matching(lambda: &SampledWavelengths, cmf: fn(Float) -> Float) -> SampledSpectrum {
    SampledSpectrum::new_with(|i| cmf(lambda.lambda(i)))
}

/// Monte Carlo estimate of the XYZ tristimulus values of `l`, sampled at `lambda`.
pub fn to_xyz(l: SampledSpectrum, lambda: &SampledWavelengths) -> [Float; 3] {
    let pdf = lambda.pdf();
    let est = |cmf: fn(Float) -> Float| (matching(lambda, cmf) * l).safe_div(pdf).average() / CIE_Y_INTEGRAL;
    [est(cie_x), est(cie_y), est(cie_z)]
}

/// Luminance of `l`, the `Y` component of [`to_xyz`].
pub fn y(l: SampledSpectrum, lambda: &SampledWavelengths) -> Float {
    (matching(lambda, cie_y) * l).safe_div(lambda.pdf()).average() / CIE_Y_INTEGRAL
}

pub fn to_rgb(l: SampledSpectrum, lambda: &SampledWavelengths) -> [Float; 3] {
    xyz_to_rgb(to_xyz(l, lambda))
}

/// Linear sRGB primaries, D65 white.
#[allow(clippy::excessive_precision)]
pub fn xyz_to_rgb(xyz: [Float; 3]) -> [Float; 3] {
    let mut rgb = [0.0; 3];
    rgb[0] = 3.240479 * xyz[0] - 1.537150 * xyz[1] - 0.498535 * xyz[2];
    rgb[1] = -0.969256 * xyz[0] + 1.875991 * xyz[1] + 0.041556 * xyz[2];
    rgb[2] = 0.055648 * xyz[0] - 0.204043 * xyz[1] + 1.057311 * xyz[2];
    rgb
}

pub fn gamma_correct(v: Float) -> Float {
    if v <= 0.0031308 {
        12.92 * v
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

pub fn rgb_to_srgb8(rgb: [Float; 3]) -> [u8; 3] {
    let enc = |v: Float| (gamma_correct(v.clamp(0.0, 1.0)) * 255.0 + 0.5).clamp(0.0, 255.0) as u8;
    [enc(rgb[0]), enc(rgb[1]), enc(rgb[2])]
}
