use crate::Float;
use crate::math::{lerp, sqr};

pub mod color;
pub mod distribution;

pub use color::*;
pub use distribution::*;

/// Number of wavelengths carried by each camera ray.
pub const NUM_SPECTRUM_SAMPLES: usize = 4;

pub const LAMBDA_MIN: Float = 360.0;
pub const LAMBDA_MAX: Float = 830.0;

#[derive(Clone, Copy)]
pub struct CoefficientSpectrum<const N: usize>([Float; N]);

/// Radiometric values at each of the wavelengths in a [`SampledWavelengths`].
pub type SampledSpectrum = CoefficientSpectrum<NUM_SPECTRUM_SAMPLES>;

impl<const N: usize> CoefficientSpectrum<N> {
    #[inline]
    pub fn new_with<F: FnMut(usize) -> Float>(init: F) -> Self {
        Self(std::array::from_fn(init))
    }

    #[inline]
    pub fn zip<F: Fn(Float, Float) -> Float>(&self, other: &Self, f: F) -> Self {
        Self::new_with(|i| f(self.0[i], other.0[i]))
    }

    pub fn uniform(val: Float) -> Self {
        Self([val; N])
    }

    pub fn zero() -> Self {
        Self::uniform(0.0)
    }

    pub fn one() -> Self {
        Self::uniform(1.0)
    }

    pub fn map<F: Fn(Float) -> Float>(&self, f: F) -> Self {
        Self::new_with(|i| f(self[i]))
    }

    pub fn is_black(&self) -> bool {
        self.0.iter().all(|&x| x == 0.0)
    }

    pub fn has_nans(&self) -> bool {
        self.0.iter().any(|&x| x.is_nan())
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|&x| x.is_finite())
    }

    pub fn lerp(t: Float, s1: Self, s2: Self) -> Self {
        s1.zip(&s2, |a, b| lerp(t, a, b))
    }

    pub fn sqrt(self) -> Self {
        self.map(Float::sqrt)
    }

    pub fn exp(self) -> Self {
        self.map(Float::exp)
    }

    pub fn clamp(self, low: Float, high: Float) -> Self {
        self.map(|x| x.clamp(low, high))
    }

    pub fn clamp_zero(self) -> Self {
        self.map(|x| x.max(0.0))
    }

    /// Component-wise division that yields zero wherever the divisor is zero.
    pub fn safe_div(self, rhs: Self) -> Self {
        self.zip(&rhs, |a, b| if b != 0.0 { a / b } else { 0.0 })
    }

    pub fn max_component_value(&self) -> Float {
        self.0.iter().cloned().fold(Float::NEG_INFINITY, Float::max)
    }

    pub fn min_component_value(&self) -> Float {
        self.0.iter().cloned().fold(Float::INFINITY, Float::min)
    }

    pub fn average(&self) -> Float {
        self.0.iter().sum::<Float>() / N as Float
    }

    pub fn values(&self) -> &[Float; N] {
        &self.0
    }
}

impl<const N: usize> std::ops::Index<usize> for CoefficientSpectrum<N> {
    type Output = Float;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<const N: usize> std::ops::IndexMut<usize> for CoefficientSpectrum<N> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<const N: usize> PartialEq for CoefficientSpectrum<N> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<const N: usize> Default for CoefficientSpectrum<N> {
    fn default() -> Self {
        Self::uniform(Float::default())
    }
}

impl<const N: usize> std::fmt::Debug for CoefficientSpectrum<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl<const N: usize> From<[Float; N]> for CoefficientSpectrum<N> {
    fn from(a: [Float; N]) -> Self {
        Self(a)
    }
}

impl<const N: usize> From<Float> for CoefficientSpectrum<N> {
    fn from(x: Float) -> Self {
        Self::uniform(x)
    }
}

impl<const N: usize> From<CoefficientSpectrum<N>> for [Float; N] {
    fn from(s: CoefficientSpectrum<N>) -> Self {
        s.0
    }
}

impl<const N: usize> std::iter::Sum for CoefficientSpectrum<N> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::uniform(0.0), std::ops::Add::add)
    }
}

impl<const N: usize> std::ops::Neg for CoefficientSpectrum<N> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.map(|x| -x)
    }
}

macro_rules! impl_op {
    ($op:ident, $name:ident, $sym:tt) => {
        impl<const N: usize> std::ops::$op for CoefficientSpectrum<N> {
            type Output = Self;

            fn $name(self, rhs: Self) -> Self::Output {
                Self::zip(&self, &rhs, |x, y| x $sym y)
            }
        }

        impl<const N: usize> std::ops::$op<Float> for CoefficientSpectrum<N> {
            type Output = Self;

            fn $name(self, rhs: Float) -> Self::Output {
                Self::new_with(|i| self[i] $sym rhs)
            }
        }

        impl<const N: usize> std::ops::$op<CoefficientSpectrum<N>> for Float {
            type Output = CoefficientSpectrum<N>;

            fn $name(self, rhs: CoefficientSpectrum<N>) -> Self::Output {
                CoefficientSpectrum::new_with(|i| self $sym rhs[i])
            }
        }
    }
}

macro_rules! impl_assign_op {
    ($op:ident, $name:ident, $sym:tt) => {
        impl<const N: usize> std::ops::$op for CoefficientSpectrum<N> {
            fn $name(&mut self, rhs: Self) {
                for i in 0..N {
                    self[i] $sym rhs[i];
                }
            }
        }

        impl<const N: usize> std::ops::$op<Float> for CoefficientSpectrum<N> {
            fn $name(&mut self, rhs: Float) {
                for i in 0..N {
                    self[i] $sym rhs;
                }
            }
        }
    }
}

impl_op!(Add, add, +);
impl_op!(Sub, sub, -);
impl_op!(Mul, mul, *);
impl_op!(Div, div, /);
impl_assign_op!(AddAssign, add_assign, +=);
impl_assign_op!(SubAssign, sub_assign, -=);
impl_assign_op!(MulAssign, mul_assign, *=);
impl_assign_op!(DivAssign, div_assign, /=);

/// The wavelengths (nm) carried by one camera ray, with the density each was sampled with.
///
/// Spectral quantities evaluated against the same `SampledWavelengths` are combined
/// component-wise. Once the secondary wavelengths are terminated only the first one carries
/// energy, which is how wavelength-dependent refraction keeps the estimate consistent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampledWavelengths {
    lambda: [Float; NUM_SPECTRUM_SAMPLES],
    pdf: [Float; NUM_SPECTRUM_SAMPLES],
}

impl SampledWavelengths {
    /// Stratified wavelengths uniformly distributed in `[lambda_min, lambda_max]`.
    pub fn sample_uniform(u: Float, lambda_min: Float, lambda_max: Float) -> Self {
        let mut lambda = [0.0; NUM_SPECTRUM_SAMPLES];
        lambda[0] = lerp(u, lambda_min, lambda_max);
        let delta = (lambda_max - lambda_min) / NUM_SPECTRUM_SAMPLES as Float;
        for i in 1..NUM_SPECTRUM_SAMPLES {
            lambda[i] = lambda[i - 1] + delta;
            if lambda[i] > lambda_max {
                lambda[i] = lambda_min + (lambda[i] - lambda_max);
            }
        }
        let pdf = [1.0 / (lambda_max - lambda_min); NUM_SPECTRUM_SAMPLES];
        Self { lambda, pdf }
    }

    /// Stratified wavelengths importance sampled towards the visible range.
    pub fn sample_visible(u: Float) -> Self {
        let mut lambda = [0.0; NUM_SPECTRUM_SAMPLES];
        let mut pdf = [0.0; NUM_SPECTRUM_SAMPLES];
        for i in 0..NUM_SPECTRUM_SAMPLES {
            let mut up = u + i as Float / NUM_SPECTRUM_SAMPLES as Float;
            if up > 1.0 {
                up -= 1.0;
            }
            lambda[i] = sample_visible_wavelength(up);
            pdf[i] = visible_wavelength_pdf(lambda[i]);
        }
        Self { lambda, pdf }
    }

    #[inline]
    pub fn lambda(&self, i: usize) -> Float {
        self.lambda[i]
    }

    pub fn pdf(&self) -> SampledSpectrum {
        SampledSpectrum::from(self.pdf)
    }

    pub fn terminate_secondary(&mut self) {
        if self.secondary_terminated() {
            return;
        }
        for i in 1..NUM_SPECTRUM_SAMPLES {
            self.pdf[i] = 0.0;
        }
        self.pdf[0] /= NUM_SPECTRUM_SAMPLES as Float;
    }

    pub fn secondary_terminated(&self) -> bool {
        self.pdf[1..].iter().all(|&p| p == 0.0)
    }
}

fn sample_visible_wavelength(u: Float) -> Float {
    // rounding at u = 1 lands just past the red end
    (538.0 - 138.888889 * (0.85691062 - 1.82750197 * u).atanh()).clamp(LAMBDA_MIN, LAMBDA_MAX)
}

fn visible_wavelength_pdf(lambda: Float) -> Float {
    if !(LAMBDA_MIN..=LAMBDA_MAX).contains(&lambda) {
        return 0.0;
    }
    0.0039398042 / sqr((0.0072 * (lambda - 538.0)).cosh())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_iter_sum() {
        let spectra = vec![SampledSpectrum::uniform(1.0), SampledSpectrum::from([0.0, 1.0, 0.5, 2.0])];
        let sum: SampledSpectrum = spectra.into_iter().sum();
        assert_eq!(sum, SampledSpectrum::from([1.0, 2.0, 1.5, 3.0]));
    }

    #[test]
    fn safe_div_zeroes_missing_terms() {
        let a = SampledSpectrum::from([1.0, 2.0, 3.0, 4.0]);
        let b = SampledSpectrum::from([2.0, 0.0, 1.0, 0.0]);
        assert_eq!(a.safe_div(b), SampledSpectrum::from([0.5, 0.0, 3.0, 0.0]));
        assert_eq!(a.max_component_value(), 4.0);
        assert_eq!(a.average(), 2.5);
    }

    #[test]
    fn uniform_wavelengths_are_stratified() {
        let lambda = SampledWavelengths::sample_uniform(0.9, LAMBDA_MIN, LAMBDA_MAX);
        for i in 0..NUM_SPECTRUM_SAMPLES {
            assert!(lambda.lambda(i) >= LAMBDA_MIN && lambda.lambda(i) <= LAMBDA_MAX);
        }
        assert_abs_diff_eq!(lambda.pdf()[0], 1.0 / (LAMBDA_MAX - LAMBDA_MIN));
    }

    #[test]
    fn unjittered_wavelengths_all_carry_weight() {
        // the third stratum starts exactly at u = 1
        let lambda = SampledWavelengths::sample_visible(0.5);
        assert_eq!(lambda.lambda(2), LAMBDA_MAX);
        assert!(lambda.pdf().values().iter().all(|&p| p > 0.0));
        assert!(sample_visible_wavelength(1.0) <= LAMBDA_MAX);
        assert!(sample_visible_wavelength(0.0) >= LAMBDA_MIN);
    }

    #[test]
    fn visible_wavelengths_stay_in_range() {
        for i in 0..64 {
            let lambda = SampledWavelengths::sample_visible(i as Float / 64.0);
            for j in 0..NUM_SPECTRUM_SAMPLES {
                assert!(lambda.lambda(j) >= LAMBDA_MIN && lambda.lambda(j) <= LAMBDA_MAX);
                assert!(lambda.pdf()[j] > 0.0);
            }
        }
    }

    #[test]
    fn visible_pdf_integrates_to_one() {
        let n = 4700;
        let dl = (LAMBDA_MAX - LAMBDA_MIN) / n as Float;
        let integral: Float = (0..n)
            .map(|i| visible_wavelength_pdf(LAMBDA_MIN + (i as Float + 0.5) * dl) * dl)
            .sum();
        assert_abs_diff_eq!(integral, 1.0, epsilon = 2e-3);
    }

    #[test]
    fn terminate_secondary_keeps_expected_value() {
        let mut lambda = SampledWavelengths::sample_uniform(0.3, LAMBDA_MIN, LAMBDA_MAX);
        let pdf0 = lambda.pdf()[0];
        assert!(!lambda.secondary_terminated());
        lambda.terminate_secondary();
        assert!(lambda.secondary_terminated());
        assert_abs_diff_eq!(lambda.pdf()[0], pdf0 / NUM_SPECTRUM_SAMPLES as Float);
        lambda.terminate_secondary();
        assert_abs_diff_eq!(lambda.pdf()[0], pdf0 / NUM_SPECTRUM_SAMPLES as Float);
    }
}
