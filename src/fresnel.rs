use crate::Float;
use crate::math::{safe_sqrt, sqr};
use crate::spectrum::SampledSpectrum;

/// Unpolarized Fresnel reflectance at a dielectric interface with relative index `eta`.
/// A negative `cos_theta_i` means the incident direction is on the inside.
pub fn fr_dielectric(cos_theta_i: Float, mut eta: Float) -> Float {
    let mut cos_theta_i = cos_theta_i.clamp(-1.0, 1.0);
    if cos_theta_i < 0.0 {
        eta = 1.0 / eta;
        cos_theta_i = -cos_theta_i;
    }

    // compute cos_theta_t using snell's law
    let sin2_theta_i = 1.0 - sqr(cos_theta_i);
    let sin2_theta_t = sin2_theta_i / sqr(eta);
    if sin2_theta_t >= 1.0 {
        return 1.0; // total internal reflection
    }
    let cos_theta_t = safe_sqrt(1.0 - sin2_theta_t);

    let r_parl = (eta * cos_theta_i - cos_theta_t) / (eta * cos_theta_i + cos_theta_t);
    let r_perp = (cos_theta_i - eta * cos_theta_t) / (cos_theta_i + eta * cos_theta_t);
    (sqr(r_parl) + sqr(r_perp)) / 2.0
}

/// Fresnel reflectance of a conductor with complex index `eta + i k`, seen from outside.
#[allow(non_snake_case)]
pub fn fr_conductor(cos_theta_i: Float, eta: SampledSpectrum, k: SampledSpectrum) -> SampledSpectrum {
    let cos_theta_i = cos_theta_i.clamp(0.0, 1.0);

    let cos_theta_i2 = cos_theta_i * cos_theta_i;
    let sin_theta_i2 = 1.0 - cos_theta_i2;
    let eta2 = eta * eta;
    let eta_k2 = k * k;

    let t0 = eta2 - eta_k2 - sin_theta_i2;
    let a2plusb2 = (t0 * t0 + 4.0 * eta2 * eta_k2).clamp_zero().sqrt();
    let t1 = a2plusb2 + cos_theta_i2;
    let a = (0.5 * (a2plusb2 + t0)).clamp_zero().sqrt();
    let t2 = 2.0 * cos_theta_i * a;
    let Rs = (t1 - t2).safe_div(t1 + t2);

    let t3 = cos_theta_i2 * a2plusb2 + sin_theta_i2 * sin_theta_i2;
    let t4 = t2 * sin_theta_i2;
    let Rp = Rs * (t3 - t4).safe_div(t3 + t4);

    0.5 * (Rp + Rs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn dielectric_normal_incidence() {
        // ((eta - 1) / (eta + 1))^2
        assert_abs_diff_eq!(fr_dielectric(1.0, 1.5), 0.04, epsilon = 1e-6);
        assert_abs_diff_eq!(fr_dielectric(-1.0, 1.5), 0.04, epsilon = 1e-6);
        assert_abs_diff_eq!(fr_dielectric(0.0, 1.5), 1.0, epsilon = 1e-6);
        assert_eq!(fr_dielectric(0.7, 1.0), 0.0);
    }

    #[test]
    fn total_internal_reflection() {
        // critical angle for eta 1.5 from inside is asin(1 / 1.5), about 41.8 degrees
        let cos_60 = (60.0 as Float).to_radians().cos();
        assert_eq!(fr_dielectric(-cos_60, 1.5), 1.0);
    }

    #[test]
    fn conductor_normal_incidence() {
        let eta = SampledSpectrum::uniform(0.2);
        let k = SampledSpectrum::uniform(3.0);
        let expected = (sqr(0.2 - 1.0) + 9.0) / (sqr(0.2 + 1.0) + 9.0);
        let r = fr_conductor(1.0, eta, k);
        assert_abs_diff_eq!(r[0], expected, epsilon = 1e-5);

        // without absorption it matches the dielectric
        let r = fr_conductor(0.6, SampledSpectrum::uniform(1.5), SampledSpectrum::zero());
        assert_abs_diff_eq!(r[2], fr_dielectric(0.6, 1.5), epsilon = 1e-5);
    }
}
