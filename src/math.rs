use crate::Float;

pub const INFINITY: Float = std::f32::INFINITY;
pub const NEG_INFINITY: Float = std::f32::NEG_INFINITY;

pub const PI: Float = std::f32::consts::PI;
pub const INV_PI: Float = std::f32::consts::FRAC_1_PI;
pub const INV_2_PI: Float = 0.5 * std::f32::consts::FRAC_1_PI;
pub const INV_4_PI: Float = 0.25 * std::f32::consts::FRAC_1_PI;
pub const PI_OVER_2: Float = std::f32::consts::FRAC_PI_2;
pub const PI_OVER_4: Float = std::f32::consts::FRAC_PI_4;

pub const MACHINE_EPSILON: Float = std::f32::EPSILON * 0.5;

/// Largest float strictly less than one.
pub const ONE_MINUS_EPSILON: Float = 1.0 - std::f32::EPSILON / 2.0;

/// Bound on the relative error of `n` consecutive floating point operations.
#[inline]
pub fn gamma(n: i32) -> Float {
    (n as Float * MACHINE_EPSILON) / (1.0 - n as Float * MACHINE_EPSILON)
}

pub fn next_float_up(v: Float) -> Float {
    if v.is_infinite() && v > 0.0 {
        return v;
    }
    // skip -0.0 so the step is taken from +0.0
    let v = if v == -0.0 { 0.0 } else { v };
    let bits = v.to_bits();
    let bits = if v >= 0.0 { bits + 1 } else { bits - 1 };
    Float::from_bits(bits)
}

pub fn next_float_down(v: Float) -> Float {
    if v.is_infinite() && v < 0.0 {
        return v;
    }
    let v = if v == 0.0 { -0.0 } else { v };
    let bits = v.to_bits();
    let bits = if v > 0.0 { bits - 1 } else { bits + 1 };
    Float::from_bits(bits)
}

#[inline]
pub fn lerp(t: Float, v1: Float, v2: Float) -> Float {
    (1.0 - t) * v1 + t * v2
}

#[inline]
pub fn sqr(x: Float) -> Float {
    x * x
}

#[inline]
pub fn safe_sqrt(x: Float) -> Float {
    Float::sqrt(Float::max(0.0, x))
}

#[inline]
pub fn safe_asin(x: Float) -> Float {
    x.clamp(-1.0, 1.0).asin()
}

#[inline]
pub fn safe_acos(x: Float) -> Float {
    x.clamp(-1.0, 1.0).acos()
}

/// Computes `a * b - c * d` without the catastrophic cancellation of the direct form.
#[inline]
pub fn difference_of_products(a: Float, b: Float, c: Float, d: Float) -> Float {
    let cd = c * d;
    let err = (-c).mul_add(d, cd);
    let dop = a.mul_add(b, -cd);
    dop + err
}

/// Error function, Abramowitz & Stegun 7.1.26 (max abs error 1.5e-7).
#[allow(clippy::excessive_precision)]
pub fn erf(x: Float) -> Float {
    let (a1, a2, a3, a4, a5) = (0.254829592, -0.284496736, 1.421413741, -1.453152027, 1.061405429);
    let p = 0.3275911;
    let sign = x.signum();
    let x = x.abs();
    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();
    sign * y
}

pub fn gaussian(x: Float, mu: Float, sigma: Float) -> Float {
    1.0 / (2.0 * PI * sigma * sigma).sqrt() * (-sqr(x - mu) / (2.0 * sigma * sigma)).exp()
}

pub fn gaussian_integral(x0: Float, x1: Float, mu: Float, sigma: Float) -> Float {
    let sigma_root2 = sigma * std::f32::consts::SQRT_2;
    0.5 * (erf((mu - x0) / sigma_root2) - erf((mu - x1) / sigma_root2))
}

/// 64-bit finalizer, used to decorrelate hashed seeds.
#[inline]
pub fn mix_bits(mut v: u64) -> u64 {
    v ^= v >> 31;
    v = v.wrapping_mul(0x7fb5d329728ea185);
    v ^= v >> 27;
    v = v.wrapping_mul(0x81dadef4bc2dd44d);
    v ^= v >> 33;
    v
}

/// Order-dependent hash of a handful of integers.
pub fn hash_values(values: &[u64]) -> u64 {
    values
        .iter()
        .fold(0x9e3779b97f4a7c15u64, |h, &v| mix_bits(h ^ mix_bits(v.wrapping_add(0x632be59bd9b4e019))))
}

/// Element `i` of a pseudo-random permutation of `0..l` selected by `p`.
pub fn permutation_element(mut i: u32, l: u32, p: u32) -> u32 {
    assert!(l > 0, "permutation of an empty range");
    let mut w = l - 1;
    w |= w >> 1;
    w |= w >> 2;
    w |= w >> 4;
    w |= w >> 8;
    w |= w >> 16;
    loop {
        i ^= p;
        i = i.wrapping_mul(0xe170893d);
        i ^= p >> 16;
        i ^= (i & w) >> 4;
        i ^= p >> 8;
        i = i.wrapping_mul(0x0929eb3f);
        i ^= p >> 23;
        i ^= (i & w) >> 1;
        i = i.wrapping_mul(1 | p >> 27);
        i = i.wrapping_mul(0x6935fa69);
        i ^= (i & w) >> 11;
        i = i.wrapping_mul(0x74dcb303);
        i ^= (i & w) >> 2;
        i = i.wrapping_mul(0x9e501cc3);
        i ^= (i & w) >> 2;
        i = i.wrapping_mul(0xc860a3df);
        i &= w;
        i ^= i >> 5;
        if i < l {
            break;
        }
    }
    (i.wrapping_add(p)) % l
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn next_float_brackets_value() {
        for &v in &[0.0, -0.0, 1.0, -1.0, 1e-30, 12345.678] {
            assert!(next_float_up(v) > v);
            assert!(next_float_down(v) < v);
        }
        assert_eq!(next_float_up(INFINITY), INFINITY);
    }

    #[test]
    fn erf_matches_known_values() {
        assert_abs_diff_eq!(erf(0.0), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(erf(0.5), 0.5204999, epsilon = 1e-6);
        assert_abs_diff_eq!(erf(-1.0), -0.8427008, epsilon = 1e-6);
        assert_abs_diff_eq!(erf(3.0), 0.9999779, epsilon = 1e-6);
    }

    #[test]
    fn gaussian_integral_of_whole_line_is_one() {
        assert_abs_diff_eq!(gaussian_integral(-20.0, 20.0, 0.0, 1.5), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn permutation_is_a_bijection() {
        for &l in &[1u32, 2, 7, 16, 33] {
            let mut seen = vec![false; l as usize];
            for i in 0..l {
                let e = permutation_element(i, l, 0xdeadbeef);
                assert!(!seen[e as usize], "duplicate element {} for l = {}", e, l);
                seen[e as usize] = true;
            }
        }
    }

    #[test]
    fn hash_depends_on_order() {
        assert_ne!(hash_values(&[1, 2, 3]), hash_values(&[3, 2, 1]));
        assert_eq!(hash_values(&[4, 5]), hash_values(&[4, 5]));
    }
}
