use crate::{Float, Point2f, Vec2f, Vec3f};
use crate::math::{safe_sqrt, sqr, INV_2_PI, INV_4_PI, INV_PI, ONE_MINUS_EPSILON, PI, PI_OVER_2, PI_OVER_4};

pub fn sample_uniform_disk_concentric(u: Point2f) -> Point2f {
    // map sample from [0, 1] to [-1, 1]
    let u_offset = 2.0 * u - Vec2f::new(1.0, 1.0);
    if u_offset.x == 0.0 && u_offset.y == 0.0 {
        return Point2f::new(0.0, 0.0);
    }

    let (r, theta) = if u_offset.x.abs() > u_offset.y.abs() {
        (u_offset.x, PI_OVER_4 * (u_offset.y / u_offset.x))
    } else {
        (u_offset.y, PI_OVER_2 - PI_OVER_4 * (u_offset.x / u_offset.y))
    };

    Point2f::new(r * theta.cos(), r * theta.sin())
}

pub fn sample_uniform_disk_polar(u: Point2f) -> Point2f {
    let r = u.x.sqrt();
    let theta = 2.0 * PI * u.y;
    Point2f::new(r * theta.cos(), r * theta.sin())
}

pub fn sample_cosine_hemisphere(u: Point2f) -> Vec3f {
    let d = sample_uniform_disk_concentric(u);
    let z = safe_sqrt(1.0 - d.x * d.x - d.y * d.y);
    Vec3f::new(d.x, d.y, z)
}

#[inline]
pub fn cosine_hemisphere_pdf(cos_theta: Float) -> Float {
    cos_theta * INV_PI
}

pub fn sample_uniform_hemisphere(u: Point2f) -> Vec3f {
    let z = u.x;
    let r = safe_sqrt(1.0 - z * z);
    let phi = 2.0 * PI * u.y;
    Vec3f::new(r * phi.cos(), r * phi.sin(), z)
}

#[inline]
pub fn uniform_hemisphere_pdf() -> Float {
    INV_2_PI
}

pub fn sample_uniform_sphere(u: Point2f) -> Vec3f {
    let z = 1.0 - 2.0 * u.x;
    let r = safe_sqrt(1.0 - z * z);
    let phi = 2.0 * PI * u.y;
    Vec3f::new(r * phi.cos(), r * phi.sin(), z)
}

#[inline]
pub fn uniform_sphere_pdf() -> Float {
    INV_4_PI
}

pub fn sample_uniform_cone(u: Point2f, cos_theta_max: Float) -> Vec3f {
    let cos_theta = (1.0 - u.x) + u.x * cos_theta_max;
    let sin_theta = safe_sqrt(1.0 - cos_theta * cos_theta);
    let phi = u.y * 2.0 * PI;
    crate::spherical_direction(sin_theta, cos_theta, phi)
}

#[inline]
pub fn uniform_cone_pdf(cos_theta_max: Float) -> Float {
    1.0 / (2.0 * PI * (1.0 - cos_theta_max))
}

/// Barycentric coordinates uniformly distributed over a triangle.
pub fn sample_uniform_triangle(u: Point2f) -> [Float; 3] {
    let (b0, b1) = if u.x < u.y {
        let b0 = u.x / 2.0;
        (b0, u.y - b0)
    } else {
        let b1 = u.y / 2.0;
        (u.x - b1, b1)
    };
    [b0, b1, 1.0 - b0 - b1]
}

/// Samples the tent function of half-width `r` centred on zero.
pub fn sample_tent(u: Float, r: Float) -> Float {
    if u < 0.5 {
        let up = (u / 0.5).min(ONE_MINUS_EPSILON);
        -r + r * sample_linear_rising(up)
    } else {
        let up = ((u - 0.5) / 0.5).min(ONE_MINUS_EPSILON);
        r * (1.0 - sample_linear_rising(1.0 - up))
    }
}

/// Samples the density `2x` on [0, 1].
fn sample_linear_rising(u: Float) -> Float {
    u.sqrt()
}

pub fn tent_pdf(x: Float, r: Float) -> Float {
    if x.abs() >= r {
        0.0
    } else {
        (r - x.abs()) / sqr(r)
    }
}

#[inline]
pub fn power_heuristic(nf: u32, f_pdf: Float, ng: u32, g_pdf: Float) -> Float {
    let f = nf as Float * f_pdf;
    let g = ng as Float * g_pdf;
    if f.is_infinite() && f > 0.0 {
        return 1.0;
    }
    if f == 0.0 && g == 0.0 {
        return 0.0;
    }
    (f * f) / (f * f + g * g)
}

#[inline]
pub fn balance_heuristic(nf: u32, f_pdf: Float, ng: u32, g_pdf: Float) -> Float {
    let f = nf as Float * f_pdf;
    let g = ng as Float * g_pdf;
    if f == 0.0 && g == 0.0 {
        return 0.0;
    }
    f / (f + g)
}

const PRIMES: [u64; 8] = [2, 3, 5, 7, 11, 13, 17, 19];

/// Van der Corput radical inverse of `a` in the `base_index`-th prime base.
pub fn radical_inverse(base_index: usize, mut a: u64) -> Float {
    let base = PRIMES[base_index % PRIMES.len()];
    let inv_base = 1.0 / base as f64;
    let mut inv_base_m = 1.0f64;
    let mut reversed = 0u64;
    while a > 0 {
        let next = a / base;
        let digit = a - next * base;
        reversed = reversed * base + digit;
        inv_base_m *= inv_base;
        a = next;
    }
    ((reversed as f64 * inv_base_m) as Float).min(ONE_MINUS_EPSILON)
}

/// Piecewise-constant 1D distribution over [0, 1] with `func.len()` equal segments.
#[derive(Clone, Debug)]
pub struct Distribution1D {
    func: Vec<Float>,
    cdf: Vec<Float>,
    func_int: Float,
}

pub struct DiscreteSample {
    pub index: usize,
    pub pmf: Float,
    /// The sample rescaled to [0, 1) within the chosen segment.
    pub u_remapped: Float,
}

impl Distribution1D {
    /// Negative values are treated as zero. An all-zero function becomes uniform.
    pub fn new(func: &[Float]) -> Self {
        let func: Vec<Float> = func.iter().map(|f| f.abs()).collect();
        let n = func.len();
        let mut cdf = vec![0.0; n + 1];
        for i in 1..=n {
            cdf[i] = cdf[i - 1] + func[i - 1] / n as Float;
        }

        let func_int = cdf[n];
        if func_int == 0.0 {
            for (i, c) in cdf.iter_mut().enumerate().skip(1) {
                *c = i as Float / n as Float;
            }
        } else {
            for c in cdf.iter_mut().skip(1) {
                *c /= func_int;
            }
        }

        Self { func, cdf, func_int }
    }

    pub fn count(&self) -> usize {
        self.func.len()
    }

    pub fn integral(&self) -> Float {
        self.func_int
    }

    fn find_interval(&self, u: Float) -> usize {
        let first_above = self.cdf.partition_point(|&c| c <= u);
        first_above.saturating_sub(1).min(self.count() - 1)
    }

    pub fn sample_discrete(&self, u: Float) -> Option<DiscreteSample> {
        if self.func.is_empty() {
            return None;
        }
        let index = self.find_interval(u);
        let width = self.cdf[index + 1] - self.cdf[index];
        let u_remapped = if width > 0.0 { ((u - self.cdf[index]) / width).min(ONE_MINUS_EPSILON) } else { 0.0 };
        Some(DiscreteSample { index, pmf: self.discrete_pmf(index), u_remapped })
    }

    pub fn discrete_pmf(&self, index: usize) -> Float {
        if index >= self.count() {
            return 0.0;
        }
        self.cdf[index + 1] - self.cdf[index]
    }

    /// Returns the sampled point in [0, 1) and its density.
    pub fn sample_continuous(&self, u: Float) -> Option<(Float, Float)> {
        let sample = self.sample_discrete(u)?;
        let n = self.count() as Float;
        let x = (sample.index as Float + sample.u_remapped) / n;
        let pdf = if self.func_int > 0.0 { self.func[sample.index] / self.func_int } else { 1.0 };
        Some((x, pdf))
    }
}
