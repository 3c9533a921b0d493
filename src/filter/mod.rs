use serde::{Deserialize, Serialize};

use crate::{Float, Point2f, Vec2f};
use crate::math::{gaussian, gaussian_integral, lerp};
use crate::sampling::{sample_tent, Distribution1D};

/// An offset from the pixel center and the weight of the sample taken there.
#[derive(Clone, Copy, Debug)]
pub struct FilterSample {
    pub p: Point2f,
    pub weight: Float,
}

pub trait FilterKind {
    fn radius(&self) -> Vec2f;

    fn evaluate(&self, p: Point2f) -> Float;

    fn integral(&self) -> Float;

    fn sample(&self, u: Point2f) -> FilterSample;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Box,
    Triangle,
    Gaussian,
}

tagged_handle! {
    #[derive(Clone, Debug)]
    pub enum Filter {
        Box(BoxFilter),
        Triangle(TriangleFilter),
        Gaussian(GaussianFilter),
    }
}

impl Filter {
    pub fn create(ty: FilterType, radius: Vec2f) -> Self {
        match ty {
            FilterType::Box => BoxFilter::new(radius).into(),
            FilterType::Triangle => TriangleFilter::new(radius).into(),
            FilterType::Gaussian => GaussianFilter::new(radius, 0.5).into(),
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        BoxFilter::new(Vec2f::new(0.5, 0.5)).into()
    }
}

impl FilterKind for Filter {
    fn radius(&self) -> Vec2f {
        each_kind!(self, Box, Triangle, Gaussian => |f| f.radius())
    }

    fn evaluate(&self, p: Point2f) -> Float {
        each_kind!(self, Box, Triangle, Gaussian => |f| f.evaluate(p))
    }

    fn integral(&self) -> Float {
        each_kind!(self, Box, Triangle, Gaussian => |f| f.integral())
    }

    fn sample(&self, u: Point2f) -> FilterSample {
        each_kind!(self, Box, Triangle, Gaussian => |f| f.sample(u))
    }
}

#[derive(Clone, Debug)]
pub struct BoxFilter {
    radius: Vec2f,
}

impl BoxFilter {
    pub fn new(radius: Vec2f) -> Self {
        Self { radius }
    }
}

impl FilterKind for BoxFilter {
    fn radius(&self) -> Vec2f {
        self.radius
    }

    fn evaluate(&self, p: Point2f) -> Float {
        if p.x.abs() <= self.radius.x && p.y.abs() <= self.radius.y { 1.0 } else { 0.0 }
    }

    fn integral(&self) -> Float {
        4.0 * self.radius.x * self.radius.y
    }

    fn sample(&self, u: Point2f) -> FilterSample {
        let p = Point2f::new(lerp(u.x, -self.radius.x, self.radius.x), lerp(u.y, -self.radius.y, self.radius.y));
        FilterSample { p, weight: 1.0 }
    }
}

#[derive(Clone, Debug)]
pub struct TriangleFilter {
    radius: Vec2f,
}

impl TriangleFilter {
    pub fn new(radius: Vec2f) -> Self {
        Self { radius }
    }
}

impl FilterKind for TriangleFilter {
    fn radius(&self) -> Vec2f {
        self.radius
    }

    fn evaluate(&self, p: Point2f) -> Float {
        Float::max(0.0, self.radius.x - p.x.abs()) * Float::max(0.0, self.radius.y - p.y.abs())
    }

    fn integral(&self) -> Float {
        self.radius.x * self.radius.x * self.radius.y * self.radius.y
    }

    fn sample(&self, u: Point2f) -> FilterSample {
        let p = Point2f::new(sample_tent(u.x, self.radius.x), sample_tent(u.y, self.radius.y));
        FilterSample { p, weight: 1.0 }
    }
}

/// Gaussian falloff shifted down to reach zero at the radius. Sampled from a tabulation of
/// each axis, so weights are close to but not exactly constant.
#[derive(Clone, Debug)]
pub struct GaussianFilter {
    radius: Vec2f,
    sigma: Float,
    exp_x: Float,
    exp_y: Float,
    distrib_x: Distribution1D,
    distrib_y: Distribution1D,
}

impl GaussianFilter {
    const TABLE_DENSITY: Float = 32.0;

    pub fn new(radius: Vec2f, sigma: Float) -> Self {
        let exp_x = gaussian(radius.x, 0.0, sigma);
        let exp_y = gaussian(radius.y, 0.0, sigma);
        let table = |r: Float, e: Float| {
            let n = ((Self::TABLE_DENSITY * r) as usize).max(4);
            let values: Vec<Float> = (0..n)
                .map(|i| {
                    let x = lerp((i as Float + 0.5) / n as Float, -r, r);
                    Float::max(0.0, gaussian(x, 0.0, sigma) - e)
                })
                .collect();
            Distribution1D::new(&values)
        };
        Self {
            radius,
            sigma,
            exp_x,
            exp_y,
            distrib_x: table(radius.x, exp_x),
            distrib_y: table(radius.y, exp_y),
        }
    }

    pub fn sigma(&self) -> Float {
        self.sigma
    }

    fn sample_axis(distrib: &Distribution1D, u: Float, r: Float) -> (Float, Float) {
        match distrib.sample_continuous(u) {
            // the density over [-r, r] is the density over [0, 1] divided by the width
            Some((x, pdf)) => (lerp(x, -r, r), pdf / (2.0 * r)),
            None => (0.0, 0.0),
        }
    }
}

impl FilterKind for GaussianFilter {
    fn radius(&self) -> Vec2f {
        self.radius
    }

    fn evaluate(&self, p: Point2f) -> Float {
        Float::max(0.0, gaussian(p.x, 0.0, self.sigma) - self.exp_x)
            * Float::max(0.0, gaussian(p.y, 0.0, self.sigma) - self.exp_y)
    }

    fn integral(&self) -> Float {
        let ix = gaussian_integral(-self.radius.x, self.radius.x, 0.0, self.sigma) - 2.0 * self.radius.x * self.exp_x;
        let iy = gaussian_integral(-self.radius.y, self.radius.y, 0.0, self.sigma) - 2.0 * self.radius.y * self.exp_y;
        ix * iy
    }

    fn sample(&self, u: Point2f) -> FilterSample {
        let (x, pdf_x) = Self::sample_axis(&self.distrib_x, u.x, self.radius.x);
        let (y, pdf_y) = Self::sample_axis(&self.distrib_y, u.y, self.radius.y);
        let p = Point2f::new(x, y);
        let pdf = pdf_x * pdf_y;
        let weight = if pdf > 0.0 { self.evaluate(p) / pdf } else { 0.0 };
        FilterSample { p, weight }
    }
}
