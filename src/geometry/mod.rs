use std::ops::{Add, Deref, Mul, Neg, Sub};

use cgmath::prelude::*;

use crate::{Float, Point3f, Vec3f};
use crate::math::{next_float_down, next_float_up, safe_sqrt, PI};

pub mod bounds;
pub mod transform;

pub use self::bounds::{Bounds2, Bounds2f, Bounds2i, Bounds3f};
pub use self::transform::{Transform, Transformable, TransformableErr};

/// Fraction of a shadow segment left unchecked at its far end.
pub const SHADOW_EPSILON: Float = 0.0001;

#[inline]
pub fn abs_dot(v1: Vec3f, v2: Vec3f) -> Float {
    v1.dot(v2).abs()
}

pub trait ComponentWiseExt {
    fn abs(self) -> Self;
    fn max_component(self) -> Float;
    fn max_dimension(self) -> usize;
    fn permute(self, x: usize, y: usize, z: usize) -> Self;
}

impl ComponentWiseExt for Vec3f {
    fn abs(self) -> Self {
        self.map(Float::abs)
    }

    fn max_component(self) -> Float {
        self.x.max(self.y.max(self.z))
    }

    fn max_dimension(self) -> usize {
        if self.x > self.y {
            if self.x > self.z { 0 } else { 2 }
        } else if self.y > self.z {
            1
        } else {
            2
        }
    }

    fn permute(self, x: usize, y: usize, z: usize) -> Self {
        Vec3f::new(self[x], self[y], self[z])
    }
}

/// Builds two vectors that complete an orthonormal basis with the unit vector `v1`.
pub fn coordinate_system(v1: Vec3f) -> (Vec3f, Vec3f) {
    let sign = 1.0f32.copysign(v1.z);
    let a = -1.0 / (sign + v1.z);
    let b = v1.x * v1.y * a;
    let v2 = Vec3f::new(1.0 + sign * v1.x * v1.x * a, sign * b, -sign * v1.x);
    let v3 = Vec3f::new(b, sign + v1.y * v1.y * a, -v1.y);
    (v2, v3)
}

pub fn spherical_direction(sin_theta: Float, cos_theta: Float, phi: Float) -> Vec3f {
    let sin_theta = sin_theta.clamp(-1.0, 1.0);
    Vec3f::new(
        sin_theta * phi.cos(),
        sin_theta * phi.sin(),
        cos_theta.clamp(-1.0, 1.0),
    )
}

/// Moves `p` off a surface along `n` by its error bound, to the side `w` points to, so a ray
/// leaving from the result cannot re-intersect the surface it started on.
pub fn offset_ray_origin(p: Point3f, p_err: Vec3f, n: Normal3, w: Vec3f) -> Point3f {
    let d = n.0.abs().dot(p_err);
    let mut offset = d * n.0;
    if w.dot(n.0) < 0.0 {
        offset = -offset;
    }
    let mut po: Point3f = p + offset;
    for i in 0..3 {
        if offset[i] > 0.0 {
            po[i] = next_float_up(po[i])
        } else if offset[i] < 0.0 {
            po[i] = next_float_down(po[i])
        }
    }

    po
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Normal3(pub Vec3f);

impl Normal3 {
    pub fn new(x: Float, y: Float, z: Float) -> Self {
        Self(Vec3f::new(x, y, z))
    }

    pub fn zero() -> Self {
        Self(Vec3f::zero())
    }

    pub fn normalize(self) -> Self {
        Self(self.0.normalize())
    }

    /// Flips the normal into the hemisphere of `v`.
    pub fn faceforward(self, v: Vec3f) -> Self {
        if self.0.dot(v) < 0.0 {
            Self(-self.0)
        } else {
            self
        }
    }
}

impl Default for Normal3 {
    fn default() -> Self {
        Self::zero()
    }
}

impl Deref for Normal3 {
    type Target = Vec3f;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec3f> for Normal3 {
    fn from(v: Vec3f) -> Self {
        Self(v)
    }
}

impl From<Normal3> for Vec3f {
    fn from(n: Normal3) -> Self {
        n.0
    }
}

impl Neg for Normal3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Add for Normal3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Normal3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Float> for Normal3 {
    type Output = Self;

    fn mul(self, rhs: Float) -> Self {
        Self(self.0 * rhs)
    }
}

impl Mul<Normal3> for Float {
    type Output = Normal3;

    fn mul(self, rhs: Normal3) -> Normal3 {
        Normal3(self * rhs.0)
    }
}

/// Orthonormal basis used to move directions in and out of a local shading space.
#[derive(Copy, Clone, Debug)]
pub struct Frame {
    pub x: Vec3f,
    pub y: Vec3f,
    pub z: Vec3f,
}

impl Frame {
    pub fn from_xz(x: Vec3f, z: Vec3f) -> Self {
        Self { x, y: z.cross(x), z }
    }

    pub fn from_z(z: Vec3f) -> Self {
        let (x, y) = coordinate_system(z);
        Self { x, y, z }
    }

    pub fn to_local(&self, v: Vec3f) -> Vec3f {
        Vec3f::new(v.dot(self.x), v.dot(self.y), v.dot(self.z))
    }

    pub fn from_local(&self, v: Vec3f) -> Vec3f {
        self.x * v.x + self.y * v.y + self.z * v.z
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Ray {
    pub origin: Point3f,
    pub dir: Vec3f,
    pub time: Float,
}

impl Ray {
    pub fn new(origin: Point3f, dir: Vec3f) -> Self {
        Self { origin, dir, time: 0.0 }
    }

    pub fn at(&self, t: Float) -> Point3f {
        self.origin + (self.dir * t)
    }
}

/// Offset rays one pixel over in x and y, used to estimate the footprint of a camera ray.
#[derive(Copy, Clone, Debug)]
pub struct Differential {
    pub rx_origin: Point3f,
    pub rx_dir: Vec3f,
    pub ry_origin: Point3f,
    pub ry_dir: Vec3f,
}

#[derive(Copy, Clone, Debug)]
pub struct RayDifferential {
    pub ray: Ray,
    pub diff: Option<Differential>,
}

impl RayDifferential {
    pub fn new(ray: Ray, diff: Option<Differential>) -> Self {
        Self { ray, diff }
    }

    pub fn scale_differentials(&mut self, s: Float) {
        let ray = &self.ray;
        if let Some(diff) = &mut self.diff {
            diff.rx_origin = ray.origin + (diff.rx_origin - ray.origin) * s;
            diff.ry_origin = ray.origin + (diff.ry_origin - ray.origin) * s;
            diff.rx_dir = ray.dir + (diff.rx_dir - ray.dir) * s;
            diff.ry_dir = ray.dir + (diff.ry_dir - ray.dir) * s;
        }
    }
}

impl From<Ray> for RayDifferential {
    fn from(ray: Ray) -> Self {
        Self { ray, diff: None }
    }
}

/// Cone of directions around `w`, containing every direction within `acos(cos_theta)` of it.
#[derive(Copy, Clone, Debug)]
pub struct DirectionCone {
    pub w: Vec3f,
    pub cos_theta: Float,
}

impl DirectionCone {
    pub fn new(w: Vec3f, cos_theta: Float) -> Self {
        Self { w: w.normalize(), cos_theta }
    }

    pub fn from_direction(w: Vec3f) -> Self {
        Self::new(w, 1.0)
    }

    pub fn entire_sphere() -> Self {
        Self { w: Vec3f::unit_z(), cos_theta: -1.0 }
    }

    /// Bounds the directions from `p` towards any point inside `b`.
    pub fn bound_subtended_directions(b: &Bounds3f, p: Point3f) -> Self {
        let (center, radius) = b.bounding_sphere();
        let dist2 = center.distance2(p);
        if dist2 < radius * radius {
            return Self::entire_sphere();
        }
        let sin2_theta_max = radius * radius / dist2;
        let cos_theta_max = safe_sqrt(1.0 - sin2_theta_max);
        Self::new(center - p, cos_theta_max)
    }

    pub fn angle(&self) -> Float {
        if self.cos_theta <= -1.0 { PI } else { self.cos_theta.acos() }
    }
}
