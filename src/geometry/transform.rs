use cgmath::{InnerSpace, Matrix4, SquareMatrix, Transform as cgTransform};

use crate::{Bounds3f, ComponentWiseExt, Differential, Float, Normal3, Point3f, Ray, RayDifferential, Vec3f};
use crate::math::gamma;

/// A matrix together with its inverse. Matrices are column-major, `t[col][row]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub t: Matrix4<Float>,
    pub invt: Matrix4<Float>,
}

const IDENTITY_MAT4: Matrix4<Float> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 0.0,
    0.0, 0.0, 0.0, 1.0,
);

impl Transform {
    pub const IDENTITY: Self = Transform::new(IDENTITY_MAT4, IDENTITY_MAT4);

    pub const fn new(mat: Matrix4<Float>, mat_inv: Matrix4<Float>) -> Self {
        Self { t: mat, invt: mat_inv }
    }

    /// `None` if the matrix is singular.
    pub fn from_mat(mat: Matrix4<Float>) -> Option<Self> {
        let m_inv = mat.invert()?;
        Some(Self::new(mat, m_inv))
    }

    /// World-to-camera transform for a camera at `pos` looking at `look_at`.
    pub fn look_at(pos: Point3f, look_at: Point3f, up: Vec3f) -> Option<Self> {
        let dir = (look_at - pos).normalize();
        let right = up.normalize().cross(dir);
        if right.magnitude2() == 0.0 {
            return None;
        }
        let right = right.normalize();
        let new_up = dir.cross(right);

        let camera_to_world = Matrix4::from_cols(
            right.extend(0.0),
            new_up.extend(0.0),
            dir.extend(0.0),
            pos.to_homogeneous(),
        );
        let world_to_camera = camera_to_world.invert()?;
        Some(Self::new(world_to_camera, camera_to_world))
    }

    pub fn translate(delta: Vec3f) -> Self {
        let m = Matrix4::from_translation(delta);
        let m_inv = Matrix4::from_translation(-delta);
        Self::new(m, m_inv)
    }

    pub fn scale(sx: Float, sy: Float, sz: Float) -> Self {
        let m = Matrix4::from_nonuniform_scale(sx, sy, sz);
        let m_inv = Matrix4::from_nonuniform_scale(1.0 / sx, 1.0 / sy, 1.0 / sz);
        Self::new(m, m_inv)
    }

    /// Maps camera space to a screen space where z is normalized to [0, 1] between `near` and `far`.
    pub fn perspective(fov: Float, near: Float, far: Float) -> Option<Self> {
        let mat = Matrix4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, far / (far - near), 1.0,
            0.0, 0.0, -far * near / (far - near), 0.0,
        );

        let inv_tan_ang = 1.0 / (fov.to_radians() / 2.0).tan();
        if !inv_tan_ang.is_finite() {
            return None;
        }
        Some(Transform::scale(inv_tan_ang, inv_tan_ang, 1.0) * Self::from_mat(mat)?)
    }

    pub fn orthographic(near: Float, far: Float) -> Self {
        Self::scale(1.0, 1.0, 1.0 / (far - near)) * Self::translate(Vec3f::new(0.0, 0.0, -near))
    }

    pub fn inverse(&self) -> Self {
        Self::new(self.invt, self.t)
    }

    pub fn is_identity(&self) -> bool {
        self.t == IDENTITY_MAT4
    }

    /// `self` followed by `next`.
    pub fn then(self, next: Self) -> Self {
        next * self
    }

    pub fn transform_normal(&self, n: &Normal3) -> Normal3 {
        // transform by the transpose of the inverse
        let x = self.invt[0][0] * n.x + self.invt[0][1] * n.y + self.invt[0][2] * n.z;
        let y = self.invt[1][0] * n.x + self.invt[1][1] * n.y + self.invt[1][2] * n.z;
        let z = self.invt[2][0] * n.x + self.invt[2][1] * n.y + self.invt[2][2] * n.z;
        Normal3(vec3f!(x, y, z))
    }

    pub fn transform<T: Transformable>(&self, obj: T) -> T {
        obj.transform(*self)
    }

    pub fn tf_exact_to_err<T: TransformableErr>(&self, obj: T) -> (T, T::Err) {
        obj.tf_exact_to_err(*self)
    }
}

impl std::ops::Mul for Transform {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::new(self.t * rhs.t, rhs.invt * self.invt)
    }
}

pub trait Transformable: Sized {
    fn transform(&self, t: Transform) -> Self;
}

pub trait TransformableErr: Transformable {
    type Err;

    /// Transforms an exact value, returning the result and a bound on its absolute error.
    fn tf_exact_to_err(&self, t: Transform) -> (Self, Self::Err);
}

impl Transformable for Vec3f {
    fn transform(&self, t: Transform) -> Self {
        t.t.transform_vector(*self)
    }
}

impl Transformable for Point3f {
    fn transform(&self, t: Transform) -> Self {
        t.t.transform_point(*self)
    }
}

impl TransformableErr for Point3f {
    type Err = Vec3f;

    fn tf_exact_to_err(&self, tf: Transform) -> (Self, Self::Err) {
        let pt = tf.t.transform_point(*self);
        let m = tf.t;
        let (x, y, z) = (self.x, self.y, self.z);

        let x_abs_sum = (m[0][0] * x).abs() + (m[1][0] * y).abs() + (m[2][0] * z).abs() + m[3][0].abs();
        let y_abs_sum = (m[0][1] * x).abs() + (m[1][1] * y).abs() + (m[2][1] * z).abs() + m[3][1].abs();
        let z_abs_sum = (m[0][2] * x).abs() + (m[1][2] * y).abs() + (m[2][2] * z).abs() + m[3][2].abs();

        let p_error = vec3f!(x_abs_sum, y_abs_sum, z_abs_sum) * gamma(3);
        (pt, p_error)
    }
}

impl Transformable for Normal3 {
    fn transform(&self, t: Transform) -> Self {
        t.transform_normal(self)
    }
}

impl Transformable for Bounds3f {
    fn transform(&self, t: Transform) -> Self {
        self.corners().iter().fold(Bounds3f::empty(), |b, p| b.union_point(t.transform(*p)))
    }
}

impl Transformable for Ray {
    fn transform(&self, t: Transform) -> Ray {
        let (mut origin, o_err) = self.origin.tf_exact_to_err(t);
        let dir: Vec3f = self.dir.transform(t);

        // Offset ray origin to the edge of its error bounds
        let len_sq = dir.magnitude2();
        if len_sq > 0.0 {
            let dt = dir.abs().dot(o_err) / len_sq;
            origin += dir * dt;
        }

        Ray { origin, dir, time: self.time }
    }
}

impl Transformable for RayDifferential {
    fn transform(&self, t: Transform) -> Self {
        RayDifferential {
            ray: self.ray.transform(t),
            diff: self.diff.map(|diff| Differential {
                rx_origin: diff.rx_origin.transform(t),
                ry_origin: diff.ry_origin.transform(t),
                rx_dir: diff.rx_dir.transform(t),
                ry_dir: diff.ry_dir.transform(t),
            }),
        }
    }
}
