use cgmath::{EuclideanSpace, InnerSpace, MetricSpace};

use crate::{ComponentWiseExt, Float, Point2f, Point3f, Vec3f};
use crate::geometry::{Bounds3f, DirectionCone, Frame, Normal3, Ray, spherical_direction};
use crate::interaction::{DiffGeom, ShapeSampleContext, SurfaceHit, SurfaceInteraction};
use crate::math::{gamma, safe_acos, safe_sqrt, sqr, PI};
use crate::sampling::sample_uniform_sphere;
use crate::shapes::{area_to_solid_angle, solid_angle_pdf_by_intersection, ShapeIntersection, ShapeKind, ShapeSample};

// sin^2 of 1.5 degrees, below which cone sampling switches to a Taylor expansion.
const SMALL_CONE_SIN2: Float = 0.00068523;

/// A full sphere with its center given in world space.
#[derive(Clone, Copy, Debug)]
pub struct Sphere {
    center: Point3f,
    radius: Float,
    reverse_orientation: bool,
}

impl Sphere {
    pub fn new(center: Point3f, radius: Float, reverse_orientation: bool) -> Self {
        Self { center, radius, reverse_orientation }
    }

    pub fn center(&self) -> Point3f {
        self.center
    }

    pub fn radius(&self) -> Float {
        self.radius
    }

    fn orient(&self, n: Vec3f) -> Normal3 {
        if self.reverse_orientation { Normal3(-n) } else { Normal3(n) }
    }

    fn error_bound(&self, p_obj: Vec3f) -> Vec3f {
        gamma(5) * p_obj.abs() + gamma(2) * self.center.to_vec().abs()
    }

    /// Parametrization of a point relative to the center, which must lie on the sphere.
    fn uv(&self, p_obj: Vec3f) -> Point2f {
        let mut phi = p_obj.y.atan2(p_obj.x);
        if phi < 0.0 {
            phi += 2.0 * PI;
        }
        let theta = safe_acos(p_obj.z / self.radius);
        Point2f::new(phi / (2.0 * PI), 1.0 - theta / PI)
    }

    /// Nearest root of the ray/sphere quadratic in `(0, t_max)`.
    fn basic_intersect(&self, ray: &Ray, t_max: Float) -> Option<(Float, Vec3f)> {
        let o = ray.origin - self.center;
        let d = ray.dir;
        let a = d.magnitude2();
        let b = 2.0 * d.dot(o);
        let c = o.magnitude2() - sqr(self.radius);

        // Discriminant from the distance between the center and the line, which keeps its
        // precision for rays that start far away.
        let v = o - (b / (2.0 * a)) * d;
        let len = v.magnitude();
        let discrim = 4.0 * a * (self.radius + len) * (self.radius - len);
        if discrim < 0.0 {
            return None;
        }
        let root = discrim.sqrt();
        let q = if b < 0.0 { -0.5 * (b - root) } else { -0.5 * (b + root) };
        let (mut t0, mut t1) = (q / a, c / q);
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        if t0 > t_max || t1 <= 0.0 {
            return None;
        }

        let mut t_hit = t0;
        if t_hit <= 0.0 {
            t_hit = t1;
            if t_hit > t_max {
                return None;
            }
        }

        let mut p_obj = o + t_hit * d;
        p_obj *= self.radius / p_obj.magnitude();
        if p_obj.x == 0.0 && p_obj.y == 0.0 {
            p_obj.x = 1e-5 * self.radius;
        }
        Some((t_hit, p_obj))
    }

    fn hit_at(&self, p_obj: Vec3f, time: Float) -> SurfaceHit {
        SurfaceHit::new(
            self.center + p_obj,
            self.error_bound(p_obj),
            time,
            self.orient(p_obj / self.radius),
            self.uv(p_obj),
        )
    }
}

impl ShapeKind for Sphere {
    fn bounds(&self) -> Bounds3f {
        let r = Vec3f::new(self.radius, self.radius, self.radius);
        Bounds3f::new(self.center - r, self.center + r)
    }

    fn normal_bounds(&self) -> DirectionCone {
        DirectionCone::entire_sphere()
    }

    fn intersect<'x>(&self, ray: &Ray, t_max: Float) -> Option<ShapeIntersection<'x>> {
        let (t_hit, p_obj) = self.basic_intersect(ray, t_max)?;
        let hit = self.hit_at(p_obj, ray.time);

        let z_radius = (p_obj.x * p_obj.x + p_obj.y * p_obj.y).sqrt();
        let cos_phi = p_obj.x / z_radius;
        let sin_phi = p_obj.y / z_radius;
        let sin_theta = safe_sqrt(1.0 - sqr(p_obj.z / self.radius));
        let dpdu = vec3f!(-2.0 * PI * p_obj.y, 2.0 * PI * p_obj.x, 0.0);
        let dpdv = -PI * vec3f!(p_obj.z * cos_phi, p_obj.z * sin_phi, -self.radius * sin_theta);
        // the unit normal is p / r, so its derivatives are the position derivatives scaled
        let geom = DiffGeom {
            dpdu,
            dpdv,
            dndu: self.orient(dpdu / self.radius),
            dndv: self.orient(dpdv / self.radius),
        };

        let intr = SurfaceInteraction::new(hit, -ray.dir.normalize(), geom);
        Some(ShapeIntersection { intr, t_hit })
    }

    fn intersect_p(&self, ray: &Ray, t_max: Float) -> bool {
        self.basic_intersect(ray, t_max).is_some()
    }

    fn area(&self) -> Float {
        4.0 * PI * sqr(self.radius)
    }

    fn sample(&self, u: Point2f) -> Option<ShapeSample> {
        let p_obj = self.radius * sample_uniform_sphere(u);
        Some(ShapeSample { hit: self.hit_at(p_obj, 0.0), pdf: 1.0 / self.area() })
    }

    fn sample_from(&self, ctx: &ShapeSampleContext, u: Point2f) -> Option<ShapeSample> {
        let p_origin = ctx.offset_ray_origin(self.center - ctx.p);
        if p_origin.distance2(self.center) <= sqr(self.radius) {
            // Inside the sphere every point is visible, sample by area
            let mut ss = self.sample(u)?;
            ss.hit.time = ctx.time;
            return area_to_solid_angle(ctx, ss);
        }

        // Sample the cone of directions subtended by the sphere
        let sin_theta_max = self.radius / ctx.p.distance(self.center);
        let sin2_theta_max = sqr(sin_theta_max);
        let cos_theta_max = safe_sqrt(1.0 - sin2_theta_max);
        let mut one_minus_cos_theta_max = 1.0 - cos_theta_max;

        let mut cos_theta = (cos_theta_max - 1.0) * u.x + 1.0;
        let mut sin2_theta = 1.0 - sqr(cos_theta);
        if sin2_theta_max < SMALL_CONE_SIN2 {
            sin2_theta = sin2_theta_max * u.x;
            cos_theta = (1.0 - sin2_theta).sqrt();
            one_minus_cos_theta_max = sin2_theta_max / 2.0;
        }

        // Angle from the sphere center to the sampled point
        let cos_alpha = sin2_theta / sin_theta_max
            + cos_theta * safe_sqrt(1.0 - sin2_theta / sqr(sin_theta_max));
        let sin_alpha = safe_sqrt(1.0 - sqr(cos_alpha));

        let phi = u.y * 2.0 * PI;
        let w = spherical_direction(sin_alpha, cos_alpha, phi);
        let frame = Frame::from_z((self.center - ctx.p).normalize());
        let p_obj = self.radius * frame.from_local(-w);

        let hit = self.hit_at(p_obj, ctx.time);
        Some(ShapeSample { hit, pdf: 1.0 / (2.0 * PI * one_minus_cos_theta_max) })
    }

    fn pdf_from(&self, ctx: &ShapeSampleContext, wi: Vec3f) -> Float {
        let p_origin = ctx.offset_ray_origin(self.center - ctx.p);
        if p_origin.distance2(self.center) <= sqr(self.radius) {
            return solid_angle_pdf_by_intersection(self, ctx, wi);
        }

        let sin2_theta_max = sqr(self.radius) / ctx.p.distance2(self.center);
        let cos_theta_max = safe_sqrt(1.0 - sin2_theta_max);
        let one_minus_cos_theta_max = if sin2_theta_max < SMALL_CONE_SIN2 {
            sin2_theta_max / 2.0
        } else {
            1.0 - cos_theta_max
        };
        1.0 / (2.0 * PI * one_minus_cos_theta_max)
    }
}
