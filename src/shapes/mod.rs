use cgmath::InnerSpace;

use crate::{Float, Point2f, Vec3f};
use crate::geometry::{Bounds3f, DirectionCone, Ray};
use crate::interaction::{ShapeSampleContext, SurfaceHit, SurfaceInteraction};

pub mod sphere;
pub mod triangle;

pub use sphere::Sphere;
pub use triangle::{Triangle, TriangleMesh};

pub struct ShapeIntersection<'a> {
    pub intr: SurfaceInteraction<'a>,
    pub t_hit: Float,
}

/// A point sampled on a shape. `pdf` is with respect to area for [`ShapeKind::sample`] and
/// with respect to solid angle for [`ShapeKind::sample_from`].
#[derive(Clone, Copy, Debug)]
pub struct ShapeSample {
    pub hit: SurfaceHit,
    pub pdf: Float,
}

pub trait ShapeKind {
    fn bounds(&self) -> Bounds3f;

    fn normal_bounds(&self) -> DirectionCone;

    /// Nearest hit with `0 < t < t_max`.
    fn intersect<'x>(&self, ray: &Ray, t_max: Float) -> Option<ShapeIntersection<'x>>;

    fn intersect_p(&self, ray: &Ray, t_max: Float) -> bool;

    fn area(&self) -> Float;

    fn sample(&self, u: Point2f) -> Option<ShapeSample>;

    fn pdf(&self, _hit: &SurfaceHit) -> Float {
        1.0 / self.area()
    }

    fn sample_from(&self, ctx: &ShapeSampleContext, u: Point2f) -> Option<ShapeSample>;

    fn pdf_from(&self, ctx: &ShapeSampleContext, wi: Vec3f) -> Float;
}

tagged_handle! {
    pub enum Shape<'a>: &'a {
        Sphere(Sphere),
        Triangle(Triangle<'a>),
    }
}

impl<'a> ShapeKind for Shape<'a> {
    fn bounds(&self) -> Bounds3f {
        each_kind!(self, Sphere, Triangle => |s| s.bounds())
    }

    fn normal_bounds(&self) -> DirectionCone {
        each_kind!(self, Sphere, Triangle => |s| s.normal_bounds())
    }

    fn intersect<'x>(&self, ray: &Ray, t_max: Float) -> Option<ShapeIntersection<'x>> {
        each_kind!(self, Sphere, Triangle => |s| s.intersect(ray, t_max))
    }

    fn intersect_p(&self, ray: &Ray, t_max: Float) -> bool {
        each_kind!(self, Sphere, Triangle => |s| s.intersect_p(ray, t_max))
    }

    fn area(&self) -> Float {
        each_kind!(self, Sphere, Triangle => |s| s.area())
    }

    fn sample(&self, u: Point2f) -> Option<ShapeSample> {
        each_kind!(self, Sphere, Triangle => |s| s.sample(u))
    }

    fn pdf(&self, hit: &SurfaceHit) -> Float {
        each_kind!(self, Sphere, Triangle => |s| s.pdf(hit))
    }

    fn sample_from(&self, ctx: &ShapeSampleContext, u: Point2f) -> Option<ShapeSample> {
        each_kind!(self, Sphere, Triangle => |s| s.sample_from(ctx, u))
    }

    fn pdf_from(&self, ctx: &ShapeSampleContext, wi: Vec3f) -> Float {
        each_kind!(self, Sphere, Triangle => |s| s.pdf_from(ctx, wi))
    }
}

/// Converts an area sample into a solid angle sample as seen from `ctx`.
pub(crate) fn area_to_solid_angle(ctx: &ShapeSampleContext, mut ss: ShapeSample) -> Option<ShapeSample> {
    let wi = ss.hit.p - ctx.p;
    let dist2 = wi.magnitude2();
    if dist2 == 0.0 {
        return None;
    }
    let wi = wi / dist2.sqrt();
    ss.pdf /= ss.hit.n.dot(-wi).abs() / dist2;
    if ss.pdf.is_infinite() {
        return None;
    }
    Some(ss)
}

/// Solid angle density of area sampling `shape` along `wi`, found by tracing the direction.
pub(crate) fn solid_angle_pdf_by_intersection<S: ShapeKind + ?Sized>(shape: &S, ctx: &ShapeSampleContext, wi: Vec3f) -> Float {
    let ray = ctx.spawn_ray(wi);
    let isect = match shape.intersect(&ray, Float::INFINITY) {
        Some(isect) => isect,
        None => return 0.0,
    };
    let hit = isect.intr.hit;
    let dist2 = (hit.p - ctx.p).magnitude2();
    let pdf = shape.pdf(&hit) / (hit.n.dot(-wi).abs() / dist2);
    if pdf.is_infinite() { 0.0 } else { pdf }
}
