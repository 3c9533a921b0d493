use bumpalo::Bump;
use cgmath::{EuclideanSpace, InnerSpace, Zero};

use crate::{Float, Point2f, Point3f, Vec3f, abs_dot, offset_ray_origin};
use crate::geometry::{Differential, Normal3, Ray, RayDifferential};
use crate::light::{Light, LightKind};
use crate::material::{Material, MaterialEvalContext, MaterialKind};
use crate::math::difference_of_products;
use crate::reflection::{Bsdf, BxDFFlags};
use crate::spectrum::{SampledSpectrum, SampledWavelengths};

/// A point on a surface together with a conservative bound on its floating point error.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceHit {
    pub p: Point3f,
    pub p_err: Vec3f,
    pub time: Float,
    /// Geometric normal, zero for points not on a surface (e.g. a point light).
    pub n: Normal3,
    pub uv: Point2f,
}

impl SurfaceHit {
    pub fn new(p: Point3f, p_err: Vec3f, time: Float, n: Normal3, uv: Point2f) -> Self {
        Self { p, p_err, time, n, uv }
    }

    /// An exact point with no surface.
    pub fn from_point(p: Point3f, time: Float) -> Self {
        Self { p, p_err: Vec3f::zero(), time, n: Normal3::zero(), uv: Point2f::origin() }
    }

    pub fn offset_ray_origin(&self, w: Vec3f) -> Point3f {
        offset_ray_origin(self.p, self.p_err, self.n, w)
    }

    pub fn spawn_ray(&self, dir: Vec3f) -> Ray {
        Ray { origin: self.offset_ray_origin(dir), dir, time: self.time }
    }

    /// A ray that reaches `p` at `t = 1`.
    pub fn spawn_ray_to(&self, p: Point3f) -> Ray {
        let origin = self.offset_ray_origin(p - self.p);
        Ray { origin, dir: p - origin, time: self.time }
    }

    /// Like [`spawn_ray_to`](Self::spawn_ray_to), but also offsets the far end off its surface.
    pub fn spawn_ray_to_hit(&self, other: &SurfaceHit) -> Ray {
        let pf = self.offset_ray_origin(other.p - self.p);
        let pt = other.offset_ray_origin(pf - other.p);
        Ray { origin: pf, dir: pt - pf, time: self.time }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DiffGeom {
    pub dpdu: Vec3f,
    pub dpdv: Vec3f,
    pub dndu: Normal3,
    pub dndv: Normal3,
}

/// Screen-space derivatives of the hit position and its (u, v) parametrization.
#[derive(Clone, Copy, Debug)]
pub struct TextureDifferentials {
    pub dpdx: Vec3f,
    pub dpdy: Vec3f,
    pub dudx: Float,
    pub dvdx: Float,
    pub dudy: Float,
    pub dvdy: Float,
}

impl Default for TextureDifferentials {
    fn default() -> Self {
        Self {
            dpdx: Vec3f::zero(),
            dpdy: Vec3f::zero(),
            dudx: 0.0,
            dvdx: 0.0,
            dudy: 0.0,
            dvdy: 0.0,
        }
    }
}

pub struct SurfaceInteraction<'a> {
    pub hit: SurfaceHit,

    pub wo: Vec3f,

    pub geom: DiffGeom,

    pub shading_n: Normal3,

    pub shading_geom: DiffGeom,

    /// `None` marks an interface surface, which only bounds a region and doesn't scatter.
    pub material: Option<Material<'a>>,

    pub area_light: Option<Light<'a>>,

    pub tex_diffs: TextureDifferentials,
}

impl<'a> SurfaceInteraction<'a> {
    pub fn new(hit: SurfaceHit, wo: Vec3f, geom: DiffGeom) -> Self {
        Self {
            hit,
            wo,
            geom,
            shading_n: hit.n,
            shading_geom: geom,
            material: None,
            area_light: None,
            tex_diffs: TextureDifferentials::default(),
        }
    }

    /// Replaces the shading frame. The geometric normal is flipped to the side of `ns` unless
    /// `orientation_is_authoritative`, in which case `ns` is flipped instead.
    pub fn set_shading_geometry(&mut self, ns: Normal3, geom: DiffGeom, orientation_is_authoritative: bool) {
        self.shading_n = ns;
        if orientation_is_authoritative {
            self.shading_n = self.shading_n.faceforward(self.hit.n.0);
        } else {
            self.hit.n = self.hit.n.faceforward(self.shading_n.0);
        }
        self.shading_geom = geom;
    }

    pub fn p(&self) -> Point3f {
        self.hit.p
    }

    pub fn n(&self) -> Normal3 {
        self.hit.n
    }

    /// Emitted radiance leaving the surface towards `w`, zero if the surface isn't emissive.
    pub fn le(&self, w: Vec3f, lambda: &SampledWavelengths) -> SampledSpectrum {
        match self.area_light {
            Some(light) => light.l(self.hit.p, self.hit.n, self.hit.uv, w, lambda),
            None => SampledSpectrum::zero(),
        }
    }

    /// Estimates the screen-space footprint of the hit from the ray's differentials.
    pub fn compute_differentials(&mut self, ray: &RayDifferential) {
        let n = self.hit.n.0;
        let p = self.hit.p.to_vec();
        let mut d = TextureDifferentials::default();

        if let Some(diff) = ray.diff.filter(|diff| n.dot(diff.rx_dir) != 0.0 && n.dot(diff.ry_dir) != 0.0) {
            // Intersect the offset rays with the tangent plane
            let plane_d = -n.dot(p);
            let tx = (-n.dot(diff.rx_origin.to_vec()) - plane_d) / n.dot(diff.rx_dir);
            let ty = (-n.dot(diff.ry_origin.to_vec()) - plane_d) / n.dot(diff.ry_dir);
            let px = diff.rx_origin + diff.rx_dir * tx;
            let py = diff.ry_origin + diff.ry_dir * ty;
            d.dpdx = px - self.hit.p;
            d.dpdy = py - self.hit.p;
        }

        // Least squares fit of (du, dv) to dp
        let DiffGeom { dpdu, dpdv, .. } = self.geom;
        let ata00 = dpdu.dot(dpdu);
        let ata01 = dpdu.dot(dpdv);
        let ata11 = dpdv.dot(dpdv);
        let inv_det = 1.0 / difference_of_products(ata00, ata11, ata01, ata01);
        let inv_det = if inv_det.is_finite() { inv_det } else { 0.0 };
        let atb0x = dpdu.dot(d.dpdx);
        let atb1x = dpdv.dot(d.dpdx);
        let atb0y = dpdu.dot(d.dpdy);
        let atb1y = dpdv.dot(d.dpdy);

        let fix = |v: Float| if v.is_finite() { v.clamp(-1e8, 1e8) } else { 0.0 };
        d.dudx = fix(difference_of_products(ata11, atb0x, ata01, atb1x) * inv_det);
        d.dvdx = fix(difference_of_products(ata00, atb1x, ata01, atb0x) * inv_det);
        d.dudy = fix(difference_of_products(ata11, atb0y, ata01, atb1y) * inv_det);
        d.dvdy = fix(difference_of_products(ata00, atb1y, ata01, atb0y) * inv_det);

        self.tex_diffs = d;
    }

    /// Evaluates the surface's material into a BSDF allocated in `arena`. Returns `None` for
    /// interface surfaces and for materials that produce no scattering here.
    pub fn get_bsdf<'b>(
        &mut self,
        ray: &RayDifferential,
        lambda: &mut SampledWavelengths,
        arena: &'b Bump,
    ) -> Option<Bsdf<'b>> {
        self.compute_differentials(ray);
        let material = self.material?;
        let ctx = MaterialEvalContext {
            p: self.hit.p,
            wo: self.wo,
            n: self.hit.n,
            ns: self.shading_n,
            dpdus: self.shading_geom.dpdu,
            uv: self.hit.uv,
        };
        let bxdf = material.get_bxdf(&ctx, lambda, arena)?;
        Some(Bsdf::new(self.shading_n, self.shading_geom.dpdu, bxdf))
    }

    /// Continues `ray` past this surface without scattering.
    pub fn skip_intersection(&self, ray: &mut RayDifferential, t: Float) {
        ray.ray = self.hit.spawn_ray(ray.ray.dir);
        if let Some(diff) = &mut ray.diff {
            diff.rx_origin += diff.rx_dir * t;
            diff.ry_origin += diff.ry_dir * t;
        }
    }

    pub fn spawn_ray(&self, dir: Vec3f) -> Ray {
        self.hit.spawn_ray(dir)
    }

    /// Spawns the continuation of `ray_i` in direction `wi`. Differentials are only carried
    /// through perfectly specular scattering, where they can be propagated exactly.
    pub fn spawn_ray_with_differentials(
        &self,
        ray_i: &RayDifferential,
        wi: Vec3f,
        flags: BxDFFlags,
        eta: Float,
    ) -> RayDifferential {
        let ray = self.spawn_ray(wi);
        let diff = ray_i.diff.and_then(|d| self.specular_differentials(&d, wi, flags, eta));
        let diff = diff.filter(|d| {
            d.rx_dir.magnitude2() <= 1e16
                && d.ry_dir.magnitude2() <= 1e16
                && d.rx_origin.to_vec().magnitude2() <= 1e16
                && d.ry_origin.to_vec().magnitude2() <= 1e16
        });
        RayDifferential { ray, diff }
    }

    fn specular_differentials(&self, di: &Differential, wi: Vec3f, flags: BxDFFlags, eta: Float) -> Option<Differential> {
        let TextureDifferentials { dpdx, dpdy, dudx, dvdx, dudy, dvdy } = self.tex_diffs;
        let wo = self.wo;
        let mut n = self.shading_n.0;
        let mut dndx = self.shading_geom.dndu.0 * dudx + self.shading_geom.dndv.0 * dvdx;
        let mut dndy = self.shading_geom.dndu.0 * dudy + self.shading_geom.dndv.0 * dvdy;
        let dwodx = -di.rx_dir - wo;
        let dwody = -di.ry_dir - wo;

        let rx_origin = self.hit.p + dpdx;
        let ry_origin = self.hit.p + dpdy;

        if flags == BxDFFlags::SPECULAR_REFLECTION {
            let dwo_dot_n_dx = dwodx.dot(n) + wo.dot(dndx);
            let dwo_dot_n_dy = dwody.dot(n) + wo.dot(dndy);
            let rx_dir = wi - dwodx + 2.0 * (wo.dot(n) * dndx + dwo_dot_n_dx * n);
            let ry_dir = wi - dwody + 2.0 * (wo.dot(n) * dndy + dwo_dot_n_dy * n);
            Some(Differential { rx_origin, rx_dir, ry_origin, ry_dir })
        } else if flags == BxDFFlags::SPECULAR_TRANSMISSION {
            if wo.dot(n) < 0.0 {
                n = -n;
                dndx = -dndx;
                dndy = -dndy;
            }
            let dwo_dot_n_dx = dwodx.dot(n) + wo.dot(dndx);
            let dwo_dot_n_dy = dwody.dot(n) + wo.dot(dndy);
            let mu = wo.dot(n) / eta - abs_dot(wi, n);
            let k = 1.0 / eta + 1.0 / (eta * eta) * wo.dot(n) / wi.dot(n);
            let dmudx = dwo_dot_n_dx * k;
            let dmudy = dwo_dot_n_dy * k;
            let rx_dir = wi - eta * dwodx + (mu * dndx + dmudx * n);
            let ry_dir = wi - eta * dwody + (mu * dndy + dmudy * n);
            Some(Differential { rx_origin, rx_dir, ry_origin, ry_dir })
        } else {
            None
        }
    }
}

/// The shading point a light is sampled from.
#[derive(Clone, Copy, Debug)]
pub struct LightSampleContext {
    pub p: Point3f,
    pub p_err: Vec3f,
    pub n: Normal3,
    pub ns: Normal3,
    pub time: Float,
}

impl LightSampleContext {
    /// A context for a point that isn't on a surface.
    pub fn from_point(p: Point3f, time: Float) -> Self {
        Self { p, p_err: Vec3f::zero(), n: Normal3::zero(), ns: Normal3::zero(), time }
    }

    pub fn hit(&self) -> SurfaceHit {
        SurfaceHit { p: self.p, p_err: self.p_err, time: self.time, n: self.n, uv: Point2f::origin() }
    }
}

impl<'a> From<&SurfaceInteraction<'a>> for LightSampleContext {
    fn from(si: &SurfaceInteraction<'a>) -> Self {
        Self { p: si.hit.p, p_err: si.hit.p_err, n: si.hit.n, ns: si.shading_n, time: si.hit.time }
    }
}

/// The reference point a shape is sampled from.
#[derive(Clone, Copy, Debug)]
pub struct ShapeSampleContext {
    pub p: Point3f,
    pub p_err: Vec3f,
    pub n: Normal3,
    pub ns: Normal3,
    pub time: Float,
}

impl ShapeSampleContext {
    pub fn offset_ray_origin(&self, w: Vec3f) -> Point3f {
        offset_ray_origin(self.p, self.p_err, self.n, w)
    }

    pub fn spawn_ray(&self, w: Vec3f) -> Ray {
        Ray { origin: self.offset_ray_origin(w), dir: w, time: self.time }
    }
}

impl From<&LightSampleContext> for ShapeSampleContext {
    fn from(ctx: &LightSampleContext) -> Self {
        Self { p: ctx.p, p_err: ctx.p_err, n: ctx.n, ns: ctx.ns, time: ctx.time }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn plane_hit() -> SurfaceInteraction<'static> {
        let hit = SurfaceHit::new(point3f!(0, 0, 0), vec3f!(1e-6, 1e-6, 1e-6), 0.0, Normal3::new(0.0, 0.0, 1.0), point2f!(0.5, 0.5));
        let geom = DiffGeom { dpdu: vec3f!(2, 0, 0), dpdv: vec3f!(0, 2, 0), dndu: Normal3::zero(), dndv: Normal3::zero() };
        SurfaceInteraction::new(hit, vec3f!(0, 0, 1), geom)
    }

    #[test]
    fn spawn_ray_to_reaches_target_at_one() {
        let hit = SurfaceHit::from_point(point3f!(0, 0, 0), 0.0);
        let target = point3f!(1, 2, 3);
        let ray = hit.spawn_ray_to(target);
        assert_abs_diff_eq!(ray.at(1.0), target, epsilon = 1e-6);
    }

    #[test]
    fn differentials_on_a_plane() {
        let mut si = plane_hit();
        let ray = RayDifferential::new(
            Ray::new(point3f!(0, 0, 1), vec3f!(0, 0, -1)),
            Some(Differential {
                rx_origin: point3f!(0.1, 0, 1),
                rx_dir: vec3f!(0, 0, -1),
                ry_origin: point3f!(0, 0.2, 1),
                ry_dir: vec3f!(0, 0, -1),
            }),
        );
        si.compute_differentials(&ray);
        assert_abs_diff_eq!(si.tex_diffs.dpdx, vec3f!(0.1, 0, 0), epsilon = 1e-6);
        assert_abs_diff_eq!(si.tex_diffs.dudx, 0.05, epsilon = 1e-6);
        assert_abs_diff_eq!(si.tex_diffs.dvdy, 0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(si.tex_diffs.dvdx, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn interface_surface_has_no_bsdf() {
        let mut si = plane_hit();
        let arena = Bump::new();
        let mut lambda = SampledWavelengths::sample_visible(0.5);
        let ray = RayDifferential::from(Ray::new(point3f!(0, 0, 1), vec3f!(0, 0, -1)));
        assert!(si.get_bsdf(&ray, &mut lambda, &arena).is_none());
        assert!(si.le(vec3f!(0, 0, 1), &lambda).is_black());
    }

    #[test]
    fn skip_intersection_continues_forward() {
        let si = plane_hit();
        let mut ray = RayDifferential::from(Ray::new(point3f!(0, 0, 1), vec3f!(0, 0, -1)));
        si.skip_intersection(&mut ray, 1.0);
        assert!(ray.ray.origin.z < 0.0);
        assert_eq!(ray.ray.dir, vec3f!(0, 0, -1));
    }

    #[test]
    fn diffuse_scattering_drops_differentials() {
        let si = plane_hit();
        let ray = RayDifferential::new(
            Ray::new(point3f!(0, 0, 1), vec3f!(0, 0, -1)),
            Some(Differential {
                rx_origin: point3f!(0.1, 0, 1),
                rx_dir: vec3f!(0, 0, -1),
                ry_origin: point3f!(0, 0.1, 1),
                ry_dir: vec3f!(0, 0, -1),
            }),
        );
        let out = si.spawn_ray_with_differentials(&ray, vec3f!(0, 0, 1), BxDFFlags::DIFFUSE_REFLECTION, 1.0);
        assert!(out.diff.is_none());
        let out = si.spawn_ray_with_differentials(&ray, vec3f!(0, 0, 1), BxDFFlags::SPECULAR_REFLECTION, 1.0);
        assert!(out.diff.is_some());
    }
}
