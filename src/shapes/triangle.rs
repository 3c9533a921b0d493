use cgmath::{EuclideanSpace, InnerSpace};

use crate::{ComponentWiseExt, Float, Point2f, Point3f, Vec3f, coordinate_system};
use crate::geometry::{Bounds3f, DirectionCone, Normal3, Ray, Transform};
use crate::interaction::{DiffGeom, ShapeSampleContext, SurfaceHit, SurfaceInteraction};
use crate::math::{difference_of_products, gamma};
use crate::sampling::sample_uniform_triangle;
use crate::shapes::{area_to_solid_angle, solid_angle_pdf_by_intersection, ShapeIntersection, ShapeKind, ShapeSample};

/// Vertex data shared by the triangles of a mesh, stored in world space.
pub struct TriangleMesh {
    vertex_indices: Vec<u32>,
    vertices: Vec<Point3f>,
    normals: Option<Vec<Normal3>>,
    uvs: Option<Vec<Point2f>>,
    reverse_orientation: bool,
}

impl TriangleMesh {
    pub fn new(
        object_to_world: &Transform,
        reverse_orientation: bool,
        vertex_indices: Vec<u32>,
        mut vertices: Vec<Point3f>,
        mut normals: Option<Vec<Normal3>>,
        uvs: Option<Vec<Point2f>>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(vertex_indices.len() % 3 == 0, "mesh index count {} is not a multiple of 3", vertex_indices.len());
        let n_vertices = vertices.len();
        anyhow::ensure!(
            vertex_indices.iter().all(|&i| (i as usize) < n_vertices),
            "mesh index out of range for {} vertices",
            n_vertices
        );

        for v in &mut vertices {
            *v = object_to_world.transform(*v);
        }

        if let Some(ref mut normals) = normals {
            anyhow::ensure!(normals.len() == n_vertices, "mesh has {} normals for {} vertices", normals.len(), n_vertices);
            for n in normals {
                *n = object_to_world.transform(*n);
            }
        }

        if let Some(ref uvs) = uvs {
            anyhow::ensure!(uvs.len() == n_vertices, "mesh has {} uvs for {} vertices", uvs.len(), n_vertices);
        }

        Ok(Self { vertex_indices, vertices, normals, uvs, reverse_orientation })
    }

    pub fn n_triangles(&self) -> u32 {
        self.vertex_indices.len() as u32 / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = Triangle<'_>> + '_ {
        (0..self.n_triangles()).map(move |tri_id| Triangle::new(self, tri_id))
    }
}

#[derive(Clone, Copy)]
pub struct Triangle<'m> {
    mesh: &'m TriangleMesh,
    vertex_indices: [usize; 3],
}

impl<'m> std::fmt::Debug for Triangle<'m> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Triangle").field("vertices", &self.positions()).finish()
    }
}

struct TriangleHit {
    b: [Float; 3],
    t: Float,
}

impl<'m> Triangle<'m> {
    pub fn new(mesh: &'m TriangleMesh, tri_id: u32) -> Self {
        let idx = 3 * tri_id as usize;
        let v = &mesh.vertex_indices[idx..idx + 3];
        Self { mesh, vertex_indices: [v[0] as usize, v[1] as usize, v[2] as usize] }
    }

    fn positions(&self) -> [Point3f; 3] {
        let [i0, i1, i2] = self.vertex_indices;
        [self.mesh.vertices[i0], self.mesh.vertices[i1], self.mesh.vertices[i2]]
    }

    fn uvs(&self) -> [Point2f; 3] {
        self.mesh.uvs.as_ref().map_or_else(
            || [Point2f::new(0.0, 0.0), Point2f::new(1.0, 0.0), Point2f::new(1.0, 1.0)],
            |uvs| {
                let [i0, i1, i2] = self.vertex_indices;
                [uvs[i0], uvs[i1], uvs[i2]]
            },
        )
    }

    fn vertex_normals(&self) -> Option<[Normal3; 3]> {
        self.mesh.normals.as_ref().map(|ns| {
            let [i0, i1, i2] = self.vertex_indices;
            [ns[i0], ns[i1], ns[i2]]
        })
    }

    fn interpolated_normal(&self, b: [Float; 3]) -> Option<Vec3f> {
        let ns = self.vertex_normals()?;
        let n = b[0] * ns[0].0 + b[1] * ns[1].0 + b[2] * ns[2].0;
        if n.magnitude2() > 0.0 { Some(n.normalize()) } else { None }
    }

    /// Orients the geometric normal `n` like the vertex normals, or by the mesh orientation.
    fn orient(&self, n: Vec3f, b: [Float; 3]) -> Normal3 {
        match self.interpolated_normal(b) {
            Some(ns) => Normal3(n).faceforward(ns),
            None if self.mesh.reverse_orientation => Normal3(-n),
            None => Normal3(n),
        }
    }

    /// Watertight ray/triangle test, in a space where the ray starts at the origin along +z.
    fn intersect_triangle(&self, ray: &Ray, t_max: Float) -> Option<TriangleHit> {
        let [p0, p1, p2] = self.positions();
        if (p2 - p0).cross(p1 - p0).magnitude2() == 0.0 {
            return None;
        }

        let o = ray.origin.to_vec();
        let kz = ray.dir.abs().max_dimension();
        let kx = (kz + 1) % 3;
        let ky = (kx + 1) % 3;
        let d = ray.dir.permute(kx, ky, kz);
        let mut p0t = (p0.to_vec() - o).permute(kx, ky, kz);
        let mut p1t = (p1.to_vec() - o).permute(kx, ky, kz);
        let mut p2t = (p2.to_vec() - o).permute(kx, ky, kz);

        // Shear x and y now, z only once we know there's a hit
        let sx = -d.x / d.z;
        let sy = -d.y / d.z;
        let sz = 1.0 / d.z;
        p0t.x += sx * p0t.z;
        p0t.y += sy * p0t.z;
        p1t.x += sx * p1t.z;
        p1t.y += sy * p1t.z;
        p2t.x += sx * p2t.z;
        p2t.y += sy * p2t.z;

        let mut e0 = difference_of_products(p1t.x, p2t.y, p1t.y, p2t.x);
        let mut e1 = difference_of_products(p2t.x, p0t.y, p2t.y, p0t.x);
        let mut e2 = difference_of_products(p0t.x, p1t.y, p0t.y, p1t.x);

        // Edges through the origin need double precision to be classified consistently
        if e0 == 0.0 || e1 == 0.0 || e2 == 0.0 {
            let edge = |a: Vec3f, b: Vec3f| (a.x as f64 * b.y as f64 - a.y as f64 * b.x as f64) as Float;
            e0 = edge(p1t, p2t);
            e1 = edge(p2t, p0t);
            e2 = edge(p0t, p1t);
        }

        if (e0 < 0.0 || e1 < 0.0 || e2 < 0.0) && (e0 > 0.0 || e1 > 0.0 || e2 > 0.0) {
            return None;
        }
        let det = e0 + e1 + e2;
        if det == 0.0 {
            return None;
        }

        p0t.z *= sz;
        p1t.z *= sz;
        p2t.z *= sz;
        let t_scaled = e0 * p0t.z + e1 * p1t.z + e2 * p2t.z;
        if det < 0.0 && (t_scaled >= 0.0 || t_scaled < t_max * det) {
            return None;
        } else if det > 0.0 && (t_scaled <= 0.0 || t_scaled > t_max * det) {
            return None;
        }

        let inv_det = 1.0 / det;
        let b = [e0 * inv_det, e1 * inv_det, e2 * inv_det];
        let t = t_scaled * inv_det;

        // Make sure t is conservatively greater than zero
        let max_zt = vec3f!(p0t.z, p1t.z, p2t.z).abs().max_component();
        let delta_z = gamma(3) * max_zt;
        let max_xt = vec3f!(p0t.x, p1t.x, p2t.x).abs().max_component();
        let max_yt = vec3f!(p0t.y, p1t.y, p2t.y).abs().max_component();
        let delta_x = gamma(5) * (max_xt + max_zt);
        let delta_y = gamma(5) * (max_yt + max_zt);
        let delta_e = 2.0 * (gamma(2) * max_xt * max_yt + delta_y * max_xt + delta_x * max_yt);
        let max_e = vec3f!(e0, e1, e2).abs().max_component();
        let delta_t = 3.0 * (gamma(3) * max_e * max_zt + delta_e * max_zt + delta_z * max_e) * inv_det.abs();
        if t <= delta_t {
            return None;
        }

        Some(TriangleHit { b, t })
    }

    fn interaction<'x>(&self, th: &TriangleHit, time: Float, wo: Vec3f) -> SurfaceInteraction<'x> {
        let [p0, p1, p2] = self.positions();
        let uv = self.uvs();
        let b = th.b;

        let duv02 = uv[0] - uv[2];
        let duv12 = uv[1] - uv[2];
        let dp02 = p0 - p2;
        let dp12 = p1 - p2;
        let determinant = difference_of_products(duv02.x, duv12.y, duv02.y, duv12.x);
        let degenerate_uv = determinant.abs() < 1e-9;

        let (mut dpdu, mut dpdv) = (Vec3f::new(0.0, 0.0, 0.0), Vec3f::new(0.0, 0.0, 0.0));
        if !degenerate_uv {
            let inv_det = 1.0 / determinant;
            dpdu = (duv12.y * dp02 - duv02.y * dp12) * inv_det;
            dpdv = (duv02.x * dp12 - duv12.x * dp02) * inv_det;
        }
        if degenerate_uv || dpdu.cross(dpdv).magnitude2() == 0.0 {
            let ng = (p2 - p0).cross(p1 - p0);
            let (u, v) = coordinate_system(ng.normalize());
            dpdu = u;
            dpdv = v;
        }

        let p_hit = Point3f::from_vec(b[0] * p0.to_vec() + b[1] * p1.to_vec() + b[2] * p2.to_vec());
        let uv_hit = Point2f::from_vec(b[0] * uv[0].to_vec() + b[1] * uv[1].to_vec() + b[2] * uv[2].to_vec());
        let p_abs_sum = (b[0] * p0.to_vec()).abs() + (b[1] * p1.to_vec()).abs() + (b[2] * p2.to_vec()).abs();
        let p_err = gamma(7) * p_abs_sum;

        let n = self.orient(dp02.cross(dp12).normalize(), b);
        let hit = SurfaceHit::new(p_hit, p_err, time, n, uv_hit);
        let zero = Normal3::zero();
        let mut si = SurfaceInteraction::new(hit, wo, DiffGeom { dpdu, dpdv, dndu: zero, dndv: zero });

        if let (Some(ns), Some(vn)) = (self.interpolated_normal(b), self.vertex_normals()) {
            let mut ss = dpdu;
            let mut ts = ns.cross(ss);
            if ts.magnitude2() > 0.0 {
                ss = ts.cross(ns);
            } else {
                let (s, t) = coordinate_system(ns);
                ss = s;
                ts = t;
            }

            let dn1 = vn[0].0 - vn[2].0;
            let dn2 = vn[1].0 - vn[2].0;
            let (dndu, dndv) = if degenerate_uv {
                let dn = (vn[2].0 - vn[0].0).cross(vn[1].0 - vn[0].0);
                if dn.magnitude2() == 0.0 {
                    (Vec3f::new(0.0, 0.0, 0.0), Vec3f::new(0.0, 0.0, 0.0))
                } else {
                    coordinate_system(dn.normalize())
                }
            } else {
                let inv_det = 1.0 / determinant;
                ((duv12.y * dn1 - duv02.y * dn2) * inv_det, (duv02.x * dn2 - duv12.x * dn1) * inv_det)
            };
            let geom = DiffGeom { dpdu: ss, dpdv: ts, dndu: Normal3(dndu), dndv: Normal3(dndv) };
            si.set_shading_geometry(Normal3(ns), geom, true);
        }
        si
    }
}

impl<'m> ShapeKind for Triangle<'m> {
    fn bounds(&self) -> Bounds3f {
        let [p0, p1, p2] = self.positions();
        Bounds3f::new(p0, p1).union_point(p2)
    }

    fn normal_bounds(&self) -> DirectionCone {
        let [p0, p1, p2] = self.positions();
        let n = (p1 - p0).cross(p2 - p0).normalize();
        let centroid = [1.0 / 3.0; 3];
        DirectionCone::from_direction(self.orient(n, centroid).0)
    }

    fn intersect<'x>(&self, ray: &Ray, t_max: Float) -> Option<ShapeIntersection<'x>> {
        let th = self.intersect_triangle(ray, t_max)?;
        let intr = self.interaction(&th, ray.time, -ray.dir.normalize());
        Some(ShapeIntersection { intr, t_hit: th.t })
    }

    fn intersect_p(&self, ray: &Ray, t_max: Float) -> bool {
        self.intersect_triangle(ray, t_max).is_some()
    }

    fn area(&self) -> Float {
        let [p0, p1, p2] = self.positions();
        0.5 * (p1 - p0).cross(p2 - p0).magnitude()
    }

    fn sample(&self, u: Point2f) -> Option<ShapeSample> {
        let [p0, p1, p2] = self.positions();
        let b = sample_uniform_triangle(u);
        let p = Point3f::from_vec(b[0] * p0.to_vec() + b[1] * p1.to_vec() + b[2] * p2.to_vec());
        let n = self.orient((p1 - p0).cross(p2 - p0).normalize(), b);
        let uv = self.uvs();
        let uv_sample = Point2f::from_vec(b[0] * uv[0].to_vec() + b[1] * uv[1].to_vec() + b[2] * uv[2].to_vec());
        let p_abs_sum = (b[0] * p0.to_vec()).abs() + (b[1] * p1.to_vec()).abs() + (b[2] * p2.to_vec()).abs();
        let hit = SurfaceHit::new(p, gamma(6) * p_abs_sum, 0.0, n, uv_sample);
        Some(ShapeSample { hit, pdf: 1.0 / self.area() })
    }

    fn sample_from(&self, ctx: &ShapeSampleContext, u: Point2f) -> Option<ShapeSample> {
        let mut ss = self.sample(u)?;
        ss.hit.time = ctx.time;
        area_to_solid_angle(ctx, ss)
    }

    fn pdf_from(&self, ctx: &ShapeSampleContext, wi: Vec3f) -> Float {
        solid_angle_pdf_by_intersection(self, ctx, wi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn quad_mesh() -> TriangleMesh {
        TriangleMesh::new(
            &Transform::IDENTITY,
            false,
            vec![0, 1, 2, 0, 2, 3],
            vec![point3f!(-1, -1, 0), point3f!(1, -1, 0), point3f!(1, 1, 0), point3f!(-1, 1, 0)],
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn rejects_bad_indices() {
        let res = TriangleMesh::new(&Transform::IDENTITY, false, vec![0, 1, 5], vec![point3f!(0, 0, 0); 3], None, None);
        assert!(res.is_err());
    }

    #[test]
    fn second_triangle_uses_its_own_indices() {
        let mesh = quad_mesh();
        let tris: Vec<_> = mesh.triangles().collect();
        assert_eq!(tris.len(), 2);
        assert_eq!(tris[1].positions()[2], point3f!(-1, 1, 0));
    }

    #[test]
    fn shared_edge_is_watertight() {
        let mesh = quad_mesh();
        let ray = Ray::new(point3f!(0.5, -0.25, 1), vec3f!(0, 0, -1));
        let hits = mesh.triangles().filter(|t| t.intersect_p(&ray, Float::INFINITY)).count();
        assert_eq!(hits, 1);

        // the diagonal from (-1, -1) to (1, 1) is shared, no ray through it may slip between
        for i in 1..16 {
            let x = -1.0 + 2.0 * i as Float / 16.0;
            let ray = Ray::new(point3f!(x, x, 1), vec3f!(0, 0, -1));
            assert!(mesh.triangles().any(|t| t.intersect_p(&ray, Float::INFINITY)));
        }
    }

    #[test]
    fn intersection_geometry() {
        let mesh = quad_mesh();
        let tri = Triangle::new(&mesh, 0);
        let ray = Ray::new(point3f!(0.5, -0.5, 2), vec3f!(0, 0, -1));
        let isect = tri.intersect(&ray, Float::INFINITY).unwrap();
        assert_abs_diff_eq!(isect.t_hit, 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(isect.intr.hit.p, point3f!(0.5, -0.5, 0), epsilon = 1e-6);
        assert_abs_diff_eq!(isect.intr.hit.n.z.abs(), 1.0, epsilon = 1e-6);
        assert!(tri.intersect(&ray, 1.5).is_none());
    }

    #[test]
    fn area_and_solid_angle_sample() {
        let mesh = quad_mesh();
        let tri = Triangle::new(&mesh, 0);
        assert_relative_eq!(tri.area(), 2.0);
        let ctx = ShapeSampleContext {
            p: point3f!(0, 0, 3),
            p_err: Vec3f::new(0.0, 0.0, 0.0),
            n: Normal3::zero(),
            ns: Normal3::zero(),
            time: 0.0,
        };
        let ss = tri.sample_from(&ctx, point2f!(0.4, 0.3)).unwrap();
        let wi = (ss.hit.p - ctx.p).normalize();
        assert_relative_eq!(tri.pdf_from(&ctx, wi), ss.pdf, max_relative = 1e-3);
    }
}
