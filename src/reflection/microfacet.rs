use cgmath::InnerSpace;

use crate::{Float, Point2f, Vec3f};
use crate::math::{lerp, sqr, PI};
use crate::reflection::{abs_cos_theta, cos2_theta, cos_phi, sin_phi, tan2_theta};
use crate::sampling::sample_uniform_disk_polar;

/// Trowbridge-Reitz (GGX) distribution of microfacet normals, sampled by visible normals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrowbridgeReitz {
    alpha_x: Float,
    alpha_y: Float,
}

impl TrowbridgeReitz {
    pub fn new(alpha_x: Float, alpha_y: Float) -> Self {
        let mut d = Self { alpha_x, alpha_y };
        if !d.effectively_smooth() {
            // very small alphas overflow D, keep them above the smooth cutoff
            d.alpha_x = d.alpha_x.max(1e-4);
            d.alpha_y = d.alpha_y.max(1e-4);
        }
        d
    }

    pub fn roughness_to_alpha(roughness: Float) -> Float {
        roughness.max(0.0).sqrt()
    }

    /// Below this roughness the surface is treated as perfectly specular.
    pub fn effectively_smooth(&self) -> bool {
        self.alpha_x.max(self.alpha_y) < 1e-3
    }

    /// Differential area of microfacets with normal `wm`.
    pub fn d(&self, wm: Vec3f) -> Float {
        let tan2_theta = tan2_theta(wm);
        if tan2_theta.is_infinite() {
            return 0.0;
        }
        let cos4_theta = sqr(cos2_theta(wm));
        if cos4_theta < 1e-16 {
            return 0.0;
        }
        let e = tan2_theta * (sqr(cos_phi(wm) / self.alpha_x) + sqr(sin_phi(wm) / self.alpha_y));
        1.0 / (PI * self.alpha_x * self.alpha_y * cos4_theta * sqr(1.0 + e))
    }

    /// Invisible masked microfacet area per visible microfacet area.
    pub fn lambda(&self, w: Vec3f) -> Float {
        let tan2_theta = tan2_theta(w);
        if tan2_theta.is_infinite() {
            return 0.0;
        }
        let alpha2 = sqr(cos_phi(w) * self.alpha_x) + sqr(sin_phi(w) * self.alpha_y);
        ((1.0 + alpha2 * tan2_theta).sqrt() - 1.0) / 2.0
    }

    pub fn g1(&self, w: Vec3f) -> Float {
        1.0 / (1.0 + self.lambda(w))
    }

    pub fn g(&self, wo: Vec3f, wi: Vec3f) -> Float {
        1.0 / (1.0 + self.lambda(wo) + self.lambda(wi))
    }

    /// Distribution of normals visible from `w`.
    pub fn d_visible(&self, w: Vec3f, wm: Vec3f) -> Float {
        self.g1(w) / abs_cos_theta(w) * self.d(wm) * w.dot(wm).abs()
    }

    pub fn pdf(&self, w: Vec3f, wm: Vec3f) -> Float {
        self.d_visible(w, wm)
    }

    pub fn sample_wm(&self, w: Vec3f, u: Point2f) -> Vec3f {
        // Transform w to the hemispherical configuration
        let mut wh = vec3f!(self.alpha_x * w.x, self.alpha_y * w.y, w.z).normalize();
        if wh.z < 0.0 {
            wh = -wh;
        }

        let t1 = if wh.z < 0.99999 {
            vec3f!(0, 0, 1).cross(wh).normalize()
        } else {
            vec3f!(1, 0, 0)
        };
        let t2 = wh.cross(t1);

        // Uniform disk sample warped to the projection of the visible hemisphere
        let mut p = sample_uniform_disk_polar(u);
        let h = (1.0 - sqr(p.x)).sqrt();
        p.y = lerp((1.0 + wh.z) / 2.0, h, p.y);

        let pz = Float::max(0.0, 1.0 - p.x * p.x - p.y * p.y).sqrt();
        let nh = p.x * t1 + p.y * t2 + pz * wh;
        vec3f!(self.alpha_x * nh.x, self.alpha_y * nh.y, nh.z.max(1e-6)).normalize()
    }

    /// Widens near-specular lobes, trading bias for lower variance on hard paths.
    pub fn regularize(&mut self) {
        if self.alpha_x < 0.3 {
            self.alpha_x = (2.0 * self.alpha_x).clamp(0.1, 0.3);
        }
        if self.alpha_y < 0.3 {
            self.alpha_y = (2.0 * self.alpha_y).clamp(0.1, 0.3);
        }
    }

    pub fn alpha(&self) -> (Float, Float) {
        (self.alpha_x, self.alpha_y)
    }
}
