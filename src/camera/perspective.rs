use anyhow::Context;
use cgmath::{EuclideanSpace, InnerSpace};

use crate::{Differential, Float, Point2f, Point3f, Ray, RayDifferential, Transform, Vec3f};
use crate::camera::{CameraBase, CameraKind, CameraRay, CameraRayDifferential, CameraSample, ProjectionBase};
use crate::film::{Film, FilmKind};
use crate::spectrum::{SampledSpectrum, SampledWavelengths};

/// Pinhole or thin-lens camera with a perspective projection.
#[derive(Debug)]
pub struct PerspectiveCamera<'a> {
    base: CameraBase<'a>,
    proj: ProjectionBase,
    // camera-space offsets of one pixel step on the near plane
    dx_camera: Vec3f,
    dy_camera: Vec3f,
}

impl<'a> PerspectiveCamera<'a> {
    /// `fov` is the full angle in degrees spanned by the shorter image axis.
    pub fn new(base: CameraBase<'a>, fov: Float, lens_radius: Float, focal_distance: Float) -> anyhow::Result<Self> {
        let res = base.film().full_resolution();
        let screen_from_camera = Transform::perspective(fov, 1e-2, 1000.0)
            .with_context(|| format!("invalid field of view {}", fov))?;
        let proj = ProjectionBase::new(
            screen_from_camera,
            res,
            ProjectionBase::default_screen_window(res),
            lens_radius,
            focal_distance,
        );
        let origin = proj.camera_point(Point2f::new(0.0, 0.0));
        let dx_camera = proj.camera_point(Point2f::new(1.0, 0.0)) - origin;
        let dy_camera = proj.camera_point(Point2f::new(0.0, 1.0)) - origin;
        Ok(Self { base, proj, dx_camera, dy_camera })
    }

    fn camera_space_ray(&self, sample: &CameraSample) -> Ray {
        let p_camera = self.proj.camera_point(sample.p_film);
        Ray {
            origin: Point3f::origin(),
            dir: p_camera.to_vec().normalize(),
            time: self.base.sample_time(sample.time),
        }
    }
}

impl<'a> CameraKind<'a> for PerspectiveCamera<'a> {
    fn generate_ray(&self, sample: CameraSample, _lambda: &SampledWavelengths) -> Option<CameraRay> {
        let mut ray = self.camera_space_ray(&sample);
        self.proj.apply_lens(&mut ray, sample.p_lens);
        Some(CameraRay { ray: self.base.render_from_camera(ray), weight: SampledSpectrum::one() })
    }

    fn generate_ray_differential(
        &self,
        sample: CameraSample,
        lambda: &SampledWavelengths,
    ) -> Option<CameraRayDifferential> {
        if self.proj.lens_radius > 0.0 {
            return CameraBase::generate_ray_differential(self, sample, lambda);
        }

        let ray = self.camera_space_ray(&sample);
        let p_camera = self.proj.camera_point(sample.p_film).to_vec();
        let diff = Differential {
            rx_origin: ray.origin,
            rx_dir: (p_camera + self.dx_camera).normalize(),
            ry_origin: ray.origin,
            ry_dir: (p_camera + self.dy_camera).normalize(),
        };
        let ray = self.base.camera_transform().transform(RayDifferential::new(ray, Some(diff)));
        Some(CameraRayDifferential { ray, weight: SampledSpectrum::one() })
    }

    fn film(&self) -> Film<'a> {
        self.base.film()
    }

    fn sample_time(&self, u: Float) -> Float {
        self.base.sample_time(u)
    }

    fn camera_transform(&self) -> &Transform {
        self.base.camera_transform()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::film::{FilmBase, RgbFilm};
    use crate::filter::Filter;
    use approx::assert_relative_eq;

    fn sample(x: Float, y: Float, lens: Point2f) -> CameraSample {
        CameraSample { p_film: Point2f::new(x, y), p_lens: lens, time: 0.0, filter_weight: 1.0 }
    }

    #[test]
    fn field_of_view_spans_the_short_axis() -> anyhow::Result<()> {
        let film = RgbFilm::new(FilmBase::with_resolution(32, 32, Filter::default()), Float::INFINITY);
        let camera = PerspectiveCamera::new(CameraBase::new(Transform::IDENTITY, (0.0, 1.0), Film::from(&film)), 90.0, 0.0, 1.0)?;
        let lambda = SampledWavelengths::sample_visible(0.5);

        let centre = camera.generate_ray(sample(16.0, 16.0, point2f!(0.5, 0.5)), &lambda).unwrap().ray;
        assert_relative_eq!(centre.dir, vec3f!(0, 0, 1), epsilon = 1e-5);

        // 45 degrees off axis at the left edge, raster y points down
        let left = camera.generate_ray(sample(0.0, 16.0, point2f!(0.5, 0.5)), &lambda).unwrap().ray;
        assert_relative_eq!(left.dir.x / left.dir.z, -1.0, epsilon = 1e-4);
        let top = camera.generate_ray(sample(16.0, 0.0, point2f!(0.5, 0.5)), &lambda).unwrap().ray;
        assert_relative_eq!(top.dir.y / top.dir.z, 1.0, epsilon = 1e-4);
        Ok(())
    }

    #[test]
    fn thin_lens_rays_meet_on_the_focal_plane() -> anyhow::Result<()> {
        let film = RgbFilm::new(FilmBase::with_resolution(16, 16, Filter::default()), Float::INFINITY);
        let camera = PerspectiveCamera::new(CameraBase::new(Transform::IDENTITY, (0.0, 1.0), Film::from(&film)), 60.0, 0.2, 3.0)?;
        let lambda = SampledWavelengths::sample_visible(0.5);

        let focus = |lens: Point2f| {
            let ray = camera.generate_ray(sample(4.0, 11.0, lens), &lambda).unwrap().ray;
            ray.at((3.0 - ray.origin.z) / ray.dir.z)
        };
        let a = focus(point2f!(0.1, 0.9));
        let b = focus(point2f!(0.8, 0.3));
        assert_relative_eq!(a, b, epsilon = 1e-4);
        assert!(camera.generate_ray_differential(sample(4.0, 11.0, point2f!(0.1, 0.9)), &lambda).unwrap().ray.diff.is_some());
        Ok(())
    }

    #[test]
    fn degenerate_field_of_view_is_an_error() {
        let film = RgbFilm::new(FilmBase::with_resolution(4, 4, Filter::default()), Float::INFINITY);
        let base = CameraBase::new(Transform::IDENTITY, (0.0, 1.0), Film::from(&film));
        assert!(PerspectiveCamera::new(base, 0.0, 0.0, 1.0).is_err());
    }
}
