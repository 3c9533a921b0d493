use crate::{Float, Point3f, Ray, Transform};
use crate::camera::{CameraBase, CameraKind, CameraRay, CameraRayDifferential, CameraSample, ProjectionBase};
use crate::film::{Film, FilmKind};
use crate::spectrum::{SampledSpectrum, SampledWavelengths};

/// Parallel projection: every ray leaves the film plane along the camera's +z axis.
#[derive(Debug)]
pub struct OrthographicCamera<'a> {
    base: CameraBase<'a>,
    proj: ProjectionBase,
}

impl<'a> OrthographicCamera<'a> {
    pub fn new(base: CameraBase<'a>, lens_radius: Float, focal_distance: Float) -> Self {
        let res = base.film().full_resolution();
        let proj = ProjectionBase::new(
            Transform::orthographic(0.0, 1.0),
            res,
            ProjectionBase::default_screen_window(res),
            lens_radius,
            focal_distance,
        );
        Self { base, proj }
    }
}

impl<'a> CameraKind<'a> for OrthographicCamera<'a> {
    fn generate_ray(&self, sample: CameraSample, _lambda: &SampledWavelengths) -> Option<CameraRay> {
        let p_camera = self.proj.camera_point(sample.p_film);
        let mut ray = Ray {
            origin: Point3f::new(p_camera.x, p_camera.y, 0.0),
            dir: vec3f!(0, 0, 1),
            time: self.base.sample_time(sample.time),
        };
        if self.proj.lens_radius > 0.0 {
            // the lens is centred on the film point rather than the camera origin
            let centre = ray.origin;
            ray.origin = Point3f::new(0.0, 0.0, 0.0);
            self.proj.apply_lens(&mut ray, sample.p_lens);
            ray.origin += vec3f!(centre.x, centre.y, 0);
        }
        Some(CameraRay { ray: self.base.render_from_camera(ray), weight: SampledSpectrum::one() })
    }

    fn generate_ray_differential(
        &self,
        sample: CameraSample,
        lambda: &SampledWavelengths,
    ) -> Option<CameraRayDifferential> {
        CameraBase::generate_ray_differential(self, sample, lambda)
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
    use crate::Point2f;
    use crate::film::{FilmBase, RgbFilm};
    use crate::filter::Filter;
    use approx::assert_relative_eq;

    #[test]
    fn rays_are_parallel_and_offset_by_the_film_position() {
        let film = RgbFilm::new(FilmBase::with_resolution(20, 10, Filter::default()), Float::INFINITY);
        let camera = OrthographicCamera::new(CameraBase::new(Transform::IDENTITY, (0.0, 1.0), Film::from(&film)), 0.0, 1.0);
        let lambda = SampledWavelengths::sample_visible(0.5);
        let at = |x: Float, y: Float| {
            let s = CameraSample { p_film: Point2f::new(x, y), p_lens: Point2f::new(0.5, 0.5), time: 0.0, filter_weight: 1.0 };
            camera.generate_ray(s, &lambda).unwrap().ray
        };
        let corner = at(0.0, 0.0);
        let centre = at(10.0, 5.0);
        assert_eq!(corner.dir, centre.dir);
        // aspect 2: the screen window is [-2, 2] x [-1, 1]
        assert_relative_eq!(corner.origin, point3f!(-2, 1, 0), epsilon = 1e-5);
        assert_relative_eq!(centre.origin, point3f!(0, 0, 0), epsilon = 1e-5);

        let rd = camera.generate_ray_differential(CameraSample {
            p_film: Point2f::new(10.0, 5.0), p_lens: Point2f::new(0.5, 0.5), time: 0.0, filter_weight: 1.0,
        }, &lambda).unwrap().ray;
        let diff = rd.diff.unwrap();
        assert_relative_eq!(diff.rx_origin.x - rd.ray.origin.x, 0.2, epsilon = 1e-3);
        assert_relative_eq!(diff.rx_dir, rd.ray.dir, epsilon = 1e-5);
    }
}
