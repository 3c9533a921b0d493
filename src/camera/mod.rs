use anyhow::Context;
use cgmath::InnerSpace;

use crate::{Bounds2f, Differential, Float, Point2f, Point2i, Point3f, Ray, RayDifferential, Transform, Vec2f, Vec3f};
use crate::film::{Film, FilmKind};
use crate::math::lerp;
use crate::sampling::sample_uniform_disk_concentric;
use crate::spectrum::{SampledSpectrum, SampledWavelengths};

mod orthographic;
mod perspective;

pub use orthographic::OrthographicCamera;
pub use perspective::PerspectiveCamera;

/// Where on the film and lens a camera ray starts, and when.
#[derive(Clone, Copy, Debug)]
pub struct CameraSample {
    pub p_film: Point2f,
    pub p_lens: Point2f,
    pub time: Float,
    pub filter_weight: Float,
}

#[derive(Clone, Copy, Debug)]
pub struct CameraRay {
    pub ray: Ray,
    pub weight: SampledSpectrum,
}

#[derive(Clone, Copy, Debug)]
pub struct CameraRayDifferential {
    pub ray: RayDifferential,
    pub weight: SampledSpectrum,
}

pub trait CameraKind<'a> {
    fn generate_ray(&self, sample: CameraSample, lambda: &SampledWavelengths) -> Option<CameraRay>;

    fn generate_ray_differential(
        &self,
        sample: CameraSample,
        lambda: &SampledWavelengths,
    ) -> Option<CameraRayDifferential>;

    fn film(&self) -> Film<'a>;

    fn sample_time(&self, u: Float) -> Float;

    fn camera_transform(&self) -> &Transform;
}

tagged_handle! {
    pub enum Camera<'a>: &'a {
        Perspective(PerspectiveCamera<'a>),
        Orthographic(OrthographicCamera<'a>),
    }
}

impl<'a> CameraKind<'a> for Camera<'a> {
    fn generate_ray(&self, sample: CameraSample, lambda: &SampledWavelengths) -> Option<CameraRay> {
        each_kind!(self, Perspective, Orthographic => |c| c.generate_ray(sample, lambda))
    }

    fn generate_ray_differential(
        &self,
        sample: CameraSample,
        lambda: &SampledWavelengths,
    ) -> Option<CameraRayDifferential> {
        each_kind!(self, Perspective, Orthographic => |c| c.generate_ray_differential(sample, lambda))
    }

    fn film(&self) -> Film<'a> {
        each_kind!(self, Perspective, Orthographic => |c| c.film())
    }

    fn sample_time(&self, u: Float) -> Float {
        each_kind!(self, Perspective, Orthographic => |c| c.sample_time(u))
    }

    fn camera_transform(&self) -> &Transform {
        match *self {
            Camera::Perspective(c) => c.camera_transform(),
            Camera::Orthographic(c) => c.camera_transform(),
        }
    }
}

/// State shared by every camera kind, embedded by value.
#[derive(Clone, Copy, Debug)]
pub struct CameraBase<'a> {
    camera_to_world: Transform,
    shutter_open: Float,
    shutter_close: Float,
    film: Film<'a>,
}

impl<'a> CameraBase<'a> {
    pub fn new(camera_to_world: Transform, shutter: (Float, Float), film: Film<'a>) -> Self {
        Self { camera_to_world, shutter_open: shutter.0, shutter_close: shutter.1, film }
    }

    /// Camera placed at `from` looking towards `at`.
    pub fn look_at(from: Point3f, at: Point3f, up: Vec3f, film: Film<'a>) -> anyhow::Result<Self> {
        let world_to_camera = Transform::look_at(from, at, up)
            .with_context(|| format!("degenerate camera: looking from {:?} to {:?} with up {:?}", from, at, up))?;
        Ok(Self::new(world_to_camera.inverse(), (0.0, 1.0), film))
    }

    pub fn film(&self) -> Film<'a> {
        self.film
    }

    pub fn camera_transform(&self) -> &Transform {
        &self.camera_to_world
    }

    pub fn sample_time(&self, u: Float) -> Float {
        lerp(u, self.shutter_open, self.shutter_close)
    }

    fn render_from_camera(&self, ray: Ray) -> Ray {
        self.camera_to_world.transform(ray)
    }

    /// Differentials by finite differences: shifts the film position by a small step in x and
    /// in y and scales the difference back up to a one-pixel offset.
    pub fn generate_ray_differential<C: CameraKind<'a> + ?Sized>(
        camera: &C,
        sample: CameraSample,
        lambda: &SampledWavelengths,
    ) -> Option<CameraRayDifferential> {
        let cr = camera.generate_ray(sample, lambda)?;
        let ray = cr.ray;

        let shifted = |shift: Vec2f| {
            [0.05, -0.05].into_iter().find_map(|eps: Float| {
                let s = CameraSample { p_film: sample.p_film + shift * eps, ..sample };
                camera.generate_ray(s, lambda).map(|r| {
                    (ray.origin + (r.ray.origin - ray.origin) / eps, ray.dir + (r.ray.dir - ray.dir) / eps)
                })
            })
        };

        let diff = match (shifted(Vec2f::new(1.0, 0.0)), shifted(Vec2f::new(0.0, 1.0))) {
            (Some((rx_origin, rx_dir)), Some((ry_origin, ry_dir))) => {
                Some(Differential { rx_origin, rx_dir, ry_origin, ry_dir })
            }
            _ => None,
        };
        Some(CameraRayDifferential { ray: RayDifferential::new(ray, diff), weight: cr.weight })
    }
}

/// Raster/screen/camera space transforms plus the thin lens, shared by the projective cameras.
#[derive(Clone, Copy, Debug)]
pub struct ProjectionBase {
    screen_from_camera: Transform,
    camera_from_raster: Transform,
    raster_from_screen: Transform,
    lens_radius: Float,
    focal_distance: Float,
}

impl ProjectionBase {
    pub fn new(
        screen_from_camera: Transform,
        full_resolution: Point2i,
        screen_window: Bounds2f,
        lens_radius: Float,
        focal_distance: Float,
    ) -> Self {
        let ndc_from_screen = Transform::scale(
            1.0 / (screen_window.max.x - screen_window.min.x),
            1.0 / (screen_window.max.y - screen_window.min.y),
            1.0,
        ) * Transform::translate(vec3f!(-screen_window.min.x, -screen_window.max.y, 0));
        // raster y grows downwards
        let raster_from_ndc = Transform::scale(full_resolution.x as Float, -full_resolution.y as Float, 1.0);
        let raster_from_screen = raster_from_ndc * ndc_from_screen;
        let camera_from_raster = screen_from_camera.inverse() * raster_from_screen.inverse();

        Self { screen_from_camera, camera_from_raster, raster_from_screen, lens_radius, focal_distance }
    }

    /// Screen window covering [-1, 1] along the shorter image axis.
    pub fn default_screen_window(full_resolution: Point2i) -> Bounds2f {
        let aspect = full_resolution.x as Float / full_resolution.y as Float;
        if aspect > 1.0 {
            Bounds2f::with_bounds(Point2f::new(-aspect, -1.0), Point2f::new(aspect, 1.0))
        } else {
            Bounds2f::with_bounds(Point2f::new(-1.0, -1.0 / aspect), Point2f::new(1.0, 1.0 / aspect))
        }
    }

    pub fn screen_from_camera(&self) -> &Transform {
        &self.screen_from_camera
    }

    pub fn raster_from_screen(&self) -> &Transform {
        &self.raster_from_screen
    }

    fn camera_point(&self, p_film: Point2f) -> Point3f {
        self.camera_from_raster.transform(Point3f::new(p_film.x, p_film.y, 0.0))
    }

    /// Bends a camera-space ray through a point on the lens so that it still passes through
    /// the same point on the plane of focus.
    fn apply_lens(&self, ray: &mut Ray, p_lens: Point2f) {
        if self.lens_radius <= 0.0 {
            return;
        }
        let lens = sample_uniform_disk_concentric(p_lens) * self.lens_radius;
        let ft = self.focal_distance / ray.dir.z;
        let p_focus = ray.at(ft);
        ray.origin = Point3f::new(lens.x, lens.y, 0.0);
        ray.dir = (p_focus - ray.origin).normalize();
    }
}
