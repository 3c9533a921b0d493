#[macro_use] pub mod macros; // must stay at the top
pub mod handle;
pub mod math;
pub mod geometry;
pub mod sampling;
pub mod spectrum;
pub mod interaction;
pub mod shapes;
pub mod primitive;
pub mod fresnel;
pub mod reflection;
pub mod material;
pub mod light;
pub mod lightsampler;
pub mod filter;
pub mod film;
pub mod sampler;
pub mod camera;
pub mod integrator;
pub mod profile;
pub mod config;

pub use geometry::*;
pub use handle::{Member, Tagged, Visit};
pub use interaction::{SurfaceHit, SurfaceInteraction};
pub use math::*;

use cgmath::{Point2, Point3, Vector2, Vector3};

pub type Float = f32;

pub type Point2f = Point2<Float>;
pub type Point2i = Point2<i32>;
pub type Point3f = Point3<Float>;
pub type Vec2f = Vector2<Float>;
pub type Vec2i = Vector2<i32>;
pub type Vec3f = Vector3<Float>;
