use crate::Float;
use crate::geometry::{Bounds3f, Ray};
use crate::light::Light;
use crate::material::Material;
use crate::shapes::{Shape, ShapeIntersection, ShapeKind};

pub trait PrimitiveKind<'a> {
    fn bounds(&self) -> Bounds3f;

    fn intersect(&self, ray: &Ray, t_max: Float) -> Option<ShapeIntersection<'a>>;

    fn intersect_p(&self, ray: &Ray, t_max: Float) -> bool;
}

tagged_handle! {
    pub enum Primitive<'a>: &'a {
        Geometric(GeometricPrimitive<'a>),
        List(PrimitiveList<'a>),
    }
}

impl<'a> PrimitiveKind<'a> for Primitive<'a> {
    fn bounds(&self) -> Bounds3f {
        each_kind!(self, Geometric, List => |p| p.bounds())
    }

    fn intersect(&self, ray: &Ray, t_max: Float) -> Option<ShapeIntersection<'a>> {
        each_kind!(self, Geometric, List => |p| p.intersect(ray, t_max))
    }

    fn intersect_p(&self, ray: &Ray, t_max: Float) -> bool {
        each_kind!(self, Geometric, List => |p| p.intersect_p(ray, t_max))
    }
}

/// A shape bound to the material that shades it and the area light that makes it emissive.
pub struct GeometricPrimitive<'a> {
    shape: Shape<'a>,
    material: Option<Material<'a>>,
    area_light: Option<Light<'a>>,
}

impl<'a> GeometricPrimitive<'a> {
    pub fn new(shape: Shape<'a>, material: Option<Material<'a>>, area_light: Option<Light<'a>>) -> Self {
        Self { shape, material, area_light }
    }

    pub fn shape(&self) -> Shape<'a> {
        self.shape
    }
}

impl<'a> PrimitiveKind<'a> for GeometricPrimitive<'a> {
    fn bounds(&self) -> Bounds3f {
        self.shape.bounds()
    }

    fn intersect(&self, ray: &Ray, t_max: Float) -> Option<ShapeIntersection<'a>> {
        let mut si = self.shape.intersect(ray, t_max)?;
        si.intr.material = self.material;
        si.intr.area_light = self.area_light;
        Some(si)
    }

    fn intersect_p(&self, ray: &Ray, t_max: Float) -> bool {
        self.shape.intersect_p(ray, t_max)
    }
}

/// Tests every primitive in turn. Stands in for an acceleration structure.
pub struct PrimitiveList<'a> {
    prims: Vec<Primitive<'a>>,
    bounds: Bounds3f,
}

impl<'a> PrimitiveList<'a> {
    pub fn new(prims: Vec<Primitive<'a>>) -> Self {
        let bounds = prims.iter().fold(Bounds3f::empty(), |b, p| b.union(&p.bounds()));
        Self { prims, bounds }
    }

    pub fn len(&self) -> usize {
        self.prims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prims.is_empty()
    }
}

impl<'a> PrimitiveKind<'a> for PrimitiveList<'a> {
    fn bounds(&self) -> Bounds3f {
        self.bounds
    }

    fn intersect(&self, ray: &Ray, t_max: Float) -> Option<ShapeIntersection<'a>> {
        let mut closest = None;
        let mut t_max = t_max;
        for prim in &self.prims {
            if let Some(si) = prim.intersect(ray, t_max) {
                t_max = si.t_hit;
                closest = Some(si);
            }
        }
        closest
    }

    fn intersect_p(&self, ray: &Ray, t_max: Float) -> bool {
        self.prims.iter().any(|p| p.intersect_p(ray, t_max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Sphere;
    use approx::assert_abs_diff_eq;

    #[test]
    fn list_returns_the_nearest_hit() {
        let near = Sphere::new(point3f!(0, 0, 0), 1.0, false);
        let far = Sphere::new(point3f!(0, 0, -5), 1.0, false);
        let (gn, gf) = (
            GeometricPrimitive::new(Shape::from(&near), None, None),
            GeometricPrimitive::new(Shape::from(&far), None, None),
        );
        // the far sphere first, so the list has to keep looking
        let list = PrimitiveList::new(vec![Primitive::from(&gf), Primitive::from(&gn)]);
        let ray = Ray::new(point3f!(0, 0, 5), vec3f!(0, 0, -1));
        let si = list.intersect(&ray, Float::INFINITY).unwrap();
        assert_abs_diff_eq!(si.t_hit, 4.0, epsilon = 1e-5);
        assert!(list.intersect_p(&ray, 3.0) == false);
        assert_abs_diff_eq!(list.bounds().min.z, -6.0);
    }
}
