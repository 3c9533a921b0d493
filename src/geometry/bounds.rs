use cgmath::{BaseNum, EuclideanSpace, InnerSpace, MetricSpace, Point2, Vector2};

use crate::{Float, Point2f, Point2i, Point3f, Vec3f};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds2<S: BaseNum> {
    pub min: Point2<S>,
    pub max: Point2<S>,
}

pub type Bounds2i = Bounds2<i32>;
pub type Bounds2f = Bounds2<Float>;

fn partial_min<S: PartialOrd>(a: S, b: S) -> S {
    if b < a { b } else { a }
}

fn partial_max<S: PartialOrd>(a: S, b: S) -> S {
    if b > a { b } else { a }
}

impl<S: BaseNum> Bounds2<S> {
    pub fn with_bounds(min: Point2<S>, max: Point2<S>) -> Self {
        Self { min, max }
    }

    pub fn new(p1: Point2<S>, p2: Point2<S>) -> Self {
        Self {
            min: Point2::new(partial_min(p1.x, p2.x), partial_min(p1.y, p2.y)),
            max: Point2::new(partial_max(p1.x, p2.x), partial_max(p1.y, p2.y)),
        }
    }

    pub fn diagonal(&self) -> Vector2<S> {
        self.max - self.min
    }

    pub fn area(&self) -> S {
        let d = self.diagonal();
        d.x * d.y
    }

    pub fn is_empty(&self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y
    }

    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            min: Point2::new(partial_max(self.min.x, other.min.x), partial_max(self.min.y, other.min.y)),
            max: Point2::new(partial_min(self.max.x, other.max.x), partial_min(self.max.y, other.max.y)),
        }
    }

    /// Inside test that excludes the upper edges, matching integer pixel ranges.
    pub fn inside_exclusive(&self, p: Point2<S>) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }
}

impl Bounds2i {
    /// Iterates the integer points in the bounds, row by row.
    pub fn iter_points(&self) -> impl Iterator<Item = Point2i> {
        let Bounds2i { min, max } = *self;
        (min.y..max.y).flat_map(move |y| (min.x..max.x).map(move |x| Point2i::new(x, y)))
    }

    /// Splits the bounds into `tile_size` squares, clipped at the edges, in row-major order.
    pub fn tiles(&self, tile_size: i32) -> impl Iterator<Item = Bounds2i> {
        let tile_size = tile_size.max(1);
        let bounds = *self;
        let d = bounds.diagonal();
        let n_x = (d.x.max(0) + tile_size - 1) / tile_size;
        let n_y = (d.y.max(0) + tile_size - 1) / tile_size;
        (0..n_y).flat_map(move |ty| {
            (0..n_x).map(move |tx| {
                let min = Point2i::new(bounds.min.x + tx * tile_size, bounds.min.y + ty * tile_size);
                let max = Point2i::new(
                    (min.x + tile_size).min(bounds.max.x),
                    (min.y + tile_size).min(bounds.max.y),
                );
                Bounds2i::with_bounds(min, max)
            })
        })
    }

    pub fn pixel_count(&self) -> usize {
        if self.is_empty() { 0 } else { self.area() as usize }
    }

    /// Row-major offset of `p` in the bounds, `None` outside of them.
    pub fn offset_of(&self, p: Point2i) -> Option<usize> {
        if !self.inside_exclusive(p) {
            return None;
        }
        let width = self.max.x - self.min.x;
        Some(((p.y - self.min.y) * width + (p.x - self.min.x)) as usize)
    }
}

impl From<Bounds2i> for Bounds2f {
    fn from(b: Bounds2i) -> Self {
        Bounds2f::with_bounds(
            Point2f::new(b.min.x as Float, b.min.y as Float),
            Point2f::new(b.max.x as Float, b.max.y as Float),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds3f {
    pub min: Point3f,
    pub max: Point3f,
}

impl Bounds3f {
    pub fn empty() -> Self {
        Self {
            min: Point3f::new(Float::INFINITY, Float::INFINITY, Float::INFINITY),
            max: Point3f::new(Float::NEG_INFINITY, Float::NEG_INFINITY, Float::NEG_INFINITY),
        }
    }

    pub fn new(p1: Point3f, p2: Point3f) -> Self {
        Self {
            min: Point3f::new(p1.x.min(p2.x), p1.y.min(p2.y), p1.z.min(p2.z)),
            max: Point3f::new(p1.x.max(p2.x), p1.y.max(p2.y), p1.z.max(p2.z)),
        }
    }

    pub fn from_point(p: Point3f) -> Self {
        Self { min: p, max: p }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn union(&self, other: &Bounds3f) -> Self {
        Self {
            min: Point3f::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y), self.min.z.min(other.min.z)),
            max: Point3f::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y), self.max.z.max(other.max.z)),
        }
    }

    pub fn union_point(&self, p: Point3f) -> Self {
        self.union(&Self::from_point(p))
    }

    pub fn diagonal(&self) -> Vec3f {
        self.max - self.min
    }

    pub fn centroid(&self) -> Point3f {
        self.min.midpoint(self.max)
    }

    pub fn inside(&self, p: Point3f) -> bool {
        p.x >= self.min.x && p.x <= self.max.x
            && p.y >= self.min.y && p.y <= self.max.y
            && p.z >= self.min.z && p.z <= self.max.z
    }

    pub fn corners(&self) -> [Point3f; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3f::new(a.x, a.y, a.z),
            Point3f::new(b.x, a.y, a.z),
            Point3f::new(a.x, b.y, a.z),
            Point3f::new(b.x, b.y, a.z),
            Point3f::new(a.x, a.y, b.z),
            Point3f::new(b.x, a.y, b.z),
            Point3f::new(a.x, b.y, b.z),
            Point3f::new(b.x, b.y, b.z),
        ]
    }

    /// Center and radius of a sphere enclosing the bounds. Empty bounds give a zero radius.
    pub fn bounding_sphere(&self) -> (Point3f, Float) {
        if self.is_empty() {
            return (Point3f::origin(), 0.0);
        }
        let center = self.centroid();
        let radius = if self.inside(center) { center.distance(self.max) } else { 0.0 };
        (center, radius)
    }

    pub fn surface_area(&self) -> Float {
        let d = self.diagonal();
        2.0 * (d.x * d.y + d.x * d.z + d.y * d.z)
    }

    pub fn radius(&self) -> Float {
        self.diagonal().magnitude() / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiles_cover_bounds_exactly_once() {
        let b = Bounds2i::with_bounds(Point2i::new(0, 0), Point2i::new(37, 21));
        let mut hits = vec![0u32; 37 * 21];
        for tile in b.tiles(16) {
            for p in tile.iter_points() {
                hits[b.offset_of(p).unwrap()] += 1;
            }
        }
        assert!(hits.iter().all(|&h| h == 1));
        assert_eq!(b.tiles(16).count(), 3 * 2);
    }

    #[test]
    fn iter_points_is_row_major() {
        let b = Bounds2i::with_bounds(Point2i::new(1, 2), Point2i::new(3, 4));
        let pts: Vec<_> = b.iter_points().map(|p| (p.x, p.y)).collect();
        assert_eq!(pts, vec![(1, 2), (2, 2), (1, 3), (2, 3)]);
    }

    #[test]
    fn offset_outside_is_none() {
        let b = Bounds2i::with_bounds(Point2i::new(0, 0), Point2i::new(4, 4));
        assert_eq!(b.offset_of(Point2i::new(4, 0)), None);
        assert_eq!(b.offset_of(Point2i::new(3, 3)), Some(15));
    }

    #[test]
    fn bounding_sphere_contains_corners() {
        let b = Bounds3f::new(point3f!(-1, 0, 2), point3f!(3, 1, 5));
        let (c, r) = b.bounding_sphere();
        for p in b.corners().iter() {
            assert!(c.distance(*p) <= r * 1.0001);
        }
        assert_eq!(Bounds3f::empty().bounding_sphere().1, 0.0);
    }
}
