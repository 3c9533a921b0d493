use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use cgmath::EuclideanSpace;
use parking_lot::Mutex;

use crate::{Bounds2f, Bounds2i, Float, Normal3, Point2f, Point2i, Point3f, Vec2f};
use crate::filter::{Filter, FilterKind};
use crate::interaction::SurfaceInteraction;
use crate::spectrum::{rgb_to_srgb8, to_rgb, SampledSpectrum, SampledWavelengths};

/// Geometry of the first visible surface along a camera ray. `set` stays false when the ray
/// hit nothing that scatters.
#[derive(Clone, Copy, Debug)]
pub struct VisibleSurface {
    pub set: bool,
    pub p: Point3f,
    pub n: Normal3,
    pub ns: Normal3,
    pub uv: Point2f,
    pub time: Float,
    pub dzdx: Float,
    pub dzdy: Float,
    pub albedo: SampledSpectrum,
}

impl VisibleSurface {
    pub fn new(si: &SurfaceInteraction, albedo: SampledSpectrum) -> Self {
        Self {
            set: true,
            p: si.p(),
            n: si.n(),
            ns: si.shading_n,
            uv: si.hit.uv,
            time: si.hit.time,
            dzdx: si.tex_diffs.dpdx.z,
            dzdy: si.tex_diffs.dpdy.z,
            albedo,
        }
    }
}

impl Default for VisibleSurface {
    fn default() -> Self {
        Self {
            set: false,
            p: Point3f::origin(),
            n: Normal3::zero(),
            ns: Normal3::zero(),
            uv: Point2f::origin(),
            time: 0.0,
            dzdx: 0.0,
            dzdy: 0.0,
            albedo: SampledSpectrum::zero(),
        }
    }
}

/// What every film kind shares: the image extent and the reconstruction filter.
#[derive(Clone, Debug)]
pub struct FilmBase {
    full_resolution: Point2i,
    pixel_bounds: Bounds2i,
    filter: Filter,
    /// Sensor diagonal in meters.
    diagonal: Float,
}

impl FilmBase {
    pub fn new(full_resolution: Point2i, pixel_bounds: Bounds2i, filter: Filter, diagonal_mm: Float) -> Self {
        Self { full_resolution, pixel_bounds, filter, diagonal: diagonal_mm * 0.001 }
    }

    /// A film covering the whole image.
    pub fn with_resolution(width: i32, height: i32, filter: Filter) -> Self {
        let bounds = Bounds2i::with_bounds(Point2i::new(0, 0), Point2i::new(width, height));
        Self::new(Point2i::new(width, height), bounds, filter, 35.0)
    }

    /// Region film positions are sampled from. It extends past the pixel bounds by the
    /// filter radius so edge pixels see as many samples as interior ones.
    pub fn sample_bounds(&self) -> Bounds2f {
        let radius = self.filter.radius();
        let half = Vec2f::new(0.5, 0.5);
        let min = Point2f::new(self.pixel_bounds.min.x as Float, self.pixel_bounds.min.y as Float);
        let max = Point2f::new(self.pixel_bounds.max.x as Float, self.pixel_bounds.max.y as Float);
        Bounds2f::with_bounds(min - radius + half, max + radius - half)
    }

    fn pixel_offset(&self, p: Point2i) -> usize {
        match self.pixel_bounds.offset_of(p) {
            Some(offset) => offset,
            None => panic!("pixel {:?} is outside the film bounds {:?}", p, self.pixel_bounds),
        }
    }

    /// Pixels touched by a splat at `p`, with their filter weights.
    fn splat_footprint(&self, p: Point2f) -> impl Iterator<Item = (usize, Float)> + '_ {
        let radius = self.filter.radius();
        let pd = Point2f::new(p.x + 0.5, p.y + 0.5);
        let bounds = Bounds2i::with_bounds(
            Point2i::new((pd.x - radius.x).floor() as i32, (pd.y - radius.y).floor() as i32),
            Point2i::new((pd.x + radius.x).floor() as i32 + 1, (pd.y + radius.y).floor() as i32 + 1),
        )
        .intersect(&self.pixel_bounds);

        bounds.iter_points().filter_map(move |pi| {
            let offset = Point2f::new(p.x - pi.x as Float - 0.5, p.y - pi.y as Float - 0.5);
            let wt = self.filter.evaluate(offset);
            let index = self.pixel_bounds.offset_of(pi)?;
            (wt != 0.0).then(|| (index, wt))
        })
    }
}

/// An f64 that can be added to from many threads at once.
#[derive(Debug, Default)]
struct AtomicDouble(AtomicU64);

impl AtomicDouble {
    fn add(&self, v: f64) {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + v).to_bits();
            match self.0.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
}

#[derive(Debug, Default)]
struct Splat([AtomicDouble; 3]);

impl Splat {
    fn add(&self, rgb: [Float; 3], weight: Float) {
        for (s, c) in self.0.iter().zip(rgb) {
            s.add((weight * c) as f64);
        }
    }

    fn get(&self) -> [f64; 3] {
        [self.0[0].get(), self.0[1].get(), self.0[2].get()]
    }
}

/// Clamps the brightest component of `rgb` down to `max`, keeping the hue.
fn clamp_rgb(rgb: [Float; 3], max: Float) -> [Float; 3] {
    let m = rgb[0].max(rgb[1]).max(rgb[2]);
    if m > max {
        let s = max / m;
        [rgb[0] * s, rgb[1] * s, rgb[2] * s]
    } else {
        rgb
    }
}

fn resolve_rgb(rgb_sum: [f64; 3], weight_sum: f64, splat: [f64; 3], splat_scale: Float, filter_integral: Float) -> [Float; 3] {
    let mut rgb = [0.0; 3];
    for c in 0..3 {
        if weight_sum != 0.0 {
            rgb[c] = (rgb_sum[c] / weight_sum) as Float;
        }
        rgb[c] += splat_scale * splat[c] as Float / filter_integral;
    }
    rgb
}

pub trait FilmKind {
    fn base(&self) -> &FilmBase;

    /// Accumulates a radiance sample into pixel `p`. Panics if `p` is outside the pixel bounds.
    fn add_sample(
        &self,
        p: Point2i,
        l: SampledSpectrum,
        lambda: &SampledWavelengths,
        visible_surface: Option<&VisibleSurface>,
        weight: Float,
    );

    /// Adds a contribution at an arbitrary film position. Safe to call from any thread for
    /// any position.
    fn add_splat(&self, p: Point2f, v: SampledSpectrum, lambda: &SampledWavelengths);

    fn get_pixel_rgb(&self, p: Point2i, splat_scale: Float) -> [Float; 3];

    fn uses_visible_surface(&self) -> bool;

    fn full_resolution(&self) -> Point2i {
        self.base().full_resolution
    }

    fn pixel_bounds(&self) -> Bounds2i {
        self.base().pixel_bounds
    }

    fn sample_bounds(&self) -> Bounds2f {
        self.base().sample_bounds()
    }

    fn diagonal(&self) -> Float {
        self.base().diagonal
    }

    fn filter(&self) -> &Filter {
        &self.base().filter
    }

    fn sample_wavelengths(&self, u: Float) -> SampledWavelengths {
        SampledWavelengths::sample_visible(u)
    }
}

tagged_handle! {
    pub enum Film<'a>: &'a {
        Rgb(RgbFilm),
        GBuffer(GBufferFilm),
    }
}

impl<'a> FilmKind for Film<'a> {
    fn base(&self) -> &FilmBase {
        match self {
            Film::Rgb(f) => f.base(),
            Film::GBuffer(f) => f.base(),
        }
    }

    fn add_sample(
        &self,
        p: Point2i,
        l: SampledSpectrum,
        lambda: &SampledWavelengths,
        visible_surface: Option<&VisibleSurface>,
        weight: Float,
    ) {
        each_kind!(self, Rgb, GBuffer => |f| f.add_sample(p, l, lambda, visible_surface, weight))
    }

    fn add_splat(&self, p: Point2f, v: SampledSpectrum, lambda: &SampledWavelengths) {
        each_kind!(self, Rgb, GBuffer => |f| f.add_splat(p, v, lambda))
    }

    fn get_pixel_rgb(&self, p: Point2i, splat_scale: Float) -> [Float; 3] {
        each_kind!(self, Rgb, GBuffer => |f| f.get_pixel_rgb(p, splat_scale))
    }

    fn uses_visible_surface(&self) -> bool {
        each_kind!(self, Rgb, GBuffer => |f| f.uses_visible_surface())
    }
}

impl<'a> Film<'a> {
    /// Linear RGB of every pixel, row-major over the pixel bounds.
    pub fn rgb_buffer(&self, splat_scale: Float) -> Vec<[Float; 3]> {
        self.pixel_bounds().iter_points().map(|p| self.get_pixel_rgb(p, splat_scale)).collect()
    }

    pub fn write_png(&self, path: impl AsRef<Path>, splat_scale: Float) -> anyhow::Result<()> {
        let path = path.as_ref();
        let bounds = self.pixel_bounds();
        let (w, h) = (bounds.diagonal().x.max(0) as u32, bounds.diagonal().y.max(0) as u32);
        let data: Vec<u8> = self.rgb_buffer(splat_scale).into_iter().flat_map(rgb_to_srgb8).collect();
        let img = image::RgbImage::from_raw(w, h, data)
            .with_context(|| format!("image buffer does not match {}x{}", w, h))?;
        img.save(path).with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), width = w, height = h, "wrote image");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RgbPixel {
    rgb_sum: [f64; 3],
    weight_sum: f64,
}

/// Accumulates filtered linear sRGB.
#[derive(Debug)]
pub struct RgbFilm {
    base: FilmBase,
    max_component_value: Float,
    pixels: Vec<Mutex<RgbPixel>>,
    splats: Vec<Splat>,
}

impl RgbFilm {
    pub fn new(base: FilmBase, max_component_value: Float) -> Self {
        let n = base.pixel_bounds.pixel_count();
        Self {
            base,
            max_component_value,
            pixels: (0..n).map(|_| Mutex::new(RgbPixel::default())).collect(),
            splats: (0..n).map(|_| Splat::default()).collect(),
        }
    }
}

impl FilmKind for RgbFilm {
    fn base(&self) -> &FilmBase {
        &self.base
    }

    fn add_sample(
        &self,
        p: Point2i,
        l: SampledSpectrum,
        lambda: &SampledWavelengths,
        _visible_surface: Option<&VisibleSurface>,
        weight: Float,
    ) {
        let rgb = clamp_rgb(to_rgb(l, lambda), self.max_component_value);
        let mut pixel = self.pixels[self.base.pixel_offset(p)].lock();
        for c in 0..3 {
            pixel.rgb_sum[c] += (weight * rgb[c]) as f64;
        }
        pixel.weight_sum += weight as f64;
    }

    fn add_splat(&self, p: Point2f, v: SampledSpectrum, lambda: &SampledWavelengths) {
        let rgb = clamp_rgb(to_rgb(v, lambda), self.max_component_value);
        for (index, wt) in self.base.splat_footprint(p) {
            self.splats[index].add(rgb, wt);
        }
    }

    fn get_pixel_rgb(&self, p: Point2i, splat_scale: Float) -> [Float; 3] {
        let offset = self.base.pixel_offset(p);
        let pixel = self.pixels[offset].lock();
        resolve_rgb(pixel.rgb_sum, pixel.weight_sum, self.splats[offset].get(), splat_scale, self.base.filter.integral())
    }

    fn uses_visible_surface(&self) -> bool {
        false
    }
}

#[derive(Debug, Default)]
struct GBufferPixel {
    rgb_sum: [f64; 3],
    weight_sum: f64,
    surface_weight_sum: f64,
    p_sum: [f64; 3],
    n_sum: [f64; 3],
    ns_sum: [f64; 3],
    albedo_sum: [f64; 3],
    dzdx_sum: f64,
    dzdy_sum: f64,
}

/// Filter-weighted averages of the first visible surface, next to the radiance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GBufferSample {
    pub p: Point3f,
    pub n: Normal3,
    pub ns: Normal3,
    pub albedo: [Float; 3],
    pub dzdx: Float,
    pub dzdy: Float,
}

/// Radiance plus auxiliary surface buffers, as used by denoisers.
#[derive(Debug)]
pub struct GBufferFilm {
    base: FilmBase,
    max_component_value: Float,
    pixels: Vec<Mutex<GBufferPixel>>,
    splats: Vec<Splat>,
}

impl GBufferFilm {
    pub fn new(base: FilmBase, max_component_value: Float) -> Self {
        let n = base.pixel_bounds.pixel_count();
        Self {
            base,
            max_component_value,
            pixels: (0..n).map(|_| Mutex::new(GBufferPixel::default())).collect(),
            splats: (0..n).map(|_| Splat::default()).collect(),
        }
    }

    pub fn get_pixel_gbuffer(&self, p: Point2i) -> GBufferSample {
        let pixel = self.pixels[self.base.pixel_offset(p)].lock();
        let inv = if pixel.surface_weight_sum != 0.0 { 1.0 / pixel.surface_weight_sum } else { 0.0 };
        let avg = |v: [f64; 3]| [(v[0] * inv) as Float, (v[1] * inv) as Float, (v[2] * inv) as Float];
        let [px, py, pz] = avg(pixel.p_sum);
        let [nx, ny, nz] = avg(pixel.n_sum);
        let [sx, sy, sz] = avg(pixel.ns_sum);
        GBufferSample {
            p: Point3f::new(px, py, pz),
            n: Normal3::new(nx, ny, nz),
            ns: Normal3::new(sx, sy, sz),
            albedo: avg(pixel.albedo_sum),
            dzdx: (pixel.dzdx_sum * inv) as Float,
            dzdy: (pixel.dzdy_sum * inv) as Float,
        }
    }
}

impl FilmKind for GBufferFilm {
    fn base(&self) -> &FilmBase {
        &self.base
    }

    fn add_sample(
        &self,
        p: Point2i,
        l: SampledSpectrum,
        lambda: &SampledWavelengths,
        visible_surface: Option<&VisibleSurface>,
        weight: Float,
    ) {
        let rgb = clamp_rgb(to_rgb(l, lambda), self.max_component_value);
        let mut pixel = self.pixels[self.base.pixel_offset(p)].lock();
        let w = weight as f64;
        for c in 0..3 {
            pixel.rgb_sum[c] += w * rgb[c] as f64;
        }
        pixel.weight_sum += w;

        if let Some(vs) = visible_surface.filter(|vs| vs.set) {
            let albedo = to_rgb(vs.albedo, lambda);
            let p = vs.p.to_vec();
            pixel.surface_weight_sum += w;
            for c in 0..3 {
                pixel.p_sum[c] += w * p[c] as f64;
                pixel.n_sum[c] += w * vs.n[c] as f64;
                pixel.ns_sum[c] += w * vs.ns[c] as f64;
                pixel.albedo_sum[c] += w * albedo[c] as f64;
            }
            pixel.dzdx_sum += w * vs.dzdx.abs() as f64;
            pixel.dzdy_sum += w * vs.dzdy.abs() as f64;
        }
    }

    fn add_splat(&self, p: Point2f, v: SampledSpectrum, lambda: &SampledWavelengths) {
        let rgb = clamp_rgb(to_rgb(v, lambda), self.max_component_value);
        for (index, wt) in self.base.splat_footprint(p) {
            self.splats[index].add(rgb, wt);
        }
    }

    fn get_pixel_rgb(&self, p: Point2i, splat_scale: Float) -> [Float; 3] {
        let offset = self.base.pixel_offset(p);
        let pixel = self.pixels[offset].lock();
        resolve_rgb(pixel.rgb_sum, pixel.weight_sum, self.splats[offset].get(), splat_scale, self.base.filter.integral())
    }

    fn uses_visible_surface(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{BoxFilter, FilterType};
    use crate::spectrum::LAMBDA_MIN;
    use approx::assert_relative_eq;
    use rayon::prelude::*;

    fn unit_spectrum() -> (SampledSpectrum, SampledWavelengths) {
        let lambda = SampledWavelengths::sample_uniform(0.5, LAMBDA_MIN, 830.0);
        (SampledSpectrum::one(), lambda)
    }

    #[test]
    fn sample_bounds_extend_by_filter_radius() {
        let base = FilmBase::with_resolution(4, 2, Filter::create(FilterType::Triangle, Vec2f::new(2.0, 2.0)));
        let sb = base.sample_bounds();
        assert_eq!(sb.min, point2f!(-1.5, -1.5));
        assert_eq!(sb.max, point2f!(5.5, 3.5));
    }

    #[test]
    fn weighted_average_of_samples() {
        let film = RgbFilm::new(FilmBase::with_resolution(2, 2, Filter::default()), Float::INFINITY);
        let (l, lambda) = unit_spectrum();
        film.add_sample(Point2i::new(1, 0), l, &lambda, None, 1.0);
        film.add_sample(Point2i::new(1, 0), l * 3.0, &lambda, None, 1.0);
        let avg = film.get_pixel_rgb(Point2i::new(1, 0), 1.0);
        let single = to_rgb(l * 2.0, &lambda);
        for c in 0..3 {
            assert_relative_eq!(avg[c], single[c], max_relative = 1e-5);
        }
        assert_eq!(film.get_pixel_rgb(Point2i::new(0, 1), 1.0), [0.0; 3]);
    }

    #[test]
    #[should_panic(expected = "outside the film bounds")]
    fn out_of_bounds_sample_panics() {
        let film = RgbFilm::new(FilmBase::with_resolution(2, 2, Filter::default()), Float::INFINITY);
        let (l, lambda) = unit_spectrum();
        film.add_sample(Point2i::new(2, 0), l, &lambda, None, 1.0);
    }

    #[test]
    fn concurrent_splats_all_land() {
        let base = FilmBase::with_resolution(4, 4, BoxFilter::new(Vec2f::new(0.5, 0.5)).into());
        let film = RgbFilm::new(base, Float::INFINITY);
        let (l, lambda) = unit_spectrum();
        (0..1000).into_par_iter().for_each(|_| film.add_splat(point2f!(2.5, 1.5), l, &lambda));
        let rgb = film.get_pixel_rgb(Point2i::new(2, 1), 1.0);
        let one = to_rgb(l, &lambda);
        assert_relative_eq!(rgb[1], 1000.0 * one[1], max_relative = 1e-4);
        // box of radius 0.5 centred on the pixel touches nothing else
        assert_eq!(film.get_pixel_rgb(Point2i::new(1, 1), 1.0), [0.0; 3]);
    }

    #[test]
    fn gbuffer_averages_visible_surface() {
        let film = GBufferFilm::new(FilmBase::with_resolution(1, 1, Filter::default()), Float::INFINITY);
        let (l, lambda) = unit_spectrum();
        let vs = |z: Float| VisibleSurface {
            set: true,
            p: point3f!(0, 0, z),
            n: Normal3::new(0.0, 0.0, 1.0),
            ns: Normal3::new(0.0, 0.0, 1.0),
            uv: point2f!(0, 0),
            time: 0.0,
            dzdx: 0.5,
            dzdy: -0.5,
            albedo: SampledSpectrum::uniform(0.5),
        };
        film.add_sample(Point2i::new(0, 0), l, &lambda, Some(&vs(1.0)), 1.0);
        film.add_sample(Point2i::new(0, 0), l, &lambda, Some(&vs(3.0)), 1.0);
        // an unset surface still adds radiance but leaves the surface averages alone
        film.add_sample(Point2i::new(0, 0), l, &lambda, Some(&VisibleSurface::default()), 1.0);
        let g = film.get_pixel_gbuffer(Point2i::new(0, 0));
        assert_relative_eq!(g.p.z, 2.0);
        assert_relative_eq!(g.dzdy, 0.5);
        assert!(Film::from(&film).uses_visible_surface());
    }
}
