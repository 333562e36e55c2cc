use crate::simd::F32x4;
use crate::simd_config::{QUAD_CENTER_X, QUAD_CENTER_Y};
use crate::vec::Vec3;

use super::common::IntTriangle;

/// A quantity that is affine in screen space: `origin + dx * x + dy * y` at pixel coordinates
/// `(x, y)`. Pixel centers sit at half-integer coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlaneEquation {
    pub origin: f32,
    pub dx: f32,
    pub dy: f32,
}

impl PlaneEquation {
    /// Plane through `values` at the triangle's corners.
    pub fn new(tri: &IntTriangle, values: [f32; 3]) -> Self {
        let scale = 1.0 / crate::camera::SUB_PIXELS as f64;
        let [p0, p1, p2] = tri.corners.map(|p| (p.x as f64 * scale, p.y as f64 * scale));
        let [f0, f1, f2] = values.map(f64::from);
        let (ux, uy) = (p1.0 - p0.0, p1.1 - p0.1);
        let (vx, vy) = (p2.0 - p0.0, p2.1 - p0.1);
        let area = ux * vy - uy * vx;
        if area == 0.0 {
            return PlaneEquation {
                origin: f0 as f32,
                dx: 0.0,
                dy: 0.0,
            };
        }
        let (df1, df2) = (f1 - f0, f2 - f0);
        let dx = (df1 * vy - df2 * uy) / area;
        let dy = (df2 * ux - df1 * vx) / area;
        PlaneEquation {
            origin: (f0 - dx * p0.0 - dy * p0.1) as f32,
            dx: dx as f32,
            dy: dy as f32,
        }
    }

    #[inline(always)]
    pub fn at(&self, x: f32, y: f32) -> f32 {
        self.origin + self.dx * x + self.dy * y
    }

    /// Values at the four pixel centers of the quad whose top-left pixel is `(x, y)`.
    #[inline(always)]
    pub fn at_quad(&self, x: i32, y: i32) -> F32x4 {
        let corner = self.at(x as f32, y as f32);
        F32x4::splat(corner) + QUAD_CENTER_X * self.dx + QUAD_CENTER_Y * self.dy
    }
}

/// Interpolated values for the four pixels of a quad.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QuadWeights {
    /// Value stored in the depth buffer: `1 / z` for perspective draws and `z` otherwise.
    pub depth: F32x4,
    /// Weight of the source triangle's `B` corner.
    pub b: F32x4,
    /// Weight of the source triangle's `C` corner.
    pub c: F32x4,
}

impl QuadWeights {
    #[inline(always)]
    pub fn a(&self) -> F32x4 {
        F32x4::splat(1.0) - self.b - self.c
    }
}

/// Plane equations of one sub-triangle.
///
/// Perspective draws interpolate `1 / z`, `b / z` and `c / z`, all of which are affine in
/// screen space, and divide at each pixel. Orthogonal draws interpolate `z`, `b` and `c`
/// directly. `b` and `c` are weights of the source triangle, so a clipped piece interpolates
/// the same attributes the whole triangle would.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Projection {
    pub depth: PlaneEquation,
    pub b: PlaneEquation,
    pub c: PlaneEquation,
}

impl Projection {
    /// `depths` are camera space depths of the corners, `sub_b` and `sub_c` their source
    /// weights.
    pub fn new(tri: &IntTriangle, depths: [f32; 3], sub_b: Vec3, sub_c: Vec3, perspective: bool) -> Self {
        let b = [sub_b.x, sub_b.y, sub_b.z];
        let c = [sub_c.x, sub_c.y, sub_c.z];
        if perspective {
            let inv = depths.map(|z| 1.0 / z);
            Projection {
                depth: PlaneEquation::new(tri, inv),
                b: PlaneEquation::new(tri, std::array::from_fn(|i| b[i] * inv[i])),
                c: PlaneEquation::new(tri, std::array::from_fn(|i| c[i] * inv[i])),
            }
        } else {
            Projection {
                depth: PlaneEquation::new(tri, depths),
                b: PlaneEquation::new(tri, b),
                c: PlaneEquation::new(tri, c),
            }
        }
    }

    /// Depth buffer values only.
    pub fn depth_only(tri: &IntTriangle, depths: [f32; 3], perspective: bool) -> PlaneEquation {
        if perspective {
            PlaneEquation::new(tri, depths.map(|z| 1.0 / z))
        } else {
            PlaneEquation::new(tri, depths)
        }
    }

    #[inline(always)]
    pub fn quad<const PERSPECTIVE: bool>(&self, x: i32, y: i32) -> QuadWeights {
        let depth = self.depth.at_quad(x, y);
        let b = self.b.at_quad(x, y);
        let c = self.c.at_quad(x, y);
        if PERSPECTIVE {
            let z = depth.reciprocal();
            QuadWeights { depth, b: b * z, c: c * z }
        } else {
            QuadWeights { depth, b, c }
        }
    }
}
