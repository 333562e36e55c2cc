use crate::math::IRect;
use crate::vec::IVec2;

/// Returns the oriented area of the parallelogram formed by the points `from`, `to`, `p`,
/// `from + (p - to)`.
///
/// Screen space has `y` pointing down, so the value is positive when `p` lies clockwise from
/// `to` as seen on screen, that is, to the right when standing at `from` looking at `to`.
///
/// `orient_2d(A, B, C)` is also twice the signed area of the triangle `ABC`.
#[inline(always)]
pub fn orient_2d(from: IVec2, to: IVec2, p: IVec2) -> i64 {
    let u = to - from;
    let v = p - from;
    u.x * v.y - u.y * v.x
}

/// A projected triangle in sub-pixel integer coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntTriangle {
    pub corners: [IVec2; 3],
    /// Corners wind clockwise on screen.
    pub front_facing: bool,
    /// Twice the signed area in square sub-pixels.
    pub area2: i64,
    pub min: IVec2,
    pub max: IVec2,
}

impl IntTriangle {
    pub fn new(corners: [IVec2; 3]) -> Self {
        let [a, b, c] = corners;
        let area2 = orient_2d(a, b, c);
        IntTriangle {
            corners,
            front_facing: area2 > 0,
            area2,
            min: IVec2::new(a.x.min(b.x).min(c.x), a.y.min(b.y).min(c.y)),
            max: IVec2::new(a.x.max(b.x).max(c.x), a.y.max(b.y).max(c.y)),
        }
    }

    /// True when the triangle has no area.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.area2 == 0
    }

    /// Pixel rectangle that can contain covered pixel centers.
    pub fn pixel_bounds(&self) -> IRect {
        let sub = crate::camera::SUB_PIXEL_BITS;
        let x0 = (self.min.x >> sub) as i32;
        let y0 = (self.min.y >> sub) as i32;
        let x1 = (self.max.x >> sub) as i32 + 1;
        let y1 = (self.max.y >> sub) as i32 + 1;
        IRect::new(x0, y0, x1 - x0, y1 - y0)
    }
}
