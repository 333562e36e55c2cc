//! Triangle to row conversion.
//!
//! A pixel `(x, y)` is covered when its center `(x + 0.5, y + 0.5)` lies strictly right of the
//! left edge, at or left of the right edge, at or below the top vertex and strictly above the
//! bottom vertex. Columns are computed exactly with integer division in sub-pixel units, so
//! triangles sharing an edge never both cover a pixel and never leave a gap between them.

use crate::camera::SUB_PIXELS;
use crate::math::IRect;
use crate::simd::{I32x4, U32x4};
use crate::simd_config::QUAD_X;
use crate::vec::IVec2;

use super::common::IntTriangle;

const HALF_PIXEL: i64 = SUB_PIXELS / 2;

/// Covered columns `[left, right)` of one pixel row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RowInterval {
    pub left: i32,
    pub right: i32,
}

impl RowInterval {
    pub const EMPTY: RowInterval = RowInterval { left: 0, right: 0 };

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.right <= self.left
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        (self.right - self.left).max(0) as usize
    }

    /// Columns rounded outwards to even boundaries.
    #[inline(always)]
    pub fn aligned(&self) -> (i32, i32) {
        (self.left & !1, (self.right + 1) & !1)
    }
}

/// Rows of a triangle starting at an even row. Rows outside the triangle or the clip
/// rectangle are empty.
#[derive(Clone, Copy, Debug)]
pub struct RowShape<'a> {
    pub start_row: i32,
    pub rows: &'a [RowInterval],
}

impl<'a> RowShape<'a> {
    pub fn end_row(&self) -> i32 {
        self.start_row + self.rows.len() as i32
    }

    pub fn row(&self, y: i32) -> RowInterval {
        let index = y - self.start_row;
        if index < 0 {
            return RowInterval::EMPTY;
        }
        self.rows.get(index as usize).copied().unwrap_or(RowInterval::EMPTY)
    }

    pub fn covered_pixels(&self) -> usize {
        self.rows.iter().map(RowInterval::len).sum()
    }

    /// Pairs of rows forming one line of 2x2 quads, skipping pairs that cover nothing.
    pub fn row_pairs(&self) -> impl Iterator<Item = RowPair> + 'a {
        let start = self.start_row;
        self.rows.chunks(2).enumerate().filter_map(move |(i, pair)| {
            let top = pair[0];
            let bottom = pair.get(1).copied().unwrap_or(RowInterval::EMPTY);
            let pair = RowPair { y: start + 2 * i as i32, top, bottom };
            (!top.is_empty() || !bottom.is_empty()).then_some(pair)
        })
    }
}

/// Two rows starting at the even row `y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowPair {
    pub y: i32,
    pub top: RowInterval,
    pub bottom: RowInterval,
}

impl RowPair {
    /// Even-aligned column range covering both rows.
    pub fn span(&self) -> (i32, i32) {
        let (left, right) = match (self.top.is_empty(), self.bottom.is_empty()) {
            (false, false) => (self.top.left.min(self.bottom.left), self.top.right.max(self.bottom.right)),
            (false, true) => (self.top.left, self.top.right),
            (true, false) => (self.bottom.left, self.bottom.right),
            (true, true) => return (0, 0),
        };
        RowInterval { left, right }.aligned()
    }

    /// Even-aligned column range of quads whose four pixels are all covered.
    pub fn full_span(&self) -> (i32, i32) {
        if self.top.is_empty() || self.bottom.is_empty() {
            return (0, 0);
        }
        let left = (self.top.left.max(self.bottom.left) + 1) & !1;
        let right = self.top.right.min(self.bottom.right) & !1;
        (left, right.max(left))
    }

    /// Lane mask of the covered pixels of the quad at column `x`.
    #[inline(always)]
    pub fn quad_mask(&self, x: i32) -> U32x4 {
        let xs = I32x4::splat(x) + QUAD_X;
        let lefts = I32x4::new(self.top.left, self.top.left, self.bottom.left, self.bottom.left);
        let rights = I32x4::new(self.top.right, self.top.right, self.bottom.right, self.bottom.right);
        xs.lanes_ge(lefts) & xs.lanes_lt(rights)
    }
}

/// `ceil(value / 256)` for sub-pixel values.
#[inline(always)]
fn ceil_pixel(value: i64) -> i64 {
    -(-value).div_euclid(SUB_PIXELS)
}

/// First pixel row whose center is at or below `sub_y`.
#[inline(always)]
fn first_row_from(sub_y: i64) -> i64 {
    ceil_pixel(sub_y - HALF_PIXEL)
}

/// Exact covered row range of the triangle clipped to `clip`, may be empty.
fn exact_rows(tri: &IntTriangle, clip: IRect) -> (i64, i64) {
    let first = first_row_from(tri.min.y).max(clip.y as i64);
    let last = first_row_from(tri.max.y).min(clip.bottom() as i64);
    (first, last.max(first))
}

/// Number of row intervals [`rasterize_rows`] writes for this triangle and clip rectangle.
pub fn row_buffer_len(tri: &IntTriangle, clip: IRect) -> usize {
    let (first, last) = exact_rows(tri, clip);
    if first == last {
        return 0;
    }
    (((last + 1) & !1) - (first & !1)) as usize
}

/// Walks an edge downwards one pixel row at a time, yielding the first column whose center
/// lies strictly right of the edge.
///
/// The column is `floor((x - 128) / 256) + 1` where `x` is the edge position at the row's
/// center. It is stepped with an integer remainder, so it stays exact for any row count.
struct EdgeWalker {
    column: i64,
    remainder: i64,
    step: i64,
    step_remainder: i64,
    denominator: i64,
}

impl EdgeWalker {
    /// `from.y < to.y`.
    fn new(from: IVec2, to: IVec2, row: i64) -> Self {
        debug_assert!(from.y < to.y);
        let height = (to.y - from.y) as i128;
        let dx = (to.x - from.x) as i128;
        let denominator = SUB_PIXELS as i128 * height;
        let center_y = SUB_PIXELS as i128 * row as i128 + HALF_PIXEL as i128;
        let numerator = (from.x as i128 - HALF_PIXEL as i128) * height + dx * (center_y - from.y as i128);
        let step = SUB_PIXELS as i128 * dx;
        EdgeWalker {
            column: numerator.div_euclid(denominator) as i64 + 1,
            remainder: numerator.rem_euclid(denominator) as i64,
            step: step.div_euclid(denominator) as i64,
            step_remainder: step.rem_euclid(denominator) as i64,
            denominator: denominator as i64,
        }
    }

    #[inline(always)]
    fn next(&mut self) -> i64 {
        let column = self.column;
        self.column += self.step;
        self.remainder += self.step_remainder;
        if self.remainder >= self.denominator {
            self.column += 1;
            self.remainder -= self.denominator;
        }
        column
    }
}

/// Converts a triangle into row intervals clipped to `clip`.
///
/// `buffer` must hold [`row_buffer_len`] intervals. Back facing and degenerate triangles
/// produce an empty shape.
pub fn rasterize_rows<'b>(tri: &IntTriangle, clip: IRect, buffer: &'b mut [RowInterval]) -> RowShape<'b> {
    let len = row_buffer_len(tri, clip);
    let (first, last) = exact_rows(tri, clip);
    let start = first & !1;
    let rows = &mut buffer[..len];
    rows.fill(RowInterval::EMPTY);
    if len > 0 && tri.front_facing {
        walk_edges(tri, clip, first..last, start, rows);
    }
    RowShape {
        start_row: start as i32,
        rows,
    }
}

fn walk_edges(tri: &IntTriangle, clip: IRect, range: std::ops::Range<i64>, start: i64, rows: &mut [RowInterval]) {
    let mut sorted = tri.corners;
    sorted.sort_unstable_by_key(|p| (p.y, p.x));
    let [top, mid, bottom] = sorted;
    // Positive when the middle corner lies right of the long edge.
    let cross = (mid.x - top.x) * (bottom.y - top.y) - (mid.y - top.y) * (bottom.x - top.x);
    if cross == 0 || bottom.y <= top.y {
        return;
    }
    let long_is_left = cross > 0;

    let first = range.start;
    let mid_row = first_row_from(mid.y);
    let mut long = EdgeWalker::new(top, bottom, first);
    let mut upper = (mid.y > top.y && first < mid_row).then(|| EdgeWalker::new(top, mid, first));
    let mut lower = (bottom.y > mid.y).then(|| EdgeWalker::new(mid, bottom, first.max(mid_row)));

    let (clip_left, clip_right) = (clip.x as i64, clip.right() as i64);
    for y in range {
        let long_column = long.next();
        let short = if y < mid_row { upper.as_mut() } else { lower.as_mut() };
        let Some(short) = short else { continue };
        let short_column = short.next();
        let (left, right) = if long_is_left {
            (long_column, short_column)
        } else {
            (short_column, long_column)
        };
        let left = left.max(clip_left);
        let right = right.min(clip_right);
        if right > left {
            rows[(y - start) as usize] = RowInterval {
                left: left as i32,
                right: right as i32,
            };
        }
    }
}
