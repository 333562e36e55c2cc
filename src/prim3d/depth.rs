//! Depth buffer access shared by the shaded and the depth-only loops.

use crate::buf::{Image, ImageF32, Pixel, SafePtr};
use crate::simd::{F32x4, U32x4};

use super::projection::PlaneEquation;
use super::rows::{RowInterval, RowPair, RowShape};

/// Value a depth buffer is cleared to so that any draw passes the depth test.
pub fn depth_clear_value(perspective: bool) -> f32 {
    if perspective {
        0.0
    } else {
        f32::INFINITY
    }
}

/// Lanes where `new` beats `old`: nearer means a larger `1 / z` under perspective and a smaller
/// `z` otherwise.
#[inline(always)]
pub fn depth_test<const PERSPECTIVE: bool>(new: F32x4, old: F32x4) -> U32x4 {
    if PERSPECTIVE {
        new.lanes_gt(old)
    } else {
        new.lanes_lt(old)
    }
}

/// The two rows of one quad line in some image. Rows with nothing to draw, or whose interval
/// does not fit the image, are `None`.
#[derive(Clone, Copy)]
pub(crate) struct QuadRows<P> {
    rows: [Option<SafePtr<P>>; 2],
}

impl<P: Pixel + Default> QuadRows<P> {
    #[inline(always)]
    pub(crate) fn new(image: &Image<P>, pair: &RowPair) -> Self {
        let row = |y: i32, interval: &RowInterval| {
            let fits = y >= 0
                && (y as usize) < image.height()
                && interval.left >= 0
                && interval.right as usize <= image.width();
            (!interval.is_empty() && fits).then(|| image.row_ptr(y as usize))
        };
        QuadRows {
            rows: [row(pair.y, &pair.top), row(pair.y + 1, &pair.bottom)],
        }
    }

    /// Reads the lanes set in `mask`, other lanes are `P::default()`.
    #[inline(always)]
    pub(crate) fn read(&self, x: i32, mask: U32x4) -> [P; 4] {
        std::array::from_fn(|lane| match self.rows[lane / 2] {
            // SAFETY: a set lane lies inside its row's interval, which is inside the image.
            Some(row) if mask.lane_set(lane) => unsafe { row.read(x as usize + lane % 2) },
            _ => P::default(),
        })
    }

    /// Writes the lanes set in `mask`.
    #[inline(always)]
    pub(crate) fn write(&self, x: i32, values: [P; 4], mask: U32x4) {
        for (lane, value) in values.into_iter().enumerate() {
            if let Some(row) = self.rows[lane / 2] {
                if mask.lane_set(lane) {
                    // SAFETY: as in `read`.
                    unsafe { row.write(x as usize + lane % 2, value) };
                }
            }
        }
    }

    #[inline(always)]
    pub(crate) fn write_full(&self, x: i32, values: [P; 4]) {
        if let [Some(top), Some(bottom)] = self.rows {
            let x = x as usize;
            // SAFETY: both rows cover `x` and `x + 1`.
            unsafe {
                top.write(x, values[0]);
                top.write(x + 1, values[1]);
                bottom.write(x, values[2]);
                bottom.write(x + 1, values[3]);
            }
        } else {
            self.write(x, values, U32x4::ALL);
        }
    }
}

/// Writes the depth of every covered pixel that passes the depth test. No color is touched.
pub fn fill_depth<const PERSPECTIVE: bool>(depth: &ImageF32, plane: &PlaneEquation, shape: &RowShape<'_>) {
    for pair in shape.row_pairs() {
        let rows = QuadRows::new(depth, &pair);
        let (left, right) = pair.span();
        let (full_left, full_right) = pair.full_span();
        for x in (left..right).step_by(2) {
            let full = x >= full_left && x + 2 <= full_right;
            let mask = if full { U32x4::ALL } else { pair.quad_mask(x) };
            let new = plane.at_quad(x, pair.y);
            let old = F32x4::from_array(rows.read(x, mask));
            let pass = mask & depth_test::<PERSPECTIVE>(new, old);
            if full && pass.all() {
                rows.write_full(x, new.to_array());
            } else if pass.any() {
                rows.write(x, new.to_array(), pass);
            }
        }
    }
}
