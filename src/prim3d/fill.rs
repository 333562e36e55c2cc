//! The per-quad fragment loop.

use crate::buf::{ImageF32, ImageRgbaU8};
use crate::shaders::{FragmentShader, ShaderData};
use crate::simd::{F32x4, U32x4};
use crate::simd_config::QuadColor;

use super::depth::{depth_test, QuadRows};
use super::projection::Projection;
use super::rows::RowShape;

/// Buffers a draw writes to. The depth buffer, when present, has the color buffer's size.
#[derive(Clone, Copy, Debug)]
pub struct FillTarget<'a> {
    pub color: &'a ImageRgbaU8,
    pub depth: Option<&'a ImageF32>,
}

/// A fill loop specialized for one shader, projection and blend mode.
pub type FillFn = fn(&FillTarget<'_>, &ShaderData<'_>, &Projection, &RowShape<'_>);

/// Fill loop of `S` for the given projection and blend mode.
pub fn fill_function<S: FragmentShader>(perspective: bool, alpha: bool) -> FillFn {
    match (perspective, alpha) {
        (true, true) => fill_shape::<S, true, true>,
        (true, false) => fill_shape::<S, true, false>,
        (false, true) => fill_shape::<S, false, true>,
        (false, false) => fill_shape::<S, false, false>,
    }
}

/// Straight alpha source-over, rounded to the nearest byte.
#[inline(always)]
pub fn blend_alpha(src: QuadColor, dst: QuadColor) -> U32x4 {
    let alpha = (src.a / F32x4::splat(255.0)).clamp(F32x4::splat(0.0), F32x4::splat(1.0));
    let keep = F32x4::splat(1.0) - alpha;
    let half = F32x4::splat(0.5);
    QuadColor::new(
        src.r * alpha + dst.r * keep + half,
        src.g * alpha + dst.g * keep + half,
        src.b * alpha + dst.b * keep + half,
        alpha * 255.0 + dst.a * keep + half,
    )
    .pack_saturated()
}

/// Shades every covered pixel of `shape` that passes the depth test.
///
/// Opaque draws write color and depth. Blended draws test depth but leave it unchanged.
pub fn fill_shape<S: FragmentShader, const PERSPECTIVE: bool, const ALPHA: bool>(
    target: &FillTarget<'_>,
    data: &ShaderData<'_>,
    projection: &Projection,
    shape: &RowShape<'_>,
) {
    for pair in shape.row_pairs() {
        let color_rows = QuadRows::new(target.color, &pair);
        let depth_rows = target.depth.map(|depth| QuadRows::new(depth, &pair));
        let (left, right) = pair.span();
        let (full_left, full_right) = pair.full_span();
        for x in (left..right).step_by(2) {
            let full = x >= full_left && x + 2 <= full_right;
            let mut mask = if full { U32x4::ALL } else { pair.quad_mask(x) };
            let weights = projection.quad::<PERSPECTIVE>(x, pair.y);
            if let Some(depth_rows) = &depth_rows {
                let old = F32x4::from_array(depth_rows.read(x, mask));
                mask = mask & depth_test::<PERSPECTIVE>(weights.depth, old);
                if !mask.any() {
                    continue;
                }
            }

            if ALPHA {
                let dst = U32x4::from_array(color_rows.read(x, mask));
                let blended = blend_alpha(S::shade(data, &weights), QuadColor::unpack(dst));
                color_rows.write(x, blended.to_array(), mask);
            } else {
                let packed = S::shade_packed(data, &weights).to_array();
                let depth = weights.depth.to_array();
                if full && mask.all() {
                    color_rows.write_full(x, packed);
                    if let Some(depth_rows) = &depth_rows {
                        depth_rows.write_full(x, depth);
                    }
                } else {
                    color_rows.write(x, packed, mask);
                    if let Some(depth_rows) = &depth_rows {
                        depth_rows.write(x, depth, mask);
                    }
                }
            }
        }
    }
}
