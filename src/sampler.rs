//! Texture sampling for one 2x2 quad at a time.
//!
//! Texture coordinates wrap: `u = 0` is the left edge of texel column 0, `u = 1` the right edge
//! of the last column, and `v = 0` is the top row. Texel centers sit at `(x + 0.5) / width`.

use crate::simd::{F32x4, U32x4};
use crate::simd_config::QuadColor;
use crate::texture::{Filtering, TextureLayer, TextureView, MIP_BIN_COUNT};

/// Texel footprints (texels per pixel) at which the next coarser layer takes over.
pub const MIP_THRESHOLDS: [f32; 4] = [2.0, 4.0, 8.0, 16.0];

const _: () = assert!(MIP_THRESHOLDS.len() + 1 == MIP_BIN_COUNT, "one threshold between each pair of layer bins");

/// Picks the layer bin for a quad from its texture coordinate derivatives.
///
/// Lane 1 is the horizontal and lane 2 the vertical neighbour of lane 0.
#[inline(always)]
pub fn mip_level(layer0: &TextureLayer, u: F32x4, v: F32x4) -> usize {
    let du = (u.lane(1) - u.lane(0)).abs().max((u.lane(2) - u.lane(0)).abs()) * layer0.width as f32;
    let dv = (v.lane(1) - v.lane(0)).abs().max((v.lane(2) - v.lane(0)).abs()) * layer0.height as f32;
    let footprint = du.max(dv);
    MIP_THRESHOLDS.iter().filter(|&&threshold| footprint >= threshold).count()
}

/// Texture coordinates converted to wrapped texel indices and sub-texel fractions.
struct TexelCoords {
    x0: U32x4,
    y0: U32x4,
    x1: U32x4,
    y1: U32x4,
    frac_x: U32x4,
    frac_y: U32x4,
}

impl TexelCoords {
    #[inline(always)]
    fn new(layer: &TextureLayer, u: F32x4, v: F32x4) -> Self {
        // Shift by half a texel so texel centers land on whole sub-texel units. Masking the
        // two's complement value wraps negative coordinates into the texture.
        let sub_x = (u * layer.sub_width as f32 - F32x4::splat(128.0)).floor().truncate_to_i32().reinterpret_u32();
        let sub_y = (v * layer.sub_height as f32 - F32x4::splat(128.0)).floor().truncate_to_i32().reinterpret_u32();
        let width_mask = U32x4::splat(layer.width_mask);
        let height_mask = U32x4::splat(layer.height_mask);
        let x0 = (sub_x >> 8) & width_mask;
        let y0 = (sub_y >> 8) & height_mask;
        TexelCoords {
            x0,
            y0,
            x1: (x0 + U32x4::splat(1)) & width_mask,
            y1: (y0 + U32x4::splat(1)) & height_mask,
            frac_x: sub_x & U32x4::splat(0xff),
            frac_y: sub_y & U32x4::splat(0xff),
        }
    }

    #[inline(always)]
    fn offset(layer: &TextureLayer, x: U32x4, y: U32x4) -> U32x4 {
        (y << layer.width_shift) + x + U32x4::splat(layer.start as u32)
    }
}

/// Texel containing each `(u, v)`.
#[inline(always)]
pub fn sample_nearest(view: &TextureView<'_>, layer: &TextureLayer, u: F32x4, v: F32x4) -> U32x4 {
    let x = (u * layer.width as f32).floor().truncate_to_i32().reinterpret_u32() & U32x4::splat(layer.width_mask);
    let y = (v * layer.height as f32).floor().truncate_to_i32().reinterpret_u32() & U32x4::splat(layer.height_mask);
    U32x4::gather(view.pixels, TexelCoords::offset(layer, x, y))
}

/// Blends two packed colors per lane with 8 bit weights, `a` at weight 0 and `b` at 256.
///
/// Red/blue and green/alpha are handled as pairs of 16 bit halves, each product stays below
/// `255 * 256` so the halves never carry into each other.
#[inline(always)]
fn lerp_packed(a: U32x4, b: U32x4, weight: U32x4) -> U32x4 {
    let low = U32x4::splat(0x00ff_00ff);
    let inv = U32x4::splat(256) - weight;
    let rb = ((a & low) * inv + (b & low) * weight) >> 8;
    let ga = (((a >> 8) & low) * inv + ((b >> 8) & low) * weight) >> 8;
    (rb & low) | ((ga & low) << 8)
}

/// Bilinear filter producing packed bytes.
#[inline(always)]
pub fn sample_bilinear(view: &TextureView<'_>, layer: &TextureLayer, u: F32x4, v: F32x4) -> U32x4 {
    let c = TexelCoords::new(layer, u, v);
    let top_left = U32x4::gather(view.pixels, TexelCoords::offset(layer, c.x0, c.y0));
    let top_right = U32x4::gather(view.pixels, TexelCoords::offset(layer, c.x1, c.y0));
    let bottom_left = U32x4::gather(view.pixels, TexelCoords::offset(layer, c.x0, c.y1));
    let bottom_right = U32x4::gather(view.pixels, TexelCoords::offset(layer, c.x1, c.y1));
    let top = lerp_packed(top_left, top_right, c.frac_x);
    let bottom = lerp_packed(bottom_left, bottom_right, c.frac_x);
    lerp_packed(top, bottom, c.frac_y)
}

/// Bilinear filter blending in float, for results that are multiplied further.
#[inline(always)]
pub fn sample_bilinear_f32(view: &TextureView<'_>, layer: &TextureLayer, u: F32x4, v: F32x4) -> QuadColor {
    let c = TexelCoords::new(layer, u, v);
    let fx = c.frac_x.to_f32() * (1.0 / 256.0);
    let fy = c.frac_y.to_f32() * (1.0 / 256.0);
    let gx = F32x4::splat(1.0) - fx;
    let gy = F32x4::splat(1.0) - fy;
    let fetch = |x, y| QuadColor::unpack(U32x4::gather(view.pixels, TexelCoords::offset(layer, x, y)));
    let top = fetch(c.x0, c.y0) * gx + fetch(c.x1, c.y0) * fx;
    let bottom = fetch(c.x0, c.y1) * gx + fetch(c.x1, c.y1) * fx;
    top * gy + bottom * fy
}

/// Samples a quad as packed bytes, honouring the texture's filtering. `MIPS` selects the
/// layer from the quad's derivatives, otherwise layer 0 is used.
#[inline(always)]
pub fn sample_quad_packed<const MIPS: bool>(view: &TextureView<'_>, u: F32x4, v: F32x4) -> U32x4 {
    let layer = pick_layer::<MIPS>(view, u, v);
    match view.filtering {
        Filtering::Nearest => sample_nearest(view, layer, u, v),
        Filtering::Bilinear => sample_bilinear(view, layer, u, v),
    }
}

/// Samples a quad as float channels in `0..=255`.
#[inline(always)]
pub fn sample_quad<const MIPS: bool>(view: &TextureView<'_>, u: F32x4, v: F32x4) -> QuadColor {
    let layer = pick_layer::<MIPS>(view, u, v);
    match view.filtering {
        Filtering::Nearest => QuadColor::unpack(sample_nearest(view, layer, u, v)),
        Filtering::Bilinear => sample_bilinear_f32(view, layer, u, v),
    }
}

#[inline(always)]
fn pick_layer<'v, const MIPS: bool>(view: &'v TextureView<'_>, u: F32x4, v: F32x4) -> &'v TextureLayer {
    if MIPS {
        view.layer(mip_level(view.layer(0), u, v))
    } else {
        view.layer(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buf::ImageRgbaU8;
    use crate::texture::Texture;

    fn gradient(width: usize, height: usize) -> Texture {
        let pixels: Vec<u32> = (0..width * height)
            .map(|i| {
                let (x, y) = ((i % width) as u32, (i / width) as u32);
                (x * 7 % 256) | ((y * 5 % 256) << 8) | (((x + y) % 256) << 16) | 0xff00_0000
            })
            .collect();
        let image = ImageRgbaU8::from_pixels(width, height, &pixels).unwrap();
        Texture::new(image).unwrap()
    }

    fn centers(layer: &TextureLayer, xs: [u32; 4], ys: [u32; 4]) -> (F32x4, F32x4) {
        let u = F32x4::from_array(xs.map(|x| (x as f32 + 0.5) / layer.width as f32));
        let v = F32x4::from_array(ys.map(|y| (y as f32 + 0.5) / layer.height as f32));
        (u, v)
    }

    #[test]
    fn nearest_and_bilinear_hit_texels_at_centers() {
        let texture = gradient(64, 32);
        let view = texture.view();
        let layer = view.layer(0);
        let (u, v) = centers(layer, [0, 13, 63, 40], [0, 31, 7, 20]);
        let expected = U32x4::from_array([(0, 0), (13, 31), (63, 7), (40, 20)].map(|(x, y)| {
            texture.texel(x, y).unwrap()
        }));
        assert_eq!(sample_nearest(&view, layer, u, v), expected);
        assert_eq!(sample_bilinear(&view, layer, u, v), expected);
        assert_eq!(QuadColor::unpack(expected), sample_bilinear_f32(&view, layer, u, v));
    }

    #[test]
    fn coordinates_wrap() {
        let texture = gradient(32, 32);
        let view = texture.view();
        let layer = view.layer(0);
        let (u, v) = centers(layer, [3, 3, 3, 3], [5, 5, 5, 5]);
        let shifted = sample_nearest(&view, layer, u + F32x4::splat(2.0), v - F32x4::splat(3.0));
        assert_eq!(shifted, sample_nearest(&view, layer, u, v));
    }

    #[test]
    fn bilinear_midpoint_is_between_neighbours() {
        let texture = gradient(32, 32);
        let view = texture.view();
        let layer = view.layer(0);
        // Halfway between texel columns 4 and 5 of row 2.
        let u = F32x4::splat(5.0 / 32.0);
        let v = F32x4::splat(2.5 / 32.0);
        let packed = sample_bilinear(&view, layer, u, v).lane(0);
        let (a, b) = (texture.texel(4, 2).unwrap(), texture.texel(5, 2).unwrap());
        for channel in 0..4 {
            let get = |p: u32| (p >> (channel * 8)) & 0xff;
            let (lo, hi) = (get(a).min(get(b)), get(a).max(get(b)));
            assert!((lo..=hi).contains(&get(packed)), "channel {channel}");
        }
    }

    #[test]
    fn mip_level_follows_footprint() {
        let layer = TextureLayer { width: 256, height: 256, ..Default::default() };
        let step = |texels: f32| {
            let d = texels / 256.0;
            mip_level(&layer, F32x4::new(0.0, d, 0.0, d), F32x4::new(0.0, 0.0, d, d))
        };
        assert_eq!(step(1.0), 0);
        assert_eq!(step(2.0), 1);
        assert_eq!(step(5.0), 2);
        assert_eq!(step(8.0), 3);
        assert_eq!(step(32.0), 4);
        assert_eq!(step(1000.0), 4);
    }
}
