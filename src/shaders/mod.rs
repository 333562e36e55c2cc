//! Fragment programs and the table that picks one per triangle.
//!
//! Every combination of features is its own monomorphized fill loop, so the inner loop never
//! branches on what a triangle carries.

use crate::pipeline::TriangleInput;
use crate::prim3d::fill::{fill_function, FillFn};
use crate::prim3d::projection::QuadWeights;
use crate::simd::U32x4;
use crate::simd_config::QuadColor;
use crate::texture::TextureView;
use crate::vec::Vec4;

pub mod textured;

pub use textured::TexturedShader;

/// Computes the colors of one 2x2 quad. Channels of the result are in `0..=255`.
pub trait FragmentShader {
    fn shade(data: &ShaderData<'_>, weights: &QuadWeights) -> QuadColor;

    /// Packed bytes for draws that overwrite the target.
    #[inline(always)]
    fn shade_packed(data: &ShaderData<'_>, weights: &QuadWeights) -> U32x4 {
        Self::shade(data, weights).pack_saturated()
    }
}

/// Writes transparent black. Only the depth side effects of a draw remain observable.
pub struct NullShader;

impl FragmentShader for NullShader {
    #[inline(always)]
    fn shade(_: &ShaderData<'_>, _: &QuadWeights) -> QuadColor {
        QuadColor::default()
    }

    #[inline(always)]
    fn shade_packed(_: &ShaderData<'_>, _: &QuadWeights) -> U32x4 {
        U32x4::ZERO
    }
}

/// How vertex colors vary over a triangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ColorMode {
    /// Every corner is opaque white, the color drops out of the product.
    Colorless = 0,
    /// Every corner has the same color.
    Flat = 1,
    /// Colors are interpolated.
    Fading = 2,
}

impl ColorMode {
    pub fn of(colors: &[Vec4; 3]) -> Self {
        if colors[0] != colors[1] || colors[0] != colors[2] {
            ColorMode::Fading
        } else if colors[0] == Vec4::splat(1.0) {
            ColorMode::Colorless
        } else {
            ColorMode::Flat
        }
    }
}

pub const COLORLESS: u8 = ColorMode::Colorless as u8;
pub const FLAT: u8 = ColorMode::Flat as u8;
pub const FADING: u8 = ColorMode::Fading as u8;

/// The features of a triangle that choose its shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShaderFlags {
    pub diffuse: bool,
    /// The diffuse texture has more than one layer. Meaningless without `diffuse`.
    pub mips: bool,
    pub light: bool,
    pub color: ColorMode,
}

impl ShaderFlags {
    pub fn of(input: &TriangleInput<'_>) -> Self {
        ShaderFlags {
            diffuse: input.diffuse.is_some(),
            mips: input.diffuse.is_some_and(|texture| texture.has_mipmaps()),
            light: input.light.is_some(),
            color: ColorMode::of(&input.colors),
        }
    }

    /// Number of textures multiplied into the color.
    pub fn texture_count(&self) -> i32 {
        self.diffuse as i32 + self.light as i32
    }
}

/// Per-triangle constants read by the fragment programs.
///
/// Attributes are stored relative to corner `A` so that evaluating them at source weights
/// `(b, c)` is `origin + db * b + dc * c`.
#[derive(Clone, Copy, Debug)]
pub struct ShaderData<'a> {
    pub diffuse: TextureView<'a>,
    pub light: TextureView<'a>,
    /// `xy` is the diffuse and `zw` the light map coordinate.
    pub tex_origin: Vec4,
    pub tex_db: Vec4,
    pub tex_dc: Vec4,
    /// Vertex color pre-scaled by `255^(1 - texture count)`, so multiplying every present
    /// source ends in `0..=255`.
    pub color_origin: Vec4,
    pub color_db: Vec4,
    pub color_dc: Vec4,
}

impl<'a> ShaderData<'a> {
    pub fn new(input: &TriangleInput<'a>, flags: &ShaderFlags) -> Self {
        let scale = 255f32.powi(1 - flags.texture_count());
        let [ta, tb, tc] = input.tex_coords;
        let [ca, cb, cc] = input.colors.map(|color| color * scale);
        ShaderData {
            diffuse: input.diffuse.map_or(TextureView::EMPTY, |texture| texture.view()),
            light: input.light.map_or(TextureView::EMPTY, |texture| texture.view()),
            tex_origin: ta,
            tex_db: tb - ta,
            tex_dc: tc - ta,
            color_origin: ca,
            color_db: cb - ca,
            color_dc: cc - ca,
        }
    }
}

/// Fill loop of `S` for every perspective and blending combination.
macro_rules! select_color {
    ($color:expr, $perspective:expr, $alpha:expr, $diffuse:literal, $mips:literal, $light:literal) => {
        match $color {
            ColorMode::Colorless => {
                fill_function::<TexturedShader<$diffuse, $mips, $light, COLORLESS>>($perspective, $alpha)
            }
            ColorMode::Flat => fill_function::<TexturedShader<$diffuse, $mips, $light, FLAT>>($perspective, $alpha),
            ColorMode::Fading => {
                fill_function::<TexturedShader<$diffuse, $mips, $light, FADING>>($perspective, $alpha)
            }
        }
    };
}

/// Picks the fill loop specialized for `flags`.
pub fn select_fill(flags: &ShaderFlags, perspective: bool, alpha: bool) -> FillFn {
    let color = flags.color;
    match (flags.diffuse, flags.mips, flags.light) {
        (false, _, false) => select_color!(color, perspective, alpha, false, false, false),
        (false, _, true) => select_color!(color, perspective, alpha, false, false, true),
        (true, false, false) => select_color!(color, perspective, alpha, true, false, false),
        (true, true, false) => select_color!(color, perspective, alpha, true, true, false),
        (true, false, true) => select_color!(color, perspective, alpha, true, false, true),
        (true, true, true) => select_color!(color, perspective, alpha, true, true, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_modes() {
        let white = Vec4::splat(1.0);
        let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert_eq!(ColorMode::of(&[white; 3]), ColorMode::Colorless);
        assert_eq!(ColorMode::of(&[red; 3]), ColorMode::Flat);
        assert_eq!(ColorMode::of(&[white, white, red]), ColorMode::Fading);
    }

    #[test]
    fn colors_are_prescaled_per_texture() {
        let input = TriangleInput {
            colors: [Vec4::new(1.0, 0.5, 0.0, 1.0); 3],
            ..TriangleInput::default()
        };
        let flags = ShaderFlags::of(&input);
        assert_eq!(flags.texture_count(), 0);
        let data = ShaderData::new(&input, &flags);
        assert_eq!(data.color_origin, Vec4::new(255.0, 127.5, 0.0, 255.0));
        assert_eq!(data.color_db, Vec4::splat(0.0));
    }
}
