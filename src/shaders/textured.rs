use crate::prim3d::projection::QuadWeights;
use crate::sampler::{sample_quad, sample_quad_packed};
use crate::simd::{F32x4, U32x4};
use crate::simd_config::QuadColor;

use super::{FragmentShader, ShaderData, COLORLESS, FLAT};

/// Product of a diffuse sample, a light map sample and the vertex color, each present only
/// when its flag is set. `COLOR` is one of [`COLORLESS`], [`FLAT`] or [`super::FADING`].
///
/// The light map always samples its full resolution layer.
pub struct TexturedShader<const DIFFUSE: bool, const MIPS: bool, const LIGHT: bool, const COLOR: u8>;

/// `origin + db * b + dc * c` per lane.
#[inline(always)]
fn attribute(origin: f32, db: f32, dc: f32, w: &QuadWeights) -> F32x4 {
    F32x4::splat(origin) + w.b * db + w.c * dc
}

impl<const DIFFUSE: bool, const MIPS: bool, const LIGHT: bool, const COLOR: u8>
    TexturedShader<DIFFUSE, MIPS, LIGHT, COLOR>
{
    #[inline(always)]
    fn diffuse_coords(data: &ShaderData<'_>, w: &QuadWeights) -> (F32x4, F32x4) {
        (
            attribute(data.tex_origin.x, data.tex_db.x, data.tex_dc.x, w),
            attribute(data.tex_origin.y, data.tex_db.y, data.tex_dc.y, w),
        )
    }

    #[inline(always)]
    fn light_coords(data: &ShaderData<'_>, w: &QuadWeights) -> (F32x4, F32x4) {
        (
            attribute(data.tex_origin.z, data.tex_db.z, data.tex_dc.z, w),
            attribute(data.tex_origin.w, data.tex_db.w, data.tex_dc.w, w),
        )
    }
}

impl<const DIFFUSE: bool, const MIPS: bool, const LIGHT: bool, const COLOR: u8> FragmentShader
    for TexturedShader<DIFFUSE, MIPS, LIGHT, COLOR>
{
    #[inline(always)]
    fn shade(data: &ShaderData<'_>, w: &QuadWeights) -> QuadColor {
        let mut textures = None;
        if DIFFUSE {
            let (u, v) = Self::diffuse_coords(data, w);
            textures = Some(sample_quad::<MIPS>(&data.diffuse, u, v));
        }
        if LIGHT {
            let (u, v) = Self::light_coords(data, w);
            let light = sample_quad::<false>(&data.light, u, v);
            textures = Some(textures.map_or(light, |diffuse| diffuse * light));
        }

        let color = match COLOR {
            COLORLESS => {
                return match textures {
                    None => QuadColor::splat(data.color_origin),
                    // Two 0..=255 factors need one division by 255.
                    Some(product) if DIFFUSE && LIGHT => product / F32x4::splat(255.0),
                    Some(sample) => sample,
                };
            }
            FLAT => QuadColor::splat(data.color_origin),
            _ => QuadColor::new(
                attribute(data.color_origin.x, data.color_db.x, data.color_dc.x, w),
                attribute(data.color_origin.y, data.color_db.y, data.color_dc.y, w),
                attribute(data.color_origin.z, data.color_db.z, data.color_dc.z, w),
                attribute(data.color_origin.w, data.color_db.w, data.color_dc.w, w),
            ),
        };
        textures.map_or(color, |product| product * color)
    }

    #[inline(always)]
    fn shade_packed(data: &ShaderData<'_>, w: &QuadWeights) -> U32x4 {
        if DIFFUSE && !LIGHT && COLOR == COLORLESS {
            let (u, v) = Self::diffuse_coords(data, w);
            sample_quad_packed::<MIPS>(&data.diffuse, u, v)
        } else {
            Self::shade(data, w).pack_saturated()
        }
    }
}
