use std::ops::{Add, Div, Mul};

use crate::simd::{saturate_to_byte, F32x4, I32x4, U32x4};
use crate::vec::Vec4;

/// Lane order inside the 2x2 quad: top-left, top-right, bottom-left, bottom-right.
pub const QUAD_X: I32x4 = I32x4::from_array([0, 1, 0, 1]);
pub const QUAD_Y: I32x4 = I32x4::from_array([0, 0, 1, 1]);

/// Same offsets, pre-converted for plane equation evaluation at pixel centers.
pub const QUAD_CENTER_X: F32x4 = F32x4::from_array([0.5, 1.5, 0.5, 1.5]);
pub const QUAD_CENTER_Y: F32x4 = F32x4::from_array([0.5, 0.5, 1.5, 1.5]);

/// Four float colors, one per quad lane. Channels are in the `0..=255` range once a shader
/// has produced them.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QuadColor {
    pub r: F32x4,
    pub g: F32x4,
    pub b: F32x4,
    pub a: F32x4,
}

impl QuadColor {
    #[inline(always)]
    pub fn new(r: F32x4, g: F32x4, b: F32x4, a: F32x4) -> Self {
        QuadColor { r, g, b, a }
    }

    #[inline(always)]
    pub fn splat(color: Vec4) -> Self {
        QuadColor {
            r: F32x4::splat(color.x),
            g: F32x4::splat(color.y),
            b: F32x4::splat(color.z),
            a: F32x4::splat(color.w),
        }
    }

    /// Unpacks packed RGBA bytes (red in the lowest byte) into float channels.
    #[inline(always)]
    pub fn unpack(packed: U32x4) -> Self {
        QuadColor {
            r: packed.channel(0).to_f32(),
            g: packed.channel(1).to_f32(),
            b: packed.channel(2).to_f32(),
            a: packed.channel(3).to_f32(),
        }
    }

    /// Saturates every channel to a byte and packs the result.
    #[inline(always)]
    pub fn pack_saturated(self) -> U32x4 {
        U32x4::pack_channels(
            saturate_to_byte(self.r),
            saturate_to_byte(self.g),
            saturate_to_byte(self.b),
            saturate_to_byte(self.a),
        )
    }
}

impl Mul for QuadColor {
    type Output = QuadColor;

    #[inline(always)]
    fn mul(self, rhs: QuadColor) -> QuadColor {
        QuadColor {
            r: self.r * rhs.r,
            g: self.g * rhs.g,
            b: self.b * rhs.b,
            a: self.a * rhs.a,
        }
    }
}

impl Mul<F32x4> for QuadColor {
    type Output = QuadColor;

    #[inline(always)]
    fn mul(self, rhs: F32x4) -> QuadColor {
        QuadColor {
            r: self.r * rhs,
            g: self.g * rhs,
            b: self.b * rhs,
            a: self.a * rhs,
        }
    }
}

impl Div<F32x4> for QuadColor {
    type Output = QuadColor;

    #[inline(always)]
    fn div(self, rhs: F32x4) -> QuadColor {
        QuadColor {
            r: self.r / rhs,
            g: self.g / rhs,
            b: self.b / rhs,
            a: self.a / rhs,
        }
    }
}

impl Add for QuadColor {
    type Output = QuadColor;

    #[inline(always)]
    fn add(self, rhs: QuadColor) -> QuadColor {
        QuadColor {
            r: self.r + rhs.r,
            g: self.g + rhs.g,
            b: self.b + rhs.b,
            a: self.a + rhs.a,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_then_pack_keeps_bytes() {
        let packed = U32x4::new(0xff00_00ff, 0x8040_2010, 0, u32::MAX);
        assert_eq!(QuadColor::unpack(packed).pack_saturated(), packed);
    }

    #[test]
    fn quad_offsets_match_lane_order() {
        for lane in 0..4 {
            assert_eq!(QUAD_X.lane(lane) as f32 + 0.5, QUAD_CENTER_X.lane(lane));
            assert_eq!(QUAD_Y.lane(lane) as f32 + 0.5, QUAD_CENTER_Y.lane(lane));
        }
    }
}
