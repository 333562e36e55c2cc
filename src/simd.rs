//! Four-lane vector types.
//!
//! Thin wrappers over the `wide` crate's 128-bit vectors, which lower to SSE/NEON on stable
//! Rust. The wrappers add what the rasterizer needs on top: masks are `U32x4` values where a
//! set lane is `!0` and a cleared lane is `0`, and every lane type can select by such a mask.

use std::ops::{Add, AddAssign, BitAnd, BitOr, BitXor, Div, Mul, MulAssign, Neg, Not, Shl, Shr, Sub, SubAssign};

use bytemuck::cast;
use wide::{f32x4, i32x4, u32x4, CmpGt, CmpLt};

pub const LANES: usize = 4;

#[repr(transparent)]
#[derive(Clone, Copy, Default)]
pub struct F32x4(pub f32x4);

#[repr(transparent)]
#[derive(Clone, Copy, Default)]
pub struct I32x4(pub i32x4);

#[repr(transparent)]
#[derive(Clone, Copy, Default)]
pub struct U32x4(pub u32x4);

macro_rules! impl_lanes {
    ($ty:ident, $wide:ident, $elem:ty) => {
        impl $ty {
            #[inline(always)]
            pub const fn new(a: $elem, b: $elem, c: $elem, d: $elem) -> Self {
                Self::from_array([a, b, c, d])
            }

            #[inline(always)]
            pub const fn splat(value: $elem) -> Self {
                Self::from_array([value; LANES])
            }

            #[inline(always)]
            pub const fn from_array(array: [$elem; LANES]) -> Self {
                // SAFETY: the wide vector is four plain lanes of the element type.
                $ty(unsafe { std::mem::transmute::<[$elem; LANES], $wide>(array) })
            }

            #[inline(always)]
            pub fn to_array(self) -> [$elem; LANES] {
                self.0.to_array()
            }

            #[inline(always)]
            pub fn lane(self, index: usize) -> $elem {
                self.to_array()[index]
            }

            /// Loads four consecutive elements from a 16 byte aligned address.
            ///
            /// # Safety
            /// `ptr` must be valid for reading four elements and aligned to 16 bytes.
            #[inline(always)]
            pub unsafe fn load_aligned(ptr: *const $elem) -> Self {
                debug_assert!(ptr as usize % std::mem::align_of::<$wide>() == 0, "misaligned SIMD load");
                $ty(unsafe { ptr.cast::<$wide>().read() })
            }

            /// Stores four consecutive elements to a 16 byte aligned address.
            ///
            /// # Safety
            /// `ptr` must be valid for writing four elements and aligned to 16 bytes.
            #[inline(always)]
            pub unsafe fn store_aligned(self, ptr: *mut $elem) {
                debug_assert!(ptr as usize % std::mem::align_of::<$wide>() == 0, "misaligned SIMD store");
                unsafe { ptr.cast::<$wide>().write(self.0) }
            }

            #[inline(always)]
            pub fn clamp(self, low: Self, high: Self) -> Self {
                self.max(low).min(high)
            }

            #[inline(always)]
            pub fn lanes_ge(self, rhs: Self) -> U32x4 {
                !self.lanes_lt(rhs)
            }

            /// Picks lanes from `if_set` where `mask` is set and from `if_clear` elsewhere.
            #[inline(always)]
            pub fn select(mask: U32x4, if_set: Self, if_clear: Self) -> Self {
                let set: u32x4 = cast(if_set.0);
                let clear: u32x4 = cast(if_clear.0);
                $ty(cast((mask.0 & set) | (!mask.0 & clear)))
            }
        }

        impl From<[$elem; LANES]> for $ty {
            fn from(array: [$elem; LANES]) -> Self {
                $ty::from_array(array)
            }
        }

        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.to_array() == other.to_array()
            }
        }

        impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($ty)).field(&self.to_array()).finish()
            }
        }
    };
}

impl_lanes!(F32x4, f32x4, f32);
impl_lanes!(I32x4, i32x4, i32);
impl_lanes!(U32x4, u32x4, u32);

impl Eq for I32x4 {}
impl Eq for U32x4 {}

macro_rules! impl_binop {
    ($ty:ident, $trait:ident, $method:ident) => {
        impl $trait for $ty {
            type Output = $ty;

            #[inline(always)]
            fn $method(self, rhs: $ty) -> $ty {
                $ty($trait::$method(self.0, rhs.0))
            }
        }
    };
}

macro_rules! impl_assign {
    ($ty:ident, $trait:ident, $method:ident, $op:tt) => {
        impl $trait for $ty {
            #[inline(always)]
            fn $method(&mut self, rhs: $ty) {
                *self = *self $op rhs;
            }
        }
    };
}

macro_rules! impl_shifts {
    ($ty:ident) => {
        impl Shl<u32> for $ty {
            type Output = $ty;

            #[inline(always)]
            fn shl(self, bits: u32) -> $ty {
                $ty(self.0 << bits)
            }
        }

        impl Shr<u32> for $ty {
            type Output = $ty;

            #[inline(always)]
            fn shr(self, bits: u32) -> $ty {
                $ty(self.0 >> bits)
            }
        }

        impl Not for $ty {
            type Output = $ty;

            #[inline(always)]
            fn not(self) -> $ty {
                $ty(!self.0)
            }
        }
    };
}

impl_binop!(F32x4, Add, add);
impl_binop!(F32x4, Sub, sub);
impl_binop!(F32x4, Mul, mul);
impl_binop!(F32x4, Div, div);
impl_assign!(F32x4, AddAssign, add_assign, +);
impl_assign!(F32x4, SubAssign, sub_assign, -);
impl_assign!(F32x4, MulAssign, mul_assign, *);

// Integer arithmetic wraps.
impl_binop!(I32x4, Add, add);
impl_binop!(I32x4, Sub, sub);
impl_binop!(I32x4, Mul, mul);
impl_binop!(I32x4, BitAnd, bitand);
impl_binop!(I32x4, BitOr, bitor);
impl_binop!(I32x4, BitXor, bitxor);
impl_assign!(I32x4, AddAssign, add_assign, +);
impl_shifts!(I32x4);

impl_binop!(U32x4, Add, add);
impl_binop!(U32x4, Sub, sub);
impl_binop!(U32x4, BitAnd, bitand);
impl_binop!(U32x4, BitOr, bitor);
impl_binop!(U32x4, BitXor, bitxor);
impl_assign!(U32x4, AddAssign, add_assign, +);
impl_shifts!(U32x4);

impl Mul for U32x4 {
    type Output = U32x4;

    /// Low 32 bits of the product, which are the same for signed and unsigned lanes.
    #[inline(always)]
    fn mul(self, rhs: U32x4) -> U32x4 {
        (self.reinterpret_i32() * rhs.reinterpret_i32()).reinterpret_u32()
    }
}

impl Mul<f32> for F32x4 {
    type Output = F32x4;

    #[inline(always)]
    fn mul(self, rhs: f32) -> F32x4 {
        F32x4(self.0 * f32x4::splat(rhs))
    }
}

impl Neg for F32x4 {
    type Output = F32x4;

    #[inline(always)]
    fn neg(self) -> F32x4 {
        F32x4(-self.0)
    }
}

impl F32x4 {
    #[inline(always)]
    pub fn min(self, rhs: Self) -> Self {
        F32x4(self.0.min(rhs.0))
    }

    #[inline(always)]
    pub fn max(self, rhs: Self) -> Self {
        F32x4(self.0.max(rhs.0))
    }

    #[inline(always)]
    pub fn lanes_lt(self, rhs: Self) -> U32x4 {
        U32x4(cast(self.0.cmp_lt(rhs.0)))
    }

    #[inline(always)]
    pub fn lanes_gt(self, rhs: Self) -> U32x4 {
        U32x4(cast(self.0.cmp_gt(rhs.0)))
    }

    #[inline(always)]
    pub fn abs(self) -> Self {
        F32x4(self.0.abs())
    }

    #[inline(always)]
    pub fn floor(self) -> Self {
        F32x4(self.0.floor())
    }

    /// Exact `1 / x`, not the hardware estimate.
    #[inline(always)]
    pub fn reciprocal(self) -> Self {
        F32x4(f32x4::ONE / self.0)
    }

    /// Rounds towards zero. Negative and NaN lanes become zero, too large lanes saturate.
    #[inline(always)]
    pub fn truncate_to_u32(self) -> U32x4 {
        U32x4::from_array(self.to_array().map(|a| a as u32))
    }

    #[inline(always)]
    pub fn truncate_to_i32(self) -> I32x4 {
        I32x4(self.0.trunc_int())
    }
}

impl I32x4 {
    #[inline(always)]
    pub fn min(self, rhs: Self) -> Self {
        I32x4(self.0.min(rhs.0))
    }

    #[inline(always)]
    pub fn max(self, rhs: Self) -> Self {
        I32x4(self.0.max(rhs.0))
    }

    #[inline(always)]
    pub fn lanes_lt(self, rhs: Self) -> U32x4 {
        I32x4(self.0.cmp_lt(rhs.0)).reinterpret_u32()
    }

    #[inline(always)]
    pub fn lanes_gt(self, rhs: Self) -> U32x4 {
        I32x4(self.0.cmp_gt(rhs.0)).reinterpret_u32()
    }

    #[inline(always)]
    pub fn to_f32(self) -> F32x4 {
        F32x4(self.0.round_float())
    }

    #[inline(always)]
    pub fn reinterpret_u32(self) -> U32x4 {
        U32x4(cast(self.0))
    }
}

impl U32x4 {
    pub const ZERO: U32x4 = U32x4::splat(0);
    pub const ALL: U32x4 = U32x4::splat(u32::MAX);

    /// Flips the sign bit so that signed lane compares order unsigned values.
    #[inline(always)]
    fn biased(self) -> I32x4 {
        (self ^ U32x4::splat(1 << 31)).reinterpret_i32()
    }

    #[inline(always)]
    pub fn lanes_lt(self, rhs: Self) -> U32x4 {
        self.biased().lanes_lt(rhs.biased())
    }

    #[inline(always)]
    pub fn lanes_gt(self, rhs: Self) -> U32x4 {
        self.biased().lanes_gt(rhs.biased())
    }

    #[inline(always)]
    pub fn min(self, rhs: Self) -> Self {
        U32x4::select(self.lanes_lt(rhs), self, rhs)
    }

    #[inline(always)]
    pub fn max(self, rhs: Self) -> Self {
        U32x4::select(self.lanes_gt(rhs), self, rhs)
    }

    /// Lanes are below 2^31 wherever this is used, so the signed conversion is exact.
    #[inline(always)]
    pub fn to_f32(self) -> F32x4 {
        F32x4::from_array(self.to_array().map(|a| a as f32))
    }

    #[inline(always)]
    pub fn reinterpret_i32(self) -> I32x4 {
        I32x4(cast(self.0))
    }

    /// True if any lane of a mask is set.
    #[inline(always)]
    pub fn any(self) -> bool {
        self.to_array().iter().any(|&lane| lane != 0)
    }

    /// True if every lane of a mask is set.
    #[inline(always)]
    pub fn all(self) -> bool {
        self.to_array() == [u32::MAX; LANES]
    }

    #[inline(always)]
    pub fn lane_set(self, index: usize) -> bool {
        self.lane(index) != 0
    }

    /// Reads `base[offset]` for every lane. Panics if an offset is outside of `base`.
    #[inline(always)]
    pub fn gather(base: &[u32], offsets: U32x4) -> U32x4 {
        U32x4::from_array(offsets.to_array().map(|offset| base[offset as usize]))
    }

    /// Packs the lowest byte of each lane into a single `u32`, lane 0 in the lowest byte.
    #[inline(always)]
    pub fn pack_bytes(self) -> u32 {
        u32::from_le_bytes(self.to_array().map(|lane| lane as u8))
    }

    /// Extracts byte `channel` (0 is the lowest byte) of every lane.
    #[inline(always)]
    pub fn channel(self, channel: u32) -> U32x4 {
        (self >> (channel * 8)) & U32x4::splat(0xff)
    }

    /// Packs four channel vectors holding values in `0..=255` into one color per lane.
    #[inline(always)]
    pub fn pack_channels(r: U32x4, g: U32x4, b: U32x4, a: U32x4) -> U32x4 {
        r | (g << 8) | (b << 16) | (a << 24)
    }
}

/// Converts floats to bytes as `truncate(clamp(x, 0.1, 255.1))`.
///
/// The bias lets values a hair above zero become zero and values a hair below 255 become 255
/// without the result swinging between neighbours the way rounding would.
#[inline(always)]
pub fn saturate_to_byte(value: F32x4) -> U32x4 {
    value.clamp(F32x4::splat(0.1), F32x4::splat(255.1)).truncate_to_i32().reinterpret_u32()
}
