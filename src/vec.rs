use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Neg, Sub, SubAssign};

macro_rules! impl_vector {
    ($name:ident { $($field:ident),+ }) => {
        #[repr(C)]
        #[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
        pub struct $name {
            $(pub $field: f32),+
        }

        impl $name {
            #[inline(always)]
            pub const fn new($($field: f32),+) -> Self {
                $name { $($field),+ }
            }

            #[inline(always)]
            pub const fn splat(value: f32) -> Self {
                $name { $($field: value),+ }
            }

            #[inline(always)]
            pub fn dot(self, rhs: Self) -> f32 {
                0.0 $(+ self.$field * rhs.$field)+
            }

            #[inline(always)]
            pub fn mag_sq(self) -> f32 {
                self.dot(self)
            }

            #[inline(always)]
            pub fn mag(self) -> f32 {
                self.mag_sq().sqrt()
            }

            #[inline(always)]
            pub fn map(self, f: impl Fn(f32) -> f32) -> Self {
                $name { $($field: f(self.$field)),+ }
            }

            /// Linear interpolation, `self` at `t = 0` and `rhs` at `t = 1`.
            #[inline(always)]
            pub fn lerp(self, rhs: Self, t: f32) -> Self {
                self + (rhs - self) * t
            }
        }

        impl Add for $name {
            type Output = $name;

            #[inline(always)]
            fn add(self, rhs: $name) -> $name {
                $name { $($field: self.$field + rhs.$field),+ }
            }
        }

        impl AddAssign for $name {
            #[inline(always)]
            fn add_assign(&mut self, rhs: $name) {
                *self = *self + rhs;
            }
        }

        impl Sub for $name {
            type Output = $name;

            #[inline(always)]
            fn sub(self, rhs: $name) -> $name {
                $name { $($field: self.$field - rhs.$field),+ }
            }
        }

        impl SubAssign for $name {
            #[inline(always)]
            fn sub_assign(&mut self, rhs: $name) {
                *self = *self - rhs;
            }
        }

        impl Mul<f32> for $name {
            type Output = $name;

            #[inline(always)]
            fn mul(self, rhs: f32) -> $name {
                $name { $($field: self.$field * rhs),+ }
            }
        }

        impl Mul<$name> for f32 {
            type Output = $name;

            #[inline(always)]
            fn mul(self, rhs: $name) -> $name {
                rhs * self
            }
        }

        impl Mul for $name {
            type Output = $name;

            #[inline(always)]
            fn mul(self, rhs: $name) -> $name {
                $name { $($field: self.$field * rhs.$field),+ }
            }
        }

        impl Div<f32> for $name {
            type Output = $name;

            #[inline(always)]
            fn div(self, rhs: f32) -> $name {
                $name { $($field: self.$field / rhs),+ }
            }
        }

        impl Neg for $name {
            type Output = $name;

            #[inline(always)]
            fn neg(self) -> $name {
                $name { $($field: -self.$field),+ }
            }
        }
    };
}

impl_vector!(Vec2 { x, y });
impl_vector!(Vec3 { x, y, z });
impl_vector!(Vec4 { x, y, z, w });

impl Vec3 {
    pub fn cross(self, rhs: Self) -> Self {
        Vec3::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }
}

impl Vec4 {
    #[inline(always)]
    pub fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }
}

impl From<[f32; 2]> for Vec2 {
    fn from([x, y]: [f32; 2]) -> Self {
        Vec2::new(x, y)
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Vec3::new(x, y, z)
    }
}

impl From<[f32; 4]> for Vec4 {
    fn from([x, y, z, w]: [f32; 4]) -> Self {
        Vec4::new(x, y, z, w)
    }
}

/// Screen position in sub-pixel integer units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct IVec2 {
    pub x: i64,
    pub y: i64,
}

impl IVec2 {
    #[inline(always)]
    pub const fn new(x: i64, y: i64) -> Self {
        IVec2 { x, y }
    }
}

impl Sub for IVec2 {
    type Output = IVec2;

    #[inline(always)]
    fn sub(self, rhs: IVec2) -> IVec2 {
        IVec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Row-major 3x3 matrix.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat3(pub [[f32; 3]; 3]);

impl Mat3 {
    pub const IDENTITY: Mat3 = Mat3([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

    #[rustfmt::skip]
    pub fn rotation_x(theta: f32) -> Self {
        let (sin, cos) = theta.sin_cos();
        Mat3([[1.0, 0.0,  0.0],
              [0.0, cos, -sin],
              [0.0, sin,  cos]])
    }

    #[rustfmt::skip]
    pub fn rotation_y(theta: f32) -> Self {
        let (sin, cos) = theta.sin_cos();
        Mat3([[ cos, 0.0, sin],
              [ 0.0, 1.0, 0.0],
              [-sin, 0.0, cos]])
    }

    #[rustfmt::skip]
    pub fn rotation_z(theta: f32) -> Self {
        let (sin, cos) = theta.sin_cos();
        Mat3([[cos, -sin, 0.0],
              [sin,  cos, 0.0],
              [0.0,  0.0, 1.0]])
    }

    pub fn row(&self, i: usize) -> Vec3 {
        Vec3::from(self.0[i])
    }

    pub fn transpose(&self) -> Self {
        let m = &self.0;
        Mat3(std::array::from_fn(|i| std::array::from_fn(|j| m[j][i])))
    }
}

impl Index<(usize, usize)> for Mat3 {
    type Output = f32;

    fn index(&self, (i, j): (usize, usize)) -> &f32 {
        &self.0[i][j]
    }
}

impl IndexMut<(usize, usize)> for Mat3 {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f32 {
        &mut self.0[i][j]
    }
}

impl Mul for Mat3 {
    type Output = Mat3;

    fn mul(self, rhs: Mat3) -> Mat3 {
        let mut ret = Mat3([[0.0; 3]; 3]);
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    ret[(i, j)] += self[(i, k)] * rhs[(k, j)];
                }
            }
        }
        ret
    }
}

impl Mul<Vec3> for Mat3 {
    type Output = Vec3;

    #[inline(always)]
    fn mul(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.row(0).dot(rhs), self.row(1).dot(rhs), self.row(2).dot(rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_follows_right_hand_rule() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let y = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(y), Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(y.cross(x), Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn rotation_transpose_is_inverse() {
        let m = Mat3::rotation_x(0.3) * Mat3::rotation_y(-1.1) * Mat3::rotation_z(2.0);
        let p = Vec3::new(1.0, -2.0, 3.5);
        let back = m.transpose() * (m * p);
        assert!((back - p).mag() < 1e-5);
    }

    #[test]
    fn lerp_hits_endpoints() {
        let a = Vec4::new(0.0, 1.0, 2.0, 3.0);
        let b = Vec4::splat(10.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Vec4::new(5.0, 5.5, 6.0, 6.5));
    }
}
