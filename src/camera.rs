//! Camera space, frustums and the projection to sub-pixel screen coordinates.
//!
//! Camera space has `x` to the right, `y` up and `z` into the screen, so visible points have a
//! positive depth. Screen space has `y` pointing down.

use crate::error::{RasterError, Result};
use crate::vec::{IVec2, Mat3, Vec2, Vec3};

/// Sub-pixel units per pixel.
pub const SUB_PIXELS: i64 = 256;
pub const SUB_PIXEL_BITS: u32 = 8;

/// Projected coordinates beyond this many sub-pixels are replaced by zero.
pub const SUB_PIXEL_LIMIT: f64 = (1u64 << 30) as f64;

/// Side planes of the clip frustum are this much wider than the cull frustum.
pub const CLIP_PADDING: f32 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraKind {
    Orthogonal,
    Perspective,
}

/// Rotation (or any linear part) followed by a translation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3D {
    pub matrix: Mat3,
    pub position: Vec3,
}

impl Default for Transform3D {
    fn default() -> Self {
        Transform3D::IDENTITY
    }
}

impl Transform3D {
    pub const IDENTITY: Transform3D = Transform3D {
        matrix: Mat3::IDENTITY,
        position: Vec3::new(0.0, 0.0, 0.0),
    };

    pub fn new(matrix: Mat3, position: Vec3) -> Self {
        Transform3D { matrix, position }
    }

    pub fn from_position(position: Vec3) -> Self {
        Transform3D { matrix: Mat3::IDENTITY, position }
    }

    /// Rotation around x, then y, then z, all in degrees.
    pub fn from_euler_degrees(position: Vec3, degrees: Vec3) -> Self {
        let r = degrees.map(f32::to_radians);
        let matrix = Mat3::rotation_z(r.z) * Mat3::rotation_y(r.y) * Mat3::rotation_x(r.x);
        Transform3D { matrix, position }
    }

    #[inline]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.matrix * point + self.position
    }

    /// Inverse of [`Transform3D::transform_point`] for rigid transforms.
    #[inline]
    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        self.matrix.transpose() * (point - self.position)
    }
}

/// `normal . p + offset >= 0` is inside.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub offset: f32,
}

impl Plane {
    pub const fn new(normal: Vec3, offset: f32) -> Self {
        Plane { normal, offset }
    }

    #[inline(always)]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.offset
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    fn new(kind: CameraKind, width_slope: f32, height_slope: f32, near: f32, far: f32) -> Self {
        let sides = match kind {
            CameraKind::Perspective => [
                Plane::new(Vec3::new(1.0, 0.0, width_slope), 0.0),
                Plane::new(Vec3::new(-1.0, 0.0, width_slope), 0.0),
                Plane::new(Vec3::new(0.0, 1.0, height_slope), 0.0),
                Plane::new(Vec3::new(0.0, -1.0, height_slope), 0.0),
            ],
            CameraKind::Orthogonal => [
                Plane::new(Vec3::new(1.0, 0.0, 0.0), width_slope),
                Plane::new(Vec3::new(-1.0, 0.0, 0.0), width_slope),
                Plane::new(Vec3::new(0.0, 1.0, 0.0), height_slope),
                Plane::new(Vec3::new(0.0, -1.0, 0.0), height_slope),
            ],
        };
        let [left, right, bottom, top] = sides;
        Frustum {
            planes: [
                Plane::new(Vec3::new(0.0, 0.0, 1.0), -near),
                Plane::new(Vec3::new(0.0, 0.0, -1.0), far),
                left,
                right,
                bottom,
                top,
            ],
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        self.planes.iter().all(|plane| plane.signed_distance(point) >= 0.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Every corner is outside the same cull plane.
    Hidden,
    /// Some corner is outside the clip frustum; the triangle must be clipped.
    Partial,
    Full,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub kind: CameraKind,
    /// Camera to world transform.
    pub transform: Transform3D,
    pub image_width: f32,
    pub image_height: f32,
    /// Perspective: horizontal half extent per unit of depth. Orthogonal: half of the visible
    /// width in world units.
    pub width_slope: f32,
    pub height_slope: f32,
    pub near: f32,
    pub far: f32,
    pub cull_frustum: Frustum,
    pub clip_frustum: Frustum,
}

impl Camera {
    pub fn perspective(
        transform: Transform3D,
        image_width: usize,
        image_height: usize,
        width_slope: f32,
        near: f32,
        far: f32,
    ) -> Result<Self> {
        if near <= 0.0 {
            return Err(RasterError::InvalidCamera("perspective near plane must be positive"));
        }
        Self::build(CameraKind::Perspective, transform, image_width, image_height, width_slope, near, far)
    }

    /// `half_width` is half of the visible width in world units.
    pub fn orthogonal(
        transform: Transform3D,
        image_width: usize,
        image_height: usize,
        half_width: f32,
        near: f32,
        far: f32,
    ) -> Result<Self> {
        Self::build(CameraKind::Orthogonal, transform, image_width, image_height, half_width, near, far)
    }

    fn build(
        kind: CameraKind,
        transform: Transform3D,
        image_width: usize,
        image_height: usize,
        width_slope: f32,
        near: f32,
        far: f32,
    ) -> Result<Self> {
        if image_width == 0 || image_height == 0 {
            return Err(RasterError::InvalidCamera("image size must be positive"));
        }
        if !(width_slope.is_finite() && width_slope > 0.0) {
            return Err(RasterError::InvalidCamera("width slope must be positive and finite"));
        }
        if !(near.is_finite() && far.is_finite() && near < far) {
            return Err(RasterError::InvalidCamera("near plane must be in front of the far plane"));
        }
        let (w, h) = (image_width as f32, image_height as f32);
        let height_slope = width_slope * h / w;
        Ok(Camera {
            kind,
            transform,
            image_width: w,
            image_height: h,
            width_slope,
            height_slope,
            near,
            far,
            cull_frustum: Frustum::new(kind, width_slope, height_slope, near, far),
            clip_frustum: Frustum::new(kind, width_slope * CLIP_PADDING, height_slope * CLIP_PADDING, near, far),
        })
    }

    #[inline]
    pub fn is_perspective(&self) -> bool {
        self.kind == CameraKind::Perspective
    }

    #[inline]
    pub fn world_to_camera(&self, point: Vec3) -> Vec3 {
        self.transform.inverse_transform_point(point)
    }

    /// Classifies a triangle given in camera space.
    pub fn visibility(&self, corners: &[Vec3; 3]) -> Visibility {
        let outside = |plane: &Plane| corners.map(|c| plane.signed_distance(c) < 0.0);
        if self.cull_frustum.planes.iter().any(|plane| outside(plane) == [true; 3]) {
            Visibility::Hidden
        } else if self.clip_frustum.planes.iter().any(|plane| outside(plane).contains(&true)) {
            Visibility::Partial
        } else {
            Visibility::Full
        }
    }

    /// Screen position in pixels of a camera space point in front of the camera.
    #[inline]
    pub fn project_to_screen(&self, p: Vec3) -> Vec2 {
        let half_x = 0.5 / self.width_slope;
        let half_y = 0.5 / self.height_slope;
        match self.kind {
            CameraKind::Perspective => Vec2::new(
                (p.x * half_x + p.z * 0.5) * self.image_width / p.z,
                (-p.y * half_y + p.z * 0.5) * self.image_height / p.z,
            ),
            CameraKind::Orthogonal => Vec2::new(
                (p.x * half_x + 0.5) * self.image_width,
                (-p.y * half_y + 0.5) * self.image_height,
            ),
        }
    }

    /// Screen position in sub-pixel units.
    #[inline]
    pub fn project_to_sub_pixel(&self, p: Vec3) -> IVec2 {
        let screen = self.project_to_screen(p);
        IVec2::new(to_sub_pixel(screen.x), to_sub_pixel(screen.y))
    }
}

/// Rounds a pixel coordinate to sub-pixel units. Out of range values, NaN included, become 0.
#[inline]
pub fn to_sub_pixel(value: f32) -> i64 {
    let scaled = (value as f64 * SUB_PIXELS as f64).round();
    if scaled.abs() <= SUB_PIXEL_LIMIT {
        scaled as i64
    } else {
        0
    }
}
