#![allow(dead_code)]

use quadraster::{
    render_triangle_from_data, Camera, CommandQueue, Filter, ImageF32, ImageRgbaU8, Transform3D, TriangleInput,
    Vec3, Vec4,
};

pub const WHITE: u32 = 0xffff_ffff;
pub const RED: u32 = 0xff00_00ff;

pub fn perspective(width: usize, height: usize) -> Camera {
    Camera::perspective(Transform3D::IDENTITY, width, height, 1.0, 0.1, 100.0).unwrap()
}

/// Orthogonal camera where one world unit is one pixel and the origin is the image center.
pub fn pixel_orthogonal(width: usize, height: usize) -> Camera {
    Camera::orthogonal(Transform3D::IDENTITY, width, height, width as f32 / 2.0, 0.0, 100.0).unwrap()
}

pub fn color_buffer(width: usize, height: usize, clear: u32) -> ImageRgbaU8 {
    let mut color = ImageRgbaU8::new(width, height).unwrap();
    color.fill(clear);
    color
}

pub fn depth_buffer(width: usize, height: usize, clear: f32) -> ImageF32 {
    let mut depth = ImageF32::new(width, height).unwrap();
    depth.fill(clear);
    depth
}

/// Draws the quad `corners` (top left, top right, bottom right, bottom left as seen from the
/// camera) as two triangles. `uv` are the matching diffuse coordinates.
#[allow(clippy::too_many_arguments)]
pub fn draw_quad<'a>(
    mut queue: Option<&mut CommandQueue<'a>>,
    color: &'a ImageRgbaU8,
    depth: Option<&'a ImageF32>,
    camera: &Camera,
    corners: [Vec3; 4],
    uv: [(f32, f32); 4],
    filter: Filter,
    input: &TriangleInput<'a>,
) {
    let tex = uv.map(|(u, v)| Vec4::new(u, v, u, v));
    let [tl, tr, br, bl] = corners;
    let first = TriangleInput {
        tex_coords: [tex[0], tex[1], tex[3]],
        ..*input
    };
    let second = TriangleInput {
        tex_coords: [tex[1], tex[2], tex[3]],
        ..*input
    };
    render_triangle_from_data(queue.as_deref_mut(), color, depth, camera, tl, tr, bl, filter, &first);
    render_triangle_from_data(queue, color, depth, camera, tr, br, bl, filter, &second);
}

/// Axis aligned quad at depth `z` spanning `x0..x1` and `y0..y1` in camera space, `y` up.
pub fn rect_corners(x0: f32, x1: f32, y0: f32, y1: f32, z: f32) -> [Vec3; 4] {
    [
        Vec3::new(x0, y1, z),
        Vec3::new(x1, y1, z),
        Vec3::new(x1, y0, z),
        Vec3::new(x0, y0, z),
    ]
}

pub const FULL_UV: [(f32, f32); 4] = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];

pub fn channels(pixel: u32) -> [u8; 4] {
    pixel.to_le_bytes()
}

/// Largest per channel difference between two packed pixels.
pub fn channel_distance(a: u32, b: u32) -> u8 {
    channels(a)
        .into_iter()
        .zip(channels(b))
        .map(|(x, y)| x.abs_diff(y))
        .max()
        .unwrap_or(0)
}
