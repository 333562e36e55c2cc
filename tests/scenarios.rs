mod common;

use rand::rngs::StdRng;
use rand::SeedableRng;

use quadraster::camera::SUB_PIXELS;
use quadraster::clip::ClippedPolygon;
use quadraster::prim3d::orient_2d;
use quadraster::sampler::{mip_level, sample_quad_packed};
use quadraster::scene::{checkerboard_image, checkerboard_texture, random_triangles};
use quadraster::simd::F32x4;
use quadraster::texture::MIP_BIN_COUNT;
use quadraster::vec::IVec2;
use quadraster::{
    depth_clear_value, render_triangle_from_data, render_triangles, Camera, CommandQueue, Filter, Filtering,
    ImageF32, ImageRgbaU8, Material, Texture, ThreadPool, Transform3D, TriangleInput, Vec3, Vec4, Visibility,
};

use common::*;

#[test]
fn orthogonal_half_square() {
    let camera = pixel_orthogonal(2, 2);
    let color = color_buffer(2, 2, 0);
    let visibility = render_triangle_from_data(
        None,
        &color,
        None,
        &camera,
        Vec3::new(-1.0, 1.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Filter::Solid,
        &TriangleInput::default(),
    );
    assert_eq!(visibility, Visibility::Full);
    assert_eq!(color.read(0, 0), Some(WHITE));
    assert_eq!(color.read(1, 0), Some(WHITE));
    assert_eq!(color.read(0, 1), Some(WHITE));
    assert_eq!(color.read(1, 1), Some(0));
}

/// Left half at depth 2, right half at depth 1, meeting at the center column.
fn draw_two_depth_quads(color: &ImageRgbaU8, depth: &ImageF32, filter: Filter, alpha: f32) {
    let red = Texture::new(color_buffer(32, 32, RED)).unwrap();
    let camera = perspective(64, 64);
    let input = TriangleInput {
        diffuse: Some(&red),
        colors: [Vec4::new(1.0, 1.0, 1.0, alpha); 3],
        ..TriangleInput::default()
    };
    let far = rect_corners(-2.0, 0.0, -2.0, 2.0, 2.0);
    let near = rect_corners(0.0, 1.0, -1.0, 1.0, 1.0);
    draw_quad(None, color, Some(depth), &camera, far, FULL_UV, filter, &input);
    draw_quad(None, color, Some(depth), &camera, near, FULL_UV, filter, &input);
}

#[test]
fn perspective_quads_meet_without_occluding() {
    let color = color_buffer(64, 64, 0);
    let depth = depth_buffer(64, 64, depth_clear_value(true));
    draw_two_depth_quads(&color, &depth, Filter::Solid, 1.0);

    assert!(color.to_vec().iter().all(|&p| p == RED));
    for y in 0..64 {
        for x in 0..64 {
            let expected = if x < 32 { 0.5 } else { 1.0 };
            let stored = depth.read(x, y).unwrap();
            assert!((stored - expected).abs() < 1e-5, "depth at ({x}, {y}) is {stored}");
        }
    }
}

#[test]
fn half_alpha_blends_and_keeps_depth() {
    let clear = 0xffc8_4000;
    let color = color_buffer(64, 64, clear);
    let depth = depth_buffer(64, 64, depth_clear_value(true));
    draw_two_depth_quads(&color, &depth, Filter::Alpha, 0.5);

    // Channel by channel: round(0.5 * red + 0.5 * clear).
    let expected = u32::from_le_bytes([128, 32, 100, 255]);
    assert_eq!(expected, 0xff64_2080);
    assert!(color.to_vec().iter().all(|&p| p == expected));
    assert!(depth.to_vec().iter().all(|&d| d == 0.0));
}

#[test]
fn near_clipped_triangle_covers_the_clipped_polygon() {
    let camera = Camera::perspective(Transform3D::IDENTITY, 64, 64, 1.0, 1.0, 100.0).unwrap();
    let corners = [
        Vec3::new(-1.0, 1.0, 3.0),
        Vec3::new(1.0, 1.0, 3.0),
        Vec3::new(0.0, -0.5, 0.5),
    ];
    let mut polygon = ClippedPolygon::new(&corners);
    polygon.clip(&camera.clip_frustum);
    assert_eq!(polygon.len(), 4);
    assert_eq!(polygon.fan().count(), 2);

    let color = color_buffer(64, 64, 0);
    let visibility = render_triangle_from_data(
        None,
        &color,
        None,
        &camera,
        corners[0],
        corners[1],
        corners[2],
        Filter::Solid,
        &TriangleInput::default(),
    );
    assert_eq!(visibility, Visibility::Partial);
    let drawn = color.to_vec().iter().filter(|&&p| p == WHITE).count();

    // Reference coverage: every fan piece tested pixel by pixel against the fill rule.
    let pieces: Vec<[IVec2; 3]> = polygon
        .fan()
        .map(|sub| sub.corners.map(|p| camera.project_to_sub_pixel(p)))
        .filter(|[a, b, c]| orient_2d(*a, *b, *c) > 0)
        .collect();
    assert_eq!(pieces.len(), 2);
    let mut reference = 0;
    for y in 0..64 {
        for x in 0..64 {
            let center = IVec2::new(x * SUB_PIXELS + SUB_PIXELS / 2, y * SUB_PIXELS + SUB_PIXELS / 2);
            let hits = pieces.iter().filter(|piece| center_is_covered(piece, center)).count();
            assert!(hits <= 1, "pixel ({x}, {y}) covered by both fan pieces");
            reference += hits;
        }
    }
    assert!(reference > 100);
    assert_eq!(reference, drawn);
}

/// A center counts when it is at or below the top corner, strictly above the bottom one,
/// strictly right of edges going up and at or left of edges going down.
fn center_is_covered(corners: &[IVec2; 3], center: IVec2) -> bool {
    let top = corners.iter().map(|p| p.y).min().unwrap_or(0);
    let bottom = corners.iter().map(|p| p.y).max().unwrap_or(0);
    if center.y < top || center.y >= bottom {
        return false;
    }
    (0..3).all(|i| {
        let (from, to) = (corners[i], corners[(i + 1) % 3]);
        let side = orient_2d(from, to, center);
        match to.y.cmp(&from.y) {
            std::cmp::Ordering::Greater => side >= 0,
            std::cmp::Ordering::Less => side > 0,
            std::cmp::Ordering::Equal => true,
        }
    })
}

#[test]
fn shrunk_texture_samples_the_coarsest_layer() {
    // One texel checkers average to the same gray on every layer past the first.
    let texture = Texture::new_mipmapped(checkerboard_image(2048, 2048, WHITE, 0xff00_0000).unwrap())
        .unwrap()
        .with_filtering(Filtering::Nearest);
    assert_eq!(texture.layer_count(), MIP_BIN_COUNT);
    let gray = 0xfe7e_7e7e;

    let view = texture.view();
    let step = 1.0 / 64.0;
    let u = F32x4::new(0.0, step, 0.0, step);
    let v = F32x4::new(0.0, 0.0, step, step);
    assert_eq!(mip_level(view.layer(0), u, v), MIP_BIN_COUNT - 1);
    assert_eq!(sample_quad_packed::<true>(&view, u, v).to_array(), [gray; 4]);

    let camera = pixel_orthogonal(64, 64);
    let color = color_buffer(64, 64, 0);
    let input = TriangleInput {
        diffuse: Some(&texture),
        ..TriangleInput::default()
    };
    let corners = rect_corners(-32.0, 32.0, -32.0, 32.0, 1.0);
    draw_quad(None, &color, None, &camera, corners, FULL_UV, Filter::Solid, &input);
    assert!(color.to_vec().iter().all(|&p| p == gray));
}

fn render_random_scene(jobs: usize, alpha: bool) -> (Vec<u32>, Vec<f32>) {
    const SIZE: usize = 512;
    let camera = perspective(SIZE, SIZE);
    let scene = random_triangles(&mut StdRng::seed_from_u64(1000), 1000, &camera, alpha);
    let texture = checkerboard_texture(64, true).unwrap();
    let color = color_buffer(SIZE, SIZE, 0xff20_1008);
    let depth = depth_buffer(SIZE, SIZE, depth_clear_value(true));
    let material = Material {
        diffuse: Some(&texture),
        light: None,
        filter: if alpha { Filter::Alpha } else { Filter::Solid },
    };

    let mut queue = CommandQueue::new();
    let metrics = render_triangles(Some(&mut queue), &color, Some(&depth), &camera, &scene.mesh(), &material);
    assert_eq!(metrics.triangles_submitted, 1000);
    assert_eq!(metrics.sub_triangles_drawn, queue.len());

    let pool = ThreadPool::new(jobs).unwrap();
    queue.execute_on(&pool, color.rect(), jobs);
    (color.to_vec(), depth.to_vec())
}

#[test]
fn one_and_eight_threads_render_the_same_opaque_scene() {
    let (single_color, single_depth) = render_random_scene(1, false);
    let (tiled_color, tiled_depth) = render_random_scene(8, false);
    assert!(single_color.iter().any(|&p| p != 0xff20_1008));
    assert_eq!(single_color, tiled_color);
    assert_eq!(single_depth, tiled_depth);
}

#[test]
fn one_and_eight_threads_render_a_blended_scene_within_one_step() {
    let (single_color, single_depth) = render_random_scene(1, true);
    let (tiled_color, tiled_depth) = render_random_scene(8, true);
    assert_eq!(single_depth, tiled_depth);
    for (a, b) in single_color.into_iter().zip(tiled_color) {
        assert!(channel_distance(a, b) <= 1, "{a:08x} vs {b:08x}");
    }
}
