//! Procedural scenes for the binary, the benchmark and tests.

use rand::Rng;

use crate::buf::ImageRgbaU8;
use crate::camera::{Camera, CameraKind};
use crate::error::Result;
use crate::pipeline::Mesh;
use crate::texture::Texture;
use crate::vec::{Vec3, Vec4};

/// Owned vertex and index data behind a [`Mesh`].
#[derive(Clone, Debug, Default)]
pub struct SceneMesh {
    pub positions: Vec<Vec3>,
    pub tex_coords: Vec<Vec4>,
    pub colors: Vec<Vec4>,
    pub indices: Vec<[u32; 3]>,
}

impl SceneMesh {
    pub fn mesh(&self) -> Mesh<'_> {
        Mesh {
            positions: &self.positions,
            tex_coords: &self.tex_coords,
            colors: &self.colors,
            indices: &self.indices,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }
}

/// `count` front facing triangles scattered through the camera's view, some reaching past its
/// edges. Corner alphas are random when `translucent` is set and opaque otherwise.
pub fn random_triangles(rng: &mut impl Rng, count: usize, camera: &Camera, translucent: bool) -> SceneMesh {
    let mut scene = SceneMesh::default();
    let depth_range = match camera.kind {
        CameraKind::Perspective => (camera.near * 2.0).max(1.0)..(camera.far * 0.5).max(camera.near * 4.0),
        CameraKind::Orthogonal => camera.near..camera.far,
    };
    for _ in 0..count {
        let z = rng.gen_range(depth_range.clone());
        // Half extents of the view at this depth.
        let (half_w, half_h) = match camera.kind {
            CameraKind::Perspective => (camera.width_slope * z, camera.height_slope * z),
            CameraKind::Orthogonal => (camera.width_slope, camera.height_slope),
        };
        let center = Vec3::new(
            rng.gen_range(-1.2..1.2) * half_w,
            rng.gen_range(-1.2..1.2) * half_h,
            z,
        );
        let radius = rng.gen_range(0.02..0.3) * half_w;
        // Decreasing angles wind clockwise as seen from the camera.
        let mut angles = [0.0f32; 3].map(|_| rng.gen_range(0.0..std::f32::consts::TAU));
        angles.sort_by(|a, b| b.total_cmp(a));

        let base = scene.positions.len() as u32;
        for angle in angles {
            let offset = Vec3::new(angle.cos() * radius, angle.sin() * radius, rng.gen_range(-0.1..0.1) * radius);
            scene.positions.push(camera.transform.transform_point(center + offset));
            scene.tex_coords.push(Vec4::new(
                angle.cos() * 2.0,
                angle.sin() * 2.0,
                rng.gen_range(0.0..1.0),
                rng.gen_range(0.0..1.0),
            ));
            let alpha = if translucent { rng.gen_range(0.2..1.0) } else { 1.0 };
            scene
                .colors
                .push(Vec4::new(rng.gen_range(0.2..1.0), rng.gen_range(0.2..1.0), rng.gen_range(0.2..1.0), alpha));
        }
        scene.indices.push([base, base + 1, base + 2]);
    }
    scene
}

/// A `size` x `size` checkerboard of `cells` x `cells` squares alternating between `a` and `b`.
pub fn checkerboard_image(size: usize, cells: usize, a: u32, b: u32) -> Result<ImageRgbaU8> {
    let cell = (size / cells.max(1)).max(1);
    let pixels: Vec<u32> = (0..size * size)
        .map(|i| {
            let (x, y) = (i % size / cell, i / size / cell);
            if (x + y) % 2 == 0 {
                a
            } else {
                b
            }
        })
        .collect();
    ImageRgbaU8::from_pixels(size, size, &pixels)
}

/// Checkerboard texture, with a mip pyramid when `mipmaps` is set.
pub fn checkerboard_texture(size: usize, mipmaps: bool) -> Result<Texture> {
    let image = checkerboard_image(size, 8, 0xffff_ffff, 0xff40_4040)?;
    if mipmaps {
        Texture::new_mipmapped(image)
    } else {
        Texture::new(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Transform3D, Visibility};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn random_scene_is_deterministic_and_mostly_visible() {
        let camera = Camera::perspective(Transform3D::IDENTITY, 64, 48, 1.0, 0.1, 50.0).unwrap();
        let first = random_triangles(&mut StdRng::seed_from_u64(7), 50, &camera, false);
        let second = random_triangles(&mut StdRng::seed_from_u64(7), 50, &camera, false);
        assert_eq!(first.positions, second.positions);
        assert_eq!(first.triangle_count(), 50);
        let visible = first
            .indices
            .iter()
            .filter(|tri| camera.visibility(&tri.map(|i| first.positions[i as usize])) != Visibility::Hidden)
            .count();
        assert!(visible > 25);
    }

    #[test]
    fn checkerboard_cells() {
        let image = checkerboard_image(32, 4, 1, 2).unwrap();
        assert_eq!(image.read(0, 0), Some(1));
        assert_eq!(image.read(8, 0), Some(2));
        assert_eq!(image.read(8, 8), Some(1));
        let texture = checkerboard_texture(64, true).unwrap();
        assert_eq!(texture.layer_count(), 2);
    }
}
