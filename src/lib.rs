//! CPU rasterizer drawing textured, vertex colored triangles in 2x2 pixel quads.
//!
//! Triangles are classified against the camera frustum, clipped when they cross it, projected
//! to sub-pixel integer coordinates and converted into row intervals. A fill loop specialized
//! for the triangle's features then shades and writes the covered quads. Draws can run
//! immediately or go through a [`CommandQueue`] that renders horizontal tiles in parallel.

pub mod buf;
pub mod camera;
pub mod clip;
pub mod config;
pub mod error;
pub mod io;
pub mod math;
pub mod math_utils;
pub mod pipeline;
pub mod prim3d;
pub mod queue;
pub mod sampler;
pub mod scene;
pub mod scratch;
pub mod shaders;
pub mod simd;
pub mod simd_config;
pub mod texture;
pub mod thread_pool;
pub mod vec;

pub use buf::{Image, ImageF32, ImageRgbaU8};
pub use camera::{Camera, CameraKind, Transform3D, Visibility};
pub use error::{RasterError, Result};
pub use io::load_rgba;
pub use math::IRect;
pub use pipeline::{
    render_triangle_from_data, render_triangle_from_data_depth, render_triangle_with_shader, render_triangles,
    DrawCommand, Filter, Material, Mesh, Metrics, TriangleInput,
};
pub use prim3d::depth_clear_value;
pub use queue::CommandQueue;
pub use shaders::{FragmentShader, NullShader};
pub use texture::{Filtering, Texture};
pub use thread_pool::ThreadPool;
pub use vec::{Vec2, Vec3, Vec4};
