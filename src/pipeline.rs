//! Triangle submission: visibility, clipping, projection and the draw commands that result.

use tracing::{trace, warn};

use crate::buf::{ImageF32, ImageRgbaU8};
use crate::camera::{Camera, Visibility};
use crate::clip::{ClippedPolygon, SubTriangle};
use crate::math::IRect;
use crate::prim3d::{
    fill_depth, fill_function, rasterize_rows, row_buffer_len, FillFn, FillTarget, IntTriangle, Projection,
};
use crate::queue::CommandQueue;
use crate::scratch;
use crate::shaders::{select_fill, FragmentShader, ShaderData, ShaderFlags};
use crate::texture::Texture;
use crate::vec::{Vec3, Vec4};

/// How a draw combines with the target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    /// Overwrite color and depth.
    #[default]
    Solid,
    /// Blend by the shaded alpha. Depth is tested but not written.
    Alpha,
}

/// Everything besides positions that a triangle carries into its shader.
#[derive(Clone, Copy, Debug)]
pub struct TriangleInput<'a> {
    pub diffuse: Option<&'a Texture>,
    pub light: Option<&'a Texture>,
    /// Per corner: `xy` diffuse and `zw` light map coordinates.
    pub tex_coords: [Vec4; 3],
    /// Per corner RGBA in `0..=1`.
    pub colors: [Vec4; 3],
}

impl Default for TriangleInput<'_> {
    fn default() -> Self {
        TriangleInput {
            diffuse: None,
            light: None,
            tex_coords: [Vec4::default(); 3],
            colors: [Vec4::splat(1.0); 3],
        }
    }
}

/// One projected sub-triangle with everything needed to rasterize it later, on any thread.
#[derive(Clone, Copy)]
pub struct DrawCommand<'a> {
    pub target: FillTarget<'a>,
    pub perspective: bool,
    pub filter: Filter,
    pub data: ShaderData<'a>,
    pub fill: FillFn,
    pub triangle: IntTriangle,
    /// Camera space depth of each corner.
    pub depths: [f32; 3],
    /// Source triangle `B` and `C` weights of each corner.
    pub sub_b: Vec3,
    pub sub_c: Vec3,
    /// Pixels the command may touch, further limited by the tile it runs in.
    pub clip: IRect,
    /// Skipped by queue execution.
    pub occluded: bool,
}

impl DrawCommand<'_> {
    /// Rasterizes the part of the command inside `tile`.
    pub fn execute(&self, tile: IRect) {
        if self.occluded {
            return;
        }
        let mut clip = self.clip.intersection(tile).intersection(self.target.color.rect());
        if let Some(depth) = self.target.depth {
            clip = clip.intersection(depth.rect());
        }
        if clip.is_empty() {
            return;
        }
        let len = row_buffer_len(&self.triangle, clip);
        if len == 0 {
            return;
        }
        let projection = Projection::new(&self.triangle, self.depths, self.sub_b, self.sub_c, self.perspective);
        scratch::with_row_buffer(len, |buffer| {
            let shape = rasterize_rows(&self.triangle, clip, buffer);
            (self.fill)(&self.target, &self.data, &projection, &shape);
        });
    }
}

/// Counters gathered by [`render_triangles`].
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    pub triangles_submitted: usize,
    pub frustum_culled: usize,
    pub clipped: usize,
    /// Sub-triangles dropped for facing away or having no area.
    pub backfaces_culled: usize,
    pub sub_triangles_drawn: usize,
    pub invalid_indices: usize,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics::default()
    }

    pub fn clear(&mut self) {
        *self = Metrics::default();
    }

    fn record(&mut self, outcome: &DrawOutcome) {
        self.triangles_submitted += 1;
        match outcome.visibility {
            Visibility::Hidden => self.frustum_culled += 1,
            Visibility::Partial => self.clipped += 1,
            Visibility::Full => {}
        }
        self.backfaces_culled += outcome.rejected;
        self.sub_triangles_drawn += outcome.drawn;
    }
}

impl std::fmt::Display for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let &Metrics {
            triangles_submitted,
            frustum_culled,
            clipped,
            backfaces_culled,
            sub_triangles_drawn,
            invalid_indices,
        } = self;
        writeln!(f, "render metrics:")?;
        writeln!(f, "\ttriangles submitted: {triangles_submitted}")?;
        writeln!(f, "\tfrustum culled: {frustum_culled}")?;
        writeln!(f, "\tclipped: {clipped}")?;
        writeln!(f, "\tbackfaces culled: {backfaces_culled}")?;
        writeln!(f, "\tsub-triangles drawn: {sub_triangles_drawn}")?;
        if invalid_indices > 0 {
            writeln!(f, "\tinvalid indices: {invalid_indices}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
struct DrawOutcome {
    visibility: Visibility,
    drawn: usize,
    rejected: usize,
}

impl DrawOutcome {
    fn skipped(visibility: Visibility) -> Self {
        DrawOutcome {
            visibility,
            drawn: 0,
            rejected: 0,
        }
    }
}

/// Calls `f` with the pieces of a camera space triangle that need rasterizing.
fn for_each_sub_triangle(camera: &Camera, local: [Vec3; 3], visibility: Visibility, mut f: impl FnMut(SubTriangle)) {
    match visibility {
        Visibility::Hidden => trace!("triangle outside the frustum"),
        Visibility::Full => f(SubTriangle::whole(local)),
        Visibility::Partial => {
            let mut polygon = ClippedPolygon::new(&local);
            polygon.clip(&camera.clip_frustum);
            trace!(vertices = polygon.len(), "clipped triangle");
            polygon.fan().for_each(f);
        }
    }
}

/// Integer screen triangle of a sub-triangle, or `None` when it faces away or has no area.
fn project(camera: &Camera, sub: &SubTriangle) -> Option<IntTriangle> {
    let triangle = IntTriangle::new(sub.corners.map(|p| camera.project_to_sub_pixel(p)));
    (triangle.front_facing && !triangle.is_degenerate()).then_some(triangle)
}

fn target_is_valid(color: &ImageRgbaU8, depth: Option<&ImageF32>) -> bool {
    match depth {
        Some(depth) if depth.width() != color.width() || depth.height() != color.height() => {
            warn!(
                color = ?(color.width(), color.height()),
                depth = ?(depth.width(), depth.height()),
                "depth buffer size differs from color buffer, skipping draw"
            );
            false
        }
        _ => true,
    }
}

#[allow(clippy::too_many_arguments)]
fn draw<'a>(
    mut queue: Option<&mut CommandQueue<'a>>,
    color: &'a ImageRgbaU8,
    depth: Option<&'a ImageF32>,
    camera: &Camera,
    corners: [Vec3; 3],
    filter: Filter,
    data: ShaderData<'a>,
    fill: FillFn,
) -> DrawOutcome {
    let local = corners.map(|p| camera.world_to_camera(p));
    let visibility = camera.visibility(&local);
    if !target_is_valid(color, depth) {
        return DrawOutcome::skipped(visibility);
    }

    let mut outcome = DrawOutcome::skipped(visibility);
    let target = FillTarget { color, depth };
    for_each_sub_triangle(camera, local, visibility, |sub| {
        let Some(triangle) = project(camera, &sub) else {
            outcome.rejected += 1;
            return;
        };
        let command = DrawCommand {
            target,
            perspective: camera.is_perspective(),
            filter,
            data,
            fill,
            triangle,
            depths: sub.corners.map(|p| p.z),
            sub_b: sub.sub_b,
            sub_c: sub.sub_c,
            clip: color.rect(),
            occluded: false,
        };
        match queue.as_deref_mut() {
            Some(queue) => queue.add(command),
            None => command.execute(command.clip),
        }
        outcome.drawn += 1;
    });
    outcome
}

/// Draws the world space triangle `a, b, c`, or queues it when `queue` is given.
///
/// The triangle is front facing when it winds clockwise on screen. Returns its visibility
/// against the camera frustum.
#[allow(clippy::too_many_arguments)]
pub fn render_triangle_from_data<'a>(
    queue: Option<&mut CommandQueue<'a>>,
    color: &'a ImageRgbaU8,
    depth: Option<&'a ImageF32>,
    camera: &Camera,
    a: Vec3,
    b: Vec3,
    c: Vec3,
    filter: Filter,
    input: &TriangleInput<'a>,
) -> Visibility {
    let flags = ShaderFlags::of(input);
    let data = ShaderData::new(input, &flags);
    let fill = select_fill(&flags, camera.is_perspective(), filter == Filter::Alpha);
    draw(queue, color, depth, camera, [a, b, c], filter, data, fill).visibility
}

/// Like [`render_triangle_from_data`] with a caller chosen fragment shader.
#[allow(clippy::too_many_arguments)]
pub fn render_triangle_with_shader<'a, S: FragmentShader>(
    queue: Option<&mut CommandQueue<'a>>,
    color: &'a ImageRgbaU8,
    depth: Option<&'a ImageF32>,
    camera: &Camera,
    corners: [Vec3; 3],
    filter: Filter,
    input: &TriangleInput<'a>,
) -> Visibility {
    let data = ShaderData::new(input, &ShaderFlags::of(input));
    let fill = fill_function::<S>(camera.is_perspective(), filter == Filter::Alpha);
    draw(queue, color, depth, camera, corners, filter, data, fill).visibility
}

/// Writes only the depth of the world space triangle `a, b, c`.
pub fn render_triangle_from_data_depth(depth: &ImageF32, camera: &Camera, a: Vec3, b: Vec3, c: Vec3) -> Visibility {
    let local = [a, b, c].map(|p| camera.world_to_camera(p));
    let visibility = camera.visibility(&local);
    let clip = depth.rect();
    for_each_sub_triangle(camera, local, visibility, |sub| {
        let Some(triangle) = project(camera, &sub) else {
            return;
        };
        let len = row_buffer_len(&triangle, clip);
        if len == 0 {
            return;
        }
        let plane = Projection::depth_only(&triangle, sub.corners.map(|p| p.z), camera.is_perspective());
        scratch::with_row_buffer(len, |buffer| {
            let shape = rasterize_rows(&triangle, clip, buffer);
            if camera.is_perspective() {
                fill_depth::<true>(depth, &plane, &shape);
            } else {
                fill_depth::<false>(depth, &plane, &shape);
            }
        });
    });
    visibility
}

/// Indexed triangles. Missing texture coordinates default to zero and missing colors to
/// opaque white.
#[derive(Clone, Copy, Debug, Default)]
pub struct Mesh<'m> {
    pub positions: &'m [Vec3],
    pub tex_coords: &'m [Vec4],
    pub colors: &'m [Vec4],
    pub indices: &'m [[u32; 3]],
}

/// Textures and blend mode shared by all triangles of a [`render_triangles`] call.
#[derive(Clone, Copy, Debug, Default)]
pub struct Material<'a> {
    pub diffuse: Option<&'a Texture>,
    pub light: Option<&'a Texture>,
    pub filter: Filter,
}

/// Draws or queues every triangle of `mesh`. Triangles with out of range indices are skipped.
pub fn render_triangles<'a>(
    mut queue: Option<&mut CommandQueue<'a>>,
    color: &'a ImageRgbaU8,
    depth: Option<&'a ImageF32>,
    camera: &Camera,
    mesh: &Mesh<'_>,
    material: &Material<'a>,
) -> Metrics {
    let mut metrics = Metrics::new();
    for &indices in mesh.indices {
        let indices = indices.map(|i| i as usize);
        let Some(positions) = gather(mesh.positions, indices) else {
            metrics.invalid_indices += 1;
            continue;
        };
        let input = TriangleInput {
            diffuse: material.diffuse,
            light: material.light,
            tex_coords: gather(mesh.tex_coords, indices).unwrap_or_default(),
            colors: gather(mesh.colors, indices).unwrap_or([Vec4::splat(1.0); 3]),
        };
        let flags = ShaderFlags::of(&input);
        let data = ShaderData::new(&input, &flags);
        let fill = select_fill(&flags, camera.is_perspective(), material.filter == Filter::Alpha);
        let outcome = draw(queue.as_deref_mut(), color, depth, camera, positions, material.filter, data, fill);
        metrics.record(&outcome);
    }
    if metrics.invalid_indices > 0 {
        warn!(count = metrics.invalid_indices, "skipped triangles with out of range indices");
    }
    metrics
}

fn gather<T: Copy>(values: &[T], indices: [usize; 3]) -> Option<[T; 3]> {
    Some([*values.get(indices[0])?, *values.get(indices[1])?, *values.get(indices[2])?])
}
