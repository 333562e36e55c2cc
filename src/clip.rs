//! Convex polygon clipping against the camera frustum.
//!
//! The polygon starts as the source triangle `A, B, C` and each vertex carries its barycentric
//! weights for `B` and `C` (`A` is implied). Clipping against one plane adds at most one
//! vertex, so after six planes the polygon never holds more than nine.

use crate::camera::{Frustum, Plane};
use crate::vec::{Vec2, Vec3};

pub const MAX_CLIP_VERTICES: usize = 9;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SubVertex {
    /// Camera space position.
    pub point: Vec3,
    /// Weights of the source triangle's `B` and `C` corners.
    pub weights: Vec2,
    distance: f32,
    outside: bool,
}

impl SubVertex {
    pub fn new(point: Vec3, weights: Vec2) -> Self {
        SubVertex {
            point,
            weights,
            distance: 0.0,
            outside: false,
        }
    }

    /// Point where the edge from `self` (outside) to `inside` crosses the plane.
    fn cut_towards(&self, inside: &SubVertex) -> SubVertex {
        let t = self.distance / (self.distance - inside.distance);
        SubVertex::new(
            self.point.lerp(inside.point, t),
            self.weights.lerp(inside.weights, t),
        )
    }
}

/// One triangle of a clipped polygon's fan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubTriangle {
    pub corners: [Vec3; 3],
    /// Source `B` weight of each corner.
    pub sub_b: Vec3,
    /// Source `C` weight of each corner.
    pub sub_c: Vec3,
}

impl SubTriangle {
    /// The source triangle itself.
    pub fn whole(corners: [Vec3; 3]) -> Self {
        SubTriangle {
            corners,
            sub_b: Vec3::new(0.0, 1.0, 0.0),
            sub_c: Vec3::new(0.0, 0.0, 1.0),
        }
    }

    /// Maps weights relative to this sub-triangle back to the source triangle's `(B, C)`.
    pub fn source_weights(&self, b: f32, c: f32) -> Vec2 {
        let a = 1.0 - b - c;
        Vec2::new(
            a * self.sub_b.x + b * self.sub_b.y + c * self.sub_b.z,
            a * self.sub_c.x + b * self.sub_c.y + c * self.sub_c.z,
        )
    }
}

#[derive(Clone, Debug)]
pub struct ClippedPolygon {
    vertices: [SubVertex; MAX_CLIP_VERTICES],
    count: usize,
}

impl ClippedPolygon {
    pub fn new(corners: &[Vec3; 3]) -> Self {
        let mut vertices = [SubVertex::default(); MAX_CLIP_VERTICES];
        vertices[0] = SubVertex::new(corners[0], Vec2::new(0.0, 0.0));
        vertices[1] = SubVertex::new(corners[1], Vec2::new(1.0, 0.0));
        vertices[2] = SubVertex::new(corners[2], Vec2::new(0.0, 1.0));
        ClippedPolygon { vertices, count: 3 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn vertices(&self) -> &[SubVertex] {
        &self.vertices[..self.count]
    }

    fn insert(&mut self, index: usize, vertex: SubVertex) {
        assert!(self.count < MAX_CLIP_VERTICES, "clipped polygon overflow");
        self.vertices.copy_within(index..self.count, index + 1);
        self.vertices[index] = vertex;
        self.count += 1;
    }

    fn remove(&mut self, index: usize) {
        self.vertices.copy_within(index + 1..self.count, index);
        self.count -= 1;
    }

    /// Cuts away the part of the polygon outside `plane`.
    pub fn clip_plane(&mut self, plane: &Plane) {
        let n = self.count;
        let mut outside = 0;
        for vertex in &mut self.vertices[..n] {
            vertex.distance = plane.signed_distance(vertex.point);
            vertex.outside = vertex.distance < 0.0;
            outside += vertex.outside as usize;
        }
        if outside == 0 {
            return;
        }
        if outside == n {
            self.count = 0;
            return;
        }

        if outside == 1 {
            let i = self.vertices[..n].iter().position(|v| v.outside).unwrap_or(0);
            let prev = self.vertices[(i + n - 1) % n];
            let next = self.vertices[(i + 1) % n];
            let cut = self.vertices[i];
            self.vertices[i] = cut.cut_towards(&prev);
            self.insert(i + 1, cut.cut_towards(&next));
            return;
        }

        // A convex polygon has one contiguous run of outside vertices. Replace both ends of the
        // run by the boundary crossings and drop whatever is left in between.
        let first = (0..n)
            .find(|&i| self.vertices[i].outside && !self.vertices[(i + n - 1) % n].outside)
            .unwrap_or(0);
        let last = (first + outside - 1) % n;
        let before = self.vertices[(first + n - 1) % n];
        let after = self.vertices[(last + 1) % n];
        self.vertices[first] = self.vertices[first].cut_towards(&before);
        self.vertices[last] = self.vertices[last].cut_towards(&after);
        for i in (0..n).rev() {
            if self.vertices[i].outside {
                self.remove(i);
            }
        }
    }

    /// Clips against every plane of `frustum`, stopping early once nothing is left.
    pub fn clip(&mut self, frustum: &Frustum) {
        for plane in &frustum.planes {
            if self.count < 3 {
                self.count = 0;
                return;
            }
            self.clip_plane(plane);
        }
        if self.count < 3 {
            self.count = 0;
        }
    }

    /// Fan triangulation `(v0, v1, v2), (v0, v2, v3), ...`.
    pub fn fan(&self) -> impl Iterator<Item = SubTriangle> + '_ {
        let v = self.vertices();
        (1..self.count.saturating_sub(1)).map(move |i| {
            let (a, b, c) = (v[0], v[i], v[i + 1]);
            SubTriangle {
                corners: [a.point, b.point, c.point],
                sub_b: Vec3::new(a.weights.x, b.weights.x, c.weights.x),
                sub_c: Vec3::new(a.weights.y, b.weights.y, c.weights.y),
            }
        })
    }
}
