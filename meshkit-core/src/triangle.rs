//! Index-based triangles with cached plane equation and bounding box

use crate::bounds::Aabb;
use crate::point::*;
use serde::{Deserialize, Serialize};

/// A triangle referencing three vertices of an external vertex buffer.
///
/// The plane coefficients and the bounding box are cached and must be
/// refreshed with [`Triangle::update`] whenever one of the referenced
/// vertices moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    /// Vertex indices, in winding order
    pub indices: [usize; 3],
    /// Plane coefficients `[A, B, C, D]` with `A*x + B*y + C*z + D = 0` on the plane
    plane: [f32; 4],
    bounds: Aabb,
    /// Tombstone flag used by simplification
    pub deleted: bool,
}

impl Triangle {
    pub fn new(vertices: &[Point3f], indices: [usize; 3]) -> Self {
        let mut triangle = Self {
            indices,
            plane: [0.0; 4],
            bounds: Aabb::from_point(&vertices[indices[0]]),
            deleted: false,
        };
        triangle.update(vertices);
        triangle
    }

    /// Recompute the cached plane and bounding box from the vertex buffer
    pub fn update(&mut self, vertices: &[Point3f]) {
        let [v1, v2, v3] = self.corners(vertices);
        self.bounds = Aabb::from_triangle(&v1, &v2, &v3);

        let n = cross_product(&(v2 - v1), &(v3 - v1));
        self.plane = [n.x, n.y, n.z, -dot_product(&n, &v1.coords)];
    }

    /// The three corner positions in winding order
    #[inline]
    pub fn corners(&self, vertices: &[Point3f]) -> [Point3f; 3] {
        [
            vertices[self.indices[0]],
            vertices[self.indices[1]],
            vertices[self.indices[2]],
        ]
    }

    #[inline]
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    #[inline]
    pub fn plane(&self) -> [f32; 4] {
        self.plane
    }

    /// Unnormalized normal `(A, B, C)`, oriented by the winding
    #[inline]
    pub fn normal(&self) -> Vector3f {
        Vector3f::new(self.plane[0], self.plane[1], self.plane[2])
    }

    /// Unit normal, or the zero vector for a degenerate triangle
    pub fn unit_normal(&self) -> Vector3f {
        self.normal().try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::zeros)
    }

    /// Signed value proportional to the distance of `p` from the plane. The
    /// sign depends on the triangle's winding, not on any outward direction.
    #[inline]
    pub fn plane_equation(&self, p: &Point3f) -> f32 {
        self.plane[0] * p.x + self.plane[1] * p.y + self.plane[2] * p.z + self.plane[3]
    }

    pub fn center(&self, vertices: &[Point3f]) -> Point3f {
        let [a, b, c] = self.corners(vertices);
        Point3f::from((a.coords + b.coords + c.coords) / 3.0)
    }

    pub fn contains_vertex(&self, v: usize) -> bool {
        self.indices.contains(&v)
    }

    /// Two or more identical indices
    pub fn is_degenerate(&self) -> bool {
        let [a, b, c] = self.indices;
        a == b || b == c || a == c
    }

    /// Replace every slot referencing `from` with `to`
    pub fn replace_vertex(&mut self, from: usize, to: usize) -> bool {
        let mut changed = false;
        for slot in self.indices.iter_mut() {
            if *slot == from {
                *slot = to;
                changed = true;
            }
        }
        changed
    }
}
