//! Triangle mesh storage: vertex arena, triangles and adjacency

use crate::adjacency::VertexAdjacency;
use crate::bounds::Aabb;
use crate::error::Error;
use crate::point::*;
use crate::transform::Transform3D;
use crate::triangle::Triangle;
use crate::Result;
use serde::{Deserialize, Serialize};

/// A triangle mesh owning its vertex buffer.
///
/// Triangles and adjacency sets only hold indices into `vertices`, so a
/// clone is a deep copy whose indices stay valid without any fix-up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub triangles: Vec<Triangle>,
    pub adjacency: VertexAdjacency,
    /// Per-vertex normals, refreshed by [`TriangleMesh::rebuild`]
    pub normals: Option<Vec<Vector3f>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from vertices and faces, validating every index
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Result<Self> {
        let mut mesh = Self {
            adjacency: VertexAdjacency::new(vertices.len()),
            vertices,
            triangles: Vec::with_capacity(faces.len()),
            normals: None,
        };
        for face in faces {
            mesh.add_face(face)?;
        }
        mesh.compute_vertex_normals();
        Ok(mesh)
    }

    /// Get the number of vertices, referenced or not
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of live (non-tombstoned) triangles
    pub fn face_count(&self) -> usize {
        self.triangles.iter().filter(|t| !t.deleted).count()
    }

    /// Number of tombstoned triangles awaiting compaction
    pub fn tombstone_count(&self) -> usize {
        self.triangles.iter().filter(|t| t.deleted).count()
    }

    /// A mesh without live triangles is empty
    pub fn is_empty(&self) -> bool {
        self.triangles.iter().all(|t| t.deleted)
    }

    /// Add a vertex to the mesh
    pub fn add_vertex(&mut self, vertex: Point3f) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        self.adjacency.push_vertex();
        index
    }

    /// Add a triangle and register it in the adjacency lists
    pub fn add_face(&mut self, face: [usize; 3]) -> Result<usize> {
        if let Some(&bad) = face.iter().find(|&&v| v >= self.vertices.len()) {
            return Err(Error::InvalidData(format!(
                "face index {} out of range for {} vertices",
                bad,
                self.vertices.len()
            )));
        }
        let index = self.triangles.len();
        let triangle = Triangle::new(&self.vertices, face);
        self.adjacency.insert(index, &triangle);
        self.triangles.push(triangle);
        Ok(index)
    }

    /// Live triangles with their indices
    pub fn live_triangles(&self) -> impl Iterator<Item = (usize, &Triangle)> + '_ {
        self.triangles.iter().enumerate().filter(|(_, t)| !t.deleted)
    }

    /// Vertex indices of the live triangles
    pub fn faces(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.live_triangles().map(|(_, t)| t.indices)
    }

    /// Corner positions of triangle `ti`
    pub fn corners(&self, ti: usize) -> [Point3f; 3] {
        self.triangles[ti].corners(&self.vertices)
    }

    /// Live triangles around vertex `v`, tombstones filtered
    pub fn triangles_of(&self, v: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency.triangles_of(v, &self.triangles)
    }

    /// Tight box around the vertices referenced by live triangles
    pub fn bounding_box(&self) -> Option<Aabb> {
        let vertices = &self.vertices;
        Aabb::from_points(
            self.live_triangles()
                .flat_map(move |(_, t)| t.indices.iter().map(move |&v| &vertices[v])),
        )
    }

    /// Refresh the cached plane and box of every live triangle
    pub fn update_triangles(&mut self) {
        let vertices = &self.vertices;
        for triangle in self.triangles.iter_mut().filter(|t| !t.deleted) {
            triangle.update(vertices);
        }
    }

    /// Rebuild the adjacency lists from the live triangles
    pub fn rebuild_adjacency(&mut self) {
        self.adjacency = VertexAdjacency::build(self.vertices.len(), &self.triangles);
    }

    /// Area-weighted vertex normals from the live triangles
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![Vector3f::zeros(); self.vertices.len()];
        for (_, triangle) in self.live_triangles() {
            let n = triangle.normal();
            for &v in &triangle.indices {
                normals[v] += n;
            }
        }
        for n in normals.iter_mut() {
            *n = n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::zeros);
        }
        self.normals = Some(normals);
    }

    /// Physically remove tombstoned triangles.
    ///
    /// Consecutive tombstones are drained as one run. Adjacency is stale
    /// afterwards; call [`TriangleMesh::rebuild`].
    pub fn compact(&mut self) -> usize {
        let before = self.triangles.len();
        let mut from = 0;
        while from < self.triangles.len() {
            if !self.triangles[from].deleted {
                from += 1;
                continue;
            }
            let mut to = from;
            while to + 1 < self.triangles.len() && self.triangles[to + 1].deleted {
                to += 1;
            }
            self.triangles.drain(from..=to);
        }
        before - self.triangles.len()
    }

    /// Rebuild every derived structure: triangle caches, adjacency, normals
    pub fn rebuild(&mut self) {
        self.update_triangles();
        self.rebuild_adjacency();
        self.compute_vertex_normals();
    }

    /// Copy of the mesh with every vertex mapped through `transform`
    pub fn transformed(&self, transform: &Transform3D) -> TriangleMesh {
        let mut mesh = self.clone();
        for v in mesh.vertices.iter_mut() {
            *v = transform.transform_point(v);
        }
        mesh.rebuild();
        mesh
    }
}
