//! Core traits for meshkit

use crate::{bounds::Aabb, mesh::TriangleMesh, point::*};

/// Objects with an axis-aligned extent
pub trait Bounded {
    /// Get the bounding box of the object, `None` when it has no geometry
    fn bounds(&self) -> Option<Aabb>;

    /// Get the center point of the object
    fn center(&self) -> Option<Point3f> {
        self.bounds().map(|b| b.center())
    }
}

/// Objects whose geometry can be moved in place
pub trait Transformable {
    /// Translate every vertex by `offset`
    fn translate(&mut self, offset: &Vector3f);

    /// Scale every vertex about the origin
    fn scale(&mut self, factor: f32);
}

impl Bounded for TriangleMesh {
    fn bounds(&self) -> Option<Aabb> {
        self.bounding_box()
    }
}

impl Transformable for TriangleMesh {
    fn translate(&mut self, offset: &Vector3f) {
        for v in self.vertices.iter_mut() {
            *v += offset;
        }
        self.update_triangles();
    }

    fn scale(&mut self, factor: f32) {
        for v in self.vertices.iter_mut() {
            *v *= factor;
        }
        self.update_triangles();
    }
}
