//! # meshkit algorithms
//!
//! Spatial and volumetric algorithms over [`meshkit_core::TriangleMesh`]:
//! bounding volume hierarchies of boxes or spheres, triangle and mesh
//! intersection, and ray-cast volume estimation with per-level coverage.

pub mod bvh;
pub mod intersection;
pub mod volume;

// Re-export commonly used items
pub use bvh::*;
pub use intersection::*;
pub use volume::*;
