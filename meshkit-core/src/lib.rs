//! Core data structures and traits for meshkit
//!
//! This crate provides the geometry primitives shared by every other meshkit
//! crate: points, bounding boxes and spheres, index-based triangles with a
//! cached plane equation, vertex adjacency and the triangle mesh arena.

pub mod point;
pub mod bounds;
pub mod triangle;
pub mod adjacency;
pub mod mesh;
pub mod traits;
pub mod transform;
pub mod error;

pub use point::*;
pub use bounds::*;
pub use triangle::*;
pub use adjacency::*;
pub use mesh::*;
pub use traits::*;
pub use transform::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix4, UnitQuaternion};
