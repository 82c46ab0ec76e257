//! # meshkit
//!
//! Triangle meshes with bounding volume hierarchies, collision extraction,
//! ray-cast volume estimation and edge-collapse simplification.
//!
//! This is the umbrella crate. It owns the [`Mesh`] aggregate, which ties
//! the sub-crates together, and re-exports each of them.
//!
//! ## Quick Start
//!
//! ```no_run
//! use meshkit::prelude::*;
//!
//! let mut a = Mesh::from_file("armadillo.obj", false);
//! let mut b = a.clone();
//! a.center_align();
//! b.center_align();
//! b.move_by(Vector3f::new(0.25, 0.0, 0.0));
//!
//! let overlap = Mesh::from_intersection(&a, &b, CollisionMode::Single);
//! println!("{} colliding triangles", overlap.face_count());
//! ```

pub mod model;

pub use model::*;

// Re-export core functionality
pub use meshkit_core::*;

// Re-export sub-crates
pub use meshkit_algorithms as algorithms;
pub use meshkit_io as io;
pub use meshkit_simplification as simplification;

/// Convenient imports for common use cases
pub mod prelude {
    pub use crate::model::*;
    pub use meshkit_algorithms::*;
    pub use meshkit_core::*;
    pub use meshkit_io::*;
    pub use meshkit_simplification::*;
}
