//! Mesh simplification
//!
//! This crate reduces a mesh's triangle count in place by greedy edge
//! collapse, keeping flat regions for last.

pub mod edge_collapse;

pub use edge_collapse::*;

use meshkit_core::{Result, TriangleMesh};

/// Result of a simplification pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimplifyOutcome {
    /// The requested number of triangles was removed
    Reached { removed: usize },
    /// Candidates ran out before the request was met
    Partial { removed: usize, requested: usize },
    /// The request asked for no removal at all
    AlreadyMinimal,
}

impl SimplifyOutcome {
    /// Triangles removed by the pass
    pub fn removed(&self) -> usize {
        match *self {
            SimplifyOutcome::Reached { removed } | SimplifyOutcome::Partial { removed, .. } => removed,
            SimplifyOutcome::AlreadyMinimal => 0,
        }
    }
}

/// Simplify a mesh in place
pub trait MeshSimplifier {
    /// Keep roughly `retain_percent` (0 to 100) percent of the live
    /// triangles. The mesh is compacted and rebuilt before returning.
    fn simplify(&self, mesh: &mut TriangleMesh, retain_percent: f32) -> Result<SimplifyOutcome>;
}
