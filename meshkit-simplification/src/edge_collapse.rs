//! Edge collapse simplification
//!
//! Triangles are ranked by how flat the surface is around their first
//! vertex, flattest first. Popping a triangle collapses its first edge
//! `(vk, vx)`: the triangle and its neighbour across that edge are
//! tombstoned, `vx` is replaced by `vk` everywhere, and `vk` moves to the
//! edge midpoint. Tombstones are compacted in one pass at the end.

use crate::{MeshSimplifier, SimplifyOutcome};
use itertools::Itertools;
use meshkit_core::{midpoint, Error, Result, TriangleMesh, Vector3f};
use priority_queue::PriorityQueue;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::time::Instant;

// ============================================================
// Triangle cost for the priority queue
// ============================================================

#[derive(Debug, Clone, Copy)]
struct TriangleCost {
    index: usize,
    /// Mean pairwise dot product of unit normals around the first vertex
    flatness: f32,
}

impl PartialEq for TriangleCost {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for TriangleCost {}

impl PartialOrd for TriangleCost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TriangleCost {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: flattest first, lower index first on ties
        self.flatness
            .total_cmp(&other.flatness)
            .then_with(|| other.index.cmp(&self.index))
    }
}

/// Flatness of the surface around the first vertex of triangle `ti`: the
/// mean pairwise dot product of the unit normals of its live triangles.
/// Fewer than two triangles count as perfectly flat.
pub fn vertex_flatness(mesh: &TriangleMesh, ti: usize) -> f32 {
    let v = mesh.triangles[ti].indices[0];
    let normals: Vec<Vector3f> = mesh
        .triangles_of(v)
        .map(|t| mesh.triangles[t].unit_normal())
        .collect();
    if normals.len() < 2 {
        return 1.0;
    }
    let (sum, pairs) = normals
        .iter()
        .tuple_combinations()
        .fold((0.0f32, 0usize), |(sum, pairs), (a, b)| (sum + a.dot(b), pairs + 1));
    sum / pairs as f32
}

// ============================================================
// Edge Collapse Simplifier
// ============================================================

/// Greedy edge-collapse simplifier over vertex/triangle adjacency.
///
/// Edges without a second live triangle (open boundaries) are never
/// collapsed, so open meshes may stop short of the requested reduction.
#[derive(Debug, Clone)]
pub struct EdgeCollapseSimplifier {
    /// Stop once the flattest remaining candidate is below this value
    pub flatness_threshold: Option<f32>,
    /// Move the kept vertex to the edge midpoint instead of leaving it in place
    pub midpoint: bool,
}

impl Default for EdgeCollapseSimplifier {
    fn default() -> Self {
        Self {
            flatness_threshold: None,
            midpoint: true,
        }
    }
}

impl EdgeCollapseSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(flatness_threshold: Option<f32>, midpoint: bool) -> Self {
        Self {
            flatness_threshold,
            midpoint,
        }
    }

    /// Build the initial priority queue over all live triangles.
    fn build_queue(&self, mesh: &TriangleMesh) -> PriorityQueue<usize, TriangleCost> {
        let costs: Vec<TriangleCost> = (0..mesh.triangles.len())
            .into_par_iter()
            .filter(|&ti| !mesh.triangles[ti].deleted)
            .map(|ti| TriangleCost {
                index: ti,
                flatness: vertex_flatness(mesh, ti),
            })
            .collect();

        let mut queue = PriorityQueue::with_capacity(costs.len());
        for cost in costs {
            queue.push(cost.index, cost);
        }
        queue
    }

    /// Collapse the first edge of triangle `ti`. Returns the number of
    /// triangles tombstoned, zero when the edge has no second triangle.
    fn collapse(&self, mesh: &mut TriangleMesh, ti: usize, queue: &mut PriorityQueue<usize, TriangleCost>) -> usize {
        let [vk, vx, _] = mesh.triangles[ti].indices;
        if vk == vx {
            return 0;
        }
        let Some(tx) = mesh
            .adjacency
            .shared_by(vk, vx, &mesh.triangles)
            .into_iter()
            .find(|&t| t != ti)
        else {
            return 0;
        };

        mesh.triangles[ti].deleted = true;
        mesh.triangles[tx].deleted = true;
        let mut removed = 2;

        let moved: Vec<usize> = mesh.triangles_of(vx).collect();
        for &t in &moved {
            let triangle = &mut mesh.triangles[t];
            triangle.replace_vertex(vx, vk);
            if triangle.is_degenerate() {
                triangle.deleted = true;
                removed += 1;
            }
        }

        if self.midpoint {
            mesh.vertices[vk] = midpoint(&mesh.vertices[vk], &mesh.vertices[vx]);
        }
        mesh.adjacency.merge_into(vx, vk);
        mesh.adjacency.remove(vk, ti);
        mesh.adjacency.remove(vk, tx);

        let around: Vec<usize> = mesh.triangles_of(vk).collect();
        let vertices = &mesh.vertices;
        for &t in &around {
            mesh.triangles[t].update(vertices);
        }

        queue.remove(&tx);
        for t in moved.into_iter().chain(around) {
            queue.remove(&t);
        }
        removed
    }
}

impl MeshSimplifier for EdgeCollapseSimplifier {
    fn simplify(&self, mesh: &mut TriangleMesh, retain_percent: f32) -> Result<SimplifyOutcome> {
        if mesh.is_empty() {
            return Err(Error::InvalidData("Mesh is empty".to_string()));
        }
        if !(0.0..=100.0).contains(&retain_percent) {
            return Err(Error::InvalidData(format!(
                "Retain percentage must be between 0 and 100, got {}",
                retain_percent
            )));
        }

        let live = mesh.face_count();
        let requested = (live as f32 * (100.0 - retain_percent) / 100.0).floor() as usize;
        if requested == 0 {
            return Ok(SimplifyOutcome::AlreadyMinimal);
        }

        let start = Instant::now();
        let mut queue = self.build_queue(mesh);
        let mut removed = 0usize;

        while removed < requested {
            let Some((ti, cost)) = queue.pop() else {
                break;
            };
            if mesh.triangles[ti].deleted {
                continue;
            }
            if let Some(threshold) = self.flatness_threshold {
                if cost.flatness < threshold {
                    break;
                }
            }
            removed += self.collapse(mesh, ti, &mut queue);
        }

        mesh.compact();
        mesh.rebuild();

        log::info!(
            "simplified {} -> {} triangles in {:.2?}",
            live,
            mesh.face_count(),
            start.elapsed()
        );

        Ok(if removed >= requested {
            SimplifyOutcome::Reached { removed }
        } else {
            SimplifyOutcome::Partial { removed, requested }
        })
    }
}
