//! Vertex to triangle adjacency

use crate::triangle::Triangle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// For each vertex, the set of triangles using it.
///
/// Entries are not pruned when a triangle is tombstoned; every read goes
/// through [`VertexAdjacency::triangles_of`], which filters tombstoned and
/// out-of-range triangle indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VertexAdjacency {
    sets: Vec<BTreeSet<usize>>,
}

impl VertexAdjacency {
    pub fn new(vertex_count: usize) -> Self {
        Self {
            sets: vec![BTreeSet::new(); vertex_count],
        }
    }

    /// Build adjacency from the live triangles
    pub fn build(vertex_count: usize, triangles: &[Triangle]) -> Self {
        let mut adjacency = Self::new(vertex_count);
        for (ti, triangle) in triangles.iter().enumerate() {
            if !triangle.deleted {
                adjacency.insert(ti, triangle);
            }
        }
        adjacency
    }

    pub fn vertex_count(&self) -> usize {
        self.sets.len()
    }

    /// Make room for a freshly appended vertex
    pub fn push_vertex(&mut self) {
        self.sets.push(BTreeSet::new());
    }

    pub fn insert(&mut self, triangle_index: usize, triangle: &Triangle) {
        for &v in &triangle.indices {
            if v >= self.sets.len() {
                self.sets.resize(v + 1, BTreeSet::new());
            }
            self.sets[v].insert(triangle_index);
        }
    }

    /// Live triangles around vertex `v`, in ascending index order
    pub fn triangles_of<'a>(
        &'a self,
        v: usize,
        triangles: &'a [Triangle],
    ) -> impl Iterator<Item = usize> + 'a {
        self.sets
            .get(v)
            .into_iter()
            .flatten()
            .copied()
            .filter(move |&ti| triangles.get(ti).is_some_and(|t| !t.deleted))
    }

    /// Live triangles using both `a` and `b`
    pub fn shared_by(&self, a: usize, b: usize, triangles: &[Triangle]) -> Vec<usize> {
        let (Some(sa), Some(sb)) = (self.sets.get(a), self.sets.get(b)) else {
            return Vec::new();
        };
        sa.intersection(sb)
            .copied()
            .filter(|&ti| {
                triangles
                    .get(ti)
                    .is_some_and(|t| !t.deleted && t.contains_vertex(a) && t.contains_vertex(b))
            })
            .collect()
    }

    /// Move every entry of `from` into `to`, leaving `from` empty
    pub fn merge_into(&mut self, from: usize, to: usize) {
        if from == to || from >= self.sets.len() || to >= self.sets.len() {
            return;
        }
        let moved = std::mem::take(&mut self.sets[from]);
        self.sets[to].extend(moved);
    }

    pub fn remove(&mut self, v: usize, triangle_index: usize) {
        if let Some(set) = self.sets.get_mut(v) {
            set.remove(&triangle_index);
        }
    }

    /// Raw entries, including tombstoned triangles
    pub fn raw(&self, v: usize) -> Option<&BTreeSet<usize>> {
        self.sets.get(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::Point3f;

    fn quad() -> (Vec<Point3f>, Vec<Triangle>) {
        let v = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(1.0, 1.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
        ];
        let t = vec![Triangle::new(&v, [0, 1, 2]), Triangle::new(&v, [0, 2, 3])];
        (v, t)
    }

    #[test]
    fn test_build_and_shared_edge() {
        let (v, t) = quad();
        let adj = VertexAdjacency::build(v.len(), &t);
        assert_eq!(adj.triangles_of(0, &t).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(adj.triangles_of(1, &t).collect::<Vec<_>>(), vec![0]);
        assert_eq!(adj.shared_by(0, 2, &t), vec![0, 1]);
        assert_eq!(adj.shared_by(1, 3, &t), Vec::<usize>::new());
    }

    #[test]
    fn test_reads_filter_tombstones() {
        let (v, mut t) = quad();
        let adj = VertexAdjacency::build(v.len(), &t);
        t[1].deleted = true;
        // stale entry still stored, never returned
        assert!(adj.raw(3).unwrap().contains(&1));
        assert_eq!(adj.triangles_of(3, &t).count(), 0);
        assert_eq!(adj.shared_by(0, 2, &t), vec![0]);
    }

    #[test]
    fn test_reads_filter_out_of_range() {
        let (v, t) = quad();
        let adj = VertexAdjacency::build(v.len(), &t);
        let truncated = &t[..1];
        assert_eq!(adj.triangles_of(0, truncated).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_merge_into() {
        let (v, t) = quad();
        let mut adj = VertexAdjacency::build(v.len(), &t);
        adj.merge_into(3, 1);
        assert!(adj.raw(3).unwrap().is_empty());
        assert_eq!(adj.raw(1).unwrap().len(), 2);
    }
}
