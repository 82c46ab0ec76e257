//! Bounding volume hierarchies over a mesh's triangles
//!
//! The hierarchy is a complete binary tree of fixed depth stored flat in heap
//! order: node `i` has children `2i + 1` and `2i + 2`, and level `L` occupies
//! the index range `2^L - 1 .. 2^(L+1) - 1`.
//!
//! A triangle straddling a split plane is assigned to both children, so a
//! triangle index may appear in several leaves. Leaves may also be empty.

use meshkit_core::{Aabb, Axis, BoundingSphere, BoundingVolume, Point3f, TriangleMesh, Vector3f};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Default hierarchy depth (number of split levels below the root)
pub const DEFAULT_DEPTH: usize = 3;

/// How a node chooses its split axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitPolicy {
    /// Split the axis of the node's largest extent
    #[default]
    LongestAxis,
    /// Always split along X
    LocalX,
}

impl SplitPolicy {
    fn axis(self, extent: &Aabb) -> Axis {
        match self {
            SplitPolicy::LongestAxis => extent.largest_axis(),
            SplitPolicy::LocalX => Axis::X,
        }
    }
}

/// Hierarchy construction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyConfig {
    /// Number of levels below the root
    pub depth: usize,
    pub split: SplitPolicy,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            split: SplitPolicy::default(),
        }
    }
}

impl HierarchyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_split(mut self, split: SplitPolicy) -> Self {
        self.split = split;
        self
    }
}

/// A hierarchy node: its bounding volume and the triangles assigned to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node<V> {
    pub volume: V,
    pub triangles: Vec<usize>,
}

impl<V> Node<V> {
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// Complete binary tree of bounding volumes in heap order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hierarchy<V> {
    depth: usize,
    nodes: Vec<Node<V>>,
}

/// Hierarchy of axis-aligned boxes
pub type BoxHierarchy = Hierarchy<Aabb>;

/// Hierarchy of bounding spheres
pub type SphereHierarchy = Hierarchy<BoundingSphere>;

impl<V> Hierarchy<V> {
    /// Total node count of a tree with `depth` levels below the root
    pub fn node_count_for(depth: usize) -> usize {
        (1 << (depth + 1)) - 1
    }

    /// Heap index range of `level`
    pub fn level_range(level: usize) -> Range<usize> {
        ((1 << level) - 1)..((1 << (level + 1)) - 1)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn nodes(&self) -> &[Node<V>] {
        &self.nodes
    }

    pub fn root(&self) -> &Node<V> {
        &self.nodes[0]
    }

    /// Nodes of one level; empty slice past the deepest level
    pub fn level(&self, level: usize) -> &[Node<V>] {
        if level > self.depth {
            return &[];
        }
        &self.nodes[Self::level_range(level)]
    }

    /// Nodes of the deepest level
    pub fn leaves(&self) -> &[Node<V>] {
        self.level(self.depth)
    }

    /// Visit every non-empty leaf reachable through nodes accepted by
    /// `accept`. Rejected nodes prune their whole subtree.
    pub fn visit_leaves<A, F>(&self, accept: A, mut visit: F)
    where
        A: Fn(&V) -> bool,
        F: FnMut(&Node<V>),
    {
        let first_leaf = Self::level_range(self.depth).start;
        let mut stack = vec![0usize];
        while let Some(i) = stack.pop() {
            let node = &self.nodes[i];
            if node.is_empty() || !accept(&node.volume) {
                continue;
            }
            if i >= first_leaf {
                visit(node);
            } else {
                stack.push(2 * i + 2);
                stack.push(2 * i + 1);
            }
        }
    }
}

impl<V: BoundingVolume> Hierarchy<V> {
    /// Sum of the node volumes at `level`, optionally minus the volume
    /// shared by sibling pairs of that level
    pub fn level_measure(&self, level: usize, subtract_overlap: bool) -> f32 {
        let nodes = self.level(level);
        let mut total: f32 = nodes.iter().map(|n| n.volume.measure()).sum();
        if subtract_overlap {
            for (i, a) in nodes.iter().enumerate() {
                for b in &nodes[i + 1..] {
                    total -= a.volume.overlap_measure(&b.volume);
                }
            }
        }
        total
    }

    /// Candidate triangles whose leaves overlap `aabb`. Triangles stored in
    /// several leaves are reported once per leaf.
    pub fn candidates(&self, aabb: &Aabb) -> Vec<usize> {
        let mut out = Vec::new();
        self.visit_leaves(|v| v.overlaps_box(aabb), |leaf| out.extend_from_slice(&leaf.triangles));
        out
    }

    /// Move every volume along with the geometry
    pub fn translate(&mut self, offset: &Vector3f) {
        for node in self.nodes.iter_mut() {
            node.volume.translate(offset);
        }
    }

    /// Scale every volume about the origin along with the geometry
    pub fn scale(&mut self, factor: f32) {
        for node in self.nodes.iter_mut() {
            node.volume.scale(factor);
        }
    }
}

impl BoxHierarchy {
    /// Build the box hierarchy of `mesh`. `None` when the mesh has no live
    /// triangles.
    ///
    /// Each node is split at the midpoint of its split axis. A triangle goes
    /// to every child whose half-space box its own box touches, and a
    /// child's box is the extent of its triangles clamped to the half-space.
    pub fn build(mesh: &TriangleMesh, config: &HierarchyConfig) -> Option<Self> {
        let root_box = mesh.bounding_box()?;
        let mut nodes = Vec::with_capacity(Self::node_count_for(config.depth));
        nodes.push(Node {
            volume: root_box,
            triangles: mesh.live_triangles().map(|(ti, _)| ti).collect(),
        });

        for level in 0..config.depth {
            for i in Self::level_range(level) {
                let [lower, upper] = split_box_node(&nodes[i], mesh, config.split);
                nodes.push(lower);
                nodes.push(upper);
            }
        }

        log::debug!("built box hierarchy: depth {}, {} nodes", config.depth, nodes.len());
        Some(Self {
            depth: config.depth,
            nodes,
        })
    }
}

fn split_box_node(node: &Node<Aabb>, mesh: &TriangleMesh, policy: SplitPolicy) -> [Node<Aabb>; 2] {
    let parent = &node.volume;
    let axis = policy.axis(parent);
    let mid = (parent.min[axis.index()] + parent.max[axis.index()]) * 0.5;
    let (lower, upper) = parent.split(axis, mid);
    let halves = [lower, upper];

    let mut triangles: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
    let mut extents: [Option<Aabb>; 2] = [None, None];
    for &ti in &node.triangles {
        let triangle = &mesh.triangles[ti];
        for side in 0..2 {
            if !triangle.bounds().overlaps(&halves[side]) {
                continue;
            }
            triangles[side].push(ti);
            match extents[side].as_mut() {
                Some(extent) => extent.include_box(triangle.bounds()),
                None => extents[side] = Some(*triangle.bounds()),
            }
        }
    }

    let [lower_tris, upper_tris] = triangles;
    let make = |side: usize, triangles: Vec<usize>| Node {
        volume: match extents[side] {
            Some(extent) => extent.clamp_to(&halves[side]),
            None => Aabb::from_point(&halves[side].center()),
        },
        triangles,
    };
    [make(0, lower_tris), make(1, upper_tris)]
}

impl SphereHierarchy {
    /// Build the sphere hierarchy of `mesh`. `None` when the mesh has no
    /// live triangles.
    ///
    /// A triangle goes to the lower child when any of its vertices lies
    /// below the split coordinate, otherwise to the upper child. Child
    /// spheres are recomputed from the vertices actually assigned to them;
    /// an empty child gets a zero sphere at its parent's center.
    pub fn build(mesh: &TriangleMesh, config: &HierarchyConfig) -> Option<Self> {
        let root_triangles: Vec<usize> = mesh.live_triangles().map(|(ti, _)| ti).collect();
        let root_sphere = BoundingSphere::from_points(&gather_points(mesh, &root_triangles))?;

        let mut nodes = Vec::with_capacity(Self::node_count_for(config.depth));
        nodes.push(Node {
            volume: root_sphere,
            triangles: root_triangles,
        });

        for level in 0..config.depth {
            for i in Self::level_range(level) {
                let [lower, upper] = split_sphere_node(&nodes[i], mesh, config.split);
                nodes.push(lower);
                nodes.push(upper);
            }
        }

        log::debug!("built sphere hierarchy: depth {}, {} nodes", config.depth, nodes.len());
        Some(Self {
            depth: config.depth,
            nodes,
        })
    }
}

fn gather_points(mesh: &TriangleMesh, triangles: &[usize]) -> Vec<Point3f> {
    triangles
        .iter()
        .flat_map(|&ti| mesh.corners(ti))
        .collect()
}

fn split_sphere_node(
    node: &Node<BoundingSphere>,
    mesh: &TriangleMesh,
    policy: SplitPolicy,
) -> [Node<BoundingSphere>; 2] {
    let parent_center = node.volume.center;
    let empty = |center| Node {
        volume: BoundingSphere::degenerate(center),
        triangles: Vec::new(),
    };

    let Some(extent) = Aabb::from_points(&gather_points(mesh, &node.triangles)) else {
        return [empty(parent_center), empty(parent_center)];
    };
    let axis = policy.axis(&extent);
    let mid = (extent.min[axis.index()] + extent.max[axis.index()]) * 0.5;

    let (lower, upper): (Vec<usize>, Vec<usize>) = node.triangles.iter().partition(|&&ti| {
        mesh.corners(ti).iter().any(|p| p[axis.index()] < mid)
    });

    let make = |triangles: Vec<usize>| match BoundingSphere::from_points(&gather_points(mesh, &triangles)) {
        Some(volume) => Node { volume, triangles },
        None => empty(parent_center),
    };
    [make(lower), make(upper)]
}
