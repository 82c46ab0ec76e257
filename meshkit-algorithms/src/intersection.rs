//! Triangle, segment and mesh intersection tests
//!
//! Mesh extraction works on meshes already expressed in world coordinates;
//! callers holding a draw-time placement transform a copy first.

use crate::bvh::{BoxHierarchy, HierarchyConfig};
use meshkit_core::{Point3f, Segment, Triangle, TriangleMesh, Vector3f};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Which triangles a mesh/mesh query emits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionMode {
    /// Only triangles of the first mesh, one hit each
    #[default]
    Single,
    /// Triangles of both meshes
    Both,
}

/// Whether `p` lies inside the infinite prism obtained by extruding the
/// triangle along its normal. Points on an edge count as inside.
fn inside_prism(corners: &[Point3f; 3], normal: &Vector3f, p: &Point3f) -> bool {
    let mut positive = false;
    let mut negative = false;
    for i in 0..3 {
        let a = corners[i];
        let b = corners[(i + 1) % 3];
        // side plane through a, b and a + normal
        let side = (b - a).cross(normal);
        let value = side.dot(&(p - a));
        positive |= value > 0.0;
        negative |= value < 0.0;
    }
    !(positive && negative)
}

/// Twice the signed area of `a b c` in the plane spanned by axes `u`, `v`
fn orient(a: &Point3f, b: &Point3f, c: &Point3f, u: usize, v: usize) -> f32 {
    (b[u] - a[u]) * (c[v] - a[v]) - (b[v] - a[v]) * (c[u] - a[u])
}

/// `c`, known to be collinear with `a b`, lies within their span
fn within_span(a: &Point3f, b: &Point3f, c: &Point3f, u: usize, v: usize) -> bool {
    c[u] >= a[u].min(b[u]) && c[u] <= a[u].max(b[u]) && c[v] >= a[v].min(b[v]) && c[v] <= a[v].max(b[v])
}

/// Closed segment/segment test after dropping the dominant normal axis
fn coplanar_segments_cross(p: &Segment, q: &Segment, normal: &Vector3f) -> bool {
    let drop = normal.iamax();
    let (u, v) = ((drop + 1) % 3, (drop + 2) % 3);
    let (p0, p1, q0, q1) = (&p.start, &p.end, &q.start, &q.end);

    let d1 = orient(q0, q1, p0, u, v);
    let d2 = orient(q0, q1, p1, u, v);
    let d3 = orient(p0, p1, q0, u, v);
    let d4 = orient(p0, p1, q1, u, v);
    if d1 * d2 < 0.0 && d3 * d4 < 0.0 {
        return true;
    }
    (d1 == 0.0 && within_span(q0, q1, p0, u, v))
        || (d2 == 0.0 && within_span(q0, q1, p1, u, v))
        || (d3 == 0.0 && within_span(p0, p1, q0, u, v))
        || (d4 == 0.0 && within_span(p0, p1, q1, u, v))
}

/// Segment against a triangle of `vertices`.
///
/// Endpoints strictly on the same side of the plane reject. An endpoint on
/// the plane is a potential hit. A segment lying in the plane hits when
/// either endpoint is inside the triangle or it crosses one of the edges.
pub fn triangle_intersects_segment(vertices: &[Point3f], triangle: &Triangle, segment: &Segment) -> bool {
    let da = triangle.plane_equation(&segment.start);
    let db = triangle.plane_equation(&segment.end);
    if da * db > 0.0 {
        return false;
    }

    let normal = triangle.normal();
    if normal == Vector3f::zeros() {
        return false;
    }
    let corners = triangle.corners(vertices);

    if da == db {
        return inside_prism(&corners, &normal, &segment.start)
            || inside_prism(&corners, &normal, &segment.end)
            || (0..3).any(|i| {
                let edge = Segment::new(corners[i], corners[(i + 1) % 3]);
                coplanar_segments_cross(segment, &edge, &normal)
            });
    }
    let hit = segment.point_at(da / (da - db));
    inside_prism(&corners, &normal, &hit)
}

/// Whether two triangles touch: closed box overlap of their cached boxes,
/// then the six edge/triangle tests.
pub fn triangles_intersect(
    a_vertices: &[Point3f],
    a: &Triangle,
    b_vertices: &[Point3f],
    b: &Triangle,
) -> bool {
    if !a.bounds().overlaps(b.bounds()) {
        return false;
    }
    let edges = |corners: [Point3f; 3]| {
        [
            Segment::new(corners[0], corners[1]),
            Segment::new(corners[1], corners[2]),
            Segment::new(corners[2], corners[0]),
        ]
    };
    edges(b.corners(b_vertices))
        .iter()
        .any(|e| triangle_intersects_segment(a_vertices, a, e))
        || edges(a.corners(a_vertices))
            .iter()
            .any(|e| triangle_intersects_segment(b_vertices, b, e))
}

/// B triangles whose leaves touch `triangle`, each reported once.
/// `seen` is a per-worker stamp buffer sized to B's triangle count.
fn candidates_for(
    triangle: &Triangle,
    stamp: usize,
    b_hierarchy: &BoxHierarchy,
    seen: &mut [usize],
) -> Vec<usize> {
    let mut out = Vec::new();
    b_hierarchy.visit_leaves(
        |volume| volume.overlaps(triangle.bounds()),
        |leaf| {
            for &tj in &leaf.triangles {
                if seen[tj] != stamp {
                    seen[tj] = stamp;
                    out.push(tj);
                }
            }
        },
    );
    out
}

/// Append a triangle with three fresh vertices. Adjacency is filled in by
/// the final rebuild.
fn emit(out: &mut TriangleMesh, corners: [Point3f; 3]) {
    let base = out.vertices.len();
    out.vertices.extend(corners);
    out.triangles.push(Triangle::new(&out.vertices, [base, base + 1, base + 2]));
}

/// Triangles of `a` (and of `b` in [`CollisionMode::Both`]) that touch the
/// other mesh, copied into a fresh mesh with three new vertices each.
///
/// `b_hierarchy` must be built over `b` in the same coordinates. Meshes
/// whose bounding boxes do not strictly overlap yield an empty mesh.
pub fn extract_collisions(
    a: &TriangleMesh,
    b: &TriangleMesh,
    b_hierarchy: &BoxHierarchy,
    mode: CollisionMode,
) -> TriangleMesh {
    let mut out = TriangleMesh::new();
    let (Some(a_box), Some(b_box)) = (a.bounding_box(), b.bounding_box()) else {
        return out;
    };
    if !a_box.intersects(&b_box) {
        log::debug!("collision early reject: bounding boxes do not overlap");
        return out;
    }

    let a_live: Vec<usize> = a.live_triangles().map(|(ti, _)| ti).collect();
    let nb = b.triangles.len();

    match mode {
        CollisionMode::Single => {
            let hits: Vec<usize> = a_live
                .par_iter()
                .map_init(
                    || vec![usize::MAX; nb],
                    |seen, &ti| {
                        let ta = &a.triangles[ti];
                        candidates_for(ta, ti, b_hierarchy, seen)
                            .into_iter()
                            .any(|tj| triangles_intersect(&a.vertices, ta, &b.vertices, &b.triangles[tj]))
                            .then_some(ti)
                    },
                )
                .flatten()
                .collect();
            for ti in hits {
                emit(&mut out, a.corners(ti));
            }
        }
        CollisionMode::Both => {
            let mut seen = vec![usize::MAX; nb];
            let mut b_matched = vec![false; nb];
            for &ti in &a_live {
                let ta = &a.triangles[ti];
                let mut a_matched = false;
                for tj in candidates_for(ta, ti, b_hierarchy, &mut seen) {
                    if a_matched && b_matched[tj] {
                        continue;
                    }
                    if !triangles_intersect(&a.vertices, ta, &b.vertices, &b.triangles[tj]) {
                        continue;
                    }
                    if !a_matched {
                        emit(&mut out, a.corners(ti));
                        a_matched = true;
                    }
                    if !b_matched[tj] {
                        emit(&mut out, b.corners(tj));
                        b_matched[tj] = true;
                    }
                }
            }
        }
    }

    out.rebuild();
    out
}

/// [`extract_collisions`] with a box hierarchy built over `b` on the spot
pub fn collide(a: &TriangleMesh, b: &TriangleMesh, config: &HierarchyConfig, mode: CollisionMode) -> TriangleMesh {
    match BoxHierarchy::build(b, config) {
        Some(hierarchy) => extract_collisions(a, b, &hierarchy, mode),
        None => TriangleMesh::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshkit_core::Transform3D;

    fn flat_triangle() -> (Vec<Point3f>, Triangle) {
        let v = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
        ];
        let t = Triangle::new(&v, [0, 1, 2]);
        (v, t)
    }

    fn cube() -> TriangleMesh {
        let vertices = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(1.0, 1.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
            Point3f::new(0.0, 0.0, 1.0),
            Point3f::new(1.0, 0.0, 1.0),
            Point3f::new(1.0, 1.0, 1.0),
            Point3f::new(0.0, 1.0, 1.0),
        ];
        let faces = vec![
            [0, 2, 1], [0, 3, 2],
            [4, 5, 6], [4, 6, 7],
            [0, 1, 5], [0, 5, 4],
            [3, 7, 6], [3, 6, 2],
            [0, 4, 7], [0, 7, 3],
            [1, 2, 6], [1, 6, 5],
        ];
        TriangleMesh::from_vertices_and_faces(vertices, faces).unwrap()
    }

    fn shifted(mesh: &TriangleMesh, x: f32) -> TriangleMesh {
        mesh.transformed(&Transform3D::translation(Vector3f::new(x, 0.0, 0.0)))
    }

    #[test]
    fn test_segment_through_triangle() {
        let (v, t) = flat_triangle();
        let through = Segment::new(Point3f::new(0.2, 0.2, -1.0), Point3f::new(0.2, 0.2, 1.0));
        let beside = Segment::new(Point3f::new(0.8, 0.8, -1.0), Point3f::new(0.8, 0.8, 1.0));
        let above = Segment::new(Point3f::new(0.2, 0.2, 0.5), Point3f::new(0.2, 0.2, 1.0));
        assert!(triangle_intersects_segment(&v, &t, &through));
        assert!(!triangle_intersects_segment(&v, &t, &beside));
        assert!(!triangle_intersects_segment(&v, &t, &above));
    }

    #[test]
    fn test_segment_result_is_stable() {
        let (v, t) = flat_triangle();
        let s = Segment::new(Point3f::new(0.3, 0.1, -0.7), Point3f::new(0.1, 0.3, 0.9));
        let first = triangle_intersects_segment(&v, &t, &s);
        for _ in 0..100 {
            assert_eq!(triangle_intersects_segment(&v, &t, &s), first);
        }
        assert!(first);
    }

    #[test]
    fn test_endpoint_on_plane_counts() {
        let (v, t) = flat_triangle();
        let touching = Segment::new(Point3f::new(0.2, 0.2, 0.0), Point3f::new(0.2, 0.2, 1.0));
        assert!(triangle_intersects_segment(&v, &t, &touching));
        // edge points are inside
        let on_edge = Segment::new(Point3f::new(0.5, 0.0, -1.0), Point3f::new(0.5, 0.0, 1.0));
        assert!(triangle_intersects_segment(&v, &t, &on_edge));
    }

    #[test]
    fn test_coplanar_segment() {
        let (v, t) = flat_triangle();
        let inside = Segment::new(Point3f::new(0.1, 0.1, 0.0), Point3f::new(3.0, 3.0, 0.0));
        let outside = Segment::new(Point3f::new(2.0, 2.0, 0.0), Point3f::new(3.0, 3.0, 0.0));
        assert!(triangle_intersects_segment(&v, &t, &inside));
        assert!(!triangle_intersects_segment(&v, &t, &outside));
    }

    #[test]
    fn test_coplanar_segment_crossing_interior() {
        let (v, t) = flat_triangle();
        // both endpoints outside, the middle passes through the triangle
        let across = Segment::new(Point3f::new(-0.5, 0.25, 0.0), Point3f::new(1.5, 0.25, 0.0));
        assert!(triangle_intersects_segment(&v, &t, &across));
        // grazing the corner at (1, 0)
        let corner = Segment::new(Point3f::new(1.0, -1.0, 0.0), Point3f::new(1.0, 1.0, 0.0));
        assert!(triangle_intersects_segment(&v, &t, &corner));
        let beside = Segment::new(Point3f::new(-0.5, -0.25, 0.0), Point3f::new(1.5, -0.25, 0.0));
        assert!(!triangle_intersects_segment(&v, &t, &beside));
    }

    #[test]
    fn test_coplanar_star_overlap() {
        let star = |offset: f32| -> Vec<Point3f> {
            (0..3)
                .map(|k| {
                    let angle = (offset + 120.0 * k as f32).to_radians();
                    Point3f::new(angle.cos(), angle.sin(), 2.0)
                })
                .collect()
        };
        let (va, vb) = (star(90.0), star(270.0));
        let a = Triangle::new(&va, [0, 1, 2]);
        let b = Triangle::new(&vb, [0, 1, 2]);
        // no corner of either lies inside the other
        assert!(triangles_intersect(&va, &a, &vb, &b));
        assert!(triangles_intersect(&vb, &b, &va, &a));
    }

    #[test]
    fn test_crossing_triangles() {
        let (va, a) = flat_triangle();
        let vb = vec![
            Point3f::new(0.2, 0.2, -1.0),
            Point3f::new(0.2, 0.2, 1.0),
            Point3f::new(0.3, -0.5, 0.0),
        ];
        let b = Triangle::new(&vb, [0, 1, 2]);
        assert!(triangles_intersect(&va, &a, &vb, &b));
        assert!(triangles_intersect(&vb, &b, &va, &a));

        let far: Vec<Point3f> = vb.iter().map(|p| p + Vector3f::new(5.0, 0.0, 0.0)).collect();
        let c = Triangle::new(&far, [0, 1, 2]);
        assert!(!triangles_intersect(&va, &a, &far, &c));
    }

    #[test]
    fn test_overlapping_cubes_single() {
        let a = cube();
        let b = shifted(&a, 0.25);
        let hierarchy = BoxHierarchy::build(&b, &HierarchyConfig::default()).unwrap();
        let out = extract_collisions(&a, &b, &hierarchy, CollisionMode::Single);

        assert!(out.face_count() > 0);
        assert!(out.face_count() < a.face_count());
        assert_eq!(out.vertex_count(), 3 * out.face_count());
        for (ti, t) in out.live_triangles() {
            assert!(t.indices.iter().all(|&v| out.triangles_of(v).any(|x| x == ti)));
        }
        // the face at x = 0 lies outside b
        assert!(out.faces().all(|f| f.iter().any(|&v| out.vertices[v].x > 0.0)));
    }

    #[test]
    fn test_emitted_triangles_touch_other_mesh() {
        let a = cube();
        let b = shifted(&a, 0.25);
        let out = collide(&a, &b, &HierarchyConfig::default(), CollisionMode::Both);
        assert!(out.face_count() > 0);
        for (ti, t) in out.live_triangles() {
            let touches_a = a
                .live_triangles()
                .any(|(_, ta)| triangles_intersect(&out.vertices, t, &a.vertices, ta));
            let touches_b = b
                .live_triangles()
                .any(|(_, tb)| triangles_intersect(&out.vertices, t, &b.vertices, tb));
            assert!(touches_a && touches_b, "triangle {} touches nothing", ti);
        }
    }

    #[test]
    fn test_both_mode_emits_more() {
        let a = cube();
        let b = shifted(&a, 0.25);
        let single = collide(&a, &b, &HierarchyConfig::default(), CollisionMode::Single);
        let both = collide(&a, &b, &HierarchyConfig::default(), CollisionMode::Both);
        assert!(both.face_count() > single.face_count());
    }

    #[test]
    fn test_separated_cubes_are_empty() {
        let a = cube();
        let b = shifted(&a, 2.0);
        let out = collide(&a, &b, &HierarchyConfig::default(), CollisionMode::Both);
        assert_eq!(out.face_count(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_touching_cubes_are_rejected_early() {
        let a = cube();
        let b = shifted(&a, 1.0);
        let out = collide(&a, &b, &HierarchyConfig::default(), CollisionMode::Single);
        assert!(out.is_empty());
    }
}
