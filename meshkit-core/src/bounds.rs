//! Bounding volumes: axis-aligned boxes, spheres and line segments

use crate::point::*;
use serde::{Deserialize, Serialize};

/// Outcode bit: point at or beyond the box's maximum Z face
pub const OUT_Z_MAX: u8 = 0x01;
/// Outcode bit: point at or beyond the box's minimum Z face
pub const OUT_Z_MIN: u8 = 0x02;
/// Outcode bit: point at or beyond the box's maximum Y face
pub const OUT_Y_MAX: u8 = 0x04;
/// Outcode bit: point at or beyond the box's minimum Y face
pub const OUT_Y_MIN: u8 = 0x08;
/// Outcode bit: point at or beyond the box's maximum X face
pub const OUT_X_MAX: u8 = 0x10;
/// Outcode bit: point at or beyond the box's minimum X face
pub const OUT_X_MIN: u8 = 0x20;

/// A line segment between two points. Also used as a finite ray.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point3f,
    pub end: Point3f,
}

impl Segment {
    pub fn new(start: Point3f, end: Point3f) -> Self {
        Self { start, end }
    }

    /// Point at parameter `t` (0 = start, 1 = end)
    #[inline]
    pub fn point_at(&self, t: f32) -> Point3f {
        self.start + (self.end - self.start) * t
    }

    pub fn direction(&self) -> Vector3f {
        self.end - self.start
    }
}

/// Axis-aligned bounding box.
///
/// Degenerate boxes (zero extent on one or more axes) are valid and describe
/// flat or point-like sets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Point3f,
    pub max: Point3f,
}

impl Aabb {
    pub fn new(min: Point3f, max: Point3f) -> Self {
        Self { min, max }
    }

    /// Box around a single point
    pub fn from_point(p: &Point3f) -> Self {
        Self { min: *p, max: *p }
    }

    /// Tight box around the three corners of a triangle
    pub fn from_triangle(a: &Point3f, b: &Point3f, c: &Point3f) -> Self {
        Self {
            min: point_min(a, &point_min(b, c)),
            max: point_max(a, &point_max(b, c)),
        }
    }

    /// Tight box around a set of points, `None` when the set is empty
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3f>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut aabb = Self::from_point(first);
        for p in iter {
            aabb.include_point(p);
        }
        Some(aabb)
    }

    /// Grow the box to contain `p`
    pub fn include_point(&mut self, p: &Point3f) {
        self.min = point_min(&self.min, p);
        self.max = point_max(&self.max, p);
    }

    /// Grow the box to contain `other`
    pub fn include_box(&mut self, other: &Aabb) {
        self.min = point_min(&self.min, &other.min);
        self.max = point_max(&self.max, &other.max);
    }

    pub fn extent(&self) -> Vector3f {
        self.max - self.min
    }

    pub fn x_size(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn y_size(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn z_size(&self) -> f32 {
        self.max.z - self.min.z
    }

    pub fn size(&self, axis: Axis) -> f32 {
        self.max[axis.index()] - self.min[axis.index()]
    }

    /// Largest of the three extents
    pub fn max_size(&self) -> f32 {
        self.x_size().max(self.y_size()).max(self.z_size())
    }

    /// Axis of the largest extent; ties resolve towards X, then Y
    pub fn largest_axis(&self) -> Axis {
        let e = self.extent();
        if e.x >= e.y && e.x >= e.z {
            Axis::X
        } else if e.y >= e.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    pub fn center(&self) -> Point3f {
        midpoint(&self.min, &self.max)
    }

    pub fn volume(&self) -> f32 {
        let e = self.extent();
        e.x * e.y * e.z
    }

    pub fn diagonal(&self) -> f32 {
        self.extent().norm()
    }

    /// Open-interval overlap on all three axes. Boxes that only share a face,
    /// edge or corner do not intersect.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    /// Closed-interval overlap on all three axes (touching counts as overlap).
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn contains_point(&self, p: &Point3f) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    pub fn contains_box(&self, other: &Aabb) -> bool {
        self.contains_point(&other.min) && self.contains_point(&other.max)
    }

    /// Intersection of two boxes. The result is only meaningful when the
    /// boxes overlap; otherwise some axis ends up inverted.
    pub fn clamp_to(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: point_max(&self.min, &other.min),
            max: point_min(&self.max, &other.max),
        }
    }

    /// Split the box at `value` along `axis` into the lower and upper halves
    pub fn split(&self, axis: Axis, value: f32) -> (Aabb, Aabb) {
        let mut lower = *self;
        let mut upper = *self;
        lower.max[axis.index()] = value;
        upper.min[axis.index()] = value;
        (lower, upper)
    }

    /// 6-bit Cohen-Sutherland style outcode of `p` relative to this box.
    ///
    /// A bit is set when the point lies on or beyond the corresponding face.
    /// Both bounds of an axis are tested independently, so a point on a
    /// degenerate axis carries both bits.
    pub fn outcode(&self, p: &Point3f) -> u8 {
        let mut code = 0u8;
        if p.z >= self.max.z {
            code |= OUT_Z_MAX;
        }
        if p.z <= self.min.z {
            code |= OUT_Z_MIN;
        }
        if p.y >= self.max.y {
            code |= OUT_Y_MAX;
        }
        if p.y <= self.min.y {
            code |= OUT_Y_MIN;
        }
        if p.x >= self.max.x {
            code |= OUT_X_MAX;
        }
        if p.x <= self.min.x {
            code |= OUT_X_MIN;
        }
        code
    }

    /// Outcode trivial reject: `false` only when both endpoints lie beyond
    /// the same face plane. Conservative, never misses a real crossing.
    pub fn segment_may_cross(&self, segment: &Segment) -> bool {
        self.outcode(&segment.start) & self.outcode(&segment.end) == 0
    }

    /// Exact segment/box test: outcode trivial accept and reject, followed
    /// by slab clipping for the undecided cases.
    pub fn segment_intersects(&self, segment: &Segment) -> bool {
        let c1 = self.outcode(&segment.start);
        let c2 = self.outcode(&segment.end);
        if c1 | c2 == 0 {
            return true;
        }
        if c1 & c2 != 0 {
            return false;
        }

        let dir = segment.direction();
        let mut t_enter = 0.0f32;
        let mut t_exit = 1.0f32;
        for axis in Axis::ALL {
            let i = axis.index();
            let origin = segment.start[i];
            if dir[i].abs() <= f32::EPSILON {
                if origin < self.min[i] || origin > self.max[i] {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / dir[i];
            let mut t0 = (self.min[i] - origin) * inv;
            let mut t1 = (self.max[i] - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_enter = t_enter.max(t0);
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return false;
            }
        }
        true
    }

    pub fn translate(&mut self, offset: &Vector3f) -> &mut Self {
        self.min += offset;
        self.max += offset;
        self
    }

    /// Scale both corners about the origin. Negative factors keep the
    /// min/max ordering.
    pub fn scale(&mut self, factor: f32) -> &mut Self {
        let a = self.min * factor;
        let b = self.max * factor;
        self.min = point_min(&a, &b);
        self.max = point_max(&a, &b);
        self
    }
}

/// Bounding sphere
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub center: Point3f,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Point3f, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Zero-radius sphere at `center`
    pub fn degenerate(center: Point3f) -> Self {
        Self { center, radius: 0.0 }
    }

    /// Ritter's approximate bounding sphere.
    ///
    /// Seeds from the most separated pair among the six axis-extremal
    /// points, then grows once over all points to cover outliers. The result
    /// encloses every point but is not minimal. `None` for an empty set.
    pub fn from_points(points: &[Point3f]) -> Option<Self> {
        let first = points.first()?;

        let mut extremes = [*first; 6];
        for p in points {
            for axis in Axis::ALL {
                let i = axis.index();
                if p[i] < extremes[2 * i][i] {
                    extremes[2 * i] = *p;
                }
                if p[i] > extremes[2 * i + 1][i] {
                    extremes[2 * i + 1] = *p;
                }
            }
        }

        let (mut a, mut b) = (extremes[0], extremes[1]);
        let mut best = (b - a).norm_squared();
        for i in 0..6 {
            for j in (i + 1)..6 {
                let d = (extremes[j] - extremes[i]).norm_squared();
                if d > best {
                    best = d;
                    a = extremes[i];
                    b = extremes[j];
                }
            }
        }

        let mut center = midpoint(&a, &b);
        let mut radius = best.sqrt() * 0.5;
        for p in points {
            let d = (p - center).norm();
            if d > radius {
                let grown = (radius + d) * 0.5;
                center += (p - center) * ((d - grown) / d);
                radius = grown;
            }
        }

        Some(Self { center, radius })
    }

    pub fn volume(&self) -> f32 {
        4.0 / 3.0 * std::f32::consts::PI * self.radius.powi(3)
    }

    pub fn contains_point(&self, p: &Point3f, tolerance: f32) -> bool {
        (p - self.center).norm() <= self.radius + tolerance
    }

    /// Volume shared by two spheres (closed-form spherical lens)
    pub fn overlap_volume(&self, other: &BoundingSphere) -> f32 {
        let d = (other.center - self.center).norm();
        let (r1, r2) = (self.radius, other.radius);
        if d >= r1 + r2 {
            return 0.0;
        }
        if d <= (r1 - r2).abs() {
            let r = r1.min(r2);
            return 4.0 / 3.0 * std::f32::consts::PI * r.powi(3);
        }
        std::f32::consts::PI * (r1 + r2 - d).powi(2)
            * (d * d + 2.0 * d * r2 - 3.0 * r2 * r2 + 2.0 * d * r1 + 6.0 * r1 * r2 - 3.0 * r1 * r1)
            / (12.0 * d)
    }

    /// Closed overlap between the sphere and a box
    pub fn overlaps_box(&self, aabb: &Aabb) -> bool {
        let mut dist_sq = 0.0;
        for axis in Axis::ALL {
            let i = axis.index();
            let v = self.center[i];
            if v < aabb.min[i] {
                dist_sq += (aabb.min[i] - v).powi(2);
            } else if v > aabb.max[i] {
                dist_sq += (v - aabb.max[i]).powi(2);
            }
        }
        dist_sq <= self.radius * self.radius
    }

    /// Whether the segment passes within `radius` of the center
    pub fn segment_intersects(&self, segment: &Segment) -> bool {
        let dir = segment.direction();
        let len_sq = dir.norm_squared();
        let t = if len_sq > 0.0 {
            ((self.center - segment.start).dot(&dir) / len_sq).clamp(0.0, 1.0)
        } else {
            0.0
        };
        (segment.point_at(t) - self.center).norm_squared() <= self.radius * self.radius
    }
}

/// Common interface of the volumes stored in a bounding hierarchy.
pub trait BoundingVolume: Clone + Send + Sync {
    /// Enclosed volume
    fn measure(&self) -> f32;

    /// Volume shared with a sibling at the same hierarchy level
    fn overlap_measure(&self, _other: &Self) -> f32 {
        0.0
    }

    /// Closed overlap test against a box
    fn overlaps_box(&self, aabb: &Aabb) -> bool;

    /// Conservative culling test for a segment; may return `true` for
    /// segments that miss, never `false` for segments that hit.
    fn may_cross(&self, segment: &Segment) -> bool;

    fn translate(&mut self, offset: &Vector3f);

    /// Uniform scale about the origin
    fn scale(&mut self, factor: f32);
}

impl BoundingVolume for Aabb {
    fn measure(&self) -> f32 {
        self.volume()
    }

    fn overlaps_box(&self, aabb: &Aabb) -> bool {
        self.overlaps(aabb)
    }

    fn may_cross(&self, segment: &Segment) -> bool {
        self.segment_may_cross(segment)
    }

    fn translate(&mut self, offset: &Vector3f) {
        Aabb::translate(self, offset);
    }

    fn scale(&mut self, factor: f32) {
        Aabb::scale(self, factor);
    }
}

impl BoundingVolume for BoundingSphere {
    fn measure(&self) -> f32 {
        self.volume()
    }

    fn overlap_measure(&self, other: &Self) -> f32 {
        self.overlap_volume(other)
    }

    fn overlaps_box(&self, aabb: &Aabb) -> bool {
        BoundingSphere::overlaps_box(self, aabb)
    }

    fn may_cross(&self, segment: &Segment) -> bool {
        self.segment_intersects(segment)
    }

    fn translate(&mut self, offset: &Vector3f) {
        self.center += offset;
    }

    fn scale(&mut self, factor: f32) {
        self.center *= factor;
        self.radius *= factor.abs();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> Aabb {
        Aabb::new(Point3f::new(0.0, 0.0, 0.0), Point3f::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_touching_boxes_do_not_intersect() {
        let a = unit_box();
        let b = Aabb::new(Point3f::new(1.0, 0.0, 0.0), Point3f::new(2.0, 1.0, 1.0));
        assert!(!a.intersects(&b));
        assert!(!b.intersects(&a));
        // closed test still reports the shared face
        assert!(a.overlaps(&b));
    }

    #[test]
    fn test_overlapping_boxes_intersect() {
        let a = unit_box();
        let b = Aabb::new(Point3f::new(0.5, 0.5, 0.5), Point3f::new(2.0, 2.0, 2.0));
        assert!(a.intersects(&b));
        assert!(a.overlaps(&b));
    }

    #[test]
    fn test_outcode_inside_is_zero() {
        let b = unit_box();
        assert_eq!(b.outcode(&Point3f::new(0.5, 0.5, 0.5)), 0);
        assert_eq!(b.outcode(&Point3f::new(0.01, 0.99, 0.3)), 0);
    }

    #[test]
    fn test_outcode_single_axis_bits() {
        let b = unit_box();
        assert_eq!(b.outcode(&Point3f::new(2.0, 0.5, 0.5)), OUT_X_MAX);
        assert_eq!(b.outcode(&Point3f::new(-1.0, 0.5, 0.5)), OUT_X_MIN);
        assert_eq!(b.outcode(&Point3f::new(0.5, 2.0, 0.5)), OUT_Y_MAX);
        assert_eq!(b.outcode(&Point3f::new(0.5, -1.0, 0.5)), OUT_Y_MIN);
        assert_eq!(b.outcode(&Point3f::new(0.5, 0.5, 2.0)), OUT_Z_MAX);
        assert_eq!(b.outcode(&Point3f::new(0.5, 0.5, -1.0)), OUT_Z_MIN);
        // on the face counts as beyond it
        assert_eq!(b.outcode(&Point3f::new(1.0, 0.5, 0.5)), OUT_X_MAX);
        assert_eq!(
            b.outcode(&Point3f::new(2.0, -1.0, 0.5)),
            OUT_X_MAX | OUT_Y_MIN
        );
    }

    #[test]
    fn test_segment_trivial_accept_and_reject() {
        let b = unit_box();
        let inside = Segment::new(Point3f::new(0.2, 0.2, 0.2), Point3f::new(0.8, 0.8, 0.8));
        assert!(b.segment_may_cross(&inside));
        assert!(b.segment_intersects(&inside));

        let beside = Segment::new(Point3f::new(2.0, 0.0, 0.0), Point3f::new(3.0, 1.0, 1.0));
        assert!(!b.segment_may_cross(&beside));
        assert!(!b.segment_intersects(&beside));
    }

    #[test]
    fn test_segment_exact_refinement() {
        let b = unit_box();
        let through = Segment::new(Point3f::new(-1.0, 0.5, 0.5), Point3f::new(2.0, 0.5, 0.5));
        assert!(b.segment_intersects(&through));

        // passes the corner region without touching the box
        let miss = Segment::new(Point3f::new(-1.0, 0.5, 0.5), Point3f::new(0.5, 3.0, 0.5));
        assert!(b.segment_may_cross(&miss));
        assert!(!b.segment_intersects(&miss));

        // the answer does not depend on call order or repetition
        for _ in 0..10 {
            assert!(!b.segment_intersects(&miss));
        }
    }

    #[test]
    fn test_clamp_and_split() {
        let b = unit_box();
        let (lo, hi) = b.split(Axis::X, 0.5);
        assert_eq!(lo.max.x, 0.5);
        assert_eq!(hi.min.x, 0.5);
        let wide = Aabb::new(Point3f::new(-1.0, 0.2, 0.2), Point3f::new(0.7, 0.8, 0.8));
        let clamped = wide.clamp_to(&lo);
        assert_eq!(clamped.min, Point3f::new(0.0, 0.2, 0.2));
        assert_eq!(clamped.max, Point3f::new(0.5, 0.8, 0.8));
    }

    #[test]
    fn test_largest_axis() {
        let b = Aabb::new(Point3f::origin(), Point3f::new(1.0, 3.0, 2.0));
        assert_eq!(b.largest_axis(), Axis::Y);
        assert_eq!(unit_box().largest_axis(), Axis::X);
    }

    #[test]
    fn test_ritter_sphere_encloses_points() {
        let points = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
            Point3f::new(0.0, 0.0, 1.0),
            Point3f::new(1.0, 1.0, 1.0),
            Point3f::new(0.3, 0.9, 0.1),
        ];
        let s = BoundingSphere::from_points(&points).unwrap();
        for p in &points {
            assert!(s.contains_point(p, 1e-4));
        }
        // loose, but not absurdly so
        assert!(s.radius < 1.5);
        assert!(BoundingSphere::from_points(&[]).is_none());
    }

    #[test]
    fn test_sphere_overlap_volume() {
        let a = BoundingSphere::new(Point3f::origin(), 1.0);
        let far = BoundingSphere::new(Point3f::new(3.0, 0.0, 0.0), 1.0);
        assert_eq!(a.overlap_volume(&far), 0.0);

        let same = a;
        assert_relative_eq!(a.overlap_volume(&same), a.volume(), epsilon = 1e-4);

        // two unit spheres one radius apart share 5/12 * pi
        let half = BoundingSphere::new(Point3f::new(1.0, 0.0, 0.0), 1.0);
        assert_relative_eq!(
            a.overlap_volume(&half),
            5.0 / 12.0 * std::f32::consts::PI,
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_sphere_segment() {
        let s = BoundingSphere::new(Point3f::origin(), 1.0);
        let hit = Segment::new(Point3f::new(-2.0, 0.5, 0.0), Point3f::new(2.0, 0.5, 0.0));
        let miss = Segment::new(Point3f::new(-2.0, 1.5, 0.0), Point3f::new(2.0, 1.5, 0.0));
        assert!(s.segment_intersects(&hit));
        assert!(!s.segment_intersects(&miss));
    }
}
