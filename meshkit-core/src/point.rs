//! Point and vector types

use nalgebra::{Point3, Vector3};

/// A 3D point with single precision coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with single precision components
pub type Vector3f = Vector3<f32>;

/// Coordinate axis of a 3D point, usable as an index into `Point3f`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Unnormalized cross product of two vectors.
#[inline]
pub fn cross_product(a: &Vector3f, b: &Vector3f) -> Vector3f {
    a.cross(b)
}

/// Dot product of two vectors.
#[inline]
pub fn dot_product(a: &Vector3f, b: &Vector3f) -> f32 {
    a.dot(b)
}

/// Component-wise minimum of two points
#[inline]
pub fn point_min(a: &Point3f, b: &Point3f) -> Point3f {
    Point3f::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z))
}

/// Component-wise maximum of two points
#[inline]
pub fn point_max(a: &Point3f, b: &Point3f) -> Point3f {
    Point3f::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z))
}

/// Midpoint of two points
#[inline]
pub fn midpoint(a: &Point3f, b: &Point3f) -> Point3f {
    Point3f::from((a.coords + b.coords) * 0.5)
}
