//! Rigid transforms: draw-time placement and matrix transforms

use crate::point::*;
use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Homogeneous matrix transform, used to bake a [`Placement`] into vertices
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform3D {
    pub matrix: Matrix4<f32>,
}

impl Transform3D {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    pub fn translation(translation: Vector3<f32>) -> Self {
        Self {
            matrix: Matrix4::new_translation(&translation),
        }
    }

    pub fn rotation(rotation: UnitQuaternion<f32>) -> Self {
        Self {
            matrix: rotation.to_homogeneous(),
        }
    }

    pub fn transform_point(&self, point: &Point3<f32>) -> Point3<f32> {
        let homogeneous = self.matrix * point.to_homogeneous();
        Point3::from_homogeneous(homogeneous).unwrap_or(*point)
    }

    /// `self` after `other`
    pub fn compose(self, other: Self) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for Transform3D {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        self.compose(rhs)
    }
}

/// Draw-time placement of a mesh: a position and per-axis rotation angles in
/// degrees. Changing the placement never touches vertex data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub position: Vector3f,
    /// Rotation about X, Y and Z, in degrees
    pub rotation: Vector3f,
}

impl Placement {
    pub fn new(position: Vector3f, rotation: Vector3f) -> Self {
        Self { position, rotation }
    }

    /// World transform `T * Rx * Ry * Rz`
    pub fn to_transform(&self) -> Transform3D {
        let r = self.rotation.map(f32::to_radians);
        let rx = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), r.x);
        let ry = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), r.y);
        let rz = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), r.z);
        Transform3D::translation(self.position) * Transform3D::rotation(rx * ry * rz)
    }

    pub fn is_identity(&self) -> bool {
        self.position == Vector3f::zeros() && self.rotation == Vector3f::zeros()
    }
}
