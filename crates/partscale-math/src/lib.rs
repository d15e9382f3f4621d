#![warn(missing_docs)]

//! Math types for the partscale engine.
//!
//! Thin wrappers around nalgebra: vector and rotation aliases,
//! axis-aligned bounds, part placements and a scalar tolerance.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A rotation in 3D space.
pub type Quat = UnitQuaternion<f64>;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Degenerate box containing a single point.
    pub fn point(p: Vec3) -> Self {
        Self { min: p, max: p }
    }

    /// Box from a center and full size along each axis.
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size / 2.0;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Grow the box so that it also contains `other`.
    pub fn encapsulate(&mut self, other: &Aabb) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    /// Center of the box.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) / 2.0
    }

    /// Full size along each axis.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Position and orientation of a part in the construction frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Position of the part origin.
    pub position: Vec3,
    /// Orientation of the part.
    pub rotation: Quat,
}

impl Placement {
    /// Placement at the origin with no rotation.
    pub fn identity() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
        }
    }

    /// Unrotated placement at `position`.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::identity(),
        }
    }

    /// Same placement with a different rotation.
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Translate by `delta`, expressed in the axes of `frame`.
    pub fn translate_in(&mut self, delta: &Vec3, frame: &Placement) {
        self.position += frame.rotation * delta;
    }

    /// Express a construction-frame point in this placement's local axes.
    pub fn to_local_point(&self, p: &Vec3) -> Vec3 {
        self.rotation.inverse() * (p - self.position)
    }

    /// Express a construction-frame rotation relative to this placement.
    pub fn to_local_rotation(&self, r: &Quat) -> Quat {
        self.rotation.inverse() * r
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::identity()
    }
}

/// Tolerance constants for scale comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Absolute tolerance for scalar comparisons.
    pub linear: f64,
}

impl Tolerance {
    /// Default tolerance (1e-6).
    pub const DEFAULT: Self = Self { linear: 1e-6 };

    /// Check if two scalars are equal within tolerance.
    pub fn scalars_equal(&self, a: f64, b: f64) -> bool {
        (a - b).abs() < self.linear
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}
