//! Stack size autodetection from collision geometry.
//!
//! Runs once per part template: the horizontal (X/Z) footprint of the
//! active physical colliders is matched against the catalog's
//! auto-profile presets.

use partscale_math::{Aabb, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::table::{PresetTable, StackPreset};

/// Collision layer holding the physical colliders.
pub const PHYSICAL_LAYER: u32 = 0;

/// Footprints narrower than this are too small to classify.
const NOISE_FLOOR: f64 = 0.1;
/// Maximum offset between bounds center and part origin per axis.
const CENTER_TOLERANCE: f64 = 0.1;
/// Relative asymmetry below which the footprint counts as circular.
const SYMMETRIC_LIMIT: f64 = 0.1;
/// Match distance for the averaged circular footprint.
const SYMMETRIC_MATCH: f64 = 0.25;
/// Relative asymmetry above which no match is attempted.
const ASYMMETRIC_LIMIT: f64 = 0.75;
/// Match distance for a single centered axis.
const AXIS_MATCH: f64 = 0.1;

/// World-space bounds of one collider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColliderBounds {
    /// Axis-aligned bounds.
    pub bounds: Aabb,
    /// Collider is active in the hierarchy.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Collision layer.
    #[serde(default)]
    pub layer: u32,
}

fn default_active() -> bool {
    true
}

impl ColliderBounds {
    /// Active collider on the physical layer.
    pub fn physical(bounds: Aabb) -> Self {
        Self {
            bounds,
            active: true,
            layer: PHYSICAL_LAYER,
        }
    }
}

/// Horizontal footprint measurements used for classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    /// Extent along X.
    pub extent_x: f64,
    /// Extent along Z.
    pub extent_z: f64,
    /// Bounds center within tolerance of the origin on X.
    pub x_centered: bool,
    /// Bounds center within tolerance of the origin on Z.
    pub z_centered: bool,
}

impl Footprint {
    /// Measure the footprint of the active physical colliders.
    ///
    /// The bounds start as the part origin itself, so the origin is always
    /// inside the measured box.
    pub fn measure(origin: &Vec3, colliders: &[ColliderBounds]) -> Self {
        let mut bounds = Aabb::point(*origin);
        for collider in colliders
            .iter()
            .filter(|c| c.active && c.layer == PHYSICAL_LAYER)
        {
            bounds.encapsulate(&collider.bounds);
        }

        let size = bounds.size();
        let center = bounds.center();
        Self {
            extent_x: size.x,
            extent_z: size.z,
            x_centered: (center.x - origin.x).abs() < CENTER_TOLERANCE,
            z_centered: (center.z - origin.z).abs() < CENTER_TOLERANCE,
        }
    }

    /// Smaller of the two horizontal extents.
    pub fn min_extent(&self) -> f64 {
        self.extent_x.min(self.extent_z)
    }

    /// `|x - z| / min(x, z)`.
    pub fn relative_asymmetry(&self) -> f64 {
        (self.extent_x - self.extent_z).abs() / self.min_extent()
    }
}

/// Classify a footprint against the catalog's auto-profile presets.
pub fn classify<'a>(table: &'a PresetTable, footprint: &Footprint) -> Option<&'a StackPreset> {
    if footprint.min_extent() < NOISE_FLOOR {
        return None;
    }

    let asymmetry = footprint.relative_asymmetry();
    let auto_presets = || table.iter().filter(|p| p.is_auto_profile);

    if footprint.x_centered && footprint.z_centered && asymmetry < SYMMETRIC_LIMIT {
        let average = (footprint.extent_x + footprint.extent_z) * 0.5;
        if let Some(preset) = auto_presets().find(|p| (average - p.size).abs() < SYMMETRIC_MATCH) {
            return Some(preset);
        }
    }

    if asymmetry < ASYMMETRIC_LIMIT {
        return auto_presets().find(|p| {
            (footprint.x_centered && (footprint.extent_x - p.size).abs() < AXIS_MATCH)
                || (footprint.z_centered && (footprint.extent_z - p.size).abs() < AXIS_MATCH)
        });
    }

    None
}

/// Detect the native stack diameter of a part template.
///
/// Returns `None` when the part cannot be classified, in which case it
/// is not treated as stack-attachable.
pub fn detect_stack_size<'a>(
    table: &'a PresetTable,
    name: &str,
    origin: &Vec3,
    colliders: &[ColliderBounds],
) -> Option<&'a StackPreset> {
    let footprint = Footprint::measure(origin, colliders);
    let preset = classify(table, &footprint);
    match preset {
        Some(p) => info!("Autodetected stack size {} for {}", p.title, name),
        None => debug!(
            "No stack size detected for {} (footprint {:.3} x {:.3})",
            name, footprint.extent_x, footprint.extent_z
        ),
    }
    preset
}
