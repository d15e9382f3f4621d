//! Persisted per-part scale state.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use partscale_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScaleError};

/// Opaque key/value record the host saves with each part.
pub type Record = BTreeMap<String, String>;

const KEY_MODE: &str = "scaleMode";
const KEY_SCALE: &str = "scale";
const KEY_STACK_SIZE: &str = "stackSize";
const KEY_PRISTINE: &str = "pristineModelScale";

// Written by older releases; read only.
const LEGACY_CURRENT: &str = "currentScale";
const LEGACY_TWEAK: &str = "tweakScale";
const LEGACY_DEFAULT: &str = "defaultScale";
const LEGACY_TRANSFORM: &str = "defaultTransformScale";

/// How the scale of a part is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScaleMode {
    /// Scale pinned at identity.
    #[default]
    Disabled,
    /// Continuous scale (or a discrete step table).
    Free,
    /// Scale snapped to catalog stack diameters.
    StackPreset,
}

impl fmt::Display for ScaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScaleMode::Disabled => "Disabled",
            ScaleMode::Free => "Free",
            ScaleMode::StackPreset => "StackPreset",
        };
        f.write_str(s)
    }
}

impl FromStr for ScaleMode {
    type Err = ScaleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Disabled" | "0" => Ok(ScaleMode::Disabled),
            "Free" | "1" => Ok(ScaleMode::Free),
            "StackPreset" | "2" => Ok(ScaleMode::StackPreset),
            other => Err(ScaleError::Persistence {
                key: KEY_MODE.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Scale state owned by one part instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartScaleState {
    /// Active mode.
    pub scale_mode: ScaleMode,
    /// Current absolute scale.
    pub scale: f64,
    /// Native stack diameter, 0 if not stack-attachable.
    pub stack_size: f64,
    /// Model scale before the first rescale; zero until captured.
    pub pristine_model_scale: Vec3,
    /// Lower scale bound.
    pub min_scale: f64,
    /// Upper scale bound.
    pub max_scale: f64,
}

impl Default for PartScaleState {
    fn default() -> Self {
        Self {
            scale_mode: ScaleMode::Disabled,
            scale: 1.0,
            stack_size: 0.0,
            pristine_model_scale: Vec3::zeros(),
            min_scale: 0.5,
            max_scale: 2.0,
        }
    }
}

impl PartScaleState {
    /// True when the part is not at its native size.
    pub fn is_scaled(&self) -> bool {
        self.scale != 1.0
    }

    /// True when scales are expressed as stack diameters.
    pub fn use_size_scale(&self) -> bool {
        self.stack_size > 0.0
    }

    /// True once the pristine model scale has been captured.
    pub fn has_pristine(&self) -> bool {
        self.pristine_model_scale != Vec3::zeros()
    }

    /// Persisted fields as a record.
    pub fn to_record(&self) -> Record {
        let p = self.pristine_model_scale;
        let mut record = Record::new();
        record.insert(KEY_MODE.into(), self.scale_mode.to_string());
        record.insert(KEY_SCALE.into(), self.scale.to_string());
        record.insert(KEY_STACK_SIZE.into(), self.stack_size.to_string());
        record.insert(KEY_PRISTINE.into(), format!("{},{},{}", p.x, p.y, p.z));
        record
    }

    /// Overwrite persisted fields from `record`.
    ///
    /// Missing keys keep their current values; on error nothing changes.
    /// Records from older releases store the scale as `currentScale` or
    /// `tweakScale` relative to `defaultScale`, and the pristine model
    /// scale as `defaultTransformScale`; a scaled legacy record loads in
    /// Free mode.
    pub fn apply_record(&mut self, record: &Record) -> Result<()> {
        let mut next = *self;
        let legacy = !record.contains_key(KEY_SCALE)
            && (record.contains_key(LEGACY_CURRENT) || record.contains_key(LEGACY_TWEAK));

        if let Some(scale) = read_f64(record, KEY_SCALE)? {
            next.scale = check_scale(KEY_SCALE, scale)?;
        } else if legacy {
            let key = if record.contains_key(LEGACY_CURRENT) {
                LEGACY_CURRENT
            } else {
                LEGACY_TWEAK
            };
            let value = read_f64(record, key)?.unwrap_or(1.0);
            let default = read_f64(record, LEGACY_DEFAULT)?.unwrap_or(1.0);
            let default = check_scale(LEGACY_DEFAULT, default)?;
            next.scale = check_scale(key, value / default)?;
        }

        if let Some(mode) = record.get(KEY_MODE) {
            next.scale_mode = mode.parse()?;
        } else if legacy && next.is_scaled() {
            next.scale_mode = ScaleMode::Free;
        }

        if let Some(size) = read_f64(record, KEY_STACK_SIZE)? {
            next.stack_size = size.max(0.0);
        }

        if let Some(v) = read_vec3(record, KEY_PRISTINE)? {
            next.pristine_model_scale = v;
        } else if let Some(v) = read_vec3(record, LEGACY_TRANSFORM)? {
            next.pristine_model_scale = v;
        }
        *self = next;
        Ok(())
    }
}

fn invalid(key: &str, value: &str) -> ScaleError {
    ScaleError::Persistence {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn check_scale(key: &str, scale: f64) -> Result<f64> {
    if scale > 0.0 && scale.is_finite() {
        Ok(scale)
    } else {
        Err(invalid(key, &scale.to_string()))
    }
}

fn read_f64(record: &Record, key: &str) -> Result<Option<f64>> {
    record
        .get(key)
        .map(|raw| raw.trim().parse::<f64>().map_err(|_| invalid(key, raw)))
        .transpose()
}

/// Parse `"x,y,z"`, tolerating surrounding parentheses and spaces.
fn read_vec3(record: &Record, key: &str) -> Result<Option<Vec3>> {
    let Some(raw) = record.get(key) else {
        return Ok(None);
    };
    let parts: Vec<f64> = raw
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .map(|s| s.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| invalid(key, raw))?;
    match parts.as_slice() {
        [x, y, z] => Ok(Some(Vec3::new(*x, *y, *z))),
        _ => Err(invalid(key, raw)),
    }
}
