//! Absolute and relative scale ratios.

/// One rescale step: the new absolute scale and the ratio to the previous one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactor {
    scale: f64,
    relative_scale: f64,
}

impl ScaleFactor {
    /// Step from identity straight to `scale`; the relative ratio equals
    /// the absolute one.
    pub fn absolute(scale: f64) -> Self {
        Self {
            scale,
            relative_scale: scale,
        }
    }

    /// Step from `old_scale` to `new_scale`.
    ///
    /// # Panics
    ///
    /// Panics if `old_scale` is zero; a stored scale is never zero.
    pub fn between(old_scale: f64, new_scale: f64) -> Self {
        assert!(old_scale != 0.0, "previous scale must be nonzero");
        Self {
            scale: new_scale,
            relative_scale: new_scale / old_scale,
        }
    }

    /// New absolute scale.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Ratio of the new scale to the previous one.
    pub fn relative_scale(&self) -> f64 {
        self.relative_scale
    }

    /// Linear multiplier (lengths).
    pub fn linear(&self) -> f64 {
        self.scale
    }

    /// Quadratic multiplier (areas).
    pub fn quadratic(&self) -> f64 {
        self.scale * self.scale
    }

    /// Cubic multiplier (volumes, masses).
    pub fn cubic(&self) -> f64 {
        self.scale * self.scale * self.scale
    }
}
