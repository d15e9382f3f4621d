//! Per-part-type scaling configuration.
//!
//! Scale types are read from TOML:
//!
//! ```toml
//! [[scale_type]]
//! name = "stack"
//! min_scale = 0.5
//! max_scale = 2.0
//!
//! [[scale_type]]
//! name = "surface"
//! [[scale_type.step]]
//! factor = 0.5
//! node_size_delta = -1
//! [[scale_type.step]]
//! factor = 1.0
//!
//! [parts]
//! fuelTank = ["stack"]
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use partscale_math::Tolerance;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{Result, ScaleError};

fn default_min_scale() -> f64 {
    0.5
}

fn default_max_scale() -> f64 {
    2.0
}

fn default_exponent() -> f64 {
    3.0
}

/// One entry of a discrete scale table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleStep {
    /// Scale ratio.
    pub factor: f64,
    /// Node size change at this step, replacing the ratio rule.
    #[serde(default)]
    pub node_size_delta: Option<i32>,
    /// Research item gating this step; empty means always available.
    #[serde(default)]
    pub tech: String,
    /// Display label.
    #[serde(default)]
    pub title: Option<String>,
}

impl ScaleStep {
    /// Ungated step without a node size override.
    pub fn new(factor: f64) -> Self {
        Self {
            factor,
            node_size_delta: None,
            tech: String::new(),
            title: None,
        }
    }

    /// Display label, defaulting to a percentage.
    pub fn title(&self) -> String {
        match &self.title {
            Some(t) => t.clone(),
            None => format!("{}%", (self.factor * 1000.0).round() / 10.0),
        }
    }
}

/// Scaling rules for one part type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleConfig {
    /// Stable type key.
    pub name: String,
    /// Lower bound of the free scale ratio.
    #[serde(default = "default_min_scale")]
    pub min_scale: f64,
    /// Upper bound of the free scale ratio.
    #[serde(default = "default_max_scale")]
    pub max_scale: f64,
    /// Mass scaling exponent.
    #[serde(default = "default_exponent")]
    pub mass_exponent: f64,
    /// Dry cost scaling exponent.
    #[serde(default = "default_exponent")]
    pub cost_exponent: f64,
    /// Rescale attached children of the same type along with the part.
    #[serde(default)]
    pub chain_children: bool,
    /// Native stack diameter, overriding autodetection.
    #[serde(default)]
    pub stack_size: Option<f64>,
    /// Discrete scale table; empty for continuous scaling.
    #[serde(default, rename = "step")]
    pub steps: Vec<ScaleStep>,
}

impl ScaleConfig {
    /// Continuous scale type with default bounds and exponents.
    pub fn free(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
            mass_exponent: default_exponent(),
            cost_exponent: default_exponent(),
            chain_children: false,
            stack_size: None,
            steps: Vec::new(),
        }
    }

    /// Discrete scale type.
    pub fn discrete(name: impl Into<String>, steps: Vec<ScaleStep>) -> Self {
        let mut config = Self::free(name);
        if let (Some(first), Some(last)) = (steps.first(), steps.last()) {
            config.min_scale = first.factor;
            config.max_scale = last.factor;
        }
        config.steps = steps;
        config
    }

    /// True when the type uses a discrete scale table.
    pub fn is_discrete(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Index of the step matching `scale`.
    pub fn step_index(&self, scale: f64) -> Option<usize> {
        self.steps
            .iter()
            .position(|s| Tolerance::DEFAULT.scalars_equal(s.factor, scale))
    }

    /// Node size override for the step matching `scale`.
    pub fn node_size_delta(&self, scale: f64) -> Option<i32> {
        self.step_index(scale)
            .and_then(|i| self.steps[i].node_size_delta)
    }

    /// Check bounds, exponents and step ordering.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| ScaleError::InvalidConfig {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if !(self.min_scale > 0.0) || !self.min_scale.is_finite() {
            return Err(invalid("min_scale must be positive"));
        }
        if !(self.max_scale >= self.min_scale) || !self.max_scale.is_finite() {
            return Err(invalid("max_scale must not be below min_scale"));
        }
        if !self.mass_exponent.is_finite() || !self.cost_exponent.is_finite() {
            return Err(invalid("exponents must be finite"));
        }
        if let Some(size) = self.stack_size {
            if !(size > 0.0) {
                return Err(invalid("stack_size must be positive"));
            }
        }
        if self.steps.iter().any(|s| !(s.factor > 0.0)) {
            return Err(invalid("step factors must be positive"));
        }
        if self.steps.windows(2).any(|w| w[0].factor >= w[1].factor) {
            return Err(invalid("steps must be strictly ascending"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "scale_type")]
    scale_types: Vec<ScaleConfig>,
    #[serde(default)]
    parts: HashMap<String, Vec<String>>,
}

/// All scale types and the part-template declarations referencing them.
#[derive(Debug, Clone, Default)]
pub struct ConfigCatalog {
    types: HashMap<String, Arc<ScaleConfig>>,
    rejected: HashMap<String, String>,
    parts: HashMap<String, Vec<String>>,
}

impl ConfigCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from TOML text.
    ///
    /// Only syntax errors fail the whole catalog. Scale types that fail
    /// validation are logged and recorded as rejected, so just the parts
    /// using them lose their scaling.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(text)?;
        let mut catalog = Self::new();
        for config in file.scale_types {
            if let Err(e) = catalog.insert(config) {
                error!("{}", e);
            }
        }
        catalog.parts = file.parts;
        Ok(catalog)
    }

    /// Read and parse a catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Add a scale type after validating it.
    pub fn insert(&mut self, config: ScaleConfig) -> Result<()> {
        if self.types.contains_key(&config.name) {
            let reason = "duplicate scale type name".to_string();
            self.rejected.insert(config.name.clone(), reason.clone());
            self.types.remove(&config.name);
            return Err(ScaleError::InvalidConfig {
                name: config.name,
                reason,
            });
        }
        if let Err(e) = config.validate() {
            if let ScaleError::InvalidConfig { reason, .. } = &e {
                self.rejected.insert(config.name.clone(), reason.clone());
            }
            return Err(e);
        }
        self.types.insert(config.name.clone(), Arc::new(config));
        Ok(())
    }

    /// Declare the scale types a part template carries.
    pub fn declare(&mut self, part: impl Into<String>, types: Vec<String>) {
        self.parts.insert(part.into(), types);
    }

    /// Scale type by name.
    pub fn get(&self, name: &str) -> Result<Arc<ScaleConfig>> {
        if let Some(reason) = self.rejected.get(name) {
            return Err(ScaleError::InvalidConfig {
                name: name.to_string(),
                reason: reason.clone(),
            });
        }
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| ScaleError::MissingConfig(name.to_string()))
    }

    /// Scale types declared on a part template.
    pub fn modules_for(&self, part: &str) -> &[String] {
        self.parts.get(part).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Valid scale types.
    pub fn types(&self) -> impl Iterator<Item = &ScaleConfig> {
        self.types.values().map(|c| c.as_ref())
    }

    /// Rejected scale types and the reason for each.
    pub fn rejected(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rejected.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
        [[scale_type]]
        name = "stack"
        chain_children = true

        [[scale_type]]
        name = "surface"
        mass_exponent = 2.5
        [[scale_type.step]]
        factor = 0.5
        node_size_delta = -1
        tech = "basicRocketry"
        [[scale_type.step]]
        factor = 1.0
        [[scale_type.step]]
        factor = 2.0
        node_size_delta = 1
        title = "Double"

        [[scale_type]]
        name = "broken"
        min_scale = 2.0
        max_scale = 1.0

        [parts]
        fuelTank = ["stack"]
        strut = ["surface", "stack"]
    "#;

    #[test]
    fn test_parse_catalog() {
        let catalog = ConfigCatalog::from_toml_str(CATALOG).unwrap();

        let stack = catalog.get("stack").unwrap();
        assert_eq!(stack.min_scale, 0.5);
        assert_eq!(stack.max_scale, 2.0);
        assert_eq!(stack.cost_exponent, 3.0);
        assert!(stack.chain_children);
        assert!(!stack.is_discrete());

        let surface = catalog.get("surface").unwrap();
        assert_eq!(surface.mass_exponent, 2.5);
        assert_eq!(surface.steps.len(), 3);
        assert_eq!(surface.steps[0].tech, "basicRocketry");
        assert_eq!(surface.node_size_delta(0.5), Some(-1));
        assert_eq!(surface.node_size_delta(1.0), None);
        assert_eq!(surface.node_size_delta(1.5), None);
        assert_eq!(surface.steps[0].title(), "50%");
        assert_eq!(surface.steps[2].title(), "Double");

        assert_eq!(catalog.modules_for("fuelTank"), ["stack".to_string()]);
        assert_eq!(catalog.modules_for("strut").len(), 2);
        assert!(catalog.modules_for("unknown").is_empty());
    }

    #[test]
    fn test_invalid_type_is_rejected_not_fatal() {
        let catalog = ConfigCatalog::from_toml_str(CATALOG).unwrap();
        assert!(matches!(
            catalog.get("broken"),
            Err(ScaleError::InvalidConfig { .. })
        ));
        assert!(matches!(
            catalog.get("missing"),
            Err(ScaleError::MissingConfig(_))
        ));
        assert_eq!(catalog.rejected().count(), 1);
        assert_eq!(catalog.types().count(), 2);
    }

    #[test]
    fn test_syntax_error_fails() {
        assert!(matches!(
            ConfigCatalog::from_toml_str("[[scale_type]\nname ="),
            Err(ScaleError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_validate_steps() {
        let config = ScaleConfig::discrete(
            "bad",
            vec![ScaleStep::new(1.0), ScaleStep::new(0.5)],
        );
        assert!(config.validate().is_err());

        let config = ScaleConfig::discrete(
            "good",
            vec![ScaleStep::new(0.5), ScaleStep::new(1.0), ScaleStep::new(1.5)],
        );
        config.validate().unwrap();
        assert_eq!(config.min_scale, 0.5);
        assert_eq!(config.max_scale, 1.5);
        assert_eq!(config.step_index(1.5), Some(2));
    }

    #[test]
    fn test_duplicate_type_name() {
        let mut catalog = ConfigCatalog::new();
        catalog.insert(ScaleConfig::free("stack")).unwrap();
        assert!(catalog.insert(ScaleConfig::free("stack")).is_err());
        assert!(catalog.get("stack").is_err());
    }
}
