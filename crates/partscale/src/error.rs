//! Error types for the rescale engine.

use partscale_presets::PresetError;
use thiserror::Error;

use crate::state::ScaleMode;

/// Errors that can occur while configuring or rescaling parts.
#[derive(Error, Debug)]
pub enum ScaleError {
    /// Part id is not in the ship.
    #[error("part not found in ship")]
    UnknownPart,

    /// Part has no scaling module.
    #[error("part {0} has no scaling module")]
    NoModule(String),

    /// Scaling module disabled itself during setup.
    #[error("scaling is disabled on part {0}")]
    ModuleDisabled(String),

    /// Attach node lookup failed.
    #[error("attach node {node} not found on part {part}")]
    MissingNode {
        /// Part name.
        part: String,
        /// Node id.
        node: String,
    },

    /// Preset catalog lookup failed.
    #[error(transparent)]
    Preset(#[from] PresetError),

    /// Scale type not present in the configuration catalog.
    #[error("scale type not found: {0}")]
    MissingConfig(String),

    /// Scale type failed validation.
    #[error("invalid scale type {name}: {reason}")]
    InvalidConfig {
        /// Scale type name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// More than one scaling module declared on a part.
    #[error("part {part} declares {count} scaling modules")]
    DuplicateModule {
        /// Part name.
        part: String,
        /// Number of declarations.
        count: usize,
    },

    /// Requested scale is not a positive finite number.
    #[error("invalid scale {0}")]
    InvalidScale(f64),

    /// Control used while the module is in another scale mode.
    #[error("control needs scale mode {expected}, module is in {actual}")]
    WrongMode {
        /// Mode the control belongs to.
        expected: ScaleMode,
        /// Current mode of the module.
        actual: ScaleMode,
    },

    /// Choice control index out of range.
    #[error("option index {index} out of range ({len} options)")]
    OptionOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of options offered.
        len: usize,
    },

    /// Persisted record holds an unreadable value.
    #[error("invalid persisted field {key}: {value:?}")]
    Persistence {
        /// Record key.
        key: String,
        /// Raw value.
        value: String,
    },

    /// TOML parse failure.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// IO failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for rescale operations.
pub type Result<T> = std::result::Result<T, ScaleError>;
