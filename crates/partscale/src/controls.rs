//! Editor control model.
//!
//! The engine never draws anything. After each event it describes the
//! controls the editor should show, and the editor reports user input
//! back through the engine's entry points.

use partscale_presets::{PresetSelection, PresetTable};
use serde::Serialize;

use crate::config::ScaleConfig;
use crate::state::{PartScaleState, ScaleMode};
use crate::tech::TechGate;

/// Slider increment in percent mode.
const PERCENT_STEP: f64 = 1.0;
/// Slider increment in metre mode.
const METRE_STEP: f64 = 0.005;

/// Unit shown on the free scale slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SliderUnit {
    /// Percentage of native size.
    Percent,
    /// Absolute stack diameter.
    Metres,
}

/// Continuous scale slider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SliderControl {
    /// Current value in `unit`.
    pub value: f64,
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
    /// Increment.
    pub step: f64,
    /// Display unit.
    pub unit: SliderUnit,
}

impl SliderControl {
    /// Clamp `value` into the slider range.
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Label for `value`.
    pub fn format(&self, value: f64) -> String {
        match self.unit {
            SliderUnit::Percent => format!("{:.0}%", value),
            SliderUnit::Metres => format!("{:.3}m", value),
        }
    }
}

/// Discrete step choice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepControl {
    /// Labels of the offered steps.
    pub titles: Vec<String>,
    /// Scale ratio of each offered step.
    pub factors: Vec<f64>,
    /// Selected offered step.
    pub selected: usize,
}

/// The scale input shown below the mode selector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ScaleInput {
    /// Nothing (Disabled mode).
    Hidden,
    /// Continuous slider.
    Slider(SliderControl),
    /// Discrete step list.
    Steps(StepControl),
    /// Stack preset list.
    Presets(PresetSelection),
}

/// Everything the editor needs to draw the scaling controls of a part.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaleControls {
    /// Modes offered, in display order.
    pub modes: Vec<ScaleMode>,
    /// Index of the active mode in `modes`.
    pub mode_index: usize,
    /// Input for the active mode.
    pub input: ScaleInput,
}

impl Default for ScaleControls {
    fn default() -> Self {
        Self {
            modes: vec![ScaleMode::Disabled, ScaleMode::Free],
            mode_index: 0,
            input: ScaleInput::Hidden,
        }
    }
}

/// Modes offered for a part.
pub fn offered_modes(state: &PartScaleState) -> Vec<ScaleMode> {
    if state.use_size_scale() {
        vec![ScaleMode::Disabled, ScaleMode::StackPreset, ScaleMode::Free]
    } else {
        vec![ScaleMode::Disabled, ScaleMode::Free]
    }
}

/// Slider for the free mode.
pub fn slider(state: &PartScaleState) -> SliderControl {
    if state.use_size_scale() {
        SliderControl {
            value: state.stack_size * state.scale,
            min: state.min_scale * state.stack_size,
            max: state.max_scale * state.stack_size,
            step: METRE_STEP,
            unit: SliderUnit::Metres,
        }
    } else {
        SliderControl {
            value: state.scale * 100.0,
            min: state.min_scale * 100.0,
            max: state.max_scale * 100.0,
            step: PERCENT_STEP,
            unit: SliderUnit::Percent,
        }
    }
}

/// Indices into `config.steps` of the steps the player may pick.
pub fn offered_steps(config: &ScaleConfig, tech: &dyn TechGate) -> Vec<usize> {
    config
        .steps
        .iter()
        .enumerate()
        .filter(|(_, s)| tech.is_unlocked(&s.tech))
        .map(|(i, _)| i)
        .collect()
}

/// Step list for a discrete scale type.
pub fn steps(state: &PartScaleState, config: &ScaleConfig, tech: &dyn TechGate) -> StepControl {
    let offered = offered_steps(config, tech);
    let current = config.step_index(state.scale);
    StepControl {
        titles: offered.iter().map(|&i| config.steps[i].title()).collect(),
        factors: offered.iter().map(|&i| config.steps[i].factor).collect(),
        selected: offered
            .iter()
            .position(|&i| Some(i) == current)
            .unwrap_or(0),
    }
}

/// Presets offered for a stack part.
pub fn presets(state: &PartScaleState, table: &PresetTable) -> PresetSelection {
    table.presets_in_range(
        state.min_scale * state.stack_size,
        state.max_scale * state.stack_size,
        state.stack_size * state.scale,
    )
}

/// Build the controls for the current state.
///
/// `preset_index` is the selected entry of the preset list while in
/// StackPreset mode.
pub fn build(
    state: &PartScaleState,
    config: &ScaleConfig,
    table: &PresetTable,
    tech: &dyn TechGate,
    preset_index: Option<usize>,
) -> ScaleControls {
    let modes = offered_modes(state);
    let mode_index = modes
        .iter()
        .position(|&m| m == state.scale_mode)
        .unwrap_or(0);

    let input = match state.scale_mode {
        ScaleMode::Disabled => ScaleInput::Hidden,
        ScaleMode::Free if config.is_discrete() => ScaleInput::Steps(steps(state, config, tech)),
        ScaleMode::Free => ScaleInput::Slider(slider(state)),
        ScaleMode::StackPreset => {
            let mut selection = presets(state, table);
            if let Some(i) = preset_index.filter(|&i| i < selection.len()) {
                selection.selected = i;
            }
            ScaleInput::Presets(selection)
        }
    };

    ScaleControls {
        modes,
        mode_index,
        input,
    }
}
