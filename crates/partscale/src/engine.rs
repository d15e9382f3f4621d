//! The rescale engine.
//!
//! A [`RescaleEngine`] holds the process-wide catalogs and services the
//! per-part [`ScaleModule`]s stored on each [`Part`]. Every operation runs
//! synchronously against a [`Ship`] and completes before returning.

use std::sync::Arc;

use partscale_math::{Tolerance, Vec3};
use partscale_presets::{detect_stack_size, PresetTable};
use tracing::{debug, error, warn};

use crate::config::{ConfigCatalog, ScaleConfig};
use crate::controls::{self, ScaleControls};
use crate::derived::{self, Modifiers};
use crate::error::{Result, ScaleError};
use crate::factor::ScaleFactor;
use crate::part::{AttachNode, Part, PartPrefab};
use crate::ship::{PartId, RescaleEvent, Ship};
use crate::state::{PartScaleState, Record, ScaleMode};
use crate::tech::TechGate;

/// Scaling capability of one part instance.
#[derive(Debug, Clone)]
pub struct ScaleModule {
    /// Persisted state.
    pub state: PartScaleState,
    config: Option<Arc<ScaleConfig>>,
    setup_run: bool,
    modifiers: Modifiers,
    controls: ScaleControls,
    preset_index: Option<usize>,
}

impl ScaleModule {
    fn new(config: Arc<ScaleConfig>, stack_size: f64) -> Self {
        let state = PartScaleState {
            stack_size,
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            ..Default::default()
        };
        Self {
            state,
            config: Some(config),
            setup_run: false,
            modifiers: Modifiers::default(),
            controls: ScaleControls::default(),
            preset_index: None,
        }
    }

    fn disabled() -> Self {
        Self {
            state: PartScaleState::default(),
            config: None,
            setup_run: false,
            modifiers: Modifiers::default(),
            controls: ScaleControls::default(),
            preset_index: None,
        }
    }

    /// False when setup found a configuration problem.
    pub fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Scale type driving this module.
    pub fn config(&self) -> Option<&ScaleConfig> {
        self.config.as_deref()
    }

    /// True when the part is not at its native size.
    pub fn is_scaled(&self) -> bool {
        self.state.is_scaled()
    }

    /// True once setup has applied the persisted scale.
    pub fn is_setup(&self) -> bool {
        self.setup_run
    }

    /// Controls to draw for this part.
    pub fn controls(&self) -> &ScaleControls {
        &self.controls
    }

    /// Cost added by scaling; zero before setup or while unscaled.
    pub fn cost_modifier(&self) -> f64 {
        if self.setup_run && self.is_scaled() {
            self.modifiers.cost
        } else {
            0.0
        }
    }

    /// Mass added by scaling; zero before setup or while unscaled.
    pub fn mass_modifier(&self) -> f64 {
        if self.setup_run && self.is_scaled() {
            self.modifiers.mass
        } else {
            0.0
        }
    }
}

/// How node sizes follow the scale.
#[derive(Debug, Clone, Copy)]
struct NodeSizing {
    scale: f64,
    step_delta: Option<i32>,
}

impl NodeSizing {
    fn size_for(&self, reference_size: i32) -> i32 {
        match self.step_delta {
            Some(delta) => (reference_size + delta).max(0),
            None => scaled_node_size(reference_size, self.scale),
        }
    }
}

/// Node size class for a reference size at an absolute scale.
///
/// Sizes of zero count as half a unit; the result is truncated after
/// adding 0.49 and never negative.
pub fn scaled_node_size(reference_size: i32, scale: f64) -> i32 {
    let base = if reference_size == 0 {
        0.5
    } else {
        f64::from(reference_size)
    };
    ((base * scale + 0.49) as i32).max(0)
}

/// A node that moved, and who is attached to it.
#[derive(Debug, Clone, Copy)]
struct NodeShift {
    attached: Option<PartId>,
    old: Vec3,
    new: Vec3,
}

fn move_node(
    node: &mut AttachNode,
    reference: Option<&AttachNode>,
    factor: &ScaleFactor,
    absolute: bool,
    sizing: NodeSizing,
) -> NodeShift {
    let old = node.position;
    let (ref_position, ref_original, ref_size, absolute) = match reference {
        Some(r) => (r.position, r.original_position, r.size, absolute),
        None => (node.position, node.original_position, node.size, false),
    };

    if absolute {
        node.position = ref_position * factor.scale();
        node.original_position = ref_original * factor.scale();
    } else {
        node.position *= factor.relative_scale();
        node.original_position *= factor.relative_scale();
    }
    node.size = sizing.size_for(ref_size);

    NodeShift {
        attached: node.attached_part,
        old,
        new: node.position,
    }
}

fn adopt_variant_node(node: &mut AttachNode, variant_node: &AttachNode) -> NodeShift {
    let shift = NodeShift {
        attached: node.attached_part,
        old: node.position,
        new: variant_node.position,
    };
    node.position = variant_node.position;
    node.original_position = variant_node.original_position;
    node.size = variant_node.size;
    shift
}

fn scale_model(part: &mut Part, factor: &ScaleFactor) {
    let Some(local_scale) = part.model_scale.as_mut() else {
        error!("Model not found, can't resize part {}", part.prefab.name);
        return;
    };
    part.rescale_factor = part.prefab.rescale_factor * factor.scale();

    let Some(module) = part.scaling.as_mut() else {
        return;
    };
    if !module.state.has_pristine() {
        module.state.pristine_model_scale = *local_scale;
    }
    *local_scale = module.state.pristine_model_scale * factor.scale();
}

fn scale_variant_nodes(part: &mut Part, factor: &ScaleFactor, absolute: bool, sizing: NodeSizing) {
    let prefab = Arc::clone(&part.prefab);
    for (i, variant) in part.variants.iter_mut().enumerate() {
        let reference = prefab.variants.get(i);
        if reference.is_none() {
            warn!(
                "Variant {} of part {} has no template counterpart",
                variant.name, prefab.name
            );
        }
        for (j, node) in variant.attach_nodes.iter_mut().enumerate() {
            let base = reference.and_then(|v| v.attach_nodes.get(j));
            move_node(node, base, factor, absolute, sizing);
        }
        if let Some(node) = variant.srf_attach_node.as_mut() {
            let base = reference.and_then(|v| v.srf_attach_node.as_ref());
            move_node(node, base, factor, absolute, sizing);
        }
    }
}

fn scale_attach_nodes(
    part: &mut Part,
    factor: &ScaleFactor,
    absolute: bool,
    sizing: NodeSizing,
) -> Vec<NodeShift> {
    let Part {
        prefab,
        attach_nodes,
        srf_attach_node,
        variants,
        selected_variant,
        ..
    } = part;
    let selected = selected_variant.and_then(|i| variants.get(i));
    let mut shifts = Vec::new();

    for node in attach_nodes.iter_mut() {
        let variant_node = selected.and_then(|v| v.attach_nodes.iter().find(|n| n.id == node.id));
        if let Some(variant_node) = variant_node {
            shifts.push(adopt_variant_node(node, variant_node));
            continue;
        }

        let Some(reference) = prefab.attach_nodes.iter().rfind(|n| n.id == node.id) else {
            error!(
                "Error scaling {}, node {} not found on template or variant",
                prefab.name, node.id
            );
            continue;
        };
        shifts.push(move_node(node, Some(reference), factor, absolute, sizing));
    }

    if let Some(node) = srf_attach_node.as_mut() {
        match selected.and_then(|v| v.srf_attach_node.as_ref()) {
            Some(variant_node) => shifts.push(adopt_variant_node(node, variant_node)),
            None => shifts.push(move_node(
                node,
                prefab.srf_attach_node.as_ref(),
                factor,
                absolute,
                sizing,
            )),
        }
    }

    shifts
}

fn scale_drag_cubes(part: &mut Part, factor: &ScaleFactor, absolute: bool) {
    let f = if absolute {
        factor.scale()
    } else {
        factor.relative_scale()
    };
    if f == 1.0 {
        return;
    }
    if part.drag_cubes.cubes.is_empty() {
        warn!("Part {} has no drag cubes to rescale", part.prefab.name);
        return;
    }

    // Area samples follow the cubic factor.
    let area_factor = f * f * f;
    for cube in &mut part.drag_cubes.cubes {
        cube.size *= f;
        for area in &mut cube.area {
            *area *= area_factor;
        }
        for depth in &mut cube.depth {
            *depth *= f;
        }
    }
    part.drag_cubes.force_update();
}

/// Stateless service applying rescale operations to parts of a [`Ship`].
pub struct RescaleEngine {
    presets: Arc<PresetTable>,
    configs: Arc<ConfigCatalog>,
    tech: Arc<dyn TechGate + Send + Sync>,
}

impl std::fmt::Debug for RescaleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RescaleEngine")
            .field("presets", &self.presets.len())
            .field("configs", &self.configs.types().count())
            .finish()
    }
}

impl RescaleEngine {
    /// Engine over the given catalogs and research gate.
    pub fn new(
        presets: Arc<PresetTable>,
        configs: Arc<ConfigCatalog>,
        tech: Arc<dyn TechGate + Send + Sync>,
    ) -> Self {
        Self {
            presets,
            configs,
            tech,
        }
    }

    /// Stack preset catalog.
    pub fn presets(&self) -> &PresetTable {
        &self.presets
    }

    /// Scale type catalog.
    pub fn configs(&self) -> &ConfigCatalog {
        &self.configs
    }

    /// Load-time preparation of a part template.
    ///
    /// Fills in the dry cost and, for stack-attachable templates, the
    /// autodetected stack diameter.
    pub fn prepare_prefab(&self, prefab: &mut PartPrefab) {
        prefab.dry_cost = Some(derived::dry_cost(prefab));

        if !prefab.attach_rules.stack || !prefab.attach_rules.allow_stack {
            return;
        }
        if let Some(preset) = detect_stack_size(
            &self.presets,
            &prefab.name,
            &Vec3::zeros(),
            &prefab.colliders,
        ) {
            prefab.stack_size = preset.size;
        }
    }

    /// Create the scaling module of a freshly added part.
    ///
    /// Parts whose template declares no scale type get no module. A
    /// template declaring several, or one that is missing or invalid,
    /// gets a disabled module and a logged diagnostic.
    pub fn install_module(&self, ship: &mut Ship, id: PartId) -> Result<()> {
        let part = ship.part_mut(id)?;
        let declared = self.configs.modules_for(part.name());

        let module = match declared {
            [] => return Ok(()),
            [name] => match self.configs.get(name) {
                Ok(config) => {
                    let stack_size = config.stack_size.unwrap_or(part.prefab.stack_size);
                    ScaleModule::new(config, stack_size)
                }
                Err(e) => {
                    error!("Scaling disabled on part {}: {}", part.name(), e);
                    ScaleModule::disabled()
                }
            },
            many => {
                let e = ScaleError::DuplicateModule {
                    part: part.name().to_string(),
                    count: many.len(),
                };
                error!("{}; disabling scaling", e);
                ScaleModule::disabled()
            }
        };
        part.scaling = Some(module);
        Ok(())
    }

    /// Restore persisted state; call [`setup`](Self::setup) afterwards.
    pub fn load_state(&self, ship: &mut Ship, id: PartId, record: &Record) -> Result<()> {
        let module = enabled_module_mut(ship, id)?;
        module.state.apply_record(record)
    }

    /// Persisted state of a part.
    pub fn save_state(&self, ship: &Ship, id: PartId) -> Result<Record> {
        let part = ship.part(id)?;
        let module = part
            .scaling
            .as_ref()
            .ok_or_else(|| ScaleError::NoModule(part.name().to_string()))?;
        Ok(module.state.to_record())
    }

    /// Apply the stored scale from the pristine reference and build the
    /// editor controls. Runs once per part; later calls do nothing.
    pub fn setup(&self, ship: &mut Ship, id: PartId) -> Result<()> {
        let part = ship.part_mut(id)?;
        let Some(module) = part.scaling.as_mut() else {
            return Err(ScaleError::NoModule(part.name().to_string()));
        };
        if !module.is_enabled() || module.setup_run {
            return Ok(());
        }

        if !module.state.use_size_scale() && module.state.scale_mode == ScaleMode::StackPreset {
            module.state.scale_mode = ScaleMode::Free;
        }

        let state = module.state;
        if state.is_scaled() {
            let factor = ScaleFactor::absolute(state.scale);
            self.scale_part(ship, id, &factor, false, true)?;
            scale_drag_cubes(ship.part_mut(id)?, &factor, true);
        }

        let part = ship.part_mut(id)?;
        if let Some(module) = part.scaling.as_mut() {
            module.setup_run = true;
        }
        self.refresh(part);

        match state.scale_mode {
            ScaleMode::Disabled if state.is_scaled() => {
                self.change_scale(ship, id, 1.0)?;
            }
            ScaleMode::StackPreset => self.snap_to_preset(ship, id)?,
            _ => {}
        }
        Ok(())
    }

    /// Rescale a part to `new_scale` (absolute) from its current scale.
    ///
    /// Moves the model, attach nodes, attached neighbours and drag cubes
    /// by the relative change, then notifies the ship.
    pub fn change_scale(&self, ship: &mut Ship, id: PartId, new_scale: f64) -> Result<ScaleFactor> {
        if !(new_scale > 0.0) || !new_scale.is_finite() {
            return Err(ScaleError::InvalidScale(new_scale));
        }
        let module = enabled_module_mut(ship, id)?;
        let factor = ScaleFactor::between(module.state.scale, new_scale);
        module.state.scale = new_scale;

        self.scale_part(ship, id, &factor, true, false)?;

        let part = ship.part_mut(id)?;
        scale_drag_cubes(part, &factor, false);
        self.refresh(part);
        debug!(
            "Rescaled {} to {} (relative {})",
            part.name(),
            factor.scale(),
            factor.relative_scale()
        );

        ship.mark_modified();
        ship.notify_rescaled(&RescaleEvent {
            part: id,
            absolute: factor.linear(),
            relative: factor.relative_scale(),
        });
        Ok(factor)
    }

    /// Switch the scale mode as selected by the user.
    ///
    /// Disabled resets the scale to 1. StackPreset snaps to the nearest
    /// offered preset and is replaced by Free on parts without a stack size.
    pub fn change_scale_mode(&self, ship: &mut Ship, id: PartId, mode: ScaleMode) -> Result<()> {
        let module = enabled_module_mut(ship, id)?;
        let mode = if mode == ScaleMode::StackPreset && !module.state.use_size_scale() {
            warn!("Stack presets unavailable without a stack size; using free scaling");
            ScaleMode::Free
        } else {
            mode
        };
        module.state.scale_mode = mode;

        match mode {
            ScaleMode::Disabled => {
                self.change_scale(ship, id, 1.0)?;
            }
            ScaleMode::Free => self.refresh(ship.part_mut(id)?),
            ScaleMode::StackPreset => self.snap_to_preset(ship, id)?,
        }
        Ok(())
    }

    /// Free slider moved to `value` (percent, or metres for stack parts).
    ///
    /// Fails with [`ScaleError::WrongMode`] unless the module is in Free mode.
    pub fn set_free_value(&self, ship: &mut Ship, id: PartId, value: f64) -> Result<ScaleFactor> {
        let module = enabled_module_mut(ship, id)?;
        require_mode(module, ScaleMode::Free)?;
        let state = module.state;
        let slider = controls::slider(&state);
        let value = slider.clamp(value);
        let new_scale = if state.use_size_scale() {
            value / state.stack_size
        } else {
            value / 100.0
        };
        self.change_scale(ship, id, new_scale)
    }

    /// Entry `index` of the offered step list picked. Free mode only.
    pub fn select_step(&self, ship: &mut Ship, id: PartId, index: usize) -> Result<ScaleFactor> {
        let module = enabled_module_mut(ship, id)?;
        require_mode(module, ScaleMode::Free)?;
        let config = module
            .config
            .clone()
            .ok_or_else(|| ScaleError::ModuleDisabled(String::new()))?;
        let offered = controls::offered_steps(&config, self.tech.as_ref());
        let step = offered
            .get(index)
            .map(|&i| &config.steps[i])
            .ok_or(ScaleError::OptionOutOfRange {
                index,
                len: offered.len(),
            })?;

        let factor = self.change_scale(ship, id, step.factor)?;
        if config.chain_children {
            self.propagate_to_children(ship, id, factor.relative_scale())?;
        }
        Ok(factor)
    }

    /// Entry `index` of the offered preset list picked. StackPreset mode only.
    pub fn select_preset(&self, ship: &mut Ship, id: PartId, index: usize) -> Result<ScaleFactor> {
        let module = enabled_module_mut(ship, id)?;
        require_mode(module, ScaleMode::StackPreset)?;
        let state = module.state;
        let chain = module.config.as_ref().is_some_and(|c| c.chain_children);
        let offered = controls::presets(&state, &self.presets);
        let profile = offered
            .profiles
            .get(index)
            .ok_or(ScaleError::OptionOutOfRange {
                index,
                len: offered.len(),
            })?;
        let preset = self.presets.preset_for_key(profile)?;

        module.preset_index = Some(index);
        let factor = self.change_scale(ship, id, preset.size / state.stack_size)?;
        if chain {
            self.propagate_to_children(ship, id, factor.relative_scale())?;
        }
        Ok(factor)
    }

    /// Rescale every child carrying the same scale type by `relative`,
    /// recursing down the attachment tree.
    pub fn propagate_to_children(&self, ship: &mut Ship, id: PartId, relative: f64) -> Result<()> {
        let (children, type_name) = {
            let part = ship.part(id)?;
            let type_name = part
                .scaling
                .as_ref()
                .and_then(|m| m.config())
                .map(|c| c.name.clone());
            (part.children.clone(), type_name)
        };
        let Some(type_name) = type_name else {
            return Ok(());
        };

        for child in children {
            let child_scale = ship
                .part(child)?
                .scaling
                .as_ref()
                .filter(|m| m.config().is_some_and(|c| c.name == type_name))
                .map(|m| m.state.scale);
            if let Some(scale) = child_scale {
                self.change_scale(ship, child, scale * relative)?;
                self.propagate_to_children(ship, child, relative)?;
            }
        }
        Ok(())
    }

    fn snap_to_preset(&self, ship: &mut Ship, id: PartId) -> Result<()> {
        let module = enabled_module_mut(ship, id)?;
        let state = module.state;
        let offered = controls::presets(&state, &self.presets);

        let target = state.stack_size * state.scale;
        let index = self
            .presets
            .closest(target)
            .and_then(|closest| offered.profiles.iter().position(|p| *p == closest.profile))
            .or_else(|| self.nearest_offered(&offered.profiles, target));

        let Some(index) = index else {
            warn!("No stack presets in range; using free scaling");
            module.state.scale_mode = ScaleMode::Free;
            self.refresh(ship.part_mut(id)?);
            return Ok(());
        };

        let preset = self.presets.preset_for_key(&offered.profiles[index])?;
        let new_scale = preset.size / state.stack_size;
        module.preset_index = Some(index);
        if Tolerance::DEFAULT.scalars_equal(new_scale, state.scale) {
            self.refresh(ship.part_mut(id)?);
        } else {
            self.change_scale(ship, id, new_scale)?;
        }
        Ok(())
    }

    fn nearest_offered(&self, profiles: &[String], target: f64) -> Option<usize> {
        profiles
            .iter()
            .enumerate()
            .filter_map(|(i, p)| self.presets.preset_for_key(p).ok().map(|s| (i, s.size)))
            .min_by(|a, b| (a.1 - target).abs().total_cmp(&(b.1 - target).abs()))
            .map(|(i, _)| i)
    }

    /// Recompute the modifiers and controls of a part's module.
    fn refresh(&self, part: &mut Part) {
        let prefab_mass = part.prefab.mass;
        let dry_cost = part
            .prefab
            .dry_cost
            .unwrap_or_else(|| derived::dry_cost(&part.prefab));
        let Some(module) = part.scaling.as_mut() else {
            return;
        };
        let Some(config) = module.config.clone() else {
            return;
        };

        if module.state.scale_mode != ScaleMode::StackPreset {
            module.preset_index = None;
        }
        module.modifiers = Modifiers::at_scale(&config, module.state.scale, prefab_mass, dry_cost);
        module.controls = controls::build(
            &module.state,
            &config,
            &self.presets,
            self.tech.as_ref(),
            module.preset_index,
        );
    }

    fn node_sizing(&self, part: &Part) -> NodeSizing {
        let module = part.scaling.as_ref();
        let scale = module.map_or(1.0, |m| m.state.scale);
        let step_delta = module
            .and_then(|m| m.config())
            .filter(|c| c.is_discrete())
            .and_then(|c| c.node_size_delta(scale));
        NodeSizing { scale, step_delta }
    }

    /// Resize model and nodes, then move attached parts when `move_parts`.
    ///
    /// `absolute` recomputes nodes from the template; otherwise the
    /// relative change is applied to the current positions.
    fn scale_part(
        &self,
        ship: &mut Ship,
        id: PartId,
        factor: &ScaleFactor,
        move_parts: bool,
        absolute: bool,
    ) -> Result<()> {
        let part = ship.part_mut(id)?;
        let sizing = self.node_sizing(part);

        scale_model(part, factor);
        scale_variant_nodes(part, factor, absolute, sizing);
        let shifts = scale_attach_nodes(part, factor, absolute, sizing);

        if !move_parts {
            return Ok(());
        }
        for shift in shifts {
            move_attached_part(ship, id, factor, &shift)?;
        }
        move_surface_children(ship, id, factor)
    }
}

fn enabled_module_mut(ship: &mut Ship, id: PartId) -> Result<&mut ScaleModule> {
    let part = ship.part_mut(id)?;
    let name = part.name().to_string();
    match part.scaling.as_mut() {
        None => Err(ScaleError::NoModule(name)),
        Some(m) if !m.is_enabled() => Err(ScaleError::ModuleDisabled(name)),
        Some(m) => Ok(m),
    }
}

fn require_mode(module: &ScaleModule, expected: ScaleMode) -> Result<()> {
    let actual = module.state.scale_mode;
    if actual == expected {
        Ok(())
    } else {
        Err(ScaleError::WrongMode { expected, actual })
    }
}

/// Keep the part at a moved node attached.
///
/// A parent stays put and the part moves itself instead; any other
/// neighbour moves by the node delta plus the growth of its own offset.
fn move_attached_part(ship: &mut Ship, id: PartId, factor: &ScaleFactor, shift: &NodeShift) -> Result<()> {
    let Some(attached) = shift.attached else {
        return Ok(());
    };
    let delta = shift.new - shift.old;
    let parent = ship.part(id)?.parent;

    if parent == Some(attached) {
        return ship.translate(id, &-delta, id);
    }

    let Some(neighbour) = ship.get_mut(attached) else {
        warn!("Attached part of a moved node is not in the ship");
        return Ok(());
    };
    let offset = neighbour.att_pos * (factor.relative_scale() - 1.0);
    neighbour.att_pos *= factor.relative_scale();
    ship.translate(attached, &(delta + offset), id)
}

/// Move children surface-attached to the body of `id` in proportion to
/// their offset from its origin.
fn move_surface_children(ship: &mut Ship, id: PartId, factor: &ScaleFactor) -> Result<()> {
    let part = ship.part(id)?;
    let frame = part.placement;
    let mut moves = Vec::new();

    for &child_id in &part.children {
        let child = ship.part(child_id)?;
        let Some(srf) = child
            .srf_attach_node
            .as_ref()
            .filter(|n| n.attached_part == Some(id))
        else {
            continue;
        };

        let local_position = frame.to_local_point(&child.placement.position);
        let local_rotation = frame.to_local_rotation(&child.placement.rotation);
        let attached = local_position + local_rotation * srf.position;
        let target = attached * factor.relative_scale();
        moves.push((child_id, target - attached));
    }

    for (child_id, delta) in moves {
        ship.translate(child_id, &delta, id)?;
    }
    Ok(())
}
