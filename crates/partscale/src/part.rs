//! Part templates and part instances as seen by the rescale engine.
//!
//! A [`PartPrefab`] is the unscaled, as-designed template and serves as
//! the reference for absolute rescaling. A [`Part`] is one instance in a
//! [`Ship`](crate::Ship); the engine mutates its fields in place.

use std::sync::Arc;

use partscale_math::{Placement, Vec3};
use partscale_presets::ColliderBounds;
use serde::{Deserialize, Serialize};

use crate::engine::ScaleModule;
use crate::ship::PartId;

/// Number of faces sampled by a drag cube.
pub const DRAG_CUBE_FACES: usize = 6;

fn one() -> f64 {
    1.0
}

/// A named connection point where another part may be joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachNode {
    /// Stable node id (e.g. `"top"`, `"bottom"`).
    pub id: String,
    /// Current position in part-local coordinates.
    pub position: Vec3,
    /// Position as declared, scaled along with `position`.
    pub original_position: Vec3,
    /// Connector size class.
    #[serde(default)]
    pub size: i32,
    /// Part joined at this node.
    #[serde(skip)]
    pub attached_part: Option<PartId>,
}

impl AttachNode {
    /// Unattached node with matching current and original positions.
    pub fn new(id: impl Into<String>, position: Vec3, size: i32) -> Self {
        Self {
            id: id.into(),
            position,
            original_position: position,
            size,
            attached_part: None,
        }
    }
}

/// Directional aerodynamic drag samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragCube {
    /// Cube name (usually the variant or deployment state it belongs to).
    #[serde(default)]
    pub name: String,
    /// Blend weight.
    #[serde(default = "one")]
    pub weight: f64,
    /// Bounding size.
    pub size: Vec3,
    /// Per-face area samples.
    pub area: [f64; DRAG_CUBE_FACES],
    /// Per-face depth samples.
    pub depth: [f64; DRAG_CUBE_FACES],
}

impl DragCube {
    /// Cube with unit weight.
    pub fn new(
        name: impl Into<String>,
        size: Vec3,
        area: [f64; DRAG_CUBE_FACES],
        depth: [f64; DRAG_CUBE_FACES],
    ) -> Self {
        Self {
            name: name.into(),
            weight: 1.0,
            size,
            area,
            depth,
        }
    }
}

/// Weighted blend of all drag cubes of a part.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragSummary {
    /// Blended per-face area.
    pub area: [f64; DRAG_CUBE_FACES],
    /// Blended per-face depth.
    pub depth: [f64; DRAG_CUBE_FACES],
    /// Blended size.
    pub size: Vec3,
}

/// The drag cubes of a part plus their cached blend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DragCubeList {
    /// Sample cubes.
    pub cubes: Vec<DragCube>,
    summary: DragSummary,
}

impl DragCubeList {
    /// Wrap `cubes` and compute the blend.
    pub fn new(cubes: Vec<DragCube>) -> Self {
        let mut list = Self {
            cubes,
            summary: DragSummary::default(),
        };
        list.force_update();
        list
    }

    /// Cached blend, valid as of the last [`force_update`](Self::force_update).
    pub fn summary(&self) -> &DragSummary {
        &self.summary
    }

    /// Recompute the cached blend from the cubes.
    pub fn force_update(&mut self) {
        let mut summary = DragSummary::default();
        let total: f64 = self.cubes.iter().map(|c| c.weight).sum();
        if self.cubes.is_empty() {
            self.summary = summary;
            return;
        }

        let uniform = 1.0 / self.cubes.len() as f64;
        for cube in &self.cubes {
            let w = if total > 0.0 { cube.weight / total } else { uniform };
            for i in 0..DRAG_CUBE_FACES {
                summary.area[i] += cube.area[i] * w;
                summary.depth[i] += cube.depth[i] * w;
            }
            summary.size += cube.size * w;
        }
        self.summary = summary;
    }
}

/// An alternate geometry configuration with its own attach nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartVariant {
    /// Variant name.
    pub name: String,
    /// Attach nodes overriding the base nodes with matching ids.
    #[serde(default)]
    pub attach_nodes: Vec<AttachNode>,
    /// Surface attach node override.
    #[serde(default)]
    pub srf_attach_node: Option<AttachNode>,
}

/// Which kinds of attachment a part template accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachRules {
    /// Has stack nodes.
    #[serde(default)]
    pub stack: bool,
    /// Stack attachment allowed.
    #[serde(default)]
    pub allow_stack: bool,
}

impl AttachRules {
    /// Stack-attachable template.
    pub fn stackable() -> Self {
        Self {
            stack: true,
            allow_stack: true,
        }
    }
}

/// Resource storage of a part template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceCapacity {
    /// Resource name.
    pub name: String,
    /// Capacity.
    pub max_amount: f64,
    /// Cost per unit.
    pub unit_cost: f64,
}

/// Unscaled part template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartPrefab {
    /// Template name.
    pub name: String,
    /// Base external scale multiplier.
    #[serde(default = "one")]
    pub rescale_factor: f64,
    /// Local scale of the model transform; `None` if the model is missing.
    #[serde(default)]
    pub model_scale: Option<Vec3>,
    /// Stack attach nodes.
    #[serde(default)]
    pub attach_nodes: Vec<AttachNode>,
    /// Surface attach node.
    #[serde(default)]
    pub srf_attach_node: Option<AttachNode>,
    /// Geometry variants.
    #[serde(default)]
    pub variants: Vec<PartVariant>,
    /// Drag cubes.
    #[serde(default)]
    pub drag_cubes: Vec<DragCube>,
    /// Collider bounds in part-local space.
    #[serde(default)]
    pub colliders: Vec<ColliderBounds>,
    /// Attachment rules.
    #[serde(default)]
    pub attach_rules: AttachRules,
    /// Dry mass.
    #[serde(default)]
    pub mass: f64,
    /// Total cost including full resources.
    #[serde(default)]
    pub cost: f64,
    /// Resource capacities.
    #[serde(default)]
    pub resources: Vec<ResourceCapacity>,
    /// Native stack diameter, 0 when not stack-attachable.
    #[serde(default)]
    pub stack_size: f64,
    /// Cost without resources, filled in at load time.
    #[serde(default)]
    pub dry_cost: Option<f64>,
}

impl PartPrefab {
    /// Empty template with a unit model and no nodes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rescale_factor: 1.0,
            model_scale: Some(Vec3::new(1.0, 1.0, 1.0)),
            attach_nodes: Vec::new(),
            srf_attach_node: None,
            variants: Vec::new(),
            drag_cubes: Vec::new(),
            colliders: Vec::new(),
            attach_rules: AttachRules::default(),
            mass: 0.0,
            cost: 0.0,
            resources: Vec::new(),
            stack_size: 0.0,
            dry_cost: None,
        }
    }

    /// Add a stack attach node.
    pub fn with_node(mut self, id: impl Into<String>, position: Vec3, size: i32) -> Self {
        self.attach_nodes.push(AttachNode::new(id, position, size));
        self
    }

    /// Set the surface attach node.
    pub fn with_srf_node(mut self, position: Vec3, size: i32) -> Self {
        self.srf_attach_node = Some(AttachNode::new("srfAttach", position, size));
        self
    }

    /// Parse a template from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the template to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// One part instance in a ship.
#[derive(Debug, Clone)]
pub struct Part {
    /// Unscaled template this part was built from.
    pub prefab: Arc<PartPrefab>,
    /// Position and orientation in the ship frame.
    pub placement: Placement,
    /// External scale multiplier.
    pub rescale_factor: f64,
    /// Local scale of the model transform; `None` if the model is missing.
    pub model_scale: Option<Vec3>,
    /// Stack attach nodes.
    pub attach_nodes: Vec<AttachNode>,
    /// Surface attach node.
    pub srf_attach_node: Option<AttachNode>,
    /// Geometry variants, parallel to the template's.
    pub variants: Vec<PartVariant>,
    /// Index of the selected variant.
    pub selected_variant: Option<usize>,
    /// Structural parent.
    pub parent: Option<PartId>,
    /// Structural children.
    pub children: Vec<PartId>,
    /// Offset from the attach position, set by the offset gizmo.
    pub att_pos: Vec3,
    /// Drag cubes.
    pub drag_cubes: DragCubeList,
    /// Scaling module, if the template declares one.
    pub scaling: Option<ScaleModule>,
}

impl Part {
    /// Fresh, unscaled instance of `prefab`.
    pub fn from_prefab(prefab: Arc<PartPrefab>) -> Self {
        Self {
            placement: Placement::identity(),
            rescale_factor: prefab.rescale_factor,
            model_scale: prefab.model_scale,
            attach_nodes: prefab.attach_nodes.clone(),
            srf_attach_node: prefab.srf_attach_node.clone(),
            variants: prefab.variants.clone(),
            selected_variant: None,
            parent: None,
            children: Vec::new(),
            att_pos: Vec3::zeros(),
            drag_cubes: DragCubeList::new(prefab.drag_cubes.clone()),
            scaling: None,
            prefab,
        }
    }

    /// Same part placed at `placement`.
    pub fn placed(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Template name.
    pub fn name(&self) -> &str {
        &self.prefab.name
    }

    /// Currently selected variant.
    pub fn selected_variant(&self) -> Option<&PartVariant> {
        self.selected_variant.and_then(|i| self.variants.get(i))
    }

    /// Stack node by id.
    pub fn node(&self, id: &str) -> Option<&AttachNode> {
        self.attach_nodes.iter().find(|n| n.id == id)
    }

    /// Mutable stack node by id.
    pub fn node_mut(&mut self, id: &str) -> Option<&mut AttachNode> {
        self.attach_nodes.iter_mut().find(|n| n.id == id)
    }
}
