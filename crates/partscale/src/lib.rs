#![warn(missing_docs)]

//! Part rescaling for construction games.
//!
//! The engine resizes a part's model, attach nodes and drag cubes, keeps
//! attached neighbours joined, and derives mass and cost modifiers. Parts
//! live in a [`Ship`]; a [`RescaleEngine`] applies operations to them.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use partscale::{
//!     AlwaysUnlocked, ConfigCatalog, Part, PartPrefab, RescaleEngine, ScaleConfig, Ship,
//! };
//! use partscale_math::Vec3;
//! use partscale_presets::build_catalog;
//!
//! let mut configs = ConfigCatalog::new();
//! configs.insert(ScaleConfig::free("stack")).unwrap();
//! configs.declare("tank", vec!["stack".into()]);
//!
//! let engine = RescaleEngine::new(
//!     Arc::new(build_catalog()),
//!     Arc::new(configs),
//!     Arc::new(AlwaysUnlocked),
//! );
//!
//! let prefab = PartPrefab::new("tank").with_node("top", Vec3::new(0.0, 1.0, 0.0), 1);
//! let mut ship = Ship::new();
//! let id = ship.add_part(Part::from_prefab(Arc::new(prefab)));
//! engine.install_module(&mut ship, id).unwrap();
//! engine.setup(&mut ship, id).unwrap();
//!
//! engine.change_scale(&mut ship, id, 2.0).unwrap();
//! let part = ship.part(id).unwrap();
//! assert_eq!(part.node("top").unwrap().position, Vec3::new(0.0, 2.0, 0.0));
//! ```

pub mod config;
pub mod controls;
pub mod derived;
pub mod engine;
pub mod error;
pub mod factor;
pub mod part;
pub mod ship;
pub mod state;
pub mod tech;

pub use config::{ConfigCatalog, ScaleConfig, ScaleStep};
pub use controls::{ScaleControls, ScaleInput, SliderControl, SliderUnit, StepControl};
pub use derived::Modifiers;
pub use engine::{scaled_node_size, RescaleEngine, ScaleModule};
pub use error::{Result, ScaleError};
pub use factor::ScaleFactor;
pub use part::{
    AttachNode, AttachRules, DragCube, DragCubeList, Part, PartPrefab, PartVariant,
    ResourceCapacity,
};
pub use ship::{PartId, RescaleEvent, RescaleListener, Ship};
pub use state::{PartScaleState, Record, ScaleMode};
pub use tech::{AlwaysUnlocked, GameMode, ResearchState, TechGate};
