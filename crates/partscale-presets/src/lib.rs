#![warn(missing_docs)]

//! Stack preset catalog for the partscale engine.
//!
//! Standard cylindrical connector diameters, sorted ascending, with
//! midpoint buckets for nearest-match queries, plus autodetection of a
//! part template's native stack diameter from its colliders.
//!
//! # Example
//!
//! ```
//! use partscale_presets::build_catalog;
//!
//! let table = build_catalog();
//! assert_eq!(table.closest(1.3).unwrap().size, 1.25);
//!
//! let selection = table.presets_in_range(0.625, 2.5, 1.25);
//! assert_eq!(selection.titles[selection.selected], "1.25m");
//! ```

pub mod detect;
pub mod error;
pub mod table;

pub use detect::{classify, detect_stack_size, ColliderBounds, Footprint, PHYSICAL_LAYER};
pub use error::{PresetError, Result};
pub use table::{build_catalog, PresetSelection, PresetTable, StackPreset};
