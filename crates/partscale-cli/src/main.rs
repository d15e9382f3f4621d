//! partscale CLI - inspect presets and scale types, rescale parts of a craft
//!
//! # Usage
//!
//! ```bash
//! # List the stack preset catalog
//! partscale presets
//!
//! # Classify a part template's stack diameter
//! partscale detect tank.json
//!
//! # Validate a scale type catalog
//! partscale check-config scale_types.toml
//!
//! # Rescale part 0 of a craft to 150% and print the result
//! partscale rescale craft.json --config scale_types.toml --part 0 --scale 1.5
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use partscale::{
    AlwaysUnlocked, ConfigCatalog, GameMode, Part, PartId, PartPrefab, Record, RescaleEngine,
    RescaleEvent, RescaleListener, ResearchState, ScaleMode, Ship, TechGate,
};
use partscale_math::{Placement, Vec3};
use partscale_presets::{build_catalog, detect_stack_size, PresetTable};
use serde::{Deserialize, Serialize};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "partscale")]
#[command(version, about = "Rescale construction-game parts", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the stack preset catalog
    Presets,
    /// Autodetect the stack diameter of a part template (.json)
    Detect {
        /// Part template file
        prefab: PathBuf,
    },
    /// Validate a scale type catalog (.toml)
    CheckConfig {
        /// Catalog file
        config: PathBuf,
    },
    /// Rescale one part of a craft and print the resulting craft state
    Rescale {
        /// Craft file (.json)
        craft: PathBuf,
        /// Scale type catalog (.toml)
        #[arg(short, long)]
        config: PathBuf,
        /// Index of the part to rescale
        #[arg(short, long)]
        part: usize,
        /// New absolute scale
        #[arg(short, long)]
        scale: f64,
        /// Unlocked research items; gates discrete steps when given
        #[arg(long, value_delimiter = ',')]
        tech: Option<Vec<String>>,
    },
}

/// A part of a craft file.
#[derive(Debug, Deserialize)]
struct CraftPart {
    /// Template name.
    prefab: String,
    #[serde(default)]
    position: Option<Vec3>,
    /// Index of the parent part.
    #[serde(default)]
    parent: Option<usize>,
    /// Node on this part joined to the parent; surface attachment if absent.
    #[serde(default)]
    node: Option<String>,
    /// Node on the parent.
    #[serde(default)]
    parent_node: Option<String>,
    #[serde(default)]
    att_pos: Option<Vec3>,
    /// Persisted scale state.
    #[serde(default)]
    state: Record,
}

#[derive(Debug, Deserialize)]
struct CraftFile {
    prefabs: Vec<PartPrefab>,
    parts: Vec<CraftPart>,
}

#[derive(Debug, Serialize)]
struct PartReport {
    index: usize,
    name: String,
    position: Vec3,
    mode: Option<ScaleMode>,
    scale: Option<f64>,
    mass_modifier: f64,
    cost_modifier: f64,
    nodes: Vec<(String, Vec3, i32)>,
}

struct LogListener;

impl RescaleListener for LogListener {
    fn on_rescaled(&mut self, event: &RescaleEvent) {
        info!(
            "Part {:?} rescaled to {} (x{})",
            event.part, event.absolute, event.relative
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Presets => list_presets(&build_catalog()),
        Commands::Detect { prefab } => detect(&prefab),
        Commands::CheckConfig { config } => check_config(&config),
        Commands::Rescale {
            craft,
            config,
            part,
            scale,
            tech,
        } => rescale(&craft, &config, part, scale, tech),
    }
}

fn list_presets(table: &PresetTable) -> Result<()> {
    println!("{:<10} {:>8} {:>10} {:>6}", "title", "profile", "from", "auto");
    for preset in table {
        println!(
            "{:<10} {:>8} {:>10.5} {:>6}",
            preset.title, preset.profile, preset.min_size, preset.is_auto_profile
        );
    }
    Ok(())
}

fn read_prefab(path: &Path) -> Result<PartPrefab> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(PartPrefab::from_json(&json)?)
}

fn detect(path: &Path) -> Result<()> {
    let prefab = read_prefab(path)?;
    let table = build_catalog();
    match detect_stack_size(&table, &prefab.name, &Vec3::zeros(), &prefab.colliders) {
        Some(preset) => println!("{}: {}", prefab.name, preset),
        None => println!("{}: not a stack part", prefab.name),
    }
    Ok(())
}

fn check_config(path: &Path) -> Result<()> {
    let catalog = ConfigCatalog::load(path)
        .with_context(|| format!("loading {}", path.display()))?;

    let mut types: Vec<_> = catalog.types().collect();
    types.sort_by(|a, b| a.name.cmp(&b.name));
    for config in types {
        let kind = if config.is_discrete() {
            format!("{} steps", config.steps.len())
        } else {
            "free".to_string()
        };
        println!(
            "ok       {:<16} {:>6.3}..{:<6.3} {}",
            config.name, config.min_scale, config.max_scale, kind
        );
    }

    let mut rejected: Vec<_> = catalog.rejected().collect();
    rejected.sort();
    for (name, reason) in &rejected {
        println!("rejected {:<16} {}", name, reason);
    }
    if !rejected.is_empty() {
        bail!("{} invalid scale type(s)", rejected.len());
    }
    Ok(())
}

fn rescale(
    craft_path: &Path,
    config_path: &Path,
    index: usize,
    scale: f64,
    tech: Option<Vec<String>>,
) -> Result<()> {
    let configs = ConfigCatalog::load(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let json = std::fs::read_to_string(craft_path)
        .with_context(|| format!("reading {}", craft_path.display()))?;
    let craft: CraftFile = serde_json::from_str(&json)?;

    let gate: Arc<dyn TechGate + Send + Sync> = match tech {
        Some(unlocked) => Arc::new(ResearchState::new(GameMode::Career, unlocked)),
        None => Arc::new(AlwaysUnlocked),
    };
    let engine = RescaleEngine::new(Arc::new(build_catalog()), Arc::new(configs), gate);

    let mut ship = Ship::new();
    ship.subscribe(Box::new(LogListener));
    let ids = build_ship(&engine, &mut ship, craft)?;

    let id = *ids
        .get(index)
        .with_context(|| format!("craft has {} parts, no part {}", ids.len(), index))?;
    engine.change_scale(&mut ship, id, scale)?;

    let report: Vec<PartReport> = ids
        .iter()
        .enumerate()
        .map(|(i, &id)| report(&ship, i, id))
        .collect::<Result<_>>()?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn build_ship(engine: &RescaleEngine, ship: &mut Ship, craft: CraftFile) -> Result<Vec<PartId>> {
    let mut prefabs = HashMap::new();
    for mut prefab in craft.prefabs {
        engine.prepare_prefab(&mut prefab);
        prefabs.insert(prefab.name.clone(), Arc::new(prefab));
    }

    let mut ids = Vec::with_capacity(craft.parts.len());
    for entry in &craft.parts {
        let prefab = prefabs
            .get(&entry.prefab)
            .with_context(|| format!("unknown part template {}", entry.prefab))?;
        let mut part = Part::from_prefab(Arc::clone(prefab))
            .placed(Placement::at(entry.position.unwrap_or_else(Vec3::zeros)));
        part.att_pos = entry.att_pos.unwrap_or_else(Vec3::zeros);
        let id = ship.add_part(part);
        engine.install_module(ship, id)?;
        ids.push(id);
    }

    for (entry, &id) in craft.parts.iter().zip(&ids) {
        let Some(parent) = entry.parent else { continue };
        let parent_id = *ids
            .get(parent)
            .with_context(|| format!("parent index {} out of range", parent))?;
        match (&entry.node, &entry.parent_node) {
            (Some(node), Some(parent_node)) => {
                ship.attach_to_node(id, node, parent_id, parent_node)?
            }
            (None, None) => ship.attach_to_surface(id, parent_id)?,
            _ => bail!("node and parent_node must be given together"),
        }
    }

    for (entry, &id) in craft.parts.iter().zip(&ids) {
        let enabled = ship
            .part(id)?
            .scaling
            .as_ref()
            .is_some_and(|m| m.is_enabled());
        if !enabled {
            continue;
        }
        engine.load_state(ship, id, &entry.state)?;
        engine.setup(ship, id)?;
    }
    Ok(ids)
}

fn report(ship: &Ship, index: usize, id: PartId) -> Result<PartReport> {
    let part = ship.part(id)?;
    let module = part.scaling.as_ref().filter(|m| m.is_enabled());
    Ok(PartReport {
        index,
        name: part.name().to_string(),
        position: part.placement.position,
        mode: module.map(|m| m.state.scale_mode),
        scale: module.map(|m| m.state.scale),
        mass_modifier: module.map_or(0.0, |m| m.mass_modifier()),
        cost_modifier: module.map_or(0.0, |m| m.cost_modifier()),
        nodes: part
            .attach_nodes
            .iter()
            .map(|n| (n.id.clone(), n.position, n.size))
            .collect(),
    })
}
