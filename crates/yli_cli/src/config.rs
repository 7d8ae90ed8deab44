//! yli configuration file handling
//!
//! `yli.toml` seeds a universe before the console starts:
//! - `[universe]` - window, speed and background settings
//! - `[console]` - the console's name, geometry and prompt
//! - `[logging]` - default log level
//! - `[[variables]]` - extra variables, on the universe or a named entity
//! - `[[entities]]` - entities to create, in order
//!
//! Settings are written through the universe's own variables, so their
//! activation callbacks run exactly as if typed at the console.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use yli_core::{
    register_builtins, EntityId, EntityKind, EntityStruct, TypedValue, Universe, VariableStruct,
};

/// Looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "yli.toml";

/// Contents of yli.toml
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct YliConfig {
    #[serde(default)]
    pub universe: UniverseConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<VariableConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<EntityConfig>,
}

// =============================================================================
// [universe]
// =============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct UniverseConfig {
    #[serde(default = "default_width")]
    pub window_width: u32,
    #[serde(default = "default_height")]
    pub window_height: u32,
    #[serde(default = "default_width")]
    pub framebuffer_width: u32,
    #[serde(default = "default_height")]
    pub framebuffer_height: u32,
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default = "default_turbo_factor")]
    pub turbo_factor: f32,
    #[serde(default = "default_turbo_factor")]
    pub twin_turbo_factor: f32,
    #[serde(default = "default_mouse_speed")]
    pub mouse_speed: f32,
    /// RGBA
    #[serde(default = "default_background_color")]
    pub background_color: [f32; 4],
}

fn default_width() -> u32 {
    1600
}

fn default_height() -> u32 {
    900
}

fn default_speed() -> f32 {
    5.0
}

fn default_turbo_factor() -> f32 {
    100.0
}

fn default_mouse_speed() -> f32 {
    0.1
}

fn default_background_color() -> [f32; 4] {
    [0.0, 0.0, 1.0, 0.0]
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            window_width: default_width(),
            window_height: default_height(),
            framebuffer_width: default_width(),
            framebuffer_height: default_height(),
            speed: default_speed(),
            turbo_factor: default_turbo_factor(),
            twin_turbo_factor: default_turbo_factor(),
            mouse_speed: default_mouse_speed(),
            background_color: default_background_color(),
        }
    }
}

// =============================================================================
// [console] / [logging]
// =============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_console_name")]
    pub name: String,
    #[serde(default = "default_top_y")]
    pub top_y: u32,
    #[serde(default = "default_bottom_y")]
    pub bottom_y: u32,
    #[serde(default)]
    pub left_x: u32,
    #[serde(default = "default_right_x")]
    pub right_x: u32,
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

fn default_console_name() -> String {
    "console".to_string()
}

fn default_top_y() -> u32 {
    9
}

fn default_bottom_y() -> u32 {
    23
}

fn default_right_x() -> u32 {
    39
}

fn default_prompt() -> String {
    "$ ".to_string()
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            name: default_console_name(),
            top_y: default_top_y(),
            bottom_y: default_bottom_y(),
            left_x: 0,
            right_x: default_right_x(),
            prompt: default_prompt(),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `yli_core=debug`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

// =============================================================================
// [[variables]] / [[entities]]
// =============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct VariableConfig {
    pub name: String,
    /// Type tag such as `f32`, `bool`, `String` or `Vec<f32>`
    #[serde(rename = "type")]
    pub datatype: String,
    pub value: String,
    /// Global name of the owner; the universe when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct EntityConfig {
    /// Type tag such as `Scene` or `Object`
    pub kind: String,
    pub name: String,
    /// Global name of the parent; the universe when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Initial position of movable entities
    #[serde(default)]
    pub coordinates: [f32; 3],
}

// =============================================================================
// LOADING
// =============================================================================

impl YliConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load `path` if given, else `yli.toml` if present, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file {} does not exist", path.display());
                }
                Self::load(path)
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load(path)
                } else {
                    debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    // =========================================================================
    // APPLYING
    // =========================================================================

    /// Build a universe with an active console running the builtin commands
    pub fn build_universe(&self) -> Result<(Universe, EntityId)> {
        let mut universe = Universe::with_default_variables()?;
        self.apply_universe_settings(&mut universe)?;

        let console = universe
            .create_console(&EntityStruct::named(&self.console.name))
            .context("Failed to create console")?;
        universe.activate_entity(console)?;
        universe.set_console_prompt(console, &self.console.prompt);
        self.apply_console_settings(&mut universe)?;
        register_builtins(&mut universe, console)?;

        for entity in &self.entities {
            create_entity(&mut universe, entity)
                .with_context(|| format!("Failed to create entity `{}`", entity.name))?;
        }
        for variable in &self.variables {
            apply_variable(&mut universe, variable)
                .with_context(|| format!("Failed to set variable `{}`", variable.name))?;
        }

        info!(
            entities = universe.stats().entity_count,
            console = %self.console.name,
            "universe ready"
        );
        Ok((universe, console))
    }

    fn apply_universe_settings(&self, universe: &mut Universe) -> Result<()> {
        let settings = &self.universe;
        let [red, green, blue, alpha] = settings.background_color;
        let values: [(&str, TypedValue); 12] = [
            ("window_width", settings.window_width.into()),
            ("window_height", settings.window_height.into()),
            ("framebuffer_width", settings.framebuffer_width.into()),
            ("framebuffer_height", settings.framebuffer_height.into()),
            ("speed", settings.speed.into()),
            ("turbo_factor", settings.turbo_factor.into()),
            ("twin_turbo_factor", settings.twin_turbo_factor.into()),
            ("mouse_speed", settings.mouse_speed.into()),
            ("red", red.into()),
            ("green", green.into()),
            ("blue", blue.into()),
            ("alpha", alpha.into()),
        ];
        for (name, value) in values {
            set_universe_variable(universe, name, value)?;
        }
        Ok(())
    }

    fn apply_console_settings(&self, universe: &mut Universe) -> Result<()> {
        let console = &self.console;
        let values: [(&str, TypedValue); 4] = [
            ("console_top_y", console.top_y.into()),
            ("console_bottom_y", console.bottom_y.into()),
            ("console_left_x", console.left_x.into()),
            ("console_right_x", console.right_x.into()),
        ];
        for (name, value) in values {
            set_universe_variable(universe, name, value)?;
        }
        Ok(())
    }
}

fn set_universe_variable(universe: &mut Universe, name: &str, value: TypedValue) -> Result<()> {
    let variable = universe
        .get_variable(universe.root(), name)
        .with_context(|| format!("Universe has no `{name}` variable"))?;
    universe.set(variable, value)?;
    Ok(())
}

fn lookup(universe: &Universe, name: Option<&str>) -> Result<EntityId> {
    match name {
        Some(name) => universe
            .lookup(name)
            .with_context(|| format!("No entity named `{name}`")),
        None => Ok(universe.root()),
    }
}

fn create_entity(universe: &mut Universe, config: &EntityConfig) -> Result<EntityId> {
    let Some(kind) = EntityKind::from_tag(&config.kind) else {
        bail!("Unknown entity kind `{}`", config.kind);
    };
    let parent = lookup(universe, config.parent.as_deref())?;
    let spec = EntityStruct::child_of(parent, &config.name).with_global_name(&config.name);

    let id = match kind {
        EntityKind::Object => universe.create_object(&spec, config.coordinates)?,
        EntityKind::Holobiont => universe.create_holobiont(&spec, config.coordinates, &[])?,
        EntityKind::Species => universe.create_species(&spec, 0.0)?,
        _ => universe.create_entity(kind, &spec)?,
    };
    if universe.lookup(&config.name) != Some(id) {
        bail!("Name `{}` is invalid or already taken", config.name);
    }
    debug!(kind = kind.type_tag(), name = %config.name, "created entity");
    Ok(id)
}

/// Set an existing variable, or create it with its callback run once
fn apply_variable(universe: &mut Universe, config: &VariableConfig) -> Result<()> {
    let owner = lookup(universe, config.entity.as_deref())?;
    let Some(value) = TypedValue::from_type_and_str(&config.datatype, &config.value) else {
        bail!("Cannot parse `{}` as {}", config.value, config.datatype);
    };

    match universe.get_variable(owner, &config.name) {
        Some(variable) => {
            let stored = universe
                .stored_value(variable)
                .map_or("empty", TypedValue::get_datatype);
            if stored != value.get_datatype() {
                bail!(
                    "Variable `{}` holds {stored}, not {}",
                    config.name,
                    value.get_datatype()
                );
            }
            universe.set(variable, value)?;
        }
        None => {
            universe.create_variable(
                &VariableStruct::new(&config.name)
                    .with_parent(owner)
                    .activate_now(),
                value,
            )?;
        }
    }
    Ok(())
}
