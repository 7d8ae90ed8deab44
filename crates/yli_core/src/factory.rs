//! Entity factory
//!
//! Every entity is created through a `create_*` method on [`Universe`], which
//! binds the node, links it under its parent and applies the requested names.
//! A name that is invalid or already taken is logged and skipped; the entity
//! is still created and can be renamed later.

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::warn;

use crate::callbacks;
use crate::entity::{
    Biont, ConsoleData, EntityData, EntityId, EntityKind, EntityNode, HolobiontData, MovableData,
    SceneData, SpeciesData, VariableData,
};
use crate::error::{OntologyError, Result};
use crate::universe::Universe;
use crate::value::TypedValue;
use crate::variable::{ActivateCallback, ReadCallback, Variable};

/// Plain activation callback, as used by the built-in settings
type Activate = fn(&mut Universe, EntityId, Variable);

/// Where and under which names to create an entity
#[derive(Debug, Clone, Default)]
pub struct EntityStruct {
    /// Parent entity; the universe root when `None`
    pub parent: Option<EntityId>,
    pub local_name: String,
    pub global_name: String,
}

impl EntityStruct {
    /// Child of the root; its local and global name are the same
    pub fn named(name: &str) -> Self {
        Self {
            local_name: name.to_string(),
            ..Self::default()
        }
    }

    /// Child of `parent` with local name `name`
    pub fn child_of(parent: EntityId, name: &str) -> Self {
        Self {
            parent: Some(parent),
            local_name: name.to_string(),
            global_name: String::new(),
        }
    }

    pub fn with_global_name(mut self, name: &str) -> Self {
        self.global_name = name.to_string();
        self
    }
}

/// Where and how to create a variable
#[derive(Clone, Default)]
pub struct VariableStruct {
    /// Owning entity; the universe root when `None`
    pub parent: Option<EntityId>,
    pub local_name: String,
    pub global_name: String,
    pub activate_callback: Option<ActivateCallback>,
    pub read_callback: Option<ReadCallback>,
    /// Run the activation callback once right after creation
    pub should_call_activate_callback_now: bool,
}

impl VariableStruct {
    pub fn new(local_name: &str) -> Self {
        Self {
            local_name: local_name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_global_name(mut self, name: &str) -> Self {
        self.global_name = name.to_string();
        self
    }

    pub fn with_activate<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Universe, EntityId, Variable) + Send + Sync + 'static,
    {
        let callback: ActivateCallback = Arc::new(callback);
        self.activate_callback = Some(callback);
        self
    }

    pub fn with_read<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Universe, EntityId) -> Option<TypedValue> + Send + Sync + 'static,
    {
        let callback: ReadCallback = Arc::new(callback);
        self.read_callback = Some(callback);
        self
    }

    pub fn activate_now(mut self) -> Self {
        self.should_call_activate_callback_now = true;
        self
    }
}

impl Universe {
    /// Bind a node under `parent` and apply its names
    pub(crate) fn spawn(
        &mut self,
        kind: EntityKind,
        data: EntityData,
        parent: Option<EntityId>,
        local_name: &str,
        global_name: &str,
    ) -> Result<EntityId> {
        let parent = parent.unwrap_or(self.root());
        self.live_node(parent)?;

        let id = self.bind_to_universe(EntityNode::new(kind, Some(parent), data));
        let parent_node = self.node_mut(parent)?;
        if kind == EntityKind::Variable {
            parent_node.variable_children.push(id);
        } else {
            parent_node.children.push(id);
        }

        if !local_name.is_empty() {
            if let Err(error) = self.set_local_name(id, local_name) {
                warn!(%error, kind = kind.type_tag(), "local name not set");
            }
        }
        if !global_name.is_empty() {
            if let Err(error) = self.set_global_name(id, global_name) {
                warn!(%error, kind = kind.type_tag(), "global name not set");
            }
        }
        Ok(id)
    }

    /// Create an entity of any creatable kind with default state
    pub fn create_entity(&mut self, kind: EntityKind, spec: &EntityStruct) -> Result<EntityId> {
        match kind {
            EntityKind::Object | EntityKind::Text3d => self.create_movable(kind, spec, [0.0; 3]),
            EntityKind::Holobiont => self.create_holobiont(spec, [0.0; 3], &[]),
            EntityKind::Scene => self.create_scene(spec),
            EntityKind::Universe
            | EntityKind::Variable
            | EntityKind::LispFunction
            | EntityKind::LispFunctionOverload => Err(OntologyError::TypeMismatch {
                expected: "a creatable entity kind".to_string(),
                found: kind.type_tag().to_string(),
            }),
            _ => {
                let data = EntityData::default_for(kind).ok_or(OntologyError::TypeMismatch {
                    expected: "a creatable entity kind".to_string(),
                    found: kind.type_tag().to_string(),
                })?;
                self.spawn(kind, data, spec.parent, &spec.local_name, &spec.global_name)
            }
        }
    }

    pub fn create_ecosystem(&mut self, spec: &EntityStruct) -> Result<EntityId> {
        self.create_entity(EntityKind::Ecosystem, spec)
    }

    /// Create a scene with an `is_flight_mode_in_use` variable
    pub fn create_scene(&mut self, spec: &EntityStruct) -> Result<EntityId> {
        let id = self.spawn(
            EntityKind::Scene,
            EntityData::Scene(SceneData::default()),
            spec.parent,
            &spec.local_name,
            &spec.global_name,
        )?;
        self.create_variable(
            &VariableStruct::new("is_flight_mode_in_use")
                .with_parent(id)
                .with_activate(callbacks::activate_is_flight_mode_in_use)
                .with_read(callbacks::read_is_flight_mode_in_use),
            TypedValue::Bool(false),
        )?;
        Ok(id)
    }

    /// Create a species with a `planet_radius` variable
    pub fn create_species(&mut self, spec: &EntityStruct, planet_radius: f32) -> Result<EntityId> {
        let data = EntityData::Species(SpeciesData { planet_radius });
        let id = self.spawn(
            EntityKind::Species,
            data,
            spec.parent,
            &spec.local_name,
            &spec.global_name,
        )?;
        self.create_variable(
            &VariableStruct::new("planet_radius")
                .with_parent(id)
                .with_activate(callbacks::activate_planet_radius),
            TypedValue::Float32(planet_radius),
        )?;
        Ok(id)
    }

    pub fn create_object(
        &mut self,
        spec: &EntityStruct,
        coordinates: [f32; 3],
    ) -> Result<EntityId> {
        self.create_movable(EntityKind::Object, spec, coordinates)
    }

    /// Create a holobiont whose bionts sit at the given offsets from it
    pub fn create_holobiont(
        &mut self,
        spec: &EntityStruct,
        coordinates: [f32; 3],
        biont_offsets: &[[f32; 3]],
    ) -> Result<EntityId> {
        let movable = MovableData {
            coordinates: self.vectors.insert(&coordinates),
            speed: 0.0,
        };
        let bionts: SmallVec<[Biont; 4]> = biont_offsets
            .iter()
            .map(|offset| Biont {
                offset: *offset,
                coordinates: self.vectors.insert(&[
                    coordinates[0] + offset[0],
                    coordinates[1] + offset[1],
                    coordinates[2] + offset[2],
                ]),
            })
            .collect();
        let data = EntityData::Holobiont(HolobiontData { movable, bionts });

        self.spawn_movable(EntityKind::Holobiont, data, spec)
    }

    /// Create a console with the default geometry and empty buffers
    pub fn create_console(&mut self, spec: &EntityStruct) -> Result<EntityId> {
        let data = EntityData::Console(ConsoleData::default());
        self.spawn(
            EntityKind::Console,
            data,
            spec.parent,
            &spec.local_name,
            &spec.global_name,
        )
    }

    fn create_movable(
        &mut self,
        kind: EntityKind,
        spec: &EntityStruct,
        coordinates: [f32; 3],
    ) -> Result<EntityId> {
        let movable = MovableData {
            coordinates: self.vectors.insert(&coordinates),
            speed: 0.0,
        };
        self.spawn_movable(kind, EntityData::Movable(movable), spec)
    }

    /// Spawn a movable and give it `x`, `y`, `z`, `cartesian_coordinates` and
    /// `speed` variables
    fn spawn_movable(
        &mut self,
        kind: EntityKind,
        data: EntityData,
        spec: &EntityStruct,
    ) -> Result<EntityId> {
        let vectors = data.owned_vectors();
        let id = match self.spawn(kind, data, spec.parent, &spec.local_name, &spec.global_name) {
            Ok(id) => id,
            Err(error) => {
                for vector in vectors {
                    self.vectors.remove(vector);
                }
                return Err(error);
            }
        };

        let movable = *self
            .node(id)?
            .data
            .as_movable()
            .ok_or(OntologyError::NotFound("movable data".to_string()))?;
        let [x, y, z] = self.vectors.get3(movable.coordinates)?;

        self.create_variable(
            &VariableStruct::new("x")
                .with_parent(id)
                .with_activate(callbacks::activate_x)
                .with_read(callbacks::read_x),
            TypedValue::Float32(x),
        )?;
        self.create_variable(
            &VariableStruct::new("y")
                .with_parent(id)
                .with_activate(callbacks::activate_y)
                .with_read(callbacks::read_y),
            TypedValue::Float32(y),
        )?;
        self.create_variable(
            &VariableStruct::new("z")
                .with_parent(id)
                .with_activate(callbacks::activate_z)
                .with_read(callbacks::read_z),
            TypedValue::Float32(z),
        )?;
        self.create_variable(
            &VariableStruct::new("cartesian_coordinates")
                .with_parent(id)
                .with_activate(callbacks::activate_cartesian_coordinates)
                .with_read(callbacks::read_cartesian_coordinates),
            TypedValue::Vec3Mut(movable.coordinates),
        )?;
        self.create_variable(
            &VariableStruct::new("speed")
                .with_parent(id)
                .with_activate(callbacks::activate_speed),
            TypedValue::Float32(movable.speed),
        )?;
        Ok(id)
    }

    /// Create a variable owned by `spec.parent`, holding `value` as given
    pub fn create_variable(
        &mut self,
        spec: &VariableStruct,
        value: TypedValue,
    ) -> Result<Variable> {
        let data = EntityData::Variable(VariableData {
            value,
            owned_vector: None,
            activate: spec.activate_callback.clone(),
            read: spec.read_callback.clone(),
        });
        let id = self.spawn(
            EntityKind::Variable,
            data,
            spec.parent,
            &spec.local_name,
            &spec.global_name,
        )?;

        let variable = Variable::from_id(id);
        if spec.should_call_activate_callback_now {
            self.activate_variable(variable);
        }
        Ok(variable)
    }

    /// Install the universe-level settings as variables of the root
    pub fn create_default_variables(&mut self) -> Result<()> {
        let state = self.state.clone();
        let camera = self.camera();
        let [x, y, z] = self.camera_coordinates();
        let console = ConsoleData::default();
        let [red, green, blue, alpha] = state.background_color;

        let settings: [(&str, TypedValue, Activate); 17] = [
            ("speed", state.speed.into(), callbacks::activate_speed),
            ("turbo_factor", state.turbo_factor.into(), callbacks::activate_turbo_factor),
            (
                "twin_turbo_factor",
                state.twin_turbo_factor.into(),
                callbacks::activate_twin_turbo_factor,
            ),
            ("mouse_speed", state.mouse_speed.into(), callbacks::activate_mouse_speed),
            ("window_width", state.window_width.into(), callbacks::activate_window_width),
            ("window_height", state.window_height.into(), callbacks::activate_window_height),
            (
                "framebuffer_width",
                state.framebuffer_width.into(),
                callbacks::activate_framebuffer_width,
            ),
            (
                "framebuffer_height",
                state.framebuffer_height.into(),
                callbacks::activate_framebuffer_height,
            ),
            ("red", red.into(), callbacks::activate_background_color),
            ("green", green.into(), callbacks::activate_background_color),
            ("blue", blue.into(), callbacks::activate_background_color),
            ("alpha", alpha.into(), callbacks::activate_background_color),
            ("wireframe", state.wireframe.into(), callbacks::activate_wireframe),
            ("console_top_y", console.top_y.into(), callbacks::activate_console_top_y),
            ("console_bottom_y", console.bottom_y.into(), callbacks::activate_console_bottom_y),
            ("console_left_x", console.left_x.into(), callbacks::activate_console_left_x),
            ("console_right_x", console.right_x.into(), callbacks::activate_console_right_x),
        ];

        for (name, value, activate) in settings {
            self.create_variable(&VariableStruct::new(name).with_activate(activate), value)?;
        }

        self.create_variable(
            &VariableStruct::new("x")
                .with_activate(callbacks::activate_x)
                .with_read(callbacks::read_x),
            TypedValue::Float32(x),
        )?;
        self.create_variable(
            &VariableStruct::new("y")
                .with_activate(callbacks::activate_y)
                .with_read(callbacks::read_y),
            TypedValue::Float32(y),
        )?;
        self.create_variable(
            &VariableStruct::new("z")
                .with_activate(callbacks::activate_z)
                .with_read(callbacks::read_z),
            TypedValue::Float32(z),
        )?;
        self.create_variable(
            &VariableStruct::new("cartesian_coordinates")
                .with_activate(callbacks::activate_cartesian_coordinates)
                .with_read(callbacks::read_cartesian_coordinates),
            TypedValue::Vec3Mut(camera),
        )?;
        Ok(())
    }
}
