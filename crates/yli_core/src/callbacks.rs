//! Built-in activation and read callbacks
//!
//! These connect the standard settings (coordinates, speed, window size,
//! background colour, console geometry, ...) to the state they control. Each
//! callback branches on the kind of the owning entity and does nothing when
//! the owner or the stored value has an unexpected type.

use tracing::warn;

use crate::entity::{EntityData, EntityId};
use crate::universe::Universe;
use crate::value::TypedValue;
use crate::variable::Variable;
use crate::vector::VectorId;

fn stored_f32(universe: &Universe, variable: Variable) -> Option<f32> {
    universe.stored_value(variable)?.as_f32()
}

fn stored_u32(universe: &Universe, variable: Variable) -> Option<u32> {
    universe.stored_value(variable)?.as_u32()
}

fn stored_bool(universe: &Universe, variable: Variable) -> Option<bool> {
    universe.stored_value(variable)?.as_bool()
}

// =============================================================================
// COORDINATES
// =============================================================================

/// Movable coordinates, or the camera for the universe
fn coordinate_target(universe: &Universe, owner: EntityId) -> Option<VectorId> {
    match universe.entity(owner)?.data() {
        EntityData::Universe => Some(universe.camera()),
        data => data.as_movable().map(|movable| movable.coordinates),
    }
}

fn follow_bionts(universe: &mut Universe, owner: EntityId) {
    if let Err(error) = universe.update_bionts(owner) {
        warn!(%error, "failed to update bionts");
    }
}

fn activate_axis(universe: &mut Universe, owner: EntityId, variable: Variable, axis: usize) {
    let (Some(value), Some(target)) = (
        stored_f32(universe, variable),
        coordinate_target(universe, owner),
    ) else {
        return;
    };
    if let Err(error) = universe.vectors_mut().set_component(target, axis, value) {
        warn!(%error, axis, "failed to write coordinate");
        return;
    }
    follow_bionts(universe, owner);
}

fn read_axis(universe: &Universe, owner: EntityId, axis: usize) -> Option<TypedValue> {
    let target = coordinate_target(universe, owner)?;
    let component = universe.vectors().get(target).ok()?.get(axis)?;
    Some(TypedValue::Float32(*component))
}

pub fn activate_x(universe: &mut Universe, owner: EntityId, variable: Variable) {
    activate_axis(universe, owner, variable, 0);
}

pub fn activate_y(universe: &mut Universe, owner: EntityId, variable: Variable) {
    activate_axis(universe, owner, variable, 1);
}

pub fn activate_z(universe: &mut Universe, owner: EntityId, variable: Variable) {
    activate_axis(universe, owner, variable, 2);
}

pub fn read_x(universe: &Universe, owner: EntityId) -> Option<TypedValue> {
    read_axis(universe, owner, 0)
}

pub fn read_y(universe: &Universe, owner: EntityId) -> Option<TypedValue> {
    read_axis(universe, owner, 1)
}

pub fn read_z(universe: &Universe, owner: EntityId) -> Option<TypedValue> {
    read_axis(universe, owner, 2)
}

/// Copy the stored vector into the owner's coordinates
pub fn activate_cartesian_coordinates(
    universe: &mut Universe,
    owner: EntityId,
    variable: Variable,
) {
    let Some(source) = universe
        .stored_value(variable)
        .and_then(TypedValue::as_vector)
    else {
        return;
    };
    let Some(target) = coordinate_target(universe, owner) else {
        return;
    };

    if source != target {
        let copied = universe
            .vectors()
            .get3(source)
            .and_then(|components| universe.vectors_mut().write(target, &components));
        if let Err(error) = copied {
            warn!(%error, "failed to copy cartesian coordinates");
            return;
        }
    }
    follow_bionts(universe, owner);
}

/// Mutable borrow of the owner's coordinates
pub fn read_cartesian_coordinates(universe: &Universe, owner: EntityId) -> Option<TypedValue> {
    coordinate_target(universe, owner).map(TypedValue::Vec3Mut)
}

// =============================================================================
// MOVEMENT
// =============================================================================

pub fn activate_speed(universe: &mut Universe, owner: EntityId, variable: Variable) {
    let Some(speed) = stored_f32(universe, variable) else {
        return;
    };
    let Some(node) = universe.entities.get_mut(owner) else {
        return;
    };
    match &mut node.data {
        EntityData::Universe => universe.state.speed = speed,
        data => {
            if let Some(movable) = data.as_movable_mut() {
                movable.speed = speed;
            }
        }
    }
}

/// Settings that only mean something on the universe itself
macro_rules! universe_setting {
    ($($(#[$meta:meta])* $name:ident: $accessor:ident => $field:ident;)*) => {
        $(
            $(#[$meta])*
            pub fn $name(universe: &mut Universe, owner: EntityId, variable: Variable) {
                if owner != universe.root() {
                    return;
                }
                let value = universe.stored_value(variable).and_then(TypedValue::$accessor);
                if let Some(value) = value {
                    universe.state.$field = value;
                }
            }
        )*
    };
}

universe_setting! {
    activate_turbo_factor: as_f32 => turbo_factor;
    activate_twin_turbo_factor: as_f32 => twin_turbo_factor;
    activate_mouse_speed: as_f32 => mouse_speed;
    activate_window_width: as_u32 => window_width;
    activate_window_height: as_u32 => window_height;
    activate_framebuffer_width: as_u32 => framebuffer_width;
    activate_framebuffer_height: as_u32 => framebuffer_height;
    /// Toggle wireframe rendering
    activate_wireframe: as_bool => wireframe;
}

/// Rebuild the background colour from the owner's `red`, `green`, `blue` and
/// `alpha` variables. Does nothing until all four exist.
pub fn activate_background_color(universe: &mut Universe, owner: EntityId, _variable: Variable) {
    if owner != universe.root() {
        return;
    }
    let channel = |name: &str| {
        universe
            .get_variable(owner, name)
            .and_then(|variable| stored_f32(universe, variable))
    };
    if let (Some(red), Some(green), Some(blue), Some(alpha)) =
        (channel("red"), channel("green"), channel("blue"), channel("alpha"))
    {
        universe.state.background_color = [red, green, blue, alpha];
    }
}

// =============================================================================
// KIND-SPECIFIC SETTINGS
// =============================================================================

pub fn activate_planet_radius(universe: &mut Universe, owner: EntityId, variable: Variable) {
    let Some(radius) = stored_f32(universe, variable) else {
        return;
    };
    if let Some(EntityData::Species(species)) =
        universe.entities.get_mut(owner).map(|node| &mut node.data)
    {
        species.planet_radius = radius;
    }
}

pub fn activate_is_flight_mode_in_use(
    universe: &mut Universe,
    owner: EntityId,
    variable: Variable,
) {
    let Some(in_use) = stored_bool(universe, variable) else {
        return;
    };
    if let Some(EntityData::Scene(scene)) =
        universe.entities.get_mut(owner).map(|node| &mut node.data)
    {
        scene.is_flight_mode_in_use = in_use;
    }
}

pub fn read_is_flight_mode_in_use(universe: &Universe, owner: EntityId) -> Option<TypedValue> {
    match universe.entity(owner)?.data() {
        EntityData::Scene(scene) => Some(TypedValue::Bool(scene.is_flight_mode_in_use)),
        _ => None,
    }
}

/// Console geometry, applied to the active console
macro_rules! console_setting {
    ($($name:ident => $field:ident;)*) => {
        $(
            pub fn $name(universe: &mut Universe, _owner: EntityId, variable: Variable) {
                let Some(value) = stored_u32(universe, variable) else {
                    return;
                };
                let console = universe
                    .state
                    .active_console
                    .and_then(|console| universe.entities.get_mut(console))
                    .and_then(|node| node.data.as_console_mut());
                if let Some(console) = console {
                    console.$field = value;
                }
            }
        )*
    };
}

console_setting! {
    activate_console_top_y => top_y;
    activate_console_bottom_y => bottom_y;
    activate_console_left_x => left_x;
    activate_console_right_x => right_x;
}
