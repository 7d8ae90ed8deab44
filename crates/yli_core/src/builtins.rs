//! Standard console commands
//!
//! [`register_builtins`] binds the command set every console starts with:
//!
//! | command | arguments |
//! |---------|-----------|
//! | `variables` | `[entity]` |
//! | `create-variable` | `[entity] name type value` |
//! | `set` | `[entity] variable value` |
//! | `copy`, `copy-shallow` | `[entity] variable [entity] variable` |
//! | `print`, `get` | `[entity] variable` |
//! | `entities` | |
//! | `parent`, `children` | `entity` |
//! | `activate`, `delete` | `entity` |
//! | `bind` | `entity parent` |
//! | `create-object`, `create-holobiont` | `[parent] name x y z` |
//! | `set-global-name`, `set-local-name` | `entity name` |
//! | `help` | `[command]` |
//! | `info` | `[entity]` |
//! | `clear` | |
//! | `echo` | `words...` |
//! | `bye`, `chau`, `ciao`, `heippa`, `quit`, `sayonara` | |
//!
//! Variables without an entity are the universe's. Errors are printed to the
//! console that ran the command.

use tracing::info;

use crate::entity::{EntityId, RefKind};
use crate::error::{OntologyError, Result};
use crate::factory::{EntityStruct, VariableStruct};
use crate::lisp::Rest;
use crate::registry::is_valid_name;
use crate::universe::Universe;
use crate::value::{EntityRef, TypedValue};
use crate::variable::Variable;

const QUIT_ALIASES: [&str; 6] = ["bye", "chau", "ciao", "heippa", "quit", "sayonara"];

/// Bind the standard commands to `console`
pub fn register_builtins(universe: &mut Universe, console: EntityId) -> Result<()> {
    universe.create_lisp_function_overload("variables", console, variables)?;
    universe.create_lisp_function_overload("variables", console, variables_of)?;

    universe.create_lisp_function_overload("create-variable", console, create_variable_of)?;
    universe.create_lisp_function_overload("create-variable", console, create_variable)?;

    universe.create_lisp_function_overload("set", console, set)?;
    universe.create_lisp_function_overload("set", console, set_of)?;

    universe.create_lisp_function_overload("copy", console, copy)?;
    universe.create_lisp_function_overload("copy", console, copy_between)?;
    universe.create_lisp_function_overload("copy-shallow", console, copy_shallow)?;
    universe.create_lisp_function_overload("copy-shallow", console, copy_shallow_between)?;

    for name in ["print", "get"] {
        universe.create_lisp_function_overload(name, console, print)?;
        universe.create_lisp_function_overload(name, console, print_of)?;
    }

    universe.create_lisp_function_overload("entities", console, entities)?;
    universe.create_lisp_function_overload("parent", console, parent)?;
    universe.create_lisp_function_overload("children", console, children)?;
    universe.create_lisp_function_overload("activate", console, activate)?;
    universe.create_lisp_function_overload("delete", console, delete)?;
    universe.create_lisp_function_overload("set-global-name", console, set_global_name)?;
    universe.create_lisp_function_overload("set-local-name", console, set_local_name)?;
    universe.create_lisp_function_overload("bind", console, bind)?;
    universe.create_lisp_function_overload("create-object", console, create_object_in)?;
    universe.create_lisp_function_overload("create-object", console, create_object)?;
    universe.create_lisp_function_overload("create-holobiont", console, create_holobiont_in)?;
    universe.create_lisp_function_overload("create-holobiont", console, create_holobiont)?;

    universe.create_lisp_function_overload("help", console, help)?;
    universe.create_lisp_function_overload("help", console, help_for)?;
    universe.create_lisp_function_overload("info", console, info)?;
    universe.create_lisp_function_overload("info", console, info_of)?;
    universe.create_lisp_function_overload("clear", console, clear)?;
    universe.create_lisp_function_overload("echo", console, echo)?;

    for name in QUIT_ALIASES {
        universe.create_lisp_function_overload(name, console, quit)?;
    }
    Ok(())
}

/// Print a failure to the console; commands that only act return nothing
fn report(universe: &mut Universe, console: EntityId, result: Result<()>) -> Option<TypedValue> {
    if let Err(error) = result {
        universe.print_to_console(console, &error.to_string());
    }
    None
}

fn join(first: String, rest: Rest) -> String {
    std::iter::once(first)
        .chain(rest.0)
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// VARIABLES
// =============================================================================

fn variables(universe: &mut Universe, _: EntityId) -> Option<TypedValue> {
    let root = universe.root();
    variables_of(universe, root, root)
}

fn variables_of(universe: &mut Universe, _: EntityId, entity: EntityId) -> Option<TypedValue> {
    let names = universe.entity(entity)?.variables().names_joined();
    Some(TypedValue::String(names))
}

fn create_variable(
    universe: &mut Universe,
    console: EntityId,
    name: String,
    datatype: String,
    value: String,
    rest: Rest,
) -> Option<TypedValue> {
    let root = universe.root();
    create_variable_of(universe, console, root, name, datatype, value, rest)
}

fn create_variable_of(
    universe: &mut Universe,
    console: EntityId,
    owner: EntityId,
    name: String,
    datatype: String,
    value: String,
    rest: Rest,
) -> Option<TypedValue> {
    let text = join(value, rest);
    let result = if !is_valid_name(&name) {
        Err(OntologyError::InvalidName(name))
    } else if universe.has_variable(owner, &name) {
        Err(OntologyError::DuplicateName(name))
    } else {
        match TypedValue::from_type_and_str(&datatype, &text) {
            Some(initial) => universe
                .create_variable(&VariableStruct::new(&name).with_parent(owner), initial)
                .map(|_| ()),
            None => Err(OntologyError::ParseFailure {
                input: text,
                datatype,
            }),
        }
    };
    report(universe, console, result)
}

fn set(
    universe: &mut Universe,
    console: EntityId,
    variable: Variable,
    value: String,
    rest: Rest,
) -> Option<TypedValue> {
    let result = universe.set_str(variable, &join(value, rest));
    report(universe, console, result)
}

fn set_of(
    universe: &mut Universe,
    console: EntityId,
    _: EntityId,
    variable: Variable,
    value: String,
    rest: Rest,
) -> Option<TypedValue> {
    set(universe, console, variable, value, rest)
}

/// Copy the current value of `source` into `target`
fn copy_value(
    universe: &mut Universe,
    console: EntityId,
    target: Variable,
    source: Variable,
    deep: bool,
) -> Option<TypedValue> {
    let result = match universe.get(source) {
        Some(value) if deep => universe.set(target, value),
        Some(value) => universe.set_shallow(target, value),
        None => Err(OntologyError::StaleHandle),
    };
    report(universe, console, result)
}

fn copy(
    universe: &mut Universe,
    console: EntityId,
    target: Variable,
    source: Variable,
) -> Option<TypedValue> {
    copy_value(universe, console, target, source, true)
}

fn copy_between(
    universe: &mut Universe,
    console: EntityId,
    _: EntityId,
    target: Variable,
    _: EntityId,
    source: Variable,
) -> Option<TypedValue> {
    copy_value(universe, console, target, source, true)
}

fn copy_shallow(
    universe: &mut Universe,
    console: EntityId,
    target: Variable,
    source: Variable,
) -> Option<TypedValue> {
    copy_value(universe, console, target, source, false)
}

fn copy_shallow_between(
    universe: &mut Universe,
    console: EntityId,
    _: EntityId,
    target: Variable,
    _: EntityId,
    source: Variable,
) -> Option<TypedValue> {
    copy_value(universe, console, target, source, false)
}

fn print(universe: &mut Universe, _: EntityId, variable: Variable) -> Option<TypedValue> {
    universe.get(variable)
}

fn print_of(
    universe: &mut Universe,
    _: EntityId,
    _: EntityId,
    variable: Variable,
) -> Option<TypedValue> {
    universe.get(variable)
}

// =============================================================================
// ENTITIES
// =============================================================================

fn entities(universe: &mut Universe, _: EntityId) -> Option<TypedValue> {
    Some(TypedValue::String(universe.entity_names()))
}

fn parent(universe: &mut Universe, _: EntityId, entity: EntityId) -> Option<TypedValue> {
    let parent = universe.parent(entity)?;
    Some(TypedValue::Entity(EntityRef::new(RefKind::Entity, parent)))
}

fn children(universe: &mut Universe, _: EntityId, entity: EntityId) -> Option<TypedValue> {
    let names: Vec<String> = universe
        .children(entity)
        .into_iter()
        .map(|child| universe.display_name(child))
        .collect();
    Some(TypedValue::String(names.join(" ")))
}

fn activate(universe: &mut Universe, console: EntityId, entity: EntityId) -> Option<TypedValue> {
    let result = universe.activate_entity(entity);
    report(universe, console, result)
}

fn delete(universe: &mut Universe, console: EntityId, entity: EntityId) -> Option<TypedValue> {
    let result = universe.destroy_entity(entity);
    report(universe, console, result)
}

fn set_global_name(
    universe: &mut Universe,
    console: EntityId,
    entity: EntityId,
    name: String,
) -> Option<TypedValue> {
    let result = universe.set_global_name(entity, &name);
    report(universe, console, result)
}

fn set_local_name(
    universe: &mut Universe,
    console: EntityId,
    entity: EntityId,
    name: String,
) -> Option<TypedValue> {
    let result = universe.set_local_name(entity, &name);
    report(universe, console, result)
}

fn bind(
    universe: &mut Universe,
    console: EntityId,
    entity: EntityId,
    new_parent: EntityId,
) -> Option<TypedValue> {
    let result = universe.bind_to_new_parent(entity, new_parent);
    report(universe, console, result)
}

/// Create a named child of `parent`, also registered under a global name
fn create_named<F>(
    universe: &mut Universe,
    console: EntityId,
    parent: EntityId,
    name: &str,
    create: F,
) -> Option<TypedValue>
where
    F: FnOnce(&mut Universe, &EntityStruct) -> Result<EntityId>,
{
    let result = if !is_valid_name(name) {
        Err(OntologyError::InvalidName(name.to_string()))
    } else if universe.lookup(name).is_some() || universe.has_child(parent, name) {
        Err(OntologyError::DuplicateName(name.to_string()))
    } else {
        let spec = EntityStruct::child_of(parent, name).with_global_name(name);
        create(universe, &spec).map(|_| ())
    };
    report(universe, console, result)
}

fn create_object(
    universe: &mut Universe,
    console: EntityId,
    name: String,
    x: f32,
    y: f32,
    z: f32,
) -> Option<TypedValue> {
    let root = universe.root();
    create_object_in(universe, console, root, name, x, y, z)
}

fn create_object_in(
    universe: &mut Universe,
    console: EntityId,
    parent: EntityId,
    name: String,
    x: f32,
    y: f32,
    z: f32,
) -> Option<TypedValue> {
    create_named(universe, console, parent, &name, |universe, spec| {
        universe.create_object(spec, [x, y, z])
    })
}

fn create_holobiont(
    universe: &mut Universe,
    console: EntityId,
    name: String,
    x: f32,
    y: f32,
    z: f32,
) -> Option<TypedValue> {
    let root = universe.root();
    create_holobiont_in(universe, console, root, name, x, y, z)
}

fn create_holobiont_in(
    universe: &mut Universe,
    console: EntityId,
    parent: EntityId,
    name: String,
    x: f32,
    y: f32,
    z: f32,
) -> Option<TypedValue> {
    create_named(universe, console, parent, &name, |universe, spec| {
        universe.create_holobiont(spec, [x, y, z], &[])
    })
}

// =============================================================================
// CONSOLE
// =============================================================================

fn help(universe: &mut Universe, console: EntityId) -> Option<TypedValue> {
    let names = universe.command_names(console).join(" ");
    Some(TypedValue::String(format!("commands: {names}")))
}

fn help_for(universe: &mut Universe, console: EntityId, name: String) -> Option<TypedValue> {
    let text = match universe.command(console, &name) {
        Some(function) => universe.usage(&name, function),
        None => format!("unknown command: {name}"),
    };
    Some(TypedValue::String(text))
}

fn info(universe: &mut Universe, _: EntityId) -> Option<TypedValue> {
    let stats = universe.stats();
    Some(TypedValue::String(format!(
        "entities: {}, alive: {}, variables: {}, global names: {}, vectors: {}",
        stats.entity_count,
        stats.alive_count,
        stats.variable_count,
        stats.global_name_count,
        stats.vector_count
    )))
}

fn info_of(universe: &mut Universe, _: EntityId, entity: EntityId) -> Option<TypedValue> {
    let node = universe.entity(entity)?;
    Some(TypedValue::String(format!(
        "{} {} #{}: {} children, {} variables",
        node.type_tag(),
        universe.display_name(entity),
        node.number(),
        universe.number_of_children(entity),
        node.variables().len()
    )))
}

fn clear(universe: &mut Universe, console: EntityId) -> Option<TypedValue> {
    universe.clear_console(console);
    None
}

fn echo(_: &mut Universe, _: EntityId, words: Rest) -> Option<TypedValue> {
    Some(TypedValue::String(words.0.join(" ")))
}

fn quit(universe: &mut Universe, _: EntityId) -> Option<TypedValue> {
    info!("exit requested");
    universe.state.exit_requested = true;
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;

    fn setup() -> (Universe, EntityId) {
        let mut universe = Universe::with_default_variables().unwrap();
        let console = universe
            .create_console(&EntityStruct::named("console"))
            .unwrap();
        register_builtins(&mut universe, console).unwrap();
        (universe, console)
    }

    /// Run `line` and return what it printed
    fn run(universe: &mut Universe, console: EntityId, line: &str) -> Vec<String> {
        universe.process_line(console, line);
        universe.take_console_output(console)
    }

    #[test]
    fn test_set_and_print_universe_variable() {
        let (mut universe, console) = setup();

        assert!(run(&mut universe, console, "set turbo_factor 3").is_empty());
        assert_eq!(universe.state.turbo_factor, 3.0);
        assert_eq!(run(&mut universe, console, "print turbo_factor"), ["3.000000"]);
        assert_eq!(run(&mut universe, console, "get turbo_factor"), ["3.000000"]);
    }

    #[test]
    fn test_set_reports_parse_failure() {
        let (mut universe, console) = setup();
        assert_eq!(
            run(&mut universe, console, "set turbo_factor fast"),
            ["cannot parse `fast` as f32"]
        );
        assert_eq!(universe.state.turbo_factor, 100.0);
    }

    #[test]
    fn test_set_vector_from_several_words() {
        let (mut universe, console) = setup();
        run(&mut universe, console, "set cartesian_coordinates 1 2 3");
        assert_eq!(universe.camera_coordinates(), [1.0, 2.0, 3.0]);
        assert_eq!(
            run(&mut universe, console, "print cartesian_coordinates"),
            ["[1.000000, 2.000000, 3.000000]"]
        );
    }

    #[test]
    fn test_variables_lists_names() {
        let (mut universe, console) = setup();
        let output = run(&mut universe, console, "variables");
        assert_eq!(output.len(), 1);
        assert!(output[0].split(' ').any(|name| name == "turbo_factor"));

        universe.create_scene(&EntityStruct::named("level")).unwrap();
        assert_eq!(run(&mut universe, console, "variables level"), ["is_flight_mode_in_use"]);
    }

    #[test]
    fn test_create_variable_on_universe_and_entity() {
        let (mut universe, console) = setup();
        let level = universe.create_scene(&EntityStruct::named("level")).unwrap();

        assert!(run(&mut universe, console, "create-variable answer i32 42").is_empty());
        assert_eq!(run(&mut universe, console, "print answer"), ["42"]);

        run(&mut universe, console, "create-variable level gravity f32 9.5");
        assert_eq!(
            universe.get_variable_value(level, "gravity"),
            Some(TypedValue::Float32(9.5))
        );
        assert_eq!(run(&mut universe, console, "print level gravity"), ["9.500000"]);
        assert_eq!(run(&mut universe, console, "set level gravity 1"), Vec::<String>::new());
        assert_eq!(
            universe.get_variable_value(level, "gravity"),
            Some(TypedValue::Float32(1.0))
        );

        assert_eq!(
            run(&mut universe, console, "create-variable answer i32 1"),
            ["name `answer` is already in use"]
        );
        assert_eq!(
            run(&mut universe, console, "create-variable bad i32 x"),
            ["cannot parse `x` as i32"]
        );
        assert_eq!(
            run(&mut universe, console, "create-variable list Vec<f32> 1 2"),
            Vec::<String>::new()
        );
        assert_eq!(run(&mut universe, console, "print list"), ["[1, 2]"]);
    }

    #[test]
    fn test_copy() {
        let (mut universe, console) = setup();
        run(&mut universe, console, "create-variable a f32 1");
        run(&mut universe, console, "create-variable b f32 2");

        run(&mut universe, console, "copy a b");
        assert_eq!(run(&mut universe, console, "print a"), ["2.000000"]);

        run(&mut universe, console, "set b 5");
        run(&mut universe, console, "copy-shallow a b");
        assert_eq!(run(&mut universe, console, "print a"), ["5.000000"]);
    }

    #[test]
    fn test_copy_between_entities() {
        let (mut universe, console) = setup();
        let ship = universe
            .create_object(&EntityStruct::named("ship"), [1.0, 2.0, 3.0])
            .unwrap();
        universe
            .create_object(&EntityStruct::named("buoy"), [0.0; 3])
            .unwrap();

        run(&mut universe, console, "copy buoy x ship x");
        assert_eq!(run(&mut universe, console, "print buoy x"), ["1.000000"]);
        assert_eq!(universe.coordinates(ship), Some([1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_unknown_variable_prints_usage() {
        let (mut universe, console) = setup();
        assert_eq!(
            run(&mut universe, console, "print nope"),
            ["usage: print Variable | print Entity Variable"]
        );
    }

    #[test]
    fn test_entity_commands() {
        let (mut universe, console) = setup();
        let level = universe.create_scene(&EntityStruct::named("level")).unwrap();
        universe
            .create_object(
                &EntityStruct::child_of(level, "ship").with_global_name("ship"),
                [0.0; 3],
            )
            .unwrap();

        let names = run(&mut universe, console, "entities");
        assert!(names[0].contains("level"));
        assert_eq!(run(&mut universe, console, "parent ship"), ["level"]);
        assert_eq!(run(&mut universe, console, "children level"), ["ship"]);

        run(&mut universe, console, "activate level");
        assert_eq!(universe.state.active_scene, Some(level));
        assert_eq!(
            run(&mut universe, console, "activate ship"),
            ["type mismatch: expected Scene or Console, found Object"]
        );

        run(&mut universe, console, "set-global-name level stage");
        assert_eq!(universe.lookup("stage"), Some(level));
        assert_eq!(universe.lookup("level"), None);

        run(&mut universe, console, "delete stage");
        assert!(!universe.contains(level));
        assert_eq!(universe.lookup("ship"), None);
        assert_eq!(universe.state.active_scene, None);
    }

    #[test]
    fn test_create_object_and_holobiont() {
        let (mut universe, console) = setup();
        let level = universe.create_scene(&EntityStruct::named("level")).unwrap();

        assert!(run(&mut universe, console, "create-object level ship 1 2 3").is_empty());
        let ship = universe.lookup("ship").unwrap();
        assert_eq!(universe.parent(ship), Some(level));
        assert_eq!(universe.lookup("level.ship"), Some(ship));
        assert_eq!(universe.coordinates(ship), Some([1.0, 2.0, 3.0]));
        assert_eq!(run(&mut universe, console, "print ship y"), ["2.000000"]);

        assert!(run(&mut universe, console, "create-holobiont cat -1 0 0.5").is_empty());
        let cat = universe.lookup("cat").unwrap();
        assert_eq!(universe.parent(cat), Some(universe.root()));
        assert_eq!(universe.kind(cat), Some(EntityKind::Holobiont));
        assert_eq!(universe.coordinates(cat), Some([-1.0, 0.0, 0.5]));

        assert_eq!(
            run(&mut universe, console, "create-object level ship 0 0 0"),
            ["name `ship` is already in use"]
        );
        assert_eq!(
            run(&mut universe, console, "create-object level ship 0 zero 0"),
            ["usage: create-object Entity String f32 f32 f32 | create-object String f32 f32 f32"]
        );
    }

    #[test]
    fn test_bind_moves_entity() {
        let (mut universe, console) = setup();
        let first = universe.create_scene(&EntityStruct::named("first")).unwrap();
        let second = universe.create_scene(&EntityStruct::named("second")).unwrap();
        run(&mut universe, console, "create-object first ship 0 0 0");
        let ship = universe.lookup("ship").unwrap();

        assert!(run(&mut universe, console, "bind ship second").is_empty());
        assert_eq!(universe.parent(ship), Some(second));
        assert!(run(&mut universe, console, "children first").is_empty());
        assert_eq!(run(&mut universe, console, "children second"), ["ship"]);

        universe
            .create_entity(EntityKind::Material, &EntityStruct::child_of(first, "ship"))
            .unwrap();
        assert_eq!(
            run(&mut universe, console, "bind ship first"),
            ["name `ship` is already in use"]
        );
        assert_eq!(universe.parent(ship), Some(second));

        assert_eq!(
            run(&mut universe, console, "bind second ship"),
            ["cannot bind an entity under itself"]
        );
    }

    #[test]
    fn test_help_and_info() {
        let (mut universe, console) = setup();
        let help = run(&mut universe, console, "help");
        assert!(help[0].starts_with("commands: variables create-variable set"));
        assert_eq!(
            run(&mut universe, console, "help echo"),
            ["usage: echo ..."]
        );
        assert_eq!(
            run(&mut universe, console, "help nothing"),
            ["unknown command: nothing"]
        );

        let info = run(&mut universe, console, "info");
        assert!(info[0].starts_with("entities: "));
        let info = run(&mut universe, console, "info console");
        assert!(info[0].starts_with("Console console #"));
    }

    #[test]
    fn test_echo_and_clear() {
        let (mut universe, console) = setup();
        universe.process_line(console, "echo hello   world");
        assert_eq!(universe.console_output(console), ["hello world"]);
        universe.process_line(console, "clear");
        assert!(universe.console_output(console).is_empty());
    }

    #[test]
    fn test_quit_aliases() {
        for alias in QUIT_ALIASES {
            let (mut universe, console) = setup();
            assert!(!universe.state.exit_requested);
            universe.process_line(console, alias);
            assert!(universe.state.exit_requested, "{alias} should request exit");
        }
    }
}
