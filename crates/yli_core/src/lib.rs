//! Ylikuutio Core Runtime
//!
//! This crate provides the entity ontology behind the Ylikuutio console:
//!
//! - **Typed Values**: A closed set of primitive, list and borrowed payloads
//! - **Registries**: Per-scope name tables with dotted-path lookup and completion
//! - **Entities**: A universe-owned tree of scenes, objects, consoles and more
//! - **Variables**: Named typed values with activation and read callbacks
//! - **Commands**: Console commands with typed overloads resolved at call time
//!
//! # Example
//!
//! ```rust
//! use yli_core::{register_builtins, EntityStruct, TypedValue, Universe};
//!
//! let mut universe = Universe::with_default_variables().unwrap();
//! let console = universe.create_console(&EntityStruct::named("console")).unwrap();
//! register_builtins(&mut universe, console).unwrap();
//!
//! // Settings are variables of the universe; writing one runs its callback
//! universe.process_line(console, "set turbo_factor 3");
//! assert_eq!(universe.state.turbo_factor, 3.0);
//!
//! // Results are printed to the console
//! universe.create_object(&EntityStruct::named("ship"), [1.0, 2.0, 3.0]).unwrap();
//! assert_eq!(
//!     universe.process_line(console, "print ship x"),
//!     Some(TypedValue::Float32(1.0))
//! );
//! assert_eq!(universe.take_console_output(console), vec!["1.000000"]);
//! ```

pub mod builtins;
pub mod callbacks;
pub mod console;
pub mod entity;
pub mod error;
pub mod factory;
pub mod lisp;
pub mod registry;
pub mod universe;
pub mod value;
pub mod variable;
pub mod vector;

pub use builtins::register_builtins;
pub use console::tokenize;
pub use entity::{
    Biont, ConsoleData, EntityData, EntityId, EntityKind, EntityNode, HolobiontData, MovableData,
    RefKind, SceneData, SpeciesData, VariableData,
};
pub use error::{OntologyError, Result};
pub use factory::{EntityStruct, VariableStruct};
pub use lisp::{kind, ArgBinder, Handle, Invocation, KindMarker, LispArg, LispNative, Rest};
pub use registry::{is_valid_name, Registry};
pub use universe::{Universe, UniverseState, UniverseStats};
pub use value::{EntityRef, TypedValue};
pub use variable::{ActivateCallback, ReadCallback, Variable};
pub use vector::{VectorId, VectorStore};
