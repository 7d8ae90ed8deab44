//! Command binding and overload resolution
//!
//! A command is a `LispFunction` entity owned by a console. Each of its
//! children is a `LispFunctionOverload` wrapping one native Rust function. A
//! native function takes `(&mut Universe, console, args...)` where every
//! argument type implements [`LispArg`], and returns an optional value.
//!
//! Execution takes the command's string parameters and tries the overloads in
//! creation order. An overload is skipped if its arity does not fit or any
//! parameter fails to convert; the first one that binds is invoked. When none
//! binds the result is `None`.
//!
//! Arguments are bound left to right with a *context* entity that starts as
//! the universe. An entity argument is looked up by global name and becomes
//! the new context; a [`Variable`] argument is looked up among the variables
//! of the current context. So `set ship speed 5` binds `ship` as an entity
//! and then finds `speed` among its variables.
//!
//! ```rust
//! use yli_core::{EntityId, EntityStruct, TypedValue, Universe};
//!
//! fn add(_: &mut Universe, _: EntityId, a: i32, b: i32) -> Option<TypedValue> {
//!     Some(TypedValue::Int32(a + b))
//! }
//!
//! let mut universe = Universe::new();
//! let console = universe.create_console(&EntityStruct::named("console")).unwrap();
//! universe.create_lisp_function_overload("add", console, add).unwrap();
//!
//! let params = ["2".to_string(), "40".to_string()];
//! assert_eq!(universe.dispatch(console, "add", &params), Some(TypedValue::Int32(42)));
//! assert_eq!(universe.dispatch(console, "add", &params[..1]), None);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use crate::entity::{EntityData, EntityId, EntityKind, OverloadData, RefKind};
use crate::error::{OntologyError, Result};
use crate::registry::is_valid_name;
use crate::universe::Universe;
use crate::value::{parse_bool, parse_char, parse_f32, parse_f64, parse_i32, parse_u32, TypedValue};
use crate::variable::Variable;

// =============================================================================
// ARGUMENT BINDING
// =============================================================================

/// Cursor over the string parameters of one invocation
pub struct ArgBinder<'a> {
    universe: &'a Universe,
    params: &'a [String],
    position: usize,
    context: EntityId,
}

impl<'a> ArgBinder<'a> {
    pub fn new(universe: &'a Universe, params: &'a [String]) -> Self {
        Self {
            universe,
            params,
            position: 0,
            context: universe.root(),
        }
    }

    pub fn universe(&self) -> &'a Universe {
        self.universe
    }

    /// Entity in whose variables [`Variable`] arguments are looked up
    pub fn context(&self) -> EntityId {
        self.context
    }

    pub fn set_context(&mut self, context: EntityId) {
        self.context = context;
    }

    /// Consume the next parameter
    pub fn next_param(&mut self) -> Option<&'a str> {
        let param = self.params.get(self.position)?;
        self.position += 1;
        Some(param.as_str())
    }

    /// Consume every remaining parameter
    pub fn take_rest(&mut self) -> Vec<String> {
        let rest = self.params[self.position..].to_vec();
        self.position = self.params.len();
        rest
    }

    pub fn is_finished(&self) -> bool {
        self.position == self.params.len()
    }

    /// Resolve the next parameter as a live entity accepted by `kind` and
    /// make it the context
    fn bind_entity(&mut self, kind: RefKind) -> Option<EntityId> {
        let name = self.next_param()?;
        let id = self.universe.lookup(name)?;
        let node = self.universe.entity(id)?;
        if !node.is_alive() || !kind.accepts(node.kind()) {
            return None;
        }
        self.context = id;
        Some(id)
    }
}

/// A type a command parameter can be converted to
pub trait LispArg: Sized {
    /// Parameters consumed
    const PARAMS: usize = 1;
    /// Whether this argument swallows all remaining parameters
    const VARIADIC: bool = false;

    /// Name shown in command signatures
    fn type_name() -> &'static str;

    fn bind(binder: &mut ArgBinder<'_>) -> Option<Self>;
}

macro_rules! impl_parsed_arg {
    ($($ty:ty => $name:literal, $parse:path;)*) => {
        $(
            impl LispArg for $ty {
                fn type_name() -> &'static str {
                    $name
                }

                fn bind(binder: &mut ArgBinder<'_>) -> Option<Self> {
                    $parse(binder.next_param()?)
                }
            }
        )*
    };
}

impl_parsed_arg! {
    bool => "bool", parse_bool;
    char => "char", parse_char;
    f32 => "f32", parse_f32;
    f64 => "f64", parse_f64;
    i32 => "i32", parse_i32;
    u32 => "u32", parse_u32;
}

impl LispArg for String {
    fn type_name() -> &'static str {
        "String"
    }

    fn bind(binder: &mut ArgBinder<'_>) -> Option<Self> {
        binder.next_param().map(str::to_string)
    }
}

/// Any live entity, by global name
impl LispArg for EntityId {
    fn type_name() -> &'static str {
        "Entity"
    }

    fn bind(binder: &mut ArgBinder<'_>) -> Option<Self> {
        binder.bind_entity(RefKind::Entity)
    }
}

/// A variable of the current context entity
impl LispArg for Variable {
    fn type_name() -> &'static str {
        "Variable"
    }

    fn bind(binder: &mut ArgBinder<'_>) -> Option<Self> {
        let name = binder.next_param()?;
        let variable = binder.universe.get_variable(binder.context, name)?;
        binder.universe.is_alive(variable.id()).then_some(variable)
    }
}

/// Every remaining parameter, possibly none
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rest(pub Vec<String>);

impl LispArg for Rest {
    const PARAMS: usize = 0;
    const VARIADIC: bool = true;

    fn type_name() -> &'static str {
        "..."
    }

    fn bind(binder: &mut ArgBinder<'_>) -> Option<Self> {
        Some(Rest(binder.take_rest()))
    }
}

/// Compile-time entity kind for [`Handle`]
pub trait KindMarker {
    const KIND: RefKind;
}

/// Marker types for [`Handle`]
pub mod kind {
    use super::KindMarker;
    use crate::entity::RefKind;

    macro_rules! markers {
        ($($name:ident),* $(,)?) => {
            $(
                #[derive(Debug, Clone, Copy)]
                pub struct $name;

                impl KindMarker for $name {
                    const KIND: RefKind = RefKind::$name;
                }
            )*
        };
    }

    markers!(Movable, Universe, Ecosystem, Scene, Species, Object, Holobiont, Console);
}

/// Entity handle whose kind is checked while binding
pub struct Handle<K> {
    id: EntityId,
    _marker: PhantomData<fn() -> K>,
}

impl<K> Handle<K> {
    pub fn id(&self) -> EntityId {
        self.id
    }
}

impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K: KindMarker> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle<{}>({:?})", K::KIND.datatype(), self.id)
    }
}

impl<K: KindMarker> LispArg for Handle<K> {
    fn type_name() -> &'static str {
        K::KIND.datatype()
    }

    fn bind(binder: &mut ArgBinder<'_>) -> Option<Self> {
        binder.bind_entity(K::KIND).map(|id| Handle {
            id,
            _marker: PhantomData,
        })
    }
}

// =============================================================================
// NATIVE FUNCTIONS
// =============================================================================

/// Outcome of trying one overload
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// Parameters did not bind; try the next overload
    Mismatch,
    /// The function ran and returned this
    Returned(Option<TypedValue>),
}

/// A Rust function usable as a command overload
///
/// Implemented for `Fn(&mut Universe, EntityId, A1, .., An) -> Option<TypedValue>`
/// with up to five [`LispArg`] arguments. The `EntityId` is the console the
/// command was issued on.
pub trait LispNative<Args>: Send + Sync + 'static {
    fn param_types() -> Vec<&'static str>;
    fn arity() -> usize;
    fn is_variadic() -> bool;
    fn invoke(&self, universe: &mut Universe, console: EntityId, params: &[String]) -> Invocation;
}

macro_rules! impl_lisp_native {
    ($($arg:ident $val:ident),*) => {
        impl<F, $($arg,)*> LispNative<($($arg,)*)> for F
        where
            F: Fn(&mut Universe, EntityId $(, $arg)*) -> Option<TypedValue> + Send + Sync + 'static,
            $($arg: LispArg,)*
        {
            fn param_types() -> Vec<&'static str> {
                vec![$($arg::type_name()),*]
            }

            fn arity() -> usize {
                0 $(+ $arg::PARAMS)*
            }

            fn is_variadic() -> bool {
                false $(|| $arg::VARIADIC)*
            }

            #[allow(unused_mut)]
            fn invoke(
                &self,
                universe: &mut Universe,
                console: EntityId,
                params: &[String],
            ) -> Invocation {
                let bound = {
                    let shared: &Universe = universe;
                    let bind = || {
                        let mut binder = ArgBinder::new(shared, params);
                        $(let $val = <$arg as LispArg>::bind(&mut binder)?;)*
                        binder.is_finished().then_some(($($val,)*))
                    };
                    bind()
                };
                match bound {
                    Some(($($val,)*)) => Invocation::Returned((self)(universe, console $(, $val)*)),
                    None => Invocation::Mismatch,
                }
            }
        }
    };
}

impl_lisp_native!();
impl_lisp_native!(A1 a1);
impl_lisp_native!(A1 a1, A2 a2);
impl_lisp_native!(A1 a1, A2 a2, A3 a3);
impl_lisp_native!(A1 a1, A2 a2, A3 a3, A4 a4);
impl_lisp_native!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);

/// Type-erased overload stored in the entity arena
pub trait ErasedOverload: Send + Sync {
    fn param_types(&self) -> &[&'static str];
    fn arity(&self) -> usize;
    fn is_variadic(&self) -> bool;
    fn invoke(&self, universe: &mut Universe, console: EntityId, params: &[String]) -> Invocation;

    /// Whether `count` parameters can possibly bind
    fn accepts_count(&self, count: usize) -> bool {
        if self.is_variadic() {
            count >= self.arity()
        } else {
            count == self.arity()
        }
    }
}

struct NativeOverload<F, Args> {
    function: F,
    param_types: Vec<&'static str>,
    _marker: PhantomData<fn() -> Args>,
}

impl<F, Args> ErasedOverload for NativeOverload<F, Args>
where
    F: LispNative<Args>,
    Args: 'static,
{
    fn param_types(&self) -> &[&'static str] {
        &self.param_types
    }

    fn arity(&self) -> usize {
        F::arity()
    }

    fn is_variadic(&self) -> bool {
        F::is_variadic()
    }

    fn invoke(&self, universe: &mut Universe, console: EntityId, params: &[String]) -> Invocation {
        self.function.invoke(universe, console, params)
    }
}

// =============================================================================
// DISPATCH
// =============================================================================

impl Universe {
    /// Add `function` as a new overload of command `name` on `console`,
    /// creating the command on first use
    pub fn create_lisp_function_overload<Args, F>(
        &mut self,
        name: &str,
        console: EntityId,
        function: F,
    ) -> Result<EntityId>
    where
        F: LispNative<Args>,
        Args: 'static,
    {
        let kind = self.live_node(console)?.kind();
        if kind != EntityKind::Console {
            return Err(OntologyError::TypeMismatch {
                expected: "Console".to_string(),
                found: kind.type_tag().to_string(),
            });
        }
        if !is_valid_name(name) {
            return Err(OntologyError::InvalidName(name.to_string()));
        }

        let lisp_function = match self.command(console, name) {
            Some(existing) => existing,
            None => self.spawn(
                EntityKind::LispFunction,
                EntityData::LispFunction,
                Some(console),
                name,
                "",
            )?,
        };

        let overload: Arc<dyn ErasedOverload> = Arc::new(NativeOverload {
            function,
            param_types: F::param_types(),
            _marker: PhantomData,
        });
        debug!(command = name, params = ?overload.param_types(), "created overload");

        self.spawn(
            EntityKind::LispFunctionOverload,
            EntityData::Overload(OverloadData { function: overload }),
            Some(lisp_function),
            "",
            "",
        )
    }

    /// The command entity bound to `name` on `console`
    pub fn command(&self, console: EntityId, name: &str) -> Option<EntityId> {
        let id = self.entity(console)?.registry().get(name)?;
        (self.kind(id)? == EntityKind::LispFunction).then_some(id)
    }

    /// Names of every command on `console`, in creation order
    pub fn command_names(&self, console: EntityId) -> Vec<String> {
        let Some(node) = self.entity(console) else {
            return Vec::new();
        };
        node.registry()
            .iter()
            .filter(|(_, id)| self.kind(*id) == Some(EntityKind::LispFunction))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    fn overloads(&self, function: EntityId) -> Vec<Arc<dyn ErasedOverload>> {
        self.children(function)
            .into_iter()
            .filter_map(|child| match self.entity(child)?.data() {
                EntityData::Overload(overload) => Some(overload.function.clone()),
                _ => None,
            })
            .collect()
    }

    /// Parameter type lists of every overload of a command
    pub fn overload_signatures(&self, function: EntityId) -> Vec<Vec<&'static str>> {
        self.overloads(function)
            .iter()
            .map(|overload| overload.param_types().to_vec())
            .collect()
    }

    /// Resolve and run one overload of a command
    ///
    /// Overloads are tried in creation order; the first whose parameters all
    /// bind is invoked. [`Invocation::Mismatch`] when no overload binds or the
    /// command is dead.
    pub fn invoke_lisp_function(&mut self, function: EntityId, params: &[String]) -> Invocation {
        let console = match self.entity(function) {
            Some(node) if node.is_alive() && node.kind() == EntityKind::LispFunction => {
                node.parent()
            }
            _ => None,
        };
        let Some(console) = console else {
            return Invocation::Mismatch;
        };

        for overload in self.overloads(function) {
            if !overload.accepts_count(params.len()) {
                continue;
            }
            match overload.invoke(self, console, params) {
                Invocation::Mismatch => {
                    debug!(params = ?overload.param_types(), "overload did not bind")
                }
                returned => return returned,
            }
        }

        debug!(
            command = %self.display_name(function),
            ?params,
            "no matching overload"
        );
        Invocation::Mismatch
    }

    /// [`Universe::invoke_lisp_function`] with a mismatch flattened to `None`
    pub fn execute_lisp_function(
        &mut self,
        function: EntityId,
        params: &[String],
    ) -> Option<TypedValue> {
        match self.invoke_lisp_function(function, params) {
            Invocation::Returned(result) => result,
            Invocation::Mismatch => None,
        }
    }

    /// Run command `name` on `console`. `None` if there is no such command
    /// or no overload binds.
    pub fn dispatch(
        &mut self,
        console: EntityId,
        name: &str,
        params: &[String],
    ) -> Option<TypedValue> {
        match self.command(console, name) {
            Some(function) => self.execute_lisp_function(function, params),
            None => {
                debug!(command = name, "unknown command");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{EntityStruct, VariableStruct};
    use std::sync::Mutex;

    fn params(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn setup() -> (Universe, EntityId) {
        let mut universe = Universe::new();
        let console = universe
            .create_console(&EntityStruct::named("console"))
            .unwrap();
        (universe, console)
    }

    fn hello(_: &mut Universe, _: EntityId) -> Option<TypedValue> {
        Some(TypedValue::from("hello"))
    }

    fn negate_f32(_: &mut Universe, _: EntityId, value: f32) -> Option<TypedValue> {
        Some(TypedValue::Float32(-value))
    }

    fn negate_i32(_: &mut Universe, _: EntityId, value: i32) -> Option<TypedValue> {
        Some(TypedValue::Int32(-value))
    }

    fn flag(_: &mut Universe, _: EntityId, value: bool) -> Option<TypedValue> {
        Some(TypedValue::Bool(!value))
    }

    #[test]
    fn test_zero_arity() {
        let (mut universe, console) = setup();
        universe
            .create_lisp_function_overload("hello", console, hello)
            .unwrap();

        assert_eq!(
            universe.dispatch(console, "hello", &[]),
            Some(TypedValue::from("hello"))
        );
        assert_eq!(universe.dispatch(console, "hello", &params(&["x"])), None);
    }

    #[test]
    fn test_unknown_command() {
        let (mut universe, console) = setup();
        assert_eq!(universe.dispatch(console, "missing", &[]), None);
        assert_eq!(universe.command(console, "missing"), None);
    }

    #[test]
    fn test_overloads_tried_in_order() {
        let (mut universe, console) = setup();
        universe
            .create_lisp_function_overload("negate", console, negate_i32)
            .unwrap();
        universe
            .create_lisp_function_overload("negate", console, negate_f32)
            .unwrap();
        universe
            .create_lisp_function_overload("negate", console, flag)
            .unwrap();

        let function = universe.command(console, "negate").unwrap();
        assert_eq!(universe.number_of_children(function), 3);
        assert_eq!(
            universe.overload_signatures(function),
            vec![vec!["i32"], vec!["f32"], vec!["bool"]]
        );

        assert_eq!(
            universe.dispatch(console, "negate", &params(&["5"])),
            Some(TypedValue::Int32(-5))
        );
        assert_eq!(
            universe.dispatch(console, "negate", &params(&["2.5"])),
            Some(TypedValue::Float32(-2.5))
        );
        assert_eq!(
            universe.dispatch(console, "negate", &params(&["true"])),
            Some(TypedValue::Bool(false))
        );
        assert_eq!(universe.dispatch(console, "negate", &params(&["abc"])), None);
        assert_eq!(universe.dispatch(console, "negate", &params(&["1", "2"])), None);
    }

    #[test]
    fn test_first_binding_overload_wins_even_if_it_returns_nothing() {
        let (mut universe, console) = setup();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let first = calls.clone();
        universe
            .create_lisp_function_overload(
                "pick",
                console,
                move |_: &mut Universe, _: EntityId, _: String| -> Option<TypedValue> {
                    first.lock().unwrap().push("string");
                    None
                },
            )
            .unwrap();
        let second = calls.clone();
        universe
            .create_lisp_function_overload(
                "pick",
                console,
                move |_: &mut Universe, _: EntityId, _: i32| -> Option<TypedValue> {
                    second.lock().unwrap().push("i32");
                    Some(TypedValue::Int32(0))
                },
            )
            .unwrap();

        assert_eq!(universe.dispatch(console, "pick", &params(&["7"])), None);
        assert_eq!(*calls.lock().unwrap(), vec!["string"]);
    }

    #[test]
    fn test_entity_argument_sets_variable_context() {
        let (mut universe, console) = setup();
        let ship = universe.create_scene(&EntityStruct::named("ship")).unwrap();
        universe
            .create_variable(
                &VariableStruct::new("speed").with_parent(ship),
                TypedValue::Float32(1.0),
            )
            .unwrap();
        universe
            .create_variable(&VariableStruct::new("speed"), TypedValue::Float32(99.0))
            .unwrap();

        fn read(universe: &mut Universe, _: EntityId, variable: Variable) -> Option<TypedValue> {
            universe.get(variable)
        }
        fn read_of(
            universe: &mut Universe,
            _: EntityId,
            _: EntityId,
            variable: Variable,
        ) -> Option<TypedValue> {
            universe.get(variable)
        }
        universe
            .create_lisp_function_overload("get", console, read)
            .unwrap();
        universe
            .create_lisp_function_overload("get", console, read_of)
            .unwrap();

        assert_eq!(
            universe.dispatch(console, "get", &params(&["speed"])),
            Some(TypedValue::Float32(99.0))
        );
        assert_eq!(
            universe.dispatch(console, "get", &params(&["ship", "speed"])),
            Some(TypedValue::Float32(1.0))
        );
        assert_eq!(universe.dispatch(console, "get", &params(&["ship", "nope"])), None);
        assert_eq!(universe.dispatch(console, "get", &params(&["nope", "speed"])), None);
    }

    #[test]
    fn test_dead_variable_does_not_bind() {
        let (mut universe, console) = setup();
        let speed = universe
            .create_variable(&VariableStruct::new("speed"), TypedValue::Float32(1.0))
            .unwrap();

        fn read(universe: &mut Universe, _: EntityId, variable: Variable) -> Option<TypedValue> {
            universe.get(variable)
        }
        universe
            .create_lisp_function_overload("get", console, read)
            .unwrap();

        let get = universe.command(console, "get").unwrap();
        universe.terminate(speed.id());
        assert_eq!(
            universe.invoke_lisp_function(get, &params(&["speed"])),
            Invocation::Mismatch
        );
    }

    #[test]
    fn test_typed_handle_checks_kind() {
        let (mut universe, console) = setup();
        universe.create_scene(&EntityStruct::named("level")).unwrap();
        universe
            .create_object(&EntityStruct::named("ship"), [0.0; 3])
            .unwrap();

        fn where_is(
            universe: &mut Universe,
            _: EntityId,
            movable: Handle<kind::Movable>,
        ) -> Option<TypedValue> {
            universe
                .coordinates(movable.id())
                .map(|c| TypedValue::VecFloat32(c.to_vec()))
        }
        universe
            .create_lisp_function_overload("where", console, where_is)
            .unwrap();

        assert_eq!(
            universe.dispatch(console, "where", &params(&["ship"])),
            Some(TypedValue::VecFloat32(vec![0.0, 0.0, 0.0]))
        );
        assert_eq!(universe.dispatch(console, "where", &params(&["level"])), None);
    }

    #[test]
    fn test_rest_argument() {
        let (mut universe, console) = setup();
        fn join(_: &mut Universe, _: EntityId, first: String, rest: Rest) -> Option<TypedValue> {
            let mut words = vec![first];
            words.extend(rest.0);
            Some(TypedValue::String(words.join("+")))
        }
        universe
            .create_lisp_function_overload("join", console, join)
            .unwrap();

        assert_eq!(universe.dispatch(console, "join", &[]), None);
        assert_eq!(
            universe.dispatch(console, "join", &params(&["a"])),
            Some(TypedValue::from("a"))
        );
        assert_eq!(
            universe.dispatch(console, "join", &params(&["a", "b", "c"])),
            Some(TypedValue::from("a+b+c"))
        );
    }

    #[test]
    fn test_overloads_need_a_console() {
        let mut universe = Universe::new();
        let scene = universe.create_scene(&EntityStruct::named("s")).unwrap();
        assert!(matches!(
            universe.create_lisp_function_overload("hello", scene, hello),
            Err(OntologyError::TypeMismatch { .. })
        ));

        let console = universe
            .create_console(&EntityStruct::named("c"))
            .unwrap();
        assert_eq!(
            universe.create_lisp_function_overload("bad name", console, hello),
            Err(OntologyError::InvalidName("bad name".to_string()))
        );
    }

    #[test]
    fn test_dead_command_does_not_run() {
        let (mut universe, console) = setup();
        universe
            .create_lisp_function_overload("hello", console, hello)
            .unwrap();
        let function = universe.command(console, "hello").unwrap();
        universe.terminate(function);
        assert_eq!(universe.execute_lisp_function(function, &[]), None);
    }

    #[test]
    fn test_reentrant_command() {
        let (mut universe, console) = setup();
        fn outer(universe: &mut Universe, console: EntityId) -> Option<TypedValue> {
            universe.dispatch(console, "hello", &[])
        }
        universe
            .create_lisp_function_overload("hello", console, hello)
            .unwrap();
        universe
            .create_lisp_function_overload("outer", console, outer)
            .unwrap();

        assert_eq!(
            universe.dispatch(console, "outer", &[]),
            Some(TypedValue::from("hello"))
        );
    }
}
