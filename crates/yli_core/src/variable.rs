//! Reactive variables
//!
//! A variable is an entity whose payload is a [`TypedValue`] plus two
//! optional callbacks:
//!
//! - **activate** runs after every successful write, with the owning entity
//!   and the variable. It never vetoes the write.
//! - **read** replaces the stored value on every [`Universe::get`]. Whether a
//!   variable has one is fixed at construction.
//!
//! Writes come in two flavours. [`Universe::set`] is deep: a borrowed
//! fixed-size vector is copied into a slot owned by the variable.
//! [`Universe::set_shallow`] stores the value as given, so a borrowed vector
//! aliases the caller's referent.
//!
//! Callbacks are cloned out of the arena before they run, so they are free to
//! read and write other variables (or the same one) through the universe.
//!
//! ```rust
//! use yli_core::{TypedValue, Universe, VariableStruct};
//!
//! let mut universe = Universe::new();
//! let answer = universe
//!     .create_variable(&VariableStruct::new("answer"), TypedValue::Int32(41))
//!     .unwrap();
//!
//! universe.set_str(answer, "42").unwrap();
//! assert_eq!(universe.get(answer), Some(TypedValue::Int32(42)));
//!
//! // Unparsable input leaves the value untouched.
//! assert!(universe.set_str(answer, "forty-two").is_err());
//! assert_eq!(universe.get(answer), Some(TypedValue::Int32(42)));
//! ```

use std::sync::Arc;

use crate::entity::{EntityId, EntityKind, VariableData};
use crate::error::{OntologyError, Result};
use crate::universe::Universe;
use crate::value::{parse_f32, parse_vec, TypedValue};
use crate::vector::VectorId;

/// Called after a successful write with `(universe, owner, variable)`
pub type ActivateCallback = Arc<dyn Fn(&mut Universe, EntityId, Variable) + Send + Sync>;

/// Computes the value of a variable from its owner on every read
pub type ReadCallback = Arc<dyn Fn(&Universe, EntityId) -> Option<TypedValue> + Send + Sync>;

/// Handle to a variable entity (cheap to copy)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variable {
    id: EntityId,
}

impl Variable {
    /// Get the variable's entity ID
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Wrap a raw entity ID. Operations fail with
    /// [`OntologyError::NotAVariable`] if it is not a variable.
    pub fn from_id(id: EntityId) -> Self {
        Self { id }
    }
}

/// Same borrowed variant as `value`, pointing at `id`
fn rebind_vector(value: &TypedValue, id: VectorId) -> TypedValue {
    match value {
        TypedValue::Vec3Ref(_) => TypedValue::Vec3Ref(id),
        TypedValue::Vec3Mut(_) => TypedValue::Vec3Mut(id),
        TypedValue::Vec4Ref(_) => TypedValue::Vec4Ref(id),
        TypedValue::Vec4Mut(_) => TypedValue::Vec4Mut(id),
        other => other.clone(),
    }
}

impl Universe {
    // =========================================================================
    // LOOKUP
    // =========================================================================

    /// Typed handle for `id` if it is a variable
    pub fn variable(&self, id: EntityId) -> Option<Variable> {
        (self.kind(id)? == EntityKind::Variable).then_some(Variable::from_id(id))
    }

    /// Variable named `name` owned by `owner`
    pub fn get_variable(&self, owner: EntityId, name: &str) -> Option<Variable> {
        self.entities
            .get(owner)?
            .variables
            .get(name)
            .map(Variable::from_id)
    }

    pub fn has_variable(&self, owner: EntityId, name: &str) -> bool {
        self.get_variable(owner, name).is_some()
    }

    /// Entity that owns `variable`
    pub fn owner(&self, variable: Variable) -> Option<EntityId> {
        self.parent(variable.id)
    }

    fn variable_data(&self, variable: Variable) -> Result<&VariableData> {
        self.node(variable.id)?
            .data
            .as_variable()
            .ok_or(OntologyError::NotAVariable)
    }

    fn variable_data_mut(&mut self, variable: Variable) -> Result<&mut VariableData> {
        self.node_mut(variable.id)?
            .data
            .as_variable_mut()
            .ok_or(OntologyError::NotAVariable)
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// Current value: the read callback's result if one is bound, otherwise
    /// the stored value
    pub fn get(&self, variable: Variable) -> Option<TypedValue> {
        let node = self.entities.get(variable.id)?;
        let data = node.data.as_variable()?;
        match &data.read {
            Some(read) => read(self, node.parent?),
            None => Some(data.value.clone()),
        }
    }

    /// Stored value, bypassing any read callback
    pub fn stored_value(&self, variable: Variable) -> Option<&TypedValue> {
        self.entities
            .get(variable.id)?
            .data
            .as_variable()
            .map(|data| &data.value)
    }

    /// Value of the variable `name` owned by `owner`
    pub fn get_variable_value(&self, owner: EntityId, name: &str) -> Option<TypedValue> {
        self.get(self.get_variable(owner, name)?)
    }

    /// Render a value for display, dereferencing borrowed vectors and entities
    pub fn format_value(&self, value: &TypedValue) -> String {
        if let Some(id) = value.as_vector() {
            return match self.vectors.get(id) {
                Ok(components) => {
                    let components: Vec<String> =
                        components.iter().map(|c| format!("{c:.6}")).collect();
                    format!("[{}]", components.join(", "))
                }
                Err(error) => format!("<{error}>"),
            };
        }
        match value.as_entity() {
            Some(entity) => self.display_name(entity.id),
            None => value.to_string(),
        }
    }

    // =========================================================================
    // WRITE
    // =========================================================================

    /// Whether writes to `variable` should be silently dropped
    fn is_dead_variable(&self, variable: Variable) -> Result<bool> {
        let node = self.node(variable.id)?;
        node.data.as_variable().ok_or(OntologyError::NotAVariable)?;
        Ok(!node.alive)
    }

    /// Replace the stored value and slot ownership
    fn store(
        &mut self,
        variable: Variable,
        value: TypedValue,
        owned: Option<VectorId>,
    ) -> Result<()> {
        let data = self.variable_data_mut(variable)?;
        data.value = value;
        let previous = std::mem::replace(&mut data.owned_vector, owned);
        if let Some(previous) = previous.filter(|previous| Some(*previous) != owned) {
            self.vectors.remove(previous);
        }
        Ok(())
    }

    /// Deep write: borrowed vectors are copied into a slot owned by the
    /// variable, then the activation callback runs
    ///
    /// Writes to a dead variable are ignored.
    pub fn set(&mut self, variable: Variable, value: TypedValue) -> Result<()> {
        if self.is_dead_variable(variable)? {
            return Ok(());
        }

        let (value, owned) = match value.as_vector() {
            Some(source) => {
                let copy = self.vectors.duplicate(source)?;
                (rebind_vector(&value, copy), Some(copy))
            }
            None => (value, None),
        };

        self.store(variable, value, owned)?;
        self.activate_variable(variable);
        Ok(())
    }

    /// Shallow write: the value is stored as given, so a borrowed vector keeps
    /// pointing at the caller's referent, then the activation callback runs
    ///
    /// Writes to a dead variable are ignored.
    pub fn set_shallow(&mut self, variable: Variable, value: TypedValue) -> Result<()> {
        if self.is_dead_variable(variable)? {
            return Ok(());
        }

        let owned = self
            .variable_data(variable)?
            .owned_vector
            .filter(|owned| value.as_vector() == Some(*owned));

        self.store(variable, value, owned)?;
        self.activate_variable(variable);
        Ok(())
    }

    /// Parse `text` into the stored variant, then run the activation callback
    ///
    /// On parse failure the stored value is unchanged and the callback does
    /// not run. Writes to a dead variable are ignored.
    pub fn set_str(&mut self, variable: Variable, text: &str) -> Result<()> {
        if self.is_dead_variable(variable)? {
            return Ok(());
        }

        let data = self.variable_data(variable)?;
        let mut value = data.value.clone();
        let owned = data.owned_vector;

        self.assign_from_str(&mut value, text)?;
        self.store(variable, value, owned)?;
        self.activate_variable(variable);
        Ok(())
    }

    /// Universe-aware [`TypedValue::set_new_value`]
    ///
    /// Mutable vector borrows write through to their referent and entity
    /// borrows are rebound to the entity with global name `text`, if its kind
    /// fits. Every other variant is re-parsed in place. On failure `value` and
    /// any referent are unchanged.
    pub fn assign_from_str(&mut self, value: &mut TypedValue, text: &str) -> Result<()> {
        let datatype = value.get_datatype();
        let failure = || OntologyError::ParseFailure {
            input: text.to_string(),
            datatype: datatype.to_string(),
        };

        match value {
            TypedValue::Vec3Mut(id) | TypedValue::Vec4Mut(id) => {
                let id = *id;
                let expected = self.vectors.get(id)?.len();
                let components = parse_vec(text, parse_f32)
                    .filter(|components| components.len() == expected)
                    .ok_or_else(failure)?;
                self.vectors.write(id, &components)
            }
            TypedValue::Vec3Ref(_) | TypedValue::Vec4Ref(_) => Err(OntologyError::TypeMismatch {
                expected: "mutable vector".to_string(),
                found: datatype.to_string(),
            }),
            TypedValue::Entity(entity) => {
                let target = self
                    .lookup(text)
                    .ok_or_else(|| OntologyError::NotFound(text.to_string()))?;
                let kind = self.live_node(target)?.kind;
                if !entity.kind.accepts(kind) {
                    return Err(OntologyError::TypeMismatch {
                        expected: entity.kind.datatype().to_string(),
                        found: kind.type_tag().to_string(),
                    });
                }
                entity.id = target;
                Ok(())
            }
            other => {
                if other.set_new_value(text) {
                    Ok(())
                } else {
                    Err(failure())
                }
            }
        }
    }

    /// Run the activation callback of `variable`, if any
    pub fn activate_variable(&mut self, variable: Variable) {
        let Some(node) = self.entities.get(variable.id) else {
            return;
        };
        if !node.alive {
            return;
        }
        let callback = node.data.as_variable().and_then(|data| data.activate.clone());
        if let (Some(owner), Some(callback)) = (node.parent, callback) {
            callback(self, owner, variable);
        }
    }
}
