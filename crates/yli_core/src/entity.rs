//! Entity records
//!
//! Every engine object is an [`EntityNode`] stored in the universe arena and
//! addressed by a generational [`EntityId`]. The node carries the generic
//! bookkeeping (names, parent, children, variables, alive flag) while the
//! kind-specific state lives in the closed [`EntityData`] enum. Behaviour that
//! differs per kind is a `match` on that enum.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashMap;
use slotmap::new_key_type;
use smallvec::SmallVec;

use crate::lisp::ErasedOverload;
use crate::registry::Registry;
use crate::value::TypedValue;
use crate::variable::{ActivateCallback, ReadCallback};
use crate::vector::VectorId;

new_key_type! {
    /// Generational handle to an entity
    pub struct EntityId;
}

/// Process-wide entity numbering, shared by every universe
static NEXT_ENTITY_NUMBER: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_entity_number() -> u64 {
    NEXT_ENTITY_NUMBER.fetch_add(1, Ordering::Relaxed)
}

// =============================================================================
// KINDS
// =============================================================================

/// Concrete kind of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Universe,
    Ecosystem,
    Scene,
    Pipeline,
    Material,
    Species,
    Object,
    Symbiosis,
    Holobiont,
    Font2d,
    Text2d,
    VectorFont,
    Text3d,
    Console,
    ComputeTask,
    Variable,
    LispFunction,
    LispFunctionOverload,
}

impl EntityKind {
    pub const ALL: [EntityKind; 18] = [
        EntityKind::Universe,
        EntityKind::Ecosystem,
        EntityKind::Scene,
        EntityKind::Pipeline,
        EntityKind::Material,
        EntityKind::Species,
        EntityKind::Object,
        EntityKind::Symbiosis,
        EntityKind::Holobiont,
        EntityKind::Font2d,
        EntityKind::Text2d,
        EntityKind::VectorFont,
        EntityKind::Text3d,
        EntityKind::Console,
        EntityKind::ComputeTask,
        EntityKind::Variable,
        EntityKind::LispFunction,
        EntityKind::LispFunctionOverload,
    ];

    /// Type tag for diagnostics
    pub fn type_tag(self) -> &'static str {
        match self {
            EntityKind::Universe => "Universe",
            EntityKind::Ecosystem => "Ecosystem",
            EntityKind::Scene => "Scene",
            EntityKind::Pipeline => "Pipeline",
            EntityKind::Material => "Material",
            EntityKind::Species => "Species",
            EntityKind::Object => "Object",
            EntityKind::Symbiosis => "Symbiosis",
            EntityKind::Holobiont => "Holobiont",
            EntityKind::Font2d => "Font2d",
            EntityKind::Text2d => "Text2d",
            EntityKind::VectorFont => "VectorFont",
            EntityKind::Text3d => "Text3d",
            EntityKind::Console => "Console",
            EntityKind::ComputeTask => "ComputeTask",
            EntityKind::Variable => "Variable",
            EntityKind::LispFunction => "LispFunction",
            EntityKind::LispFunctionOverload => "LispFunctionOverload",
        }
    }

    /// Look up a kind by type tag, ignoring ASCII case
    pub fn from_tag(tag: &str) -> Option<EntityKind> {
        static KINDS: OnceLock<FxHashMap<String, EntityKind>> = OnceLock::new();
        KINDS
            .get_or_init(|| {
                EntityKind::ALL
                    .iter()
                    .map(|kind| (kind.type_tag().to_ascii_lowercase(), *kind))
                    .collect()
            })
            .get(&tag.to_ascii_lowercase())
            .copied()
    }

    /// Objects, holobionts and 3D texts have coordinates and speed
    pub fn is_movable(self) -> bool {
        matches!(
            self,
            EntityKind::Object | EntityKind::Holobiont | EntityKind::Text3d
        )
    }
}

/// Kind of a borrowed entity reference in a [`TypedValue`]
///
/// Most variants name exactly one [`EntityKind`]; `Entity` accepts anything
/// and `Movable` accepts every movable kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Entity,
    Movable,
    Universe,
    Ecosystem,
    Scene,
    Pipeline,
    Material,
    Species,
    Object,
    Symbiosis,
    Holobiont,
    Font2d,
    Text2d,
    VectorFont,
    Text3d,
    Console,
    ComputeTask,
}

impl RefKind {
    /// Whether an entity of `kind` may be held by a reference of this kind
    pub fn accepts(self, kind: EntityKind) -> bool {
        match self {
            RefKind::Entity => true,
            RefKind::Movable => kind.is_movable(),
            exact => RefKind::exact(kind) == Some(exact),
        }
    }

    /// The most specific reference kind for an entity kind
    pub fn exact(kind: EntityKind) -> Option<RefKind> {
        Some(match kind {
            EntityKind::Universe => RefKind::Universe,
            EntityKind::Ecosystem => RefKind::Ecosystem,
            EntityKind::Scene => RefKind::Scene,
            EntityKind::Pipeline => RefKind::Pipeline,
            EntityKind::Material => RefKind::Material,
            EntityKind::Species => RefKind::Species,
            EntityKind::Object => RefKind::Object,
            EntityKind::Symbiosis => RefKind::Symbiosis,
            EntityKind::Holobiont => RefKind::Holobiont,
            EntityKind::Font2d => RefKind::Font2d,
            EntityKind::Text2d => RefKind::Text2d,
            EntityKind::VectorFont => RefKind::VectorFont,
            EntityKind::Text3d => RefKind::Text3d,
            EntityKind::Console => RefKind::Console,
            EntityKind::ComputeTask => RefKind::ComputeTask,
            EntityKind::Variable
            | EntityKind::LispFunction
            | EntityKind::LispFunctionOverload => return None,
        })
    }

    /// Type tag of a value holding this reference
    pub fn datatype(self) -> &'static str {
        match self {
            RefKind::Entity => "&Entity",
            RefKind::Movable => "&Movable",
            RefKind::Universe => "&Universe",
            RefKind::Ecosystem => "&Ecosystem",
            RefKind::Scene => "&Scene",
            RefKind::Pipeline => "&Pipeline",
            RefKind::Material => "&Material",
            RefKind::Species => "&Species",
            RefKind::Object => "&Object",
            RefKind::Symbiosis => "&Symbiosis",
            RefKind::Holobiont => "&Holobiont",
            RefKind::Font2d => "&Font2d",
            RefKind::Text2d => "&Text2d",
            RefKind::VectorFont => "&VectorFont",
            RefKind::Text3d => "&Text3d",
            RefKind::Console => "&Console",
            RefKind::ComputeTask => "&ComputeTask",
        }
    }
}

// =============================================================================
// KIND-SPECIFIC STATE
// =============================================================================

/// Position and speed of a movable entity
#[derive(Debug, Clone, Copy)]
pub struct MovableData {
    /// 3-component vector in the universe vector store
    pub coordinates: VectorId,
    pub speed: f32,
}

/// A biont follows its holobiont at a fixed offset
#[derive(Debug, Clone, Copy)]
pub struct Biont {
    pub offset: [f32; 3],
    pub coordinates: VectorId,
}

#[derive(Debug, Clone)]
pub struct HolobiontData {
    pub movable: MovableData,
    pub bionts: SmallVec<[Biont; 4]>,
}

#[derive(Debug, Clone, Default)]
pub struct SceneData {
    pub is_flight_mode_in_use: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SpeciesData {
    pub planet_radius: f32,
}

/// Console geometry and text buffers
#[derive(Debug, Clone)]
pub struct ConsoleData {
    pub top_y: u32,
    pub bottom_y: u32,
    pub left_x: u32,
    pub right_x: u32,
    pub prompt: String,
    pub output: Vec<String>,
    pub history: Vec<String>,
}

impl Default for ConsoleData {
    fn default() -> Self {
        Self {
            top_y: 9,
            bottom_y: 23,
            left_x: 0,
            right_x: 39,
            prompt: "$ ".to_string(),
            output: Vec::new(),
            history: Vec::new(),
        }
    }
}

/// Payload and callbacks of a variable
#[derive(Clone, Default)]
pub struct VariableData {
    pub value: TypedValue,
    /// Slot allocated by a deep `set`, freed when replaced
    pub(crate) owned_vector: Option<VectorId>,
    pub activate: Option<ActivateCallback>,
    pub read: Option<ReadCallback>,
}

/// One native overload of a command
#[derive(Clone)]
pub struct OverloadData {
    pub function: Arc<dyn ErasedOverload>,
}

/// Kind-specific state of an entity
#[derive(Clone)]
pub enum EntityData {
    Universe,
    /// Kinds with no state beyond the generic node
    Plain,
    Scene(SceneData),
    Species(SpeciesData),
    Movable(MovableData),
    Holobiont(HolobiontData),
    Console(ConsoleData),
    Variable(VariableData),
    LispFunction,
    Overload(OverloadData),
}

impl EntityData {
    /// Default state for a freshly created entity of `kind`
    ///
    /// Movable kinds need a vector slot and are built by the factory instead.
    pub(crate) fn default_for(kind: EntityKind) -> Option<EntityData> {
        Some(match kind {
            EntityKind::Universe => EntityData::Universe,
            EntityKind::Scene => EntityData::Scene(SceneData::default()),
            EntityKind::Species => EntityData::Species(SpeciesData::default()),
            EntityKind::Console => EntityData::Console(ConsoleData::default()),
            EntityKind::Variable => EntityData::Variable(VariableData::default()),
            EntityKind::LispFunction => EntityData::LispFunction,
            EntityKind::Ecosystem
            | EntityKind::Pipeline
            | EntityKind::Material
            | EntityKind::Symbiosis
            | EntityKind::Font2d
            | EntityKind::Text2d
            | EntityKind::VectorFont
            | EntityKind::ComputeTask => EntityData::Plain,
            EntityKind::Object
            | EntityKind::Holobiont
            | EntityKind::Text3d
            | EntityKind::LispFunctionOverload => return None,
        })
    }

    pub fn as_movable(&self) -> Option<&MovableData> {
        match self {
            EntityData::Movable(movable) => Some(movable),
            EntityData::Holobiont(holobiont) => Some(&holobiont.movable),
            _ => None,
        }
    }

    pub fn as_movable_mut(&mut self) -> Option<&mut MovableData> {
        match self {
            EntityData::Movable(movable) => Some(movable),
            EntityData::Holobiont(holobiont) => Some(&mut holobiont.movable),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&VariableData> {
        match self {
            EntityData::Variable(variable) => Some(variable),
            _ => None,
        }
    }

    pub fn as_variable_mut(&mut self) -> Option<&mut VariableData> {
        match self {
            EntityData::Variable(variable) => Some(variable),
            _ => None,
        }
    }

    pub fn as_console(&self) -> Option<&ConsoleData> {
        match self {
            EntityData::Console(console) => Some(console),
            _ => None,
        }
    }

    pub fn as_console_mut(&mut self) -> Option<&mut ConsoleData> {
        match self {
            EntityData::Console(console) => Some(console),
            _ => None,
        }
    }

    /// Vector slots owned by this entity, freed on destruction
    pub(crate) fn owned_vectors(&self) -> SmallVec<[VectorId; 4]> {
        let mut vectors = SmallVec::new();
        match self {
            EntityData::Movable(movable) => vectors.push(movable.coordinates),
            EntityData::Holobiont(holobiont) => {
                vectors.push(holobiont.movable.coordinates);
                vectors.extend(holobiont.bionts.iter().map(|biont| biont.coordinates));
            }
            EntityData::Variable(variable) => vectors.extend(variable.owned_vector),
            _ => {}
        }
        vectors
    }
}

// =============================================================================
// NODE
// =============================================================================

/// Arena record of one entity
#[derive(Clone)]
pub struct EntityNode {
    pub(crate) kind: EntityKind,
    pub(crate) alive: bool,
    /// Assigned when bound into a universe; zero until then
    pub(crate) number: u64,
    pub(crate) parent: Option<EntityId>,
    pub(crate) local_name: String,
    pub(crate) global_name: String,
    /// Non-variable children by local name
    pub(crate) registry: Registry,
    /// Non-variable children in creation order
    pub(crate) children: SmallVec<[EntityId; 8]>,
    /// Variable children by local name
    pub(crate) variables: Registry,
    /// Variable children in creation order, named or not
    pub(crate) variable_children: SmallVec<[EntityId; 8]>,
    pub(crate) data: EntityData,
}

impl EntityNode {
    pub(crate) fn new(kind: EntityKind, parent: Option<EntityId>, data: EntityData) -> Self {
        Self {
            kind,
            alive: true,
            number: 0,
            parent,
            local_name: String::new(),
            global_name: String::new(),
            registry: Registry::new(),
            children: SmallVec::new(),
            variables: Registry::new(),
            variable_children: SmallVec::new(),
            data,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn global_name(&self) -> &str {
        &self.global_name
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn variables(&self) -> &Registry {
        &self.variables
    }

    pub fn data(&self) -> &EntityData {
        &self.data
    }

    pub fn type_tag(&self) -> &'static str {
        self.kind.type_tag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_tag(kind.type_tag()), Some(kind));
        }
        assert_eq!(EntityKind::from_tag("scene"), Some(EntityKind::Scene));
        assert_eq!(EntityKind::from_tag("Biont"), None);
    }

    #[test]
    fn test_ref_kind_accepts() {
        assert!(RefKind::Entity.accepts(EntityKind::Variable));
        assert!(RefKind::Movable.accepts(EntityKind::Object));
        assert!(RefKind::Movable.accepts(EntityKind::Holobiont));
        assert!(RefKind::Movable.accepts(EntityKind::Text3d));
        assert!(!RefKind::Movable.accepts(EntityKind::Scene));
        assert!(RefKind::Scene.accepts(EntityKind::Scene));
        assert!(!RefKind::Scene.accepts(EntityKind::Species));
        assert!(!RefKind::Console.accepts(EntityKind::LispFunction));
    }

    #[test]
    fn test_entity_numbers_are_unique() {
        let a = next_entity_number();
        let b = next_entity_number();
        assert!(b > a);
    }

    #[test]
    fn test_new_node_is_alive_and_unnamed() {
        let node = EntityNode::new(EntityKind::Scene, None, EntityData::Plain);
        assert!(node.is_alive());
        assert_eq!(node.local_name(), "");
        assert_eq!(node.global_name(), "");
        assert_eq!(node.number(), 0);
        assert_eq!(node.type_tag(), "Scene");
    }
}
