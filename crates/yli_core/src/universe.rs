//! The universe: root entity and owner of every entity
//!
//! [`Universe`] owns the entity arena, the vector store and the engine state
//! that built-in activation callbacks write to. The root entity's registry is
//! the global name scope; every other entity's registry is its local scope.
//!
//! Naming rules:
//! - local names are unique within the parent's registry (variables use the
//!   parent's separate variable registry)
//! - global names are unique within the root registry
//! - a non-variable child of the root has one name: setting either the local
//!   or the global name sets both

use slotmap::SlotMap;
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::entity::{next_entity_number, EntityData, EntityId, EntityKind, EntityNode};
use crate::error::{OntologyError, Result};
use crate::registry::is_valid_name;
use crate::vector::{VectorId, VectorStore};

/// Engine state written by the built-in activation callbacks
#[derive(Debug, Clone, PartialEq)]
pub struct UniverseState {
    pub speed: f32,
    pub turbo_factor: f32,
    pub twin_turbo_factor: f32,
    pub mouse_speed: f32,
    pub window_width: u32,
    pub window_height: u32,
    pub framebuffer_width: u32,
    pub framebuffer_height: u32,
    /// RGBA
    pub background_color: [f32; 4],
    pub wireframe: bool,
    pub active_scene: Option<EntityId>,
    pub active_console: Option<EntityId>,
    /// Set by the quit commands; polled by the front-end
    pub exit_requested: bool,
}

impl Default for UniverseState {
    fn default() -> Self {
        Self {
            speed: 5.0,
            turbo_factor: 100.0,
            twin_turbo_factor: 100.0,
            mouse_speed: 0.1,
            window_width: 1600,
            window_height: 900,
            framebuffer_width: 1600,
            framebuffer_height: 900,
            background_color: [0.0, 0.0, 1.0, 0.0],
            wireframe: false,
            active_scene: None,
            active_console: None,
            exit_requested: false,
        }
    }
}

/// Statistics about the universe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniverseStats {
    pub entity_count: usize,
    pub alive_count: usize,
    pub variable_count: usize,
    pub global_name_count: usize,
    pub vector_count: usize,
}

/// Root of the ontology
pub struct Universe {
    pub(crate) entities: SlotMap<EntityId, EntityNode>,
    pub(crate) vectors: VectorStore,
    root: EntityId,
    camera: VectorId,
    pub state: UniverseState,
}

impl Universe {
    /// Create an empty universe with only the root entity
    pub fn new() -> Self {
        let mut entities = SlotMap::with_key();
        let mut root_node = EntityNode::new(EntityKind::Universe, None, EntityData::Universe);
        root_node.number = next_entity_number();
        let root = entities.insert(root_node);

        let mut vectors = VectorStore::new();
        let camera = vectors.insert(&[0.0; 3]);

        debug!("created universe");
        Self {
            entities,
            vectors,
            root,
            camera,
            state: UniverseState::default(),
        }
    }

    /// Create a universe with the standard universe-level variables
    pub fn with_default_variables() -> Result<Self> {
        let mut universe = Self::new();
        universe.create_default_variables()?;
        Ok(universe)
    }

    pub fn root(&self) -> EntityId {
        self.root
    }

    /// Camera position, a 3-component vector in the vector store
    pub fn camera(&self) -> VectorId {
        self.camera
    }

    pub fn camera_coordinates(&self) -> [f32; 3] {
        self.vectors.get3(self.camera).unwrap_or_default()
    }

    pub fn vectors(&self) -> &VectorStore {
        &self.vectors
    }

    pub fn vectors_mut(&mut self) -> &mut VectorStore {
        &mut self.vectors
    }

    // =========================================================================
    // BINDING AND ACCESS
    // =========================================================================

    /// Register a new entity in the arena and give it a process-unique number
    ///
    /// # Panics
    ///
    /// Panics if the node already carries a number, i.e. it was bound before.
    pub fn bind_to_universe(&mut self, mut node: EntityNode) -> EntityId {
        assert_eq!(node.number, 0, "entity is already bound to a universe");
        node.number = next_entity_number();
        let kind = node.kind;
        let id = self.entities.insert(node);
        debug!(kind = kind.type_tag(), "bound entity");
        id
    }

    pub fn entity(&self, id: EntityId) -> Option<&EntityNode> {
        self.entities.get(id)
    }

    pub(crate) fn node(&self, id: EntityId) -> Result<&EntityNode> {
        self.entities.get(id).ok_or(OntologyError::StaleHandle)
    }

    pub(crate) fn node_mut(&mut self, id: EntityId) -> Result<&mut EntityNode> {
        self.entities.get_mut(id).ok_or(OntologyError::StaleHandle)
    }

    /// Live node, or the error explaining why not
    pub(crate) fn live_node(&self, id: EntityId) -> Result<&EntityNode> {
        let node = self.node(id)?;
        if !node.alive {
            return Err(OntologyError::DeadEntity);
        }
        Ok(node)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.get(id).is_some_and(|node| node.alive)
    }

    pub fn kind(&self, id: EntityId) -> Option<EntityKind> {
        self.entities.get(id).map(|node| node.kind)
    }

    pub fn type_tag(&self, id: EntityId) -> Option<&'static str> {
        self.kind(id).map(EntityKind::type_tag)
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.entities.get(id).and_then(|node| node.parent)
    }

    pub fn local_name(&self, id: EntityId) -> Option<&str> {
        self.entities.get(id).map(|node| node.local_name.as_str())
    }

    pub fn global_name(&self, id: EntityId) -> Option<&str> {
        self.entities.get(id).map(|node| node.global_name.as_str())
    }

    /// Global name, else local name, else the type tag
    pub fn display_name(&self, id: EntityId) -> String {
        match self.entities.get(id) {
            Some(node) if !node.global_name.is_empty() => node.global_name.clone(),
            Some(node) if !node.local_name.is_empty() => node.local_name.clone(),
            Some(node) => format!("<{}>", node.kind.type_tag()),
            None => "<stale>".to_string(),
        }
    }

    /// Non-variable children in creation order
    pub fn children(&self, id: EntityId) -> Vec<EntityId> {
        self.entities
            .get(id)
            .map(|node| node.children.to_vec())
            .unwrap_or_default()
    }

    /// Variable children in creation order
    pub fn variable_children(&self, id: EntityId) -> Vec<EntityId> {
        self.entities
            .get(id)
            .map(|node| node.variable_children.to_vec())
            .unwrap_or_default()
    }

    pub fn number_of_children(&self, id: EntityId) -> usize {
        self.entities.get(id).map_or(0, |node| node.children.len())
    }

    /// Non-variable descendants at any depth
    pub fn number_of_descendants(&self, id: EntityId) -> usize {
        self.entities.get(id).map_or(0, |node| {
            node.children
                .iter()
                .map(|child| 1 + self.number_of_descendants(*child))
                .sum()
        })
    }

    /// Global names, space separated
    pub fn entity_names(&self) -> String {
        self.entities
            .get(self.root)
            .map(|root| root.registry.names_joined())
            .unwrap_or_default()
    }

    // =========================================================================
    // NAMING
    // =========================================================================

    /// Rename an entity within its parent's scope
    ///
    /// For non-variable children of the root this also sets the global name.
    pub fn set_local_name(&mut self, id: EntityId, name: &str) -> Result<()> {
        let node = self.live_node(id)?;
        if !is_valid_name(name) {
            return Err(OntologyError::InvalidName(name.to_string()));
        }
        let parent = node.parent.ok_or(OntologyError::NoParent)?;
        let is_variable = node.kind == EntityKind::Variable;
        let unchanged = node.local_name == name;

        if parent == self.root && !is_variable {
            return self.set_global_name(id, name);
        }
        if unchanged {
            return Ok(());
        }

        let parent_node = self.node(parent)?;
        let scope = if is_variable {
            &parent_node.variables
        } else {
            &parent_node.registry
        };
        if scope.contains(name) {
            return Err(OntologyError::DuplicateName(name.to_string()));
        }

        let old_name = std::mem::replace(&mut self.node_mut(id)?.local_name, name.to_string());
        let parent_node = self.node_mut(parent)?;
        let scope = if is_variable {
            &mut parent_node.variables
        } else {
            &mut parent_node.registry
        };
        if !old_name.is_empty() {
            scope.erase(&old_name);
        }
        scope.add(name, id);

        debug!(old = %old_name, new = %name, "set local name");
        Ok(())
    }

    /// Rename an entity within the global scope
    ///
    /// For non-variable children of the root this also sets the local name.
    pub fn set_global_name(&mut self, id: EntityId, name: &str) -> Result<()> {
        let node = self.live_node(id)?;
        if !is_valid_name(name) {
            return Err(OntologyError::InvalidName(name.to_string()));
        }
        if node.global_name == name {
            return Ok(());
        }
        let in_root_scope = node.parent == Some(self.root) && node.kind != EntityKind::Variable;

        let root = self.root;
        if self.node(root)?.registry.contains(name) {
            return Err(OntologyError::DuplicateName(name.to_string()));
        }

        let node = self.node_mut(id)?;
        let old_name = std::mem::replace(&mut node.global_name, name.to_string());
        if in_root_scope {
            node.local_name = name.to_string();
        }

        let root_node = self.node_mut(root)?;
        if !old_name.is_empty() {
            root_node.registry.erase(&old_name);
        }
        root_node.registry.add(name, id);

        debug!(old = %old_name, new = %name, "set global name");
        Ok(())
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    /// Resolve a (possibly dotted) name in the scope of `scope`
    pub fn get_entity(&self, scope: EntityId, path: &str) -> Option<EntityId> {
        let node = self.entities.get(scope)?;
        node.registry.resolve(path, |id| {
            self.entities.get(id).map(|child| &child.registry)
        })
    }

    /// Resolve a (possibly dotted) global name
    pub fn lookup(&self, path: &str) -> Option<EntityId> {
        self.get_entity(self.root, path)
    }

    pub fn has_child(&self, scope: EntityId, name: &str) -> bool {
        self.get_entity(scope, name).is_some()
    }

    /// Bind `name` to `entity` in the registry of `scope`
    pub fn add_entity(&mut self, scope: EntityId, name: &str, entity: EntityId) -> bool {
        self.entities
            .get_mut(scope)
            .is_some_and(|node| node.registry.add(name, entity))
    }

    /// Remove `name` from the registry of `scope`
    pub fn erase_entity(&mut self, scope: EntityId, name: &str) -> bool {
        self.entities
            .get_mut(scope)
            .is_some_and(|node| node.registry.erase(name))
    }

    /// Whether `id` is `ancestor` or lies below it
    pub fn is_descendant_of(&self, id: EntityId, ancestor: EntityId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Move an entity under `new_parent`, keeping its local name
    ///
    /// Fails if the local name is already taken in the new parent's scope.
    /// Becoming a child of the root makes the global name equal to the local
    /// name; leaving the root keeps the global name.
    pub fn bind_to_new_parent(&mut self, id: EntityId, new_parent: EntityId) -> Result<()> {
        let node = self.live_node(id)?;
        let old_parent = node.parent.ok_or(OntologyError::NoParent)?;
        let is_variable = node.kind == EntityKind::Variable;
        let local_name = node.local_name.clone();
        let global_name = node.global_name.clone();

        let parent_kind = self.live_node(new_parent)?.kind;
        if parent_kind == EntityKind::Variable {
            return Err(OntologyError::TypeMismatch {
                expected: "an entity that can own children".to_string(),
                found: parent_kind.type_tag().to_string(),
            });
        }
        if self.is_descendant_of(new_parent, id) {
            return Err(OntologyError::CyclicParent);
        }
        if new_parent == old_parent {
            return Ok(());
        }

        let root = self.root;
        let to_root = new_parent == root && !is_variable;
        let from_root = old_parent == root && !is_variable;
        let name = if to_root && local_name.is_empty() {
            global_name.clone()
        } else {
            local_name.clone()
        };

        if !name.is_empty() {
            let parent_node = self.node(new_parent)?;
            let scope = if is_variable {
                &parent_node.variables
            } else {
                &parent_node.registry
            };
            if scope.get(&name).is_some_and(|owner| owner != id) {
                return Err(OntologyError::DuplicateName(name));
            }
        }

        // The root registry entry of a root child doubles as its global name.
        let old_parent_node = self.node_mut(old_parent)?;
        let (scope, siblings) = if is_variable {
            (&mut old_parent_node.variables, &mut old_parent_node.variable_children)
        } else {
            (&mut old_parent_node.registry, &mut old_parent_node.children)
        };
        if !from_root && !local_name.is_empty() && scope.get(&local_name) == Some(id) {
            scope.erase(&local_name);
        }
        siblings.retain(|sibling| *sibling != id);

        let new_parent_node = self.node_mut(new_parent)?;
        let (scope, siblings) = if is_variable {
            (&mut new_parent_node.variables, &mut new_parent_node.variable_children)
        } else {
            (&mut new_parent_node.registry, &mut new_parent_node.children)
        };
        siblings.push(id);
        if !name.is_empty() {
            scope.add(&name, id);
        }

        if to_root && name != global_name {
            let root_node = self.node_mut(root)?;
            if !global_name.is_empty() && root_node.registry.get(&global_name) == Some(id) {
                root_node.registry.erase(&global_name);
            }
        }

        let node = self.node_mut(id)?;
        node.parent = Some(new_parent);
        if to_root {
            node.local_name = name.clone();
            node.global_name = name;
        }

        debug!(kind = node.kind.type_tag(), "bound entity to new parent");
        Ok(())
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Mark an entity dead. Idempotent.
    pub fn terminate(&mut self, id: EntityId) {
        if let Some(node) = self.entities.get_mut(id) {
            node.alive = false;
        }
    }

    /// Tear down an entity and everything it owns
    ///
    /// Order: terminate, destroy children, erase the local name, release owned
    /// vectors, erase the global name, remove from the arena. The root is
    /// emptied but stays in the arena.
    pub fn destroy_entity(&mut self, id: EntityId) -> Result<()> {
        self.node(id)?;
        self.terminate(id);

        let owned: SmallVec<[EntityId; 16]> = {
            let node = self.node(id)?;
            node.children
                .iter()
                .chain(node.variable_children.iter())
                .copied()
                .collect()
        };
        for child in owned {
            if let Err(error) = self.destroy_entity(child) {
                warn!(%error, "failed to destroy child entity");
            }
        }

        let root = self.root;
        let node = self.node(id)?;
        let parent = node.parent;
        let is_variable = node.kind == EntityKind::Variable;
        let local_name = node.local_name.clone();
        let global_name = node.global_name.clone();
        let vectors = node.data.owned_vectors();

        if let Some(parent_node) = parent.and_then(|parent| self.entities.get_mut(parent)) {
            let (scope, siblings) = if is_variable {
                (&mut parent_node.variables, &mut parent_node.variable_children)
            } else {
                (&mut parent_node.registry, &mut parent_node.children)
            };
            if !local_name.is_empty() && scope.get(&local_name) == Some(id) {
                scope.erase(&local_name);
            }
            siblings.retain(|sibling| *sibling != id);
        }

        for vector in vectors {
            self.vectors.remove(vector);
        }

        if !global_name.is_empty() {
            let root_node = self.node_mut(root)?;
            if root_node.registry.get(&global_name) == Some(id) {
                root_node.registry.erase(&global_name);
            }
        }

        if self.state.active_scene == Some(id) {
            self.state.active_scene = None;
        }
        if self.state.active_console == Some(id) {
            self.state.active_console = None;
        }

        if id != root {
            self.entities.remove(id);
        }
        debug!(name = %global_name, "destroyed entity");
        Ok(())
    }

    /// Make a scene or console the active one
    pub fn activate_entity(&mut self, id: EntityId) -> Result<()> {
        match self.live_node(id)?.kind {
            EntityKind::Scene => self.state.active_scene = Some(id),
            EntityKind::Console => self.state.active_console = Some(id),
            other => {
                return Err(OntologyError::TypeMismatch {
                    expected: "Scene or Console".to_string(),
                    found: other.type_tag().to_string(),
                })
            }
        }
        Ok(())
    }

    // =========================================================================
    // MOVABLES
    // =========================================================================

    /// Coordinates of a movable entity
    pub fn coordinates(&self, id: EntityId) -> Option<[f32; 3]> {
        let movable = self.entities.get(id)?.data.as_movable()?;
        self.vectors.get3(movable.coordinates).ok()
    }

    /// Move a movable entity; holobionts drag their bionts along
    pub fn set_coordinates(&mut self, id: EntityId, coordinates: [f32; 3]) -> Result<()> {
        let node = self.node(id)?;
        let target = node
            .data
            .as_movable()
            .map(|movable| movable.coordinates)
            .ok_or_else(|| OntologyError::TypeMismatch {
                expected: "Movable".to_string(),
                found: node.kind.type_tag().to_string(),
            })?;
        self.vectors.write(target, &coordinates)?;
        self.update_bionts(id)
    }

    /// Place every biont of a holobiont at holobiont position plus offset
    pub fn update_bionts(&mut self, id: EntityId) -> Result<()> {
        let EntityData::Holobiont(holobiont) = &self.node(id)?.data else {
            return Ok(());
        };
        let origin = self.vectors.get3(holobiont.movable.coordinates)?;
        let bionts = holobiont.bionts.clone();
        for biont in bionts {
            let position = [
                origin[0] + biont.offset[0],
                origin[1] + biont.offset[1],
                origin[2] + biont.offset[2],
            ];
            self.vectors.write(biont.coordinates, &position)?;
        }
        Ok(())
    }

    // =========================================================================
    // STATS
    // =========================================================================

    pub fn stats(&self) -> UniverseStats {
        UniverseStats {
            entity_count: self.entities.len(),
            alive_count: self.entities.values().filter(|node| node.alive).count(),
            variable_count: self
                .entities
                .values()
                .filter(|node| node.kind == EntityKind::Variable)
                .count(),
            global_name_count: self
                .entities
                .get(self.root)
                .map_or(0, |root| root.registry.len()),
            vector_count: self.vectors.len(),
        }
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::EntityStruct;

    fn scene(universe: &mut Universe, name: &str) -> EntityId {
        universe.create_scene(&EntityStruct::named(name)).unwrap()
    }

    #[test]
    fn test_new_universe() {
        let universe = Universe::new();
        let stats = universe.stats();
        assert_eq!(stats.entity_count, 1);
        assert_eq!(stats.alive_count, 1);
        assert_eq!(stats.vector_count, 1);
        assert_eq!(universe.kind(universe.root()), Some(EntityKind::Universe));
        assert_eq!(universe.parent(universe.root()), None);
    }

    #[test]
    fn test_entity_numbers_increase() {
        let mut universe = Universe::new();
        let a = scene(&mut universe, "a");
        let b = scene(&mut universe, "b");
        let number_a = universe.entity(a).unwrap().number();
        let number_b = universe.entity(b).unwrap().number();
        assert!(number_a > 0);
        assert!(number_b > number_a);
    }

    #[test]
    #[should_panic(expected = "already bound")]
    fn test_double_bind_panics() {
        let mut universe = Universe::new();
        let mut node = EntityNode::new(EntityKind::Ecosystem, None, EntityData::Plain);
        node.number = 7;
        universe.bind_to_universe(node);
    }

    #[test]
    fn test_root_children_keep_names_in_sync() {
        let mut universe = Universe::new();
        let id = scene(&mut universe, "foo");
        assert_eq!(universe.local_name(id), Some("foo"));
        assert_eq!(universe.global_name(id), Some("foo"));

        universe.set_local_name(id, "bar").unwrap();
        assert_eq!(universe.global_name(id), Some("bar"));
        assert_eq!(universe.lookup("foo"), None);
        assert_eq!(universe.lookup("bar"), Some(id));

        universe.set_global_name(id, "baz").unwrap();
        assert_eq!(universe.local_name(id), Some("baz"));
        assert_eq!(universe.stats().global_name_count, 1);
    }

    #[test]
    fn test_local_name_uniqueness() {
        let mut universe = Universe::new();
        let parent = scene(&mut universe, "parent");
        let a = universe
            .create_entity(EntityKind::Material, &EntityStruct::child_of(parent, "a"))
            .unwrap();
        let b = universe
            .create_entity(EntityKind::Material, &EntityStruct::child_of(parent, "b"))
            .unwrap();

        assert_eq!(
            universe.set_local_name(b, "a"),
            Err(OntologyError::DuplicateName("a".to_string()))
        );
        assert_eq!(universe.get_entity(parent, "a"), Some(a));
        assert_eq!(universe.get_entity(parent, "b"), Some(b));

        universe.set_local_name(b, "c").unwrap();
        assert_eq!(universe.get_entity(parent, "b"), None);
        assert_eq!(universe.get_entity(parent, "c"), Some(b));
        // Local names of grandchildren stay out of the global scope.
        assert_eq!(universe.lookup("c"), None);
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        let mut universe = Universe::new();
        let id = scene(&mut universe, "ok");
        for bad in ["", "1abc", "has space", "a.b", "-x"] {
            assert_eq!(
                universe.set_global_name(id, bad),
                Err(OntologyError::InvalidName(bad.to_string()))
            );
        }
        assert_eq!(universe.global_name(id), Some("ok"));
    }

    #[test]
    fn test_root_has_no_local_name() {
        let mut universe = Universe::new();
        let root = universe.root();
        assert_eq!(
            universe.set_local_name(root, "root"),
            Err(OntologyError::NoParent)
        );
    }

    #[test]
    fn test_dotted_path_composition() {
        let mut universe = Universe::new();
        let a = scene(&mut universe, "a");
        let b = universe
            .create_entity(EntityKind::Pipeline, &EntityStruct::child_of(a, "b"))
            .unwrap();
        let c = universe
            .create_entity(EntityKind::Material, &EntityStruct::child_of(b, "c"))
            .unwrap();

        assert_eq!(universe.lookup("a.b.c"), Some(c));
        assert_eq!(universe.get_entity(a, "b.c"), Some(c));

        universe.set_local_name(b, "renamed").unwrap();
        assert_eq!(universe.lookup("a.b.c"), None);
        assert_eq!(universe.get_entity(a, "b.c"), None);
        assert_eq!(universe.lookup("a.renamed.c"), Some(c));
    }

    #[test]
    fn test_terminate_is_idempotent() {
        let mut universe = Universe::new();
        let id = scene(&mut universe, "s");
        universe.terminate(id);
        universe.terminate(id);
        assert!(!universe.is_alive(id));
        assert!(universe.contains(id));
        assert_eq!(
            universe.set_global_name(id, "t"),
            Err(OntologyError::DeadEntity)
        );
    }

    #[test]
    fn test_bind_to_new_parent_moves_child() {
        let mut universe = Universe::new();
        let first = scene(&mut universe, "first");
        let second = scene(&mut universe, "second");
        let material = universe
            .create_entity(EntityKind::Material, &EntityStruct::child_of(first, "stone"))
            .unwrap();

        universe.bind_to_new_parent(material, second).unwrap();
        assert_eq!(universe.parent(material), Some(second));
        assert_eq!(universe.children(first), Vec::<EntityId>::new());
        assert_eq!(universe.children(second), vec![material]);
        assert_eq!(universe.get_entity(first, "stone"), None);
        assert_eq!(universe.lookup("second.stone"), Some(material));
        assert_eq!(universe.local_name(material), Some("stone"));
    }

    #[test]
    fn test_bind_to_new_parent_rejects_taken_name() {
        let mut universe = Universe::new();
        let first = scene(&mut universe, "first");
        let second = scene(&mut universe, "second");
        let stone = universe
            .create_entity(EntityKind::Material, &EntityStruct::child_of(first, "stone"))
            .unwrap();
        let other = universe
            .create_entity(EntityKind::Material, &EntityStruct::child_of(second, "stone"))
            .unwrap();

        assert_eq!(
            universe.bind_to_new_parent(stone, second),
            Err(OntologyError::DuplicateName("stone".to_string()))
        );
        assert_eq!(universe.parent(stone), Some(first));
        assert_eq!(universe.lookup("first.stone"), Some(stone));
        assert_eq!(universe.lookup("second.stone"), Some(other));
        assert_eq!(universe.children(second), vec![other]);
    }

    #[test]
    fn test_bind_to_new_parent_syncs_root_names() {
        let mut universe = Universe::new();
        let root = universe.root();
        let level = scene(&mut universe, "level");
        let ship = universe
            .create_entity(
                EntityKind::Ecosystem,
                &EntityStruct::child_of(level, "ship").with_global_name("flagship"),
            )
            .unwrap();

        // Into the root: the global name follows the local name.
        universe.bind_to_new_parent(ship, root).unwrap();
        assert_eq!(universe.global_name(ship), Some("ship"));
        assert_eq!(universe.lookup("ship"), Some(ship));
        assert_eq!(universe.lookup("flagship"), None);
        assert_eq!(universe.get_entity(level, "ship"), None);

        // Out of the root: the global name stays.
        universe.bind_to_new_parent(ship, level).unwrap();
        assert_eq!(universe.lookup("ship"), Some(ship));
        assert_eq!(universe.lookup("level.ship"), Some(ship));
        assert_eq!(universe.number_of_children(root), 1);
    }

    #[test]
    fn test_bind_to_new_parent_rejects_cycles() {
        let mut universe = Universe::new();
        let level = scene(&mut universe, "level");
        let inner = universe
            .create_entity(EntityKind::Ecosystem, &EntityStruct::child_of(level, "inner"))
            .unwrap();

        assert_eq!(
            universe.bind_to_new_parent(level, inner),
            Err(OntologyError::CyclicParent)
        );
        assert_eq!(
            universe.bind_to_new_parent(level, level),
            Err(OntologyError::CyclicParent)
        );
        assert_eq!(
            universe.bind_to_new_parent(universe.root(), level),
            Err(OntologyError::NoParent)
        );
        assert_eq!(universe.parent(inner), Some(level));
    }

    #[test]
    fn test_bind_variable_to_new_owner() {
        let mut universe = Universe::new();
        let first = scene(&mut universe, "first");
        let second = scene(&mut universe, "second");
        let flag = universe.get_variable(first, "is_flight_mode_in_use").unwrap();

        assert_eq!(
            universe.bind_to_new_parent(flag.id(), second),
            Err(OntologyError::DuplicateName("is_flight_mode_in_use".to_string()))
        );

        universe.set_local_name(flag.id(), "flag").unwrap();
        universe.bind_to_new_parent(flag.id(), second).unwrap();
        assert_eq!(universe.get_variable(second, "flag"), Some(flag));
        assert!(!universe.has_variable(first, "flag"));
        assert_eq!(universe.get_entity(second, "flag"), None);
    }

    #[test]
    fn test_destroy_erases_names_and_children() {
        let mut universe = Universe::new();
        let parent = scene(&mut universe, "parent");
        let child = universe
            .create_object(
                &EntityStruct::child_of(parent, "child").with_global_name("hero"),
                [1.0, 2.0, 3.0],
            )
            .unwrap();
        let vectors_before = universe.stats().vector_count;
        assert!(vectors_before > 1);

        universe.destroy_entity(parent).unwrap();

        assert!(!universe.contains(parent));
        assert!(!universe.contains(child));
        assert_eq!(universe.lookup("parent"), None);
        assert_eq!(universe.lookup("hero"), None);
        assert_eq!(universe.number_of_children(universe.root()), 0);
        let stats = universe.stats();
        assert_eq!(stats.entity_count, 1);
        assert_eq!(stats.vector_count, 1);
        assert_eq!(universe.destroy_entity(parent), Err(OntologyError::StaleHandle));
    }

    #[test]
    fn test_destroy_root_keeps_root() {
        let mut universe = Universe::new();
        scene(&mut universe, "a");
        let root = universe.root();
        universe.destroy_entity(root).unwrap();
        assert!(universe.contains(root));
        assert!(!universe.is_alive(root));
        assert_eq!(universe.stats().entity_count, 1);
    }

    #[test]
    fn test_descendants() {
        let mut universe = Universe::new();
        let a = scene(&mut universe, "a");
        let b = universe
            .create_entity(EntityKind::Pipeline, &EntityStruct::child_of(a, "b"))
            .unwrap();
        universe
            .create_entity(EntityKind::Material, &EntityStruct::child_of(b, "c"))
            .unwrap();

        assert_eq!(universe.number_of_children(a), 1);
        assert_eq!(universe.number_of_descendants(a), 2);
        assert_eq!(universe.number_of_descendants(universe.root()), 3);
        assert_eq!(universe.children(a), vec![b]);
    }

    #[test]
    fn test_activate_entity() {
        let mut universe = Universe::new();
        let s = scene(&mut universe, "s");
        universe.activate_entity(s).unwrap();
        assert_eq!(universe.state.active_scene, Some(s));

        universe.destroy_entity(s).unwrap();
        assert_eq!(universe.state.active_scene, None);

        let root = universe.root();
        assert!(matches!(
            universe.activate_entity(root),
            Err(OntologyError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_holobiont_moves_bionts() {
        let mut universe = Universe::new();
        let holobiont = universe
            .create_holobiont(
                &EntityStruct::named("cat"),
                [10.0, 0.0, 0.0],
                &[[1.0, 0.0, 0.0], [0.0, 2.0, 0.0]],
            )
            .unwrap();

        universe.set_coordinates(holobiont, [0.0, 0.0, 5.0]).unwrap();
        let EntityData::Holobiont(data) = universe.entity(holobiont).unwrap().data() else {
            panic!("not a holobiont");
        };
        let bionts: Vec<_> = data.bionts.iter().map(|b| b.coordinates).collect();
        assert_eq!(universe.vectors().get3(bionts[0]), Ok([1.0, 0.0, 5.0]));
        assert_eq!(universe.vectors().get3(bionts[1]), Ok([0.0, 2.0, 5.0]));
    }
}
