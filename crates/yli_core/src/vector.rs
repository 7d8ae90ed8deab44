//! Fixed-size vector storage
//!
//! Borrowed `&Vec3` / `&Vec4` values never point into an entity directly.
//! Instead the referent lives in a [`VectorStore`] slot and the value holds a
//! generational [`VectorId`]. Dereferencing a handle whose slot was freed (or
//! reused) fails with [`OntologyError::StaleHandle`] rather than reading
//! somebody else's data.

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::error::{OntologyError, Result};

new_key_type! {
    /// Generational handle to a fixed-size float vector
    pub struct VectorId;
}

/// Component storage for one vector (3 or 4 components)
pub type Components = SmallVec<[f32; 4]>;

/// Arena of fixed-size float vectors
#[derive(Debug, Default)]
pub struct VectorStore {
    slots: SlotMap<VectorId, Components>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
        }
    }

    /// Allocate a new vector initialized with `components`
    pub fn insert(&mut self, components: &[f32]) -> VectorId {
        self.slots.insert(SmallVec::from_slice(components))
    }

    /// Allocate a copy of an existing vector
    pub fn duplicate(&mut self, id: VectorId) -> Result<VectorId> {
        let copy = self.get(id)?.to_vec();
        Ok(self.insert(&copy))
    }

    pub fn get(&self, id: VectorId) -> Result<&[f32]> {
        self.slots
            .get(id)
            .map(|components| components.as_slice())
            .ok_or(OntologyError::StaleHandle)
    }

    /// Read a 3-component vector
    pub fn get3(&self, id: VectorId) -> Result<[f32; 3]> {
        match self.get(id)? {
            [x, y, z] => Ok([*x, *y, *z]),
            other => Err(OntologyError::TypeMismatch {
                expected: "3 components".to_string(),
                found: format!("{} components", other.len()),
            }),
        }
    }

    /// Overwrite every component; `components` must match the stored length
    pub fn write(&mut self, id: VectorId, components: &[f32]) -> Result<()> {
        let slot = self.slots.get_mut(id).ok_or(OntologyError::StaleHandle)?;
        if slot.len() != components.len() {
            return Err(OntologyError::TypeMismatch {
                expected: format!("{} components", slot.len()),
                found: format!("{} components", components.len()),
            });
        }
        slot.copy_from_slice(components);
        Ok(())
    }

    /// Overwrite a single component
    pub fn set_component(&mut self, id: VectorId, index: usize, value: f32) -> Result<()> {
        let slot = self.slots.get_mut(id).ok_or(OntologyError::StaleHandle)?;
        let component = slot
            .get_mut(index)
            .ok_or_else(|| OntologyError::NotFound(format!("component {index}")))?;
        *component = value;
        Ok(())
    }

    /// Free a slot. Outstanding handles become stale.
    pub fn remove(&mut self, id: VectorId) -> bool {
        self.slots.remove(id).is_some()
    }

    pub fn contains(&self, id: VectorId) -> bool {
        self.slots.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_write() {
        let mut store = VectorStore::new();
        let id = store.insert(&[1.0, 2.0, 3.0]);
        assert_eq!(store.get3(id), Ok([1.0, 2.0, 3.0]));

        store.write(id, &[4.0, 5.0, 6.0]).unwrap();
        store.set_component(id, 1, 9.0).unwrap();
        assert_eq!(store.get(id).unwrap(), &[4.0, 9.0, 6.0]);
    }

    #[test]
    fn test_write_rejects_wrong_length() {
        let mut store = VectorStore::new();
        let id = store.insert(&[0.0; 4]);
        assert!(matches!(
            store.write(id, &[1.0, 2.0, 3.0]),
            Err(OntologyError::TypeMismatch { .. })
        ));
        assert_eq!(store.get(id).unwrap(), &[0.0; 4]);
    }

    #[test]
    fn test_stale_handle_is_checked() {
        let mut store = VectorStore::new();
        let id = store.insert(&[1.0, 1.0, 1.0]);
        assert!(store.remove(id));

        // Reuse the slot; the old handle must not see the new data.
        let reused = store.insert(&[7.0, 7.0, 7.0]);
        assert_ne!(id, reused);
        assert_eq!(store.get(id), Err(OntologyError::StaleHandle));
        assert_eq!(store.write(id, &[0.0; 3]), Err(OntologyError::StaleHandle));
    }

    #[test]
    fn test_duplicate_is_independent() {
        let mut store = VectorStore::new();
        let original = store.insert(&[1.0, 2.0, 3.0]);
        let copy = store.duplicate(original).unwrap();

        store.set_component(copy, 0, 100.0).unwrap();
        assert_eq!(store.get3(original), Ok([1.0, 2.0, 3.0]));
        assert_eq!(store.get3(copy), Ok([100.0, 2.0, 3.0]));
    }
}
