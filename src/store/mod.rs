//! In-memory library store.
//!
//! Holds two maps keyed by library id: the persisted [`Library`] values and
//! the live index objects attached to each library. Both sit behind a single
//! [`RwLock`], so every read sees a consistent snapshot and every mutation
//! (library + documents + chunks + indices + metadata) is published
//! atomically from the readers' standpoint.
//!
//! Reads return deep copies of the library value — callers can never mutate
//! shared state outside a write path. The live indices are not copyable and
//! never leave the store; they are reached through [`read_library`] /
//! [`mutate_library`] closures executed under the appropriate guard.
//!
//! [`read_library`]: LibraryStore::read_library
//! [`mutate_library`]: LibraryStore::mutate_library

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::{Result, ShelfDbError};
use crate::index::VectorIndex;
use crate::model::Library;
use crate::rwlock::RwLock;

/// The live indices of one library, keyed by index name. Shares its key set
/// with the library's `index_metadata`.
pub type IndexSet = HashMap<String, Box<dyn VectorIndex>>;

#[derive(Default)]
struct StoreInner {
    libraries: HashMap<Uuid, Library>,
    indices: HashMap<Uuid, IndexSet>,
}

/// Thread-safe mapping from library id to library state.
pub struct LibraryStore {
    inner: RwLock<StoreInner>,
}

impl Default for LibraryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
        }
    }

    /// Insert a new library. No-op if the id is already present.
    pub fn add(&self, library: Library) {
        let mut inner = self.inner.write();
        if inner.libraries.contains_key(&library.id) {
            return;
        }
        inner.indices.insert(library.id, IndexSet::new());
        inner.libraries.insert(library.id, library);
    }

    /// Replace the stored value for an existing library.
    pub fn update(&self, library: Library) -> Result<()> {
        let mut inner = self.inner.write();
        if !inner.libraries.contains_key(&library.id) {
            return Err(ShelfDbError::LibraryNotFound(library.id));
        }
        inner.libraries.insert(library.id, library);
        Ok(())
    }

    /// Remove a library and its attached indices.
    pub fn delete(&self, library_id: &Uuid) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.libraries.remove(library_id).is_none() {
            return Err(ShelfDbError::LibraryNotFound(*library_id));
        }
        inner.indices.remove(library_id);
        Ok(())
    }

    /// Deep copy of a stored library.
    pub fn get(&self, library_id: &Uuid) -> Result<Library> {
        let inner = self.inner.read();
        inner
            .libraries
            .get(library_id)
            .cloned()
            .ok_or(ShelfDbError::LibraryNotFound(*library_id))
    }

    /// Deep-copied snapshot of all libraries.
    pub fn list_all(&self) -> Vec<Library> {
        let inner = self.inner.read();
        inner.libraries.values().cloned().collect()
    }

    /// Drop everything. Test affordance.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.libraries.clear();
        inner.indices.clear();
    }

    /// Run `f` with shared access to a library and its live indices.
    /// The read guard is held for the whole call, so index traversals see
    /// immutable state.
    pub fn read_library<R>(
        &self,
        library_id: &Uuid,
        f: impl FnOnce(&Library, &IndexSet) -> Result<R>,
    ) -> Result<R> {
        let inner = self.inner.read();
        let library = inner
            .libraries
            .get(library_id)
            .ok_or(ShelfDbError::LibraryNotFound(*library_id))?;
        let empty = IndexSet::new();
        let indices = inner.indices.get(library_id).unwrap_or(&empty);
        f(library, indices)
    }

    /// Run `f` with exclusive access to a library and its live indices.
    /// The write guard is held for the whole call: the mutation is
    /// published as a unit.
    pub fn mutate_library<R>(
        &self,
        library_id: &Uuid,
        f: impl FnOnce(&mut Library, &mut IndexSet) -> Result<R>,
    ) -> Result<R> {
        let mut inner = self.inner.write();
        let inner = &mut *inner;
        let library = inner
            .libraries
            .get_mut(library_id)
            .ok_or(ShelfDbError::LibraryNotFound(*library_id))?;
        let indices = inner.indices.entry(*library_id).or_default();
        f(library, indices)
    }
}
