//! Library CRUD.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{Library, Metadata};
use crate::store::LibraryStore;

#[derive(Clone)]
pub struct LibraryService {
    store: Arc<LibraryStore>,
}

impl LibraryService {
    pub fn new(store: Arc<LibraryStore>) -> Self {
        Self { store }
    }

    pub fn create_library(&self, metadata: Metadata) -> Library {
        let library = Library::new(metadata);
        info!(library = %library.id, "library created");
        self.store.add(library.clone());
        library
    }

    pub fn get_library(&self, library_id: Uuid) -> Result<Library> {
        self.store.get(&library_id)
    }

    pub fn list_libraries(&self) -> Vec<Library> {
        self.store.list_all()
    }

    /// Replaces the metadata map wholesale; documents and indices are
    /// untouched.
    pub fn update_library(&self, library_id: Uuid, metadata: Metadata) -> Result<Library> {
        self.store.mutate_library(&library_id, |library, _| {
            library.metadata = metadata;
            Ok(library.clone())
        })
    }

    pub fn delete_library(&self, library_id: Uuid) -> Result<()> {
        self.store.delete(&library_id)?;
        info!(library = %library_id, "library deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_get_delete_roundtrip() {
        let service = LibraryService::new(Arc::new(LibraryStore::new()));

        let library = service.create_library(Metadata::new());
        assert_eq!(service.get_library(library.id).unwrap().id, library.id);
        assert_eq!(service.list_libraries().len(), 1);

        service.delete_library(library.id).unwrap();
        assert!(service.get_library(library.id).is_err());
    }

    #[test]
    fn test_update_replaces_metadata() {
        let service = LibraryService::new(Arc::new(LibraryStore::new()));

        let mut metadata = Metadata::new();
        metadata.insert("topic".into(), serde_json::json!("animals"));
        metadata.insert("year".into(), serde_json::json!(2024));
        let library = service.create_library(metadata);

        let mut replacement = Metadata::new();
        replacement.insert("topic".into(), serde_json::json!("pets"));
        let updated = service.update_library(library.id, replacement).unwrap();

        assert_eq!(updated.metadata["topic"], serde_json::json!("pets"));
        // Replace, not merge: the old key is gone.
        assert!(!updated.metadata.contains_key("year"));
    }
}
