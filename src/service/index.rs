//! Index lifecycle: create (or replace), inspect, drop.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::error::{Result, ShelfDbError};
use crate::index::{self, IndexConfig, IndexMetadata};
use crate::store::LibraryStore;

#[derive(Clone)]
pub struct IndexService {
    store: Arc<LibraryStore>,
}

impl IndexService {
    pub fn new(store: Arc<LibraryStore>) -> Self {
        Self { store }
    }

    /// Build an index over the library's embedded chunks and attach it
    /// under `name`, replacing any index previously attached there.
    pub fn create_index(
        &self,
        library_id: Uuid,
        name: &str,
        config: IndexConfig,
    ) -> Result<IndexMetadata> {
        let mut index = index::create_index(&config)?;

        self.store.mutate_library(&library_id, |library, indices| {
            let chunks = library.embedded_chunks();
            index.build(&chunks);

            let metadata = IndexMetadata {
                name: name.to_string(),
                config: config.clone(),
                vector_count: index.vector_count(),
                kind: config.kind,
            };

            indices.insert(name.to_string(), index);
            library
                .index_metadata
                .insert(name.to_string(), metadata.clone());

            info!(
                library = %library_id,
                index = %name,
                kind = config.kind.as_str(),
                vectors = metadata.vector_count,
                "index built"
            );
            Ok(metadata)
        })
    }

    /// Metadata of every attached index, sorted by name.
    pub fn list_indexes(&self, library_id: Uuid) -> Result<Vec<IndexMetadata>> {
        self.store.read_library(&library_id, |library, _| {
            let mut all: Vec<IndexMetadata> = library.index_metadata.values().cloned().collect();
            all.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(all)
        })
    }

    pub fn get_index(&self, library_id: Uuid, name: &str) -> Result<IndexMetadata> {
        self.store.read_library(&library_id, |library, _| {
            library
                .index_metadata
                .get(name)
                .cloned()
                .ok_or_else(|| ShelfDbError::IndexNotFound(name.to_string()))
        })
    }

    /// Drop both the live index and its metadata.
    pub fn delete_index(&self, library_id: Uuid, name: &str) -> Result<()> {
        self.store.mutate_library(&library_id, |library, indices| {
            if library.index_metadata.remove(name).is_none() {
                return Err(ShelfDbError::IndexNotFound(name.to_string()));
            }
            indices.remove(name);
            info!(library = %library_id, index = %name, "index dropped");
            Ok(())
        })
    }
}
