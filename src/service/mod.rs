//! The service layer: thin orchestration between the HTTP boundary, the
//! library store and the index structures.
//!
//! The one non-trivial invariant lives here: **indices mirror chunk state
//! eagerly**. Every chunk mutation updates every attached index and its
//! metadata within the same write acquisition that mutates the library, so
//! readers never observe a half-applied change.

pub mod chunk;
pub mod document;
pub mod index;
pub mod library;
pub mod search;

pub use chunk::{ChunkCreate, ChunkService, ChunkUpdate};
pub use document::{DocumentCreate, DocumentService};
pub use index::IndexService;
pub use library::LibraryService;
pub use search::SearchService;

use tracing::debug;
use uuid::Uuid;

use crate::model::{Chunk, Library};
use crate::store::IndexSet;

/// Upsert a chunk into every attached index and refresh the per-index
/// vector counts. Chunks without an embedding are ignored by the indices
/// themselves.
pub(crate) fn sync_indices_on_upsert(library: &mut Library, indices: &mut IndexSet, chunk: &Chunk) {
    for (name, index) in indices.iter_mut() {
        index.insert(chunk);
        if let Some(meta) = library.index_metadata.get_mut(name) {
            meta.vector_count = index.vector_count();
        }
        debug!(index = %name, chunk = %chunk.id, "index updated for chunk");
    }
}

/// Remove a chunk id from every attached index and refresh the per-index
/// vector counts.
pub(crate) fn sync_indices_on_delete(
    library: &mut Library,
    indices: &mut IndexSet,
    chunk_id: &Uuid,
) {
    for (name, index) in indices.iter_mut() {
        index.delete(chunk_id);
        if let Some(meta) = library.index_metadata.get_mut(name) {
            meta.vector_count = index.vector_count();
        }
        debug!(index = %name, chunk = %chunk_id, "chunk removed from index");
    }
}
