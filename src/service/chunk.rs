//! Chunk CRUD with eager index maintenance.
//!
//! Embeddings are generated *outside* the store lock: the provider may do
//! network I/O and nothing blocking belongs inside a held write guard. The
//! chunk + index + metadata mutation itself happens under one acquisition.

use std::sync::Arc;

use uuid::Uuid;

use super::{sync_indices_on_delete, sync_indices_on_upsert};
use crate::embed::{EmbeddingProvider, InputType};
use crate::error::{Result, ShelfDbError};
use crate::model::{Chunk, Metadata};
use crate::store::LibraryStore;

/// Input for chunk creation. When `embedding` is given it is stored as-is;
/// otherwise the text is embedded.
#[derive(Debug, Clone)]
pub struct ChunkCreate {
    pub text: String,
    pub metadata: Metadata,
    pub embedding: Option<Vec<f32>>,
}

/// Input for chunk updates; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ChunkUpdate {
    pub text: Option<String>,
    pub metadata: Option<Metadata>,
    pub embedding: Option<Vec<f32>>,
}

#[derive(Clone)]
pub struct ChunkService {
    store: Arc<LibraryStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl ChunkService {
    pub fn new(store: Arc<LibraryStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder
            .get_embeddings(&[text.to_string()], InputType::SearchDocument)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ShelfDbError::embedding("provider returned no embedding"))
    }

    pub async fn create_chunk(
        &self,
        library_id: Uuid,
        document_id: Uuid,
        create: ChunkCreate,
    ) -> Result<Chunk> {
        if create.text.trim().is_empty() {
            return Err(ShelfDbError::validation("chunk text must not be empty"));
        }

        let embedding = match create.embedding {
            Some(embedding) => embedding,
            None => self.embed_text(&create.text).await?,
        };

        let mut chunk = Chunk::new(create.text, create.metadata);
        chunk.embedding = Some(embedding);

        self.store.mutate_library(&library_id, |library, indices| {
            let document =
                library
                    .documents
                    .get_mut(&document_id)
                    .ok_or(ShelfDbError::DocumentNotFound {
                        library_id,
                        document_id,
                    })?;
            document.chunks.insert(chunk.id, chunk.clone());
            sync_indices_on_upsert(library, indices, &chunk);
            Ok(chunk.clone())
        })
    }

    pub fn get_chunk(&self, library_id: Uuid, document_id: Uuid, chunk_id: Uuid) -> Result<Chunk> {
        self.store.read_library(&library_id, |library, _| {
            let document =
                library
                    .documents
                    .get(&document_id)
                    .ok_or(ShelfDbError::DocumentNotFound {
                        library_id,
                        document_id,
                    })?;
            document
                .chunks
                .get(&chunk_id)
                .cloned()
                .ok_or(ShelfDbError::ChunkNotFound {
                    document_id,
                    chunk_id,
                })
        })
    }

    pub fn list_chunks(&self, library_id: Uuid, document_id: Uuid) -> Result<Vec<Chunk>> {
        self.store.read_library(&library_id, |library, _| {
            let document =
                library
                    .documents
                    .get(&document_id)
                    .ok_or(ShelfDbError::DocumentNotFound {
                        library_id,
                        document_id,
                    })?;
            Ok(document.chunks.values().cloned().collect())
        })
    }

    pub async fn update_chunk(
        &self,
        library_id: Uuid,
        document_id: Uuid,
        chunk_id: Uuid,
        update: ChunkUpdate,
    ) -> Result<Chunk> {
        if let Some(text) = &update.text {
            if text.trim().is_empty() {
                return Err(ShelfDbError::validation("chunk text must not be empty"));
            }
        }

        // Re-embed outside the lock when the text changes and no explicit
        // embedding was supplied.
        let new_embedding = match (&update.text, update.embedding) {
            (_, Some(embedding)) => Some(embedding),
            (Some(text), None) => Some(self.embed_text(text).await?),
            (None, None) => None,
        };

        self.store.mutate_library(&library_id, |library, indices| {
            let document =
                library
                    .documents
                    .get_mut(&document_id)
                    .ok_or(ShelfDbError::DocumentNotFound {
                        library_id,
                        document_id,
                    })?;
            let chunk = document
                .chunks
                .get_mut(&chunk_id)
                .ok_or(ShelfDbError::ChunkNotFound {
                    document_id,
                    chunk_id,
                })?;

            if let Some(text) = update.text {
                chunk.text = text;
            }
            if let Some(metadata) = update.metadata {
                chunk.metadata = metadata;
            }
            if let Some(embedding) = new_embedding {
                chunk.embedding = Some(embedding);
            }
            let updated = chunk.clone();

            // Upsert-by-id in every case, embedding changed or not.
            sync_indices_on_upsert(library, indices, &updated);
            Ok(updated)
        })
    }

    pub fn delete_chunk(&self, library_id: Uuid, document_id: Uuid, chunk_id: Uuid) -> Result<()> {
        self.store.mutate_library(&library_id, |library, indices| {
            let document =
                library
                    .documents
                    .get_mut(&document_id)
                    .ok_or(ShelfDbError::DocumentNotFound {
                        library_id,
                        document_id,
                    })?;
            if document.chunks.remove(&chunk_id).is_none() {
                return Err(ShelfDbError::ChunkNotFound {
                    document_id,
                    chunk_id,
                });
            }
            sync_indices_on_delete(library, indices, &chunk_id);
            Ok(())
        })
    }
}
