//! Document CRUD.
//!
//! Documents may be created with nested chunks; their texts are embedded in
//! a single provider call before the write lock is taken. Deleting a
//! document cascades: every contained chunk is removed from every attached
//! index before the document is dropped.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::chunk::ChunkCreate;
use super::{sync_indices_on_delete, sync_indices_on_upsert};
use crate::embed::{EmbeddingProvider, InputType};
use crate::error::{Result, ShelfDbError};
use crate::model::{Chunk, Document, Metadata};
use crate::store::LibraryStore;

/// Input for document creation.
#[derive(Debug, Clone)]
pub struct DocumentCreate {
    pub metadata: Metadata,
    pub chunks: Vec<ChunkCreate>,
}

#[derive(Clone)]
pub struct DocumentService {
    store: Arc<LibraryStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl DocumentService {
    pub fn new(store: Arc<LibraryStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    pub async fn create_document(
        &self,
        library_id: Uuid,
        create: DocumentCreate,
    ) -> Result<Document> {
        for chunk in &create.chunks {
            if chunk.text.trim().is_empty() {
                return Err(ShelfDbError::validation("chunk text must not be empty"));
            }
        }

        // One batched provider call for every chunk that needs a vector.
        let texts: Vec<String> = create
            .chunks
            .iter()
            .filter(|chunk| chunk.embedding.is_none())
            .map(|chunk| chunk.text.clone())
            .collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedder
                .get_embeddings(&texts, InputType::SearchDocument)
                .await?
        };

        let mut document = Document::new(create.metadata);
        let mut generated = embeddings.into_iter();
        for chunk_create in create.chunks {
            let embedding = match chunk_create.embedding {
                Some(embedding) => Some(embedding),
                None => generated.next(),
            };
            let mut chunk = Chunk::new(chunk_create.text, chunk_create.metadata);
            chunk.embedding = embedding;
            document.chunks.insert(chunk.id, chunk);
        }

        self.store.mutate_library(&library_id, |library, indices| {
            library.documents.insert(document.id, document.clone());
            for chunk in document.chunks.values() {
                sync_indices_on_upsert(library, indices, chunk);
            }
            Ok(document.clone())
        })
    }

    pub fn get_document(&self, library_id: Uuid, document_id: Uuid) -> Result<Document> {
        self.store.read_library(&library_id, |library, _| {
            library
                .documents
                .get(&document_id)
                .cloned()
                .ok_or(ShelfDbError::DocumentNotFound {
                    library_id,
                    document_id,
                })
        })
    }

    pub fn list_documents(&self, library_id: Uuid) -> Result<Vec<Document>> {
        self.store
            .read_library(&library_id, |library, _| {
                Ok(library.documents.values().cloned().collect())
            })
    }

    /// Replaces the metadata map wholesale; chunks are untouched.
    pub fn update_document(
        &self,
        library_id: Uuid,
        document_id: Uuid,
        metadata: Metadata,
    ) -> Result<Document> {
        self.store.mutate_library(&library_id, |library, _| {
            let document =
                library
                    .documents
                    .get_mut(&document_id)
                    .ok_or(ShelfDbError::DocumentNotFound {
                        library_id,
                        document_id,
                    })?;
            document.metadata = metadata;
            Ok(document.clone())
        })
    }

    pub fn delete_document(&self, library_id: Uuid, document_id: Uuid) -> Result<()> {
        self.store.mutate_library(&library_id, |library, indices| {
            let document =
                library
                    .documents
                    .remove(&document_id)
                    .ok_or(ShelfDbError::DocumentNotFound {
                        library_id,
                        document_id,
                    })?;

            // Cascade: index maintenance for every chunk before the
            // document value is dropped.
            for chunk_id in document.chunks.keys() {
                sync_indices_on_delete(library, indices, chunk_id);
            }

            info!(
                library = %library_id,
                document = %document_id,
                chunks = document.chunks.len(),
                "document deleted"
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbedder;
    use crate::index::{IndexConfig, IndexKind, Metric};
    use crate::model::Library;
    use crate::service::IndexService;

    fn setup() -> (DocumentService, IndexService, Uuid) {
        let store = Arc::new(LibraryStore::new());
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbedder::new(3));

        let library = Library::new(Metadata::new());
        let library_id = library.id;
        store.add(library);

        (
            DocumentService::new(store.clone(), embedder),
            IndexService::new(store),
            library_id,
        )
    }

    fn chunk_create(text: &str) -> ChunkCreate {
        ChunkCreate {
            text: text.to_string(),
            metadata: Metadata::new(),
            embedding: None,
        }
    }

    #[tokio::test]
    async fn test_create_document_embeds_nested_chunks() {
        let (documents, _, library_id) = setup();
        let document = documents
            .create_document(
                library_id,
                DocumentCreate {
                    metadata: Metadata::new(),
                    chunks: vec![chunk_create("cat"), chunk_create("dog")],
                },
            )
            .await
            .unwrap();

        assert_eq!(document.chunks.len(), 2);
        let embeddings: Vec<_> = document
            .chunks
            .values()
            .map(|c| c.embedding.clone().unwrap())
            .collect();
        assert!(embeddings.contains(&vec![0.1, 0.2, 0.8]));
        assert!(embeddings.contains(&vec![0.9, 0.2, 0.1]));
    }

    #[tokio::test]
    async fn test_document_lifecycle() {
        let (documents, _, library_id) = setup();
        let document = documents
            .create_document(
                library_id,
                DocumentCreate {
                    metadata: Metadata::new(),
                    chunks: Vec::new(),
                },
            )
            .await
            .unwrap();

        assert_eq!(documents.list_documents(library_id).unwrap().len(), 1);
        assert!(documents.get_document(library_id, document.id).is_ok());

        let mut metadata = Metadata::new();
        metadata.insert("title".into(), serde_json::json!("renamed"));
        let updated = documents
            .update_document(library_id, document.id, metadata)
            .unwrap();
        assert_eq!(updated.metadata["title"], serde_json::json!("renamed"));

        documents.delete_document(library_id, document.id).unwrap();
        assert!(documents.get_document(library_id, document.id).is_err());
    }

    #[tokio::test]
    async fn test_cascade_delete_clears_indices() {
        let (documents, indexes, library_id) = setup();

        let document = documents
            .create_document(
                library_id,
                DocumentCreate {
                    metadata: Metadata::new(),
                    chunks: vec![chunk_create("cat")],
                },
            )
            .await
            .unwrap();

        indexes
            .create_index(
                library_id,
                "avl",
                IndexConfig {
                    kind: IndexKind::Avl,
                    metric: Metric::Cosine,
                    num_bits: 8,
                    num_tables: 3,
                    seed: None,
                },
            )
            .unwrap();
        indexes
            .create_index(
                library_id,
                "lsh",
                IndexConfig {
                    kind: IndexKind::Lsh,
                    metric: Metric::Cosine,
                    num_bits: 8,
                    num_tables: 3,
                    seed: Some(42),
                },
            )
            .unwrap();
        assert_eq!(indexes.get_index(library_id, "avl").unwrap().vector_count, 1);
        assert_eq!(indexes.get_index(library_id, "lsh").unwrap().vector_count, 1);

        documents.delete_document(library_id, document.id).unwrap();

        assert_eq!(indexes.get_index(library_id, "avl").unwrap().vector_count, 0);
        assert_eq!(indexes.get_index(library_id, "lsh").unwrap().vector_count, 0);
    }

    #[tokio::test]
    async fn test_missing_document_errors() {
        let (documents, _, library_id) = setup();
        assert!(matches!(
            documents.get_document(library_id, Uuid::new_v4()),
            Err(ShelfDbError::DocumentNotFound { .. })
        ));
        assert!(matches!(
            documents.delete_document(library_id, Uuid::new_v4()),
            Err(ShelfDbError::DocumentNotFound { .. })
        ));
    }
}
