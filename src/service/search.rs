//! k-NN search: query resolution, index dispatch, reconciliation.
//!
//! The whole traversal runs under one read acquisition of the store, so the
//! index is immutable for its duration. Results are reconciled against the
//! live documents: an id returned by the index whose chunk no longer exists
//! is a zombie from a stale index and is filtered out with a warning; the
//! survivors are hydrated from the live chunk values.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::embed::{EmbeddingProvider, InputType};
use crate::error::{Result, ShelfDbError};
use crate::model::Chunk;
use crate::store::LibraryStore;

#[derive(Clone)]
pub struct SearchService {
    store: Arc<LibraryStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SearchService {
    pub fn new(store: Arc<LibraryStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    /// Search the named index of a library. Exactly one of
    /// `query_embedding` / `query_text` must be given; `k` must be >= 1.
    pub async fn search(
        &self,
        library_id: Uuid,
        index_name: &str,
        query_embedding: Option<Vec<f32>>,
        query_text: Option<String>,
        k: usize,
    ) -> Result<Vec<(Chunk, f32)>> {
        if k == 0 {
            return Err(ShelfDbError::validation("k must be >= 1"));
        }

        let query = match (query_embedding, query_text) {
            (Some(embedding), None) => embedding,
            (None, Some(text)) => self
                .embedder
                .get_embeddings(&[text], InputType::SearchQuery)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| ShelfDbError::embedding("provider returned no embedding"))?,
            _ => {
                return Err(ShelfDbError::validation(
                    "exactly one of query_embedding and query_text must be set",
                ))
            }
        };

        self.store.read_library(&library_id, |library, indices| {
            let index = indices
                .get(index_name)
                .ok_or_else(|| ShelfDbError::IndexNotReady(index_name.to_string()))?;

            let raw = index.search(&query, k)?;

            let mut results = Vec::with_capacity(raw.len());
            for (chunk, score) in raw {
                match library.find_chunk(&chunk.id) {
                    Some(live) => results.push((live.clone(), score)),
                    None => warn!(
                        library = %library_id,
                        index = %index_name,
                        chunk = %chunk.id,
                        "dropping zombie chunk from search results"
                    ),
                }
            }
            Ok(results)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbedder;
    use crate::index::{IndexConfig, IndexKind, Metric};
    use crate::model::{Document, Library, Metadata};
    use crate::service::{ChunkCreate, ChunkService, IndexService};

    async fn seeded_services() -> (SearchService, ChunkService, IndexService, Uuid, Uuid) {
        let store = Arc::new(LibraryStore::new());
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbedder::new(3));

        let mut library = Library::new(Metadata::new());
        let document = Document::new(Metadata::new());
        let document_id = document.id;
        library.documents.insert(document.id, document);
        let library_id = library.id;
        store.add(library);

        let chunks = ChunkService::new(store.clone(), embedder.clone());
        for word in ["cat", "dog", "kitten", "puppy", "computer"] {
            chunks
                .create_chunk(
                    library_id,
                    document_id,
                    ChunkCreate {
                        text: word.to_string(),
                        metadata: Metadata::new(),
                        embedding: None,
                    },
                )
                .await
                .unwrap();
        }

        (
            SearchService::new(store.clone(), embedder),
            chunks,
            IndexService::new(store),
            library_id,
            document_id,
        )
    }

    fn avl_config() -> IndexConfig {
        IndexConfig {
            kind: IndexKind::Avl,
            metric: Metric::Cosine,
            num_bits: 8,
            num_tables: 3,
            seed: None,
        }
    }

    #[tokio::test]
    async fn test_search_returns_nearest_neighbors() {
        let (search, _, indexes, library_id, _) = seeded_services().await;
        indexes
            .create_index(library_id, "primary", avl_config())
            .unwrap();

        let results = search
            .search(
                library_id,
                "primary",
                Some(vec![0.11, 0.21, 0.79]),
                None,
                2,
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.text, "cat");
        assert!(results[0].1 > 0.99);
        assert_eq!(results[1].0.text, "kitten");
        assert!(results[1].1 > 0.95 && results[1].1 < results[0].1);
    }

    #[tokio::test]
    async fn test_search_by_text_uses_query_embedding() {
        let (search, _, indexes, library_id, _) = seeded_services().await;
        indexes
            .create_index(library_id, "primary", avl_config())
            .unwrap();

        let results = search
            .search(library_id, "primary", None, Some("dog".to_string()), 1)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.text, "dog");
    }

    #[tokio::test]
    async fn test_search_unattached_index_is_not_ready() {
        let (search, _, _, library_id, _) = seeded_services().await;
        let err = search
            .search(library_id, "missing", Some(vec![1.0, 0.0, 0.0]), None, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ShelfDbError::IndexNotReady(_)));
    }

    #[tokio::test]
    async fn test_search_validates_query_fields() {
        let (search, _, indexes, library_id, _) = seeded_services().await;
        indexes
            .create_index(library_id, "primary", avl_config())
            .unwrap();

        let err = search
            .search(library_id, "primary", None, None, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ShelfDbError::Validation(_)));

        let err = search
            .search(
                library_id,
                "primary",
                Some(vec![1.0, 0.0, 0.0]),
                Some("dog".to_string()),
                1,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ShelfDbError::Validation(_)));

        let err = search
            .search(library_id, "primary", Some(vec![1.0, 0.0, 0.0]), None, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ShelfDbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_search_dimension_mismatch() {
        let (search, _, indexes, library_id, _) = seeded_services().await;
        indexes
            .create_index(library_id, "primary", avl_config())
            .unwrap();

        let err = search
            .search(library_id, "primary", Some(vec![1.0, 0.0]), None, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ShelfDbError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn test_zombie_chunks_are_filtered() {
        let (search, chunks, indexes, library_id, document_id) = seeded_services().await;
        indexes
            .create_index(library_id, "primary", avl_config())
            .unwrap();

        let dog_id = chunks
            .list_chunks(library_id, document_id)
            .unwrap()
            .into_iter()
            .find(|c| c.text == "dog")
            .map(|c| c.id)
            .unwrap();

        // Remove the chunk behind the service layer's back so the index
        // keeps a stale entry.
        search
            .store
            .mutate_library(&library_id, |library, _| {
                for document in library.documents.values_mut() {
                    document.chunks.remove(&dog_id);
                }
                Ok(())
            })
            .unwrap();

        let results = search
            .search(library_id, "primary", Some(vec![0.9, 0.2, 0.1]), None, 5)
            .await
            .unwrap();

        // The index still holds 5 ids, but the zombie never surfaces.
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|(chunk, _)| chunk.id != dog_id));
    }
}
