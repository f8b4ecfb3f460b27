//! The persisted data model: libraries contain documents, documents contain
//! chunks, chunks optionally carry a dense embedding.
//!
//! These are plain value types. Cloning a [`Library`] is a deep copy of its
//! documents and chunks; the live index objects attached to a library are
//! deliberately *not* part of this model — they live in the store, keyed by
//! library id, so that read snapshots never drag mutable index structures
//! along (see `store`).

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::index::IndexMetadata;

/// Free-form, string-keyed metadata carried by libraries, documents and
/// chunks. Values are an opaque tagged sum (string, number, bool, null,
/// list, map); the core never interprets them.
pub type Metadata = HashMap<String, serde_json::Value>;

/// A piece of text with an optional embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub text: String,
    /// Fixed-dimension dense vector; absent chunks are simply non-indexable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Chunk {
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            embedding: None,
            metadata,
        }
    }
}

/// An ordered collection of chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub chunks: BTreeMap<Uuid, Chunk>,
}

impl Document {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            metadata,
            chunks: BTreeMap::new(),
        }
    }
}

/// The top-level container. Owns its documents; records the configuration
/// and counters of every attached index in `index_metadata`, which shares
/// its key set with the live index map held by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Library {
    pub id: Uuid,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub documents: BTreeMap<Uuid, Document>,
    #[serde(default)]
    pub index_metadata: HashMap<String, IndexMetadata>,
    /// Reserved for a future MVCC scheme; carried but unused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

impl Library {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            metadata,
            documents: BTreeMap::new(),
            index_metadata: HashMap::new(),
            version: None,
        }
    }

    /// All chunks across all documents that carry an embedding, cloned.
    /// This is the input to an index build.
    pub fn embedded_chunks(&self) -> Vec<Chunk> {
        self.documents
            .values()
            .flat_map(|doc| doc.chunks.values())
            .filter(|chunk| chunk.embedding.is_some())
            .cloned()
            .collect()
    }

    /// Look a chunk up by id across all documents.
    pub fn find_chunk(&self, chunk_id: &Uuid) -> Option<&Chunk> {
        self.documents
            .values()
            .find_map(|doc| doc.chunks.get(chunk_id))
    }

    /// Total number of chunks in the library.
    pub fn chunk_count(&self) -> usize {
        self.documents.values().map(|doc| doc.chunks.len()).sum()
    }
}
