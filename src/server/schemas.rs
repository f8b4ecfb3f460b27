//! Request and response bodies for the HTTP surface.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::index::{IndexConfig, IndexKind, IndexMetadata, Metric};
use crate::model::{Chunk, Document, Library, Metadata};
use crate::service::{ChunkCreate, ChunkUpdate, DocumentCreate};

/// Wire shape of every error: `{"detail": "<message>"}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub libraries: usize,
    pub version: String,
}

// --- libraries ---

#[derive(Debug, Default, Deserialize)]
pub struct LibraryCreateBody {
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Deserialize)]
pub struct LibraryUpdateBody {
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Serialize)]
pub struct LibraryResponse {
    pub id: Uuid,
    pub metadata: Metadata,
    pub document_count: usize,
    pub chunk_count: usize,
    pub indexes: Vec<String>,
}

impl LibraryResponse {
    pub fn from_model(library: &Library) -> Self {
        let mut indexes: Vec<String> = library.index_metadata.keys().cloned().collect();
        indexes.sort();
        Self {
            id: library.id,
            metadata: library.metadata.clone(),
            document_count: library.documents.len(),
            chunk_count: library.chunk_count(),
            indexes,
        }
    }
}

// --- documents ---

#[derive(Debug, Default, Deserialize)]
pub struct DocumentCreateBody {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub chunks: Vec<ChunkCreateBody>,
}

impl DocumentCreateBody {
    pub fn into_create(self) -> DocumentCreate {
        DocumentCreate {
            metadata: self.metadata,
            chunks: self.chunks.into_iter().map(ChunkCreateBody::into_create).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DocumentUpdateBody {
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub library_id: Uuid,
    pub metadata: Metadata,
    pub chunk_count: usize,
}

impl DocumentResponse {
    pub fn from_model(document: &Document, library_id: Uuid) -> Self {
        Self {
            id: document.id,
            library_id,
            metadata: document.metadata.clone(),
            chunk_count: document.chunks.len(),
        }
    }
}

// --- chunks ---

#[derive(Debug, Deserialize)]
pub struct ChunkCreateBody {
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl ChunkCreateBody {
    pub fn into_create(self) -> ChunkCreate {
        ChunkCreate {
            text: self.text,
            metadata: self.metadata,
            embedding: self.embedding,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkUpdateBody {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl ChunkUpdateBody {
    pub fn into_update(self) -> ChunkUpdate {
        ChunkUpdate {
            text: self.text,
            metadata: self.metadata,
            embedding: self.embedding,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChunkResponse {
    pub id: Uuid,
    pub library_id: Uuid,
    pub document_id: Uuid,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub metadata: Metadata,
}

impl ChunkResponse {
    pub fn from_model(chunk: &Chunk, library_id: Uuid, document_id: Uuid) -> Self {
        Self {
            id: chunk.id,
            library_id,
            document_id,
            text: chunk.text.clone(),
            embedding: chunk.embedding.clone(),
            metadata: chunk.metadata.clone(),
        }
    }
}

// --- indexes ---

#[derive(Debug, Deserialize)]
pub struct IndexCreateBody {
    pub kind: IndexKind,
    pub metric: Metric,
    #[serde(default)]
    pub num_bits: Option<usize>,
    #[serde(default)]
    pub num_tables: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl IndexCreateBody {
    pub fn into_config(self) -> IndexConfig {
        IndexConfig {
            kind: self.kind,
            metric: self.metric,
            num_bits: self
                .num_bits
                .unwrap_or(crate::constants::DEFAULT_LSH_NUM_BITS),
            num_tables: self
                .num_tables
                .unwrap_or(crate::constants::DEFAULT_LSH_NUM_TABLES),
            seed: self.seed,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IndexStatusResponse {
    pub name: String,
    pub kind: IndexKind,
    pub metric: Metric,
    pub vector_count: usize,
    pub config: IndexConfig,
}

impl IndexStatusResponse {
    pub fn from_metadata(metadata: &IndexMetadata) -> Self {
        Self {
            name: metadata.name.clone(),
            kind: metadata.kind,
            metric: metadata.config.metric,
            vector_count: metadata.vector_count,
            config: metadata.config.clone(),
        }
    }
}

// --- search ---

#[derive(Debug, Deserialize)]
pub struct SearchRequestBody {
    #[serde(default)]
    pub query_embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub query_text: Option<String>,
    pub k: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchResultBody {
    /// The live chunk value, embedding included.
    pub chunk: Chunk,
    pub similarity: f32,
}
