//! Embedding providers.
//!
//! The core treats embeddings as opaque vectors produced by an external
//! text -> vector function. Two providers ship: a Cohere HTTP client and a
//! deterministic offline provider, both usually wrapped in a caching layer.

pub mod cache;
pub mod cohere;
pub mod hash;

pub use cache::{CacheStats, CachingEmbedder};
pub use cohere::CohereClient;
pub use hash::HashEmbedder;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{EmbeddingProviderKind, ServerConfig};
use crate::error::Result;

/// Whether a text is being embedded for storage or for querying. Some
/// providers produce asymmetric embeddings and need to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputType {
    SearchDocument,
    SearchQuery,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::SearchDocument => "search_document",
            InputType::SearchQuery => "search_query",
        }
    }
}

/// A text -> vector function. Outputs are used as-is; the core does not
/// interpret them beyond treating them as fixed-dimension vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn get_embeddings(&self, texts: &[String], input_type: InputType)
        -> Result<Vec<Vec<f32>>>;
}

/// Build the configured provider, wrapped in the embedding cache.
pub fn provider_from_config(config: &ServerConfig) -> Arc<dyn EmbeddingProvider> {
    let embedding = &config.embedding;
    let inner: Arc<dyn EmbeddingProvider> = match embedding.provider {
        EmbeddingProviderKind::Cohere => match &embedding.cohere_api_key {
            Some(api_key) => Arc::new(CohereClient::new(
                api_key.clone(),
                embedding.cohere_model.clone(),
            )),
            None => {
                tracing::warn!(
                    "cohere provider selected but no API key configured, \
                     falling back to the deterministic provider"
                );
                Arc::new(HashEmbedder::new(embedding.dimensions))
            }
        },
        EmbeddingProviderKind::Deterministic => Arc::new(HashEmbedder::new(embedding.dimensions)),
    };

    Arc::new(CachingEmbedder::new(
        inner,
        embedding.cache_max_memory_mb,
    ))
}
