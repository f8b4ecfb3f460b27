//! Embedding cache.
//!
//! Wraps any [`EmbeddingProvider`] with a Moka cache keyed by input type and
//! the SHA-256 of the text. Entries are weighed by vector size so the cache
//! respects a memory budget, evicting LRU entries past it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use moka::sync::Cache;
use sha2::{Digest, Sha256};

use super::{EmbeddingProvider, InputType};
use crate::error::Result;

pub struct CachingEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    cache: Cache<String, Arc<Vec<f32>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Cache effectiveness counters.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
}

fn cache_key(text: &str, input_type: InputType) -> String {
    let digest = Sha256::digest(text.as_bytes());
    format!("{}:{:x}", input_type.as_str(), digest)
}

impl CachingEmbedder {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, max_memory_mb: usize) -> Self {
        // max_capacity acts as max weight once a weigher is installed.
        let max_weight = (max_memory_mb * 1024 * 1024) as u64;
        let cache = Cache::builder()
            .max_capacity(max_weight)
            .weigher(|_key: &String, value: &Arc<Vec<f32>>| {
                (value.len() * std::mem::size_of::<f32>()) as u32
            })
            .build();

        Self {
            inner,
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.run_pending_tasks();
        CacheStats {
            entries: self.cache.entry_count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for CachingEmbedder {
    async fn get_embeddings(
        &self,
        texts: &[String],
        input_type: InputType,
    ) -> Result<Vec<Vec<f32>>> {
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut missing: Vec<(usize, String)> = Vec::new();

        for (position, text) in texts.iter().enumerate() {
            match self.cache.get(&cache_key(text, input_type)) {
                Some(vector) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    results.push(Some(vector.as_ref().clone()));
                }
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    results.push(None);
                    missing.push((position, text.clone()));
                }
            }
        }

        if !missing.is_empty() {
            let texts_to_embed: Vec<String> =
                missing.iter().map(|(_, text)| text.clone()).collect();
            let embedded = self.inner.get_embeddings(&texts_to_embed, input_type).await?;

            for ((position, text), vector) in missing.into_iter().zip(embedded) {
                self.cache
                    .insert(cache_key(&text, input_type), Arc::new(vector.clone()));
                results[position] = Some(vector);
            }
        }

        Ok(results.into_iter().flatten().collect())
    }
}
