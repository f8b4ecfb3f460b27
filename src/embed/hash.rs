//! Deterministic offline embedding provider.
//!
//! Returns a fixed table of known vectors at dimension 3, and for any other
//! text a vector drawn from a PRNG seeded with the SHA-256 of the text, so
//! the same text maps to the same vector across runs and machines. Useful
//! for tests and for running the server without an embedding API key.

use std::collections::HashMap;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use super::{EmbeddingProvider, InputType};
use crate::error::Result;

pub struct HashEmbedder {
    dimension: usize,
    known_embeddings: HashMap<&'static str, Vec<f32>>,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        let raw_known: [(&'static str, Vec<f32>); 5] = [
            ("cat", vec![0.1, 0.2, 0.8]),
            ("dog", vec![0.9, 0.2, 0.1]),
            ("kitten", vec![0.15, 0.25, 0.75]),
            ("puppy", vec![0.85, 0.25, 0.15]),
            ("computer", vec![0.1, 0.9, 0.1]),
        ];

        // Only keep known vectors that match the configured dimension.
        let known_embeddings = raw_known
            .into_iter()
            .filter(|(_, vec)| vec.len() == dimension)
            .collect();

        Self {
            dimension,
            known_embeddings,
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        if let Some(vector) = self.known_embeddings.get(text) {
            return vector.clone();
        }

        // Stable hashing: the seed must not vary between processes.
        let digest = Sha256::digest(text.as_bytes());
        let mut seed_bytes = [0u8; 8];
        seed_bytes.copy_from_slice(&digest[..8]);
        let mut rng = StdRng::seed_from_u64(u64::from_le_bytes(seed_bytes));

        (0..self.dimension).map(|_| rng.gen::<f32>()).collect()
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn get_embeddings(
        &self,
        texts: &[String],
        _input_type: InputType,
    ) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_known_words_at_dimension_three() {
        let embedder = HashEmbedder::new(3);
        let embeddings = embedder
            .get_embeddings(&["cat".to_string(), "dog".to_string()], InputType::SearchDocument)
            .await
            .unwrap();
        assert_eq!(embeddings[0], vec![0.1, 0.2, 0.8]);
        assert_eq!(embeddings[1], vec![0.9, 0.2, 0.1]);
    }

    #[tokio::test]
    async fn test_known_words_filtered_at_other_dimensions() {
        let embedder = HashEmbedder::new(8);
        let embeddings = embedder
            .get_embeddings(&["cat".to_string()], InputType::SearchDocument)
            .await
            .unwrap();
        assert_eq!(embeddings[0].len(), 8);
        assert_ne!(embeddings[0], vec![0.1, 0.2, 0.8]);
    }

    #[tokio::test]
    async fn test_unknown_text_is_stable() {
        let embedder = HashEmbedder::new(16);
        let first = embedder
            .get_embeddings(&["lorem ipsum".to_string()], InputType::SearchDocument)
            .await
            .unwrap();
        let second = embedder
            .get_embeddings(&["lorem ipsum".to_string()], InputType::SearchQuery)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].len(), 16);

        let other = embedder
            .get_embeddings(&["dolor sit amet".to_string()], InputType::SearchDocument)
            .await
            .unwrap();
        assert_ne!(first, other);
    }
}
