//! Vector index abstractions: the [`VectorIndex`] trait, the two concrete
//! index structures (AVL tree and LSH), and the factory that builds one
//! from an [`IndexConfig`].

pub mod avl;
pub mod lsh;

pub use avl::AvlIndex;
pub use lsh::LshIndex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DEFAULT_LSH_NUM_BITS, DEFAULT_LSH_NUM_TABLES};
use crate::error::{Result, ShelfDbError};
use crate::model::Chunk;

/// The available index structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Avl,
    Lsh,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Avl => "avl",
            IndexKind::Lsh => "lsh",
        }
    }
}

/// The supported distance metrics.
///
/// Cosine scores are similarities (higher is better, 1.0 = identical
/// direction); Euclidean scores are distances (lower is better, 0.0 =
/// identical point).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cosine,
    Euclidean,
}

/// Configuration record an index is created from. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub kind: IndexKind,
    pub metric: Metric,
    /// Hyperplanes per LSH table. More bits = more buckets, higher
    /// precision, lower recall. Ignored by AVL.
    #[serde(default = "default_num_bits")]
    pub num_bits: usize,
    /// Independent LSH hash tables. More tables = higher recall, more
    /// memory. Ignored by AVL.
    #[serde(default = "default_num_tables")]
    pub num_tables: usize,
    /// Seed for hyperplane generation; OS entropy when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_num_bits() -> usize {
    DEFAULT_LSH_NUM_BITS
}

fn default_num_tables() -> usize {
    DEFAULT_LSH_NUM_TABLES
}

/// Status record kept alongside every live index, updated synchronously
/// with each index mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub name: String,
    pub config: IndexConfig,
    pub vector_count: usize,
    pub kind: IndexKind,
}

/// Uniform contract for the index structures.
///
/// `build` replaces all internal state (chunks without an embedding are
/// skipped), `insert` is an upsert by chunk id, `delete` is a no-op when the
/// id is absent, and `search` returns up to `min(k, vector_count)` scored
/// chunks sorted best-first. A query whose length disagrees with the
/// index's fixed dimension is a [`ShelfDbError::DimensionMismatch`].
pub trait VectorIndex: Send + Sync + std::fmt::Debug {
    fn build(&mut self, chunks: &[Chunk]);
    fn insert(&mut self, chunk: &Chunk);
    fn delete(&mut self, chunk_id: &Uuid);
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(Chunk, f32)>>;
    fn vector_count(&self) -> usize;
    fn metric(&self) -> Metric;
    fn kind(&self) -> IndexKind;
}

/// Construct a fresh, empty index from a configuration record.
pub fn create_index(config: &IndexConfig) -> Result<Box<dyn VectorIndex>> {
    match config.kind {
        IndexKind::Avl => Ok(Box::new(AvlIndex::new(config.metric))),
        IndexKind::Lsh => {
            if config.metric != Metric::Cosine {
                return Err(ShelfDbError::config_invalid(
                    "lsh indices support only the cosine metric",
                ));
            }
            if config.num_bits == 0 {
                return Err(ShelfDbError::config_invalid("num_bits must be positive"));
            }
            if config.num_tables == 0 {
                return Err(ShelfDbError::config_invalid("num_tables must be positive"));
            }
            Ok(Box::new(LshIndex::new(
                config.num_bits,
                config.num_tables,
                config.seed,
            )))
        }
    }
}

// --- vector math helpers shared by the index implementations ---

pub(crate) fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Unit vector when the norm is positive; an unchanged copy otherwise
/// (zero vectors are stored as-is and score 0 against any cosine query).
pub(crate) fn normalize(v: &[f32]) -> Vec<f32> {
    let norm = l2_norm(v);
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub(crate) fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_creates_avl() {
        let config = IndexConfig {
            kind: IndexKind::Avl,
            metric: Metric::Euclidean,
            num_bits: default_num_bits(),
            num_tables: default_num_tables(),
            seed: None,
        };
        let index = create_index(&config).unwrap();
        assert_eq!(index.kind(), IndexKind::Avl);
        assert_eq!(index.metric(), Metric::Euclidean);
        assert_eq!(index.vector_count(), 0);
    }

    #[test]
    fn test_factory_rejects_lsh_euclidean() {
        let config = IndexConfig {
            kind: IndexKind::Lsh,
            metric: Metric::Euclidean,
            num_bits: 8,
            num_tables: 3,
            seed: None,
        };
        let err = create_index(&config).unwrap_err();
        assert!(matches!(err, ShelfDbError::ConfigInvalid(_)));
    }

    #[test]
    fn test_factory_rejects_non_positive_lsh_params() {
        let config = IndexConfig {
            kind: IndexKind::Lsh,
            metric: Metric::Cosine,
            num_bits: 0,
            num_tables: 3,
            seed: None,
        };
        assert!(matches!(
            create_index(&config),
            Err(ShelfDbError::ConfigInvalid(_))
        ));

        let config = IndexConfig {
            kind: IndexKind::Lsh,
            metric: Metric::Cosine,
            num_bits: 8,
            num_tables: 0,
            seed: None,
        };
        assert!(matches!(
            create_index(&config),
            Err(ShelfDbError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: IndexConfig =
            serde_json::from_str(r#"{"kind": "lsh", "metric": "cosine"}"#).unwrap();
        assert_eq!(config.num_bits, DEFAULT_LSH_NUM_BITS);
        assert_eq!(config.num_tables, DEFAULT_LSH_NUM_TABLES);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_normalize_zero_vector_is_unchanged() {
        let zero = vec![0.0, 0.0, 0.0];
        assert_eq!(normalize(&zero), zero);

        let unit = normalize(&[3.0, 4.0]);
        assert!((l2_norm(&unit) - 1.0).abs() < 1e-6);
    }
}
