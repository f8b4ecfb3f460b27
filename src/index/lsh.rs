//! Approximate k-NN via locality-sensitive hashing with random hyperplane
//! projections (sign random projections). Cosine only.
//!
//! Each of the `num_tables` tables hashes a vector to a `num_bits`-long bit
//! string: one bit per hyperplane, set when the dot product with that
//! hyperplane's normal is positive. Candidates are the union of the query's
//! buckets across tables, re-ranked exactly by dot product.

use std::collections::{HashMap, HashSet};

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use uuid::Uuid;

use super::{dot, normalize, IndexKind, Metric, VectorIndex};
use crate::error::{Result, ShelfDbError};
use crate::model::Chunk;

/// A vector index using random-projection LSH with exact re-ranking.
#[derive(Debug)]
pub struct LshIndex {
    num_bits: usize,
    num_tables: usize,
    seed: Option<u64>,
    /// One hyperplane matrix per table, shape (dimension, num_bits).
    /// Created lazily on the first accepted vector.
    planes: Vec<Array2<f32>>,
    /// One bucket map per table: signature -> ids hashed there.
    tables: Vec<HashMap<String, HashSet<Uuid>>>,
    chunks: HashMap<Uuid, Chunk>,
    /// Normalized vectors, kept for re-ranking and delete re-hashing.
    vectors: HashMap<Uuid, Vec<f32>>,
    /// Frozen at the first insertion.
    dimension: usize,
}

impl LshIndex {
    pub fn new(num_bits: usize, num_tables: usize, seed: Option<u64>) -> Self {
        Self {
            num_bits,
            num_tables,
            seed,
            planes: Vec::new(),
            tables: Vec::new(),
            chunks: HashMap::new(),
            vectors: HashMap::new(),
            dimension: 0,
        }
    }

    /// Draw the hyperplanes for every table from a standard normal
    /// distribution. StdRng seeded from the configured seed keeps plane
    /// generation reproducible; OS entropy is used when no seed is set.
    fn initialize_planes(&mut self, dimension: usize) {
        if !self.planes.is_empty() {
            return;
        }
        self.dimension = dimension;

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        for _ in 0..self.num_tables {
            let planes =
                Array2::from_shape_fn((dimension, self.num_bits), |_| rng.sample(StandardNormal));
            self.planes.push(planes);
            self.tables.push(HashMap::new());
        }
    }

    /// Bit-string signature of a vector in the given table: the sign of
    /// its projection onto each hyperplane column.
    fn hash_vector(&self, vector: &[f32], table_index: usize) -> String {
        let projections = ArrayView1::from(vector).dot(&self.planes[table_index]);
        projections
            .iter()
            .map(|p| if *p > 0.0 { '1' } else { '0' })
            .collect()
    }

    /// Discard an id from every table's bucket for its stored vector,
    /// pruning buckets that end up empty.
    fn remove_from_buckets(&mut self, chunk_id: &Uuid) {
        let Some(vector) = self.vectors.get(chunk_id).cloned() else {
            return;
        };
        for table_index in 0..self.num_tables {
            let signature = self.hash_vector(&vector, table_index);
            if let Some(bucket) = self.tables[table_index].get_mut(&signature) {
                bucket.remove(chunk_id);
                if bucket.is_empty() {
                    self.tables[table_index].remove(&signature);
                }
            }
        }
    }
}

impl VectorIndex for LshIndex {
    fn build(&mut self, chunks: &[Chunk]) {
        self.chunks.clear();
        self.vectors.clear();
        self.planes.clear();
        self.tables.clear();
        self.dimension = 0;

        for chunk in chunks {
            self.insert(chunk);
        }
    }

    fn insert(&mut self, chunk: &Chunk) {
        let Some(embedding) = &chunk.embedding else {
            return;
        };
        // Random projection hashes by angle, so vectors are normalized.
        let vector = normalize(embedding);

        if self.planes.is_empty() {
            self.initialize_planes(vector.len());
        } else if vector.len() != self.dimension {
            // Wrong dimension: reject without effect.
            return;
        }

        // Upsert: an existing id must leave its old buckets first, or a
        // changed vector would strand a stale bucket entry.
        if self.vectors.contains_key(&chunk.id) {
            self.remove_from_buckets(&chunk.id);
        }

        for table_index in 0..self.num_tables {
            let signature = self.hash_vector(&vector, table_index);
            self.tables[table_index]
                .entry(signature)
                .or_default()
                .insert(chunk.id);
        }

        self.chunks.insert(chunk.id, chunk.clone());
        self.vectors.insert(chunk.id, vector);
    }

    fn delete(&mut self, chunk_id: &Uuid) {
        if !self.vectors.contains_key(chunk_id) {
            return;
        }
        self.remove_from_buckets(chunk_id);
        self.chunks.remove(chunk_id);
        self.vectors.remove(chunk_id);
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(Chunk, f32)>> {
        if self.planes.is_empty() || self.vectors.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(ShelfDbError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let query_vector = normalize(query);

        // Union of the query's buckets across all tables.
        let mut candidate_ids: HashSet<Uuid> = HashSet::new();
        for table_index in 0..self.num_tables {
            let signature = self.hash_vector(&query_vector, table_index);
            if let Some(bucket) = self.tables[table_index].get(&signature) {
                candidate_ids.extend(bucket.iter().copied());
            }
        }

        if candidate_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Exact re-rank of the candidate subset.
        let mut scored: Vec<(Uuid, f32)> = candidate_ids
            .into_iter()
            .filter_map(|id| {
                self.vectors
                    .get(&id)
                    .map(|vector| (id, dot(vector, &query_vector)))
            })
            .collect();

        // Partial select when the candidate set exceeds k, then sort just
        // the survivors descending by score (ties by id, for determinism).
        let cmp = |a: &(Uuid, f32), b: &(Uuid, f32)| b.1.total_cmp(&a.1).then_with(|| b.0.cmp(&a.0));
        if scored.len() > k {
            scored.select_nth_unstable_by(k - 1, cmp);
            scored.truncate(k);
        }
        scored.sort_by(cmp);

        Ok(scored
            .into_iter()
            .filter_map(|(id, score)| self.chunks.get(&id).map(|chunk| (chunk.clone(), score)))
            .collect())
    }

    fn vector_count(&self) -> usize {
        self.chunks.len()
    }

    fn metric(&self) -> Metric {
        Metric::Cosine
    }

    fn kind(&self) -> IndexKind {
        IndexKind::Lsh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metadata;

    fn chunk_with(embedding: Vec<f32>) -> Chunk {
        let mut chunk = Chunk::new("test", Metadata::new());
        chunk.embedding = Some(embedding);
        chunk
    }

    fn buckets_holding(index: &LshIndex, id: &Uuid) -> Vec<(usize, String)> {
        let mut out = Vec::new();
        for (table_index, table) in index.tables.iter().enumerate() {
            for (signature, bucket) in table {
                if bucket.contains(id) {
                    out.push((table_index, signature.clone()));
                }
            }
        }
        out.sort();
        out
    }

    #[test]
    fn test_initialization_is_lazy() {
        let index = LshIndex::new(8, 5, Some(42));
        assert_eq!(index.vector_count(), 0);
        assert!(index.planes.is_empty());
        assert_eq!(index.kind(), IndexKind::Lsh);
        assert_eq!(index.metric(), Metric::Cosine);
    }

    #[test]
    fn test_insert_single_chunk_initializes_planes() {
        let mut index = LshIndex::new(8, 5, Some(42));
        let chunk = chunk_with(vec![0.1, 0.2, 0.3]);
        index.insert(&chunk);

        assert_eq!(index.vector_count(), 1);
        assert!(index.chunks.contains_key(&chunk.id));
        assert_eq!(index.planes.len(), 5);
        assert_eq!(index.planes[0].dim(), (3, 8));
        assert_eq!(index.dimension, 3);
    }

    #[test]
    fn test_hashing_consistency() {
        // Identical vectors must land in the same bucket in every table.
        let mut index = LshIndex::new(8, 5, Some(7));
        let first = chunk_with(vec![0.5, -0.5, 0.5]);
        let second = chunk_with(vec![0.5, -0.5, 0.5]);
        index.insert(&first);
        index.insert(&second);

        for table in &index.tables {
            let non_empty: Vec<_> = table.values().filter(|b| !b.is_empty()).collect();
            assert_eq!(non_empty.len(), 1);
            assert!(non_empty[0].contains(&first.id));
            assert!(non_empty[0].contains(&second.id));
        }
    }

    #[test]
    fn test_insert_rejects_mismatched_dimension() {
        let mut index = LshIndex::new(8, 3, Some(1));
        index.insert(&chunk_with(vec![1.0, 0.0, 0.0]));
        index.insert(&chunk_with(vec![1.0, 0.0]));
        assert_eq!(index.vector_count(), 1);
    }

    #[test]
    fn test_delete_removes_from_all_structures() {
        let mut index = LshIndex::new(8, 5, Some(42));
        let chunk = chunk_with(vec![1.0, 0.0, 0.0]);
        index.insert(&chunk);
        assert_eq!(index.vector_count(), 1);

        index.delete(&chunk.id);

        assert_eq!(index.vector_count(), 0);
        assert!(!index.chunks.contains_key(&chunk.id));
        assert!(!index.vectors.contains_key(&chunk.id));
        for table in &index.tables {
            for bucket in table.values() {
                assert!(!bucket.contains(&chunk.id));
            }
        }
    }

    #[test]
    fn test_delete_prunes_empty_buckets() {
        let mut index = LshIndex::new(8, 5, Some(42));
        let chunk = chunk_with(vec![1.0, 0.0, 0.0]);
        index.insert(&chunk);
        index.delete(&chunk.id);

        for table in &index.tables {
            assert!(table.is_empty());
        }
    }

    #[test]
    fn test_reinsert_lands_in_same_buckets() {
        let mut index = LshIndex::new(8, 5, Some(42));
        let chunk = chunk_with(vec![0.3, 0.6, -0.2]);
        index.insert(&chunk);
        let before = buckets_holding(&index, &chunk.id);

        index.delete(&chunk.id);
        index.insert(&chunk);
        let after = buckets_holding(&index, &chunk.id);

        assert_eq!(before, after);
        assert_eq!(before.len(), 5);
    }

    #[test]
    fn test_upsert_replaces_bucket_entries() {
        let mut index = LshIndex::new(8, 5, Some(42));
        let mut chunk = chunk_with(vec![1.0, 0.0, 0.0]);
        index.insert(&chunk);

        chunk.embedding = Some(vec![-1.0, 0.0, 0.0]);
        index.insert(&chunk);

        assert_eq!(index.vector_count(), 1);
        // Exactly one bucket entry per table; the old signature is gone.
        assert_eq!(buckets_holding(&index, &chunk.id).len(), 5);
        for table in &index.tables {
            let total: usize = table.values().map(|b| b.len()).sum();
            assert_eq!(total, 1);
        }
    }

    #[test]
    fn test_build_bulk() {
        let chunks = vec![
            chunk_with(vec![1.0, 0.0, 0.0]),
            chunk_with(vec![0.0, 1.0, 0.0]),
            chunk_with(vec![0.0, 0.0, 1.0]),
        ];
        let mut index = LshIndex::new(8, 5, Some(42));
        index.build(&chunks);
        assert_eq!(index.vector_count(), 3);
        assert_eq!(index.planes.len(), 5);

        // Rebuild clears and repopulates.
        index.build(&chunks[..1]);
        assert_eq!(index.vector_count(), 1);
    }

    #[test]
    fn test_search_empty_index_returns_empty() {
        let index = LshIndex::new(8, 5, Some(42));
        assert!(index.search(&[1.0, 0.0, 0.0], 3).unwrap().is_empty());
    }

    #[test]
    fn test_search_dimension_mismatch() {
        let mut index = LshIndex::new(8, 5, Some(42));
        index.insert(&chunk_with(vec![1.0, 0.0, 0.0]));

        let err = index.search(&[1.0, 0.0], 1).unwrap_err();
        assert!(matches!(
            err,
            ShelfDbError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_search_accuracy_simple() {
        // Orthogonal distractors: the easy case any working LSH must pass.
        let target = chunk_with(vec![1.0, 0.0, 0.0]);
        let distractor_y = chunk_with(vec![0.0, 1.0, 0.0]);
        let distractor_z = chunk_with(vec![0.0, 0.0, 1.0]);

        let mut index = LshIndex::new(8, 5, Some(42));
        index.build(&[target.clone(), distractor_y, distractor_z]);

        let results = index.search(&[0.99, 0.01, 0.0], 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.id, target.id);
        assert!(results[0].1 > 0.9);
    }

    #[test]
    fn test_recall_for_near_neighbors() {
        // A neighbor 10 degrees from the target must show up in the top-2
        // in at least 9 of 10 seeded trials (8 bits, 5 tables).
        let angle = 10f32.to_radians();
        let neighbor_vec = vec![angle.cos(), angle.sin(), 0.0];

        let mut successes = 0;
        for trial_seed in 0..10u64 {
            let target = chunk_with(vec![1.0, 0.0, 0.0]);
            let neighbor = chunk_with(neighbor_vec.clone());

            // Noise points well away from the target.
            let mut noise_rng = StdRng::seed_from_u64(1000 + trial_seed);
            let mut chunks = vec![target.clone(), neighbor.clone()];
            while chunks.len() < 52 {
                let v: Vec<f32> = (0..3).map(|_| noise_rng.sample(StandardNormal)).collect();
                let v = normalize(&v);
                if dot(&v, &[1.0, 0.0, 0.0]) < 0.5 {
                    chunks.push(chunk_with(v));
                }
            }

            let mut index = LshIndex::new(8, 5, Some(trial_seed));
            index.build(&chunks);

            let results = index.search(&[1.0, 0.0, 0.0], 2).unwrap();
            let found: Vec<Uuid> = results.iter().map(|(c, _)| c.id).collect();
            if found.contains(&target.id) && found.contains(&neighbor.id) {
                successes += 1;
            }
        }

        assert!(successes >= 9, "recall too low: {successes}/10");
    }

    #[test]
    fn test_candidate_overflow_partial_sort() {
        // More candidates than k: the top-k must still be exact over the
        // candidate set and sorted descending.
        let mut chunks = Vec::new();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..40 {
            let v: Vec<f32> = (0..4).map(|_| rng.sample(StandardNormal)).collect();
            chunks.push(chunk_with(v));
        }

        // One table with one bit puts roughly half the points in the
        // query's bucket.
        let mut index = LshIndex::new(1, 1, Some(3));
        index.build(&chunks);

        let query = vec![0.5, 0.5, 0.5, 0.5];
        let results = index.search(&query, 5).unwrap();
        assert!(results.len() <= 5);
        for pair in results.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }
}
