//! Exact k-NN over a self-balancing AVL tree.
//!
//! The tree is keyed by chunk id (128-bit, totally ordered), which gives
//! O(log N) inserts, updates and deletions. Search is an exhaustive O(N)
//! traversal that keeps the running top-k in a bounded binary heap.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use uuid::Uuid;

use super::{dot, euclidean, normalize, IndexKind, Metric, VectorIndex};
use crate::error::{Result, ShelfDbError};
use crate::model::Chunk;

/// A node in the AVL tree.
#[derive(Debug)]
struct AvlNode {
    key: Uuid,
    chunk: Chunk,
    /// Unit-normalized when the metric is cosine and the norm is positive.
    vector: Vec<f32>,
    height: i32,
    left: Option<Box<AvlNode>>,
    right: Option<Box<AvlNode>>,
}

impl AvlNode {
    fn new(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self {
            key: chunk.id,
            chunk,
            vector,
            height: 1,
            left: None,
            right: None,
        }
    }

    fn update_height(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
    }

    /// Left height minus right height; must stay within [-1, 1].
    fn balance_factor(&self) -> i32 {
        height(&self.left) - height(&self.right)
    }
}

fn height(node: &Option<Box<AvlNode>>) -> i32 {
    node.as_ref().map_or(0, |n| n.height)
}

/// Candidate kept in the bounded search heap. Priority is "higher is
/// better": the cosine score directly, or the negated Euclidean distance.
/// Ties are broken by chunk id so results are deterministic.
struct HeapEntry {
    priority: f32,
    chunk: Chunk,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| self.chunk.id.cmp(&other.chunk.id))
    }
}

/// A vector index implemented as an AVL tree keyed by chunk id.
#[derive(Debug)]
pub struct AvlIndex {
    metric: Metric,
    root: Option<Box<AvlNode>>,
    vector_count: usize,
    /// Dimension of the first accepted vector; checked against queries.
    dimension: Option<usize>,
}

impl AvlIndex {
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            root: None,
            vector_count: 0,
            dimension: None,
        }
    }

    fn stored_vector(&self, embedding: &[f32]) -> Vec<f32> {
        match self.metric {
            Metric::Cosine => normalize(embedding),
            Metric::Euclidean => embedding.to_vec(),
        }
    }

    // --- tree core ---

    fn insert_node(
        node: Option<Box<AvlNode>>,
        chunk: Chunk,
        vector: Vec<f32>,
        count: &mut usize,
    ) -> Box<AvlNode> {
        let mut node = match node {
            None => {
                *count += 1;
                return Box::new(AvlNode::new(chunk, vector));
            }
            Some(node) => node,
        };

        match chunk.id.cmp(&node.key) {
            Ordering::Less => {
                node.left = Some(Self::insert_node(node.left.take(), chunk, vector, count));
            }
            Ordering::Greater => {
                node.right = Some(Self::insert_node(node.right.take(), chunk, vector, count));
            }
            Ordering::Equal => {
                // Upsert: replace payload, no structural change.
                node.chunk = chunk;
                node.vector = vector;
                return node;
            }
        }

        Self::rebalance(node)
    }

    fn delete_node(
        node: Option<Box<AvlNode>>,
        key: &Uuid,
        count: &mut usize,
    ) -> Option<Box<AvlNode>> {
        let mut node = node?;

        match key.cmp(&node.key) {
            Ordering::Less => {
                node.left = Self::delete_node(node.left.take(), key, count);
            }
            Ordering::Greater => {
                node.right = Self::delete_node(node.right.take(), key, count);
            }
            Ordering::Equal => {
                *count -= 1;
                match (node.left.take(), node.right.take()) {
                    (None, right) => return right,
                    (left, None) => return left,
                    (left, Some(right)) => {
                        // Two children: splice in the in-order successor
                        // (leftmost of the right subtree).
                        let (rest, mut successor) = Self::take_min(right);
                        successor.left = left;
                        successor.right = rest;
                        node = successor;
                    }
                }
            }
        }

        Some(Self::rebalance(node))
    }

    /// Detach the leftmost node of a subtree, rebalancing the path down to
    /// it. Returns (remaining subtree, detached node).
    fn take_min(mut node: Box<AvlNode>) -> (Option<Box<AvlNode>>, Box<AvlNode>) {
        match node.left.take() {
            None => {
                let right = node.right.take();
                (right, node)
            }
            Some(left) => {
                let (rest, min) = Self::take_min(left);
                node.left = rest;
                (Some(Self::rebalance(node)), min)
            }
        }
    }

    /// Recompute height and apply the rotation for whichever of the four
    /// standard cases (LL, RR, LR, RL) the balance factor selects.
    fn rebalance(mut node: Box<AvlNode>) -> Box<AvlNode> {
        node.update_height();
        let balance = node.balance_factor();

        if balance > 1 {
            if let Some(left) = node.left.take() {
                node.left = Some(if left.balance_factor() < 0 {
                    Self::rotate_left(left)
                } else {
                    left
                });
            }
            return Self::rotate_right(node);
        }

        if balance < -1 {
            if let Some(right) = node.right.take() {
                node.right = Some(if right.balance_factor() > 0 {
                    Self::rotate_right(right)
                } else {
                    right
                });
            }
            return Self::rotate_left(node);
        }

        node
    }

    fn rotate_left(mut z: Box<AvlNode>) -> Box<AvlNode> {
        match z.right.take() {
            Some(mut y) => {
                z.right = y.left.take();
                z.update_height();
                y.left = Some(z);
                y.update_height();
                y
            }
            None => z,
        }
    }

    fn rotate_right(mut z: Box<AvlNode>) -> Box<AvlNode> {
        match z.left.take() {
            Some(mut y) => {
                z.left = y.right.take();
                z.update_height();
                y.right = Some(z);
                y.update_height();
                y
            }
            None => z,
        }
    }

    fn visit(
        node: &AvlNode,
        query: &[f32],
        metric: Metric,
        k: usize,
        heap: &mut BinaryHeap<Reverse<HeapEntry>>,
    ) {
        let priority = match metric {
            Metric::Cosine => dot(&node.vector, query),
            Metric::Euclidean => -euclidean(&node.vector, query),
        };
        heap.push(Reverse(HeapEntry {
            priority,
            chunk: node.chunk.clone(),
        }));
        // Min-heap over "higher is better" priorities: popping evicts the
        // current worst once more than k candidates are held.
        if heap.len() > k {
            heap.pop();
        }

        if let Some(left) = &node.left {
            Self::visit(left, query, metric, k, heap);
        }
        if let Some(right) = &node.right {
            Self::visit(right, query, metric, k, heap);
        }
    }
}

impl VectorIndex for AvlIndex {
    fn build(&mut self, chunks: &[Chunk]) {
        self.root = None;
        self.vector_count = 0;
        self.dimension = None;
        for chunk in chunks {
            self.insert(chunk);
        }
    }

    fn insert(&mut self, chunk: &Chunk) {
        let Some(embedding) = &chunk.embedding else {
            return;
        };
        let vector = self.stored_vector(embedding);
        if self.dimension.is_none() {
            self.dimension = Some(vector.len());
        }
        self.root = Some(Self::insert_node(
            self.root.take(),
            chunk.clone(),
            vector,
            &mut self.vector_count,
        ));
    }

    fn delete(&mut self, chunk_id: &Uuid) {
        self.root = Self::delete_node(self.root.take(), chunk_id, &mut self.vector_count);
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(Chunk, f32)>> {
        let Some(root) = &self.root else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }
        if let Some(expected) = self.dimension {
            if query.len() != expected {
                return Err(ShelfDbError::DimensionMismatch {
                    expected,
                    actual: query.len(),
                });
            }
        }

        let query_vector = match self.metric {
            Metric::Cosine => normalize(query),
            Metric::Euclidean => query.to_vec(),
        };

        let mut heap: BinaryHeap<Reverse<HeapEntry>> = BinaryHeap::with_capacity(k + 1);
        Self::visit(root, &query_vector, self.metric, k, &mut heap);

        let mut survivors: Vec<HeapEntry> = heap.into_iter().map(|Reverse(entry)| entry).collect();
        survivors.sort_by(|a, b| b.cmp(a));

        Ok(survivors
            .into_iter()
            .map(|entry| {
                let score = match self.metric {
                    Metric::Cosine => entry.priority,
                    Metric::Euclidean => -entry.priority,
                };
                (entry.chunk, score)
            })
            .collect())
    }

    fn vector_count(&self) -> usize {
        self.vector_count
    }

    fn metric(&self) -> Metric {
        self.metric
    }

    fn kind(&self) -> IndexKind {
        IndexKind::Avl
    }
}
