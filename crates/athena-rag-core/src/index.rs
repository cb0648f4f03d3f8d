//! Immutable in-memory vector index.
//!
//! A [`VectorIndex`] holds the (chunk, vector) pairs for exactly one schema
//! document. It is built once and never updated; replacing the active
//! document means building a new index and swapping it in, which the
//! session controller does under its own lock.
//!
//! Search is brute-force cosine similarity over all stored vectors.

use std::cmp::Ordering;

use crate::embedding::cosine_similarity;
use crate::error::{RagError, Result};
use crate::models::{Chunk, RetrievalResult, ScoredChunk};

struct IndexEntry {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// Nearest-neighbour index over one document's chunks.
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dims: usize,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("chunks", &self.entries.len())
            .field("dims", &self.dims)
            .finish()
    }
}

impl VectorIndex {
    /// Build an index from parallel chunk and vector sequences.
    ///
    /// # Errors
    ///
    /// - [`RagError::LengthMismatch`] if the sequences differ in length.
    /// - [`RagError::EmptyInput`] if there are no chunks.
    /// - [`RagError::Embedding`] if vectors differ in dimensionality.
    pub fn build(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(RagError::LengthMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }
        if chunks.is_empty() {
            return Err(RagError::EmptyInput);
        }

        let dims = vectors[0].len();
        if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dims) {
            return Err(RagError::Embedding(format!(
                "vector {} has {} dimensions, expected {}",
                i,
                v.len(),
                dims
            )));
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect();

        Ok(Self { entries, dims })
    }

    /// Return the `k` chunks most similar to `vector`, best first.
    ///
    /// Ties are broken by ascending chunk index. Fewer than `k` results are
    /// returned when the index holds fewer chunks. There is no similarity
    /// cutoff.
    ///
    /// # Errors
    ///
    /// [`RagError::Embedding`] if `vector` has the wrong dimensionality.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<RetrievalResult> {
        if vector.len() != self.dims {
            return Err(RagError::Embedding(format!(
                "query vector has {} dimensions, index has {}",
                vector.len(),
                self.dims
            )));
        }

        let mut scored: Vec<(f32, &IndexEntry)> = self
            .entries
            .iter()
            .map(|e| (cosine_similarity(vector, &e.vector), e))
            .collect();

        scored.sort_by(|(sa, ea), (sb, eb)| {
            rank_score(*sb)
                .partial_cmp(&rank_score(*sa))
                .unwrap_or(Ordering::Equal)
                .then_with(|| ea.chunk.index.cmp(&eb.chunk.index))
        });
        scored.truncate(k);

        Ok(RetrievalResult {
            hits: scored
                .into_iter()
                .map(|(score, e)| ScoredChunk {
                    chunk: e.chunk.clone(),
                    score,
                })
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// All chunks in index order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }
}

/// NaN ranks below every real score.
fn rank_score(s: f32) -> f32 {
    if s.is_nan() {
        f32::NEG_INFINITY
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, text: &str) -> Chunk {
        Chunk {
            index,
            text: text.to_string(),
            overlap_chars: 0,
        }
    }

    fn sample_index() -> VectorIndex {
        VectorIndex::build(
            vec![
                chunk(0, "customers"),
                chunk(1, "orders"),
                chunk(2, "customers copy"),
                chunk(3, "invoices"),
            ],
            vec![
                vec![1.0, 0.0],
                vec![0.0, 1.0],
                vec![2.0, 0.0],
                vec![0.7, 0.7],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_length_mismatch() {
        let err = VectorIndex::build(vec![chunk(0, "a")], vec![]).unwrap_err();
        assert!(matches!(
            err,
            RagError::LengthMismatch {
                chunks: 1,
                vectors: 0
            }
        ));
    }

    #[test]
    fn test_empty_build() {
        let err = VectorIndex::build(vec![], vec![]).unwrap_err();
        assert!(matches!(err, RagError::EmptyInput));
    }

    #[test]
    fn test_ragged_vectors_rejected() {
        let err = VectorIndex::build(
            vec![chunk(0, "a"), chunk(1, "b")],
            vec![vec![1.0, 0.0], vec![1.0]],
        )
        .unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
    }

    #[test]
    fn test_query_sorted_with_stable_ties() {
        let index = sample_index();
        let result = index.query(&[1.0, 0.0], 4).unwrap();
        let order: Vec<usize> = result.hits.iter().map(|h| h.chunk.index).collect();
        // Chunks 0 and 2 both have similarity 1.0; lower index wins.
        assert_eq!(order, vec![0, 2, 3, 1]);
        for pair in result.hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_query_returns_min_k_and_len() {
        let index = sample_index();
        assert_eq!(index.query(&[0.0, 1.0], 2).unwrap().len(), 2);
        assert_eq!(index.query(&[0.0, 1.0], 10).unwrap().len(), 4);
        assert!(index.query(&[0.0, 1.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_query_wrong_dims() {
        let index = sample_index();
        assert!(matches!(
            index.query(&[1.0, 0.0, 0.0], 2),
            Err(RagError::Embedding(_))
        ));
    }

    #[test]
    fn test_zero_query_vector_keeps_index_order() {
        let index = sample_index();
        let result = index.query(&[0.0, 0.0], 4).unwrap();
        let order: Vec<usize> = result.hits.iter().map(|h| h.chunk.index).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }
}
