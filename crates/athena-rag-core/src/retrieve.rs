//! Question → top-k schema chunks.

use crate::embedding::Embedder;
use crate::error::Result;
use crate::index::VectorIndex;
use crate::models::RetrievalResult;

/// Default number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 4;

/// Embed `question` and return the `k` most similar chunks from `index`.
///
/// The caller owns the "is there an index at all" check; this function
/// never sees an uninitialized session.
pub async fn retrieve(
    question: &str,
    index: &VectorIndex,
    embedder: &dyn Embedder,
    k: usize,
) -> Result<RetrievalResult> {
    let query_vec = embedder.embed(question).await?;
    index.query(&query_vec, k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::split;
    use crate::embedding::{embed_all, HashEmbedder};

    async fn build(text: &str, embedder: &HashEmbedder) -> VectorIndex {
        let chunks = split(text, 60, 0).unwrap();
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embed_all(embedder, &texts, 16).await.unwrap();
        VectorIndex::build(chunks, vectors).unwrap()
    }

    #[tokio::test]
    async fn test_retrieve_ranks_matching_table_first() {
        let embedder = HashEmbedder::default();
        let text = "CREATE TABLE invoices(total DECIMAL, due DATE);\n\
                    CREATE TABLE customers(id INT, name VARCHAR);\n\
                    CREATE TABLE shipments(carrier VARCHAR, eta DATE);";
        let index = build(text, &embedder).await;
        assert_eq!(index.len(), 3);

        let result = retrieve("customers name", &index, &embedder, 1)
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        assert!(result.hits[0].chunk.text.contains("customers"));
    }

    #[tokio::test]
    async fn test_retrieve_returns_all_when_k_exceeds_len() {
        let embedder = HashEmbedder::default();
        let index = build("CREATE TABLE a(id INT);", &embedder).await;
        let result = retrieve("anything", &index, &embedder, DEFAULT_TOP_K)
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
    }
}
