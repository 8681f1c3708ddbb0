//! Retrieval interfaces. No retrieval math is implemented here; these
//! traits exist so the `rag` tool category has something real to call
//! when enabled, and a safe no-op when it isn't.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub source: String,
    pub text: String,
    pub score: f32,
}

/// Turns text into a vector. Left unimplemented by `NullRetriever`; a real
/// deployment would back this with an HTTP call via `reqwest`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<RetrievedChunk>>;
}

/// Always returns an empty result set. Installed when the `rag` tool
/// category is disabled or no embedding backend is configured, so callers
/// never have to special-case "RAG is off".
pub struct NullRetriever;

#[async_trait]
impl Retriever for NullRetriever {
    async fn retrieve(&self, _query: &str, _top_k: usize) -> anyhow::Result<Vec<RetrievedChunk>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_retriever_returns_nothing() {
        let chunks = NullRetriever.retrieve("anything", 5).await.unwrap();
        assert!(chunks.is_empty());
    }
}
