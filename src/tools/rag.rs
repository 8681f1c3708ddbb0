//! `rag` category: opt-in via `ENABLE_RAG`. The
//! retriever is a `NullRetriever` unless a real one is wired in at startup.

use async_trait::async_trait;
use mcp_kernel::registry::ToolRegistry;
use mcp_kernel::tool::{Tool, ToolContext, ToolDef, ToolResult};
use serde_json::json;
use std::sync::Arc;

use crate::rag::Retriever;

use super::ToolDeps;

pub fn register(registry: &mut ToolRegistry, deps: &ToolDeps) {
    registry
        .register(
            "rag",
            Arc::new(RetrieveContext {
                retriever: deps.retriever.clone(),
            }),
        )
        .expect("register retrieve_context");
}

struct RetrieveContext {
    retriever: Arc<dyn Retriever>,
}

#[async_trait]
impl Tool for RetrieveContext {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "retrieve_context".to_string(),
            description: "retrieves the top-k most relevant indexed chunks for a query".to_string(),
            input_schema: json!({
                "type": "object",
                "required": ["query"],
                "properties": {
                    "query": {"type": "string"},
                    "top_k": {"type": "integer", "minimum": 1}
                }
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, _ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("query is required"))?;
        let top_k = args
            .get("top_k")
            .and_then(|v| v.as_u64())
            .unwrap_or(5) as usize;

        let chunks = self.retriever.retrieve(query, top_k).await?;
        Ok(ToolResult::ok_json(&serde_json::to_value(chunks)?))
    }
}
