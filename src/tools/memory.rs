//! `memory` category: shared project context.

use async_trait::async_trait;
use mcp_kernel::registry::ToolRegistry;
use mcp_kernel::tool::{Tool, ToolContext, ToolDef, ToolResult};
use serde_json::json;
use std::sync::Arc;

use super::ToolDeps;

pub fn register(registry: &mut ToolRegistry, deps: &ToolDeps) {
    let category = "memory";
    registry
        .register(
            category,
            Arc::new(UpsertContext {
                store: deps.store.clone(),
            }),
        )
        .expect("register upsert_context");
    registry
        .register(
            category,
            Arc::new(ListContext {
                store: deps.store.clone(),
            }),
        )
        .expect("register list_context");
    registry
        .register(
            category,
            Arc::new(ArchiveContext {
                store: deps.store.clone(),
            }),
        )
        .expect("register archive_context");
}

struct UpsertContext {
    store: crate::store::Store,
}

#[async_trait]
impl Tool for UpsertContext {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "upsert_context".to_string(),
            description: "sets or overwrites a shared context entry".to_string(),
            input_schema: json!({
                "type": "object",
                "required": ["key", "value", "updated_by"],
                "properties": {
                    "key": {"type": "string"},
                    "value": {},
                    "description": {"type": "string"},
                    "updated_by": {"type": "string"}
                }
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, _ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        let key = args
            .get("key")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("key is required"))?;
        let value = args
            .get("value")
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("value is required"))?;
        let description = args
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let updated_by = args
            .get("updated_by")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("updated_by is required"))?;

        self.store
            .upsert_context(key, value, &description, updated_by)
            .await?;
        Ok(ToolResult::ok(format!("context '{key}' updated")))
    }
}

struct ListContext {
    store: crate::store::Store,
}

#[async_trait]
impl Tool for ListContext {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "list_context".to_string(),
            description: "lists every shared context entry".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn call(&self, _args: serde_json::Value, _ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        let entries = self.store.list_context().await?;
        Ok(ToolResult::ok_json(&serde_json::to_value(entries)?))
    }
}

struct ArchiveContext {
    store: crate::store::Store,
}

#[async_trait]
impl Tool for ArchiveContext {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "archive_context".to_string(),
            description: "renames a context entry to archived_<key>_<ts>, preserving its value"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "required": ["key"],
                "properties": { "key": {"type": "string"} }
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, _ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        let key = args
            .get("key")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("key is required"))?;
        match self.store.archive_context(key).await? {
            Some(archived) => Ok(ToolResult::ok_json(&json!({ "archived_key": archived }))),
            None => Ok(ToolResult::err(format!("no context entry named '{key}'"))),
        }
    }
}
