//! `session_state` category: scratch key/value state scoped to one
//! agent+mcp-session pair.

use async_trait::async_trait;
use mcp_kernel::registry::ToolRegistry;
use mcp_kernel::tool::{Tool, ToolContext, ToolDef, ToolResult};
use serde_json::json;
use std::sync::Arc;

use super::ToolDeps;

pub fn register(registry: &mut ToolRegistry, deps: &ToolDeps) {
    let category = "session_state";
    registry
        .register(
            category,
            Arc::new(SetSessionState {
                store: deps.store.clone(),
            }),
        )
        .expect("register set_session_state");
    registry
        .register(
            category,
            Arc::new(GetSessionState {
                store: deps.store.clone(),
            }),
        )
        .expect("register get_session_state");
}

struct SetSessionState {
    store: crate::store::Store,
}

#[async_trait]
impl Tool for SetSessionState {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "set_session_state".to_string(),
            description: "stores a value scoped to the calling agent's session".to_string(),
            input_schema: json!({
                "type": "object",
                "required": ["key", "value"],
                "properties": { "key": {"type": "string"}, "value": {} }
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        let agent_id = ctx
            .agent_id
            .clone()
            .ok_or_else(|| anyhow::anyhow!("session_state tools require an authenticated agent"))?;
        let key = args
            .get("key")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("key is required"))?;
        let value = args
            .get("value")
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("value is required"))?;

        self.store
            .set_session_state(&agent_id, &ctx.session_id, key, value, None)
            .await?;
        Ok(ToolResult::ok(format!("session state '{key}' set")))
    }
}

struct GetSessionState {
    store: crate::store::Store,
}

#[async_trait]
impl Tool for GetSessionState {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "get_session_state".to_string(),
            description: "reads a value scoped to the calling agent's session".to_string(),
            input_schema: json!({
                "type": "object",
                "required": ["key"],
                "properties": { "key": {"type": "string"} }
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        let agent_id = ctx
            .agent_id
            .clone()
            .ok_or_else(|| anyhow::anyhow!("session_state tools require an authenticated agent"))?;
        let key = args
            .get("key")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("key is required"))?;

        match self
            .store
            .get_session_state(&agent_id, &ctx.session_id, key)
            .await?
        {
            Some(state) => Ok(ToolResult::ok_json(&serde_json::to_value(state)?)),
            None => Ok(ToolResult::ok_json(&json!(null))),
        }
    }
}
