//! `basic` category: always enabled, cannot be disabled.

use async_trait::async_trait;
use mcp_kernel::registry::ToolRegistry;
use mcp_kernel::tool::{Tool, ToolContext, ToolDef, ToolResult};
use serde_json::json;

use super::ToolDeps;

pub fn register(registry: &mut ToolRegistry, deps: &ToolDeps) {
    registry
        .register("basic", std::sync::Arc::new(Ping))
        .expect("register ping");
    registry
        .register(
            "basic",
            std::sync::Arc::new(SystemStatus {
                store: deps.store.clone(),
            }),
        )
        .expect("register system_status");
}

struct Ping;

#[async_trait]
impl Tool for Ping {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "ping".to_string(),
            description: "liveness check; always returns pong".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn call(&self, _args: serde_json::Value, _ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        Ok(ToolResult::ok_json(&json!({ "status": "pong" })))
    }
}

struct SystemStatus {
    store: crate::store::Store,
}

#[async_trait]
impl Tool for SystemStatus {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "system_status".to_string(),
            description: "counts of agents and tasks by status".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn call(&self, _args: serde_json::Value, _ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        let agents = self.store.list_agents().await?;
        let tasks = self.store.list_all_tasks().await?;
        Ok(ToolResult::ok_json(&json!({
            "agent_count": agents.len(),
            "task_count": tasks.len(),
        })))
    }
}
