//! `agent_management` category.

use async_trait::async_trait;
use mcp_kernel::registry::ToolRegistry;
use mcp_kernel::tool::{Tool, ToolContext, ToolDef, ToolResult};
use serde_json::json;
use std::sync::Arc;

use crate::supervisor::Supervisor;

use super::ToolDeps;

pub fn register(registry: &mut ToolRegistry, deps: &ToolDeps) {
    let category = "agent_management";
    registry
        .register(
            category,
            Arc::new(CreateAgent {
                supervisor: deps.supervisor.clone(),
            }),
        )
        .expect("register create_agent");
    registry
        .register(
            category,
            Arc::new(ListAgents {
                store: deps.store.clone(),
            }),
        )
        .expect("register list_agents");
    registry
        .register(
            category,
            Arc::new(TerminateAgent {
                supervisor: deps.supervisor.clone(),
            }),
        )
        .expect("register terminate_agent");
}

struct CreateAgent {
    supervisor: Arc<Supervisor>,
}

#[async_trait]
impl Tool for CreateAgent {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "create_agent".to_string(),
            description: "creates an agent and its backing tmux session".to_string(),
            input_schema: json!({
                "type": "object",
                "required": ["agent_id", "working_directory"],
                "properties": {
                    "agent_id": {"type": "string"},
                    "working_directory": {"type": "string"},
                    "capabilities": {"type": "array", "items": {"type": "string"}},
                    "color": {"type": "string"}
                }
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        if !ctx.is_admin {
            anyhow::bail!("admin privileges required");
        }
        let agent_id = args
            .get("agent_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("agent_id is required"))?;
        let working_directory = args
            .get("working_directory")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("working_directory is required"))?;
        let capabilities: Vec<String> = args
            .get("capabilities")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        let color = args
            .get("color")
            .and_then(|v| v.as_str())
            .unwrap_or("white")
            .to_string();

        let agent = self
            .supervisor
            .create_agent(agent_id, working_directory, capabilities, color)
            .await?;
        Ok(ToolResult::ok_json(&serde_json::to_value(agent)?))
    }
}

struct ListAgents {
    store: crate::store::Store,
}

#[async_trait]
impl Tool for ListAgents {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "list_agents".to_string(),
            description: "lists every known agent".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn call(&self, _args: serde_json::Value, _ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        let agents = self.store.list_agents().await?;
        Ok(ToolResult::ok_json(&serde_json::to_value(agents)?))
    }
}

struct TerminateAgent {
    supervisor: Arc<Supervisor>,
}

#[async_trait]
impl Tool for TerminateAgent {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "terminate_agent".to_string(),
            description: "tears down an agent's tmux session and marks it terminated".to_string(),
            input_schema: json!({
                "type": "object",
                "required": ["agent_id"],
                "properties": { "agent_id": {"type": "string"} }
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        if !ctx.is_admin {
            anyhow::bail!("admin privileges required");
        }
        let agent_id = args
            .get("agent_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("agent_id is required"))?;
        self.supervisor.terminate_agent(agent_id).await?;
        Ok(ToolResult::ok(format!("agent {agent_id} terminated")))
    }
}
