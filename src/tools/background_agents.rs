//! `background_agents` category: opt-in, disabled by default (see
//! `ENABLE_AGENTS`). Launches an agent and hands it a first task in one call.

use async_trait::async_trait;
use mcp_kernel::registry::ToolRegistry;
use mcp_kernel::tool::{Tool, ToolContext, ToolDef, ToolResult};
use serde_json::json;
use std::sync::Arc;

use crate::supervisor::Supervisor;
use crate::types::Priority;

use super::ToolDeps;

pub fn register(registry: &mut ToolRegistry, deps: &ToolDeps) {
    registry
        .register(
            "background_agents",
            Arc::new(LaunchBackgroundAgent {
                supervisor: deps.supervisor.clone(),
            }),
        )
        .expect("register launch_background_agent");
}

struct LaunchBackgroundAgent {
    supervisor: Arc<Supervisor>,
}

#[async_trait]
impl Tool for LaunchBackgroundAgent {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "launch_background_agent".to_string(),
            description: "creates an agent and immediately assigns it a starting task".to_string(),
            input_schema: json!({
                "type": "object",
                "required": ["agent_id", "working_directory", "title", "description"],
                "properties": {
                    "agent_id": {"type": "string"},
                    "working_directory": {"type": "string"},
                    "title": {"type": "string"},
                    "description": {"type": "string"}
                }
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, _ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        let agent_id = args
            .get("agent_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("agent_id is required"))?;
        let working_directory = args
            .get("working_directory")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("working_directory is required"))?;
        let title = args
            .get("title")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("title is required"))?
            .to_string();
        let description = args
            .get("description")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("description is required"))?
            .to_string();

        let agent = self
            .supervisor
            .create_agent(agent_id, working_directory, Vec::new(), "gray".to_string())
            .await?;
        let task = self
            .supervisor
            .create_task(
                title,
                description,
                "admin".to_string(),
                Priority::Medium,
                Some(agent.agent_id.clone()),
                None,
            )
            .await?;
        Ok(ToolResult::ok_json(&json!({ "agent": agent, "task": task })))
    }
}
