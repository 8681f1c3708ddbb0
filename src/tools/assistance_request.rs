//! `assistance_request` category: an agent escalates to the admin by
//! filing a task assigned to the canonical admin id, see
//! `types::canonical_admin_id`.

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
            "assistance_request",
            Arc::new(RequestAssistance {
                supervisor: deps.supervisor.clone(),
            }),
        )
        .expect("register request_assistance");
}

struct RequestAssistance {
    supervisor: Arc<Supervisor>,
}

#[async_trait]
impl Tool for RequestAssistance {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "request_assistance".to_string(),
            description: "files a high-priority task assigned to the admin describing what the calling agent is stuck on".to_string(),
            input_schema: json!({
                "type": "object",
                "required": ["reason"],
                "properties": { "reason": {"type": "string"} }
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        let agent_id = ctx
            .agent_id
            .clone()
            .ok_or_else(|| anyhow::anyhow!("request_assistance requires an authenticated agent"))?;
        let reason = args
            .get("reason")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("reason is required"))?
            .to_string();

        let task = self
            .supervisor
            .create_task(
                format!("assistance requested by {agent_id}"),
                reason,
                agent_id,
                Priority::High,
                Some("admin".to_string()),
                None,
            )
            .await?;
        Ok(ToolResult::ok_json(&serde_json::to_value(task)?))
    }
}
