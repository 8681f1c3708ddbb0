//! `agent_communication` category.

use async_trait::async_trait;
use mcp_kernel::registry::ToolRegistry;
use mcp_kernel::tool::{Tool, ToolContext, ToolDef, ToolResult};
use serde_json::json;
use std::sync::Arc;

use crate::types::Priority;

use super::ToolDeps;

pub fn register(registry: &mut ToolRegistry, deps: &ToolDeps) {
    let category = "agent_communication";
    registry
        .register(
            category,
            Arc::new(SendMessage {
                store: deps.store.clone(),
            }),
        )
        .expect("register send_message");
    registry
        .register(
            category,
            Arc::new(ListMessages {
                store: deps.store.clone(),
            }),
        )
        .expect("register list_messages");
}

struct SendMessage {
    store: crate::store::Store,
}

#[async_trait]
impl Tool for SendMessage {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "send_message".to_string(),
            description: "delivers a message to another agent's mailbox".to_string(),
            input_schema: json!({
                "type": "object",
                "required": ["sender_id", "recipient_id", "content"],
                "properties": {
                    "sender_id": {"type": "string"},
                    "recipient_id": {"type": "string"},
                    "content": {"type": "string"},
                    "message_type": {"type": "string"},
                    "priority": {"type": "string", "enum": ["low", "medium", "high"]}
                }
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, _ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        let sender_id = args
            .get("sender_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("sender_id is required"))?;
        let recipient_id = args
            .get("recipient_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("recipient_id is required"))?;
        let content = args
            .get("content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("content is required"))?;
        let message_type = args
            .get("message_type")
            .and_then(|v| v.as_str())
            .unwrap_or("note");
        let priority = args
            .get("priority")
            .and_then(|v| v.as_str())
            .and_then(Priority::parse)
            .unwrap_or(Priority::Medium);

        let message_id = self
            .store
            .send_message(sender_id, recipient_id, content, message_type, priority)
            .await?;
        Ok(ToolResult::ok_json(&json!({ "message_id": message_id })))
    }
}

struct ListMessages {
    store: crate::store::Store,
}

#[async_trait]
impl Tool for ListMessages {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "list_messages".to_string(),
            description: "lists messages addressed to an agent".to_string(),
            input_schema: json!({
                "type": "object",
                "required": ["recipient_id"],
                "properties": {
                    "recipient_id": {"type": "string"},
                    "unread_only": {"type": "boolean"}
                }
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, _ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        let recipient_id = args
            .get("recipient_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("recipient_id is required"))?;
        let unread_only = args
            .get("unread_only")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let messages = self
            .store
            .list_messages_for_agent(recipient_id, unread_only)
            .await?;
        Ok(ToolResult::ok_json(&serde_json::to_value(messages)?))
    }
}
