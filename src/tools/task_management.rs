//! `task_management` category: task CRUD plus the completion
//! pipeline trigger.

use async_trait::async_trait;
use mcp_kernel::registry::ToolRegistry;
use mcp_kernel::tool::{Tool, ToolContext, ToolDef, ToolResult};
use serde_json::json;
use std::sync::Arc;

use crate::supervisor::Supervisor;
use crate::types::TaskStatus;

use super::ToolDeps;

pub fn register(registry: &mut ToolRegistry, deps: &ToolDeps) {
    let category = "task_management";
    let supervisor = deps.supervisor.clone();
    registry
        .register(
            category,
            Arc::new(CreateTask {
                supervisor: supervisor.clone(),
            }),
        )
        .expect("register create_task");
    registry
        .register(
            category,
            Arc::new(UpdateTaskStatus {
                supervisor: supervisor.clone(),
            }),
        )
        .expect("register update_task_status");
    registry
        .register(
            category,
            Arc::new(AppendTaskNote {
                store: deps.store.clone(),
            }),
        )
        .expect("register append_task_note");
    registry
        .register(
            category,
            Arc::new(ListTasksForAgent {
                store: deps.store.clone(),
            }),
        )
        .expect("register list_tasks_for_agent");
}

struct CreateTask {
    supervisor: Arc<Supervisor>,
}

#[async_trait]
impl Tool for CreateTask {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "create_task".to_string(),
            description: "creates a task, optionally nested under a parent".to_string(),
            input_schema: json!({
                "type": "object",
                "required": ["title", "description", "created_by"],
                "properties": {
                    "title": {"type": "string"},
                    "description": {"type": "string"},
                    "created_by": {"type": "string"},
                    "priority": {"type": "string", "enum": ["low", "medium", "high"]},
                    "assigned_to": {"type": "string"},
                    "parent_task": {"type": "string"}
                }
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, _ctx: &ToolContext) -> anyhow::Result<ToolResult> {
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
        let created_by = args
            .get("created_by")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("created_by is required"))?
            .to_string();
        let priority = args
            .get("priority")
            .and_then(|v| v.as_str())
            .and_then(crate::types::Priority::parse)
            .unwrap_or(crate::types::Priority::Medium);
        let assigned_to = args
            .get("assigned_to")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let parent_task = args
            .get("parent_task")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let task = self
            .supervisor
            .create_task(
                title,
                description,
                created_by,
                priority,
                assigned_to,
                parent_task,
            )
            .await?;
        Ok(ToolResult::ok_json(&serde_json::to_value(task)?))
    }
}

struct UpdateTaskStatus {
    supervisor: Arc<Supervisor>,
}

#[async_trait]
impl Tool for UpdateTaskStatus {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "update_task_status".to_string(),
            description: "transitions a task's status; completion triggers the testing pipeline"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "required": ["task_id", "status"],
                "properties": {
                    "task_id": {"type": "string"},
                    "status": {"type": "string", "enum": ["pending", "in_progress", "completed", "cancelled", "failed"]}
                }
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, _ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        let task_id = args
            .get("task_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("task_id is required"))?;
        let status_str = args
            .get("status")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("status is required"))?;
        let status = TaskStatus::parse(status_str)
            .ok_or_else(|| anyhow::anyhow!("unknown status '{status_str}'"))?;

        self.supervisor.update_task_status(task_id, status).await?;
        Ok(ToolResult::ok(format!("task {task_id} set to {status_str}")))
    }
}

struct AppendTaskNote {
    store: crate::store::Store,
}

#[async_trait]
impl Tool for AppendTaskNote {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "append_task_note".to_string(),
            description: "appends a timestamped note to a task".to_string(),
            input_schema: json!({
                "type": "object",
                "required": ["task_id", "author", "content"],
                "properties": {
                    "task_id": {"type": "string"},
                    "author": {"type": "string"},
                    "content": {"type": "string"}
                }
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, _ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        let task_id = args
            .get("task_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("task_id is required"))?;
        let author = args
            .get("author")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("author is required"))?;
        let content = args
            .get("content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("content is required"))?;

        self.store.append_task_note(task_id, author, content).await?;
        Ok(ToolResult::ok("note appended"))
    }
}

struct ListTasksForAgent {
    store: crate::store::Store,
}

#[async_trait]
impl Tool for ListTasksForAgent {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "list_tasks_for_agent".to_string(),
            description: "lists every task assigned to an agent".to_string(),
            input_schema: json!({
                "type": "object",
                "required": ["agent_id"],
                "properties": { "agent_id": {"type": "string"} }
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, _ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        let agent_id = args
            .get("agent_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("agent_id is required"))?;
        let tasks = self.store.list_tasks_for_agent(agent_id).await?;
        Ok(ToolResult::ok_json(&serde_json::to_value(tasks)?))
    }
}
