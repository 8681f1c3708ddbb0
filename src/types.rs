//! Entity schemas. Kept as plain serde structs/enums; the Store
//! module is the only place that knows how these map onto SQL rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Created,
    Active,
    Terminated,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Created => "created",
            AgentStatus::Active => "active",
            AgentStatus::Terminated => "terminated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(AgentStatus::Created),
            "active" => Some(AgentStatus::Active),
            "terminated" => Some(AgentStatus::Terminated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    pub agent_id: String,
    pub token: String,
    pub capabilities: HashSet<String>,
    pub status: AgentStatus,
    pub current_task: Option<String>,
    pub working_directory: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub terminated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "cancelled" => Some(TaskStatus::Cancelled),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskNote {
    pub ts: DateTime<Utc>,
    pub author: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub title: String,
    pub description: String,
    pub assigned_to: Option<String>,
    pub created_by: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub parent_task: Option<String>,
    pub notes: Vec<TaskNote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAction {
    pub id: i64,
    pub agent_id: String,
    pub action_type: String,
    pub task_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    pub context_key: String,
    pub value: serde_json::Value,
    pub description: String,
    pub last_updated: DateTime<Utc>,
    pub updated_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub filepath: String,
    pub metadata: serde_json::Value,
    pub last_updated: DateTime<Utc>,
    pub updated_by: String,
    pub content_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub message_id: i64,
    pub sender_id: String,
    pub recipient_id: String,
    pub content: String,
    pub message_type: String,
    pub priority: Priority,
    pub timestamp: DateTime<Utc>,
    pub delivered: bool,
    pub read: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum McpSessionStatus {
    Active,
    Disconnected,
    Recovered,
    Expired,
}

impl McpSessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            McpSessionStatus::Active => "active",
            McpSessionStatus::Disconnected => "disconnected",
            McpSessionStatus::Recovered => "recovered",
            McpSessionStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(McpSessionStatus::Active),
            "disconnected" => Some(McpSessionStatus::Disconnected),
            "recovered" => Some(McpSessionStatus::Recovered),
            "expired" => Some(McpSessionStatus::Expired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpSessionRow {
    pub mcp_session_id: String,
    pub transport_state: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub status: McpSessionStatus,
    pub disconnected_at: Option<DateTime<Utc>>,
    pub grace_period_expires: Option<DateTime<Utc>>,
    pub recovery_attempts: u32,
    pub working_directory: String,
    pub metadata: serde_json::Value,
    pub agent_context: Option<serde_json::Value>,
    pub conversation_state: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub agent_id: String,
    pub mcp_session_id: String,
    pub state_key: String,
    pub state_value: serde_json::Value,
    pub last_updated: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Canonicalizes the two spellings of the admin pseudo-agent-id that
/// appear in task assignment.
pub fn canonical_admin_id(id: &str) -> String {
    if id.eq_ignore_ascii_case("admin") {
        "admin".to_string()
    } else {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_canonicalization_is_case_insensitive() {
        assert_eq!(canonical_admin_id("Admin"), "admin");
        assert_eq!(canonical_admin_id("admin"), "admin");
        assert_eq!(canonical_admin_id("agent-1"), "agent-1");
    }

    #[test]
    fn status_round_trips_through_strings() {
        for s in [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Completed] {
            assert_eq!(TaskStatus::parse(s.as_str()), Some(s));
        }
    }
}
