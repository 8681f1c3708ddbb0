//! Tool definitions: the declarative half of the tool registry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::jsonrpc::RequestId;

/// Per-call context handed to a tool handler:
/// `ctx = {session_id, agent_id, request_id, is_admin}`.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub session_id: String,
    pub agent_id: Option<String>,
    pub request_id: RequestId,
    /// Whether the caller authenticated with the server's bootstrapped
    /// admin token, as opposed to an individual agent's token (or none).
    pub is_admin: bool,
}

/// A single piece of tool output. `text` is required by every tool this
/// server ships; `data`/`mime_type`/`uri` are populated by tools that return
/// binary or addressable content (e.g. a captured tmux pane screenshot).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentItem {
    Text {
        text: String,
    },
    Data {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Resource {
        uri: String,
        #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        ContentItem::Text { text: text.into() }
    }
}

/// The result of a tool call: `{ content, is_error }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<ContentItem>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::text(text)],
            is_error: false,
        }
    }

    pub fn ok_json(value: &Value) -> Self {
        Self {
            content: vec![ContentItem::text(
                serde_json::to_string_pretty(value)
                    .unwrap_or_else(|_| value.to_string()),
            )],
            is_error: false,
        }
    }

    pub fn err(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::text(text)],
            is_error: true,
        }
    }
}

/// Static description of a tool: name, description, and JSON Schema for its
/// arguments. Listed verbatim by `ToolRegistry::list` and by `/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Handler half of a tool. Implementors validate `args` against their own
/// schema and perform the call; re-entrancy is required since the registry
/// may be invoked concurrently from multiple sessions.
#[async_trait]
pub trait Tool: Send + Sync {
    fn def(&self) -> ToolDef;
    async fn call(&self, args: Value, ctx: &ToolContext) -> anyhow::Result<ToolResult>;
}
