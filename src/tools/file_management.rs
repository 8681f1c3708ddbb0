//! `file_management` category.

use async_trait::async_trait;
use mcp_kernel::registry::ToolRegistry;
use mcp_kernel::tool::{Tool, ToolContext, ToolDef, ToolResult};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use walkdir::WalkDir;

use super::ToolDeps;

pub fn register(registry: &mut ToolRegistry, deps: &ToolDeps) {
    let category = "file_management";
    registry
        .register(
            category,
            Arc::new(RecordFileMetadata {
                store: deps.store.clone(),
            }),
        )
        .expect("register record_file_metadata");
    registry
        .register(
            category,
            Arc::new(ListFileMetadata {
                store: deps.store.clone(),
            }),
        )
        .expect("register list_file_metadata");
    registry
        .register(category, Arc::new(ScanWorkingDirectory))
        .expect("register scan_working_directory");
}

struct RecordFileMetadata {
    store: crate::store::Store,
}

#[async_trait]
impl Tool for RecordFileMetadata {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "record_file_metadata".to_string(),
            description: "hashes file contents and upserts its metadata row".to_string(),
            input_schema: json!({
                "type": "object",
                "required": ["filepath", "content", "updated_by"],
                "properties": {
                    "filepath": {"type": "string"},
                    "content": {"type": "string"},
                    "updated_by": {"type": "string"},
                    "metadata": {"type": "object"}
                }
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, _ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        let filepath = args
            .get("filepath")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("filepath is required"))?;
        let content = args
            .get("content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("content is required"))?;
        let updated_by = args
            .get("updated_by")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("updated_by is required"))?;
        let metadata = args.get("metadata").cloned().unwrap_or(json!({}));

        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        let content_hash = format!("{:x}", hasher.finalize());

        self.store
            .upsert_file_metadata(filepath, metadata, updated_by, &content_hash)
            .await?;
        Ok(ToolResult::ok_json(&json!({ "content_hash": content_hash })))
    }
}

struct ListFileMetadata {
    store: crate::store::Store,
}

#[async_trait]
impl Tool for ListFileMetadata {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "list_file_metadata".to_string(),
            description: "lists tracked file metadata".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn call(&self, _args: serde_json::Value, _ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        let files = self.store.list_file_metadata().await?;
        Ok(ToolResult::ok_json(&serde_json::to_value(files)?))
    }
}

struct ScanWorkingDirectory;

#[async_trait]
impl Tool for ScanWorkingDirectory {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "scan_working_directory".to_string(),
            description: "walks a directory and lists file paths, without touching tracked metadata".to_string(),
            input_schema: json!({
                "type": "object",
                "required": ["directory"],
                "properties": {
                    "directory": {"type": "string"},
                    "extension": {"type": "string"}
                }
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, _ctx: &ToolContext) -> anyhow::Result<ToolResult> {
        let directory = args
            .get("directory")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("directory is required"))?
            .to_string();
        let extension = args
            .get("extension")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let paths = tokio::task::spawn_blocking(move || {
            WalkDir::new(&directory)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| match &extension {
                    Some(ext) => e.path().extension().and_then(|s| s.to_str()) == Some(ext.as_str()),
                    None => true,
                })
                .map(|e| e.path().to_string_lossy().to_string())
                .collect::<Vec<_>>()
        })
        .await?;

        Ok(ToolResult::ok_json(&json!({ "paths": paths })))
    }
}
