//! Process-wide tool registry: name -> `{description, input schema, handler}`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::tool::{Tool, ToolContext, ToolDef, ToolResult};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("tool '{0}' already registered")]
    AlreadyRegistered(String),
    #[error("tool '{0}' not found")]
    ToolMissing(String),
    #[error("invalid arguments for tool '{0}': {1}")]
    ToolInput(String, String),
    #[error("handler for tool '{0}' failed: {1}")]
    ToolHandler(String, String),
}

/// Result of `ToolRegistry::update_configuration`.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryUpdate {
    pub applied_changes: Vec<String>,
    pub errors: Vec<String>,
    pub new_config: Vec<String>,
}

struct Entry {
    category: String,
    tool: Arc<dyn Tool>,
}

/// A process-wide, initialize-once catalog of tools, filtered by which
/// categories are currently enabled. `basic` is always enabled and cannot
/// be removed (this is a deliberate, non-configurable invariant of the
/// registry: forbidden outright, not merely discouraged).
pub struct ToolRegistry {
    entries: HashMap<String, Entry>,
    enabled_categories: HashMap<String, bool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        let mut enabled_categories = HashMap::new();
        enabled_categories.insert("basic".to_string(), true);
        Self {
            entries: HashMap::new(),
            enabled_categories,
        }
    }

    /// Register a tool under a category. Categories default to disabled
    /// until explicitly enabled via `update_configuration`, except `basic`.
    pub fn register(&mut self, category: &str, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.def().name.clone();
        if self.entries.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        self.enabled_categories
            .entry(category.to_string())
            .or_insert(category == "basic");
        self.entries.insert(
            name,
            Entry {
                category: category.to_string(),
                tool,
            },
        );
        Ok(())
    }

    fn is_visible(&self, entry: &Entry) -> bool {
        self.enabled_categories
            .get(&entry.category)
            .copied()
            .unwrap_or(false)
    }

    /// List tool definitions for currently enabled categories.
    pub fn list(&self) -> Vec<ToolDef> {
        self.entries
            .values()
            .filter(|e| self.is_visible(e))
            .map(|e| e.tool.def())
            .collect()
    }

    /// Dispatch a call. Disabled-category tools behave as missing.
    pub async fn execute(
        &self,
        name: &str,
        args: Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, RegistryError> {
        let entry = self
            .entries
            .get(name)
            .filter(|e| self.is_visible(e))
            .ok_or_else(|| RegistryError::ToolMissing(name.to_string()))?;

        entry
            .tool
            .call(args, ctx)
            .await
            .map_err(|e| RegistryError::ToolHandler(name.to_string(), e.to_string()))
    }

    /// Recompute the enabled category set. `basic` is force-enabled
    /// regardless of what `new_categories` contains.
    pub fn update_configuration(&mut self, new_categories: &[String]) -> RegistryUpdate {
        let mut applied = Vec::new();
        let errors = Vec::new();
        let mut wanted: HashMap<String, bool> = self
            .enabled_categories
            .keys()
            .map(|k| (k.clone(), false))
            .collect();
        for c in new_categories {
            wanted.insert(c.clone(), true);
        }
        // `basic` is always force-enabled: omitting it from `new_categories`
        // is the normal way callers express "no opinion", not an attempt to
        // disable it, so this never produces an error.
        wanted.insert("basic".to_string(), true);

        for (category, enable) in &wanted {
            let was_enabled = self.enabled_categories.get(category).copied().unwrap_or(false);
            if *enable != was_enabled {
                applied.push(format!(
                    "{} '{}'",
                    if *enable { "enabled" } else { "disabled" },
                    category
                ));
            }
        }
        self.enabled_categories = wanted;

        let new_config = self
            .enabled_categories
            .iter()
            .filter(|(_, v)| **v)
            .map(|(k, _)| k.clone())
            .collect();

        RegistryUpdate {
            applied_changes: applied,
            errors,
            new_config,
        }
    }

    pub fn enabled_categories(&self) -> Vec<String> {
        self.enabled_categories
            .iter()
            .filter(|(_, v)| **v)
            .map(|(k, _)| k.clone())
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonrpc::RequestId;
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo(&'static str);

    #[async_trait]
    impl Tool for Echo {
        fn def(&self) -> ToolDef {
            ToolDef {
                name: self.0.to_string(),
                description: "echoes its args".to_string(),
                input_schema: json!({"type": "object"}),
            }
        }

        async fn call(&self, args: Value, _ctx: &ToolContext) -> anyhow::Result<ToolResult> {
            Ok(ToolResult::ok_json(&args))
        }
    }

    fn ctx() -> ToolContext {
        ToolContext {
            session_id: "s1".to_string(),
            agent_id: None,
            request_id: RequestId::Number(1),
            is_admin: false,
        }
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut reg = ToolRegistry::new();
        reg.register("basic", Arc::new(Echo("ping"))).unwrap();
        let err = reg.register("basic", Arc::new(Echo("ping"))).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRegistered(_)));
    }

    #[tokio::test]
    async fn disabled_category_tools_are_not_listed_or_executable() {
        let mut reg = ToolRegistry::new();
        reg.register("agentManagement", Arc::new(Echo("create_agent")))
            .unwrap();
        assert!(reg.list().is_empty());
        let err = reg
            .execute("create_agent", json!({}), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::ToolMissing(_)));

        let update = reg.update_configuration(&["agentManagement".to_string()]);
        assert!(update.errors.is_empty());
        assert_eq!(reg.list().len(), 1);
        assert!(reg.execute("create_agent", json!({}), &ctx()).await.is_ok());

        let update = reg.update_configuration(&[]);
        assert!(reg.list().is_empty());
        assert!(update.new_config.contains(&"basic".to_string()));
    }

    #[test]
    fn basic_cannot_be_disabled() {
        let mut reg = ToolRegistry::new();
        let update = reg.update_configuration(&[]);
        assert!(update.errors.is_empty());
        assert!(reg.enabled_categories().contains(&"basic".to_string()));
    }
}
