use async_trait::async_trait;
use mcp_kernel::resource::{Resource, ResourceAnnotations, ResourceCatalog, ResourceContent};
use serde_json::json;

use crate::store::Store;

/// Exposes bearer tokens as addressable resources: `token://admin` for the
/// bootstrapped admin token, `token://agent-<id>` for each agent's own
/// token. Actual token values are withheld from any caller that isn't
/// known to be the admin interface.
pub struct TokenResources {
    store: Store,
}

impl TokenResources {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResourceCatalog for TokenResources {
    fn scheme(&self) -> &'static str {
        "token"
    }

    async fn list(&self) -> anyhow::Result<Vec<Resource>> {
        let agents = self.store.list_agents().await?;
        let mut resources = vec![Resource {
            uri: "token://admin".to_string(),
            name: "admin token".to_string(),
            description: "bearer token for the admin interface".to_string(),
            mime_type: "application/json".to_string(),
            annotations: ResourceAnnotations {
                category: Some("auth".to_string()),
                ..Default::default()
            },
        }];
        resources.extend(agents.into_iter().map(|a| Resource {
            uri: format!("token://agent-{}", a.agent_id),
            name: format!("{} token", a.agent_id),
            description: "bearer token for this agent".to_string(),
            mime_type: "application/json".to_string(),
            annotations: ResourceAnnotations {
                category: Some("auth".to_string()),
                ..Default::default()
            },
        }));
        Ok(resources)
    }

    async fn fetch(&self, uri: &str, is_admin: bool) -> anyhow::Result<Option<ResourceContent>> {
        if !is_admin {
            return Ok(None);
        }
        let rest = uri.trim_start_matches("token://");
        if rest == "admin" {
            let token = self.store.get_admin_token().await?;
            return Ok(token.map(|t| ResourceContent::Json(json!({ "name": "admin", "token": t }))));
        }
        let Some(agent_id) = rest.strip_prefix("agent-") else {
            return Ok(None);
        };
        let agent = self.store.get_agent(agent_id).await?;
        Ok(agent.map(|a| {
            ResourceContent::Json(json!({ "agent_id": a.agent_id, "token": a.token }))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Agent, AgentStatus};
    use chrono::Utc;
    use std::collections::HashSet;

    #[tokio::test]
    async fn non_admin_caller_gets_nothing() {
        let store = Store::open_in_memory().unwrap();
        store.bootstrap_admin_token().await.unwrap();
        let resources = TokenResources::new(store);
        assert!(resources.fetch("token://admin", false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn admin_caller_can_read_agent_token() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        store
            .create_agent(Agent {
                agent_id: "agent-alpha".to_string(),
                token: "tok-alpha".to_string(),
                capabilities: HashSet::new(),
                status: AgentStatus::Active,
                current_task: None,
                working_directory: "/tmp".to_string(),
                color: "blue".to_string(),
                created_at: now,
                updated_at: now,
                terminated_at: None,
            })
            .await
            .unwrap();
        let resources = TokenResources::new(store);
        let content = resources
            .fetch("token://agent-agent-alpha", true)
            .await
            .unwrap()
            .expect("agent token resource");
        let ResourceContent::Json(v) = content else {
            panic!("expected json content")
        };
        assert_eq!(v["token"], "tok-alpha");
    }
}
