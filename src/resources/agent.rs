use async_trait::async_trait;
use mcp_kernel::resource::{Resource, ResourceAnnotations, ResourceCatalog, ResourceContent};

use crate::store::Store;

pub struct AgentResources {
    store: Store,
}

impl AgentResources {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResourceCatalog for AgentResources {
    fn scheme(&self) -> &'static str {
        "agent"
    }

    async fn list(&self) -> anyhow::Result<Vec<Resource>> {
        let agents = self.store.list_agents().await?;
        Ok(agents
            .into_iter()
            .map(|a| Resource {
                uri: format!("agent://{}", a.agent_id),
                name: a.agent_id.clone(),
                description: format!("agent {} ({})", a.agent_id, a.status.as_str()),
                mime_type: "application/json".to_string(),
                annotations: ResourceAnnotations {
                    color: Some(a.color),
                    status: Some(a.status.as_str().to_string()),
                    ..Default::default()
                },
            })
            .collect())
    }

    async fn fetch(&self, uri: &str, _is_admin: bool) -> anyhow::Result<Option<ResourceContent>> {
        let agent_id = uri.trim_start_matches("agent://");
        let agent = self.store.get_agent(agent_id).await?;
        Ok(agent.map(|a| ResourceContent::Json(serde_json::to_value(a).unwrap_or_default())))
    }
}
