use std::sync::Arc;

use async_trait::async_trait;
use mcp_kernel::resource::{Resource, ResourceAnnotations, ResourceCatalog, ResourceContent};

use crate::tmux::TmuxOps;

pub struct TmuxResources {
    controller: Arc<dyn TmuxOps>,
}

impl TmuxResources {
    pub fn new(controller: Arc<dyn TmuxOps>) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl ResourceCatalog for TmuxResources {
    fn scheme(&self) -> &'static str {
        "tmux"
    }

    async fn list(&self) -> anyhow::Result<Vec<Resource>> {
        let sessions = self.controller.list_sessions().await?;
        Ok(sessions
            .into_iter()
            .map(|name| Resource {
                uri: format!("tmux://{name}"),
                name: name.clone(),
                description: format!("live tmux session {name}"),
                mime_type: "text/plain".to_string(),
                annotations: ResourceAnnotations {
                    r#type: Some("tmux_session".to_string()),
                    ..Default::default()
                },
            })
            .collect())
    }

    async fn fetch(&self, uri: &str, _is_admin: bool) -> anyhow::Result<Option<ResourceContent>> {
        let name = uri.trim_start_matches("tmux://");
        if !self.controller.session_exists(name).await? {
            return Ok(None);
        }
        let pane = self.controller.capture_pane(name).await?;
        Ok(Some(ResourceContent::PlainText(pane)))
    }
}
