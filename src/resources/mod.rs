//! Resource catalogs, one per URI scheme.
//!
//! Each catalog is a thin read-only projection over `Store`/tmux
//! state onto `mcp_kernel::ResourceCatalog`. `ResourceHub` fans `list`/
//! `fetch` out to whichever catalog owns the scheme in a URI.

mod agent;
mod create;
mod task;
mod tmux;
mod token;

pub use agent::AgentResources;
pub use create::CreateResources;
pub use task::TaskResources;
pub use tmux::TmuxResources;
pub use token::TokenResources;

use std::sync::Arc;

use mcp_kernel::resource::{Resource, ResourceCatalog, ResourceContent};

pub struct ResourceHub {
    catalogs: Vec<Arc<dyn ResourceCatalog>>,
}

impl ResourceHub {
    pub fn new(catalogs: Vec<Arc<dyn ResourceCatalog>>) -> Self {
        Self { catalogs }
    }

    pub async fn list_all(&self) -> anyhow::Result<Vec<Resource>> {
        let mut all = Vec::new();
        for catalog in &self.catalogs {
            all.extend(catalog.list().await?);
        }
        Ok(all)
    }

    pub async fn fetch(&self, uri: &str, is_admin: bool) -> anyhow::Result<Option<ResourceContent>> {
        let scheme = uri.split("://").next().unwrap_or("");
        for catalog in &self.catalogs {
            if catalog.scheme() == scheme {
                return catalog.fetch(uri, is_admin).await;
            }
        }
        Ok(None)
    }
}
